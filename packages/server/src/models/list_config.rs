use chrono::{DateTime, Utc};
use common::{ListContext, ListFilter, ListSort};
use serde::{Deserialize, Serialize};

use crate::entity::list_config;
use crate::error::AppError;

use super::shared::{validate_description, validate_name};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListConfigRequest {
    #[schema(example = "Unread books")]
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub filter: ListFilter,
    #[serde(default)]
    pub sort: ListSort,
    /// Page size used when the preset is applied.
    #[schema(example = 25)]
    pub per_page: Option<i32>,
    #[serde(default)]
    pub is_public: bool,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListConfigResponse {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub filter: ListFilter,
    pub sort: ListSort,
    pub per_page: i32,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<list_config::Model> for ListConfigResponse {
    type Error = AppError;

    fn try_from(m: list_config::Model) -> Result<Self, Self::Error> {
        let (filter, sort) = decode_preset(&m)?;
        Ok(Self {
            id: m.id,
            user_id: m.user_id,
            name: m.name,
            description: m.description,
            filter,
            sort,
            per_page: m.per_page,
            is_public: m.is_public,
            created_at: m.created_at,
            updated_at: m.updated_at,
        })
    }
}

/// Decode the stored filter and sort documents of a preset.
pub fn decode_preset(m: &list_config::Model) -> Result<(ListFilter, ListSort), AppError> {
    let filter = serde_json::from_value(m.filter.clone()).map_err(|e| {
        AppError::Internal(format!("list config {} has a corrupt filter: {e}", m.id))
    })?;
    let sort = serde_json::from_value(m.sort.clone()).map_err(|e| {
        AppError::Internal(format!("list config {} has a corrupt sort: {e}", m.id))
    })?;
    Ok((filter, sort))
}

/// Query string of `GET /lists/{id}/entities`.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListPresetQuery {
    pub start: Option<u64>,
    /// Overrides the preset's page size.
    pub per_page: Option<u64>,
    /// JSON context window.
    pub context: Option<String>,
}

impl ListPresetQuery {
    pub fn parse_context(&self) -> Result<Option<ListContext>, AppError> {
        match self.context.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => serde_json::from_str(raw)
                .map(Some)
                .map_err(|e| AppError::Validation(format!("Invalid context: {e}"))),
        }
    }
}

pub fn validate_list_config(req: &ListConfigRequest, max_per_page: u64) -> Result<(), AppError> {
    validate_name(&req.name, "List")?;
    validate_description(req.description.as_deref())?;
    if let Some(per_page) = req.per_page
        && (per_page < 1 || per_page as u64 > max_per_page)
    {
        return Err(AppError::Validation(format!(
            "perPage must be between 1 and {max_per_page}"
        )));
    }
    Ok(())
}
