use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::{DataType, ListContext, ListFilter, ListSort};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::error::AppError;

use super::property::PropertyValue;

/// Longest accepted tag label, in characters.
pub const TAG_MAX_CHARS: usize = 64;

/// One occurrence of a property on an entity.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PropertyAssignment {
    /// Value id to update in place. Absent or `0` creates a new value.
    #[serde(default)]
    #[schema(example = 0)]
    pub id: Option<i32>,
    #[schema(example = 1)]
    pub property_config_id: i32,
    /// Shape depends on the property's data type.
    #[schema(value_type = Object, example = "hello")]
    pub value: Json,
    #[serde(default)]
    #[schema(example = 0)]
    pub order: i32,
}

impl PropertyAssignment {
    pub fn existing_id(&self) -> Option<i32> {
        self.id.filter(|id| *id > 0)
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEntityRequest {
    #[schema(example = 1)]
    pub entity_config_id: i32,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub properties: Vec<PropertyAssignment>,
    /// Client offset in minutes behind UTC, applied to local DATE values.
    #[serde(default)]
    #[schema(example = -60)]
    pub time_zone: i32,
    /// Optional creation instant (client-local or RFC 3339). Defaults to now.
    #[schema(example = "2024-01-01T09:30")]
    pub created_at: Option<String>,
}

/// Full replacement of an entity's tags and properties.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEntityRequest {
    #[serde(default)]
    pub tags: Vec<String>,
    /// Properties missing from this list are removed from the entity.
    #[serde(default)]
    pub properties: Vec<PropertyAssignment>,
    #[serde(default)]
    pub time_zone: i32,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EntityPropertyResponse {
    /// Value id; pass it back to update the value in place.
    #[schema(example = 10)]
    pub id: i32,
    #[schema(example = 1)]
    pub property_config_id: i32,
    pub data_type: DataType,
    pub value: PropertyValue,
    #[schema(example = 0)]
    pub order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EntityResponse {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = 1)]
    pub user_id: i32,
    #[schema(example = 1)]
    pub entity_config_id: i32,
    #[schema(example = json!(["reading"]))]
    pub tags: Vec<String>,
    /// Merged across data types, ordered by `order`.
    pub properties: Vec<EntityPropertyResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct EntityListResponse {
    pub items: Vec<EntityResponse>,
    /// Neighbouring entities keyed by the id of the item they surround.
    /// Empty unless a context window was requested.
    pub context: BTreeMap<i32, Vec<EntityResponse>>,
    /// Number of entities matching the filter, ignoring pagination.
    #[schema(example = 42)]
    pub total: u64,
}

/// Query string of `GET /entities`. `filter`, `sort` and `context` are JSON
/// documents.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct EntityListQuery {
    /// Offset of the first item (default 0).
    #[param(example = 0)]
    pub start: Option<u64>,
    /// Page size, clamped to the configured maximum.
    #[param(example = 25)]
    pub per_page: Option<u64>,
    /// JSON list filter. Missing means every entity the caller owns.
    #[param(example = r#"{"includeAll":false,"includeTypes":[1]}"#)]
    pub filter: Option<String>,
    /// JSON sort. Missing means `createdAt` descending.
    #[param(example = r#"{"property":"createdAt","direction":"DESC"}"#)]
    pub sort: Option<String>,
    /// JSON context window, e.g. `{"type":"BEFORE","quantity":1,"unit":"DAY"}`.
    pub context: Option<String>,
}

impl EntityListQuery {
    pub fn parse_filter(&self) -> Result<ListFilter, AppError> {
        parse_json_param(self.filter.as_deref(), "filter").map(Option::unwrap_or_default)
    }

    pub fn parse_sort(&self) -> Result<ListSort, AppError> {
        parse_json_param(self.sort.as_deref(), "sort").map(Option::unwrap_or_default)
    }

    pub fn parse_context(&self) -> Result<Option<ListContext>, AppError> {
        parse_json_param(self.context.as_deref(), "context")
    }
}

fn parse_json_param<T>(raw: Option<&str>, name: &str) -> Result<Option<T>, AppError>
where
    T: for<'de> Deserialize<'de>,
{
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => serde_json::from_str(raw)
            .map(Some)
            .map_err(|e| AppError::Validation(format!("Invalid {name}: {e}"))),
    }
}

pub fn validate_tags(tags: &[String]) -> Result<(), AppError> {
    if let Some(tag) = tags.iter().find(|t| t.trim().chars().count() > TAG_MAX_CHARS) {
        return Err(AppError::Validation(format!(
            "Tag '{}' exceeds {TAG_MAX_CHARS} characters",
            tag.trim()
        )));
    }
    Ok(())
}

pub fn validate_create_entity(req: &CreateEntityRequest) -> Result<(), AppError> {
    validate_tags(&req.tags)
}

pub fn validate_update_entity(req: &UpdateEntityRequest) -> Result<(), AppError> {
    validate_tags(&req.tags)
}
