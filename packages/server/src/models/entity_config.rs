use chrono::{DateTime, Utc};
use common::DataType;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::entity::{entity_config, property_config};
use crate::error::AppError;

use super::property::PropertyValue;
use super::shared::{double_option, validate_description, validate_name, validate_reorder_ids};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEntityConfigRequest {
    #[schema(example = "Book")]
    pub name: String,
    pub description: Option<String>,
    /// Entity config this one is a revision of.
    pub revision_of: Option<i32>,
    #[serde(default)]
    pub allow_property_ordering: bool,
    /// Property configs created together with the entity config, in display order.
    #[serde(default)]
    pub properties: Vec<CreatePropertyConfigRequest>,
}

#[derive(Debug, Default, PartialEq, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEntityConfigRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    pub allow_property_ordering: Option<bool>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePropertyConfigRequest {
    #[schema(example = "Title")]
    pub name: String,
    pub data_type: DataType,
    #[serde(default)]
    #[schema(example = "text")]
    pub render_type: String,
    #[serde(default)]
    pub required: i32,
    #[serde(default)]
    pub repeat: i32,
    #[serde(default)]
    pub allowed: i32,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub suffix: String,
    #[serde(default)]
    pub hidden: bool,
    /// Display position. Defaults to the end of the list.
    pub position: Option<i32>,
    /// Typed default value, shaped like a property value of `dataType`.
    #[schema(value_type = Option<Object>)]
    pub default_value: Option<Json>,
    /// Client offset in minutes behind UTC, applied to a local DATE default.
    #[serde(default)]
    pub time_zone: i32,
}

/// PATCH body for a property config. `dataType` may be repeated but not changed.
#[derive(Debug, Default, PartialEq, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePropertyConfigRequest {
    pub name: Option<String>,
    pub data_type: Option<DataType>,
    pub render_type: Option<String>,
    pub required: Option<i32>,
    pub repeat: Option<i32>,
    pub allowed: Option<i32>,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub hidden: Option<bool>,
    /// `null` clears the default value.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Object>)]
    pub default_value: Option<Option<Json>>,
    #[serde(default)]
    pub time_zone: i32,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct PropertyOrderItem {
    pub id: i32,
    pub order: i32,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PropertyConfigResponse {
    pub id: i32,
    pub entity_config_id: i32,
    pub name: String,
    pub data_type: DataType,
    pub render_type: String,
    pub required: i32,
    pub repeat: i32,
    pub allowed: i32,
    pub prefix: String,
    pub suffix: String,
    pub hidden: bool,
    /// Display position within the entity config.
    pub order: i32,
    pub default_value: Option<PropertyValue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PropertyConfigResponse {
    pub fn new(m: property_config::Model, default_value: Option<PropertyValue>) -> Self {
        Self {
            id: m.id,
            entity_config_id: m.entity_config_id,
            name: m.name,
            data_type: m.data_type,
            render_type: m.render_type,
            required: m.required,
            repeat: m.repeat,
            allowed: m.allowed,
            prefix: m.prefix,
            suffix: m.suffix,
            hidden: m.hidden,
            order: m.position,
            default_value,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EntityConfigResponse {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub revision_of: Option<i32>,
    pub allow_property_ordering: bool,
    pub properties: Vec<PropertyConfigResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EntityConfigResponse {
    pub fn new(m: entity_config::Model, properties: Vec<PropertyConfigResponse>) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            name: m.name,
            description: m.description,
            revision_of: m.revision_of,
            allow_property_ordering: m.allow_property_ordering,
            properties,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct EntityConfigListQuery {
    /// Case-insensitive substring of the config name.
    pub name: Option<String>,
}

fn validate_cardinality(required: i32, repeat: i32, allowed: i32) -> Result<(), AppError> {
    if required < 0 || repeat < 0 || allowed < 0 {
        return Err(AppError::Validation(
            "required, repeat and allowed must be >= 0".into(),
        ));
    }
    if repeat == 0 && required > 1 {
        return Err(AppError::Validation(
            "A non-repeating property cannot require more than one value".into(),
        ));
    }
    if repeat != 0 && allowed > 0 && required > allowed {
        return Err(AppError::Validation(
            "required must not exceed allowed".into(),
        ));
    }
    Ok(())
}

pub fn validate_create_property_config(req: &CreatePropertyConfigRequest) -> Result<(), AppError> {
    validate_name(&req.name, "Property")?;
    validate_cardinality(req.required, req.repeat, req.allowed)?;
    if let Some(pos) = req.position
        && pos < 0
    {
        return Err(AppError::Validation("Position must be >= 0".into()));
    }
    Ok(())
}

/// Checks the merged cardinality of an existing config and a PATCH body.
pub fn validate_update_property_config(
    current: &property_config::Model,
    req: &UpdatePropertyConfigRequest,
) -> Result<(), AppError> {
    if let Some(ref name) = req.name {
        validate_name(name, "Property")?;
    }
    if let Some(dt) = req.data_type
        && dt != current.data_type
    {
        return Err(AppError::Conflict(format!(
            "Property config {} is {}; its data type cannot change",
            current.id, current.data_type
        )));
    }
    validate_cardinality(
        req.required.unwrap_or(current.required),
        req.repeat.unwrap_or(current.repeat),
        req.allowed.unwrap_or(current.allowed),
    )
}

pub fn validate_create_entity_config(req: &CreateEntityConfigRequest) -> Result<(), AppError> {
    validate_name(&req.name, "Entity config")?;
    validate_description(req.description.as_deref())?;
    req.properties
        .iter()
        .try_for_each(validate_create_property_config)
}

pub fn validate_update_entity_config(req: &UpdateEntityConfigRequest) -> Result<(), AppError> {
    if let Some(ref name) = req.name {
        validate_name(name, "Entity config")?;
    }
    if let Some(Some(ref d)) = req.description {
        validate_description(Some(d))?;
    }
    Ok(())
}

pub fn validate_reorder(items: &[PropertyOrderItem]) -> Result<(), AppError> {
    let ids: Vec<i32> = items.iter().map(|i| i.id).collect();
    validate_reorder_ids(&ids, "property config")?;
    if items.iter().any(|i| i.order < 0) {
        return Err(AppError::Validation("Order must be >= 0".into()));
    }
    Ok(())
}
