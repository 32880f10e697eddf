use chrono::{DateTime, Utc};
use common::DataType;
use sea_orm::FromQueryResult;
use serde::Deserialize;
use serde_json::Value as Json;

use crate::error::AppError;
use crate::models::entity::{EntityPropertyResponse, EntityResponse};
use crate::models::property::PropertyValue;

use super::tables::PropertyTables;

/// One row of [`super::query_builder::ListQueryBuilder::build`].
#[derive(Debug, Clone, FromQueryResult)]
pub struct EntityRow {
    pub id: i32,
    pub user_id: i32,
    pub entity_config_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub tags: Json,
    pub boolean_values: Json,
    pub int_values: Json,
    pub date_values: Json,
    pub image_values: Json,
    pub short_text_values: Json,
    pub long_text_values: Json,
}

impl EntityRow {
    fn values(&self, data_type: DataType) -> &Json {
        match data_type {
            DataType::Boolean => &self.boolean_values,
            DataType::Int => &self.int_values,
            DataType::Date => &self.date_values,
            DataType::Image => &self.image_values,
            DataType::ShortText => &self.short_text_values,
            DataType::LongText => &self.long_text_values,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LinkedValue {
    id: i32,
    property_config_id: i32,
    order: i32,
    value: Json,
}

/// Merge the per-type aggregates of a row into one response, ordered by `order`.
pub fn assemble(row: EntityRow) -> Result<EntityResponse, AppError> {
    let mut properties = Vec::new();
    for tables in PropertyTables::all() {
        let linked: Vec<LinkedValue> = serde_json::from_value(row.values(tables.data_type).clone())
            .map_err(|e| {
                AppError::Internal(format!(
                    "entity {} has malformed {} values: {e}",
                    row.id, tables.data_type
                ))
            })?;
        for l in linked {
            properties.push(EntityPropertyResponse {
                id: l.id,
                property_config_id: l.property_config_id,
                data_type: tables.data_type,
                value: PropertyValue::from_stored(tables.data_type, l.value)
                    .map_err(AppError::Internal)?,
                order: l.order,
            });
        }
    }
    properties.sort_by_key(|p| p.order);

    let tags: Vec<String> = serde_json::from_value(row.tags)
        .map_err(|e| AppError::Internal(format!("entity {} has malformed tags: {e}", row.id)))?;

    Ok(EntityResponse {
        id: row.id,
        user_id: row.user_id,
        entity_config_id: row.entity_config_id,
        tags,
        properties,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}
