use common::DataType;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "property_config")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,
    pub entity_config_id: i32,
    #[sea_orm(belongs_to, from = "entity_config_id", to = "id")]
    pub entity_config: HasOne<super::entity_config::Entity>,

    pub name: String,
    /// Never changes after creation; stored values are keyed off it.
    pub data_type: DataType,
    pub render_type: String,

    /// Minimum number of occurrences per entity.
    pub required: i32,
    /// Non-zero when the property may occur more than once.
    pub repeat: i32,
    /// Maximum occurrences when repeating; 0 means unbounded.
    pub allowed: i32,
    pub prefix: String,
    pub suffix: String,
    pub hidden: bool,

    /// Display position within the entity config.
    #[sea_orm(default_value = 0)]
    pub position: i32,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
