use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A user-owned schema: a named list of typed property slots.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "entity_config")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub description: Option<String>,

    /// The config this one is a revision of, if any.
    pub revision_of: Option<i32>,
    pub allow_property_ordering: bool,

    #[sea_orm(has_many)]
    pub properties: HasMany<super::property_config::Entity>,

    #[sea_orm(has_many)]
    pub entities: HasMany<super::entity_item::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
