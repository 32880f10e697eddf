use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One record instantiating an entity config. Its property values live in
/// the per-type link and value tables.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "entity")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,

    pub entity_config_id: i32,
    #[sea_orm(belongs_to, from = "entity_config_id", to = "id")]
    pub entity_config: HasOne<super::entity_config::Entity>,

    #[sea_orm(has_many)]
    pub tags: HasMany<super::entity_tag::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
