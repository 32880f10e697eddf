use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "entity_boolean_property")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub entity_id: i32,
    #[sea_orm(belongs_to, from = "entity_id", to = "id")]
    pub owner: HasOne<super::entity_item::Entity>,

    pub property_config_id: i32,
    #[sea_orm(belongs_to, from = "property_config_id", to = "id")]
    pub property_config: HasOne<super::property_config::Entity>,

    #[sea_orm(unique)]
    pub property_value_id: i32,
    #[sea_orm(belongs_to, from = "property_value_id", to = "id")]
    pub property_value: HasOne<super::boolean_property_value::Entity>,

    pub order: i32,
}

impl ActiveModelBehavior for ActiveModel {}
