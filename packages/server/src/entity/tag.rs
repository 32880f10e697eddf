use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tag")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub label: String,

    #[sea_orm(has_many)]
    pub entities: HasMany<super::entity_tag::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
