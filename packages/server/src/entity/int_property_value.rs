use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "int_property_value")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub value: i64,
}

impl ActiveModelBehavior for ActiveModel {}
