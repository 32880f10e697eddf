use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "date_property_value")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Absolute instant; client-local input is shifted before storage.
    pub value: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
