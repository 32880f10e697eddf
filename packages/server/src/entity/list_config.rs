use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A saved filter + sort + page size preset.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "list_config")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub description: Option<String>,

    /// `common::ListFilter` as JSON.
    #[sea_orm(column_type = "JsonBinary")]
    pub filter: Json,
    /// `common::ListSort` as JSON.
    #[sea_orm(column_type = "JsonBinary")]
    pub sort: Json,
    pub per_page: i32,

    /// Readable (not writable) by anyone, including anonymous callers.
    pub is_public: bool,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
