pub mod assembler;
pub mod entity;
pub mod list;
pub mod property_sync;
pub mod query_builder;
pub mod sql;
pub mod tables;
pub mod tagging;

pub use entity::EntityService;
pub use list::{ListParams, ListService};
pub use property_sync::PropertySyncEngine;
pub use tagging::TagStore;
