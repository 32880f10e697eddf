pub mod entity;
pub mod entity_config;
pub mod list_config;
pub mod operation;
