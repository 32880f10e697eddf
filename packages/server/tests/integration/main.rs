mod common;
mod list;
mod list_config;
mod operation;
