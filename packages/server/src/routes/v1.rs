use axum::{
    Router,
    routing::{get, patch, post, put},
};

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/entities", entity_routes())
        .nest("/entity-configs", entity_config_routes())
        .nest("/list-configs", list_config_routes())
        .route("/operations", post(handlers::operation::apply_operation))
        .route(
            "/lists/{id}/entities",
            get(handlers::list_config::apply_list_config),
        )
}

fn entity_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::entity::list_entities).post(handlers::entity::create_entity),
        )
        .route(
            "/{id}",
            get(handlers::entity::get_entity)
                .put(handlers::entity::update_entity)
                .delete(handlers::entity::delete_entity),
        )
}

fn entity_config_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::entity_config::list_entity_configs)
                .post(handlers::entity_config::create_entity_config),
        )
        .route(
            "/{id}",
            get(handlers::entity_config::get_entity_config)
                .patch(handlers::entity_config::update_entity_config)
                .delete(handlers::entity_config::delete_entity_config),
        )
        .route(
            "/{id}/properties",
            post(handlers::entity_config::create_property_config),
        )
        .route(
            "/{id}/properties/order",
            put(handlers::entity_config::reorder_property_configs),
        )
        .route(
            "/{id}/properties/{pid}",
            patch(handlers::entity_config::update_property_config)
                .delete(handlers::entity_config::delete_property_config),
        )
}

fn list_config_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_config::list_list_configs)
                .post(handlers::list_config::create_list_config),
        )
        .route(
            "/{id}",
            get(handlers::list_config::get_list_config)
                .put(handlers::list_config::update_list_config)
                .delete(handlers::list_config::delete_list_config),
        )
}
