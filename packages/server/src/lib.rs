pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod seed;
pub mod services;
pub mod state;
pub mod utils;

use std::time::Duration;

use axum::http::{HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_scalar::{Scalar, Servable as ScalarServable};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::CorsConfig;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tally API",
        version = "1.0.0",
        description = "User-defined entity types with typed properties, tags and saved list queries"
    ),
    paths(
        handlers::entity::list_entities,
        handlers::entity::create_entity,
        handlers::entity::get_entity,
        handlers::entity::update_entity,
        handlers::entity::delete_entity,
        handlers::operation::apply_operation,
        handlers::entity_config::create_entity_config,
        handlers::entity_config::list_entity_configs,
        handlers::entity_config::get_entity_config,
        handlers::entity_config::update_entity_config,
        handlers::entity_config::delete_entity_config,
        handlers::entity_config::create_property_config,
        handlers::entity_config::update_property_config,
        handlers::entity_config::delete_property_config,
        handlers::entity_config::reorder_property_configs,
        handlers::list_config::create_list_config,
        handlers::list_config::list_list_configs,
        handlers::list_config::get_list_config,
        handlers::list_config::update_list_config,
        handlers::list_config::delete_list_config,
        handlers::list_config::apply_list_config,
    ),
    tags(
        (name = "Entities", description = "Entity CRUD and filtered listing"),
        (name = "Entity Configs", description = "User-defined entity types"),
        (name = "Property Configs", description = "Typed property slots of an entity config"),
        (name = "List Configs", description = "Saved filter and sort presets"),
    ),
    modifiers(&SecurityAddon),
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();
        components.add_security_scheme(
            "jwt",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(config.max_age));

    if config.allow_origins.iter().any(|o| o == "*") {
        cors.allow_origin(AllowOrigin::any())
    } else {
        let origins: Vec<HeaderValue> = config
            .allow_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let api = ApiDoc::openapi();
    let cors = cors_layer(&state.config.server.cors);

    axum::Router::new()
        .nest("/api", routes::api_routes())
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api.clone()))
        .merge(Scalar::with_url("/scalar", api))
        .layer(cors)
}
