use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::{AppJson, AppQuery};
use crate::models::entity::*;
use crate::services::{EntityService, ListParams, ListService};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/entities",
    tag = "Entities",
    operation_id = "listEntities",
    summary = "List entities with filter, sort and context windows",
    description = "Returns a page of the caller's entities with all typed properties and tags. `filter`, `sort` and `context` are JSON documents passed as query parameters. When `context` is given, every item also gets the entities created within that window before or after it.",
    params(EntityListQuery),
    responses(
        (status = 200, description = "Page of entities", body = EntityListResponse),
        (status = 400, description = "Malformed filter, sort or context (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = auth_user.user_id))]
pub async fn list_entities(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<EntityListQuery>,
) -> Result<Json<EntityListResponse>, AppError> {
    let cfg = &state.config.query;
    let params = ListParams {
        user_id: auth_user.user_id,
        filter: query.parse_filter()?,
        sort: query.parse_sort()?,
        context: query.parse_context()?,
        start: query.start.unwrap_or(0),
        per_page: query
            .per_page
            .unwrap_or(cfg.default_per_page)
            .clamp(1, cfg.max_per_page.max(1)),
    };

    let list = ListService::new(&state.db, cfg).get_list(params).await?;
    Ok(Json(list))
}

#[utoipa::path(
    post,
    path = "/api/v1/entities",
    tag = "Entities",
    operation_id = "createEntity",
    summary = "Create an entity",
    description = "Creates an entity of one of the caller's entity configs, with its tags and property values, in a single transaction. Property values are checked against their config's data type and cardinality before anything is written.",
    request_body = CreateEntityRequest,
    responses(
        (status = 201, description = "Entity created", body = EntityResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Entity config not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn create_entity(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateEntityRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_entity(&payload)?;

    let entity = EntityService::new(&state.db, &state.config.query)
        .create_entity(auth_user.user_id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(entity)))
}

#[utoipa::path(
    get,
    path = "/api/v1/entities/{id}",
    tag = "Entities",
    operation_id = "getEntity",
    summary = "Get an entity by ID",
    params(("id" = i32, Path, description = "Entity ID")),
    responses(
        (status = 200, description = "Entity", body = EntityResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Entity not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_entity(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<EntityResponse>, AppError> {
    let entity = EntityService::new(&state.db, &state.config.query)
        .get_entity(auth_user.user_id, id)
        .await?;
    Ok(Json(entity))
}

#[utoipa::path(
    put,
    path = "/api/v1/entities/{id}",
    tag = "Entities",
    operation_id = "updateEntity",
    summary = "Replace an entity's tags and properties",
    description = "Properties carrying an `id` are updated in place; properties without one are created. Stored values whose ids are missing from the payload are deleted.",
    params(("id" = i32, Path, description = "Entity ID")),
    request_body = UpdateEntityRequest,
    responses(
        (status = 200, description = "Entity updated", body = EntityResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Entity or property value not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_entity(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateEntityRequest>,
) -> Result<Json<EntityResponse>, AppError> {
    validate_update_entity(&payload)?;

    let entity = EntityService::new(&state.db, &state.config.query)
        .update_entity(auth_user.user_id, id, payload)
        .await?;
    Ok(Json(entity))
}

#[utoipa::path(
    delete,
    path = "/api/v1/entities/{id}",
    tag = "Entities",
    operation_id = "deleteEntity",
    summary = "Delete an entity",
    description = "Deletes the entity with its tags and property values and returns the deleted representation.",
    params(("id" = i32, Path, description = "Entity ID")),
    responses(
        (status = 200, description = "Deleted entity", body = EntityResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Entity not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_entity(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<EntityResponse>, AppError> {
    let entity = EntityService::new(&state.db, &state.config.query)
        .delete_entity(auth_user.user_id, id)
        .await?;
    Ok(Json(entity))
}
