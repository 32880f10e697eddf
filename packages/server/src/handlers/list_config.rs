use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::*;
use tracing::instrument;

use crate::entity::list_config;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::{AppJson, AppQuery};
use crate::models::entity::EntityListResponse;
use crate::models::list_config::*;
use crate::services::{ListParams, ListService};
use crate::state::AppState;

fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, AppError> {
    serde_json::to_value(value).map_err(|e| AppError::Internal(e.to_string()))
}

#[utoipa::path(
    post,
    path = "/api/v1/list-configs",
    tag = "List Configs",
    operation_id = "createListConfig",
    summary = "Save a list preset",
    request_body = ListConfigRequest,
    responses(
        (status = 201, description = "List config created", body = ListConfigResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(name = %payload.name))]
pub async fn create_list_config(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<ListConfigRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_list_config(&payload, state.config.query.max_per_page)?;

    let now = chrono::Utc::now();
    let model = list_config::ActiveModel {
        user_id: Set(auth_user.user_id),
        name: Set(payload.name.trim().to_string()),
        description: Set(payload.description),
        filter: Set(to_json(&payload.filter)?),
        sort: Set(to_json(&payload.sort)?),
        per_page: Set(payload
            .per_page
            .unwrap_or(state.config.query.default_per_page as i32)),
        is_public: Set(payload.is_public),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(ListConfigResponse::try_from(model)?)))
}

#[utoipa::path(
    get,
    path = "/api/v1/list-configs",
    tag = "List Configs",
    operation_id = "listListConfigs",
    summary = "List the caller's list presets",
    responses(
        (status = 200, description = "List configs ordered by name", body = Vec<ListConfigResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn list_list_configs(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<ListConfigResponse>>, AppError> {
    let models = list_config::Entity::find()
        .filter(list_config::Column::UserId.eq(auth_user.user_id))
        .order_by_asc(list_config::Column::Name)
        .order_by_asc(list_config::Column::Id)
        .all(&state.db)
        .await?;

    let data = models
        .into_iter()
        .map(ListConfigResponse::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(data))
}

#[utoipa::path(
    get,
    path = "/api/v1/list-configs/{id}",
    tag = "List Configs",
    operation_id = "getListConfig",
    summary = "Get a list preset by ID",
    params(("id" = i32, Path, description = "List config ID")),
    responses(
        (status = 200, description = "List config", body = ListConfigResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "List config not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_list_config(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ListConfigResponse>, AppError> {
    let model = find_list_config(&state.db, auth_user.user_id, id).await?;
    Ok(Json(model.try_into()?))
}

#[utoipa::path(
    put,
    path = "/api/v1/list-configs/{id}",
    tag = "List Configs",
    operation_id = "updateListConfig",
    summary = "Replace a list preset",
    params(("id" = i32, Path, description = "List config ID")),
    request_body = ListConfigRequest,
    responses(
        (status = 200, description = "List config updated", body = ListConfigResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "List config not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_list_config(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<ListConfigRequest>,
) -> Result<Json<ListConfigResponse>, AppError> {
    validate_list_config(&payload, state.config.query.max_per_page)?;

    let existing = find_list_config(&state.db, auth_user.user_id, id).await?;
    let per_page = payload.per_page.unwrap_or(existing.per_page);
    let mut active: list_config::ActiveModel = existing.into();
    active.name = Set(payload.name.trim().to_string());
    active.description = Set(payload.description);
    active.filter = Set(to_json(&payload.filter)?);
    active.sort = Set(to_json(&payload.sort)?);
    active.per_page = Set(per_page);
    active.is_public = Set(payload.is_public);
    active.updated_at = Set(chrono::Utc::now());
    let model = active.update(&state.db).await?;

    Ok(Json(model.try_into()?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/list-configs/{id}",
    tag = "List Configs",
    operation_id = "deleteListConfig",
    summary = "Delete a list preset",
    params(("id" = i32, Path, description = "List config ID")),
    responses(
        (status = 204, description = "List config deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "List config not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_list_config(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    find_list_config(&state.db, auth_user.user_id, id).await?;
    list_config::Entity::delete_by_id(id).exec(&state.db).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/lists/{id}/entities",
    tag = "List Configs",
    operation_id = "applyListConfig",
    summary = "List entities through a saved preset",
    description = "Applies the preset's filter and sort to its owner's entities. Public presets can be read by anyone, including anonymous callers; private ones only by their owner.",
    params(
        ("id" = i32, Path, description = "List config ID"),
        ListPresetQuery,
    ),
    responses(
        (status = 200, description = "Page of entities", body = EntityListResponse),
        (status = 400, description = "Malformed context (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Invalid token (TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Private list of another user (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "List config not found (NOT_FOUND)", body = ErrorBody),
    ),
    security((), ("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(id))]
pub async fn apply_list_config(
    auth_user: Option<AuthUser>,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppQuery(query): AppQuery<ListPresetQuery>,
) -> Result<Json<EntityListResponse>, AppError> {
    let preset = list_config::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("List {id} not found")))?;

    if !preset.is_public {
        let user = auth_user.ok_or(AppError::TokenMissing)?;
        user.require_owner(preset.user_id)?;
    }

    let (filter, sort) = decode_preset(&preset)?;
    let cfg = &state.config.query;
    let per_page = query
        .per_page
        .unwrap_or(std::cmp::Ord::max(preset.per_page, 1) as u64)
        .clamp(1, std::cmp::Ord::max(cfg.max_per_page, 1));

    let params = ListParams {
        user_id: preset.user_id,
        filter,
        sort,
        context: query.parse_context()?,
        start: query.start.unwrap_or(0),
        per_page,
    };
    let list = ListService::new(&state.db, cfg).get_list(params).await?;
    Ok(Json(list))
}

async fn find_list_config(
    db: &DatabaseConnection,
    user_id: i32,
    id: i32,
) -> Result<list_config::Model, AppError> {
    list_config::Entity::find_by_id(id)
        .filter(list_config::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("List config {id} not found")))
}
