use std::collections::{HashMap, HashSet};

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr};
use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::{entity_config, entity_item, property_config};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::{AppJson, AppQuery};
use crate::models::entity_config::*;
use crate::models::shared::escape_like;
use crate::services::PropertySyncEngine;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/api/v1/entity-configs",
    tag = "Entity Configs",
    operation_id = "createEntityConfig",
    summary = "Create an entity config",
    description = "Creates an entity config owned by the caller, optionally together with its property configs and their default values.",
    request_body = CreateEntityConfigRequest,
    responses(
        (status = 201, description = "Entity config created", body = EntityConfigResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(name = %payload.name))]
pub async fn create_entity_config(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateEntityConfigRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_entity_config(&payload)?;

    let txn = state.db.begin().await?;
    if let Some(rev) = payload.revision_of {
        find_entity_config(&txn, auth_user.user_id, rev).await?;
    }

    let now = chrono::Utc::now();
    let config = entity_config::ActiveModel {
        user_id: Set(auth_user.user_id),
        name: Set(payload.name.trim().to_string()),
        description: Set(payload.description),
        revision_of: Set(payload.revision_of),
        allow_property_ordering: Set(payload.allow_property_ordering),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let engine = PropertySyncEngine::new(&txn, state.config.query.server_utc_offset_minutes);
    for (index, property) in payload.properties.into_iter().enumerate() {
        let position = property.position.unwrap_or(index as i32);
        insert_property_config(&txn, &engine, &config, property, position).await?;
    }

    let response = load_entity_config(&txn, &engine, config).await?;
    txn.commit().await?;

    info!(id = response.id, "Entity config created");
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    get,
    path = "/api/v1/entity-configs",
    tag = "Entity Configs",
    operation_id = "listEntityConfigs",
    summary = "List the caller's entity configs",
    description = "Returns every entity config of the caller ordered by name, with property configs and defaults. `name` filters by case-insensitive substring.",
    params(EntityConfigListQuery),
    responses(
        (status = 200, description = "Entity configs", body = Vec<EntityConfigResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_entity_configs(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<EntityConfigListQuery>,
) -> Result<Json<Vec<EntityConfigResponse>>, AppError> {
    let mut select =
        entity_config::Entity::find().filter(entity_config::Column::UserId.eq(auth_user.user_id));

    if let Some(ref name) = query.name {
        let term = escape_like(name.trim());
        if !term.is_empty() {
            select = select.filter(
                Expr::expr(Func::lower(Expr::col(entity_config::Column::Name)))
                    .like(LikeExpr::new(format!("%{}%", term.to_lowercase())).escape('\\')),
            );
        }
    }

    let configs = select
        .order_by_asc(entity_config::Column::Name)
        .order_by_asc(entity_config::Column::Id)
        .all(&state.db)
        .await?;

    let ids: Vec<i32> = configs.iter().map(|c| c.id).collect();
    let properties = property_config::Entity::find()
        .filter(property_config::Column::EntityConfigId.is_in(ids))
        .order_by_asc(property_config::Column::Position)
        .order_by_asc(property_config::Column::Id)
        .all(&state.db)
        .await?;

    let engine = PropertySyncEngine::new(&state.db, state.config.query.server_utc_offset_minutes);
    let mut defaults = engine.default_values(&properties).await?;

    let mut grouped: HashMap<i32, Vec<PropertyConfigResponse>> = HashMap::new();
    for p in properties {
        let default_value = defaults.remove(&p.id);
        grouped
            .entry(p.entity_config_id)
            .or_default()
            .push(PropertyConfigResponse::new(p, default_value));
    }

    let data = configs
        .into_iter()
        .map(|c| {
            let props = grouped.remove(&c.id).unwrap_or_default();
            EntityConfigResponse::new(c, props)
        })
        .collect();
    Ok(Json(data))
}

#[utoipa::path(
    get,
    path = "/api/v1/entity-configs/{id}",
    tag = "Entity Configs",
    operation_id = "getEntityConfig",
    summary = "Get an entity config by ID",
    params(("id" = i32, Path, description = "Entity config ID")),
    responses(
        (status = 200, description = "Entity config", body = EntityConfigResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Entity config not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_entity_config(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<EntityConfigResponse>, AppError> {
    let config = find_entity_config(&state.db, auth_user.user_id, id).await?;
    let engine = PropertySyncEngine::new(&state.db, state.config.query.server_utc_offset_minutes);
    Ok(Json(load_entity_config(&state.db, &engine, config).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/entity-configs/{id}",
    tag = "Entity Configs",
    operation_id = "updateEntityConfig",
    summary = "Update an entity config",
    description = "Partially updates an entity config using PATCH semantics. `description: null` clears the description.",
    params(("id" = i32, Path, description = "Entity config ID")),
    request_body = UpdateEntityConfigRequest,
    responses(
        (status = 200, description = "Entity config updated", body = EntityConfigResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Entity config not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_entity_config(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateEntityConfigRequest>,
) -> Result<Json<EntityConfigResponse>, AppError> {
    validate_update_entity_config(&payload)?;
    let engine = PropertySyncEngine::new(&state.db, state.config.query.server_utc_offset_minutes);

    if payload == UpdateEntityConfigRequest::default() {
        let existing = find_entity_config(&state.db, auth_user.user_id, id).await?;
        return Ok(Json(load_entity_config(&state.db, &engine, existing).await?));
    }

    let existing = find_entity_config(&state.db, auth_user.user_id, id).await?;
    let mut active: entity_config::ActiveModel = existing.into();
    if let Some(ref name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(allow) = payload.allow_property_ordering {
        active.allow_property_ordering = Set(allow);
    }
    active.updated_at = Set(chrono::Utc::now());
    let model = active.update(&state.db).await?;

    Ok(Json(load_entity_config(&state.db, &engine, model).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/entity-configs/{id}",
    tag = "Entity Configs",
    operation_id = "deleteEntityConfig",
    summary = "Delete an entity config",
    description = "Deletes an entity config with its property configs and their default values. Returns 409 CONFLICT while entities of this config exist.",
    params(("id" = i32, Path, description = "Entity config ID")),
    responses(
        (status = 204, description = "Entity config deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Entity config not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Entities still use this config (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_entity_config(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let txn = state.db.begin().await?;
    find_entity_config(&txn, auth_user.user_id, id).await?;

    let entity_count = entity_item::Entity::find()
        .filter(entity_item::Column::EntityConfigId.eq(id))
        .count(&txn)
        .await?;
    if entity_count > 0 {
        return Err(AppError::Conflict(format!(
            "Cannot delete entity config used by {entity_count} entities"
        )));
    }

    let engine = PropertySyncEngine::new(&txn, state.config.query.server_utc_offset_minutes);
    let properties = property_config::Entity::find()
        .filter(property_config::Column::EntityConfigId.eq(id))
        .all(&txn)
        .await?;
    for p in &properties {
        engine.clear_default_value(p).await?;
    }
    property_config::Entity::delete_many()
        .filter(property_config::Column::EntityConfigId.eq(id))
        .exec(&txn)
        .await?;
    entity_config::Entity::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/entity-configs/{id}/properties",
    tag = "Property Configs",
    operation_id = "createPropertyConfig",
    summary = "Add a property config to an entity config",
    description = "Creates a typed property slot. Position defaults to the end of the list. `defaultValue` must match `dataType`.",
    params(("id" = i32, Path, description = "Entity config ID")),
    request_body = CreatePropertyConfigRequest,
    responses(
        (status = 201, description = "Property config created", body = PropertyConfigResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Entity config not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(entity_config_id))]
pub async fn create_property_config(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(entity_config_id): Path<i32>,
    AppJson(payload): AppJson<CreatePropertyConfigRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_property_config(&payload)?;

    let txn = state.db.begin().await?;
    let config = find_entity_config(&txn, auth_user.user_id, entity_config_id).await?;

    let position = match payload.position {
        Some(p) => p,
        None => property_config::Entity::find()
            .filter(property_config::Column::EntityConfigId.eq(entity_config_id))
            .count(&txn)
            .await? as i32,
    };

    let engine = PropertySyncEngine::new(&txn, state.config.query.server_utc_offset_minutes);
    let property = insert_property_config(&txn, &engine, &config, payload, position).await?;
    let mut defaults = engine.default_values(std::slice::from_ref(&property)).await?;
    let default_value = defaults.remove(&property.id);

    txn.commit().await?;
    Ok((
        StatusCode::CREATED,
        Json(PropertyConfigResponse::new(property, default_value)),
    ))
}

#[utoipa::path(
    patch,
    path = "/api/v1/entity-configs/{id}/properties/{pid}",
    tag = "Property Configs",
    operation_id = "updatePropertyConfig",
    summary = "Update a property config",
    description = "Partially updates a property config. Changing `dataType` is rejected with 409 CONFLICT. `defaultValue: null` clears the default.",
    params(
        ("id" = i32, Path, description = "Entity config ID"),
        ("pid" = i32, Path, description = "Property config ID"),
    ),
    request_body = UpdatePropertyConfigRequest,
    responses(
        (status = 200, description = "Property config updated", body = PropertyConfigResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Property config not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Data type change attempted (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(entity_config_id, pid))]
pub async fn update_property_config(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((entity_config_id, pid)): Path<(i32, i32)>,
    AppJson(payload): AppJson<UpdatePropertyConfigRequest>,
) -> Result<Json<PropertyConfigResponse>, AppError> {
    let txn = state.db.begin().await?;
    let existing = find_property_config(&txn, auth_user.user_id, entity_config_id, pid).await?;
    validate_update_property_config(&existing, &payload)?;

    let engine = PropertySyncEngine::new(&txn, state.config.query.server_utc_offset_minutes);
    match payload.default_value {
        Some(Some(ref value)) => {
            engine
                .set_default_from_json(&existing, value, payload.time_zone)
                .await?
        }
        Some(None) => engine.clear_default_value(&existing).await?,
        None => {}
    }

    let mut active: property_config::ActiveModel = existing.into();
    if let Some(ref name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(render_type) = payload.render_type {
        active.render_type = Set(render_type);
    }
    if let Some(required) = payload.required {
        active.required = Set(required);
    }
    if let Some(repeat) = payload.repeat {
        active.repeat = Set(repeat);
    }
    if let Some(allowed) = payload.allowed {
        active.allowed = Set(allowed);
    }
    if let Some(prefix) = payload.prefix {
        active.prefix = Set(prefix);
    }
    if let Some(suffix) = payload.suffix {
        active.suffix = Set(suffix);
    }
    if let Some(hidden) = payload.hidden {
        active.hidden = Set(hidden);
    }
    active.updated_at = Set(chrono::Utc::now());
    let model = active.update(&txn).await?;

    let mut defaults = engine.default_values(std::slice::from_ref(&model)).await?;
    let default_value = defaults.remove(&model.id);
    txn.commit().await?;

    Ok(Json(PropertyConfigResponse::new(model, default_value)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/entity-configs/{id}/properties/{pid}",
    tag = "Property Configs",
    operation_id = "deletePropertyConfig",
    summary = "Delete a property config",
    description = "Deletes a property config and its default value. Returns 409 CONFLICT while entities hold values for it.",
    params(
        ("id" = i32, Path, description = "Entity config ID"),
        ("pid" = i32, Path, description = "Property config ID"),
    ),
    responses(
        (status = 204, description = "Property config deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Property config not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Entities still hold values (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(entity_config_id, pid))]
pub async fn delete_property_config(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((entity_config_id, pid)): Path<(i32, i32)>,
) -> Result<impl IntoResponse, AppError> {
    let txn = state.db.begin().await?;
    let existing = find_property_config(&txn, auth_user.user_id, entity_config_id, pid).await?;

    let engine = PropertySyncEngine::new(&txn, state.config.query.server_utc_offset_minutes);
    let in_use = engine.count_config_links(&existing).await?;
    if in_use > 0 {
        return Err(AppError::Conflict(format!(
            "Cannot delete property config with {in_use} stored values"
        )));
    }

    engine.clear_default_value(&existing).await?;
    property_config::Entity::delete_by_id(existing.id)
        .exec(&txn)
        .await?;

    txn.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/api/v1/entity-configs/{id}/properties/order",
    tag = "Property Configs",
    operation_id = "reorderPropertyConfigs",
    summary = "Set display positions of property configs",
    description = "Takes `[{id, order}]`; every id must belong to the entity config. Configs not listed keep their position.",
    params(("id" = i32, Path, description = "Entity config ID")),
    request_body = Vec<PropertyOrderItem>,
    responses(
        (status = 200, description = "Updated entity config", body = EntityConfigResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Entity config not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(entity_config_id, count = payload.len()))]
pub async fn reorder_property_configs(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(entity_config_id): Path<i32>,
    AppJson(payload): AppJson<Vec<PropertyOrderItem>>,
) -> Result<Json<EntityConfigResponse>, AppError> {
    validate_reorder(&payload)?;

    let txn = state.db.begin().await?;
    let config = find_entity_config(&txn, auth_user.user_id, entity_config_id).await?;

    let owned: HashSet<i32> = property_config::Entity::find()
        .filter(property_config::Column::EntityConfigId.eq(entity_config_id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|p| p.id)
        .collect();
    if let Some(stray) = payload.iter().find(|item| !owned.contains(&item.id)) {
        return Err(AppError::Validation(format!(
            "Property config {} does not belong to entity config {entity_config_id}",
            stray.id
        )));
    }

    let now = chrono::Utc::now();
    for item in &payload {
        property_config::ActiveModel {
            id: Unchanged(item.id),
            position: Set(item.order),
            updated_at: Set(now),
            ..Default::default()
        }
        .update(&txn)
        .await?;
    }

    let engine = PropertySyncEngine::new(&txn, state.config.query.server_utc_offset_minutes);
    let response = load_entity_config(&txn, &engine, config).await?;
    txn.commit().await?;
    Ok(Json(response))
}

async fn find_entity_config<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    id: i32,
) -> Result<entity_config::Model, AppError> {
    entity_config::Entity::find_by_id(id)
        .filter(entity_config::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Entity config {id} not found")))
}

async fn find_property_config<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    entity_config_id: i32,
    id: i32,
) -> Result<property_config::Model, AppError> {
    property_config::Entity::find_by_id(id)
        .filter(property_config::Column::EntityConfigId.eq(entity_config_id))
        .filter(property_config::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Property config {id} not found")))
}

async fn insert_property_config<C>(
    txn: &C,
    engine: &PropertySyncEngine<'_, C>,
    config: &entity_config::Model,
    payload: CreatePropertyConfigRequest,
    position: i32,
) -> Result<property_config::Model, AppError>
where
    C: ConnectionTrait + TransactionTrait,
{
    let now = chrono::Utc::now();
    let model = property_config::ActiveModel {
        user_id: Set(config.user_id),
        entity_config_id: Set(config.id),
        name: Set(payload.name.trim().to_string()),
        data_type: Set(payload.data_type),
        render_type: Set(payload.render_type),
        required: Set(payload.required),
        repeat: Set(payload.repeat),
        allowed: Set(payload.allowed),
        prefix: Set(payload.prefix),
        suffix: Set(payload.suffix),
        hidden: Set(payload.hidden),
        position: Set(position),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(txn)
    .await?;

    if let Some(ref value) = payload.default_value {
        engine
            .set_default_from_json(&model, value, payload.time_zone)
            .await?;
    }
    Ok(model)
}

async fn load_entity_config<C>(
    db: &C,
    engine: &PropertySyncEngine<'_, C>,
    config: entity_config::Model,
) -> Result<EntityConfigResponse, AppError>
where
    C: ConnectionTrait + TransactionTrait,
{
    let properties = property_config::Entity::find()
        .filter(property_config::Column::EntityConfigId.eq(config.id))
        .order_by_asc(property_config::Column::Position)
        .order_by_asc(property_config::Column::Id)
        .all(db)
        .await?;
    let mut defaults = engine.default_values(&properties).await?;

    let properties = properties
        .into_iter()
        .map(|p| {
            let default_value = defaults.remove(&p.id);
            PropertyConfigResponse::new(p, default_value)
        })
        .collect();
    Ok(EntityConfigResponse::new(config, properties))
}
