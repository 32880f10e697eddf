use axum::Json;
use axum::extract::State;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::operation::*;
use crate::services::EntityService;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/api/v1/operations",
    tag = "Entities",
    operation_id = "applyBulkOperation",
    summary = "Delete or retag several entities at once",
    description = "Applies `DELETE`, `ADD_TAGS`, `REMOVE_TAGS` or `REPLACE_TAGS` to every listed entity in one transaction. If any id is not one of the caller's entities, nothing is changed.",
    request_body = BulkOperationRequest,
    responses(
        (status = 200, description = "Operation applied", body = BulkOperationResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Entity not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn apply_operation(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<BulkOperationRequest>,
) -> Result<Json<BulkOperationResponse>, AppError> {
    validate_bulk_operation(&payload)?;

    let result = EntityService::new(&state.db, &state.config.query)
        .apply_operation(auth_user.user_id, payload)
        .await?;
    Ok(Json(result))
}
