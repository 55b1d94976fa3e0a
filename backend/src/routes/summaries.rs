//! Summaries API routes.
//!
//! Every route resolves the principal first and passes it explicitly to
//! the policy and store calls. Listing filters foreign rows out of the
//! result set; row-level access to a foreign row is a 403 for non-admins
//! and a 404 when the id does not exist, regardless of role.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};

use crate::auth::resolve_current_user;
use crate::authz;
use crate::error::{ApiError, ApiResult};
use crate::models::summary::{
    validate_url, Summary, SummaryCreatedResponse, SummaryPayload, SummaryUpdatePayload,
    PLACEHOLDER_SUMMARY,
};
use crate::AppState;

/// Parse a path id ourselves so a non-integer or non-positive id gets the
/// taxonomy's 422 `{"detail": ...}` body, not the extractor's plain 400.
fn parse_id(raw: &str) -> ApiResult<i64> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id >= 1)
        .ok_or_else(|| {
            ApiError::Validation(format!("Summary id must be a positive integer, got {}", raw))
        })
}

/// POST /summaries/ - create a summary owned by the requester.
async fn create_summary(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<SummaryPayload>,
) -> ApiResult<(StatusCode, Json<SummaryCreatedResponse>)> {
    let user = resolve_current_user(state.verifier.as_ref(), &state.db, &headers).await?;
    authz::require_create(&user)?;
    validate_url(&payload.url)?;

    // Ownership comes from the authenticated context, never the body.
    let summary_text = payload.summary.as_deref().unwrap_or(PLACEHOLDER_SUMMARY);
    let id = state.db.create_summary(user.id, &payload.url, summary_text)?;

    tracing::info!(summary_id = id, user_id = user.id, "Created summary");

    Ok((
        StatusCode::CREATED,
        Json(SummaryCreatedResponse {
            id,
            url: payload.url,
        }),
    ))
}

/// GET /summaries/ - list summaries visible to the requester.
async fn list_summaries(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<Summary>>> {
    let user = resolve_current_user(state.verifier.as_ref(), &state.db, &headers).await?;
    let summaries = state.db.list_summaries(authz::list_filter(&user))?;
    Ok(Json(summaries))
}

/// GET /summaries/{id}/ - fetch one summary.
async fn read_summary(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<Summary>> {
    let user = resolve_current_user(state.verifier.as_ref(), &state.db, &headers).await?;
    let id = parse_id(&id)?;

    let summary = state
        .db
        .get_summary(id)?
        .ok_or_else(|| ApiError::NotFound("Summary not found".to_string()))?;

    authz::require_owner_or_admin(&user, summary.user_id)?;

    Ok(Json(summary))
}

/// PUT /summaries/{id}/ - update url and summary text.
async fn update_summary(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<SummaryUpdatePayload>,
) -> ApiResult<Json<Summary>> {
    let user = resolve_current_user(state.verifier.as_ref(), &state.db, &headers).await?;
    let id = parse_id(&id)?;
    validate_url(&payload.url)?;

    let existing = state
        .db
        .get_summary(id)?
        .ok_or_else(|| ApiError::NotFound("Summary not found".to_string()))?;

    authz::require_owner_or_admin(&user, existing.user_id)?;

    state.db.update_summary(id, &payload.url, &payload.summary)?;

    let updated = state
        .db
        .get_summary(id)?
        .ok_or_else(|| ApiError::NotFound("Summary not found".to_string()))?;

    Ok(Json(updated))
}

/// DELETE /summaries/{id}/ - hard delete.
async fn delete_summary(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    let user = resolve_current_user(state.verifier.as_ref(), &state.db, &headers).await?;
    let id = parse_id(&id)?;

    let existing = state
        .db
        .get_summary(id)?
        .ok_or_else(|| ApiError::NotFound("Summary not found".to_string()))?;

    authz::require_owner_or_admin(&user, existing.user_id)?;

    state.db.delete_summary(id)?;

    tracing::info!(summary_id = id, user_id = user.id, "Deleted summary");

    Ok(StatusCode::NO_CONTENT)
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/summaries/", get(list_summaries).post(create_summary))
        .route(
            "/summaries/:id/",
            get(read_summary).put(update_summary).delete(delete_summary),
        )
        .with_state(state)
}
