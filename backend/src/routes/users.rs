//! User management API routes.
//!
//! Provides:
//! - Self-registration for authenticated tenant users (`/users/register`)
//! - Current-user lookup (`/users/me`)
//! - Admin-only user management (list, view, update role, delete)
//!
//! `/register` and `/me` verify the token without the implicit login
//! upsert, so "registered" stays an observable state.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};

use crate::auth::resolve_current_user;
use crate::authz;
use crate::error::{ApiError, ApiResult};
use crate::models::user::{Role, UserListResponse, UserResponse, UserUpdatePayload};
use crate::AppState;

/// Parse a path id ourselves so a non-integer id gets the taxonomy's 422
/// `{"detail": ...}` body, not the extractor's plain 400.
fn parse_id(raw: &str) -> ApiResult<i64> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id >= 1)
        .ok_or_else(|| {
            ApiError::Validation(format!("User id must be a positive integer, got {}", raw))
        })
}

/// POST /users/register - register the authenticated principal.
async fn register(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    let claims = state.verifier.verify(&headers).await?;

    if state.db.find_user_by_subject(&claims.subject)?.is_some() {
        return Err(ApiError::Validation("User already registered".to_string()));
    }

    let role = claims.resolved_role();
    let user = state
        .db
        .upsert_login(&claims.subject, claims.email_or_subject(), role)?;

    tracing::info!(user_id = user.id, role = %user.role, "Registered user");

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// GET /users/me - current user's profile, 404 if not registered.
async fn me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<UserResponse>> {
    let claims = state.verifier.verify(&headers).await?;

    let user = state.db.find_user_by_subject(&claims.subject)?.ok_or_else(|| {
        ApiError::NotFound(
            "User not registered. Please register first at /users/register".to_string(),
        )
    })?;

    Ok(Json(user.into()))
}

/// GET /users/ - list all users. Admin only.
async fn list_users(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<UserListResponse>> {
    let requester = resolve_current_user(state.verifier.as_ref(), &state.db, &headers).await?;
    authz::require_admin(&requester)?;

    let users: Vec<UserResponse> = state
        .db
        .list_users()?
        .into_iter()
        .map(UserResponse::from)
        .collect();
    let total = users.len();

    Ok(Json(UserListResponse { users, total }))
}

/// GET /users/{id} - fetch one user. Admin only.
async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<UserResponse>> {
    let requester = resolve_current_user(state.verifier.as_ref(), &state.db, &headers).await?;
    authz::require_admin(&requester)?;
    let user_id = parse_id(&user_id)?;

    let user = state
        .db
        .get_user(user_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user.into()))
}

/// PUT /users/{id} - update a user's role. Admin only.
async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<UserUpdatePayload>,
) -> ApiResult<Json<UserResponse>> {
    let requester = resolve_current_user(state.verifier.as_ref(), &state.db, &headers).await?;
    authz::require_admin(&requester)?;
    let user_id = parse_id(&user_id)?;

    let role = Role::parse(&payload.role).ok_or_else(|| {
        ApiError::Validation("Invalid role. Must be one of: admin, writer, reader".to_string())
    })?;

    if !state.db.set_user_role(user_id, role)? {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    tracing::info!(user_id, role = %role, admin_id = requester.id, "Updated user role");

    let user = state
        .db
        .get_user(user_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user.into()))
}

/// DELETE /users/{id} - delete a user. Admin only, never yourself.
async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    let requester = resolve_current_user(state.verifier.as_ref(), &state.db, &headers).await?;
    authz::require_admin(&requester)?;
    let user_id = parse_id(&user_id)?;

    if user_id == requester.id {
        return Err(ApiError::Forbidden("Cannot delete yourself".to_string()));
    }

    if !state.db.delete_user(user_id)? {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    tracing::info!(user_id, admin_id = requester.id, "Deleted user");

    Ok(StatusCode::NO_CONTENT)
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/users/register", post(register))
        .route("/users/me", get(me))
        .route("/users/", get(list_users))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .with_state(state)
}
