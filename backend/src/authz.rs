//! Ownership-based authorization policy.
//!
//! Pure decisions over (requester role, requester id, resource owner id).
//! Listing is a filtering operation: rows the requester may not see are
//! excluded from the result set, never a 403. Accessing a specific foreign
//! row by id is an explicit authorization failure for non-admins, and a 404
//! when the id does not exist at all, regardless of role.

use crate::error::ApiError;
use crate::models::user::{CurrentUser, Role};

/// Whether this role may create summaries. The creator always becomes the
/// owner; ownership is taken from the authenticated context, never from
/// client input.
pub fn can_create(role: Role) -> bool {
    matches!(role, Role::Admin | Role::Writer)
}

/// Whether the requester may act on a specific row owned by `owner_id`.
/// Covers read-by-id, update and delete: admins on any row, writers and
/// readers only on their own.
pub fn owns_or_admin(requester: &CurrentUser, owner_id: i64) -> bool {
    requester.role == Role::Admin || requester.id == owner_id
}

/// Whether list results are unfiltered for this role.
pub fn sees_all(role: Role) -> bool {
    role == Role::Admin
}

/// The owner filter to apply to a list query: `None` means all rows.
pub fn list_filter(requester: &CurrentUser) -> Option<i64> {
    if sees_all(requester.role) {
        None
    } else {
        Some(requester.id)
    }
}

/// Gate creation, turning a denial into the boundary error.
pub fn require_create(requester: &CurrentUser) -> Result<(), ApiError> {
    if can_create(requester.role) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "Access denied. Writers and admins only.".to_string(),
        ))
    }
}

/// Gate row-level access, turning a denial into the boundary error.
pub fn require_owner_or_admin(requester: &CurrentUser, owner_id: i64) -> Result<(), ApiError> {
    if owns_or_admin(requester, owner_id) {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Access denied".to_string()))
    }
}

/// Gate admin-only endpoints.
pub fn require_admin(requester: &CurrentUser) -> Result<(), ApiError> {
    if requester.role == Role::Admin {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Admin access required".to_string()))
    }
}
