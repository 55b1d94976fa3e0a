//! Mapping of provider-asserted roles and groups to application roles.

use crate::models::user::Role;

/// Substring designators for the admin tier. Matches Azure app roles like
/// "admin" or "Administrator" and groups like "fastapi-admins" or
/// "system-administrators".
const ADMIN_DESIGNATORS: &[&str] = &["admin"];

/// Substring designators for the writer tier. Matches roles like "writer"
/// or "Editor" and groups like "content-editors".
const WRITER_DESIGNATORS: &[&str] = &["writer", "editor"];

/// Resolve provider claims to exactly one application role.
///
/// Case-insensitive substring match, admin tier first. Unrecognized
/// entries are ignored; no recognized entry at all means `reader`. Pure
/// and total: never fails, never performs I/O.
pub fn resolve_role(roles: &[String], groups: &[String]) -> Role {
    if matches_any(roles, groups, ADMIN_DESIGNATORS) {
        Role::Admin
    } else if matches_any(roles, groups, WRITER_DESIGNATORS) {
        Role::Writer
    } else {
        Role::Reader
    }
}

fn matches_any(roles: &[String], groups: &[String], designators: &[&str]) -> bool {
    roles
        .iter()
        .chain(groups.iter())
        .map(|claim| claim.to_lowercase())
        .any(|claim| designators.iter().any(|d| claim.contains(d)))
}
