//! Authentication: token verification and principal resolution.
//!
//! Two verifier implementations sit behind one trait, selected once at
//! startup from config: real JWKS-backed JWT validation, or mock tokens
//! for local development. Request handlers only ever see the trait.

pub mod jwks;
pub mod mock;
pub mod roles;

use axum::http::HeaderMap;

use crate::error::ApiError;
use crate::models::user::{CurrentUser, Role};
use crate::store::Database;

pub use jwks::JwksVerifier;
pub use mock::MockVerifier;
pub use roles::resolve_role;

/// Claims extracted from a validated token. Raw role/group strings never
/// travel past the role resolver.
#[derive(Debug, Clone)]
pub struct TokenClaims {
    /// Stable subject identifier from the provider.
    pub subject: String,
    pub email: Option<String>,
    /// App roles asserted by the provider.
    pub roles: Vec<String>,
    /// Directory groups asserted by the provider.
    pub groups: Vec<String>,
}

impl TokenClaims {
    /// The role this token resolves to.
    pub fn resolved_role(&self) -> Role {
        resolve_role(&self.roles, &self.groups)
    }

    /// Best email we have for this principal; falls back to the subject
    /// for providers that omit the email claim.
    pub fn email_or_subject(&self) -> &str {
        self.email.as_deref().unwrap_or(&self.subject)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Authentication required")]
    MissingHeader,
    #[error("Invalid Authorization header format")]
    InvalidFormat,
    #[error("Invalid authentication credentials: {0}")]
    InvalidToken(String),
    #[error("JWKS fetch error: {0}")]
    JwksFetchError(String),
    #[error("Key not found for kid: {0}")]
    KeyNotFound(String),
}

/// Verifies the bearer token on a request and returns its claims.
#[async_trait::async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, headers: &HeaderMap) -> Result<TokenClaims, AuthError>;
}

/// Extract the bearer token from the Authorization header.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get("authorization")
        .ok_or(AuthError::MissingHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidFormat)?;

    auth_header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidFormat)
}

/// Resolve the authenticated principal for a protected route.
///
/// Verifies the token, resolves the role from its claims and lazily
/// upserts the local user: email and role are re-synced from the provider
/// and last_login is bumped on every call.
pub async fn resolve_current_user(
    verifier: &dyn TokenVerifier,
    db: &Database,
    headers: &HeaderMap,
) -> Result<CurrentUser, ApiError> {
    let claims = verifier.verify(headers).await?;
    let role = claims.resolved_role();
    let user = db.upsert_login(&claims.subject, claims.email_or_subject(), role)?;
    Ok(CurrentUser {
        id: user.id,
        email: user.email,
        role: user.role,
    })
}
