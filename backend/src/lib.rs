pub mod auth;
pub mod authz;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod routes;
pub mod store;
pub mod test_util;

pub use auth::{JwksVerifier, MockVerifier, TokenVerifier};
pub use config::Config;
pub use error::ApiError;
pub use models::user::{CurrentUser, Role};
pub use store::Database;

use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    /// Token verifier selected once at startup; mock or JWKS-backed.
    pub verifier: Arc<dyn TokenVerifier>,
    pub db: Database,
}
