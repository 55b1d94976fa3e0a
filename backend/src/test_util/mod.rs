//! Shared helpers for unit and integration tests.

use std::sync::Arc;

use crate::auth::MockVerifier;
use crate::config::Config;
use crate::store::Database;
use crate::AppState;

pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 8080,
        environment: "dev".to_string(),
        testing: true,
        database_url: ":memory:".to_string(),
        database_test_url: None,
        azure_tenant_id: "test-tenant".to_string(),
        azure_client_id: "test-client".to_string(),
        cors_origins: "*".to_string(),
        use_mock_auth: true,
        log_level: "debug".to_string(),
    }
}

/// State with mock auth and an in-memory database.
pub fn create_test_state() -> Arc<AppState> {
    let config = test_config();
    let db = Database::open(&config.database_url).expect("in-memory database");
    Arc::new(AppState {
        config,
        verifier: Arc::new(MockVerifier),
        db,
    })
}

/// Bearer token accepted by the mock verifier.
pub fn mock_token(email: &str, role: &str) -> String {
    format!("Bearer mock:{}:{}", email, role)
}
