use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host (default: 0.0.0.0)
    pub host: String,
    /// Server port (default: 8080)
    pub port: u16,
    /// Environment name reported by /ping (default: dev)
    pub environment: String,
    /// Testing flag reported by /ping (default: false)
    pub testing: bool,
    /// SQLite database URL
    pub database_url: String,
    /// SQLite database URL used when `testing` is set
    pub database_test_url: Option<String>,
    /// Azure AD tenant id (issuer is derived from it)
    pub azure_tenant_id: String,
    /// Azure AD application client id (JWT audience)
    pub azure_client_id: String,
    /// CORS allowed origins (comma-separated, default: *)
    pub cors_origins: String,
    /// Accept `mock:<email>:<role>` tokens instead of real JWTs
    pub use_mock_auth: bool,
    /// Log level (default: info)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let use_mock_auth = env::var("USE_MOCK_AUTH")
            .map(|v| parse_bool(&v))
            .unwrap_or(false);

        // Mock tokens must never be accepted by a production deployment.
        if use_mock_auth && environment == "production" {
            return Err(ConfigError::MockAuthInProduction);
        }

        let config = Config {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidPort)?,
            environment,
            testing: env::var("TESTING").map(|v| parse_bool(&v)).unwrap_or(false),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./data/summarizer.db".to_string()),
            database_test_url: env::var("DATABASE_TEST_URL").ok(),
            azure_tenant_id: env::var("AZURE_TENANT_ID").unwrap_or_default(),
            azure_client_id: env::var("AZURE_CLIENT_ID").unwrap_or_default(),
            cors_origins: env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string()),
            use_mock_auth,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        };

        // Real token validation needs the tenant and client ids.
        if !config.use_mock_auth
            && (config.azure_tenant_id.is_empty() || config.azure_client_id.is_empty())
        {
            return Err(ConfigError::MissingEnvVar("AZURE_TENANT_ID/AZURE_CLIENT_ID"));
        }

        Ok(config)
    }

    /// The database URL to open: the test database when `testing` is set
    /// and one is configured, the primary one otherwise.
    pub fn effective_database_url(&self) -> &str {
        if self.testing {
            if let Some(ref url) = self.database_test_url {
                return url;
            }
        }
        &self.database_url
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),
    #[error("Invalid port number")]
    InvalidPort,
    #[error("Mock auth must not be enabled in production")]
    MockAuthInProduction,
}
