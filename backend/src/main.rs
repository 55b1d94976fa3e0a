use std::sync::Arc;

use axum::http::HeaderValue;
use axum::middleware;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use summarizer_backend::auth::{JwksVerifier, MockVerifier, TokenVerifier};
use summarizer_backend::config::Config;
use summarizer_backend::store::Database;
use summarizer_backend::{logging, routes, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Summarizer API ({})", config.environment);

    // Select the token verifier once, never per request.
    let verifier: Arc<dyn TokenVerifier> = if config.use_mock_auth {
        tracing::warn!("Mock auth enabled; accepting mock:<email>:<role> tokens");
        Arc::new(MockVerifier)
    } else {
        Arc::new(
            JwksVerifier::for_tenant(&config.azure_tenant_id, &config.azure_client_id).await?,
        )
    };

    let db = Database::open(config.effective_database_url())?;

    let state = Arc::new(AppState {
        config: config.clone(),
        verifier,
        db,
    });

    // Build CORS layer from the configured allow-list
    let cors = if config.cors_origins.trim() == "*" {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .split(',')
            .filter_map(|o| o.trim().parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Build router
    let app = routes::app(state)
        .layer(middleware::from_fn(logging::request_logger))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
