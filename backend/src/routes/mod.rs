pub mod ping;
pub mod summaries;
pub mod users;

use std::sync::Arc;

use axum::Router;

use crate::AppState;

/// Assemble the full application router. Each module registers its full
/// paths; nesting would drop the trailing-slash collection routes.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(ping::router(state.clone()))
        .merge(summaries::router(state.clone()))
        .merge(users::router(state))
}
