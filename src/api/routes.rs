use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{self, AppState};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/session", post(handlers::create_session))
        .route("/login", post(handlers::login))
        .route(
            "/connections",
            get(handlers::list_connections).post(handlers::scrape_connections_handler),
        )
        .route("/profiles", post(handlers::scrape_profiles))
        .route("/cleanup", post(handlers::cleanup))
        .with_state(state)
}

// ── Tests ──
