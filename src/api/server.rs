use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::Method;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::handlers::AppState;
use super::routes::create_router;
use crate::config::HttpConfig;

/// Serve the API until Ctrl-C. Open browser sessions are dropped, and so
/// closed, when the state goes away.
pub async fn serve(config: &HttpConfig, state: AppState) -> Result<()> {
    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .context("Invalid HTTP listen address")?;

    let sessions = Arc::clone(&state.sessions);
    let mut app = create_router(state);
    if config.cors_enabled {
        let cors = CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
            .allow_origin(Any);
        app = app.layer(cors);
    }
    app = app.layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&addr)
        .await
        .context("Failed to bind HTTP server")?;
    info!("HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("HTTP server shutting down");
        })
        .await
        .context("HTTP server error")?;
    if !sessions.is_empty() {
        info!("Closing {} open browser sessions", sessions.len());
    }
    Ok(())
}
