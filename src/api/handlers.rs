//! Route handlers. Browser work runs on the blocking pool with the
//! session's own lock held; the registry lock never is.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{info, warn};

use super::sessions::SessionRegistry;
use super::types::*;
use crate::browser::chrome::ChromeSession;
use crate::config::{BrowserConfig, Settings};
use crate::connections::scrape_connections;
use crate::db::Store;
use crate::error::ScrapeResult;
use crate::scraper;

pub type Launcher = Arc<dyn Fn(&BrowserConfig) -> anyhow::Result<ChromeSession> + Send + Sync>;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub sessions: Arc<SessionRegistry<ChromeSession>>,
    pub settings: Arc<Settings>,
    pub launcher: Launcher,
}

impl AppState {
    pub fn new(store: Arc<Store>, settings: Arc<Settings>) -> Self {
        Self {
            store,
            sessions: Arc::new(SessionRegistry::new()),
            settings,
            launcher: Arc::new(ChromeSession::launch),
        }
    }

    /// Run `f` against the session's browser, launching one on first use.
    fn with_session<T>(
        &self,
        id: &str,
        f: impl FnOnce(&ChromeSession) -> ScrapeResult<T>,
    ) -> ScrapeResult<T> {
        let session = self
            .sessions
            .get_or_launch(id, || (self.launcher)(&self.settings.browser))?;
        let guard = session.lock();
        f(&guard)
    }
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(ApiResponse::error(message))).into_response()
}

async fn blocking(f: impl FnOnce() -> ApiResponse + Send + 'static) -> Response {
    let resp = match tokio::task::spawn_blocking(f).await {
        Ok(resp) => resp,
        Err(e) => ApiResponse::error(format!("worker failed: {}", e)),
    };
    Json(resp).into_response()
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(
        "ok",
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "sessions": state.sessions.len(),
        }),
    ))
}

pub async fn create_session(
    State(state): State<AppState>,
    body: Option<Json<SessionRequest>>,
) -> Response {
    let req = body.map(|Json(b)| b).unwrap_or_default();
    let id = match present(&req.session_id) {
        Some(id) => id.to_string(),
        None => format!("session_{}", uuid::Uuid::new_v4().simple()),
    };
    match state.store.get_session(&id) {
        Ok(Some(row)) => return Json(ApiResponse::success("Session ready", row)).into_response(),
        Ok(None) => {}
        Err(e) => warn!("Failed to read session {}: {}", id, e),
    }
    if let Err(e) = state.store.save_session(&id, None, false) {
        warn!("Failed to record session {}: {}", id, e);
    }
    Json(ApiResponse::success(
        "Session ready",
        json!({ "session_id": id, "logged_in": false }),
    ))
    .into_response()
}

pub async fn login(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> Response {
    let (Some(id), Some(email), Some(password)) = (
        present(&req.session_id),
        present(&req.email),
        present(&req.password),
    ) else {
        return bad_request("Missing required parameters");
    };
    let (id, email, password) = (id.to_string(), email.to_string(), password.to_string());

    blocking(move || {
        let timeout = state.settings.browser.element_timeout();
        let result = state.with_session(&id, |s| {
            scraper::login(s.page(), &state.store, &email, &password, timeout, Some(&id))
        });
        match result {
            Ok(()) => ApiResponse::ok("Logged in successfully"),
            Err(e) => {
                warn!("Login failed for session {}: {}", id, e);
                ApiResponse::error(e.to_string())
            }
        }
    })
    .await
}

pub async fn list_connections(
    State(state): State<AppState>,
    Query(q): Query<ConnectionsQuery>,
) -> Response {
    let session = present(&q.session_id).map(str::to_string);
    blocking(move || match state.store.fetch_all(session.as_deref()) {
        Ok(records) => ApiResponse::success(format!("Found {} connections", records.len()), records),
        Err(e) => ApiResponse::error(format!("Error retrieving connections: {}", e)),
    })
    .await
}

pub async fn scrape_connections_handler(
    State(state): State<AppState>,
    Json(req): Json<ScrapeConnectionsRequest>,
) -> Response {
    let Some(id) = present(&req.session_id).map(str::to_string) else {
        return bad_request("session_id is required");
    };
    let max = req
        .max_connections
        .unwrap_or(state.settings.scrape.max_connections);

    blocking(move || {
        let cfg = &state.settings.scrape;
        let timeout = state.settings.browser.element_timeout();
        let result = state.with_session(&id, |s| {
            scrape_connections(s.page(), &state.store, cfg, timeout, max, Some(&id))
        });
        match result {
            Ok(cards) => {
                info!("Session {} scraped {} connections", id, cards.len());
                ApiResponse::success(format!("Successfully scraped {} connections", cards.len()), cards)
            }
            Err(e) => ApiResponse::error(e.to_string()),
        }
    })
    .await
}

pub async fn scrape_profiles(
    State(state): State<AppState>,
    Json(req): Json<ProfilesRequest>,
) -> Response {
    let id = present(&req.session_id).map(str::to_string);
    let urls: Vec<String> = req
        .profile_urls
        .unwrap_or_default()
        .into_iter()
        .filter(|u| !u.trim().is_empty())
        .collect();
    let Some(id) = id.filter(|_| !urls.is_empty()) else {
        return bad_request("session_id and profile_urls are required");
    };

    blocking(move || {
        let cfg = &state.settings.scrape;
        let result = state.with_session(&id, |s| {
            Ok(scraper::visit_profiles(s.page(), &state.store, cfg, &urls, Some(&id), None))
        });
        match result {
            Ok(reports) => {
                let ok = reports.iter().filter(|r| r.is_ok()).count();
                ApiResponse::success(format!("Processed {} profiles", ok), reports)
            }
            Err(e) => ApiResponse::error(e.to_string()),
        }
    })
    .await
}

pub async fn cleanup(State(state): State<AppState>, Json(req): Json<SessionRequest>) -> Response {
    let Some(id) = present(&req.session_id).map(str::to_string) else {
        return bad_request("session_id is required");
    };
    blocking(move || {
        state.sessions.remove(&id);
        if let Err(e) = state.store.end_session(&id) {
            warn!("Failed to close session record {}: {}", id, e);
        }
        ApiResponse::ok(format!("Session {} cleaned up", id))
    })
    .await
}
