//! Application state and HTTP routes.

use crate::config::SessionConfig;
use crate::ws;
use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use playschool_ai::CompletionBackend;
use playschool_conversation::{MessageRelay, SessionStore};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

const INDEX_HTML: &str = include_str!("../assets/chat.html");

/// Shared application state.
pub struct AppState {
    /// All live sessions.
    pub store: Arc<SessionStore>,
    /// Relay over `store`.
    pub relay: MessageRelay,
    /// Session lifecycle settings.
    pub session: SessionConfig,
}

impl AppState {
    /// Creates state with an empty session store.
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        model: impl Into<String>,
        session: SessionConfig,
    ) -> Self {
        let store = Arc::new(SessionStore::new());
        let relay = MessageRelay::new(store.clone(), backend, model);
        Self {
            store,
            relay,
            session,
        }
    }
}

/// Builds the router: chat page, WebSocket endpoint, health check.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/ws", get(ws::ws_handler))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "sessions": state.store.len().await,
    }))
}

/// Spawns the periodic idle-session sweep.
pub fn spawn_idle_sweeper(
    store: Arc<SessionStore>,
    idle_timeout: Duration,
    interval: Duration,
) -> JoinHandle<()> {
    let idle = chrono::Duration::from_std(idle_timeout).unwrap_or(chrono::Duration::MAX);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let cutoff = Utc::now()
                .checked_sub_signed(idle)
                .unwrap_or(DateTime::<Utc>::MIN_UTC);
            let evicted = store.evict_idle(cutoff).await;
            if evicted > 0 {
                tracing::info!(evicted_sessions = evicted, "evicted idle sessions");
            }
        }
    })
}
