use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::store::SessionStore;

#[derive(Clone)]
pub struct HealthState {
    started_at: DateTime<Utc>,
    sessions: Arc<SessionStore>,
}

impl HealthState {
    pub fn new(sessions: Arc<SessionStore>) -> Self {
        Self {
            started_at: Utc::now(),
            sessions,
        }
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub ok: bool,
    pub started_at_iso: String,
    pub active_chats: usize,
    pub known_chats: usize,
}

pub fn router(state: HealthState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(port: u16, state: HealthState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "health endpoint listening");
    axum::serve(listener, router(state)).await
}

async fn root() -> &'static str {
    "Bot is running!"
}

async fn healthz(State(state): State<HealthState>) -> Json<HealthReport> {
    Json(HealthReport {
        ok: true,
        started_at_iso: state.started_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        active_chats: state.sessions.active_count(),
        known_chats: state.sessions.len(),
    })
}
