use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use frontdesk_agent::session::SessionRegistry;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    sessions: Arc<SessionRegistry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionUsage {
    pub active: usize,
    pub max: usize,
    pub max_concurrent_chats: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub sessions: SessionUsage,
    pub checked_at: String,
}

pub fn router(sessions: Arc<SessionRegistry>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { sessions })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let limits = state.sessions.limits();
    let active = state.sessions.len().await;

    let payload = HealthResponse {
        status: "ready",
        service: HealthCheck {
            status: "ready",
            detail: "frontdesk-server agent runtime initialized".to_string(),
        },
        sessions: SessionUsage {
            active,
            max: limits.max_sessions,
            max_concurrent_chats: limits.max_concurrent_chats,
        },
        checked_at: Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(payload))
}
