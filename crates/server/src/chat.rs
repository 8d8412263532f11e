//! Chat boundary.
//!
//! - `POST /api/agent1/chat/`        body `{"message": ".."}` -> `{"response": ".."}`
//! - `POST /api/agent1/chat/reset/`  clears the caller's session memory
//!
//! Callers pick a session with the `x-session-id` header; requests without one share the
//! `shared` session. Any other method answers `405 {"error": "POST only"}`.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use frontdesk_agent::session::{SessionError, SessionKey, SessionRegistry};
use frontdesk_core::InterfaceError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

pub const CHAT_PATH: &str = "/api/agent1/chat/";
pub const RESET_PATH: &str = "/api/agent1/chat/reset/";
pub const SESSION_HEADER: &str = "x-session-id";
pub const RESET_MESSAGE: &str = "Memory reset. Starting fresh conversation.";

#[derive(Clone)]
pub struct ChatState {
    sessions: Arc<SessionRegistry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn router(sessions: Arc<SessionRegistry>) -> Router {
    Router::new()
        .route(CHAT_PATH, post(chat).fallback(method_not_allowed))
        .route(RESET_PATH, post(reset).fallback(method_not_allowed))
        .with_state(ChatState { sessions })
}

pub async fn chat(State(state): State<ChatState>, headers: HeaderMap, body: Bytes) -> Response {
    let correlation_id = Uuid::new_v4().to_string();
    let session = session_key(&headers, &correlation_id);

    let Some(message) = parse_message(&body) else {
        return error_response(&InterfaceError::bad_request(
            "body is not a JSON object with a non-blank `message` string",
            correlation_id,
        ));
    };

    let span = tracing::info_span!("chat_request", correlation_id = %correlation_id);
    match state.sessions.chat(&session, &message, None).instrument(span).await {
        Ok(outcome) => {
            info!(
                event_name = "api.chat.completed",
                correlation_id = %correlation_id,
                session_id = %session,
                state = ?outcome.state,
                reason_code = outcome.stop_reason.map(|reason| reason.as_str()),
                tool_dispatches = outcome.tool_dispatches,
                elapsed_ms = outcome.elapsed.as_millis() as u64,
                "chat request served"
            );
            with_session(&session, ChatResponse { response: outcome.reply })
        }
        Err(SessionError::Closed) => error_response(&InterfaceError::service_unavailable(
            "session registry closed",
            correlation_id,
        )),
    }
}

pub async fn reset(State(state): State<ChatState>, headers: HeaderMap) -> Response {
    let correlation_id = Uuid::new_v4().to_string();
    let session = session_key(&headers, &correlation_id);
    let existed = state.sessions.reset(&session).await;

    info!(
        event_name = "api.chat.reset",
        correlation_id = %correlation_id,
        session_id = %session,
        existed,
        "chat session reset"
    );
    with_session(&session, ChatResponse { response: RESET_MESSAGE.to_string() })
}

pub async fn method_not_allowed() -> Response {
    error_response(&InterfaceError::method_not_allowed(
        "chat endpoints accept POST only",
        Uuid::new_v4().to_string(),
    ))
}

/// Absent or unusable header values fall back to the shared session.
fn session_key(headers: &HeaderMap, correlation_id: &str) -> SessionKey {
    let Some(raw) = headers.get(SESSION_HEADER) else {
        return SessionKey::shared();
    };
    match raw.to_str().ok().and_then(SessionKey::parse) {
        Some(key) => key,
        None => {
            warn!(
                event_name = "api.chat.invalid_session_header",
                correlation_id,
                "unusable session header; using shared session"
            );
            SessionKey::shared()
        }
    }
}

fn parse_message(body: &[u8]) -> Option<String> {
    let value = serde_json::from_slice::<Value>(body).ok()?;
    let message = value.get("message")?.as_str()?.trim();
    (!message.is_empty()).then(|| message.to_string())
}

fn with_session(session: &SessionKey, body: ChatResponse) -> Response {
    (StatusCode::OK, [(SESSION_HEADER, session.to_string())], Json(body)).into_response()
}

fn error_response(error: &InterfaceError) -> Response {
    let status = match error {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
    };
    warn!(
        event_name = "api.chat.rejected",
        correlation_id = error.correlation_id(),
        error_class = error.error_class(),
        error = %error,
        "chat request rejected"
    );
    (status, Json(ErrorResponse { error: error.user_message().to_string() })).into_response()
}
