//! Model inference boundary.
//!
//! An [`LlmClient`] is stateless: every [`ModelRequest`] carries the full conversation window
//! and the tool catalog, and the reply is either a final answer or one tool-call request.

mod ollama;
mod openai;

use std::sync::Arc;

use async_trait::async_trait;
use frontdesk_core::config::{LlmConfig, LlmProvider};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::memory::ConversationTurn;
use crate::tools::{ToolArguments, ToolCallRequest, ToolDescriptor};

pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

#[derive(Clone, Debug, PartialEq)]
pub struct ModelRequest {
    pub system_prompt: String,
    pub conversation: Vec<ConversationTurn>,
    pub tools: Vec<ToolDescriptor>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ModelReply {
    FinalAnswer(String),
    ToolCall(ToolCallRequest),
}

/// Every variant ends the current run as model-unavailable.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("model call timed out")]
    Timeout,
    #[error("model endpoint unreachable: {0}")]
    Unreachable(String),
    #[error("model endpoint returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("malformed model response: {0}")]
    MalformedResponse(String),
}

impl ModelError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Timeout => "model_timeout",
            Self::Unreachable(_) => "model_unreachable",
            Self::HttpStatus { .. } => "model_http_status",
            Self::MalformedResponse(_) => "model_malformed_response",
        }
    }
}

impl From<reqwest::Error> for ModelError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_decode() {
            Self::MalformedResponse(error.to_string())
        } else {
            Self::Unreachable(error.to_string())
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    fn provider(&self) -> &str;

    async fn infer(&self, request: &ModelRequest) -> Result<ModelReply, ModelError>;
}

/// Selects the adapter for the configured provider. Both adapters share `http`.
pub fn create_client(config: &LlmConfig, http: reqwest::Client) -> Arc<dyn LlmClient> {
    match config.provider {
        LlmProvider::Ollama => Arc::new(OllamaClient::new(http, config)),
        LlmProvider::OpenAi => Arc::new(OpenAiClient::new(http, config)),
    }
}

/// Function declarations in the shape both Ollama and OpenAI-compatible endpoints accept.
pub(crate) fn tool_declarations(tools: &[ToolDescriptor]) -> Vec<Value> {
    tools
        .iter()
        .map(|tool| {
            json!({
                "type": "function",
                "function": {
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.parameters_schema(),
                }
            })
        })
        .collect()
}

/// Accepts arguments as a JSON object, a JSON-encoded object string, or nothing.
pub(crate) fn parse_arguments(raw: Value) -> Result<ToolArguments, ModelError> {
    match raw {
        Value::Object(arguments) => Ok(arguments),
        Value::Null => Ok(ToolArguments::new()),
        Value::String(encoded) if encoded.trim().is_empty() => Ok(ToolArguments::new()),
        Value::String(encoded) => match serde_json::from_str::<Value>(&encoded) {
            Ok(Value::Object(arguments)) => Ok(arguments),
            Ok(other) => Err(ModelError::MalformedResponse(format!(
                "tool arguments must be an object, got {other}"
            ))),
            Err(error) => Err(ModelError::MalformedResponse(format!(
                "tool arguments are not valid JSON: {error}"
            ))),
        },
        other => Err(ModelError::MalformedResponse(format!(
            "tool arguments must be an object, got {other}"
        ))),
    }
}

/// Turns the provider's message into a reply. Only the first tool call is honoured.
pub(crate) fn select_reply(
    provider: &str,
    content: Option<String>,
    mut tool_calls: Vec<ToolCallRequest>,
) -> Result<ModelReply, ModelError> {
    if !tool_calls.is_empty() {
        if tool_calls.len() > 1 {
            debug!(
                event_name = "agent.model.extra_tool_calls_ignored",
                provider,
                ignored = tool_calls.len() - 1,
                "model requested several tools; dispatching the first"
            );
        }
        return Ok(ModelReply::ToolCall(tool_calls.swap_remove(0)));
    }

    match content.map(|text| text.trim().to_string()) {
        Some(text) if !text.is_empty() => Ok(ModelReply::FinalAnswer(text)),
        _ => Err(ModelError::MalformedResponse(
            "reply carried neither text nor a tool call".to_string(),
        )),
    }
}
