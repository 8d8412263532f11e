use std::time::Duration;

use async_trait::async_trait;
use frontdesk_core::config::LlmConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{
    parse_arguments, select_reply, tool_declarations, LlmClient, ModelError, ModelReply,
    ModelRequest,
};
use crate::memory::TurnRole;
use crate::tools::ToolCallRequest;

/// Local Ollama server speaking `/api/chat` with native tool calling.
pub struct OllamaClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
}

impl OllamaClient {
    pub fn new(http: reqwest::Client, config: &LlmConfig) -> Self {
        Self {
            http,
            endpoint: format!("{}/api/chat", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: config.timeout(),
        }
    }

    fn body(&self, request: &ModelRequest) -> ChatRequest {
        let mut messages = Vec::with_capacity(request.conversation.len() + 1);
        if !request.system_prompt.is_empty() {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: request.system_prompt.clone(),
            });
        }
        messages.extend(request.conversation.iter().map(|turn| ChatMessage {
            role: match turn.role() {
                TurnRole::User => "user",
                TurnRole::Agent => "assistant",
                TurnRole::ToolObservation => "tool",
            }
            .to_string(),
            content: turn.content().to_string(),
        }));

        ChatRequest {
            model: self.model.clone(),
            messages,
            tools: tool_declarations(&request.tools),
            stream: false,
            options: ChatOptions { temperature: self.temperature, num_predict: self.max_tokens },
        }
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Deserialize)]
struct WireToolCall {
    function: WireFunction,
}

#[derive(Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: Value,
}

fn into_reply(response: ChatResponse) -> Result<ModelReply, ModelError> {
    let calls = response
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| {
            Ok(ToolCallRequest::new(call.function.name, parse_arguments(call.function.arguments)?))
        })
        .collect::<Result<Vec<_>, ModelError>>()?;
    select_reply("ollama", response.message.content, calls)
}

#[async_trait]
impl LlmClient for OllamaClient {
    fn provider(&self) -> &str {
        "ollama"
    }

    async fn infer(&self, request: &ModelRequest) -> Result<ModelReply, ModelError> {
        debug!(
            event_name = "agent.model.request",
            provider = "ollama",
            model = %self.model,
            turns = request.conversation.len(),
            tools = request.tools.len(),
            "sending chat request"
        );

        let response = self
            .http
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&self.body(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::HttpStatus { status: status.as_u16(), body });
        }

        into_reply(response.json::<ChatResponse>().await?)
    }
}
