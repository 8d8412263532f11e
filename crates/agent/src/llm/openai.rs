use std::time::Duration;

use async_trait::async_trait;
use frontdesk_core::config::LlmConfig;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{
    parse_arguments, select_reply, tool_declarations, LlmClient, ModelError, ModelReply,
    ModelRequest,
};
use crate::memory::TurnRole;
use crate::tools::ToolCallRequest;

/// Any OpenAI-compatible `/chat/completions` endpoint.
///
/// Memory does not keep provider call ids, so observations are replayed as user messages
/// prefixed `Tool observation:` rather than as `tool` role messages.
pub struct OpenAiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<SecretString>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
}

impl OpenAiClient {
    pub fn new(http: reqwest::Client, config: &LlmConfig) -> Self {
        Self {
            http,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: config.timeout(),
        }
    }

    fn body(&self, request: &ModelRequest) -> CompletionRequest {
        let mut messages = Vec::with_capacity(request.conversation.len() + 1);
        if !request.system_prompt.is_empty() {
            messages.push(Message::new("system", request.system_prompt.clone()));
        }
        messages.extend(request.conversation.iter().map(|turn| match turn.role() {
            TurnRole::User => Message::new("user", turn.content().to_string()),
            TurnRole::Agent => Message::new("assistant", turn.content().to_string()),
            TurnRole::ToolObservation => {
                Message::new("user", format!("Tool observation: {}", turn.content()))
            }
        }));

        CompletionRequest {
            model: self.model.clone(),
            messages,
            tools: tool_declarations(&request.tools),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

#[derive(Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

impl Message {
    fn new(role: &'static str, content: String) -> Self {
        Self { role, content }
    }
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
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

fn into_reply(response: CompletionResponse) -> Result<ModelReply, ModelError> {
    let Some(choice) = response.choices.into_iter().next() else {
        return Err(ModelError::MalformedResponse("response has no choices".to_string()));
    };
    let calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| {
            Ok(ToolCallRequest::new(call.function.name, parse_arguments(call.function.arguments)?))
        })
        .collect::<Result<Vec<_>, ModelError>>()?;
    select_reply("openai", choice.message.content, calls)
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn provider(&self) -> &str {
        "openai"
    }

    async fn infer(&self, request: &ModelRequest) -> Result<ModelReply, ModelError> {
        debug!(
            event_name = "agent.model.request",
            provider = "openai",
            model = %self.model,
            turns = request.conversation.len(),
            tools = request.tools.len(),
            "sending chat completion request"
        );

        let mut builder = self.http.post(&self.endpoint).timeout(self.timeout);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key.expose_secret());
        }
        let response = builder.json(&self.body(request)).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::HttpStatus { status: status.as_u16(), body });
        }

        into_reply(response.json::<CompletionResponse>().await?)
    }
}

#[cfg(test)]
mod tests {
    use frontdesk_core::config::AppConfig;
    use serde_json::json;

    use super::{into_reply, CompletionResponse, OpenAiClient};
    use crate::llm::{ModelError, ModelReply, ModelRequest};
    use crate::memory::ConversationTurn;

    fn parse(value: serde_json::Value) -> CompletionResponse {
        serde_json::from_value(value).expect("response shape")
    }

    #[test]
    fn observations_are_replayed_as_user_messages() {
        let client = OpenAiClient::new(reqwest::Client::new(), &AppConfig::default().llm);
        let request = ModelRequest {
            system_prompt: String::new(),
            conversation: vec![
                ConversationTurn::user("status of ORD002?"),
                ConversationTurn::observation("Order Status: Pending"),
            ],
            tools: Vec::new(),
        };

        let body = serde_json::to_value(client.body(&request)).expect("serialises");

        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "Tool observation: Order Status: Pending");
        assert_eq!(body["max_tokens"], 512);
    }

    #[test]
    fn string_encoded_arguments_are_parsed() {
        let reply = into_reply(parse(json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": { "name": "check_order_status", "arguments": "{\"order_id\":\"ORD002\"}" }
                    }]
                }
            }]
        })))
        .expect("reply");

        assert!(matches!(reply, ModelReply::ToolCall(call) if call.arguments["order_id"] == "ORD002"));
    }

    #[test]
    fn invalid_argument_string_is_malformed() {
        let result = into_reply(parse(json!({
            "choices": [{
                "message": {
                    "tool_calls": [{ "function": { "name": "search_client", "arguments": "{not json" } }]
                }
            }]
        })));

        assert!(matches!(result, Err(ModelError::MalformedResponse(_))));
    }

    #[test]
    fn null_tool_calls_with_content_is_final_answer() {
        let reply = into_reply(parse(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "Order ORD002 is Pending.",
                    "tool_calls": null
                }
            }]
        })))
        .expect("reply");

        assert_eq!(reply, ModelReply::FinalAnswer("Order ORD002 is Pending.".to_string()));
    }

    #[test]
    fn missing_choices_is_malformed() {
        let result = into_reply(parse(json!({ "choices": [] })));

        assert!(matches!(result, Err(ModelError::MalformedResponse(_))));
    }
}
