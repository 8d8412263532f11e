pub mod chat;
pub mod config;
pub mod smoke;

use std::sync::Arc;

use frontdesk_agent::llm::create_client;
use frontdesk_agent::runtime::{AgentExecutor, ExecutorSettings};
use frontdesk_agent::tools::support::support_registry;
use frontdesk_core::config::AppConfig;
use frontdesk_core::SupportCatalog;
use serde::Serialize;

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_RUNTIME: u8 = 3;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// One support-agent session wired the same way the server wires each of its sessions.
pub fn build_executor(config: &AppConfig) -> Result<AgentExecutor, String> {
    let http = reqwest::Client::builder()
        .build()
        .map_err(|error| format!("failed to build http client: {error}"))?;
    let tools = support_registry(Arc::new(SupportCatalog::demo()), &config.tools, http.clone())
        .map_err(|error| format!("failed to register support tools: {error}"))?;

    Ok(AgentExecutor::new(
        create_client(&config.llm, http),
        Arc::new(tools),
        ExecutorSettings::from_config(config),
    ))
}

pub fn current_thread_runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread().enable_all().build()
}
