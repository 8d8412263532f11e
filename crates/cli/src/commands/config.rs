use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use frontdesk_core::config::{resolve_config_path, AppConfig, LoadOptions};
use toml::Value;

use crate::commands::{CommandResult, EXIT_CONFIG};

struct Field {
    key_path: &'static str,
    env_keys: &'static [&'static str],
    value: String,
}

impl Field {
    fn new(
        key_path: &'static str,
        env_keys: &'static [&'static str],
        value: impl ToString,
    ) -> Self {
        Self { key_path, env_keys, value: value.to_string() }
    }
}

pub fn run() -> CommandResult {
    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => CommandResult { exit_code: 0, output: render(&config) },
        Err(error) => CommandResult::failure(
            "config",
            "config_validation",
            format!("config validation failed: {error}"),
            EXIT_CONFIG,
        ),
    }
}

pub fn render(config: &AppConfig) -> String {
    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let api_key = if config.llm.api_key.is_some() { "<redacted>" } else { "<unset>" };
    let fields = [
        Field::new("llm.provider", &["FRONTDESK_LLM_PROVIDER"], config.llm.provider.as_str()),
        Field::new("llm.base_url", &["FRONTDESK_LLM_BASE_URL"], &config.llm.base_url),
        Field::new("llm.model", &["FRONTDESK_LLM_MODEL"], &config.llm.model),
        Field::new("llm.api_key", &["FRONTDESK_LLM_API_KEY"], api_key),
        Field::new("llm.timeout_secs", &["FRONTDESK_LLM_TIMEOUT_SECS"], config.llm.timeout_secs),
        Field::new("llm.temperature", &["FRONTDESK_LLM_TEMPERATURE"], config.llm.temperature),
        Field::new("llm.max_tokens", &["FRONTDESK_LLM_MAX_TOKENS"], config.llm.max_tokens),
        Field::new(
            "agent.max_iterations",
            &["FRONTDESK_AGENT_MAX_ITERATIONS"],
            config.agent.max_iterations,
        ),
        Field::new(
            "agent.max_execution_secs",
            &["FRONTDESK_AGENT_MAX_EXECUTION_SECS"],
            config.agent.max_execution_secs,
        ),
        Field::new(
            "agent.memory_window",
            &["FRONTDESK_AGENT_MEMORY_WINDOW"],
            config.agent.memory_window,
        ),
        Field::new(
            "tools.backend_base_url",
            &["FRONTDESK_TOOLS_BACKEND_BASE_URL"],
            &config.tools.backend_base_url,
        ),
        Field::new(
            "tools.timeout_secs",
            &["FRONTDESK_TOOLS_TIMEOUT_SECS"],
            config.tools.timeout_secs,
        ),
        Field::new(
            "server.bind_address",
            &["FRONTDESK_SERVER_BIND_ADDRESS"],
            &config.server.bind_address,
        ),
        Field::new("server.port", &["FRONTDESK_SERVER_PORT"], config.server.port),
        Field::new(
            "server.graceful_shutdown_secs",
            &["FRONTDESK_SERVER_GRACEFUL_SHUTDOWN_SECS"],
            config.server.graceful_shutdown_secs,
        ),
        Field::new(
            "server.max_sessions",
            &["FRONTDESK_SERVER_MAX_SESSIONS"],
            config.server.max_sessions,
        ),
        Field::new(
            "server.session_idle_secs",
            &["FRONTDESK_SERVER_SESSION_IDLE_SECS"],
            config.server.session_idle_secs,
        ),
        Field::new(
            "server.max_concurrent_chats",
            &["FRONTDESK_SERVER_MAX_CONCURRENT_CHATS"],
            config.server.max_concurrent_chats,
        ),
        Field::new(
            "logging.level",
            &["FRONTDESK_LOGGING_LEVEL", "FRONTDESK_LOG_LEVEL"],
            &config.logging.level,
        ),
        Field::new(
            "logging.format",
            &["FRONTDESK_LOGGING_FORMAT", "FRONTDESK_LOG_FORMAT"],
            format!("{:?}", config.logging.format).to_lowercase(),
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(fields.iter().map(|field| {
        render_line(
            field.key_path,
            &field.value,
            field_source(
                field.key_path,
                field.env_keys,
                config_file_doc.as_ref(),
                config_file_path.as_deref(),
            ),
        )
    }));
    lines.join("\n")
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("config file"));
            return format!("file ({})", file_path.display());
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
