//! Tool catalog and validated dispatch.
//!
//! Tools are registered once at startup from an explicit list of [`ToolSpec`]s. Dispatch is
//! a table lookup followed by argument validation; every outcome, including an unknown
//! tool name, a schema mismatch, a handler failure or a timeout, comes back as a
//! [`ToolResult`] so the calling loop never has to handle a fault.

pub mod support;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

pub type ToolArguments = Map<String, Value>;

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
}

impl ParamType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }

    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub param_type: ParamType,
    pub required: bool,
    pub description: String,
}

impl ParamSpec {
    pub fn required(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            required: true,
            description: description.to_string(),
        }
    }

    pub fn optional(name: &str, param_type: ParamType, description: &str) -> Self {
        Self { required: false, ..Self::required(name, param_type, description) }
    }
}

/// Failure reported by a tool handler. The diagnostic is shown to the model as the
/// observation text.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{diagnostic}")]
pub struct ToolFailure {
    diagnostic: String,
}

impl ToolFailure {
    pub fn new(diagnostic: impl Into<String>) -> Self {
        Self { diagnostic: diagnostic.into() }
    }

    pub fn diagnostic(&self) -> &str {
        &self.diagnostic
    }
}

#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, arguments: &ToolArguments) -> Result<String, ToolFailure>;
}

#[derive(Clone)]
pub struct ToolSpec {
    name: String,
    description: String,
    parameters: Vec<ParamSpec>,
    handler: Arc<dyn ToolHandler>,
}

impl ToolSpec {
    pub fn new<H>(name: &str, description: &str, handler: H) -> Self
    where
        H: ToolHandler + 'static,
    {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    pub fn param(mut self, param: ParamSpec) -> Self {
        self.parameters.push(param);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &[ParamSpec] {
        &self.parameters
    }

    pub fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters.clone(),
        }
    }

    fn validate(&self, arguments: &ToolArguments) -> Result<(), String> {
        for param in &self.parameters {
            match arguments.get(&param.name) {
                None | Some(Value::Null) if param.required => {
                    return Err(format!("missing required parameter `{}`", param.name));
                }
                None | Some(Value::Null) => {}
                Some(value) if !param.param_type.accepts(value) => {
                    return Err(format!(
                        "parameter `{}` must be a {}",
                        param.name,
                        param.param_type.as_str()
                    ));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolSpec")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

/// What the model is told about a tool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParamSpec>,
}

impl ToolDescriptor {
    /// JSON-schema object for the function-calling `parameters` field.
    pub fn parameters_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.parameters {
            properties.insert(
                param.name.clone(),
                json!({ "type": param.param_type.as_str(), "description": param.description }),
            );
        }
        let required = self
            .parameters
            .iter()
            .filter(|param| param.required)
            .map(|param| Value::String(param.name.clone()))
            .collect::<Vec<_>>();

        json!({ "type": "object", "properties": properties, "required": required })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub name: String,
    #[serde(default)]
    pub arguments: ToolArguments,
}

impl ToolCallRequest {
    pub fn new(name: impl Into<String>, arguments: ToolArguments) -> Self {
        Self { name: name.into(), arguments }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Ok,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    ToolNotFound,
    InvalidArguments,
    ExecutionFailed,
}

impl ToolErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ToolNotFound => "tool_not_found",
            Self::InvalidArguments => "invalid_arguments",
            Self::ExecutionFailed => "execution_failed",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    pub status: ToolStatus,
    pub content: String,
    pub error_kind: Option<ToolErrorKind>,
}

impl ToolResult {
    pub fn ok(content: impl Into<String>) -> Self {
        Self { status: ToolStatus::Ok, content: content.into(), error_kind: None }
    }

    pub fn error(kind: ToolErrorKind, content: impl Into<String>) -> Self {
        Self { status: ToolStatus::Error, content: content.into(), error_kind: Some(kind) }
    }

    pub fn not_found(name: &str, available: &[String]) -> Self {
        Self::error(
            ToolErrorKind::ToolNotFound,
            format!(
                "Tool `{name}` is not available. Available tools: {}.",
                if available.is_empty() { "none".to_string() } else { available.join(", ") }
            ),
        )
    }

    pub fn is_ok(&self) -> bool {
        self.status == ToolStatus::Ok
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("tool `{0}` is already registered")]
    DuplicateTool(String),
}

#[derive(Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<String, ToolSpec>,
    call_timeout: Duration,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: BTreeMap::new(), call_timeout: DEFAULT_CALL_TIMEOUT }
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn register(&mut self, spec: ToolSpec) -> Result<(), RegistryError> {
        if self.tools.contains_key(spec.name()) {
            return Err(RegistryError::DuplicateTool(spec.name().to_string()));
        }
        self.tools.insert(spec.name().to_string(), spec);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    pub fn catalog(&self) -> Vec<ToolDescriptor> {
        self.tools.values().map(ToolSpec::descriptor).collect()
    }

    pub async fn invoke(&self, name: &str, arguments: &ToolArguments) -> ToolResult {
        self.invoke_within(name, arguments, self.call_timeout).await
    }

    /// Like [`invoke`](Self::invoke) but never runs longer than `budget`, even when the
    /// registry's own per-call timeout is larger.
    pub async fn invoke_within(
        &self,
        name: &str,
        arguments: &ToolArguments,
        budget: Duration,
    ) -> ToolResult {
        let Some(spec) = self.tools.get(name) else {
            debug!(event_name = "agent.tool.not_found", tool = name, "unknown tool requested");
            return ToolResult::not_found(name, &self.names());
        };

        if let Err(reason) = spec.validate(arguments) {
            debug!(
                event_name = "agent.tool.invalid_arguments",
                tool = name,
                reason = %reason,
                "tool arguments rejected"
            );
            return ToolResult::error(
                ToolErrorKind::InvalidArguments,
                format!("Invalid arguments for `{name}`: {reason}."),
            );
        }

        let timeout = self.call_timeout.min(budget);
        match tokio::time::timeout(timeout, spec.handler.call(arguments)).await {
            Ok(Ok(content)) => ToolResult::ok(content),
            Ok(Err(failure)) => {
                warn!(
                    event_name = "agent.tool.execution_failed",
                    tool = name,
                    error = %failure,
                    "tool handler failed"
                );
                ToolResult::error(ToolErrorKind::ExecutionFailed, failure.diagnostic())
            }
            Err(_) => {
                warn!(
                    event_name = "agent.tool.timed_out",
                    tool = name,
                    timeout_ms = timeout.as_millis() as u64,
                    "tool handler timed out"
                );
                ToolResult::error(
                    ToolErrorKind::ExecutionFailed,
                    format!("Tool `{name}` did not respond within {}ms.", timeout.as_millis()),
                )
            }
        }
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .field("call_timeout", &self.call_timeout)
            .finish()
    }
}
