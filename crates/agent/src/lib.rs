//! Tool-calling support agent.
//!
//! The crate is organised leaf-first:
//!
//! - `tools` - catalog of invocable tools with validated dispatch; `tools::support` holds the
//!   customer-support tool set
//! - `memory` - bounded window of conversation turns
//! - `bounds` - iteration and wall-time limits for one run
//! - `llm` - stateless model boundary plus Ollama and OpenAI adapters
//! - `conversation` - system prompt and model request assembly
//! - `guardrails` - hallucinated-tool screening and fallback replies
//! - `runtime` - `AgentExecutor`, the control loop
//! - `session` - per-caller executors with eviction and a concurrency cap
//!
//! Tool failures are data: they reach the model as observations. Only an unavailable model or
//! an exceeded bound ends a run early, and even then the caller receives text.

pub mod bounds;
pub mod conversation;
pub mod guardrails;
pub mod llm;
pub mod memory;
pub mod runtime;
pub mod session;
pub mod tools;

pub use bounds::{BoundViolation, Bounds, BoundsController};
pub use llm::{create_client, LlmClient, ModelError, ModelReply, ModelRequest};
pub use memory::{ConversationMemory, ConversationTurn, TurnRole};
pub use runtime::{AgentExecutor, ChatOutcome, ExecutorSettings, ExecutorState};
pub use session::{SessionError, SessionKey, SessionLimits, SessionRegistry};
pub use tools::{ToolCallRequest, ToolErrorKind, ToolRegistry, ToolResult, ToolStatus};
