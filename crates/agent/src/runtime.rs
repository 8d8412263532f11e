//! The agent control loop.
//!
//! One [`AgentExecutor`] owns one conversation. A `chat` call walks the state machine
//! `AwaitingModel -> {Final, DispatchingTool}`, `DispatchingTool -> AwaitingModel`, with any
//! state able to move to `Aborted` when the model is unavailable or a bound is hit. Tool
//! failures never abort a run; they are fed back to the model as observations.

use std::sync::Arc;
use std::time::Duration;

use frontdesk_core::config::AppConfig;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::bounds::{BoundViolation, Bounds, BoundsCheck, BoundsController, RunState};
use crate::conversation::ConversationContext;
use crate::guardrails::{GuardrailDecision, GuardrailPolicy, StopReason};
use crate::llm::{LlmClient, ModelReply};
use crate::memory::{ConversationMemory, ConversationTurn, DEFAULT_WINDOW_PAIRS};
use crate::tools::{ToolCallRequest, ToolDescriptor, ToolRegistry};

pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug, PartialEq)]
pub struct ExecutorSettings {
    pub bounds: Bounds,
    pub memory_window: usize,
    pub model_timeout: Duration,
    pub context: ConversationContext,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            bounds: Bounds::default(),
            memory_window: DEFAULT_WINDOW_PAIRS,
            model_timeout: DEFAULT_MODEL_TIMEOUT,
            context: ConversationContext::default(),
        }
    }
}

impl ExecutorSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            bounds: Bounds::from_config(&config.agent),
            memory_window: config.agent.memory_window,
            model_timeout: config.llm.timeout(),
            context: ConversationContext::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutorState {
    AwaitingModel,
    DispatchingTool,
    Final,
    Aborted,
}

impl ExecutorState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Final | Self::Aborted)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatOutcome {
    pub reply: String,
    pub state: ExecutorState,
    pub stop_reason: Option<StopReason>,
    pub tool_dispatches: u32,
    pub elapsed: Duration,
}

enum Step {
    AwaitingModel,
    DispatchingTool(ToolCallRequest),
    Final(String),
    Aborted(StopReason),
}

impl Step {
    fn state(&self) -> ExecutorState {
        match self {
            Self::AwaitingModel => ExecutorState::AwaitingModel,
            Self::DispatchingTool(_) => ExecutorState::DispatchingTool,
            Self::Final(_) => ExecutorState::Final,
            Self::Aborted(_) => ExecutorState::Aborted,
        }
    }
}

pub struct AgentExecutor {
    llm: Arc<dyn LlmClient>,
    tools: Arc<ToolRegistry>,
    catalog: Vec<ToolDescriptor>,
    guardrails: GuardrailPolicy,
    bounds: BoundsController,
    context: ConversationContext,
    model_timeout: Duration,
    memory: ConversationMemory,
}

impl AgentExecutor {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        tools: Arc<ToolRegistry>,
        settings: ExecutorSettings,
    ) -> Self {
        let catalog = tools.catalog();
        Self {
            llm,
            guardrails: GuardrailPolicy::for_catalog(&catalog),
            catalog,
            tools,
            bounds: BoundsController::new(settings.bounds),
            context: settings.context,
            model_timeout: settings.model_timeout,
            memory: ConversationMemory::new(settings.memory_window),
        }
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds.bounds()
    }

    /// Clears this session's memory. Idempotent.
    pub fn reset(&mut self) {
        self.memory.clear();
    }

    /// Answers one user message. Always returns text; internal failures become a fixed apology.
    pub async fn chat(&mut self, user_input: &str) -> String {
        self.run_until(user_input, None).await.reply
    }

    /// Like [`chat`](Self::chat), additionally honouring a caller deadline. The deadline is
    /// polled between steps; each model and tool call is bounded by the remaining budget.
    pub async fn run_until(&mut self, user_input: &str, deadline: Option<Instant>) -> ChatOutcome {
        self.memory.append(ConversationTurn::user(user_input));
        let mut state = RunState::start(Instant::now()).with_deadline(deadline);
        let mut tool_dispatches = 0_u32;
        let mut step = Step::AwaitingModel;

        loop {
            debug!(
                event_name = "agent.run.step",
                state = ?step.state(),
                iteration = state.iteration(),
                "executor step"
            );
            step = match step {
                Step::AwaitingModel => self.await_model(&state).await,
                Step::DispatchingTool(call) => {
                    if let BoundsCheck::Abort(violation) =
                        self.bounds.check_time(&state, Instant::now())
                    {
                        Step::Aborted(StopReason::Bound(violation))
                    } else {
                        self.dispatch(&state, call).await;
                        state.record_iteration();
                        tool_dispatches += 1;
                        Step::AwaitingModel
                    }
                }
                Step::Final(reply) => {
                    state.mark_terminal();
                    self.memory.append(ConversationTurn::agent(reply.clone()));
                    info!(
                        event_name = "agent.run.completed",
                        iteration = state.iteration(),
                        tool_dispatches,
                        elapsed_ms = state.elapsed(Instant::now()).as_millis() as u64,
                        "agent produced a final answer"
                    );
                    return ChatOutcome {
                        reply,
                        state: ExecutorState::Final,
                        stop_reason: None,
                        tool_dispatches,
                        elapsed: state.elapsed(Instant::now()),
                    };
                }
                Step::Aborted(reason) => {
                    state.mark_terminal();
                    let fallback = self.guardrails.fallback(reason);
                    self.memory.append(ConversationTurn::agent(fallback.user_message));
                    warn!(
                        event_name = "agent.run.aborted",
                        reason_code = fallback.reason_code,
                        iteration = state.iteration(),
                        tool_dispatches,
                        elapsed_ms = state.elapsed(Instant::now()).as_millis() as u64,
                        "agent run stopped early"
                    );
                    return ChatOutcome {
                        reply: fallback.user_message.to_string(),
                        state: ExecutorState::Aborted,
                        stop_reason: Some(reason),
                        tool_dispatches,
                        elapsed: state.elapsed(Instant::now()),
                    };
                }
            };
        }
    }

    async fn await_model(&self, state: &RunState) -> Step {
        let now = Instant::now();
        if let BoundsCheck::Abort(violation) = self.bounds.check(state, now) {
            return Step::Aborted(StopReason::Bound(violation));
        }

        let budget = self.bounds.call_budget(state, now);
        let limited_by_budget = budget < self.model_timeout;
        let request = self.context.request(&self.memory, &self.catalog);

        match tokio::time::timeout(self.model_timeout.min(budget), self.llm.infer(&request))
            .await
        {
            Ok(Ok(ModelReply::FinalAnswer(text))) => Step::Final(text),
            Ok(Ok(ModelReply::ToolCall(call))) => {
                debug!(
                    event_name = "agent.model.tool_requested",
                    iteration = state.iteration(),
                    tool = %call.name,
                    "model requested a tool"
                );
                Step::DispatchingTool(call)
            }
            Ok(Err(model_error)) => {
                error!(
                    event_name = "agent.model.failed",
                    provider = self.llm.provider(),
                    iteration = state.iteration(),
                    error_class = model_error.error_class(),
                    error = %model_error,
                    "model call failed"
                );
                Step::Aborted(StopReason::ModelUnavailable)
            }
            Err(_) if limited_by_budget => {
                Step::Aborted(StopReason::Bound(BoundViolation::TimeBudgetExceeded))
            }
            Err(_) => {
                error!(
                    event_name = "agent.model.failed",
                    provider = self.llm.provider(),
                    iteration = state.iteration(),
                    error_class = "model_timeout",
                    timeout_ms = self.model_timeout.as_millis() as u64,
                    "model call timed out"
                );
                Step::Aborted(StopReason::ModelUnavailable)
            }
        }
    }

    async fn dispatch(&mut self, state: &RunState, call: ToolCallRequest) {
        let result = match self.guardrails.screen(&call) {
            GuardrailDecision::Allow => {
                let budget = self.bounds.call_budget(state, Instant::now());
                self.tools.invoke_within(&call.name, &call.arguments, budget).await
            }
            GuardrailDecision::Deny { reason_code, observation } => {
                warn!(
                    event_name = "agent.tool.denied",
                    reason_code,
                    tool = %call.name,
                    iteration = state.iteration(),
                    "model requested a tool it was not offered"
                );
                observation
            }
        };

        info!(
            event_name = "agent.tool.dispatched",
            tool = %call.name,
            iteration = state.iteration(),
            status = if result.is_ok() { "ok" } else { "error" },
            error_kind = result.error_kind.map(|kind| kind.as_str()),
            "tool observation recorded"
        );
        self.memory.append(ConversationTurn::observation(result.content));
    }
}
