use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use frontdesk_agent::bounds::{BoundViolation, Bounds};
use frontdesk_agent::guardrails::{StopReason, BOUNDS_EXCEEDED_MESSAGE, MODEL_UNAVAILABLE_MESSAGE};
use frontdesk_agent::llm::{LlmClient, ModelError, ModelReply, ModelRequest};
use frontdesk_agent::memory::TurnRole;
use frontdesk_agent::runtime::{AgentExecutor, ExecutorSettings, ExecutorState};
use frontdesk_agent::tools::support::support_registry;
use frontdesk_agent::tools::{
    ToolArguments, ToolCallRequest, ToolFailure, ToolHandler, ToolRegistry, ToolSpec,
};
use frontdesk_core::config::ToolsConfig;
use frontdesk_core::SupportCatalog;
use serde_json::{json, Value};
use tokio::time::Instant;

type Script = dyn Fn(&ModelRequest) -> Result<ModelReply, ModelError> + Send + Sync;

/// Model double driven by a closure over the request it is shown.
struct ScriptedModel {
    script: Box<Script>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedModel {
    fn new(
        script: impl Fn(&ModelRequest) -> Result<ModelReply, ModelError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self { script: Box::new(script), delay: Duration::ZERO, calls: AtomicUsize::new(0) })
    }

    fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            script: Box::new(|_| Ok(ModelReply::FinalAnswer("late answer".to_string()))),
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for ScriptedModel {
    fn provider(&self) -> &str {
        "scripted"
    }

    async fn infer(&self, request: &ModelRequest) -> Result<ModelReply, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (self.script)(request)
    }
}

struct SlowTool;

#[async_trait]
impl ToolHandler for SlowTool {
    async fn call(&self, _arguments: &ToolArguments) -> Result<String, ToolFailure> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok("slow result that arrived too late".to_string())
    }
}

fn arguments(value: Value) -> ToolArguments {
    match value {
        Value::Object(map) => map,
        _ => ToolArguments::new(),
    }
}

fn tool_call(name: &str, args: Value) -> ModelReply {
    ModelReply::ToolCall(ToolCallRequest::new(name, arguments(args)))
}

fn last_observation(request: &ModelRequest) -> Option<String> {
    request
        .conversation
        .iter()
        .rev()
        .find(|turn| turn.role() == TurnRole::ToolObservation)
        .map(|turn| turn.content().to_string())
}

fn support_tools() -> Arc<ToolRegistry> {
    let config = ToolsConfig { backend_base_url: "http://127.0.0.1:9/api".to_string(), timeout_secs: 1 };
    Arc::new(
        support_registry(Arc::new(SupportCatalog::demo()), &config, reqwest::Client::new())
            .expect("support tools register"),
    )
}

fn settings(max_iterations: u32, wall: Duration) -> ExecutorSettings {
    ExecutorSettings { bounds: Bounds::new(max_iterations, wall), ..ExecutorSettings::default() }
}

/// Asks for the order once, then answers from whatever the tool observed.
fn order_script(order_id: &'static str) -> impl Fn(&ModelRequest) -> Result<ModelReply, ModelError> {
    move |request| match last_observation(request) {
        None => Ok(tool_call("check_order_status", json!({ "order_id": order_id }))),
        Some(observation) if observation.contains("not found") => Ok(ModelReply::FinalAnswer(
            format!("I couldn't find order {order_id}. Please double-check the ID."),
        )),
        Some(observation) => {
            let status = observation
                .lines()
                .find_map(|line| line.strip_prefix("- Order Status: "))
                .unwrap_or("unknown");
            Ok(ModelReply::FinalAnswer(format!("Order {order_id} is currently {status}.")))
        }
    }
}

#[tokio::test]
async fn pending_order_is_answered_after_one_dispatch() {
    let model = ScriptedModel::new(order_script("ORD002"));
    let mut executor =
        AgentExecutor::new(model.clone(), support_tools(), ExecutorSettings::default());

    let outcome = executor.run_until("What's the status of order ORD002?", None).await;

    assert_eq!(outcome.state, ExecutorState::Final);
    assert!(outcome.reply.contains("Pending"), "reply was {}", outcome.reply);
    assert_eq!(outcome.tool_dispatches, 1);
    assert_eq!(model.calls(), 2);

    let roles: Vec<_> = executor.memory().snapshot().iter().map(|turn| turn.role()).collect();
    assert_eq!(roles, vec![TurnRole::User, TurnRole::ToolObservation, TurnRole::Agent]);
}

#[tokio::test]
async fn unknown_order_is_not_fabricated() {
    let model = ScriptedModel::new(order_script("ORD999"));
    let mut executor = AgentExecutor::new(model, support_tools(), ExecutorSettings::default());

    let outcome = executor.run_until("Where is my order ORD999?", None).await;

    assert_eq!(outcome.state, ExecutorState::Final);
    assert_eq!(outcome.tool_dispatches, 1);
    assert!(outcome.reply.contains("couldn't find"));
    for detail in ["Pending", "Paid", "₹", "Amit", "Fitness"] {
        assert!(!outcome.reply.contains(detail), "reply fabricated {detail}");
    }

    let snapshot = executor.memory().snapshot();
    assert_eq!(
        snapshot[1].content(),
        "Order ORD999 not found. Please check the order ID and try again."
    );
}

#[tokio::test]
async fn endless_tool_calls_stop_at_iteration_limit() {
    let model = ScriptedModel::new(|_| Ok(tool_call("get_service_info", json!({}))));
    let mut executor =
        AgentExecutor::new(model.clone(), support_tools(), settings(3, Duration::from_secs(30)));

    let outcome = executor.run_until("tell me everything", None).await;

    assert_eq!(outcome.state, ExecutorState::Aborted);
    assert_eq!(
        outcome.stop_reason,
        Some(StopReason::Bound(BoundViolation::IterationLimitExceeded))
    );
    assert_eq!(outcome.reply, BOUNDS_EXCEEDED_MESSAGE);
    assert_eq!(outcome.tool_dispatches, 3);
    assert_eq!(model.calls(), 3);
}

#[tokio::test]
async fn slow_tool_is_abandoned_at_the_deadline() {
    let mut tools = ToolRegistry::new();
    tools.register(ToolSpec::new("slow_lookup", "Takes forever", SlowTool)).expect("registers");
    let model = ScriptedModel::new(|_| Ok(tool_call("slow_lookup", json!({}))));
    let mut executor =
        AgentExecutor::new(model, Arc::new(tools), settings(5, Duration::from_millis(200)));

    let started = Instant::now();
    let outcome = executor.run_until("look it up", None).await;

    assert!(started.elapsed() < Duration::from_secs(2), "took {:?}", started.elapsed());
    assert_eq!(outcome.state, ExecutorState::Aborted);
    assert_eq!(outcome.stop_reason, Some(StopReason::Bound(BoundViolation::TimeBudgetExceeded)));
    assert_eq!(outcome.reply, BOUNDS_EXCEEDED_MESSAGE);
    assert!(!outcome.reply.contains("too late"));
}

#[tokio::test]
async fn hallucinated_tool_becomes_observation_and_loop_recovers() {
    let model = ScriptedModel::new(|request| match last_observation(request) {
        None => Ok(tool_call("refund_order", json!({ "order_id": "ORD001" }))),
        Some(observation) if observation.contains("not available") => {
            Ok(ModelReply::FinalAnswer("I can't issue refunds, but I can check an order.".into()))
        }
        Some(other) => Ok(ModelReply::FinalAnswer(other)),
    });
    let mut executor = AgentExecutor::new(model, support_tools(), ExecutorSettings::default());

    let outcome = executor.run_until("refund ORD001", None).await;

    assert_eq!(outcome.state, ExecutorState::Final);
    assert_eq!(outcome.tool_dispatches, 1);
    assert!(outcome.reply.contains("can't issue refunds"));
}

#[tokio::test]
async fn invalid_arguments_are_visible_to_the_model() {
    let model = ScriptedModel::new(|request| match last_observation(request) {
        None => Ok(tool_call("check_order_status", json!({ "order": "ORD002" }))),
        Some(observation) => Ok(ModelReply::FinalAnswer(observation)),
    });
    let mut executor = AgentExecutor::new(model, support_tools(), ExecutorSettings::default());

    let outcome = executor.run_until("status?", None).await;

    assert_eq!(outcome.state, ExecutorState::Final);
    assert!(outcome.reply.contains("missing required parameter `order_id`"));
}

#[tokio::test]
async fn model_failure_returns_generic_apology() {
    let model = ScriptedModel::new(|_| Err(ModelError::Unreachable("connection refused".into())));
    let mut executor = AgentExecutor::new(model, support_tools(), ExecutorSettings::default());

    let outcome = executor.run_until("hello", None).await;

    assert_eq!(outcome.stop_reason, Some(StopReason::ModelUnavailable));
    assert_eq!(outcome.reply, MODEL_UNAVAILABLE_MESSAGE);
    assert!(!outcome.reply.contains("connection refused"));
    let last = executor.memory().last().map(|turn| (turn.role(), turn.content().to_string()));
    assert_eq!(last, Some((TurnRole::Agent, MODEL_UNAVAILABLE_MESSAGE.to_string())));
}

#[tokio::test]
async fn model_exceeding_its_own_timeout_is_unavailable() {
    let model = ScriptedModel::slow(Duration::from_secs(5));
    let settings = ExecutorSettings {
        model_timeout: Duration::from_millis(50),
        ..settings(5, Duration::from_secs(30))
    };
    let mut executor = AgentExecutor::new(model, support_tools(), settings);

    let outcome = executor.run_until("hello", None).await;

    assert_eq!(outcome.stop_reason, Some(StopReason::ModelUnavailable));
}

#[tokio::test]
async fn model_outlasting_the_run_budget_exceeds_time() {
    let model = ScriptedModel::slow(Duration::from_secs(5));
    let mut executor =
        AgentExecutor::new(model, support_tools(), settings(5, Duration::from_millis(100)));

    let outcome = executor.run_until("hello", None).await;

    assert_eq!(outcome.stop_reason, Some(StopReason::Bound(BoundViolation::TimeBudgetExceeded)));
    assert_eq!(outcome.reply, BOUNDS_EXCEEDED_MESSAGE);
}

#[tokio::test]
async fn expired_caller_deadline_skips_the_model() {
    let model = ScriptedModel::new(|_| Ok(ModelReply::FinalAnswer("hi".into())));
    let mut executor =
        AgentExecutor::new(model.clone(), support_tools(), ExecutorSettings::default());

    let outcome = executor.run_until("hello", Some(Instant::now())).await;

    assert_eq!(outcome.stop_reason, Some(StopReason::Bound(BoundViolation::TimeBudgetExceeded)));
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn executors_sharing_collaborators_keep_separate_memory() {
    let model = ScriptedModel::new(|request| {
        Ok(ModelReply::FinalAnswer(format!("turns seen: {}", request.conversation.len())))
    });
    let tools = support_tools();
    let mut first = AgentExecutor::new(model.clone(), Arc::clone(&tools), ExecutorSettings::default());
    let mut second = AgentExecutor::new(model, tools, ExecutorSettings::default());

    first.chat("my name is Priya").await;
    first.chat("my order is ORD001").await;
    let reply = second.chat("hello").await;

    assert_eq!(reply, "turns seen: 1");
    assert!(second.memory().snapshot().iter().all(|turn| !turn.content().contains("Priya")));
    assert_eq!(first.memory().len(), 4);
}

#[tokio::test]
async fn reset_starts_a_fresh_conversation() {
    let model = ScriptedModel::new(|request| {
        Ok(ModelReply::FinalAnswer(format!("turns seen: {}", request.conversation.len())))
    });
    let mut executor = AgentExecutor::new(model, support_tools(), ExecutorSettings::default());

    executor.chat("first").await;
    executor.reset();
    executor.reset();

    assert_eq!(executor.chat("second").await, "turns seen: 1");
}
