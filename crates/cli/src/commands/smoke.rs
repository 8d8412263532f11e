use std::time::Instant;

use frontdesk_agent::runtime::{AgentExecutor, ExecutorState};
use frontdesk_core::config::{AppConfig, LoadOptions};
use serde::Serialize;
use tokio::runtime::Runtime;

use crate::commands::{build_executor, current_thread_runtime, CommandResult, EXIT_CONFIG};

pub const SMOKE_QUERIES: [&str; 6] = [
    "Hello! What services do you offer?",
    "Can you find information about Priya Sharma?",
    "What's the status of order ORD002?",
    "What are the yoga class schedules?",
    "How much does fitness training cost?",
    "I want to enquire about wellness consultation",
];

const EXIT_SMOKE_FAILED: u8 = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum SmokeStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct SmokeCheck {
    name: String,
    status: SmokeStatus,
    elapsed_ms: u64,
    message: String,
}

#[derive(Debug, Serialize)]
struct SmokeReport {
    command: &'static str,
    status: SmokeStatus,
    summary: String,
    total_elapsed_ms: u64,
    checks: Vec<SmokeCheck>,
}

pub fn run() -> CommandResult {
    let started = Instant::now();
    let mut checks = Vec::new();

    let config = match timed_check(|| AppConfig::load(LoadOptions::default())) {
        Ok((elapsed_ms, config)) => {
            checks.push(check(
                "config_validation",
                SmokeStatus::Pass,
                elapsed_ms,
                "configuration loaded and validated",
            ));
            config
        }
        Err((elapsed_ms, error)) => {
            checks.push(check(
                "config_validation",
                SmokeStatus::Fail,
                elapsed_ms,
                error.to_string(),
            ));
            checks.push(skipped("client_setup"));
            checks.extend(query_names().map(skipped));
            return finalize_report(checks, started, EXIT_CONFIG);
        }
    };

    let (mut executor, runtime) = match timed_check(|| setup(&config)) {
        Ok((elapsed_ms, ready)) => {
            checks.push(check(
                "client_setup",
                SmokeStatus::Pass,
                elapsed_ms,
                format!(
                    "{} client for `{}` ready",
                    config.llm.provider.as_str(),
                    config.llm.model
                ),
            ));
            ready
        }
        Err((elapsed_ms, message)) => {
            checks.push(check("client_setup", SmokeStatus::Fail, elapsed_ms, message));
            checks.extend(query_names().map(skipped));
            return finalize_report(checks, started, EXIT_CONFIG);
        }
    };

    checks.extend(run_queries(&runtime, &mut executor));
    finalize_report(checks, started, EXIT_SMOKE_FAILED)
}

/// Sends every canned query through one session; a query passes when the agent reaches a
/// final answer rather than a fallback.
pub fn run_queries_report(runtime: &Runtime, executor: &mut AgentExecutor) -> CommandResult {
    let started = Instant::now();
    let checks = run_queries(runtime, executor);
    finalize_report(checks, started, EXIT_SMOKE_FAILED)
}

fn run_queries(runtime: &Runtime, executor: &mut AgentExecutor) -> Vec<SmokeCheck> {
    SMOKE_QUERIES
        .iter()
        .zip(query_names())
        .map(|(query, name)| {
            let outcome = runtime.block_on(executor.run_until(query, None));
            SmokeCheck {
                name,
                status: if outcome.state == ExecutorState::Final {
                    SmokeStatus::Pass
                } else {
                    SmokeStatus::Fail
                },
                elapsed_ms: outcome.elapsed.as_millis() as u64,
                message: outcome.reply,
            }
        })
        .collect()
}

fn setup(config: &AppConfig) -> Result<(AgentExecutor, Runtime), String> {
    let executor = build_executor(config)?;
    let runtime = current_thread_runtime()
        .map_err(|error| format!("failed to initialize async runtime: {error}"))?;
    Ok((executor, runtime))
}

fn query_names() -> impl Iterator<Item = String> {
    (1..=SMOKE_QUERIES.len()).map(|index| format!("query_{index}"))
}

fn timed_check<T, E>(check: impl FnOnce() -> Result<T, E>) -> Result<(u64, T), (u64, E)> {
    let started = Instant::now();
    match check() {
        Ok(value) => Ok((started.elapsed().as_millis() as u64, value)),
        Err(error) => Err((started.elapsed().as_millis() as u64, error)),
    }
}

fn check(
    name: impl Into<String>,
    status: SmokeStatus,
    elapsed_ms: u64,
    message: impl Into<String>,
) -> SmokeCheck {
    SmokeCheck { name: name.into(), status, elapsed_ms, message: message.into() }
}

fn skipped(name: impl Into<String>) -> SmokeCheck {
    check(name, SmokeStatus::Skipped, 0, "skipped due previous failure")
}

fn finalize_report(checks: Vec<SmokeCheck>, started: Instant, failure_code: u8) -> CommandResult {
    let total_elapsed_ms = started.elapsed().as_millis() as u64;
    let passed = checks.iter().filter(|check| check.status == SmokeStatus::Pass).count();
    let total = checks.len();
    let failed = checks.iter().any(|check| check.status == SmokeStatus::Fail);

    let report = SmokeReport {
        command: "smoke",
        status: if failed { SmokeStatus::Fail } else { SmokeStatus::Pass },
        summary: format!("smoke: {passed}/{total} checks passed in {total_elapsed_ms}ms"),
        total_elapsed_ms,
        checks,
    };

    let human = report.summary.clone();
    let machine = serde_json::to_string(&report).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"smoke\",\"status\":\"fail\",\"summary\":\"serialization failed\",\"error\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    });

    CommandResult {
        exit_code: if failed { failure_code } else { 0 },
        output: format!("{human}\n{machine}"),
    }
}
