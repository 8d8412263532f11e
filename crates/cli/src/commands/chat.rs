use std::io::{self, BufRead, Write};

use frontdesk_agent::runtime::AgentExecutor;
use frontdesk_core::config::{AppConfig, LoadOptions};
use tokio::runtime::Runtime;

use crate::commands::{
    build_executor, current_thread_runtime, CommandResult, EXIT_CONFIG, EXIT_RUNTIME,
};

pub const RESET_NOTICE: &str = "Memory reset. Starting fresh conversation.";
pub const FAREWELL: &str = "Thanks for using the support agent!";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplSummary {
    pub messages: usize,
    pub resets: usize,
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "config_validation",
                error.to_string(),
                EXIT_CONFIG,
            );
        }
    };
    let mut executor = match build_executor(&config) {
        Ok(executor) => executor,
        Err(message) => {
            return CommandResult::failure("chat", "client_setup", message, EXIT_RUNTIME);
        }
    };
    let runtime = match current_thread_runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                EXIT_RUNTIME,
            );
        }
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    match drive(&runtime, &mut executor, stdin.lock(), &mut stdout) {
        Ok(summary) => CommandResult::success(
            "chat",
            format!("{} messages, {} resets", summary.messages, summary.resets),
        ),
        Err(error) => CommandResult::failure("chat", "io", error.to_string(), EXIT_RUNTIME),
    }
}

/// Reads one message per line until `quit` or end of input. Blank lines are skipped and
/// `reset` clears the session memory.
pub fn drive<R, W>(
    runtime: &Runtime,
    executor: &mut AgentExecutor,
    input: R,
    output: &mut W,
) -> io::Result<ReplSummary>
where
    R: BufRead,
    W: Write,
{
    let mut summary = ReplSummary::default();
    writeln!(output, "Type 'quit' to exit, 'reset' to clear memory.")?;
    writeln!(output, "Ask about clients, orders, schedules, or services.")?;

    for line in input.lines() {
        let line = line?;
        let message = line.trim();

        if message.eq_ignore_ascii_case("quit") {
            break;
        }
        if message.eq_ignore_ascii_case("reset") {
            executor.reset();
            summary.resets += 1;
            writeln!(output, "{RESET_NOTICE}")?;
            continue;
        }
        if message.is_empty() {
            continue;
        }

        let reply = runtime.block_on(executor.chat(message));
        summary.messages += 1;
        writeln!(output, "agent: {reply}")?;
        writeln!(output)?;
    }

    writeln!(output, "{FAREWELL}")?;
    Ok(summary)
}
