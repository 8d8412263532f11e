pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "frontdesk",
    about = "Frontdesk support agent operator CLI",
    long_about = "Talk to the support agent, run the canned smoke conversation, and inspect effective configuration.",
    after_help = "Examples:\n  frontdesk chat\n  frontdesk smoke\n  frontdesk config"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Interactive conversation with the agent ('reset' clears memory, 'quit' exits)")]
    Chat,
    #[command(about = "Run the canned support queries through one session with per-query timing")]
    Smoke,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Chat => commands::chat::run(),
        Command::Smoke => commands::smoke::run(),
        Command::Config => commands::config::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
