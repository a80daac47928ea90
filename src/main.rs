use anyhow::Result;
use clap::Parser;
use drift::cli::Cli;
use drift::dispatcher;
use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI first to configure logging and color
    let cli = Cli::parse();

    // Determine color usage: disable when requested or when stdout is not a TTY (piped)
    let stdout_is_tty = std::io::stdout().is_terminal();
    let disable_color = cli.no_color || !stdout_is_tty || cli.json;

    // Initialize logging - always write to stderr to keep stdout clean
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_ansi(!disable_color)
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter)
        .init();

    // Disable colored crate globally when needed
    if disable_color {
        colored::control::set_override(false);
    }

    dispatcher::dispatch_command(cli.command, cli.json).await
}
