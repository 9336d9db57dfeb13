// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parley - a client-side conversational session manager.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod session;
mod shell;
mod status;

use clap::{Parser, Subcommand};
use colored::Colorize;
use parley_config::ParleyConfig;

/// Parley - a client-side conversational session manager.
#[derive(Parser, Debug)]
#[command(name = "parley", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Launch an interactive session (default).
    Shell,
    /// Probe the assistant and show quota usage.
    Status {
        /// Output structured JSON.
        #[arg(long)]
        json: bool,
        /// Disable colors.
        #[arg(long)]
        plain: bool,
    },
    /// Print the effective configuration as TOML.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match parley_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            parley_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.session.log_level);

    let result = match cli.command.unwrap_or(Commands::Shell) {
        Commands::Shell => shell::run_shell(config).await,
        Commands::Status { json, plain } => status::run_status(&config, json, plain).await,
        Commands::Config => print_config(&config),
    };

    if let Err(e) = result {
        eprintln!("{}: {e}", "error".red());
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber with the given log level.
///
/// Logs go to stderr so they do not interleave with shell output.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("parley={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Effective configuration with secrets masked.
fn redacted(config: &ParleyConfig) -> ParleyConfig {
    let mut shown = config.clone();
    if shown.assistant.api_key.is_some() {
        shown.assistant.api_key = Some("********".to_string());
    }
    shown
}

fn print_config(config: &ParleyConfig) -> Result<(), parley_core::ParleyError> {
    let rendered = toml::to_string_pretty(&redacted(config))
        .map_err(|e| parley_core::ParleyError::Config(format!("cannot render config: {e}")))?;
    print!("{rendered}");
    Ok(())
}
