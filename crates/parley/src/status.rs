// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `parley status` command implementation.
//!
//! Probes the assistant once and prints connectivity, identity, and plan
//! usage. `--json` emits a structured document for scripting.

use std::io::IsTerminal;
use std::sync::Arc;

use colored::Colorize;
use parley_config::ParleyConfig;
use parley_core::{Connectivity, ParleyError, QuotaState};
use parley_quota::{QuotaTracker, StaticQuotaSource};
use parley_session::ConnectivityMonitor;
use serde::Serialize;

use crate::session::configured_identity;
use crate::shell::format_quota;

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub connectivity: Connectivity,
    pub assistant_mode: String,
    pub user_id: Option<String>,
    pub quota: QuotaState,
}

pub async fn collect_status(config: &ParleyConfig) -> Result<StatusResponse, ParleyError> {
    let assistant = parley_assistant::assistant_from_config(config)?;
    let monitor = ConnectivityMonitor::new(Arc::clone(&assistant), Connectivity::Offline);
    let connectivity = monitor.probe_once().await;

    let identity = configured_identity(config);
    let source = StaticQuotaSource::from_config(&config.quota);
    let tracker =
        QuotaTracker::from_source(&source, identity.as_ref(), config.quota.fallback_state()).await;

    Ok(StatusResponse {
        connectivity,
        assistant_mode: config.assistant.mode.to_string(),
        user_id: identity.map(|i| i.id.to_string()),
        quota: tracker.state(),
    })
}

/// Run the `parley status` command.
///
/// If `plain` is set or stdout is not a TTY, colors are disabled.
pub async fn run_status(config: &ParleyConfig, json: bool, plain: bool) -> Result<(), ParleyError> {
    let status = collect_status(config).await?;

    if json {
        let rendered = serde_json::to_string_pretty(&status)
            .map_err(|e| ParleyError::Internal(format!("failed to render status: {e}")))?;
        println!("{rendered}");
        return Ok(());
    }

    if plain || !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    let state = match status.connectivity {
        Connectivity::Online => "online".green(),
        Connectivity::Degraded => "degraded".yellow(),
        Connectivity::Connecting => "connecting".yellow(),
        Connectivity::Offline => "offline".red(),
    };
    println!("parley: {state} ({} assistant)", status.assistant_mode);
    println!(
        "  identity: {}",
        status.user_id.as_deref().unwrap_or("none (set session.user_id)")
    );
    println!("  {}", format_quota(&status.quota));
    Ok(())
}
