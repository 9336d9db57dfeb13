// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Assistant and transfer strategies for Parley.
//!
//! Each external service has a networked strategy (JSON over HTTP via
//! reqwest) and a simulated one that runs locally. [`assistant_from_config`]
//! and [`transfer_from_config`] pick the strategy from configuration.

pub mod client;
pub mod simulated;
pub mod transfer;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use parley_config::ParleyConfig;
use parley_config::model::AssistantMode;
use parley_core::{AssistantAdapter, ParleyError, TransferAdapter};
use tracing::info;

pub use client::RemoteAssistant;
pub use simulated::SimulatedAssistant;
pub use transfer::{RemoteTransfer, SimulatedTransfer};

/// Build the assistant strategy selected by `[assistant] mode`.
pub fn assistant_from_config(config: &ParleyConfig) -> Result<Arc<dyn AssistantAdapter>, ParleyError> {
    let assistant = &config.assistant;
    match assistant.mode {
        AssistantMode::Simulated => {
            info!(model = %assistant.model, "using simulated assistant");
            Ok(Arc::new(SimulatedAssistant::new(
                assistant.model.clone(),
                Duration::from_millis(assistant.simulated_latency_ms),
            )))
        }
        AssistantMode::Remote => {
            let endpoint = assistant.endpoint.clone().ok_or_else(|| {
                ParleyError::Config("assistant.endpoint is required in remote mode".into())
            })?;
            info!(endpoint = %endpoint, "using remote assistant");
            Ok(Arc::new(RemoteAssistant::new(
                endpoint,
                assistant.api_key.as_deref(),
                Duration::from_secs(assistant.timeout_secs),
            )?))
        }
    }
}

/// Build the transfer strategy: remote if `upload_endpoint` is set, simulated otherwise.
pub fn transfer_from_config(config: &ParleyConfig) -> Result<Arc<dyn TransferAdapter>, ParleyError> {
    let attachments = &config.attachments;
    match &attachments.upload_endpoint {
        Some(endpoint) => {
            info!(endpoint = %endpoint, "using remote attachment transfer");
            Ok(Arc::new(RemoteTransfer::new(
                endpoint.clone(),
                config.assistant.api_key.as_deref(),
                attachments.chunk_size,
            )?))
        }
        None => Ok(Arc::new(SimulatedTransfer::new(
            attachments.chunk_size,
            Duration::from_millis(config.assistant.simulated_latency_ms / 8),
        ))),
    }
}
