// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local assistant strategy that fabricates canned replies.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use parley_core::{
    AdapterType, AssistantAdapter, AssistantRequest, AssistantResponse, ConversationId,
    HealthStatus, ParleyError, PluginAdapter,
};
use tracing::debug;

const CANNED_REPLIES: &[&str] = &[
    "That's a good question. Here's how I'd think about it.",
    "Thanks for the details. Let me walk through it step by step.",
    "Interesting! A few things stand out to me.",
    "Sure, I can help with that.",
];

/// Canned replies after a fixed latency. Always healthy.
#[derive(Debug, Clone)]
pub struct SimulatedAssistant {
    model: String,
    latency: Duration,
}

impl SimulatedAssistant {
    pub fn new(model: String, latency: Duration) -> Self {
        Self { model, latency }
    }

    fn compose(request: &AssistantRequest) -> String {
        let seed = request.message.bytes().map(usize::from).sum::<usize>();
        let opener = CANNED_REPLIES[seed % CANNED_REPLIES.len()];

        if request.attachments.is_empty() {
            return opener.to_string();
        }
        let names = request
            .attachments
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "{opener} I looked at {} attachment(s): {names}.",
            request.attachments.len()
        )
    }
}

#[async_trait]
impl PluginAdapter for SimulatedAssistant {
    fn name(&self) -> &str {
        "simulated-assistant"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Assistant
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        Ok(())
    }
}

#[async_trait]
impl AssistantAdapter for SimulatedAssistant {
    async fn send(&self, request: AssistantRequest) -> Result<AssistantResponse, ParleyError> {
        let started = Instant::now();
        tokio::time::sleep(self.latency).await;

        let reply = Self::compose(&request);
        let token_count = reply.split_whitespace().count() as u32;
        let conversation_id = request
            .conversation_id
            .clone()
            .unwrap_or_else(ConversationId::generate);
        debug!(conversation_id = %conversation_id, tokens = token_count, "simulated reply");

        Ok(AssistantResponse {
            reply,
            conversation_id: Some(conversation_id),
            model_name: self.model.clone(),
            token_count,
            latency_ms: started.elapsed().as_millis() as u64,
        })
    }
}
