// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock assistant adapter for deterministic testing.
//!
//! Replies are popped from a FIFO queue. When the queue is empty a default
//! "mock reply" is returned.

use std::collections::VecDeque;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use parley_core::{
    AdapterType, AssistantAdapter, AssistantRequest, AssistantResponse, ConversationId,
    HealthStatus, ParleyError, PluginAdapter,
};

/// Conversation id the mock assigns when a request carries none.
pub const MOCK_CONVERSATION: &str = "mock-conversation";

enum Scripted {
    Reply(String),
    Failure(String),
}

pub struct MockAssistant {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<AssistantRequest>>,
    calls: AtomicUsize,
    delay_ms: AtomicU64,
    health: StdMutex<HealthStatus>,
    health_delay_ms: AtomicU64,
}

impl MockAssistant {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            delay_ms: AtomicU64::new(0),
            health: StdMutex::new(HealthStatus::Healthy),
            health_delay_ms: AtomicU64::new(0),
        }
    }

    /// Create a mock pre-loaded with the given replies.
    pub fn with_replies(replies: Vec<String>) -> Self {
        Self {
            script: Mutex::new(replies.into_iter().map(Scripted::Reply).collect()),
            ..Self::new()
        }
    }

    pub async fn push_reply(&self, text: impl Into<String>) {
        self.script.lock().await.push_back(Scripted::Reply(text.into()));
    }

    /// Queue a transport failure for the next call.
    pub async fn push_failure(&self, message: impl Into<String>) {
        self.script
            .lock()
            .await
            .push_back(Scripted::Failure(message.into()));
    }

    /// Delay every `send` by `delay`.
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set_health(&self, status: HealthStatus) {
        *self.health.lock().unwrap_or_else(|e| e.into_inner()) = status;
    }

    pub fn set_health_delay(&self, delay: Duration) {
        self.health_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Number of `send` calls, including failed and timed-out ones.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn requests(&self) -> Vec<AssistantRequest> {
        self.requests.lock().await.clone()
    }
}

impl Default for MockAssistant {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockAssistant {
    fn name(&self) -> &str {
        "mock-assistant"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Assistant
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        let delay = self.health_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        Ok(self.health.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        Ok(())
    }
}

#[async_trait]
impl AssistantAdapter for MockAssistant {
    async fn send(&self, request: AssistantRequest) -> Result<AssistantResponse, ParleyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().await.push(request.clone());

        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let next = self.script.lock().await.pop_front();
        let reply = match next {
            Some(Scripted::Reply(text)) => text,
            Some(Scripted::Failure(message)) => return Err(ParleyError::request_failed(message)),
            None => "mock reply".to_string(),
        };

        Ok(AssistantResponse {
            token_count: reply.split_whitespace().count() as u32,
            reply,
            conversation_id: Some(
                request
                    .conversation_id
                    .unwrap_or_else(|| ConversationId::from(MOCK_CONVERSATION)),
            ),
            model_name: "mock-model".to_string(),
            latency_ms: delay,
        })
    }
}
