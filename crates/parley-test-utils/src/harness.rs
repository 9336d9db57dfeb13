// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end session testing.
//!
//! `TestHarness` assembles a [`SessionCoordinator`] wired to mock adapters
//! and keeps handles to every mock so tests can script and inspect them.

use std::sync::Arc;
use std::time::Duration;

use parley_attachments::PreviewStore;
use parley_core::{Connectivity, Identity, Message, ParleyError, PlanTier, QuotaState, RawFile};
use parley_session::{SessionCoordinator, SessionDeps, SessionSettings, TurnOutcome};
use tokio::sync::watch;

use crate::mock_assistant::MockAssistant;
use crate::mock_services::{MockExportSink, MockQuotaSource};
use crate::mock_transfer::MockTransfer;

/// Builder for creating test sessions with configurable options.
pub struct TestHarnessBuilder {
    replies: Vec<String>,
    quota: QuotaState,
    identity: Option<Identity>,
    connectivity: Connectivity,
    timeout: Duration,
    assistant_delay: Duration,
    failing_export: bool,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            replies: Vec::new(),
            quota: QuotaState::new(PlanTier::Free, Some(50), Some(10)),
            identity: Some(Identity::new("test-user", "Tester")),
            connectivity: Connectivity::Online,
            timeout: Duration::from_secs(5),
            assistant_delay: Duration::ZERO,
            failing_export: false,
        }
    }

    pub fn with_mock_responses(mut self, replies: Vec<String>) -> Self {
        self.replies = replies;
        self
    }

    /// Start from this quota state instead of a fresh free tier.
    pub fn with_quota(mut self, quota: QuotaState) -> Self {
        self.quota = quota;
        self
    }

    pub fn with_connectivity(mut self, connectivity: Connectivity) -> Self {
        self.connectivity = connectivity;
        self
    }

    pub fn without_identity(mut self) -> Self {
        self.identity = None;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_assistant_delay(mut self, delay: Duration) -> Self {
        self.assistant_delay = delay;
        self
    }

    pub fn with_failing_export(mut self) -> Self {
        self.failing_export = true;
        self
    }

    pub async fn build(self) -> TestHarness {
        let assistant = Arc::new(MockAssistant::with_replies(self.replies));
        assistant.set_delay(self.assistant_delay);
        let transfer = Arc::new(MockTransfer::new());
        let export_sink = Arc::new(if self.failing_export {
            MockExportSink::failing()
        } else {
            MockExportSink::new()
        });
        let previews = Arc::new(PreviewStore::new());
        let (connectivity, rx) = watch::channel(self.connectivity);

        let deps = SessionDeps {
            assistant: assistant.clone(),
            transfer: transfer.clone(),
            quota_source: Arc::new(MockQuotaSource::new(self.quota.clone())),
            export_sink: export_sink.clone(),
            previews: Arc::clone(&previews),
        };
        let settings = SessionSettings {
            request_timeout: self.timeout,
            welcome_message: "Welcome to Parley.".to_string(),
            max_file_bytes: 10 * 1024 * 1024,
            max_concurrent_transfers: 3,
            fallback_quota: self.quota,
        };
        let coordinator =
            Arc::new(SessionCoordinator::start(deps, self.identity, rx, settings).await);

        TestHarness {
            coordinator,
            assistant,
            transfer,
            export_sink,
            previews,
            connectivity,
        }
    }
}

/// A session wired to mocks.
pub struct TestHarness {
    pub coordinator: Arc<SessionCoordinator>,
    pub assistant: Arc<MockAssistant>,
    pub transfer: Arc<MockTransfer>,
    pub export_sink: Arc<MockExportSink>,
    pub previews: Arc<PreviewStore>,
    /// Sending half of session connectivity.
    pub connectivity: watch::Sender<Connectivity>,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub async fn send(&self, content: &str) -> Result<TurnOutcome, ParleyError> {
        self.coordinator.send_turn(content, Vec::new()).await
    }

    pub async fn send_with_files(
        &self,
        content: &str,
        files: Vec<RawFile>,
    ) -> Result<TurnOutcome, ParleyError> {
        self.coordinator.send_turn(content, files).await
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.coordinator.snapshot().await
    }

    pub fn set_connectivity(&self, state: Connectivity) {
        self.connectivity.send_replace(state);
    }
}
