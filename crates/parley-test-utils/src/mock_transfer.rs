// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock transfer adapter with scripted progress and per-file failures.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use parley_core::{
    AdapterType, AttachmentId, HealthStatus, ParleyError, PluginAdapter, ProgressReporter,
    RawFile, TransferAdapter, TransferReceipt,
};

/// Progress reported before a transfer completes; the uploader reports 100.
const STEPS: [u8; 3] = [25, 50, 75];

pub struct MockTransfer {
    failing: Mutex<HashSet<String>>,
    step_delay_ms: AtomicU64,
    transfers: AtomicUsize,
}

impl MockTransfer {
    pub fn new() -> Self {
        Self {
            failing: Mutex::new(HashSet::new()),
            step_delay_ms: AtomicU64::new(0),
            transfers: AtomicUsize::new(0),
        }
    }

    /// Make every transfer of a file named `name` fail.
    pub async fn fail_file(&self, name: impl Into<String>) {
        self.failing.lock().await.insert(name.into());
    }

    /// Sleep between progress steps.
    pub fn set_step_delay(&self, delay: Duration) {
        self.step_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn transfer_count(&self) -> usize {
        self.transfers.load(Ordering::SeqCst)
    }
}

impl Default for MockTransfer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockTransfer {
    fn name(&self) -> &str {
        "mock-transfer"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transfer
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        Ok(())
    }
}

#[async_trait]
impl TransferAdapter for MockTransfer {
    async fn transfer(
        &self,
        id: &AttachmentId,
        file: &RawFile,
        progress: &ProgressReporter,
    ) -> Result<TransferReceipt, ParleyError> {
        self.transfers.fetch_add(1, Ordering::SeqCst);
        let fails = self.failing.lock().await.contains(&file.name);
        let delay = Duration::from_millis(self.step_delay_ms.load(Ordering::SeqCst));

        for (i, step) in STEPS.iter().enumerate() {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if fails && i == 1 {
                return Err(ParleyError::transfer_failed(&file.name, "mock transfer failure"));
            }
            progress.report(*step);
        }

        Ok(TransferReceipt {
            remote_ref: format!("mock://attachments/{id}"),
            analysis_summary: Some(format!("{} ({} bytes)", file.name, file.byte_size())),
        })
    }
}
