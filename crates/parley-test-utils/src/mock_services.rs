// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory quota source and export sink.

use async_trait::async_trait;
use tokio::sync::Mutex;

use parley_core::{ExportSink, Identity, ParleyError, QuotaSource, QuotaState};

/// Returns a fixed quota state, or fails when constructed with [`MockQuotaSource::unavailable`].
pub struct MockQuotaSource {
    state: Option<QuotaState>,
}

impl MockQuotaSource {
    pub fn new(state: QuotaState) -> Self {
        Self { state: Some(state) }
    }

    pub fn unavailable() -> Self {
        Self { state: None }
    }
}

#[async_trait]
impl QuotaSource for MockQuotaSource {
    async fn fetch(&self, _identity: Option<&Identity>) -> Result<QuotaState, ParleyError> {
        self.state
            .clone()
            .ok_or_else(|| ParleyError::request_failed("mock quota source unavailable"))
    }
}

/// Records every export instead of writing it anywhere.
pub struct MockExportSink {
    saved: Mutex<Vec<(String, Vec<u8>)>>,
    fail: bool,
}

impl MockExportSink {
    pub fn new() -> Self {
        Self {
            saved: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// `(file_name, contents)` of every successful save.
    pub async fn saved(&self) -> Vec<(String, Vec<u8>)> {
        self.saved.lock().await.clone()
    }
}

impl Default for MockExportSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExportSink for MockExportSink {
    async fn save(&self, file_name: &str, contents: &[u8]) -> Result<String, ParleyError> {
        if self.fail {
            return Err(ParleyError::Export {
                message: "mock export sink refused the write".to_string(),
                source: None,
            });
        }
        self.saved
            .lock()
            .await
            .push((file_name.to_string(), contents.to_vec()));
        Ok(format!("memory://{file_name}"))
    }
}
