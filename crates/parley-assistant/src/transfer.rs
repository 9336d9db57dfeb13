// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Attachment transfer strategies.

use std::time::Duration;

use async_trait::async_trait;
use parley_core::{
    AdapterType, AttachmentId, HealthStatus, ParleyError, PluginAdapter, ProgressReporter,
    RawFile, TransferAdapter, TransferReceipt,
};
use reqwest::header::CONTENT_TYPE;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::client::default_headers;
use crate::types::describe_failure;

/// Percent after `sent` of `total` bytes, held below 100 until the server answers.
fn chunk_percent(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 99;
    }
    ((sent.min(total) * 99) / total) as u8
}

/// Streams file bytes to `PUT {endpoint}/attachments/{id}`.
///
/// Progress is reported as each chunk is handed to the connection.
#[derive(Debug, Clone)]
pub struct RemoteTransfer {
    client: reqwest::Client,
    base_url: String,
    chunk_size: usize,
}

impl RemoteTransfer {
    pub fn new(endpoint: String, api_key: Option<&str>, chunk_size: usize) -> Result<Self, ParleyError> {
        let client = reqwest::Client::builder()
            .default_headers(default_headers(api_key)?)
            .build()
            .map_err(|e| ParleyError::Config(format!("failed to build upload client: {e}")))?;
        Ok(Self {
            client,
            base_url: endpoint.trim_end_matches('/').to_string(),
            chunk_size: chunk_size.max(1),
        })
    }

    fn failed(file: &RawFile, message: String, source: Option<reqwest::Error>) -> ParleyError {
        ParleyError::TransferFailed {
            file: file.name.clone(),
            message,
            source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
        }
    }
}

#[async_trait]
impl PluginAdapter for RemoteTransfer {
    fn name(&self) -> &str {
        "remote-transfer"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transfer
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        match self.client.get(format!("{}/health", self.base_url)).send().await {
            Ok(r) if r.status().is_success() => Ok(HealthStatus::Healthy),
            Ok(r) => Ok(HealthStatus::Degraded(format!("upload service returned {}", r.status()))),
            Err(e) => Ok(HealthStatus::Unhealthy(format!("unreachable: {e}"))),
        }
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        Ok(())
    }
}

#[async_trait]
impl TransferAdapter for RemoteTransfer {
    async fn transfer(
        &self,
        id: &AttachmentId,
        file: &RawFile,
        progress: &ProgressReporter,
    ) -> Result<TransferReceipt, ParleyError> {
        let total = file.byte_size();
        let chunks: Vec<Vec<u8>> = file.bytes.chunks(self.chunk_size).map(<[u8]>::to_vec).collect();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut sent = 0u64;
        let body = futures::stream::iter(chunks.into_iter().map(move |chunk| {
            sent += chunk.len() as u64;
            let _ = tx.send(chunk_percent(sent, total));
            Ok::<_, std::io::Error>(chunk)
        }));

        let send = self
            .client
            .put(format!("{}/attachments/{id}", self.base_url))
            .header(CONTENT_TYPE, file.media_type.as_str())
            .body(reqwest::Body::wrap_stream(body))
            .send();
        tokio::pin!(send);

        let response = loop {
            tokio::select! {
                result = &mut send => break result,
                Some(percent) = rx.recv() => {
                    progress.report(percent);
                }
            }
        };
        while let Ok(percent) = rx.try_recv() {
            progress.report(percent);
        }

        let response = response
            .map_err(|e| Self::failed(file, format!("upload request failed: {e}"), Some(e)))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Self::failed(file, format!("failed to read upload response: {e}"), Some(e)))?;

        if !status.is_success() {
            let message = describe_failure(status, &text);
            warn!(file = %file.name, status = %status, "upload rejected");
            return Err(Self::failed(file, message, None));
        }

        let receipt: TransferReceipt = serde_json::from_str(&text)
            .map_err(|e| Self::failed(file, format!("failed to parse upload response: {e}"), None))?;
        debug!(file = %file.name, remote_ref = %receipt.remote_ref, "upload complete");
        Ok(receipt)
    }
}

/// Local transfer: walks the file in chunks with a short pause per chunk.
#[derive(Debug, Clone)]
pub struct SimulatedTransfer {
    chunk_size: usize,
    chunk_delay: Duration,
}

impl SimulatedTransfer {
    pub fn new(chunk_size: usize, chunk_delay: Duration) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            chunk_delay,
        }
    }
}

#[async_trait]
impl PluginAdapter for SimulatedTransfer {
    fn name(&self) -> &str {
        "simulated-transfer"
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
impl TransferAdapter for SimulatedTransfer {
    async fn transfer(
        &self,
        id: &AttachmentId,
        file: &RawFile,
        progress: &ProgressReporter,
    ) -> Result<TransferReceipt, ParleyError> {
        let total = file.byte_size();
        let mut sent = 0u64;
        for chunk in file.bytes.chunks(self.chunk_size) {
            tokio::time::sleep(self.chunk_delay).await;
            sent += chunk.len() as u64;
            progress.report(chunk_percent(sent, total));
        }

        Ok(TransferReceipt {
            remote_ref: format!("sim://attachments/{id}"),
            analysis_summary: Some(format!(
                "{} ({}, {} bytes)",
                file.name, file.media_type, total
            )),
        })
    }
}
