// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the assistant service.
//!
//! One turn is one `POST {endpoint}/messages`. There are no automatic
//! retries: a failed turn is surfaced to the caller, who may retry explicitly.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use parley_core::{
    AdapterType, AssistantAdapter, AssistantRequest, AssistantResponse, HealthStatus,
    ParleyError, PluginAdapter,
};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::{debug, warn};

use crate::types::describe_failure;

/// Networked assistant strategy.
#[derive(Debug, Clone)]
pub struct RemoteAssistant {
    client: reqwest::Client,
    base_url: String,
}

/// Default headers shared by the HTTP strategies.
pub(crate) fn default_headers(api_key: Option<&str>) -> Result<HeaderMap, ParleyError> {
    let mut headers = HeaderMap::new();
    if let Some(key) = api_key {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| ParleyError::Config(format!("invalid API key header value: {e}")))?,
        );
    }
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}

impl RemoteAssistant {
    /// Creates a client for `endpoint`.
    ///
    /// `timeout` bounds each HTTP exchange; the session applies its own
    /// deadline on top.
    pub fn new(endpoint: String, api_key: Option<&str>, timeout: Duration) -> Result<Self, ParleyError> {
        let client = reqwest::Client::builder()
            .default_headers(default_headers(api_key)?)
            .timeout(timeout)
            .build()
            .map_err(|e| ParleyError::RequestFailed {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl PluginAdapter for RemoteAssistant {
    fn name(&self) -> &str {
        "remote-assistant"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Assistant
    }

    /// `GET {endpoint}/health`. Rate limiting and 503 count as degraded;
    /// anything else that is not a success counts as unhealthy.
    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        let response = match self.client.get(format!("{}/health", self.base_url)).send().await {
            Ok(response) => response,
            Err(e) => return Ok(HealthStatus::Unhealthy(format!("unreachable: {e}"))),
        };
        let status = response.status();
        Ok(match status {
            s if s.is_success() => HealthStatus::Healthy,
            StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE => {
                HealthStatus::Degraded(format!("health endpoint returned {status}"))
            }
            _ => HealthStatus::Unhealthy(format!("health endpoint returned {status}")),
        })
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        Ok(())
    }
}

#[async_trait]
impl AssistantAdapter for RemoteAssistant {
    async fn send(&self, request: AssistantRequest) -> Result<AssistantResponse, ParleyError> {
        let started = Instant::now();
        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| ParleyError::RequestFailed {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, "assistant response received");

        let body = response.text().await.map_err(|e| ParleyError::RequestFailed {
            message: format!("failed to read response body: {e}"),
            source: Some(Box::new(e)),
        })?;

        if !status.is_success() {
            let message = describe_failure(status, &body);
            warn!(status = %status, error = %message, "assistant request rejected");
            return Err(ParleyError::request_failed(message));
        }

        let mut reply: AssistantResponse =
            serde_json::from_str(&body).map_err(|e| ParleyError::RequestFailed {
                message: format!("failed to parse assistant response: {e}"),
                source: Some(Box::new(e)),
            })?;
        if reply.latency_ms == 0 {
            reply.latency_ms = started.elapsed().as_millis() as u64;
        }
        Ok(reply)
    }
}
