// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Coordinator settings derived from configuration.

use std::time::Duration;

use parley_config::ParleyConfig;
use parley_core::QuotaState;

#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Deadline for one assistant request; expiry is a transport failure.
    pub request_timeout: Duration,
    pub welcome_message: String,
    pub max_file_bytes: u64,
    pub max_concurrent_transfers: usize,
    /// Used when the quota source cannot be reached at start.
    pub fallback_quota: QuotaState,
}

impl SessionSettings {
    pub fn from_config(config: &ParleyConfig) -> Self {
        Self {
            request_timeout: Duration::from_secs(config.assistant.timeout_secs),
            welcome_message: config.session.welcome_message.clone(),
            max_file_bytes: config.attachments.max_file_bytes,
            max_concurrent_transfers: config.attachments.max_concurrent_transfers,
            fallback_quota: config.quota.fallback_state(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&ParleyConfig::default())
    }
}
