// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Quota source backed by configuration.

use async_trait::async_trait;
use parley_config::model::QuotaConfig;
use parley_core::{Identity, ParleyError, QuotaSource, QuotaState};

/// Serves the plan tier, limits, and starting usage from `[quota]`.
#[derive(Debug, Clone)]
pub struct StaticQuotaSource {
    state: QuotaState,
}

impl StaticQuotaSource {
    pub fn new(state: QuotaState) -> Self {
        Self { state }
    }

    pub fn from_config(config: &QuotaConfig) -> Self {
        Self::new(config.to_state())
    }
}

#[async_trait]
impl QuotaSource for StaticQuotaSource {
    async fn fetch(&self, identity: Option<&Identity>) -> Result<QuotaState, ParleyError> {
        if identity.is_none() {
            return Err(ParleyError::NotAuthenticated);
        }
        Ok(self.state.clone())
    }
}
