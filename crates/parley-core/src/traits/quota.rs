// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Quota source trait: where the initial plan limits and usage come from.

use async_trait::async_trait;

use crate::error::ParleyError;
use crate::types::{Identity, QuotaState};

/// Supplies the quota state at session start.
#[async_trait]
pub trait QuotaSource: Send + Sync + 'static {
    /// Fetch limits and current usage for `identity`.
    async fn fetch(&self, identity: Option<&Identity>) -> Result<QuotaState, ParleyError>;
}
