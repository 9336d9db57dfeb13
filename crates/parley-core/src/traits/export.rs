// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Export sink trait for persisting transcript exports.

use async_trait::async_trait;

use crate::error::ParleyError;

/// Destination for serialized transcript exports.
#[async_trait]
pub trait ExportSink: Send + Sync + 'static {
    /// Persist `contents` under `file_name`. Returns a human-readable location.
    async fn save(&self, file_name: &str, contents: &[u8]) -> Result<String, ParleyError>;
}
