// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transfer adapter trait for uploading attachment bytes.

use async_trait::async_trait;

use crate::error::ParleyError;
use crate::progress::ProgressReporter;
use crate::traits::adapter::PluginAdapter;
use crate::types::{AttachmentId, RawFile, TransferReceipt};

/// Adapter for the attachment transfer service.
#[async_trait]
pub trait TransferAdapter: PluginAdapter {
    /// Uploads a single file, reporting progress through `progress`.
    ///
    /// Failures are reported as [`ParleyError::TransferFailed`].
    async fn transfer(
        &self,
        id: &AttachmentId,
        file: &RawFile,
        progress: &ProgressReporter,
    ) -> Result<TransferReceipt, ParleyError>;
}
