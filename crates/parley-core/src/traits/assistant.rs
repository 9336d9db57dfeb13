// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Assistant adapter trait for the remote conversational service.

use async_trait::async_trait;

use crate::error::ParleyError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{AssistantRequest, AssistantResponse};

/// Adapter for the assistant service.
///
/// Implementations map every transport or protocol failure to
/// [`ParleyError::RequestFailed`]. The caller applies its own deadline.
#[async_trait]
pub trait AssistantAdapter: PluginAdapter {
    /// Sends one turn and returns the assistant's reply.
    async fn send(&self, request: AssistantRequest) -> Result<AssistantResponse, ParleyError>;
}
