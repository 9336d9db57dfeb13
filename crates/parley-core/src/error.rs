// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Parley session manager.

use thiserror::Error;

use crate::types::{Connectivity, MessageId, QuotaKind};

/// The primary error type used across all Parley adapter traits and core operations.
#[derive(Debug, Error)]
pub enum ParleyError {
    /// No identity is bound to the session.
    #[error("not authenticated: no identity is bound to this session")]
    NotAuthenticated,

    /// The session is not online (offline, connecting, or degraded).
    #[error("not connected: session connectivity is {state}")]
    NotConnected { state: Connectivity },

    /// The plan limit for the given usage kind has been reached.
    #[error("{kind} quota exceeded for the current period")]
    QuotaExceeded { kind: QuotaKind },

    /// A file exceeds the configured per-file size limit.
    #[error("attachment `{name}` is {size} bytes, limit is {limit} bytes")]
    AttachmentTooLarge { name: String, size: u64, limit: u64 },

    /// Uploading a single file failed.
    #[error("transfer failed for `{file}`: {message}")]
    TransferFailed {
        file: String,
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The assistant request failed (transport error, bad response, or timeout).
    #[error("assistant request failed: {message}")]
    RequestFailed {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// No message with the given id exists in the transcript.
    #[error("message not found: {id}")]
    NotFound { id: MessageId },

    /// Retry was requested for a message that is not a requester message.
    #[error("message {id} was not sent by the requester and cannot be retried")]
    NotRetryable { id: MessageId },

    /// Writing the transcript export failed.
    #[error("export failed: {message}")]
    Export {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration errors (invalid values, missing endpoint, bad header values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ParleyError {
    /// Shorthand for a [`ParleyError::RequestFailed`] without an underlying source.
    pub fn request_failed(message: impl Into<String>) -> Self {
        Self::RequestFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a [`ParleyError::TransferFailed`] without an underlying source.
    pub fn transfer_failed(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TransferFailed {
            file: file.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Whether the failed requester message should offer a retry affordance.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RequestFailed { .. })
    }

    /// Whether the error was raised before the transcript was touched.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::NotAuthenticated | Self::NotConnected { .. } | Self::QuotaExceeded { .. }
        )
    }
}
