// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Parley session manager.
//!
//! This crate provides the trait definitions, error type, and domain types
//! shared by the quota tracker, attachment uploader, transcript, and session
//! coordinator. Every external service is reached through a trait defined here.

pub mod error;
pub mod progress;
pub mod traits;
pub mod types;

pub use error::ParleyError;
pub use progress::ProgressReporter;
pub use types::{
    AdapterType, AssistantRequest, AssistantResponse, Attachment, AttachmentDescriptor,
    AttachmentId, Author, Connectivity, ConversationId, HealthStatus, Identity, Lifecycle,
    Message, MessageId, PlanTier, PreviewRef, QuotaKind, QuotaState, RawFile, RequestMetadata,
    ResponseMetadata, TransferReceipt, UploadEvent, UserId,
};

pub use traits::{AssistantAdapter, ExportSink, PluginAdapter, QuotaSource, TransferAdapter};
