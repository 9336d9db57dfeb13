// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the quota tracker, uploader, transcript, and coordinator.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Generate a fresh random identifier.
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(
    /// Unique identifier for a transcript message.
    MessageId
);
string_id!(
    /// Unique identifier for an attachment.
    AttachmentId
);
string_id!(
    /// Remote conversation reference handed out by the assistant service.
    ConversationId
);
string_id!(
    /// Identifier of the signed-in user.
    UserId
);

/// The user bound to a session, as supplied by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub display_name: String,
}

impl Identity {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: UserId(id.into()),
            display_name: display_name.into(),
        }
    }
}

/// Who wrote a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Author {
    Requester,
    Assistant,
}

/// Lifecycle of a single message.
///
/// `Pending -> Delivered`, `Pending -> Failed` and `Delivered -> Failed` are the
/// only legal moves. Nothing returns to `Pending`; `retry` creates a new message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Pending,
    Delivered,
    Failed,
}

impl Lifecycle {
    /// Returns true if moving from `self` to `next` is allowed.
    pub fn can_transition_to(self, next: Lifecycle) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Delivered)
                | (Self::Pending, Self::Failed)
                | (Self::Delivered, Self::Failed)
        ) || self == next
    }
}

/// Subscription tier that determines quota limits.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    Free,
    Pro,
    ProPlus,
}

/// The two usage counters tracked per quota period.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum QuotaKind {
    Messages,
    Attachments,
}

/// Connectivity of the session as observed by the connectivity monitor.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    Offline,
    Connecting,
    Online,
    Degraded,
}

impl Connectivity {
    /// Only an online session may send turns.
    pub fn can_send(self) -> bool {
        self == Self::Online
    }
}

/// Local replica of the plan limits and usage for the current period.
///
/// A `None` limit means unlimited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaState {
    pub plan_tier: PlanTier,
    pub messages_used: u64,
    pub message_limit: Option<u64>,
    pub attachments_used: u64,
    pub attachment_limit: Option<u64>,
}

impl QuotaState {
    /// Fresh period with zero usage.
    pub fn new(plan_tier: PlanTier, message_limit: Option<u64>, attachment_limit: Option<u64>) -> Self {
        Self {
            plan_tier,
            messages_used: 0,
            message_limit,
            attachments_used: 0,
            attachment_limit,
        }
    }

    pub fn used(&self, kind: QuotaKind) -> u64 {
        match kind {
            QuotaKind::Messages => self.messages_used,
            QuotaKind::Attachments => self.attachments_used,
        }
    }

    pub fn limit(&self, kind: QuotaKind) -> Option<u64> {
        match kind {
            QuotaKind::Messages => self.message_limit,
            QuotaKind::Attachments => self.attachment_limit,
        }
    }
}

/// Metadata returned by the assistant alongside a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub model_name: String,
    pub token_count: u32,
    pub latency_ms: u64,
}

/// Handle to locally held preview bytes (see the preview store in `parley-attachments`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PreviewRef(pub String);

impl fmt::Display for PreviewRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A file attached to a requester message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: AttachmentId,
    pub display_name: String,
    pub byte_size: u64,
    pub media_type: String,
    /// Locally resolvable preview, set immediately for image-class media.
    pub preview_ref: Option<PreviewRef>,
    /// Set once the transfer completes.
    pub remote_ref: Option<String>,
    pub analysis_summary: Option<String>,
}

impl Attachment {
    /// The non-binary metadata sent with an assistant request.
    pub fn descriptor(&self) -> AttachmentDescriptor {
        AttachmentDescriptor {
            id: self.id.clone(),
            name: self.display_name.clone(),
            media_type: self.media_type.clone(),
            remote_ref: self.remote_ref.clone(),
        }
    }
}

/// A single transcript entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub content: String,
    pub author: Author,
    pub created_at: DateTime<Utc>,
    pub lifecycle: Lifecycle,
    pub attachments: Vec<Attachment>,
    pub response_metadata: Option<ResponseMetadata>,
}

impl Message {
    /// A new pending requester message.
    pub fn requester(id: MessageId, content: impl Into<String>) -> Self {
        Self {
            id,
            content: content.into(),
            author: Author::Requester,
            created_at: Utc::now(),
            lifecycle: Lifecycle::Pending,
            attachments: Vec::new(),
            response_metadata: None,
        }
    }

    /// A delivered assistant message.
    pub fn assistant(content: impl Into<String>, metadata: Option<ResponseMetadata>) -> Self {
        Self {
            id: MessageId::generate(),
            content: content.into(),
            author: Author::Assistant,
            created_at: Utc::now(),
            lifecycle: Lifecycle::Delivered,
            attachments: Vec::new(),
            response_metadata: metadata,
        }
    }

    pub fn is_requester(&self) -> bool {
        self.author == Author::Requester
    }

    /// Case-insensitive match against content and attachment names.
    ///
    /// `needle` must already be lowercased.
    pub fn matches_lowercase(&self, needle: &str) -> bool {
        self.content.to_lowercase().contains(needle)
            || self
                .attachments
                .iter()
                .any(|a| a.display_name.to_lowercase().contains(needle))
    }
}

/// A raw file handed to the uploader by the UI.
#[derive(Clone, PartialEq, Eq)]
pub struct RawFile {
    pub name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl RawFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    pub fn byte_size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

impl fmt::Debug for RawFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawFile")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("byte_size", &self.bytes.len())
            .finish()
    }
}

/// Minimal non-binary file metadata sent with an assistant request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentDescriptor {
    pub id: AttachmentId,
    pub name: String,
    #[serde(rename = "type")]
    pub media_type: String,
    pub remote_ref: Option<String>,
}

/// Context metadata attached to every assistant request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMetadata {
    pub timestamp: DateTime<Utc>,
    pub plan_tier: PlanTier,
}

/// A request to the assistant service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantRequest {
    pub message: String,
    pub identity_id: UserId,
    pub conversation_id: Option<ConversationId>,
    pub attachments: Vec<AttachmentDescriptor>,
    pub metadata: RequestMetadata,
}

/// A reply from the assistant service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantResponse {
    pub reply: String,
    #[serde(default)]
    pub conversation_id: Option<ConversationId>,
    pub model_name: String,
    #[serde(default)]
    pub token_count: u32,
    #[serde(default)]
    pub latency_ms: u64,
}

impl AssistantResponse {
    pub fn metadata(&self) -> ResponseMetadata {
        ResponseMetadata {
            model_name: self.model_name.clone(),
            token_count: self.token_count,
            latency_ms: self.latency_ms,
        }
    }
}

/// Outcome of a single completed file transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReceipt {
    pub remote_ref: String,
    #[serde(default)]
    pub analysis_summary: Option<String>,
}

/// Events emitted by the uploader while a batch is in flight.
///
/// `index` is the file's position in the batch handed to the uploader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    /// The attachment record exists locally (with a preview for images).
    Staged { index: usize, attachment: Attachment },
    /// Transfer progress in percent, strictly increasing per file.
    Progress {
        index: usize,
        attachment_id: AttachmentId,
        percent: u8,
    },
    /// The transfer finished and the remote fields are populated.
    Completed { index: usize, attachment: Attachment },
    /// The file failed; `attachment_id` is set if it had been staged.
    Failed {
        index: usize,
        attachment_id: Option<AttachmentId>,
        file: String,
        reason: String,
    },
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Assistant,
    Transfer,
    QuotaSource,
    Export,
}
