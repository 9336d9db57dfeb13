// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Targeted edits applied to a single message.

use parley_core::{Attachment, AttachmentId, Lifecycle, Message};

/// One edit to a message's attachment list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentEdit {
    /// Append, or replace an entry with the same id.
    Upsert(Attachment),
    /// Drop the entry with this id, if present.
    Remove(AttachmentId),
}

/// A partial update to a message. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessagePatch {
    pub lifecycle: Option<Lifecycle>,
    pub attachments: Vec<AttachmentEdit>,
}

impl MessagePatch {
    pub fn lifecycle(lifecycle: Lifecycle) -> Self {
        Self {
            lifecycle: Some(lifecycle),
            ..Self::default()
        }
    }

    pub fn upsert_attachment(attachment: Attachment) -> Self {
        Self {
            attachments: vec![AttachmentEdit::Upsert(attachment)],
            ..Self::default()
        }
    }

    pub fn remove_attachment(id: AttachmentId) -> Self {
        Self {
            attachments: vec![AttachmentEdit::Remove(id)],
            ..Self::default()
        }
    }

    /// Whether applying this patch to `message` keeps its lifecycle legal.
    pub(crate) fn is_legal_for(&self, message: &Message) -> bool {
        self.lifecycle
            .is_none_or(|next| message.lifecycle.can_transition_to(next))
    }

    /// Apply to `message`, returning attachments that left the message.
    pub(crate) fn apply(self, message: &mut Message) -> Vec<Attachment> {
        let mut dropped = Vec::new();

        if let Some(lifecycle) = self.lifecycle {
            message.lifecycle = lifecycle;
        }

        for edit in self.attachments {
            match edit {
                AttachmentEdit::Upsert(attachment) => {
                    match message.attachments.iter_mut().find(|a| a.id == attachment.id) {
                        Some(slot) => {
                            let previous = std::mem::replace(slot, attachment);
                            if previous.preview_ref != slot.preview_ref {
                                dropped.push(previous);
                            }
                        }
                        None => message.attachments.push(attachment),
                    }
                }
                AttachmentEdit::Remove(id) => {
                    if let Some(pos) = message.attachments.iter().position(|a| a.id == id) {
                        dropped.push(message.attachments.remove(pos));
                    }
                }
            }
        }

        dropped
    }
}
