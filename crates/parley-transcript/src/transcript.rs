// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The transcript store.

use std::sync::Arc;

use parley_attachments::PreviewStore;
use parley_core::{Attachment, Author, Lifecycle, Message, MessageId};
use tracing::debug;

use crate::patch::MessagePatch;

/// Per-author and per-lifecycle counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranscriptStats {
    pub requester: usize,
    pub assistant: usize,
    pub pending: usize,
    pub delivered: usize,
    pub failed: usize,
    pub attachments: usize,
}

/// Ordered sequence of messages for one session.
///
/// Append order is send order and `created_at` never decreases along it.
/// Removing a message (or clearing) releases the preview bytes its
/// attachments reference.
#[derive(Debug)]
pub struct Transcript {
    messages: Vec<Message>,
    previews: Arc<PreviewStore>,
}

impl Transcript {
    pub fn new(previews: Arc<PreviewStore>) -> Self {
        Self {
            messages: Vec::new(),
            previews,
        }
    }

    /// Append `message` at the end.
    ///
    /// `created_at` is raised to the previous message's timestamp if the
    /// clock went backwards.
    ///
    /// # Panics
    ///
    /// Panics if a message with the same id is already present.
    pub fn append(&mut self, mut message: Message) {
        assert!(
            self.position(&message.id).is_none(),
            "duplicate message id {} appended to transcript",
            message.id
        );
        if let Some(last) = self.messages.last()
            && message.created_at < last.created_at
        {
            message.created_at = last.created_at;
        }
        debug!(message_id = %message.id, author = %message.author, lifecycle = %message.lifecycle, "message appended");
        self.messages.push(message);
    }

    /// Apply `patch` to the message with `id`.
    ///
    /// Returns false if no such message exists or the patch would move its
    /// lifecycle backwards; the message is untouched in both cases.
    pub fn update_by_id(&mut self, id: &MessageId, patch: MessagePatch) -> bool {
        let Some(message) = self.messages.iter_mut().find(|m| &m.id == id) else {
            return false;
        };
        if !patch.is_legal_for(message) {
            debug!(message_id = %id, from = %message.lifecycle, "illegal lifecycle patch ignored");
            return false;
        }
        let before = message.lifecycle;
        let dropped = patch.apply(message);
        if before != message.lifecycle {
            debug!(message_id = %id, from = %before, to = %message.lifecycle, "lifecycle transition");
        }
        self.release_all(&dropped);
        true
    }

    /// Remove the message with `id`, releasing its previews.
    pub fn remove_by_id(&mut self, id: &MessageId) -> bool {
        let Some(pos) = self.position(id) else {
            return false;
        };
        let removed = self.messages.remove(pos);
        self.release_all(&removed.attachments);
        debug!(message_id = %id, "message removed");
        true
    }

    /// Ordered, read-only view of every message.
    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    /// Messages whose content or any attachment name contains `query`,
    /// ignoring case. An empty query matches everything.
    pub fn search(&self, query: &str) -> Vec<Message> {
        let needle = query.to_lowercase();
        self.messages
            .iter()
            .filter(|m| m.matches_lowercase(&needle))
            .cloned()
            .collect()
    }

    /// Remove every message and release all previews.
    pub fn clear(&mut self) {
        for message in std::mem::take(&mut self.messages) {
            self.release_all(&message.attachments);
        }
        debug!("transcript cleared");
    }

    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    pub fn position(&self, id: &MessageId) -> Option<usize> {
        self.messages.iter().position(|m| &m.id == id)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The assistant reply that directly depends on requester message `id`:
    /// the next message, if it is an assistant message no older than `id`.
    pub fn dependent_reply(&self, id: &MessageId) -> Option<&Message> {
        let pos = self.position(id)?;
        let origin = &self.messages[pos];
        self.messages[pos + 1..]
            .iter()
            .take_while(|m| m.author != Author::Requester)
            .find(|m| m.created_at >= origin.created_at)
    }

    pub fn stats(&self) -> TranscriptStats {
        let mut stats = TranscriptStats::default();
        for m in &self.messages {
            match m.author {
                Author::Requester => stats.requester += 1,
                Author::Assistant => stats.assistant += 1,
            }
            match m.lifecycle {
                Lifecycle::Pending => stats.pending += 1,
                Lifecycle::Delivered => stats.delivered += 1,
                Lifecycle::Failed => stats.failed += 1,
            }
            stats.attachments += m.attachments.len();
        }
        stats
    }

    fn release_all(&self, attachments: &[Attachment]) {
        for preview in attachments.iter().filter_map(|a| a.preview_ref.as_ref()) {
            self.previews.release(preview);
        }
    }
}
