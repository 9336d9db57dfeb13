// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Owned per-session context: identity, connectivity, conversation reference.

use parley_core::{Connectivity, ConversationId, Identity};
use tokio::sync::watch;

/// Point-in-time copy of a [`SessionContext`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextSnapshot {
    pub identity: Option<Identity>,
    pub connectivity: Connectivity,
    pub active_conversation: Option<ConversationId>,
}

/// Context for one session. Connectivity is read-only here; the
/// connectivity monitor owns the sending half.
#[derive(Debug)]
pub struct SessionContext {
    identity: Option<Identity>,
    connectivity: watch::Receiver<Connectivity>,
    active_conversation: Option<ConversationId>,
}

impl SessionContext {
    pub fn new(identity: Option<Identity>, connectivity: watch::Receiver<Connectivity>) -> Self {
        Self {
            identity,
            connectivity,
            active_conversation: None,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn connectivity(&self) -> Connectivity {
        *self.connectivity.borrow()
    }

    pub fn active_conversation(&self) -> Option<&ConversationId> {
        self.active_conversation.as_ref()
    }

    pub fn set_conversation(&mut self, conversation: Option<ConversationId>) {
        self.active_conversation = conversation;
    }

    pub fn bind_identity(&mut self, identity: Identity) {
        self.identity = Some(identity);
    }

    /// Unbind the identity. The conversation belonged to it, so it goes too.
    pub fn sign_out(&mut self) {
        self.identity = None;
        self.active_conversation = None;
    }

    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            identity: self.identity.clone(),
            connectivity: self.connectivity(),
            active_conversation: self.active_conversation.clone(),
        }
    }
}
