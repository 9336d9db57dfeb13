// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-turn state machine.
//!
//! QuotaChecking -> Uploading (only with files) -> AwaitingReply -> Settled.

use parley_core::Lifecycle;

/// Where a single turn is, tracked per requester message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    QuotaChecking,
    Uploading,
    AwaitingReply,
    /// Finished: `Delivered` if a reply arrived, `Failed` otherwise.
    Settled(Lifecycle),
}

impl TurnState {
    pub fn is_settled(self) -> bool {
        matches!(self, Self::Settled(_))
    }
}

impl std::fmt::Display for TurnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TurnState::QuotaChecking => write!(f, "quota_checking"),
            TurnState::Uploading => write!(f, "uploading"),
            TurnState::AwaitingReply => write!(f, "awaiting_reply"),
            TurnState::Settled(lifecycle) => write!(f, "settled({lifecycle})"),
        }
    }
}
