// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ordered message store for one session.
//!
//! The transcript is volatile. Messages are appended in send order and are
//! otherwise touched only by targeted patch or removal by id.

pub mod patch;
pub mod transcript;

pub use patch::MessagePatch;
pub use transcript::{Transcript, TranscriptStats};
