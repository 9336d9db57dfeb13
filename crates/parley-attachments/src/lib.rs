// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Attachment pipeline for Parley.
//!
//! Turns raw files into [`parley_core::Attachment`] records: size and quota
//! checks, immediate local previews for images, and concurrent transfers with
//! per-file progress. Failures are scoped to the file that caused them.

pub mod media;
pub mod preview;
pub mod uploader;

pub use media::{MediaClass, guess_media_type};
pub use preview::PreviewStore;
pub use uploader::{AttachmentUploader, UploadFailure, UploadReport};
