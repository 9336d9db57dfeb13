// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Media type classification.

use std::path::Path;

/// Coarse media class derived from a MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaClass {
    Image,
    Audio,
    Video,
    Document,
    Other,
}

impl MediaClass {
    pub fn of(media_type: &str) -> Self {
        let media_type = media_type.trim().to_ascii_lowercase();
        match media_type.split('/').next().unwrap_or_default() {
            "image" => Self::Image,
            "audio" => Self::Audio,
            "video" => Self::Video,
            "text" => Self::Document,
            "application" if is_document_subtype(&media_type) => Self::Document,
            _ => Self::Other,
        }
    }

    /// Image-class media get a local preview before any transfer.
    pub fn has_preview(self) -> bool {
        self == Self::Image
    }
}

fn is_document_subtype(media_type: &str) -> bool {
    matches!(
        media_type,
        "application/pdf"
            | "application/json"
            | "application/msword"
            | "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
    )
}

/// Guess a MIME type from a file name's extension.
pub fn guess_media_type(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "json" => "application/json",
        "txt" | "log" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}
