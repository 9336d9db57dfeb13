// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transcript export document and the file-backed export sink.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use parley_core::{Author, ExportSink, Identity, Message, ParleyError};
use serde::Serialize;

/// Serialized form of a transcript export.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub identity: Option<ExportIdentity>,
    pub exported_at: DateTime<Utc>,
    pub message_count: usize,
    pub messages: Vec<ExportMessage>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportIdentity {
    pub id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportMessage {
    pub role: Author,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub attachments: Vec<ExportAttachment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportAttachment {
    pub name: String,
    #[serde(rename = "type")]
    pub media_type: String,
}

impl ExportDocument {
    pub fn new(identity: Option<&Identity>, exported_at: DateTime<Utc>, messages: &[Message]) -> Self {
        let messages: Vec<ExportMessage> = messages
            .iter()
            .map(|m| ExportMessage {
                role: m.author,
                content: m.content.clone(),
                timestamp: m.created_at,
                attachments: m
                    .attachments
                    .iter()
                    .map(|a| ExportAttachment {
                        name: a.display_name.clone(),
                        media_type: a.media_type.clone(),
                    })
                    .collect(),
            })
            .collect();

        Self {
            identity: identity.map(|i| ExportIdentity {
                id: i.id.to_string(),
                display_name: i.display_name.clone(),
            }),
            exported_at,
            message_count: messages.len(),
            messages,
        }
    }
}

/// `parley-transcript-YYYY-MM-DD.json`
pub fn export_file_name(date: NaiveDate) -> String {
    format!("parley-transcript-{}.json", date.format("%Y-%m-%d"))
}

/// What a successful export produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReceipt {
    pub file_name: String,
    /// Sink-specific location (a filesystem path for [`FileExportSink`]).
    pub location: String,
    pub message_count: usize,
}

/// Writes exports into a directory, creating it if needed.
#[derive(Debug, Clone)]
pub struct FileExportSink {
    directory: PathBuf,
}

impl FileExportSink {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &PathBuf {
        &self.directory
    }
}

fn export_error(message: String, e: std::io::Error) -> ParleyError {
    ParleyError::Export {
        message,
        source: Some(Box::new(e)),
    }
}

#[async_trait]
impl ExportSink for FileExportSink {
    async fn save(&self, file_name: &str, contents: &[u8]) -> Result<String, ParleyError> {
        tokio::fs::create_dir_all(&self.directory).await.map_err(|e| {
            export_error(
                format!("cannot create {}: {e}", self.directory.display()),
                e,
            )
        })?;

        let path = self.directory.join(file_name);
        tokio::fs::write(&path, contents)
            .await
            .map_err(|e| export_error(format!("cannot write {}: {e}", path.display()), e))?;

        Ok(path.display().to_string())
    }
}
