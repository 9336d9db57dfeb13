// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Concurrent attachment upload with per-file progress and isolated failures.

use std::sync::Arc;

use futures::future::join_all;
use parley_core::{
    Attachment, AttachmentId, ParleyError, ProgressReporter, QuotaKind, RawFile,
    TransferAdapter, UploadEvent,
};
use tokio::sync::Semaphore;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::media::MediaClass;
use crate::preview::PreviewStore;

/// A file that did not make it into the turn.
#[derive(Debug)]
pub struct UploadFailure {
    /// Position of the file in the batch.
    pub index: usize,
    pub file: String,
    pub error: ParleyError,
}

/// Terminal state of one upload batch. Partial success is legal.
#[derive(Debug, Default)]
pub struct UploadReport {
    /// Successful attachments, in input order.
    pub attachments: Vec<Attachment>,
    /// Per-file failures, in input order.
    pub failures: Vec<UploadFailure>,
}

impl UploadReport {
    pub fn succeeded(&self) -> u64 {
        self.attachments.len() as u64
    }

    pub fn is_partial(&self) -> bool {
        !self.attachments.is_empty() && !self.failures.is_empty()
    }
}

/// Turns raw files into attachment records through a [`TransferAdapter`].
pub struct AttachmentUploader {
    transfer: Arc<dyn TransferAdapter>,
    previews: Arc<PreviewStore>,
    max_file_bytes: u64,
    permits: Semaphore,
}

fn emit(events: &Option<UnboundedSender<UploadEvent>>, event: UploadEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event);
    }
}

impl AttachmentUploader {
    pub fn new(
        transfer: Arc<dyn TransferAdapter>,
        previews: Arc<PreviewStore>,
        max_file_bytes: u64,
        max_concurrent: usize,
    ) -> Self {
        Self {
            transfer,
            previews,
            max_file_bytes,
            permits: Semaphore::new(max_concurrent.max(1)),
        }
    }

    pub fn previews(&self) -> &Arc<PreviewStore> {
        &self.previews
    }

    /// Upload `files`, allowing at most `attachment_budget` of them (`None` = unlimited).
    ///
    /// Every accepted file is staged (with a preview for images) before any
    /// transfer starts. Transfers then run concurrently up to the configured
    /// bound. One file failing never affects its siblings.
    pub async fn upload(
        &self,
        files: Vec<RawFile>,
        attachment_budget: Option<u64>,
        events: Option<UnboundedSender<UploadEvent>>,
    ) -> UploadReport {
        let mut report = UploadReport::default();
        let mut staged = Vec::with_capacity(files.len());
        let mut admitted = 0u64;

        for (index, file) in files.into_iter().enumerate() {
            if let Err(error) = self.admit(&file, attachment_budget, admitted) {
                warn!(file = %file.name, error = %error, "attachment rejected");
                emit(
                    &events,
                    UploadEvent::Failed {
                        index,
                        attachment_id: None,
                        file: file.name.clone(),
                        reason: error.to_string(),
                    },
                );
                report.failures.push(UploadFailure {
                    index,
                    file: file.name,
                    error,
                });
                continue;
            }
            admitted += 1;

            let attachment = self.stage(&file);
            emit(
                &events,
                UploadEvent::Staged {
                    index,
                    attachment: attachment.clone(),
                },
            );
            staged.push((index, file, attachment));
        }

        let transfers = staged
            .into_iter()
            .map(|(index, file, attachment)| self.transfer_one(index, file, attachment, &events));

        for (index, file, result) in join_all(transfers).await {
            match result {
                Ok(attachment) => report.attachments.push(attachment),
                Err(error) => report.failures.push(UploadFailure { index, file, error }),
            }
        }
        report.failures.sort_by_key(|f| f.index);

        debug!(
            succeeded = report.attachments.len(),
            failed = report.failures.len(),
            "upload batch finished"
        );
        report
    }

    fn admit(&self, file: &RawFile, budget: Option<u64>, admitted: u64) -> Result<(), ParleyError> {
        if file.byte_size() > self.max_file_bytes {
            return Err(ParleyError::AttachmentTooLarge {
                name: file.name.clone(),
                size: file.byte_size(),
                limit: self.max_file_bytes,
            });
        }
        if budget.is_some_and(|budget| admitted >= budget) {
            return Err(ParleyError::QuotaExceeded {
                kind: QuotaKind::Attachments,
            });
        }
        Ok(())
    }

    fn stage(&self, file: &RawFile) -> Attachment {
        let preview_ref = MediaClass::of(&file.media_type)
            .has_preview()
            .then(|| self.previews.register(file.bytes.clone()));

        Attachment {
            id: AttachmentId::generate(),
            display_name: file.name.clone(),
            byte_size: file.byte_size(),
            media_type: file.media_type.clone(),
            preview_ref,
            remote_ref: None,
            analysis_summary: None,
        }
    }

    async fn transfer_one(
        &self,
        index: usize,
        file: RawFile,
        mut attachment: Attachment,
        events: &Option<UnboundedSender<UploadEvent>>,
    ) -> (usize, String, Result<Attachment, ParleyError>) {
        let result = match self.permits.acquire().await {
            Ok(_permit) => {
                let reporter = ProgressReporter::new(index, attachment.id.clone(), events.clone());
                let outcome = self.transfer.transfer(&attachment.id, &file, &reporter).await;
                if outcome.is_ok() {
                    reporter.finish();
                }
                outcome
            }
            Err(_) => Err(ParleyError::Internal("transfer pool closed".to_string())),
        };

        match result {
            Ok(receipt) => {
                attachment.remote_ref = Some(receipt.remote_ref);
                attachment.analysis_summary = receipt.analysis_summary;
                debug!(file = %file.name, attachment_id = %attachment.id, "attachment transferred");
                emit(
                    events,
                    UploadEvent::Completed {
                        index,
                        attachment: attachment.clone(),
                    },
                );
                (index, file.name, Ok(attachment))
            }
            Err(e) => {
                if let Some(preview) = &attachment.preview_ref {
                    self.previews.release(preview);
                }
                let error = match e {
                    e @ ParleyError::TransferFailed { .. } => e,
                    other => ParleyError::TransferFailed {
                        file: file.name.clone(),
                        message: other.to_string(),
                        source: Some(Box::new(other)),
                    },
                };
                warn!(file = %file.name, error = %error, "attachment transfer failed");
                emit(
                    events,
                    UploadEvent::Failed {
                        index,
                        attachment_id: Some(attachment.id.clone()),
                        file: file.name.clone(),
                        reason: error.to_string(),
                    },
                );
                (index, file.name, Err(error))
            }
        }
    }
}
