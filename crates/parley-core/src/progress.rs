// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Monotonic per-file progress reporting for transfer adapters.

use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::mpsc::UnboundedSender;

use crate::types::{AttachmentId, UploadEvent};

/// Reports transfer progress for a single file.
///
/// Percentages only ever increase; repeated or lower values are swallowed so
/// observers never see progress move backwards.
#[derive(Debug)]
pub struct ProgressReporter {
    index: usize,
    attachment_id: AttachmentId,
    last: AtomicU8,
    events: Option<UnboundedSender<UploadEvent>>,
}

impl ProgressReporter {
    pub fn new(
        index: usize,
        attachment_id: AttachmentId,
        events: Option<UnboundedSender<UploadEvent>>,
    ) -> Self {
        Self {
            index,
            attachment_id,
            last: AtomicU8::new(0),
            events,
        }
    }

    /// A reporter with no observer. Progress is still tracked.
    pub fn detached(attachment_id: AttachmentId) -> Self {
        Self::new(0, attachment_id, None)
    }

    /// Record `percent` (clamped to 100). Returns true if an event was emitted.
    pub fn report(&self, percent: u8) -> bool {
        let percent = percent.min(100);
        let previous = self.last.fetch_max(percent, Ordering::AcqRel);
        if percent <= previous {
            return false;
        }
        if let Some(tx) = &self.events {
            // Receiver gone means nobody is watching; progress is still recorded.
            let _ = tx.send(UploadEvent::Progress {
                index: self.index,
                attachment_id: self.attachment_id.clone(),
                percent,
            });
        }
        true
    }

    /// Report completion.
    pub fn finish(&self) -> bool {
        self.report(100)
    }

    pub fn last_percent(&self) -> u8 {
        self.last.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn progress_is_strictly_increasing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let reporter = ProgressReporter::new(2, AttachmentId::from("a1"), Some(tx));

        assert!(reporter.report(10));
        assert!(!reporter.report(10));
        assert!(!reporter.report(5));
        assert!(reporter.report(60));
        assert!(reporter.report(250));
        assert!(!reporter.finish());

        let mut seen = Vec::new();
        while let Ok(UploadEvent::Progress { index, percent, .. }) = rx.try_recv() {
            assert_eq!(index, 2);
            seen.push(percent);
        }
        assert_eq!(seen, vec![10, 60, 100]);
        assert_eq!(reporter.last_percent(), 100);
    }

    #[test]
    fn zero_is_never_emitted() {
        let reporter = ProgressReporter::detached(AttachmentId::from("a1"));
        assert!(!reporter.report(0));
        assert_eq!(reporter.last_percent(), 0);
    }

    #[test]
    fn closed_receiver_does_not_break_reporting() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let reporter = ProgressReporter::new(0, AttachmentId::from("a1"), Some(tx));
        assert!(reporter.report(50));
        assert_eq!(reporter.last_percent(), 50);
    }
}
