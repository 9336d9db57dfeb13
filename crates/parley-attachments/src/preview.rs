// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Locally resolvable preview bytes, keyed by [`PreviewRef`].

use std::sync::Arc;

use dashmap::DashMap;
use parley_core::PreviewRef;
use tracing::trace;

/// Shared store of preview bytes.
///
/// Entries live until released; the transcript releases them when the owning
/// message is deleted or the transcript is cleared.
#[derive(Debug, Default)]
pub struct PreviewStore {
    entries: DashMap<PreviewRef, Arc<Vec<u8>>>,
}

impl PreviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep `bytes` and hand back a reference to them.
    pub fn register(&self, bytes: Vec<u8>) -> PreviewRef {
        let preview = PreviewRef(format!("preview://{}", uuid::Uuid::new_v4()));
        trace!(preview = %preview, size = bytes.len(), "preview registered");
        self.entries.insert(preview.clone(), Arc::new(bytes));
        preview
    }

    pub fn resolve(&self, preview: &PreviewRef) -> Option<Arc<Vec<u8>>> {
        self.entries.get(preview).map(|entry| Arc::clone(entry.value()))
    }

    /// Drop the bytes behind `preview`. Returns false if already released.
    pub fn release(&self, preview: &PreviewRef) -> bool {
        let released = self.entries.remove(preview).is_some();
        if released {
            trace!(preview = %preview, "preview released");
        }
        released
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
