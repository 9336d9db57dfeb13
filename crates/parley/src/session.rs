// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wires configuration into a running session.

use std::sync::Arc;
use std::time::Duration;

use parley_attachments::PreviewStore;
use parley_config::ParleyConfig;
use parley_core::{Connectivity, Identity, ParleyError, UploadEvent};
use parley_quota::StaticQuotaSource;
use parley_session::{
    ConnectivityMonitor, FileExportSink, SessionCoordinator, SessionDeps, SessionSettings,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// A coordinator plus the background monitor feeding its connectivity.
pub struct SessionRuntime {
    pub coordinator: Arc<SessionCoordinator>,
    pub upload_events: mpsc::UnboundedReceiver<UploadEvent>,
    cancel: CancellationToken,
}

/// Identity configured for this session, if any.
pub fn configured_identity(config: &ParleyConfig) -> Option<Identity> {
    config
        .session
        .user_id
        .as_deref()
        .map(|id| Identity::new(id, config.session.display_name.clone()))
}

impl SessionRuntime {
    /// Build adapters from `config`, probe once, start the session, and
    /// spawn the periodic connectivity probe.
    pub async fn start(config: &ParleyConfig) -> Result<Self, ParleyError> {
        let assistant = parley_assistant::assistant_from_config(config)?;
        let transfer = parley_assistant::transfer_from_config(config)?;

        let monitor = Arc::new(ConnectivityMonitor::new(
            Arc::clone(&assistant),
            Connectivity::Offline,
        ));
        monitor.probe_once().await;

        let deps = SessionDeps {
            assistant,
            transfer,
            quota_source: Arc::new(StaticQuotaSource::from_config(&config.quota)),
            export_sink: Arc::new(FileExportSink::new(&config.export.directory)),
            previews: Arc::new(PreviewStore::new()),
        };

        let (tx, upload_events) = mpsc::unbounded_channel();
        let coordinator = SessionCoordinator::start(
            deps,
            configured_identity(config),
            monitor.subscribe(),
            SessionSettings::from_config(config),
        )
        .await
        .with_upload_observer(tx);

        let cancel = CancellationToken::new();
        {
            let monitor = Arc::clone(&monitor);
            let cancel = cancel.clone();
            let interval = Duration::from_secs(config.session.probe_interval_secs);
            tokio::spawn(async move { monitor.run(interval, cancel).await });
        }

        info!(mode = %config.assistant.mode, "session runtime started");
        Ok(Self {
            coordinator: Arc::new(coordinator),
            upload_events,
            cancel,
        })
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for SessionRuntime {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
