// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! FIFO turn queue.
//!
//! `send_turn` may be called concurrently, in which case replies land in
//! completion order. Callers that need replies in submission order push turns
//! through a [`TurnQueue`]: a single worker drains an mpsc channel and runs
//! one turn at a time against the shared coordinator.

use std::sync::Arc;

use parley_core::{ParleyError, RawFile};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::coordinator::{SessionCoordinator, TurnOutcome};

struct QueuedTurn {
    content: String,
    files: Vec<RawFile>,
    reply: oneshot::Sender<Result<TurnOutcome, ParleyError>>,
}

pub struct TurnQueue {
    tx: mpsc::Sender<QueuedTurn>,
    worker: JoinHandle<()>,
}

impl TurnQueue {
    /// Spawn the worker. `capacity` bounds the number of waiting turns.
    pub fn spawn(coordinator: Arc<SessionCoordinator>, capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<QueuedTurn>(capacity.max(1));
        let worker = tokio::spawn(async move {
            while let Some(turn) = rx.recv().await {
                let result = coordinator.send_turn(&turn.content, turn.files).await;
                // Submitter may have stopped waiting.
                let _ = turn.reply.send(result);
            }
            debug!("turn queue drained");
        });
        Self { tx, worker }
    }

    /// Enqueue a turn. The receiver resolves once the turn settles.
    pub async fn submit(
        &self,
        content: impl Into<String>,
        files: Vec<RawFile>,
    ) -> Result<oneshot::Receiver<Result<TurnOutcome, ParleyError>>, ParleyError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(QueuedTurn {
                content: content.into(),
                files,
                reply,
            })
            .await
            .map_err(|_| ParleyError::Internal("turn queue is closed".to_string()))?;
        Ok(rx)
    }

    /// Enqueue a turn and wait for it.
    pub async fn send(
        &self,
        content: impl Into<String>,
        files: Vec<RawFile>,
    ) -> Result<TurnOutcome, ParleyError> {
        let rx = self.submit(content, files).await?;
        rx.await
            .map_err(|_| ParleyError::Internal("turn queue worker stopped".to_string()))?
    }

    /// Stop accepting turns and wait for queued ones to finish.
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.worker.await {
            debug!(error = %e, "turn queue worker ended abnormally");
        }
    }
}
