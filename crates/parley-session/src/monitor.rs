// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connectivity monitor.
//!
//! Probes the assistant's health endpoint and publishes the resulting
//! [`Connectivity`] on a watch channel. Coordinators hold receivers and only
//! ever read the value.

use std::sync::Arc;
use std::time::Duration;

use parley_core::{AssistantAdapter, Connectivity, HealthStatus};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub struct ConnectivityMonitor {
    assistant: Arc<dyn AssistantAdapter>,
    tx: watch::Sender<Connectivity>,
}

impl ConnectivityMonitor {
    pub fn new(assistant: Arc<dyn AssistantAdapter>, initial: Connectivity) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { assistant, tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<Connectivity> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Connectivity {
        *self.tx.borrow()
    }

    /// Publish `state`, logging transitions.
    pub fn set(&self, state: Connectivity) {
        let previous = self.tx.send_replace(state);
        if previous != state {
            info!(from = %previous, to = %state, "connectivity changed");
        }
    }

    /// Run one health probe and publish the result.
    pub async fn probe_once(&self) -> Connectivity {
        if self.current() == Connectivity::Offline {
            self.set(Connectivity::Connecting);
        }

        let next = match self.assistant.health_check().await {
            Ok(HealthStatus::Healthy) => Connectivity::Online,
            Ok(HealthStatus::Degraded(reason)) => {
                debug!(reason = %reason, "assistant degraded");
                Connectivity::Degraded
            }
            Ok(HealthStatus::Unhealthy(reason)) => {
                debug!(reason = %reason, "assistant unhealthy");
                Connectivity::Offline
            }
            Err(e) => {
                debug!(error = %e, "health probe failed");
                Connectivity::Offline
            }
        };
        self.set(next);
        next
    }

    /// Probe every `interval` until `cancel` fires. The first probe runs
    /// immediately.
    pub async fn run(&self, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.probe_once().await;
                }
                _ = cancel.cancelled() => {
                    debug!("connectivity monitor shutting down");
                    break;
                }
            }
        }
    }
}
