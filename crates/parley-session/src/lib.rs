// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session orchestration for Parley.
//!
//! The [`SessionCoordinator`] owns one session's transcript, quota tracker,
//! and context, and drives each turn through quota check, upload, assistant
//! request, and quota commit. The [`ConnectivityMonitor`] is the only writer
//! of session connectivity.

pub mod context;
pub mod coordinator;
pub mod export;
pub mod monitor;
pub mod queue;
pub mod settings;
pub mod state;

pub use context::{ContextSnapshot, SessionContext};
pub use coordinator::{ATTACHMENT_PLACEHOLDER, SessionCoordinator, SessionDeps, TurnOutcome};
pub use export::{ExportDocument, ExportReceipt, FileExportSink, export_file_name};
pub use monitor::ConnectivityMonitor;
pub use queue::TurnQueue;
pub use settings::SessionSettings;
pub use state::TurnState;
