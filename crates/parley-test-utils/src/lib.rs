// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Parley integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic tests without an assistant service or upload endpoint.
//!
//! # Components
//!
//! - [`MockAssistant`] - Assistant with queued replies, failures, and delays
//! - [`MockTransfer`] - Transfer adapter with scripted progress and failures
//! - [`MockQuotaSource`] / [`MockExportSink`] - In-memory quota and export
//! - [`TestHarness`] - A full coordinator wired to the mocks

pub mod harness;
pub mod mock_assistant;
pub mod mock_services;
pub mod mock_transfer;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_assistant::MockAssistant;
pub use mock_services::{MockExportSink, MockQuotaSource};
pub use mock_transfer::MockTransfer;
