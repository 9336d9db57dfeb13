// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Quota tracking for Parley.
//!
//! [`QuotaTracker`] is a pure in-memory replica of the plan limits and usage
//! for the current period. [`StaticQuotaSource`] serves the configured plan.

pub mod source;
pub mod tracker;

pub use source::StaticQuotaSource;
pub use tracker::QuotaTracker;
