// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the external services a session talks to.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod assistant;
pub mod export;
pub mod quota;
pub mod transfer;

pub use adapter::PluginAdapter;
pub use assistant::AssistantAdapter;
pub use export::ExportSink;
pub use quota::QuotaSource;
pub use transfer::TransferAdapter;
