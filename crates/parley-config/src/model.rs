// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Parley session manager.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use parley_core::{PlanTier, QuotaState};
use serde::{Deserialize, Serialize};

/// Top-level Parley configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ParleyConfig {
    /// Identity and session behaviour.
    #[serde(default)]
    pub session: SessionConfig,

    /// Assistant service settings.
    #[serde(default)]
    pub assistant: AssistantConfig,

    /// Attachment pipeline settings.
    #[serde(default)]
    pub attachments: AttachmentsConfig,

    /// Plan tier, starting usage, and per-tier limits.
    #[serde(default)]
    pub quota: QuotaConfig,

    /// Transcript export settings.
    #[serde(default)]
    pub export: ExportConfig,
}

/// Session identity and behaviour.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Signed-in user id. `None` starts the session unauthenticated.
    #[serde(default)]
    pub user_id: Option<String>,

    #[serde(default = "default_display_name")]
    pub display_name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Content of the synthetic assistant message shown when a session starts online.
    #[serde(default = "default_welcome_message")]
    pub welcome_message: String,

    /// Seconds between connectivity probes.
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            user_id: None,
            display_name: default_display_name(),
            log_level: default_log_level(),
            welcome_message: default_welcome_message(),
            probe_interval_secs: default_probe_interval_secs(),
        }
    }
}

fn default_display_name() -> String {
    "you".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_welcome_message() -> String {
    "Hi! Ask me anything, or attach a file and I'll take a look.".to_string()
}

fn default_probe_interval_secs() -> u64 {
    30
}

/// Which assistant strategy the session uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssistantMode {
    /// Canned replies produced locally after a fixed latency.
    #[default]
    Simulated,
    /// JSON over HTTP to `assistant.endpoint`.
    Remote,
}

impl std::fmt::Display for AssistantMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Simulated => f.write_str("simulated"),
            Self::Remote => f.write_str("remote"),
        }
    }
}

/// Assistant service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AssistantConfig {
    #[serde(default)]
    pub mode: AssistantMode,

    /// Base URL of the assistant service. Required in remote mode.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Bearer token for the assistant service.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model name reported by the simulated strategy.
    #[serde(default = "default_model")]
    pub model: String,

    /// Deadline for a single assistant request. Expiry counts as a transport failure.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_simulated_latency_ms")]
    pub simulated_latency_ms: u64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            mode: AssistantMode::default(),
            endpoint: None,
            api_key: None,
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            simulated_latency_ms: default_simulated_latency_ms(),
        }
    }
}

fn default_model() -> String {
    "parley-sim-1".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_simulated_latency_ms() -> u64 {
    400
}

/// Attachment pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AttachmentsConfig {
    /// Per-file size limit in bytes.
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,

    /// Upper bound on transfers running at once within one turn.
    #[serde(default = "default_max_concurrent_transfers")]
    pub max_concurrent_transfers: usize,

    /// Upload service base URL. `None` uses the simulated transfer.
    #[serde(default)]
    pub upload_endpoint: Option<String>,

    /// Upload chunk size in bytes; one progress event per chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for AttachmentsConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: default_max_file_bytes(),
            max_concurrent_transfers: default_max_concurrent_transfers(),
            upload_endpoint: None,
            chunk_size: default_chunk_size(),
        }
    }
}

fn default_max_file_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_max_concurrent_transfers() -> usize {
    3
}

fn default_chunk_size() -> usize {
    64 * 1024
}

/// Limits for one plan tier. A missing limit means unlimited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PlanLimits {
    #[serde(default)]
    pub messages: Option<u64>,

    #[serde(default)]
    pub attachments: Option<u64>,
}

impl PlanLimits {
    pub fn new(messages: Option<u64>, attachments: Option<u64>) -> Self {
        Self {
            messages,
            attachments,
        }
    }
}

/// Quota configuration: the active tier, starting usage, and every tier's limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QuotaConfig {
    #[serde(default = "default_plan_tier")]
    pub plan_tier: PlanTier,

    /// Usage already consumed this period.
    #[serde(default)]
    pub messages_used: u64,

    #[serde(default)]
    pub attachments_used: u64,

    #[serde(default = "default_free_limits")]
    pub free: PlanLimits,

    #[serde(default = "default_pro_limits")]
    pub pro: PlanLimits,

    #[serde(default)]
    pub pro_plus: PlanLimits,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            plan_tier: default_plan_tier(),
            messages_used: 0,
            attachments_used: 0,
            free: default_free_limits(),
            pro: default_pro_limits(),
            pro_plus: PlanLimits::default(),
        }
    }
}

impl QuotaConfig {
    /// Limits configured for `tier`.
    pub fn limits_for(&self, tier: PlanTier) -> &PlanLimits {
        match tier {
            PlanTier::Free => &self.free,
            PlanTier::Pro => &self.pro,
            PlanTier::ProPlus => &self.pro_plus,
        }
    }

    /// Quota state for the configured tier and starting usage.
    pub fn to_state(&self) -> QuotaState {
        let limits = self.limits_for(self.plan_tier);
        QuotaState {
            plan_tier: self.plan_tier,
            messages_used: self.messages_used,
            message_limit: limits.messages,
            attachments_used: self.attachments_used,
            attachment_limit: limits.attachments,
        }
    }

    /// Fresh free-tier state, used when the quota source is unreachable.
    pub fn fallback_state(&self) -> QuotaState {
        let limits = self.limits_for(PlanTier::Free);
        QuotaState::new(PlanTier::Free, limits.messages, limits.attachments)
    }
}

fn default_plan_tier() -> PlanTier {
    PlanTier::Free
}

fn default_free_limits() -> PlanLimits {
    PlanLimits::new(Some(50), Some(10))
}

fn default_pro_limits() -> PlanLimits {
    PlanLimits::new(Some(1000), Some(200))
}

/// Transcript export configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExportConfig {
    /// Directory export files are written into.
    #[serde(default = "default_export_directory")]
    pub directory: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            directory: default_export_directory(),
        }
    }
}

fn default_export_directory() -> String {
    ".".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_quota_uses_free_tier_limits() {
        let state = QuotaConfig::default().to_state();
        assert_eq!(state.plan_tier, PlanTier::Free);
        assert_eq!(state.message_limit, Some(50));
        assert_eq!(state.attachment_limit, Some(10));
        assert_eq!(state.messages_used, 0);
    }

    #[test]
    fn pro_plus_is_unlimited_by_default() {
        let config = QuotaConfig {
            plan_tier: PlanTier::ProPlus,
            ..QuotaConfig::default()
        };
        let state = config.to_state();
        assert_eq!(state.message_limit, None);
        assert_eq!(state.attachment_limit, None);
    }

    #[test]
    fn fallback_ignores_configured_usage() {
        let config = QuotaConfig {
            plan_tier: PlanTier::Pro,
            messages_used: 12,
            ..QuotaConfig::default()
        };
        let state = config.fallback_state();
        assert_eq!(state.plan_tier, PlanTier::Free);
        assert_eq!(state.messages_used, 0);
    }

    #[test]
    fn assistant_mode_parses_lowercase() {
        let config: AssistantConfig = toml::from_str("mode = \"remote\"").unwrap();
        assert_eq!(config.mode, AssistantMode::Remote);
        assert_eq!(config.mode.to_string(), "remote");
    }
}
