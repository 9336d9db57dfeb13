// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::{AssistantMode, ParleyConfig};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure instead of stopping at the first.
pub fn validate_config(config: &ParleyConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if let Some(user_id) = &config.session.user_id
        && user_id.trim().is_empty()
    {
        fail("session.user_id must not be empty when set".to_string());
    }

    if config.session.display_name.trim().is_empty() {
        fail("session.display_name must not be empty".to_string());
    }

    if !LOG_LEVELS.contains(&config.session.log_level.as_str()) {
        fail(format!(
            "session.log_level `{}` must be one of: {}",
            config.session.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    if config.session.probe_interval_secs == 0 {
        fail("session.probe_interval_secs must be at least 1".to_string());
    }

    if config.assistant.timeout_secs == 0 {
        fail("assistant.timeout_secs must be at least 1".to_string());
    }

    match (&config.assistant.mode, &config.assistant.endpoint) {
        (AssistantMode::Remote, None) => {
            fail("assistant.endpoint is required when assistant.mode = \"remote\"".to_string());
        }
        (_, Some(endpoint)) if !is_http_url(endpoint) => {
            fail(format!(
                "assistant.endpoint `{endpoint}` must start with http:// or https://"
            ));
        }
        _ => {}
    }

    if config.attachments.max_file_bytes == 0 {
        fail("attachments.max_file_bytes must be at least 1".to_string());
    }

    if config.attachments.max_concurrent_transfers == 0 {
        fail("attachments.max_concurrent_transfers must be at least 1".to_string());
    }

    if config.attachments.chunk_size == 0 {
        fail("attachments.chunk_size must be at least 1".to_string());
    }

    if let Some(endpoint) = &config.attachments.upload_endpoint
        && !is_http_url(endpoint)
    {
        fail(format!(
            "attachments.upload_endpoint `{endpoint}` must start with http:// or https://"
        ));
    }

    if config.export.directory.trim().is_empty() {
        fail("export.directory must not be empty".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_error(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&ParleyConfig::default()).is_ok());
    }

    #[test]
    fn remote_mode_requires_endpoint() {
        let mut config = ParleyConfig::default();
        config.assistant.mode = AssistantMode::Remote;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "assistant.endpoint is required"));
    }

    #[test]
    fn zero_limits_are_all_reported() {
        let mut config = ParleyConfig::default();
        config.assistant.timeout_secs = 0;
        config.attachments.max_concurrent_transfers = 0;
        config.attachments.chunk_size = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(has_error(&errors, "timeout_secs"));
        assert!(has_error(&errors, "max_concurrent_transfers"));
        assert!(has_error(&errors, "chunk_size"));
    }

    #[test]
    fn bad_log_level_rejected() {
        let mut config = ParleyConfig::default();
        config.session.log_level = "verbose".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "log_level"));
    }

    #[test]
    fn non_http_endpoint_rejected() {
        let mut config = ParleyConfig::default();
        config.assistant.mode = AssistantMode::Remote;
        config.assistant.endpoint = Some("ftp://example.com".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "must start with http"));
    }

    #[test]
    fn remote_config_with_endpoint_passes() {
        let mut config = ParleyConfig::default();
        config.assistant.mode = AssistantMode::Remote;
        config.assistant.endpoint = Some("https://assistant.example.com/v1".to_string());
        config.attachments.upload_endpoint = Some("https://files.example.com".to_string());
        assert!(validate_config(&config).is_ok());
    }
}
