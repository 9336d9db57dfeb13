// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Lookup order: `/etc/parley/parley.toml`, `~/.config/parley/parley.toml`,
//! `./parley.toml`, then `PARLEY_*` environment variables.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use tracing::debug;

use crate::model::ParleyConfig;

pub(crate) const SYSTEM_CONFIG: &str = "/etc/parley/parley.toml";
pub(crate) const LOCAL_CONFIG: &str = "parley.toml";

/// Config sections addressable through `PARLEY_<SECTION>_<KEY>`.
const ENV_SECTIONS: &[&str] = &["session", "assistant", "attachments", "quota", "export"];

/// Per-tier limit tables nested under `[quota]`. `pro_plus` must precede `pro`.
const QUOTA_TIERS: &[&str] = &["pro_plus", "free", "pro"];

pub(crate) fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("parley/parley.toml"))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/parley/parley.toml` (system-wide)
/// 3. `~/.config/parley/parley.toml` (user XDG config)
/// 4. `./parley.toml` (local directory)
/// 5. `PARLEY_*` environment variables
pub fn load_config() -> Result<ParleyConfig, figment::Error> {
    let found = config_files();
    if found.is_empty() {
        debug!("no config files found, using defaults and environment");
    }
    for path in &found {
        debug!(path = %path.display(), "config file found");
    }
    build_figment().extract()
}

/// Config files from the lookup hierarchy that exist, in merge order.
pub fn config_files() -> Vec<PathBuf> {
    [
        Some(PathBuf::from(SYSTEM_CONFIG)),
        user_config_path(),
        Some(PathBuf::from(LOCAL_CONFIG)),
    ]
    .into_iter()
    .flatten()
    .filter(|p| p.is_file())
    .collect()
}

/// Load configuration from a TOML string only (no file lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<ParleyConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ParleyConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ParleyConfig, figment::Error> {
    debug!(path = %path.display(), "loading config file");
    Figment::new()
        .merge(Serialized::defaults(ParleyConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(ParleyConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

/// Map a lowercased, prefix-stripped env var name to a dotted config path.
///
/// Only the section separator (and the quota tier separator) becomes a dot, so
/// `PARLEY_ATTACHMENTS_MAX_FILE_BYTES` maps to `attachments.max_file_bytes`.
pub fn map_env_key(key: &str) -> String {
    let Some((section, rest)) = ENV_SECTIONS
        .iter()
        .find_map(|s| key.strip_prefix(s).and_then(|r| r.strip_prefix('_')).map(|r| (*s, r)))
    else {
        return key.to_string();
    };

    if section == "quota"
        && let Some((tier, field)) = QUOTA_TIERS
            .iter()
            .find_map(|t| rest.strip_prefix(t).and_then(|r| r.strip_prefix('_')).map(|r| (*t, r)))
    {
        return format!("quota.{tier}.{field}");
    }

    format!("{section}.{rest}")
}

fn env_provider() -> Env {
    Env::prefixed("PARLEY_").map(|key| map_env_key(key.as_str()).into())
}
