// SPDX-FileCopyrightText: 2026 Slotwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./slotwatch.toml` > `~/.config/slotwatch/slotwatch.toml`
//! > `/etc/slotwatch/slotwatch.toml` with environment variable overrides via
//! `SLOTWATCH_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::SlotwatchConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/slotwatch/slotwatch.toml` (system-wide)
/// 3. `~/.config/slotwatch/slotwatch.toml` (user XDG config)
/// 4. `./slotwatch.toml` (local directory)
/// 5. `SLOTWATCH_*` environment variables
pub fn load_config() -> Result<SlotwatchConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SlotwatchConfig::default()))
        .merge(Toml::file("/etc/slotwatch/slotwatch.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("slotwatch/slotwatch.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("slotwatch.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<SlotwatchConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SlotwatchConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<SlotwatchConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SlotwatchConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// CRITICAL: Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names. For example, `SLOTWATCH_STORAGE_DATABASE_PATH`
/// must map to `storage.database_path`, not `storage.database.path`.
fn env_provider() -> Env {
    Env::prefixed("SLOTWATCH_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: SLOTWATCH_POLLING_NEAR_INTERVAL_MINUTES -> "polling_near_interval_minutes"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("service_", "service.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("polling_", "polling.", 1)
            .replacen("waitlist_", "waitlist.", 1);
        mapped.into()
    })
}
