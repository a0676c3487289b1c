// SPDX-FileCopyrightText: 2026 Slotwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Slotwatch waitlist engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup. The polling tiers replace the magic-number
//! check intervals of older deployments with named, tunable configuration.

use serde::{Deserialize, Serialize};

/// Top-level Slotwatch configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SlotwatchConfig {
    /// Service identity and logging settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Adaptive polling cadence settings.
    #[serde(default)]
    pub polling: PollingConfig,

    /// Waitlist behavior settings (token TTLs, windows, retention).
    #[serde(default)]
    pub waitlist: WaitlistConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name of the service instance.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "slotwatch".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Whether to enable WAL journal mode.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    "slotwatch.db".to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// Adaptive polling cadence configuration.
///
/// Slots closer to their start time are polled more often. Validation
/// enforces `near_interval_minutes <= mid_interval_minutes <=
/// far_interval_minutes`, which is what makes the computed interval
/// monotonic in time-to-slot.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PollingConfig {
    /// Slots starting within this many hours use the near interval.
    #[serde(default = "default_near_threshold_hours")]
    pub near_threshold_hours: i64,

    /// Check interval for slots inside the near threshold.
    #[serde(default = "default_near_interval_minutes")]
    pub near_interval_minutes: i64,

    /// Slots starting within this many hours (but past the near threshold)
    /// use the mid interval.
    #[serde(default = "default_mid_threshold_hours")]
    pub mid_threshold_hours: i64,

    /// Check interval for slots inside the mid threshold.
    #[serde(default = "default_mid_interval_minutes")]
    pub mid_interval_minutes: i64,

    /// Check interval for slots beyond the mid threshold.
    #[serde(default = "default_far_interval_minutes")]
    pub far_interval_minutes: i64,

    /// Cadence of the global reconciliation sweep.
    #[serde(default = "default_sweep_interval_minutes")]
    pub sweep_interval_minutes: i64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            near_threshold_hours: default_near_threshold_hours(),
            near_interval_minutes: default_near_interval_minutes(),
            mid_threshold_hours: default_mid_threshold_hours(),
            mid_interval_minutes: default_mid_interval_minutes(),
            far_interval_minutes: default_far_interval_minutes(),
            sweep_interval_minutes: default_sweep_interval_minutes(),
        }
    }
}

fn default_near_threshold_hours() -> i64 {
    6
}

fn default_near_interval_minutes() -> i64 {
    15
}

fn default_mid_threshold_hours() -> i64 {
    24
}

fn default_mid_interval_minutes() -> i64 {
    30
}

fn default_far_interval_minutes() -> i64 {
    60
}

fn default_sweep_interval_minutes() -> i64 {
    10
}

/// Waitlist behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WaitlistConfig {
    /// Base URL for customer-facing confirmation links.
    #[serde(default = "default_frontend_base_url")]
    pub frontend_base_url: String,

    /// A join matches an existing slot if its requested start falls within
    /// this many minutes of the slot's start, for the same owner.
    #[serde(default = "default_slot_match_window_minutes")]
    pub slot_match_window_minutes: i64,

    /// Slot end time when the caller does not supply one.
    #[serde(default = "default_slot_duration_minutes")]
    pub default_slot_duration_minutes: i64,

    /// Lifetime of registration tokens issued at join.
    #[serde(default = "default_registration_token_ttl_minutes")]
    pub registration_token_ttl_minutes: i64,

    /// Lifetime of confirmation tokens issued when a slot frees up.
    #[serde(default = "default_confirmation_token_ttl_minutes")]
    pub confirmation_token_ttl_minutes: i64,

    /// How long a notified customer has to respond before the entry goes
    /// stale. Advisory to downstream booking; enforced by the sweep.
    #[serde(default = "default_response_window_minutes")]
    pub response_window_minutes: i64,

    /// Slots whose start time is older than this many days are deleted by
    /// the retention sweep.
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
}

impl Default for WaitlistConfig {
    fn default() -> Self {
        Self {
            frontend_base_url: default_frontend_base_url(),
            slot_match_window_minutes: default_slot_match_window_minutes(),
            default_slot_duration_minutes: default_slot_duration_minutes(),
            registration_token_ttl_minutes: default_registration_token_ttl_minutes(),
            confirmation_token_ttl_minutes: default_confirmation_token_ttl_minutes(),
            response_window_minutes: default_response_window_minutes(),
            retention_days: default_retention_days(),
        }
    }
}

fn default_frontend_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_slot_match_window_minutes() -> i64 {
    30
}

fn default_slot_duration_minutes() -> i64 {
    60
}

fn default_registration_token_ttl_minutes() -> i64 {
    120
}

fn default_confirmation_token_ttl_minutes() -> i64 {
    30
}

fn default_response_window_minutes() -> i64 {
    30
}

fn default_retention_days() -> i64 {
    7
}
