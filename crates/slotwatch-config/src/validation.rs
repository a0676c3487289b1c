// SPDX-FileCopyrightText: 2026 Slotwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes. The polling-tier ordering check is load-bearing: it is what
//! guarantees the computed check interval is monotonic in time-to-slot.

use slotwatch_core::SlotwatchError;

use crate::model::SlotwatchConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<SlotwatchError>)`
/// with all collected validation errors (does not fail fast).
pub fn validate_config(config: &SlotwatchConfig) -> Result<(), Vec<SlotwatchError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(SlotwatchError::Config(
            "storage.database_path must not be empty".to_string(),
        ));
    }

    if config.waitlist.frontend_base_url.trim().is_empty() {
        errors.push(SlotwatchError::Config(
            "waitlist.frontend_base_url must not be empty".to_string(),
        ));
    }

    let p = &config.polling;

    // Closer slots must poll at least as often as farther ones.
    if p.near_interval_minutes > p.mid_interval_minutes
        || p.mid_interval_minutes > p.far_interval_minutes
    {
        errors.push(SlotwatchError::Config(format!(
            "polling intervals must be non-decreasing by distance: near {} <= mid {} <= far {}",
            p.near_interval_minutes, p.mid_interval_minutes, p.far_interval_minutes
        )));
    }

    if p.near_threshold_hours >= p.mid_threshold_hours {
        errors.push(SlotwatchError::Config(format!(
            "polling.near_threshold_hours ({}) must be less than polling.mid_threshold_hours ({})",
            p.near_threshold_hours, p.mid_threshold_hours
        )));
    }

    for (name, value) in [
        ("polling.near_interval_minutes", p.near_interval_minutes),
        ("polling.mid_interval_minutes", p.mid_interval_minutes),
        ("polling.far_interval_minutes", p.far_interval_minutes),
        ("polling.sweep_interval_minutes", p.sweep_interval_minutes),
    ] {
        if value < 1 {
            errors.push(SlotwatchError::Config(format!(
                "{name} must be at least 1, got {value}"
            )));
        }
    }

    let w = &config.waitlist;
    for (name, value) in [
        (
            "waitlist.registration_token_ttl_minutes",
            w.registration_token_ttl_minutes,
        ),
        (
            "waitlist.confirmation_token_ttl_minutes",
            w.confirmation_token_ttl_minutes,
        ),
        ("waitlist.response_window_minutes", w.response_window_minutes),
        (
            "waitlist.default_slot_duration_minutes",
            w.default_slot_duration_minutes,
        ),
        ("waitlist.retention_days", w.retention_days),
    ] {
        if value < 1 {
            errors.push(SlotwatchError::Config(format!(
                "{name} must be at least 1, got {value}"
            )));
        }
    }

    if w.slot_match_window_minutes < 0 {
        errors.push(SlotwatchError::Config(format!(
            "waitlist.slot_match_window_minutes must be non-negative, got {}",
            w.slot_match_window_minutes
        )));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
