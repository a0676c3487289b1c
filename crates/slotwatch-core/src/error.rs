// SPDX-FileCopyrightText: 2026 Slotwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Slotwatch waitlist engine.

use thiserror::Error;

/// The primary error type used across all Slotwatch crates.
#[derive(Debug, Error)]
pub enum SlotwatchError {
    /// Configuration errors (invalid TOML, missing required fields, bad tier ordering).
    #[error("configuration error: {0}")]
    Config(String),

    /// Input rejected before any state change (e.g. missing phone number).
    #[error("validation error: {0}")]
    Validation(String),

    /// Storage backend errors (database connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A referenced slot, entry, or token row does not exist.
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// Token is missing, already consumed, or past its expiry.
    #[error("invalid or expired token")]
    InvalidToken,

    /// Availability probe failure (network/auth error from the calendar side).
    ///
    /// Swallowed at the scheduler boundary: a probe error means "not
    /// available this cycle", never a state transition.
    #[error("probe error: {message}")]
    Probe {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Notifier delivery failure (SMS/email transport).
    #[error("notifier error: {message}")]
    Notifier {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
