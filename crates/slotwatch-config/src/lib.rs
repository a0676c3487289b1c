// SPDX-FileCopyrightText: 2026 Slotwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered TOML configuration for the Slotwatch waitlist engine.
//!
//! Configuration merges compiled defaults, system/user/local TOML files,
//! and `SLOTWATCH_*` environment variables, then runs semantic validation
//! (including the polling-tier monotonicity check).

pub mod loader;
pub mod model;
pub mod validation;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{PollingConfig, ServiceConfig, SlotwatchConfig, StorageConfig, WaitlistConfig};
pub use validation::validate_config;
