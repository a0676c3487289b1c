// SPDX-FileCopyrightText: 2026 Slotwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Availability probe trait: the boundary to the calendar provider.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::SlotwatchError;
use crate::types::Availability;

/// The external check that reports whether a time window is actually free.
///
/// Implementations must be idempotent and side-effect-free: the scheduler
/// may call [`check_availability`](AvailabilityProbe::check_availability)
/// repeatedly for the same window.
#[async_trait]
pub trait AvailabilityProbe: Send + Sync {
    /// Whether a probe is configured for this owner.
    ///
    /// An owner without a configured probe is treated as permanently
    /// unavailable; the scheduler must not create monitoring load for it.
    fn is_configured_for(&self, owner_id: &str) -> bool;

    /// Report whether the given window is free for the owner's resource.
    async fn check_availability(
        &self,
        owner_id: &str,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Availability, SlotwatchError>;
}
