// SPDX-FileCopyrightText: 2026 Slotwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Slot registry: monitored-window lifecycle and the adaptive check interval.
//!
//! The interval tiers come from `PollingConfig`; config validation has
//! already guaranteed `near <= mid <= far`, which makes
//! [`compute_check_interval`] monotonic in time-to-slot.

use chrono::{DateTime, Duration, Utc};
use slotwatch_config::{PollingConfig, WaitlistConfig};
use slotwatch_core::types::{Slot, SlotStatus};
use slotwatch_core::SlotwatchError;
use slotwatch_storage::queries::{entries, slots};
use slotwatch_storage::Database;
use tracing::{debug, info};

/// Compute the check interval (minutes) for a slot starting at `start_at`,
/// as seen from `now`.
///
/// Closer slots poll more often. A slot whose start has already passed
/// gets the near interval; it will be expired on its next check anyway.
pub fn compute_check_interval(
    start_at: DateTime<Utc>,
    now: DateTime<Utc>,
    polling: &PollingConfig,
) -> i64 {
    let until_start = start_at - now;
    if until_start <= Duration::hours(polling.near_threshold_hours) {
        polling.near_interval_minutes
    } else if until_start <= Duration::hours(polling.mid_threshold_hours) {
        polling.mid_interval_minutes
    } else {
        polling.far_interval_minutes
    }
}

/// CRUD plus lifecycle transitions over monitored time windows.
#[derive(Clone)]
pub struct SlotRegistry {
    db: Database,
    polling: PollingConfig,
    waitlist: WaitlistConfig,
}

impl SlotRegistry {
    pub fn new(db: Database, polling: PollingConfig, waitlist: WaitlistConfig) -> Self {
        Self {
            db,
            polling,
            waitlist,
        }
    }

    /// The check interval for `start_at` as of `now`, per this registry's tiers.
    pub fn check_interval(&self, start_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
        compute_check_interval(start_at, now, &self.polling)
    }

    /// Get a slot by ID.
    pub async fn get(&self, id: i64) -> Result<Option<Slot>, SlotwatchError> {
        slots::get(&self.db, id).await
    }

    /// Window-match an existing non-terminal slot for the owner, or create a
    /// new pending one with a computed initial interval.
    ///
    /// Matching uses the configured window (default +-30 minutes) so repeat
    /// joins for "same table, roughly same time" share one slot.
    pub async fn find_or_create(
        &self,
        owner_id: &str,
        requested_start: DateTime<Utc>,
        label: Option<String>,
    ) -> Result<Slot, SlotwatchError> {
        if let Some(slot) = slots::find_matching(
            &self.db,
            owner_id,
            requested_start,
            self.waitlist.slot_match_window_minutes,
        )
        .await?
        {
            debug!(slot_id = slot.id, owner_id, "matched existing slot");
            return Ok(slot);
        }

        let now = Utc::now();
        let slot = slots::insert(
            &self.db,
            slots::NewSlot {
                owner_id: owner_id.to_string(),
                label,
                start_at: requested_start,
                end_at: requested_start
                    + Duration::minutes(self.waitlist.default_slot_duration_minutes),
                check_interval_minutes: compute_check_interval(
                    requested_start,
                    now,
                    &self.polling,
                ),
            },
        )
        .await?;
        info!(slot_id = slot.id, owner_id, start_at = %slot.start_at, "slot created");
        Ok(slot)
    }

    /// Transition `pending -> monitoring` with a fresh interval and next
    /// check stamp. Returns false when the slot was not pending.
    pub async fn activate_monitoring(&self, id: i64) -> Result<bool, SlotwatchError> {
        let Some(slot) = slots::get(&self.db, id).await? else {
            return Ok(false);
        };
        let now = Utc::now();
        let interval = self.check_interval(slot.start_at, now);
        let activated = slots::activate_monitoring(
            &self.db,
            id,
            interval,
            now + Duration::minutes(interval),
        )
        .await?;
        if activated {
            debug!(slot_id = id, interval_minutes = interval, "monitoring activated");
        }
        Ok(activated)
    }

    /// Terminal `available` transition; the exactly-once guard for
    /// claimant notification.
    pub async fn mark_available(&self, id: i64) -> Result<bool, SlotwatchError> {
        slots::mark_available(&self.db, id).await
    }

    /// Expire the slot and cascade expiry to its pending entries.
    ///
    /// Idempotent: an already-terminal slot is left alone and 0 is returned.
    pub async fn expire(&self, id: i64) -> Result<usize, SlotwatchError> {
        if !slots::mark_expired(&self.db, id).await? {
            return Ok(0);
        }
        let expired = entries::expire_pending_for_slot(&self.db, id).await?;
        info!(slot_id = id, expired_entries = expired, "slot expired");
        Ok(expired)
    }

    /// Transition `monitoring -> pending` when nobody is waiting anymore.
    pub async fn revert_to_pending(&self, id: i64) -> Result<bool, SlotwatchError> {
        slots::revert_to_pending(&self.db, id).await
    }

    /// Stamp a completed check cycle.
    pub async fn record_check(
        &self,
        id: i64,
        last_check_at: DateTime<Utc>,
        next_check_at: Option<DateTime<Utc>>,
        check_interval_minutes: i64,
    ) -> Result<(), SlotwatchError> {
        slots::record_check(&self.db, id, last_check_at, next_check_at, check_interval_minutes)
            .await
    }

    /// List slots in any of the given statuses.
    pub async fn list_by_status(
        &self,
        statuses: &[SlotStatus],
    ) -> Result<Vec<Slot>, SlotwatchError> {
        slots::list_by_status(&self.db, statuses).await
    }

    /// Delete slots whose start time fell out of the retention window.
    pub async fn sweep_expired(&self) -> Result<usize, SlotwatchError> {
        let cutoff = Utc::now() - Duration::days(self.waitlist.retention_days);
        let deleted = slots::sweep_older_than(&self.db, cutoff).await?;
        if deleted > 0 {
            info!(deleted, "retention sweep removed aged-out slots");
        }
        Ok(deleted)
    }
}
