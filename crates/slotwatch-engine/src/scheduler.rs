// SPDX-FileCopyrightText: 2026 Slotwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The check->reschedule/notify/expire state machine.
//!
//! One timer task per monitored slot, tracked in a registry owned by the
//! [`Scheduler`] instance (never package-level state). Each task loops
//! sleep -> check -> reschedule/stop, so checks for one slot are strictly
//! sequential; across slots nothing is ordered or shared except the
//! database. Status transitions use the storage layer's compare-and-set
//! updates, which closes the race between a timer fire and a concurrent
//! manual status change.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use slotwatch_config::SlotwatchConfig;
use slotwatch_core::types::{Availability, Entry, Slot, SlotStatus, TokenPurpose};
use slotwatch_core::{AvailabilityProbe, Notifier, SlotwatchError};
use slotwatch_storage::queries::entries;
use slotwatch_storage::Database;
use slotwatch_waitlist::{confirmation_link, SlotRegistry, TokenStore};

/// Why a slot's timer stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The slot row no longer exists.
    SlotMissing,
    /// Another writer already moved the slot to a terminal status.
    AlreadyTerminal,
    /// The slot's start time passed; it was expired with its entries.
    Expired,
    /// Nobody is waiting; the slot reverted to pending.
    NoPendingEntries,
    /// The probe reported free capacity; monitoring is done.
    BecameAvailable,
}

/// Outcome of one check cycle for a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Still contested; poll again after this many minutes.
    Rescheduled { interval_minutes: i64 },
    /// Monitoring for this slot is over.
    Stopped(StopReason),
}

/// What a global reconciliation pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Another pass was already running; nothing was touched.
    pub skipped: bool,
    pub expired_slots: usize,
    pub rearmed_slots: usize,
    pub reverted_slots: usize,
    pub stale_entries_expired: usize,
    pub purged_slots: usize,
    pub purged_tokens: usize,
}

/// The scheduling authority: owns one live timer per monitored slot and
/// drives the check cycle against the probe and notifier collaborators.
///
/// One instance per deployment; scale-out needs external sharding, which
/// is out of scope here.
pub struct Scheduler {
    db: Database,
    registry: SlotRegistry,
    tokens: TokenStore,
    probe: Arc<dyn AvailabilityProbe>,
    notifier: Arc<dyn Notifier>,
    config: SlotwatchConfig,
    /// slot id -> cancellation handle for the slot's timer task.
    timers: DashMap<i64, CancellationToken>,
    /// Guard keeping global sweep passes from overlapping.
    check_running: AtomicBool,
    shutdown: CancellationToken,
}

impl Scheduler {
    /// Build a scheduler over an opened database and the two collaborators.
    pub fn new(
        db: Database,
        probe: Arc<dyn AvailabilityProbe>,
        notifier: Arc<dyn Notifier>,
        config: SlotwatchConfig,
    ) -> Arc<Self> {
        let registry = SlotRegistry::new(
            db.clone(),
            config.polling.clone(),
            config.waitlist.clone(),
        );
        let tokens = TokenStore::new(db.clone());
        Arc::new(Self {
            db,
            registry,
            tokens,
            probe,
            notifier,
            config,
            timers: DashMap::new(),
            check_running: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
        })
    }

    /// Whether a timer is currently armed for the slot.
    pub fn is_armed(&self, slot_id: i64) -> bool {
        self.timers.contains_key(&slot_id)
    }

    /// IDs of all slots with an armed timer.
    pub fn armed_slots(&self) -> Vec<i64> {
        self.timers.iter().map(|e| *e.key()).collect()
    }

    /// Begin monitoring a slot: transition it out of `pending` and arm its
    /// timer at the computed interval.
    ///
    /// Returns false (without arming) when the slot is terminal, already
    /// armed, or its owner has no configured probe -- an owner without a
    /// probe would never resolve, so polling it is pure waste.
    pub async fn watch(self: &Arc<Self>, slot_id: i64) -> Result<bool, SlotwatchError> {
        let Some(slot) = self.registry.get(slot_id).await? else {
            return Err(SlotwatchError::NotFound {
                entity: "slot",
                key: slot_id.to_string(),
            });
        };
        if slot.status.is_terminal() {
            return Ok(false);
        }
        if !self.probe.is_configured_for(&slot.owner_id) {
            warn!(
                slot_id,
                owner_id = %slot.owner_id,
                "owner has no availability probe; not monitoring"
            );
            return Ok(false);
        }

        if slot.status == SlotStatus::Pending {
            self.registry.activate_monitoring(slot_id).await?;
        }
        let now = Utc::now();
        let interval = self.registry.check_interval(slot.start_at, now);
        Ok(self.arm(slot_id, minutes_to_std(interval)))
    }

    /// Arm the slot's timer task. No-op (false) when one is already armed:
    /// the registry entry is the at-most-one-timer-per-slot guarantee.
    fn arm(self: &Arc<Self>, slot_id: i64, initial_delay: StdDuration) -> bool {
        let cancel = self.shutdown.child_token();
        match self.timers.entry(slot_id) {
            MapEntry::Occupied(_) => return false,
            MapEntry::Vacant(vacant) => {
                vacant.insert(cancel.clone());
            }
        }

        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            let mut delay = initial_delay;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
                match scheduler.run_slot_check(slot_id).await {
                    Ok(CheckOutcome::Rescheduled { interval_minutes }) => {
                        delay = minutes_to_std(interval_minutes);
                    }
                    Ok(CheckOutcome::Stopped(reason)) => {
                        debug!(slot_id, ?reason, "monitoring stopped");
                        break;
                    }
                    Err(e) => {
                        // Storage trouble inside a fire must not kill the
                        // timer or leak into other slots; retry at the same
                        // cadence.
                        warn!(slot_id, error = %e, "slot check failed; keeping cadence");
                    }
                }
            }
            scheduler.timers.remove(&slot_id);
            debug!(slot_id, "timer cleared");
        });

        debug!(slot_id, delay_secs = initial_delay.as_secs(), "timer armed");
        true
    }

    /// Run one check cycle for a slot.
    ///
    /// This is the transition algorithm the timer tasks execute; it is also
    /// callable directly for an operator-triggered immediate check.
    pub async fn run_slot_check(&self, slot_id: i64) -> Result<CheckOutcome, SlotwatchError> {
        let Some(slot) = self.registry.get(slot_id).await? else {
            return Ok(CheckOutcome::Stopped(StopReason::SlotMissing));
        };
        if slot.status.is_terminal() {
            return Ok(CheckOutcome::Stopped(StopReason::AlreadyTerminal));
        }

        let now = Utc::now();
        if slot.start_at < now {
            self.registry.expire(slot_id).await?;
            return Ok(CheckOutcome::Stopped(StopReason::Expired));
        }

        let pending = entries::pending_count(&self.db, slot_id).await?;
        if pending == 0 {
            self.registry.revert_to_pending(slot_id).await?;
            debug!(slot_id, "no pending entries; reverted to pending");
            return Ok(CheckOutcome::Stopped(StopReason::NoPendingEntries));
        }
        if slot.status == SlotStatus::Pending {
            self.registry.activate_monitoring(slot_id).await?;
        }

        // Stamp the attempt before probing so a hung probe still leaves a trace.
        self.registry
            .record_check(slot_id, now, slot.next_check_at, slot.check_interval_minutes)
            .await?;

        let availability = match self
            .probe
            .check_availability(&slot.owner_id, slot.start_at, slot.end_at)
            .await
        {
            Ok(availability) => availability,
            Err(e) => {
                // A transient probe failure must never look like a freed
                // slot; treat it as busy and keep polling.
                warn!(slot_id, error = %e, "probe failed; treating as unavailable");
                Availability {
                    is_available: false,
                    conflicts: Vec::new(),
                }
            }
        };

        if !availability.is_available {
            // The urgency tier may have shifted since the last fire.
            let interval = self.registry.check_interval(slot.start_at, now);
            self.registry
                .record_check(
                    slot_id,
                    now,
                    Some(now + Duration::minutes(interval)),
                    interval,
                )
                .await?;
            debug!(
                slot_id,
                interval_minutes = interval,
                conflicts = availability.conflicts.len(),
                "slot still busy; rescheduled"
            );
            return Ok(CheckOutcome::Rescheduled {
                interval_minutes: interval,
            });
        }

        // Terminal transition FIRST: whichever caller wins this CAS owns the
        // one-and-only claimant notification for this availability event.
        if !self.registry.mark_available(slot_id).await? {
            return Ok(CheckOutcome::Stopped(StopReason::AlreadyTerminal));
        }
        info!(slot_id, owner_id = %slot.owner_id, "slot became available");

        match entries::next_claimant(&self.db, slot_id).await? {
            Some(claimant) => self.notify_claimant(&slot, claimant).await?,
            None => debug!(slot_id, "slot available with no waiters"),
        }
        Ok(CheckOutcome::Stopped(StopReason::BecameAvailable))
    }

    /// Issue the confirmation token, mark the claimant notified, and send
    /// the availability message.
    async fn notify_claimant(
        &self,
        slot: &Slot,
        claimant: Entry,
    ) -> Result<(), SlotwatchError> {
        let now = Utc::now();
        let (raw, _token) = self
            .tokens
            .issue(
                claimant.id,
                TokenPurpose::Confirmation,
                Duration::minutes(self.config.waitlist.confirmation_token_ttl_minutes),
            )
            .await?;
        let deadline = now + Duration::minutes(self.config.waitlist.response_window_minutes);

        if !entries::mark_notified(&self.db, claimant.id, now, deadline, None).await? {
            debug!(
                entry_id = claimant.id,
                "claimant no longer pending; skipping notification"
            );
            return Ok(());
        }

        let link = confirmation_link(&self.config.waitlist.frontend_base_url, &raw);
        let entry = entries::get(&self.db, claimant.id).await?.unwrap_or(claimant);
        if let Err(e) = self
            .notifier
            .send_availability_message(&entry, slot, &link)
            .await
        {
            // The entry is already marked notified; the claimant record
            // exists and the link can be re-sent out-of-band.
            warn!(entry_id = entry.id, error = %e, "availability notification failed");
        }
        info!(
            entry_id = entry.id,
            slot_id = slot.id,
            deadline = %deadline,
            "claimant notified"
        );
        Ok(())
    }

    /// Restore timers after a process restart.
    ///
    /// Every pending/monitoring slot gets a timer. A persisted
    /// `next_check_at` in the future is honored (clamped to the freshly
    /// computed interval); a stale or absent one means the slot checks
    /// immediately. Idempotent: slots that already have a timer are
    /// untouched, so rehydrating twice equals rehydrating once.
    ///
    /// Returns the number of newly armed timers.
    pub async fn rehydrate(self: &Arc<Self>) -> Result<usize, SlotwatchError> {
        let slots = self
            .registry
            .list_by_status(&[SlotStatus::Pending, SlotStatus::Monitoring])
            .await?;
        let now = Utc::now();
        let mut armed = 0;
        for slot in slots {
            if !self.probe.is_configured_for(&slot.owner_id) {
                debug!(slot_id = slot.id, "owner has no probe; not rehydrating");
                continue;
            }
            if self.arm(slot.id, self.delay_for(&slot, now)) {
                armed += 1;
            }
        }
        info!(armed, "scheduler rehydrated");
        Ok(armed)
    }

    /// Delay until a slot's next check, from its persisted schedule.
    fn delay_for(&self, slot: &Slot, now: DateTime<Utc>) -> StdDuration {
        let interval = Duration::minutes(self.registry.check_interval(slot.start_at, now));
        match slot.next_check_at {
            Some(next) if next > now => {
                std::cmp::min(next - now, interval).to_std().unwrap_or_default()
            }
            _ => StdDuration::ZERO,
        }
    }

    /// Periodic reconciliation: expire what aged out, re-arm what lost its
    /// timer, revert what nobody waits for, purge what retention allows.
    ///
    /// Skips any slot whose timer is armed (the timer owns it), and skips
    /// entirely if another pass is still running.
    pub async fn run_global_check(self: &Arc<Self>) -> Result<SweepReport, SlotwatchError> {
        if self
            .check_running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("global check already running; skipping");
            return Ok(SweepReport {
                skipped: true,
                ..SweepReport::default()
            });
        }
        let result = self.global_check_inner().await;
        self.check_running.store(false, Ordering::SeqCst);
        result
    }

    async fn global_check_inner(self: &Arc<Self>) -> Result<SweepReport, SlotwatchError> {
        let mut report = SweepReport::default();
        let now = Utc::now();

        let slots = self
            .registry
            .list_by_status(&[SlotStatus::Pending, SlotStatus::Monitoring])
            .await?;
        for slot in slots {
            if self.is_armed(slot.id) {
                continue;
            }

            if slot.start_at < now {
                self.registry.expire(slot.id).await?;
                report.expired_slots += 1;
                continue;
            }

            let pending = entries::pending_count(&self.db, slot.id).await?;
            if pending == 0 {
                if slot.status == SlotStatus::Monitoring
                    && self.registry.revert_to_pending(slot.id).await?
                {
                    report.reverted_slots += 1;
                }
                continue;
            }

            if !self.probe.is_configured_for(&slot.owner_id) {
                continue;
            }

            // Self-heal: waiters exist but no timer is live.
            if slot.status == SlotStatus::Pending {
                self.registry.activate_monitoring(slot.id).await?;
            }
            if self.arm(slot.id, self.delay_for(&slot, now)) {
                report.rearmed_slots += 1;
            }
        }

        report.stale_entries_expired = entries::expire_stale_notified(&self.db, now).await?;
        report.purged_slots = self.registry.sweep_expired().await?;
        report.purged_tokens = self.tokens.sweep_expired().await?;

        if report != SweepReport::default() {
            info!(?report, "global check complete");
        }
        Ok(report)
    }

    /// Spawn the periodic global-check loop.
    pub fn start(self: &Arc<Self>) {
        let scheduler = Arc::clone(self);
        let cancel = self.shutdown.child_token();
        let period = minutes_to_std(self.config.polling.sweep_interval_minutes);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                if let Err(e) = scheduler.run_global_check().await {
                    warn!(error = %e, "global check failed");
                }
            }
            debug!("sweep loop stopped");
        });
    }

    /// Cancel every live timer and the sweep loop without touching
    /// persisted state, so a later [`rehydrate`](Self::rehydrate) on a
    /// fresh instance reconstructs identical scheduling state.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        self.timers.clear();
        info!("scheduler shut down");
    }
}

fn minutes_to_std(minutes: i64) -> StdDuration {
    StdDuration::from_secs(minutes.max(0) as u64 * 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotwatch_core::types::EntryStatus;
    use slotwatch_test_utils::{ProbeScript, TestHarness};

    async fn build() -> (TestHarness, Arc<Scheduler>) {
        let harness = TestHarness::builder().build().await.unwrap();
        let scheduler = Scheduler::new(
            harness.db.clone(),
            harness.probe.clone(),
            harness.notifier.clone(),
            harness.config.clone(),
        );
        (harness, scheduler)
    }

    #[tokio::test]
    async fn watch_arms_at_most_one_timer_per_slot() {
        let (harness, scheduler) = build().await;
        let outcome = harness
            .join_customer("owner-1", "Alice", harness.near_start())
            .await
            .unwrap();

        assert!(scheduler.watch(outcome.slot.id).await.unwrap());
        // Repeated calls must not stack timers.
        assert!(!scheduler.watch(outcome.slot.id).await.unwrap());
        assert!(!scheduler.watch(outcome.slot.id).await.unwrap());
        assert_eq!(scheduler.armed_slots(), vec![outcome.slot.id]);

        let slot = harness.registry.get(outcome.slot.id).await.unwrap().unwrap();
        assert_eq!(slot.status, SlotStatus::Monitoring);

        scheduler.shutdown();
    }

    #[tokio::test]
    async fn watch_refuses_owner_without_probe() {
        let (harness, scheduler) = build().await;
        harness.probe.mark_unconfigured("owner-1");
        let outcome = harness
            .join_customer("owner-1", "Alice", harness.near_start())
            .await
            .unwrap();

        assert!(!scheduler.watch(outcome.slot.id).await.unwrap());
        assert!(scheduler.armed_slots().is_empty());

        // Slot stays pending: no monitoring load for an owner that can
        // never resolve.
        let slot = harness.registry.get(outcome.slot.id).await.unwrap().unwrap();
        assert_eq!(slot.status, SlotStatus::Pending);

        scheduler.shutdown();
    }

    #[tokio::test]
    async fn watch_unknown_slot_is_not_found() {
        let (_harness, scheduler) = build().await;
        let err = scheduler.watch(424_242).await.unwrap_err();
        assert!(matches!(err, SlotwatchError::NotFound { .. }));
        scheduler.shutdown();
    }

    #[tokio::test]
    async fn busy_probe_reschedules_at_current_tier() {
        let (harness, scheduler) = build().await;
        let outcome = harness
            .join_customer("owner-1", "Alice", harness.near_start())
            .await
            .unwrap();
        harness.probe.script_availability("owner-1", &[false]).await;

        let result = scheduler.run_slot_check(outcome.slot.id).await.unwrap();
        // 3 hours out: near tier.
        assert_eq!(
            result,
            CheckOutcome::Rescheduled {
                interval_minutes: harness.config.polling.near_interval_minutes
            }
        );

        let slot = harness.registry.get(outcome.slot.id).await.unwrap().unwrap();
        assert!(slot.last_check_at.is_some());
        assert!(slot.next_check_at.is_some());
        assert!(harness.notifier.availability_messages().await.is_empty());

        scheduler.shutdown();
    }

    #[tokio::test]
    async fn free_probe_notifies_first_claimant_only() {
        let (harness, scheduler) = build().await;
        let start = harness.near_start();
        let alice = harness.join_customer("owner-1", "Alice", start).await.unwrap();
        let bob = harness.join_customer("owner-1", "Bob", start).await.unwrap();
        assert_eq!(alice.slot.id, bob.slot.id);

        harness.probe.script_availability("owner-1", &[true]).await;
        let result = scheduler.run_slot_check(alice.slot.id).await.unwrap();
        assert_eq!(
            result,
            CheckOutcome::Stopped(StopReason::BecameAvailable)
        );

        // Only Alice (priority 1) was notified; Bob still waits.
        let entries = harness.queue.list_by_slot(alice.slot.id).await.unwrap();
        assert_eq!(entries[0].status, EntryStatus::Notified);
        assert!(entries[0].response_deadline.is_some());
        assert_eq!(entries[1].status, EntryStatus::Pending);

        let sent = harness.notifier.availability_messages().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].entry_id, alice.entry.id);
        assert!(sent[0].link.contains("/waitlist/"));

        let slot = harness.registry.get(alice.slot.id).await.unwrap().unwrap();
        assert_eq!(slot.status, SlotStatus::Available);

        scheduler.shutdown();
    }

    #[tokio::test]
    async fn duplicate_check_after_available_is_a_no_op() {
        let (harness, scheduler) = build().await;
        let outcome = harness
            .join_customer("owner-1", "Alice", harness.near_start())
            .await
            .unwrap();
        harness
            .probe
            .script_availability("owner-1", &[true, true])
            .await;

        scheduler.run_slot_check(outcome.slot.id).await.unwrap();
        let second = scheduler.run_slot_check(outcome.slot.id).await.unwrap();
        assert_eq!(
            second,
            CheckOutcome::Stopped(StopReason::AlreadyTerminal)
        );

        // Exactly one notification despite the duplicate fire.
        assert_eq!(harness.notifier.availability_messages().await.len(), 1);

        scheduler.shutdown();
    }

    #[tokio::test]
    async fn availability_token_resolves_and_confirms() {
        let (harness, scheduler) = build().await;
        let outcome = harness
            .join_customer("owner-1", "Alice", harness.near_start())
            .await
            .unwrap();
        harness.probe.script_availability("owner-1", &[true]).await;
        scheduler.run_slot_check(outcome.slot.id).await.unwrap();

        let sent = harness.notifier.availability_messages().await;
        let raw = sent[0].link.rsplit('/').next().unwrap();

        let entry = harness.queue.confirm_slot(raw).await.unwrap();
        assert_eq!(entry.status, EntryStatus::Confirmed);

        scheduler.shutdown();
    }

    #[tokio::test]
    async fn probe_error_is_treated_as_busy() {
        let (harness, scheduler) = build().await;
        let outcome = harness
            .join_customer("owner-1", "Alice", harness.near_start())
            .await
            .unwrap();
        harness
            .probe
            .push("owner-1", ProbeScript::Error("calendar 503".to_string()))
            .await;

        let result = scheduler.run_slot_check(outcome.slot.id).await.unwrap();
        assert!(matches!(result, CheckOutcome::Rescheduled { .. }));

        // No false positive: nothing sent, slot not available.
        assert!(harness.notifier.availability_messages().await.is_empty());
        let slot = harness.registry.get(outcome.slot.id).await.unwrap().unwrap();
        assert_ne!(slot.status, SlotStatus::Available);

        scheduler.shutdown();
    }

    #[tokio::test]
    async fn notifier_failure_does_not_undo_the_transition() {
        let (harness, scheduler) = build().await;
        let outcome = harness
            .join_customer("owner-1", "Alice", harness.near_start())
            .await
            .unwrap();
        harness.probe.script_availability("owner-1", &[true]).await;
        harness.notifier.fail_sends(true);

        let result = scheduler.run_slot_check(outcome.slot.id).await.unwrap();
        assert_eq!(
            result,
            CheckOutcome::Stopped(StopReason::BecameAvailable)
        );

        // Slot is available and the claimant is recorded as notified even
        // though the message never went out.
        let slot = harness.registry.get(outcome.slot.id).await.unwrap().unwrap();
        assert_eq!(slot.status, SlotStatus::Available);
        let entry = harness.queue.list_by_slot(slot.id).await.unwrap().remove(0);
        assert_eq!(entry.status, EntryStatus::Notified);

        scheduler.shutdown();
    }

    #[tokio::test]
    async fn past_start_expires_slot_and_pending_entries() {
        let (harness, scheduler) = build().await;
        let outcome = harness
            .join_customer("owner-1", "Alice", Utc::now() - Duration::minutes(5))
            .await
            .unwrap();

        let result = scheduler.run_slot_check(outcome.slot.id).await.unwrap();
        assert_eq!(result, CheckOutcome::Stopped(StopReason::Expired));

        let slot = harness.registry.get(outcome.slot.id).await.unwrap().unwrap();
        assert_eq!(slot.status, SlotStatus::Expired);
        let entry = harness.queue.list_by_slot(slot.id).await.unwrap().remove(0);
        assert_eq!(entry.status, EntryStatus::Expired);
        // Never probed: the slot was dead on arrival.
        assert_eq!(harness.probe.call_count("owner-1").await, 0);

        scheduler.shutdown();
    }

    #[tokio::test]
    async fn empty_queue_reverts_slot_to_pending() {
        let (harness, scheduler) = build().await;
        let outcome = harness
            .join_customer("owner-1", "Alice", harness.near_start())
            .await
            .unwrap();
        harness.queue.cancel(outcome.entry.id).await.unwrap();
        harness.registry.activate_monitoring(outcome.slot.id).await.unwrap();

        let result = scheduler.run_slot_check(outcome.slot.id).await.unwrap();
        assert_eq!(
            result,
            CheckOutcome::Stopped(StopReason::NoPendingEntries)
        );

        let slot = harness.registry.get(outcome.slot.id).await.unwrap().unwrap();
        assert_eq!(slot.status, SlotStatus::Pending);
        assert!(slot.next_check_at.is_none());
        assert_eq!(harness.probe.call_count("owner-1").await, 0);

        scheduler.shutdown();
    }

    #[tokio::test]
    async fn rehydrate_is_idempotent() {
        let (harness, scheduler) = build().await;
        let a = harness
            .join_customer("owner-1", "Alice", harness.near_start())
            .await
            .unwrap();
        let b = harness
            .join_customer(
                "owner-2",
                "Bob",
                Utc::now() + Duration::hours(30),
            )
            .await
            .unwrap();

        let armed = scheduler.rehydrate().await.unwrap();
        assert_eq!(armed, 2);
        let mut slots = scheduler.armed_slots();
        slots.sort_unstable();
        let mut expected = vec![a.slot.id, b.slot.id];
        expected.sort_unstable();
        assert_eq!(slots, expected);

        // Rehydrating again (no intervening fires) arms nothing new.
        let armed_again = scheduler.rehydrate().await.unwrap();
        assert_eq!(armed_again, 0);
        assert_eq!(scheduler.armed_slots().len(), 2);

        scheduler.shutdown();
    }

    #[tokio::test]
    async fn rehydrate_skips_unconfigured_owners() {
        let (harness, scheduler) = build().await;
        harness.probe.mark_unconfigured("owner-1");
        harness
            .join_customer("owner-1", "Alice", harness.near_start())
            .await
            .unwrap();

        let armed = scheduler.rehydrate().await.unwrap();
        assert_eq!(armed, 0);
        assert!(scheduler.armed_slots().is_empty());

        scheduler.shutdown();
    }

    #[tokio::test]
    async fn global_check_leaves_entryless_future_slot_alone() {
        let (harness, scheduler) = build().await;
        // A slot three hours out with nobody waiting.
        let slot = harness
            .registry
            .find_or_create("owner-1", Utc::now() + Duration::hours(3), None)
            .await
            .unwrap();

        let report = scheduler.run_global_check().await.unwrap();
        assert_eq!(report.rearmed_slots, 0);
        assert!(!scheduler.is_armed(slot.id));

        let slot = harness.registry.get(slot.id).await.unwrap().unwrap();
        assert_eq!(slot.status, SlotStatus::Pending);
        assert!(slot.next_check_at.is_none());

        scheduler.shutdown();
    }

    #[tokio::test]
    async fn global_check_self_heals_lost_timer() {
        let (harness, scheduler) = build().await;
        let outcome = harness
            .join_customer("owner-1", "Alice", harness.near_start())
            .await
            .unwrap();

        // Waiters exist but no timer is live (e.g. crash before rehydrate).
        let report = scheduler.run_global_check().await.unwrap();
        assert_eq!(report.rearmed_slots, 1);
        assert!(scheduler.is_armed(outcome.slot.id));

        let slot = harness.registry.get(outcome.slot.id).await.unwrap().unwrap();
        assert_eq!(slot.status, SlotStatus::Monitoring);

        scheduler.shutdown();
    }

    #[tokio::test]
    async fn global_check_skips_slots_with_armed_timers() {
        let (harness, scheduler) = build().await;
        let outcome = harness
            .join_customer("owner-1", "Alice", harness.near_start())
            .await
            .unwrap();
        scheduler.watch(outcome.slot.id).await.unwrap();

        let report = scheduler.run_global_check().await.unwrap();
        assert_eq!(report.rearmed_slots, 0);
        assert_eq!(scheduler.armed_slots().len(), 1);

        scheduler.shutdown();
    }

    #[tokio::test]
    async fn global_check_expires_past_slots() {
        let (harness, scheduler) = build().await;
        let outcome = harness
            .join_customer("owner-1", "Alice", Utc::now() - Duration::minutes(10))
            .await
            .unwrap();

        let report = scheduler.run_global_check().await.unwrap();
        assert_eq!(report.expired_slots, 1);

        let slot = harness.registry.get(outcome.slot.id).await.unwrap().unwrap();
        assert_eq!(slot.status, SlotStatus::Expired);

        scheduler.shutdown();
    }

    #[tokio::test]
    async fn global_check_expires_stale_notified_entries() {
        let (harness, scheduler) = build().await;
        let outcome = harness
            .join_customer("owner-1", "Alice", harness.near_start())
            .await
            .unwrap();
        let now = Utc::now();
        entries::mark_notified(
            &harness.db,
            outcome.entry.id,
            now - Duration::hours(1),
            now - Duration::minutes(10),
            None,
        )
        .await
        .unwrap();

        let report = scheduler.run_global_check().await.unwrap();
        assert_eq!(report.stale_entries_expired, 1);

        let entry = harness
            .queue
            .list_by_slot(outcome.slot.id)
            .await
            .unwrap()
            .remove(0);
        assert_eq!(entry.status, EntryStatus::Expired);

        scheduler.shutdown();
    }

    #[tokio::test]
    async fn shutdown_clears_timers_and_restart_rehydrates() {
        let (harness, scheduler) = build().await;
        let outcome = harness
            .join_customer("owner-1", "Alice", harness.near_start())
            .await
            .unwrap();
        scheduler.watch(outcome.slot.id).await.unwrap();
        assert!(scheduler.is_armed(outcome.slot.id));

        scheduler.shutdown();
        assert!(scheduler.armed_slots().is_empty());

        // Persisted state is untouched; a fresh instance picks it back up.
        let slot = harness.registry.get(outcome.slot.id).await.unwrap().unwrap();
        assert_eq!(slot.status, SlotStatus::Monitoring);

        let restarted = Scheduler::new(
            harness.db.clone(),
            harness.probe.clone(),
            harness.notifier.clone(),
            harness.config.clone(),
        );
        let armed = restarted.rehydrate().await.unwrap();
        assert_eq!(armed, 1);
        assert!(restarted.is_armed(outcome.slot.id));

        restarted.shutdown();
    }
}
