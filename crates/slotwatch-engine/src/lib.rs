// SPDX-FileCopyrightText: 2026 Slotwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adaptive polling scheduler for the Slotwatch waitlist engine.
//!
//! The [`Scheduler`] owns one lightweight timer per monitored slot, drives
//! the check -> reschedule/notify/expire cycle against the availability
//! probe, rehydrates timers after a restart, and runs a periodic
//! self-healing global check.

pub mod scheduler;

pub use scheduler::{CheckOutcome, Scheduler, StopReason, SweepReport};
