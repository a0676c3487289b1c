// SPDX-FileCopyrightText: 2026 Slotwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain services for the Slotwatch waitlist engine.
//!
//! Three services own the persistent waitlist state: [`SlotRegistry`]
//! (monitored windows and the adaptive check interval), [`EntryQueue`]
//! (fairness-ordered claimants and token-gated confirmations), and
//! [`TokenStore`] (single-use expiring capabilities). The scheduler in
//! `slotwatch-engine` drives them.

pub mod link;
pub mod queue;
pub mod registry;
pub mod tokens;

pub use link::confirmation_link;
pub use queue::{EntryDetails, EntryQueue, JoinOutcome, JoinRequest};
pub use registry::{compute_check_interval, SlotRegistry};
pub use tokens::{TokenContext, TokenStore};
