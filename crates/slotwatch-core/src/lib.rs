// SPDX-FileCopyrightText: 2026 Slotwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Slotwatch waitlist monitoring engine.
//!
//! This crate provides the error type, domain types, and the collaborator
//! traits ([`AvailabilityProbe`], [`Notifier`]) that the rest of the
//! workspace builds on. The calendar provider and the message transport
//! implement the traits defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::SlotwatchError;
pub use traits::{AvailabilityProbe, Notifier};
pub use types::{
    Availability, Customer, Entry, EntryStatus, OwnerStats, Slot, SlotStatus, Token,
    TokenPurpose,
};
