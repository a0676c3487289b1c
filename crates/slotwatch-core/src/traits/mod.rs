// SPDX-FileCopyrightText: 2026 Slotwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator trait definitions for the engine's external seams.
//!
//! The calendar provider and the SMS/email transport live outside this
//! system; the engine only sees them through [`AvailabilityProbe`] and
//! [`Notifier`]. Both use `#[async_trait]` for dynamic dispatch.

pub mod notifier;
pub mod probe;

pub use notifier::Notifier;
pub use probe::AvailabilityProbe;
