// SPDX-FileCopyrightText: 2026 Slotwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notifier trait: the boundary to the SMS/email transport.

use async_trait::async_trait;

use crate::error::SlotwatchError;
use crate::types::{Entry, Slot};

/// Outbound customer messaging.
///
/// Both sends are fire-and-forget from the engine's perspective: failures
/// are logged by the caller and never retried inline (retry policy belongs
/// to the transport).
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send the initial "you joined the waitlist" message with the
    /// registration link.
    async fn send_join_message(&self, entry: &Entry, link: &str) -> Result<(), SlotwatchError>;

    /// Send the "slot available -- confirm now" message with the
    /// confirmation link.
    async fn send_availability_message(
        &self,
        entry: &Entry,
        slot: &Slot,
        link: &str,
    ) -> Result<(), SlotwatchError>;
}
