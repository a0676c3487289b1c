// SPDX-FileCopyrightText: 2026 Slotwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common domain types used across the Slotwatch workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Lifecycle status of a monitored slot.
///
/// `available` and `expired` are terminal for scheduling purposes: once a
/// slot reaches either, no timer may ever be armed for it again.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    Pending,
    Monitoring,
    Available,
    Expired,
}

impl SlotStatus {
    /// Whether this status ends monitoring permanently.
    pub fn is_terminal(self) -> bool {
        matches!(self, SlotStatus::Available | SlotStatus::Expired)
    }
}

/// Lifecycle status of a waitlist entry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Pending,
    Notified,
    Confirmed,
    Expired,
    Cancelled,
}

/// What a token authorizes: completing registration after joining, or
/// claiming a freed slot.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TokenPurpose {
    Registration,
    Confirmation,
}

/// One contested time window for one resource owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub id: i64,
    pub owner_id: String,
    /// Free-text description of the resource (e.g. "patio table for 4").
    pub label: Option<String>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: SlotStatus,
    pub check_interval_minutes: i64,
    pub last_check_at: Option<DateTime<Utc>>,
    pub next_check_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One customer's standing claim on a slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: i64,
    pub slot_id: i64,
    /// Denormalized from the slot for owner-scoped queries.
    pub owner_id: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub requested_at: DateTime<Utc>,
    /// Acceptable alternative times, if the customer gave any.
    pub alternatives: Vec<DateTime<Utc>>,
    pub party_size: i64,
    pub status: EntryStatus,
    /// Queue position. Unique per slot, strictly increasing by creation order;
    /// the lowest-priority pending entry is the next claimant.
    pub priority: i64,
    pub source: Option<String>,
    pub notified_at: Option<DateTime<Utc>>,
    pub response_deadline: Option<DateTime<Utc>>,
    /// Identifier of the outbound availability message, if one was sent.
    pub message_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single-use capability for acting on one entry without authentication.
///
/// Only the SHA-256 hash of the raw value is stored; the raw value is
/// returned once at issuance and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub id: i64,
    pub entry_id: i64,
    pub token_hash: String,
    pub purpose: TokenPurpose,
    pub expires_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Token {
    /// Usable means unconsumed and unexpired at `now`.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.consumed_at.is_none() && self.expires_at > now
    }
}

/// Customer identity attached to a join request. Phone is mandatory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Result of an availability probe call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Availability {
    pub is_available: bool,
    /// Opaque conflict descriptions from the calendar side, for logging only.
    #[serde(default)]
    pub conflicts: Vec<String>,
}

/// Per-owner aggregate counts for the dashboard read path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerStats {
    pub total_entries: i64,
    pub pending_entries: i64,
    pub confirmed_entries: i64,
    pub active_slots: i64,
    /// confirmed / total, or 0.0 when there are no entries.
    pub conversion_rate: f64,
}
