// SPDX-FileCopyrightText: 2026 Slotwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Entry CRUD, queue ordering, and guarded status transitions.
//!
//! Priority assignment happens inside the insert's write call, so two
//! concurrent joins serialized through the single writer thread can never
//! observe the same MAX(priority).

use chrono::{DateTime, Utc};
use rusqlite::params;
use slotwatch_core::SlotwatchError;

use crate::database::{map_tr_err, Database};
use crate::models::{
    alternatives_from_sql, alternatives_to_sql, enum_from_sql, opt_ts_from_sql, ts_from_sql,
    ts_to_sql, Customer, Entry, OwnerStats,
};

/// Parameters for creating an entry.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub slot_id: i64,
    pub owner_id: String,
    pub customer: Customer,
    pub requested_at: DateTime<Utc>,
    pub alternatives: Vec<DateTime<Utc>>,
    pub party_size: i64,
    pub source: Option<String>,
}

/// Contact/preference fields a customer may update when completing
/// registration. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct EntryDetails {
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub party_size: Option<i64>,
    pub alternatives: Option<Vec<DateTime<Utc>>>,
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<Entry> {
    Ok(Entry {
        id: row.get(0)?,
        slot_id: row.get(1)?,
        owner_id: row.get(2)?,
        customer_name: row.get(3)?,
        customer_phone: row.get(4)?,
        customer_email: row.get(5)?,
        requested_at: ts_from_sql(6, row.get(6)?)?,
        alternatives: alternatives_from_sql(7, row.get(7)?)?,
        party_size: row.get(8)?,
        status: enum_from_sql(9, row.get(9)?)?,
        priority: row.get(10)?,
        source: row.get(11)?,
        notified_at: opt_ts_from_sql(12, row.get(12)?)?,
        response_deadline: opt_ts_from_sql(13, row.get(13)?)?,
        message_id: row.get(14)?,
        created_at: ts_from_sql(15, row.get(15)?)?,
        updated_at: ts_from_sql(16, row.get(16)?)?,
    })
}

const ENTRY_COLUMNS: &str = "id, slot_id, owner_id, customer_name, customer_phone, \
                             customer_email, requested_at, alternatives, party_size, status, \
                             priority, source, notified_at, response_deadline, message_id, \
                             created_at, updated_at";

/// Create a pending entry at the back of the slot's queue.
///
/// Priority is `MAX(priority) + 1` over all of the slot's entries
/// (cancelled ones included), which keeps priorities unique and strictly
/// increasing by creation order.
pub async fn insert_pending(db: &Database, new: NewEntry) -> Result<Entry, SlotwatchError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let priority: i64 = tx.query_row(
                "SELECT COALESCE(MAX(priority), 0) + 1 FROM entries WHERE slot_id = ?1",
                params![new.slot_id],
                |row| row.get(0),
            )?;

            tx.execute(
                "INSERT INTO entries (slot_id, owner_id, customer_name, customer_phone,
                                      customer_email, requested_at, alternatives, party_size,
                                      priority, source)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    new.slot_id,
                    new.owner_id,
                    new.customer.name,
                    new.customer.phone,
                    new.customer.email,
                    ts_to_sql(new.requested_at),
                    alternatives_to_sql(&new.alternatives),
                    new.party_size,
                    priority,
                    new.source,
                ],
            )?;
            let id = tx.last_insert_rowid();

            let entry = tx.query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = ?1"),
                params![id],
                row_to_entry,
            )?;

            tx.commit()?;
            Ok(entry)
        })
        .await
        .map_err(map_tr_err)
}

/// Get an entry by ID.
pub async fn get(db: &Database, id: i64) -> Result<Option<Entry>, SlotwatchError> {
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = ?1"),
                params![id],
                row_to_entry,
            );
            match result {
                Ok(entry) => Ok(Some(entry)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// The next claimant: the lowest-priority pending entry for the slot.
pub async fn next_claimant(db: &Database, slot_id: i64) -> Result<Option<Entry>, SlotwatchError> {
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!(
                    "SELECT {ENTRY_COLUMNS} FROM entries
                     WHERE slot_id = ?1 AND status = 'pending'
                     ORDER BY priority ASC
                     LIMIT 1"
                ),
                params![slot_id],
                row_to_entry,
            );
            match result {
                Ok(entry) => Ok(Some(entry)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Count pending entries for a slot.
pub async fn pending_count(db: &Database, slot_id: i64) -> Result<i64, SlotwatchError> {
    db.connection()
        .call(move |conn| {
            let n = conn.query_row(
                "SELECT COUNT(*) FROM entries WHERE slot_id = ?1 AND status = 'pending'",
                params![slot_id],
                |row| row.get(0),
            )?;
            Ok(n)
        })
        .await
        .map_err(map_tr_err)
}

/// List a slot's entries in queue order.
pub async fn list_by_slot(db: &Database, slot_id: i64) -> Result<Vec<Entry>, SlotwatchError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ENTRY_COLUMNS} FROM entries WHERE slot_id = ?1 ORDER BY priority ASC"
            ))?;
            let rows = stmt.query_map(params![slot_id], row_to_entry)?;
            let mut entries = Vec::new();
            for row in rows {
                entries.push(row?);
            }
            Ok(entries)
        })
        .await
        .map_err(map_tr_err)
}

/// List all entries for an owner, newest first.
pub async fn list_by_owner(db: &Database, owner_id: &str) -> Result<Vec<Entry>, SlotwatchError> {
    let owner_id = owner_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ENTRY_COLUMNS} FROM entries
                 WHERE owner_id = ?1
                 ORDER BY created_at DESC, id DESC"
            ))?;
            let rows = stmt.query_map(params![owner_id], row_to_entry)?;
            let mut entries = Vec::new();
            for row in rows {
                entries.push(row?);
            }
            Ok(entries)
        })
        .await
        .map_err(map_tr_err)
}

/// Transition `pending -> notified`, stamping the deadline and outbound
/// message ID. Returns false if the entry was not pending.
pub async fn mark_notified(
    db: &Database,
    id: i64,
    notified_at: DateTime<Utc>,
    response_deadline: DateTime<Utc>,
    message_id: Option<&str>,
) -> Result<bool, SlotwatchError> {
    let message_id = message_id.map(|s| s.to_string());
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE entries SET status = 'notified',
                 notified_at = ?2,
                 response_deadline = ?3,
                 message_id = ?4,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND status = 'pending'",
                params![
                    id,
                    ts_to_sql(notified_at),
                    ts_to_sql(response_deadline),
                    message_id,
                ],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Transition `pending|notified -> confirmed`.
pub async fn mark_confirmed(db: &Database, id: i64) -> Result<bool, SlotwatchError> {
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE entries SET status = 'confirmed',
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND status IN ('pending', 'notified')",
                params![id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Transition to `cancelled`. Idempotent: repeat calls return false.
pub async fn mark_cancelled(db: &Database, id: i64) -> Result<bool, SlotwatchError> {
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE entries SET status = 'cancelled',
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND status IN ('pending', 'notified')",
                params![id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Transition to `expired`. Idempotent: repeat calls return false.
pub async fn mark_expired(db: &Database, id: i64) -> Result<bool, SlotwatchError> {
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE entries SET status = 'expired',
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND status IN ('pending', 'notified')",
                params![id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Apply customer-supplied detail updates; absent fields keep their value.
pub async fn update_details(
    db: &Database,
    id: i64,
    details: EntryDetails,
) -> Result<(), SlotwatchError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE entries SET
                 customer_name = COALESCE(?2, customer_name),
                 customer_email = COALESCE(?3, customer_email),
                 party_size = COALESCE(?4, party_size),
                 alternatives = COALESCE(?5, alternatives),
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![
                    id,
                    details.customer_name,
                    details.customer_email,
                    details.party_size,
                    details.alternatives.as_deref().and_then(alternatives_to_sql),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Expire every pending entry of a slot (the slot-expiry cascade).
pub async fn expire_pending_for_slot(
    db: &Database,
    slot_id: i64,
) -> Result<usize, SlotwatchError> {
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE entries SET status = 'expired',
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE slot_id = ?1 AND status = 'pending'",
                params![slot_id],
            )?;
            Ok(changed)
        })
        .await
        .map_err(map_tr_err)
}

/// Expire notified entries whose response deadline has passed.
pub async fn expire_stale_notified(
    db: &Database,
    now: DateTime<Utc>,
) -> Result<usize, SlotwatchError> {
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE entries SET status = 'expired',
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE status = 'notified' AND response_deadline < ?1",
                params![ts_to_sql(now)],
            )?;
            Ok(changed)
        })
        .await
        .map_err(map_tr_err)
}

/// Aggregate counts for an owner's dashboard.
pub async fn owner_stats(db: &Database, owner_id: &str) -> Result<OwnerStats, SlotwatchError> {
    let owner_id = owner_id.to_string();
    db.connection()
        .call(move |conn| {
            let (total, pending, confirmed): (i64, i64, i64) = conn.query_row(
                "SELECT COUNT(*),
                        COALESCE(SUM(status = 'pending'), 0),
                        COALESCE(SUM(status = 'confirmed'), 0)
                 FROM entries WHERE owner_id = ?1",
                params![owner_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;
            let active_slots: i64 = conn.query_row(
                "SELECT COUNT(*) FROM slots
                 WHERE owner_id = ?1 AND status IN ('pending', 'monitoring')",
                params![owner_id],
                |row| row.get(0),
            )?;
            let conversion_rate = if total > 0 {
                confirmed as f64 / total as f64
            } else {
                0.0
            };
            Ok(OwnerStats {
                total_entries: total,
                pending_entries: pending,
                confirmed_entries: confirmed,
                active_slots,
                conversion_rate,
            })
        })
        .await
        .map_err(map_tr_err)
}
