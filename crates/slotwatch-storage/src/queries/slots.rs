// SPDX-FileCopyrightText: 2026 Slotwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Slot CRUD and guarded status transitions.
//!
//! Transitions that must happen exactly once (`mark_available`,
//! `activate_monitoring`, `mark_expired`, `revert_to_pending`) are single
//! UPDATEs guarded by the expected current status; the returned bool is
//! false when another writer got there first.

use chrono::{DateTime, Duration, Utc};
use rusqlite::params;
use slotwatch_core::SlotwatchError;

use crate::database::{map_tr_err, Database};
use crate::models::{
    enum_from_sql, opt_ts_from_sql, opt_ts_to_sql, ts_from_sql, ts_to_sql, Slot, SlotStatus,
};

/// Parameters for creating a slot.
#[derive(Debug, Clone)]
pub struct NewSlot {
    pub owner_id: String,
    pub label: Option<String>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub check_interval_minutes: i64,
}

fn row_to_slot(row: &rusqlite::Row<'_>) -> rusqlite::Result<Slot> {
    Ok(Slot {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        label: row.get(2)?,
        start_at: ts_from_sql(3, row.get(3)?)?,
        end_at: ts_from_sql(4, row.get(4)?)?,
        status: enum_from_sql(5, row.get(5)?)?,
        check_interval_minutes: row.get(6)?,
        last_check_at: opt_ts_from_sql(7, row.get(7)?)?,
        next_check_at: opt_ts_from_sql(8, row.get(8)?)?,
        created_at: ts_from_sql(9, row.get(9)?)?,
        updated_at: ts_from_sql(10, row.get(10)?)?,
    })
}

const SLOT_COLUMNS: &str = "id, owner_id, label, start_at, end_at, status, \
                            check_interval_minutes, last_check_at, next_check_at, \
                            created_at, updated_at";

/// Create a new pending slot and return the stored row.
pub async fn insert(db: &Database, new: NewSlot) -> Result<Slot, SlotwatchError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO slots (owner_id, label, start_at, end_at, check_interval_minutes)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    new.owner_id,
                    new.label,
                    ts_to_sql(new.start_at),
                    ts_to_sql(new.end_at),
                    new.check_interval_minutes,
                ],
            )?;
            let id = conn.last_insert_rowid();
            let slot = conn.query_row(
                &format!("SELECT {SLOT_COLUMNS} FROM slots WHERE id = ?1"),
                params![id],
                row_to_slot,
            )?;
            Ok(slot)
        })
        .await
        .map_err(map_tr_err)
}

/// Get a slot by ID.
pub async fn get(db: &Database, id: i64) -> Result<Option<Slot>, SlotwatchError> {
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {SLOT_COLUMNS} FROM slots WHERE id = ?1"),
                params![id],
                row_to_slot,
            );
            match result {
                Ok(slot) => Ok(Some(slot)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Find a non-terminal slot for `owner_id` whose start time falls within
/// `window_minutes` of `start_at`. Used to make join idempotent per window.
pub async fn find_matching(
    db: &Database,
    owner_id: &str,
    start_at: DateTime<Utc>,
    window_minutes: i64,
) -> Result<Option<Slot>, SlotwatchError> {
    let owner_id = owner_id.to_string();
    let window_start = ts_to_sql(start_at - Duration::minutes(window_minutes));
    let window_end = ts_to_sql(start_at + Duration::minutes(window_minutes));
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!(
                    "SELECT {SLOT_COLUMNS} FROM slots
                     WHERE owner_id = ?1
                       AND status IN ('pending', 'monitoring')
                       AND start_at BETWEEN ?2 AND ?3
                     ORDER BY start_at ASC
                     LIMIT 1"
                ),
                params![owner_id, window_start, window_end],
                row_to_slot,
            );
            match result {
                Ok(slot) => Ok(Some(slot)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// List slots in any of the given statuses, ordered by start time.
pub async fn list_by_status(
    db: &Database,
    statuses: &[SlotStatus],
) -> Result<Vec<Slot>, SlotwatchError> {
    let statuses: Vec<String> = statuses.iter().map(|s| s.to_string()).collect();
    db.connection()
        .call(move |conn| {
            let placeholders = vec!["?"; statuses.len()].join(", ");
            let mut stmt = conn.prepare(&format!(
                "SELECT {SLOT_COLUMNS} FROM slots
                 WHERE status IN ({placeholders})
                 ORDER BY start_at ASC"
            ))?;
            let rows = stmt.query_map(rusqlite::params_from_iter(statuses.iter()), row_to_slot)?;
            let mut slots = Vec::new();
            for row in rows {
                slots.push(row?);
            }
            Ok(slots)
        })
        .await
        .map_err(map_tr_err)
}

/// List all slots for an owner, newest start first.
pub async fn list_by_owner(db: &Database, owner_id: &str) -> Result<Vec<Slot>, SlotwatchError> {
    let owner_id = owner_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SLOT_COLUMNS} FROM slots WHERE owner_id = ?1 ORDER BY start_at DESC"
            ))?;
            let rows = stmt.query_map(params![owner_id], row_to_slot)?;
            let mut slots = Vec::new();
            for row in rows {
                slots.push(row?);
            }
            Ok(slots)
        })
        .await
        .map_err(map_tr_err)
}

/// Transition `pending -> monitoring`, stamping the interval and next check.
///
/// Returns false if the slot was not pending (already monitoring, terminal,
/// or missing).
pub async fn activate_monitoring(
    db: &Database,
    id: i64,
    check_interval_minutes: i64,
    next_check_at: DateTime<Utc>,
) -> Result<bool, SlotwatchError> {
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE slots SET status = 'monitoring',
                 check_interval_minutes = ?2,
                 next_check_at = ?3,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND status = 'pending'",
                params![id, check_interval_minutes, ts_to_sql(next_check_at)],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Transition to the terminal `available` status and clear the schedule.
///
/// The false return is the exactly-once guard: whichever caller observes
/// true owns the follow-up notification.
pub async fn mark_available(db: &Database, id: i64) -> Result<bool, SlotwatchError> {
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE slots SET status = 'available',
                 next_check_at = NULL,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND status IN ('pending', 'monitoring')",
                params![id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Transition to the terminal `expired` status and clear the schedule.
pub async fn mark_expired(db: &Database, id: i64) -> Result<bool, SlotwatchError> {
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE slots SET status = 'expired',
                 next_check_at = NULL,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND status IN ('pending', 'monitoring')",
                params![id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Transition `monitoring -> pending` when the last pending entry is gone.
pub async fn revert_to_pending(db: &Database, id: i64) -> Result<bool, SlotwatchError> {
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE slots SET status = 'pending',
                 next_check_at = NULL,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND status = 'monitoring'",
                params![id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Stamp the outcome of a check cycle without changing status.
pub async fn record_check(
    db: &Database,
    id: i64,
    last_check_at: DateTime<Utc>,
    next_check_at: Option<DateTime<Utc>>,
    check_interval_minutes: i64,
) -> Result<(), SlotwatchError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE slots SET last_check_at = ?2,
                 next_check_at = ?3,
                 check_interval_minutes = ?4,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![
                    id,
                    ts_to_sql(last_check_at),
                    opt_ts_to_sql(next_check_at),
                    check_interval_minutes,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Count an owner's non-terminal slots.
pub async fn count_active_by_owner(
    db: &Database,
    owner_id: &str,
) -> Result<i64, SlotwatchError> {
    let owner_id = owner_id.to_string();
    db.connection()
        .call(move |conn| {
            let n = conn.query_row(
                "SELECT COUNT(*) FROM slots
                 WHERE owner_id = ?1 AND status IN ('pending', 'monitoring')",
                params![owner_id],
                |row| row.get(0),
            )?;
            Ok(n)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete slots whose start time is older than `cutoff`. Entries and tokens
/// go with them via FK cascade. Returns the number of slots deleted.
pub async fn sweep_older_than(
    db: &Database,
    cutoff: DateTime<Utc>,
) -> Result<usize, SlotwatchError> {
    db.connection()
        .call(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM slots WHERE start_at < ?1",
                params![ts_to_sql(cutoff)],
            )?;
            Ok(deleted)
        })
        .await
        .map_err(map_tr_err)
}
