// SPDX-FileCopyrightText: 2026 Slotwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Token persistence: hash-keyed lookup, single-use consumption, expiry sweep.

use chrono::{DateTime, Utc};
use rusqlite::params;
use slotwatch_core::SlotwatchError;

use crate::database::{map_tr_err, Database};
use crate::models::{enum_from_sql, opt_ts_from_sql, ts_from_sql, ts_to_sql, Token, TokenPurpose};

fn row_to_token(row: &rusqlite::Row<'_>) -> rusqlite::Result<Token> {
    Ok(Token {
        id: row.get(0)?,
        entry_id: row.get(1)?,
        token_hash: row.get(2)?,
        purpose: enum_from_sql(3, row.get(3)?)?,
        expires_at: ts_from_sql(4, row.get(4)?)?,
        consumed_at: opt_ts_from_sql(5, row.get(5)?)?,
        created_at: ts_from_sql(6, row.get(6)?)?,
    })
}

const TOKEN_COLUMNS: &str =
    "id, entry_id, token_hash, purpose, expires_at, consumed_at, created_at";

/// Store a token hash with its metadata and return the stored row.
pub async fn insert(
    db: &Database,
    entry_id: i64,
    token_hash: &str,
    purpose: TokenPurpose,
    expires_at: DateTime<Utc>,
) -> Result<Token, SlotwatchError> {
    let token_hash = token_hash.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO tokens (entry_id, token_hash, purpose, expires_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    entry_id,
                    token_hash,
                    purpose.to_string(),
                    ts_to_sql(expires_at),
                ],
            )?;
            let id = conn.last_insert_rowid();
            let token = conn.query_row(
                &format!("SELECT {TOKEN_COLUMNS} FROM tokens WHERE id = ?1"),
                params![id],
                row_to_token,
            )?;
            Ok(token)
        })
        .await
        .map_err(map_tr_err)
}

/// Look up a usable token by hash: unconsumed and unexpired at `now`.
pub async fn find_active_by_hash(
    db: &Database,
    token_hash: &str,
    now: DateTime<Utc>,
) -> Result<Option<Token>, SlotwatchError> {
    let token_hash = token_hash.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!(
                    "SELECT {TOKEN_COLUMNS} FROM tokens
                     WHERE token_hash = ?1
                       AND consumed_at IS NULL
                       AND expires_at > ?2"
                ),
                params![token_hash, ts_to_sql(now)],
                row_to_token,
            );
            match result {
                Ok(token) => Ok(Some(token)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Consume a token. The `consumed_at IS NULL` guard makes this atomic:
/// exactly one caller ever sees true for a given token.
pub async fn consume(db: &Database, id: i64, now: DateTime<Utc>) -> Result<bool, SlotwatchError> {
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE tokens SET consumed_at = ?2
                 WHERE id = ?1 AND consumed_at IS NULL",
                params![id, ts_to_sql(now)],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete tokens past expiry, consumed or not. Returns the count deleted.
pub async fn sweep_expired(db: &Database, now: DateTime<Utc>) -> Result<usize, SlotwatchError> {
    db.connection()
        .call(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM tokens WHERE expires_at <= ?1",
                params![ts_to_sql(now)],
            )?;
            Ok(deleted)
        })
        .await
        .map_err(map_tr_err)
}
