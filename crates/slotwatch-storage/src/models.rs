// SPDX-FileCopyrightText: 2026 Slotwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types and row-boundary conversion helpers.
//!
//! The canonical types live in `slotwatch-core::types`; this module
//! re-exports them and provides the TEXT-column converters used by the
//! query modules. Timestamps are stored as RFC3339 UTC with millisecond
//! precision so that lexicographic comparison in SQL matches chronological
//! order.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;

pub use slotwatch_core::types::{
    Availability, Customer, Entry, EntryStatus, OwnerStats, Slot, SlotStatus, Token,
    TokenPurpose,
};

/// Format a timestamp for storage: `2026-01-01T00:00:00.000Z`.
pub(crate) fn ts_to_sql(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Format an optional timestamp for storage.
pub(crate) fn opt_ts_to_sql(dt: Option<DateTime<Utc>>) -> Option<String> {
    dt.map(ts_to_sql)
}

/// Parse a stored timestamp, mapping failures to a rusqlite conversion error
/// so row mappers can use `?`.
pub(crate) fn ts_from_sql(idx: usize, value: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Parse an optional stored timestamp.
pub(crate) fn opt_ts_from_sql(
    idx: usize,
    value: Option<String>,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    value.map(|v| ts_from_sql(idx, v)).transpose()
}

/// Parse a stored status/purpose string into its enum.
pub(crate) fn enum_from_sql<T>(idx: usize, value: String) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Serialize the alternatives list as a JSON array column, `None` when empty.
pub(crate) fn alternatives_to_sql(alternatives: &[DateTime<Utc>]) -> Option<String> {
    if alternatives.is_empty() {
        None
    } else {
        // Vec<DateTime<Utc>> serializes to an RFC3339 string array.
        serde_json::to_string(alternatives).ok()
    }
}

/// Parse the alternatives JSON column.
pub(crate) fn alternatives_from_sql(
    idx: usize,
    value: Option<String>,
) -> rusqlite::Result<Vec<DateTime<Utc>>> {
    match value {
        None => Ok(Vec::new()),
        Some(raw) => serde_json::from_str(&raw).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
        }),
    }
}
