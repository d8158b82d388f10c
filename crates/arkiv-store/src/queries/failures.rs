// SPDX-FileCopyrightText: 2026 Arkiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only terminal failure records.
//!
//! A row lands here only when a download is abandoned for good. The table is
//! never updated or pruned; it exists for operational statistics.

use arkiv_core::{ArkivError, FailureKind, SourceKind};
use rusqlite::params;

use crate::database::{Database, map_tr_err};
use crate::queries::parse_enum;

/// Fields recorded for a terminal download failure.
#[derive(Debug, Clone)]
pub struct NewFailure {
    pub file_id: i64,
    pub content_id: String,
    pub source_kind: Option<SourceKind>,
    pub chat_id: Option<i64>,
    pub original_name: Option<String>,
    pub kind: FailureKind,
    pub primary_error: Option<String>,
    pub secondary_error: Option<String>,
}

/// Append a terminal failure record.
pub async fn record_failure(db: &Database, failure: &NewFailure) -> Result<i64, ArkivError> {
    let failure = failure.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO failures
                 (file_id, content_id, source_kind, chat_id, original_name,
                  kind, primary_error, secondary_error)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    failure.file_id,
                    failure.content_id,
                    failure.source_kind.map(|k| k.to_string()),
                    failure.chat_id,
                    failure.original_name,
                    failure.kind.to_string(),
                    failure.primary_error,
                    failure.secondary_error,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// Count failures per kind, optionally restricted to one month (`YYYY-MM`).
pub async fn failure_stats(
    db: &Database,
    month: Option<&str>,
) -> Result<Vec<(FailureKind, i64)>, ArkivError> {
    let month = month.map(|m| m.to_string());
    db.connection()
        .call(move |conn| {
            let (sql, filter) = match &month {
                Some(m) => (
                    "SELECT kind, COUNT(*) FROM failures
                     WHERE created_at LIKE ?1 || '%'
                     GROUP BY kind ORDER BY kind",
                    Some(m.as_str()),
                ),
                None => (
                    "SELECT kind, COUNT(*) FROM failures GROUP BY kind ORDER BY kind",
                    None,
                ),
            };
            let mut stmt = conn.prepare(sql)?;
            let map_row = |row: &rusqlite::Row<'_>| {
                Ok((
                    parse_enum::<FailureKind>(row.get(0)?)?,
                    row.get::<_, i64>(1)?,
                ))
            };
            let rows = match filter {
                Some(m) => stmt.query_map(params![m], map_row)?.collect::<Result<Vec<_>, _>>()?,
                None => stmt.query_map([], map_row)?.collect::<Result<Vec<_>, _>>()?,
            };
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}
