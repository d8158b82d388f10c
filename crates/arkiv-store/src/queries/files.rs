// SPDX-FileCopyrightText: 2026 Arkiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! File entity operations.

use arkiv_core::ArkivError;
use rusqlite::{OptionalExtension, Row, params};

use crate::database::{Database, map_tr_err};
use crate::models::FileRow;
use crate::queries::parse_enum;

fn row_to_file(row: &Row<'_>) -> Result<FileRow, rusqlite::Error> {
    Ok(FileRow {
        id: row.get(0)?,
        content_id: row.get(1)?,
        handle: row.get(2)?,
        declared_size: row.get(3)?,
        mime_type: row.get(4)?,
        original_name: row.get(5)?,
        local_path: row.get(6)?,
        local_size: row.get(7)?,
        sha256: row.get(8)?,
        status: parse_enum(row.get(9)?)?,
    })
}

const FILE_COLUMNS: &str = "id, content_id, handle, declared_size, mime_type, original_name,
                            local_path, local_size, sha256, status";

/// Insert or update a file entity, returning its id.
///
/// The transient handle is always refreshed; descriptive fields (size, MIME
/// type, name) only fill NULLs, never clobbering known values.
pub async fn upsert_file(
    db: &Database,
    content_id: &str,
    handle: &str,
    declared_size: Option<i64>,
    mime_type: Option<String>,
    original_name: Option<String>,
) -> Result<i64, ArkivError> {
    let content_id = content_id.to_string();
    let handle = handle.to_string();
    db.connection()
        .call(move |conn| {
            let id = conn.query_row(
                "INSERT INTO files (content_id, handle, declared_size, mime_type, original_name)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(content_id) DO UPDATE SET
                     handle = excluded.handle,
                     declared_size = COALESCE(files.declared_size, excluded.declared_size),
                     mime_type = COALESCE(files.mime_type, excluded.mime_type),
                     original_name = COALESCE(files.original_name, excluded.original_name),
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 RETURNING id",
                params![content_id, handle, declared_size, mime_type, original_name],
                |row| row.get(0),
            )?;
            Ok(id)
        })
        .await
        .map_err(map_tr_err)
}

/// Record a completed download: path, actual size, hash, status DOWNLOADED.
pub async fn mark_downloaded(
    db: &Database,
    file_id: i64,
    local_path: &str,
    local_size: i64,
    sha256: Option<String>,
) -> Result<(), ArkivError> {
    let local_path = local_path.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE files
                 SET local_path = ?1, local_size = ?2, sha256 = ?3, status = 'DOWNLOADED',
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?4",
                params![local_path, local_size, sha256, file_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Record a terminal download failure on the file entity.
pub async fn mark_failed(db: &Database, file_id: i64) -> Result<(), ArkivError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE files
                 SET status = 'FAILED', updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![file_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a file by id.
pub async fn file_by_id(db: &Database, id: i64) -> Result<Option<FileRow>, ArkivError> {
    db.connection()
        .call(move |conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {FILE_COLUMNS} FROM files WHERE id = ?1"),
                    params![id],
                    |row| row_to_file(row),
                )
                .optional()?;
            Ok(row)
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a file by its content-stable identifier.
pub async fn file_by_content_id(
    db: &Database,
    content_id: &str,
) -> Result<Option<FileRow>, ArkivError> {
    let content_id = content_id.to_string();
    db.connection()
        .call(move |conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {FILE_COLUMNS} FROM files WHERE content_id = ?1"),
                    params![content_id],
                    |row| row_to_file(row),
                )
                .optional()?;
            Ok(row)
        })
        .await
        .map_err(map_tr_err)
}
