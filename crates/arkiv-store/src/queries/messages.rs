// SPDX-FileCopyrightText: 2026 Arkiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message and message-file link operations.

use arkiv_core::{ArkivError, AttachmentKind};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::{MessageInsert, MessageRow};

/// Fields recorded for a newly ingested message.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub chat_id: i64,
    pub message_id: i64,
    pub original_message_id: Option<i64>,
    pub sender_id: Option<i64>,
    pub received_at: String,
    pub forwarded_at: Option<String>,
    pub source_id: Option<i64>,
    pub text: Option<String>,
    pub raw_json: String,
}

/// Insert a message.
///
/// A uniqueness violation on (chat_id, message_id) means the message was
/// already ingested; that is reported as `MessageInsert::Duplicate`, not as
/// an error.
pub async fn insert_message(db: &Database, msg: &NewMessage) -> Result<MessageInsert, ArkivError> {
    let msg = msg.clone();
    db.connection()
        .call(move |conn| {
            let result = conn.execute(
                "INSERT INTO messages
                 (chat_id, message_id, original_message_id, sender_id,
                  received_at, forwarded_at, source_id, text, raw_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    msg.chat_id,
                    msg.message_id,
                    msg.original_message_id,
                    msg.sender_id,
                    msg.received_at,
                    msg.forwarded_at,
                    msg.source_id,
                    msg.text,
                    msg.raw_json,
                ],
            );
            match result {
                Ok(_) => Ok(MessageInsert::Created(conn.last_insert_rowid())),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    Ok(MessageInsert::Duplicate)
                }
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Link a message to a file. Re-linking the same (message, file, kind) is a no-op.
pub async fn link_message_file(
    db: &Database,
    message_id: i64,
    file_id: i64,
    kind: AttachmentKind,
    caption: Option<String>,
) -> Result<(), ArkivError> {
    let kind = kind.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO message_files (message_id, file_id, kind, caption)
                 VALUES (?1, ?2, ?3, ?4)",
                params![message_id, file_id, kind, caption],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a message by id.
pub async fn message_by_id(db: &Database, id: i64) -> Result<Option<MessageRow>, ArkivError> {
    db.connection()
        .call(move |conn| {
            let row = conn
                .query_row(
                    "SELECT id, chat_id, message_id, original_message_id, sender_id,
                            received_at, forwarded_at, source_id, text, raw_json
                     FROM messages WHERE id = ?1",
                    params![id],
                    |row| {
                        Ok(MessageRow {
                            id: row.get(0)?,
                            chat_id: row.get(1)?,
                            message_id: row.get(2)?,
                            original_message_id: row.get(3)?,
                            sender_id: row.get(4)?,
                            received_at: row.get(5)?,
                            forwarded_at: row.get(6)?,
                            source_id: row.get(7)?,
                            text: row.get(8)?,
                            raw_json: row.get(9)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
        .await
        .map_err(map_tr_err)
}
