// SPDX-FileCopyrightText: 2026 Arkiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Source (forward origin) operations.

use arkiv_core::{ArkivError, SourceRef};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::SourceRow;
use crate::queries::parse_enum;

/// Insert or update a source, returning its id.
///
/// Title and username are overwritten with the latest sighting.
pub async fn upsert_source(db: &Database, source: &SourceRef) -> Result<i64, ArkivError> {
    let kind = source.kind.to_string();
    let chat_id = source.chat_id;
    let title = source.title.clone();
    let username = source.username.clone();
    db.connection()
        .call(move |conn| {
            let id = conn.query_row(
                "INSERT INTO sources (source_kind, chat_id, title, username)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(source_kind, chat_id)
                 DO UPDATE SET title = excluded.title, username = excluded.username
                 RETURNING id",
                params![kind, chat_id, title, username],
                |row| row.get(0),
            )?;
            Ok(id)
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a source by id.
pub async fn source_by_id(db: &Database, id: i64) -> Result<Option<SourceRow>, ArkivError> {
    db.connection()
        .call(move |conn| {
            let row = conn
                .query_row(
                    "SELECT id, source_kind, chat_id, title, username
                     FROM sources WHERE id = ?1",
                    params![id],
                    |row| {
                        Ok(SourceRow {
                            id: row.get(0)?,
                            kind: parse_enum(row.get(1)?)?,
                            chat_id: row.get(2)?,
                            title: row.get(3)?,
                            username: row.get(4)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arkiv_core::SourceKind;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn upsert_overwrites_title_and_username() {
        let (db, _dir) = setup_db().await;

        let first = SourceRef {
            kind: SourceKind::Channel,
            chat_id: -1001,
            title: Some("Old Title".into()),
            username: None,
        };
        let id = upsert_source(&db, &first).await.unwrap();

        let second = SourceRef {
            title: Some("New Title".into()),
            username: Some("newname".into()),
            ..first
        };
        let id2 = upsert_source(&db, &second).await.unwrap();
        assert_eq!(id, id2, "same (kind, chat_id) must map to one row");

        let row = source_by_id(&db, id).await.unwrap().unwrap();
        assert_eq!(row.title.as_deref(), Some("New Title"));
        assert_eq!(row.username.as_deref(), Some("newname"));
        assert_eq!(row.kind, SourceKind::Channel);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn distinct_kinds_are_distinct_sources() {
        let (db, _dir) = setup_db().await;

        let a = upsert_source(
            &db,
            &SourceRef {
                kind: SourceKind::Group,
                chat_id: 7,
                title: None,
                username: None,
            },
        )
        .await
        .unwrap();
        let b = upsert_source(
            &db,
            &SourceRef {
                kind: SourceKind::User,
                chat_id: 7,
                title: None,
                username: None,
            },
        )
        .await
        .unwrap();
        assert_ne!(a, b);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn missing_source_returns_none() {
        let (db, _dir) = setup_db().await;
        assert!(source_by_id(&db, 999).await.unwrap().is_none());
        db.close().await.unwrap();
    }
}
