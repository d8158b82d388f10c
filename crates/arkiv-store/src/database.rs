// SPDX-FileCopyrightText: 2026 Arkiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread; within one process the `Database` struct IS the single writer.
//! Worker processes open their own `Database` on the shared file — cross-
//! process atomicity comes from SQLite transactions plus the conditional
//! updates in the job queries, not from this wrapper.

use arkiv_core::ArkivError;
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::migrations;

/// Handle to the WAL-mode SQLite metadata store.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (creating if necessary) the database at `path` and run migrations.
    pub async fn open(path: &str) -> Result<Self, ArkivError> {
        if let Some(parent) = std::path::Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| ArkivError::archive_io("creating database directory", e))?;
        }

        let conn = Connection::open(path).await.map_err(|e| ArkivError::Store {
            source: Box::new(e),
        })?;

        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode=WAL;
                 PRAGMA synchronous=NORMAL;
                 PRAGMA foreign_keys=ON;
                 PRAGMA busy_timeout=5000;",
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(|conn| migrations::run_migrations(conn))
            .await
            .map_err(|e| match e {
                tokio_rusqlite::Error::Error(e) => e,
                other => ArkivError::Store {
                    source: Box::new(other),
                },
            })?;

        debug!(path, "database opened");
        Ok(Self { conn })
    }

    /// The underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(&self) -> Result<(), ArkivError> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

/// Map a tokio-rusqlite error into the domain error type.
pub(crate) fn map_tr_err(err: tokio_rusqlite::Error<rusqlite::Error>) -> ArkivError {
    ArkivError::Store {
        source: Box::new(err),
    }
}
