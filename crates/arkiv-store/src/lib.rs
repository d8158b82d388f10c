// SPDX-FileCopyrightText: 2026 Arkiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Arkiv attachment archiver.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and typed operations for sources,
//! messages, files, the durable job queue, and failure statistics.
//!
//! The store is the sole arbiter of job claims: every mutating operation is
//! a single transaction, and the job queries use conditional updates so that
//! multiple worker processes sharing the database file need no further
//! coordination.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use database::Database;
pub use models::*;
