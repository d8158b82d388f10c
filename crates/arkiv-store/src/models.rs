// SPDX-FileCopyrightText: 2026 Arkiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types returned by the typed query modules.
//!
//! Timestamps are stored and surfaced as ISO-8601 UTC strings with
//! millisecond precision, matching what SQLite's `strftime` writes.

use arkiv_core::{FileStatus, JobStatus, SourceKind};

/// A forward origin row.
#[derive(Debug, Clone)]
pub struct SourceRow {
    pub id: i64,
    pub kind: SourceKind,
    pub chat_id: i64,
    pub title: Option<String>,
    pub username: Option<String>,
}

/// An ingested message row.
#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: i64,
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

/// A deduplicated file entity row.
#[derive(Debug, Clone)]
pub struct FileRow {
    pub id: i64,
    pub content_id: String,
    pub handle: Option<String>,
    pub declared_size: Option<i64>,
    pub mime_type: Option<String>,
    pub original_name: Option<String>,
    pub local_path: Option<String>,
    pub local_size: Option<i64>,
    pub sha256: Option<String>,
    pub status: FileStatus,
}

/// A download job row as returned by `claim_next`.
#[derive(Debug, Clone)]
pub struct JobRow {
    pub id: i64,
    pub file_id: i64,
    pub message_id: i64,
    pub status: JobStatus,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub next_attempt_at: String,
    pub locked_by: Option<String>,
    pub locked_at: Option<String>,
    pub created_at: String,
}

/// Result of inserting a message: created, or already ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageInsert {
    Created(i64),
    Duplicate,
}

/// Result of trying to enqueue a job for a file.
///
/// `AlreadyActive` means another job for the same file is QUEUED, RUNNING
/// or RETRY — the partial unique index rejected the insert, which is the
/// intended mutual-exclusion behavior, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobInsert {
    Created(i64),
    AlreadyActive,
}
