// SPDX-FileCopyrightText: 2026 Arkiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only monthly audit journal.
//!
//! One markdown file per calendar month of the originating message's
//! received time. Ingestions append a `##` block; job completions and
//! terminal failures later append `###` blocks into the same month, so the
//! full story of an attachment reads in one file.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use arkiv_core::{ArkivError, AttachmentKind, FailureKind, SourceRef};
use chrono::Utc;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Writer for the monthly markdown journal under a fixed root.
pub struct Journal {
    root: PathBuf,
}

/// Per-attachment outcome shown on a message block line.
#[derive(Debug, Clone)]
pub enum AttachmentStatus {
    Downloaded { path: String },
    /// Queued now, or already queued by an earlier sighting (no job id).
    Queued { job_id: Option<i64> },
    Duplicate { path: Option<String> },
    Failed,
    New,
}

/// One `- file:` line of a message block.
#[derive(Debug, Clone)]
pub struct AttachmentLine {
    pub kind: AttachmentKind,
    pub name: String,
    pub size: i64,
    pub content_id: String,
    pub status: AttachmentStatus,
}

/// A `##` message ingestion block.
#[derive(Debug, Clone)]
pub struct MessageEntry {
    pub message_id: i64,
    pub chat_id: i64,
    pub tg_message_id: i64,
    pub received_at: String,
    pub forwarded_at: Option<String>,
    pub source: SourceRef,
    pub text: Option<String>,
    pub attachments: Vec<AttachmentLine>,
}

/// A `### COMPLETE` job completion block.
#[derive(Debug, Clone)]
pub struct CompletionEntry {
    pub job_id: i64,
    pub message_id: i64,
    pub content_id: String,
    pub local_path: String,
    pub local_size: i64,
    pub sha256: Option<String>,
    pub method: &'static str,
    pub received_at: String,
}

/// A `### FAILED` terminal failure block.
#[derive(Debug, Clone)]
pub struct FailureEntry {
    pub job_id: i64,
    pub message_id: i64,
    pub content_id: String,
    pub kind: FailureKind,
    pub primary_error: Option<String>,
    pub secondary_error: Option<String>,
    pub received_at: String,
}

impl Journal {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The month file an ISO timestamp belongs to (`YYYY-MM.md`).
    fn month_path(&self, received_at: &str) -> Result<PathBuf, ArkivError> {
        let month = received_at.get(..7).ok_or_else(|| {
            ArkivError::Internal(format!("malformed timestamp for journal: {received_at}"))
        })?;
        Ok(self.root.join(format!("{month}.md")))
    }

    async fn append(&self, path: &Path, block: &str) -> Result<(), ArkivError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ArkivError::archive_io("creating journal directory", e))?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| ArkivError::archive_io("opening journal file", e))?;
        file.write_all(block.as_bytes())
            .await
            .map_err(|e| ArkivError::archive_io("appending journal block", e))?;
        debug!(path = %path.display(), "journal block appended");
        Ok(())
    }

    /// Append a message ingestion block.
    pub async fn append_message(&self, entry: &MessageEntry) -> Result<(), ArkivError> {
        let path = self.month_path(&entry.received_at)?;

        let mut block = String::new();
        let _ = writeln!(
            block,
            "\n## {} msg:{} tg:{}/{}",
            entry.received_at, entry.message_id, entry.chat_id, entry.tg_message_id
        );

        let _ = write!(block, "source: {} {}", entry.source.kind, entry.source.chat_id);
        if let Some(title) = &entry.source.title {
            let _ = write!(block, " \"{title}\"");
        }
        block.push('\n');

        if let Some(forwarded_at) = &entry.forwarded_at {
            let _ = writeln!(block, "forwarded_at: {forwarded_at}");
        }
        if let Some(text) = &entry.text {
            let _ = writeln!(block, "text: {text}");
        }

        if !entry.attachments.is_empty() {
            block.push_str("\nattachments:\n");
            for att in &entry.attachments {
                let _ = write!(
                    block,
                    "- file: {} name=\"{}\" size={} unique_id={}",
                    att.kind, att.name, att.size, att.content_id
                );
                match &att.status {
                    AttachmentStatus::Downloaded { path } => {
                        let _ = write!(block, " status=DOWNLOADED path={path}");
                    }
                    AttachmentStatus::Queued { job_id: Some(job_id) } => {
                        let _ = write!(block, " status=QUEUED job:{job_id}");
                    }
                    AttachmentStatus::Queued { job_id: None } => {
                        let _ = write!(block, " status=QUEUED");
                    }
                    AttachmentStatus::Duplicate { path: Some(path) } => {
                        let _ = write!(block, " status=DUPLICATE path={path}");
                    }
                    AttachmentStatus::Duplicate { path: None } => {
                        let _ = write!(block, " status=DUPLICATE");
                    }
                    AttachmentStatus::Failed => {
                        let _ = write!(block, " status=FAILED");
                    }
                    AttachmentStatus::New => {
                        let _ = write!(block, " status=NEW");
                    }
                }
                block.push('\n');
            }
        }
        block.push('\n');

        self.append(&path, &block).await
    }

    /// Append a job completion block into the originating message's month.
    pub async fn append_completion(&self, entry: &CompletionEntry) -> Result<(), ArkivError> {
        let path = self.month_path(&entry.received_at)?;
        let now = Utc::now().format("%Y-%m-%d %H:%M:%SZ");

        let mut block = String::new();
        let _ = writeln!(
            block,
            "\n### COMPLETE {now} job:{} msg:{} file:{}",
            entry.job_id, entry.message_id, entry.content_id
        );
        let _ = write!(
            block,
            "- status=DOWNLOADED path={} size={} method={}",
            entry.local_path, entry.local_size, entry.method
        );
        if let Some(sha256) = &entry.sha256 {
            let _ = write!(block, " sha256={sha256}");
        }
        block.push_str("\n\n");

        self.append(&path, &block).await
    }

    /// Append a terminal failure block into the originating message's month.
    pub async fn append_failure(&self, entry: &FailureEntry) -> Result<(), ArkivError> {
        let path = self.month_path(&entry.received_at)?;
        let now = Utc::now().format("%Y-%m-%d %H:%M:%SZ");

        let mut block = String::new();
        let _ = writeln!(
            block,
            "\n### FAILED {now} job:{} msg:{} file:{}",
            entry.job_id, entry.message_id, entry.content_id
        );
        let _ = writeln!(block, "- kind={}", entry.kind);
        if let Some(err) = &entry.primary_error {
            let _ = writeln!(block, "- primary_error: {err}");
        }
        if let Some(err) = &entry.secondary_error {
            let _ = writeln!(block, "- secondary_error: {err}");
        }
        block.push('\n');

        self.append(&path, &block).await
    }
}
