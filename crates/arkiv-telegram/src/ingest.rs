// SPDX-FileCopyrightText: 2026 Arkiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The ingestion dispatcher.
//!
//! One envelope in, one message row, one journal block out. Small
//! attachments download right here, bounded by a semaphore; everything
//! else becomes a durable job for the worker loop. Duplicate messages and
//! already-archived files are detected against the store, never the
//! filesystem alone.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arkiv_config::StorageMode;
use arkiv_core::{ArkivError, AttachmentInfo, FailureKind, FileStatus, IncomingEnvelope, SourceRef};
use arkiv_fetch::{DownloadOutcome, FetchPlan, PrimaryFetch, TdlRunner, build_message_url, run_chain};
use arkiv_archive::journal::{AttachmentLine, AttachmentStatus, Journal, MessageEntry};
use arkiv_archive::{WebdavClient, layout, verify, webdav};
use arkiv_store::Database;
use arkiv_store::models::{FileRow, JobInsert, MessageInsert};
use arkiv_store::queries::{failures, files, jobs, messages, sources};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::envelope::iso_millis;

/// Tunables lifted from `[telegram]`, `[worker]` and `[storage]` config.
#[derive(Debug, Clone)]
pub struct IngestSettings {
    pub archive_root: PathBuf,
    pub mode: StorageMode,
    /// Attachments declared smaller than this download inline.
    pub small_file_threshold: i64,
    pub max_concurrent_downloads: usize,
    /// Sender allowlist. Empty accepts every sender.
    pub allowed_users: Vec<i64>,
}

/// Ingestion pipeline shared by every message the bot receives.
pub struct IngestDispatcher {
    db: Database,
    journal: Journal,
    primary: Arc<dyn PrimaryFetch>,
    tdl: TdlRunner,
    webdav: Option<WebdavClient>,
    settings: IngestSettings,
    downloads: Semaphore,
}

impl IngestDispatcher {
    pub fn new(
        db: Database,
        journal: Journal,
        primary: Arc<dyn PrimaryFetch>,
        tdl: TdlRunner,
        webdav: Option<WebdavClient>,
        settings: IngestSettings,
    ) -> Self {
        let downloads = Semaphore::new(settings.max_concurrent_downloads.max(1));
        Self {
            db,
            journal,
            primary,
            tdl,
            webdav,
            settings,
            downloads,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Ingest one decoded envelope end to end.
    pub async fn ingest(&self, envelope: IncomingEnvelope) -> Result<(), ArkivError> {
        if !self.sender_allowed(&envelope) {
            warn!(
                chat_id = envelope.chat_id,
                sender_id = ?envelope.sender_id,
                "dropping message from sender outside the allowlist"
            );
            return Ok(());
        }

        let source = envelope.origin.derive_source();
        let source_id = if source.chat_id != 0 {
            Some(sources::upsert_source(&self.db, &source).await?)
        } else {
            None
        };

        let received_at = iso_millis(envelope.received_at);
        let forwarded_at = envelope.forwarded_at.map(iso_millis);
        let inserted = messages::insert_message(
            &self.db,
            &messages::NewMessage {
                chat_id: envelope.chat_id,
                message_id: envelope.message_id,
                original_message_id: envelope.original_message_id,
                sender_id: envelope.sender_id,
                received_at: received_at.clone(),
                forwarded_at: forwarded_at.clone(),
                source_id,
                text: envelope.text.clone(),
                raw_json: envelope.raw_json.clone(),
            },
        )
        .await?;
        let message_row_id = match inserted {
            MessageInsert::Created(id) => id,
            MessageInsert::Duplicate => {
                info!(
                    chat_id = envelope.chat_id,
                    message_id = envelope.message_id,
                    "message already ingested, skipping"
                );
                return Ok(());
            }
        };

        let mut lines = Vec::with_capacity(envelope.attachments.len());
        for att in &envelope.attachments {
            let status = self
                .ingest_attachment(&envelope, &source, message_row_id, att)
                .await?;
            lines.push(AttachmentLine {
                kind: att.kind,
                name: att
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("{}.bin", att.content_id)),
                size: att.declared_size.unwrap_or(0),
                content_id: att.content_id.clone(),
                status,
            });
        }

        let entry = MessageEntry {
            message_id: message_row_id,
            chat_id: envelope.chat_id,
            tg_message_id: envelope.message_id,
            received_at,
            forwarded_at,
            source,
            text: envelope.text.clone(),
            attachments: lines,
        };
        if let Err(e) = self.journal.append_message(&entry).await {
            warn!(message_id = message_row_id, error = %e, "journal message append failed");
        }

        info!(
            message_id = message_row_id,
            attachments = envelope.attachments.len(),
            "message ingested"
        );
        Ok(())
    }

    fn sender_allowed(&self, envelope: &IncomingEnvelope) -> bool {
        if self.settings.allowed_users.is_empty() {
            return true;
        }
        envelope
            .sender_id
            .is_some_and(|id| self.settings.allowed_users.contains(&id))
    }

    /// Persist one attachment and decide its immediate fate.
    async fn ingest_attachment(
        &self,
        envelope: &IncomingEnvelope,
        source: &SourceRef,
        message_row_id: i64,
        att: &AttachmentInfo,
    ) -> Result<AttachmentStatus, ArkivError> {
        let file_id = files::upsert_file(
            &self.db,
            &att.content_id,
            &att.handle,
            att.declared_size,
            att.mime_type.clone(),
            att.name.clone(),
        )
        .await?;
        messages::link_message_file(&self.db, message_row_id, file_id, att.kind, envelope.text.clone())
            .await?;

        let file = files::file_by_id(&self.db, file_id)
            .await?
            .ok_or_else(|| ArkivError::Internal(format!("file {file_id} vanished after upsert")))?;

        // Content seen and archived before: nothing to download.
        if file.status == FileStatus::Downloaded
            && let Some(path) = &file.local_path
            && verify::verify_size(Path::new(path), file.declared_size)
                .await
                .is_ok()
        {
            info!(content_id = %file.content_id, "duplicate content, already archived");
            return Ok(AttachmentStatus::Duplicate {
                path: Some(path.clone()),
            });
        }

        let small = att
            .declared_size
            .is_some_and(|size| size < self.settings.small_file_threshold);
        if small {
            return self.download_inline(envelope, source, &file).await;
        }

        match jobs::try_enqueue(&self.db, file_id, message_row_id).await? {
            JobInsert::Created(job_id) => {
                info!(job_id, content_id = %file.content_id, "job enqueued");
                Ok(AttachmentStatus::Queued {
                    job_id: Some(job_id),
                })
            }
            JobInsert::AlreadyActive => {
                info!(content_id = %file.content_id, "download already in flight");
                Ok(AttachmentStatus::Queued { job_id: None })
            }
        }
    }

    /// Download a small attachment now, under the concurrency bound, and
    /// record the outcome immediately. No job row is involved.
    async fn download_inline(
        &self,
        envelope: &IncomingEnvelope,
        source: &SourceRef,
        file: &FileRow,
    ) -> Result<AttachmentStatus, ArkivError> {
        let _permit = self
            .downloads
            .acquire()
            .await
            .map_err(|_| ArkivError::Internal("download semaphore closed".into()))?;

        let (_, target) = layout::archive_path(
            &self.settings.archive_root,
            source.kind,
            source.chat_id,
            source.title.as_deref(),
            &file.content_id,
            file.original_name.as_deref(),
        );
        let message_url = build_message_url(
            source.username.as_deref(),
            (source.chat_id != 0).then_some(source.chat_id),
            envelope.original_message_id,
        );

        let outcome = run_chain(
            self.primary.as_ref(),
            &self.tdl,
            FetchPlan {
                handle: file.handle.as_deref(),
                declared_size: file.declared_size,
                message_url,
                target: &target,
            },
        )
        .await;

        let (kind, primary_error, secondary_error) = match outcome {
            DownloadOutcome::Success { .. } => {
                match self.settle_inline_success(file, &target).await {
                    Ok(path) => return Ok(AttachmentStatus::Downloaded { path }),
                    // Post-transfer verification failures get the same
                    // terminal treatment as a failed chain.
                    Err(e) => (
                        FailureKind::PrimaryFailedSecondarySkipped,
                        Some(e.to_string()),
                        None,
                    ),
                }
            }
            DownloadOutcome::Failure {
                kind,
                primary_error,
                secondary_error,
            } => (kind, primary_error, secondary_error),
        };

        warn!(content_id = %file.content_id, %kind, "inline download failed");
        files::mark_failed(&self.db, file.id).await?;
        failures::record_failure(
            &self.db,
            &failures::NewFailure {
                file_id: file.id,
                content_id: file.content_id.clone(),
                source_kind: Some(source.kind),
                chat_id: Some(source.chat_id),
                original_name: file.original_name.clone(),
                kind,
                primary_error,
                secondary_error,
            },
        )
        .await?;
        Ok(AttachmentStatus::Failed)
    }

    async fn settle_inline_success(
        &self,
        file: &FileRow,
        target: &Path,
    ) -> Result<String, ArkivError> {
        let actual_size = verify::verify_size(target, file.declared_size).await?;
        let sha256 = verify::sha256_file(target).await?;
        let target_str = target.to_string_lossy().into_owned();
        files::mark_downloaded(&self.db, file.id, &target_str, actual_size, Some(sha256)).await?;
        self.mirror_if_configured(target).await;
        info!(content_id = %file.content_id, path = %target_str, "inline download complete");
        Ok(target_str)
    }

    /// Mirror to WebDAV when configured; never fails the ingestion.
    async fn mirror_if_configured(&self, target: &Path) {
        if !self.settings.mode.saves_webdav() {
            return;
        }
        let Some(client) = &self.webdav else {
            warn!("storage mode requests WebDAV but no client is configured");
            return;
        };
        let remote = webdav::remote_path(&self.settings.archive_root, target);
        match client.mirror(target, &remote).await {
            Ok(()) => {
                if !self.settings.mode.saves_local()
                    && let Err(e) = tokio::fs::remove_file(target).await
                {
                    warn!(path = %target.display(), error = %e, "failed to remove local copy after mirror");
                }
            }
            Err(e) => {
                warn!(remote, error = %e, "WebDAV mirror failed, keeping local copy");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arkiv_core::{ArkivError, AttachmentKind, ForwardOrigin, JobStatus};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    struct StubPrimary {
        payload: Result<Vec<u8>, String>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PrimaryFetch for StubPrimary {
        async fn fetch(&self, _handle: &str, target: &Path) -> Result<(), ArkivError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.payload {
                Ok(bytes) => {
                    if let Some(parent) = target.parent() {
                        tokio::fs::create_dir_all(parent)
                            .await
                            .map_err(|e| ArkivError::archive_io("mkdir", e))?;
                    }
                    tokio::fs::write(target, bytes)
                        .await
                        .map_err(|e| ArkivError::archive_io("write", e))?;
                    Ok(())
                }
                Err(message) => Err(ArkivError::Fetch {
                    message: message.clone(),
                }),
            }
        }
    }

    struct Harness {
        dispatcher: IngestDispatcher,
        primary: Arc<StubPrimary>,
        dir: tempfile::TempDir,
    }

    async fn harness(payload: Result<Vec<u8>, String>, allowed_users: Vec<i64>) -> Harness {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("ingest.db").to_str().unwrap())
            .await
            .unwrap();
        let primary = Arc::new(StubPrimary {
            payload,
            calls: AtomicUsize::new(0),
        });
        let settings = IngestSettings {
            archive_root: dir.path().join("files"),
            mode: StorageMode::Local,
            small_file_threshold: 1024,
            max_concurrent_downloads: 2,
            allowed_users,
        };
        let dispatcher = IngestDispatcher::new(
            db,
            Journal::new(dir.path().join("journal")),
            primary.clone(),
            TdlRunner::with_program("/nonexistent/tdl"),
            None,
            settings,
        );
        Harness {
            dispatcher,
            primary,
            dir,
        }
    }

    fn envelope(message_id: i64, attachments: Vec<AttachmentInfo>) -> IncomingEnvelope {
        IncomingEnvelope {
            chat_id: 42,
            message_id,
            original_message_id: None,
            sender_id: Some(1),
            received_at: Utc.with_ymd_and_hms(2026, 5, 2, 10, 0, 0).unwrap(),
            forwarded_at: None,
            origin: ForwardOrigin::None,
            text: Some("payload".into()),
            raw_json: "{}".into(),
            attachments,
        }
    }

    fn attachment(content_id: &str, declared_size: i64) -> AttachmentInfo {
        AttachmentInfo {
            kind: AttachmentKind::Document,
            content_id: content_id.into(),
            handle: format!("handle-{content_id}"),
            declared_size: Some(declared_size),
            mime_type: Some("application/pdf".into()),
            name: Some("doc.pdf".into()),
        }
    }

    async fn job_count(db: &Database) -> i64 {
        db.connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT COUNT(*) FROM jobs", [], |row| row.get(0))
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn small_attachment_downloads_inline_without_a_job() {
        let h = harness(Ok(b"tiny".to_vec()), vec![]).await;

        h.dispatcher
            .ingest(envelope(10, vec![attachment("SMALL", 4)]))
            .await
            .unwrap();

        assert_eq!(h.primary.calls.load(Ordering::SeqCst), 1);
        assert_eq!(job_count(h.dispatcher.database()).await, 0);

        let file = files::file_by_content_id(h.dispatcher.database(), "SMALL")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(file.status, FileStatus::Downloaded);
        assert_eq!(file.local_size, Some(4));
        assert!(file.sha256.is_some());

        let journal = tokio::fs::read_to_string(h.dir.path().join("journal/2026-05.md"))
            .await
            .unwrap();
        assert!(journal.contains("status=DOWNLOADED"));
    }

    #[tokio::test]
    async fn large_attachment_is_queued_for_the_worker() {
        let h = harness(Ok(b"never used".to_vec()), vec![]).await;

        h.dispatcher
            .ingest(envelope(11, vec![attachment("LARGE", 5_000)]))
            .await
            .unwrap();

        assert_eq!(h.primary.calls.load(Ordering::SeqCst), 0, "no inline download");
        assert_eq!(job_count(h.dispatcher.database()).await, 1);

        let job = jobs::claim_next(h.dispatcher.database(), "probe")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(job.status, JobStatus::Running);

        let journal = tokio::fs::read_to_string(h.dir.path().join("journal/2026-05.md"))
            .await
            .unwrap();
        assert!(journal.contains("status=QUEUED job:1"));
    }

    #[tokio::test]
    async fn duplicate_message_is_ignored_entirely() {
        let h = harness(Ok(b"never used".to_vec()), vec![]).await;

        h.dispatcher
            .ingest(envelope(12, vec![attachment("DUP", 5_000)]))
            .await
            .unwrap();
        h.dispatcher
            .ingest(envelope(12, vec![attachment("DUP", 5_000)]))
            .await
            .unwrap();

        assert_eq!(job_count(h.dispatcher.database()).await, 1, "no second job");
        let messages: i64 = h
            .dispatcher
            .database()
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))
            })
            .await
            .unwrap();
        assert_eq!(messages, 1);
    }

    #[tokio::test]
    async fn resent_content_in_a_new_message_does_not_enqueue() {
        let h = harness(Ok(b"1234".to_vec()), vec![]).await;

        h.dispatcher
            .ingest(envelope(13, vec![attachment("SAME", 4)]))
            .await
            .unwrap();
        assert_eq!(h.primary.calls.load(Ordering::SeqCst), 1);

        // Same content arrives in a different message.
        h.dispatcher
            .ingest(envelope(14, vec![attachment("SAME", 4)]))
            .await
            .unwrap();

        assert_eq!(h.primary.calls.load(Ordering::SeqCst), 1, "no re-download");
        assert_eq!(job_count(h.dispatcher.database()).await, 0);

        let journal = tokio::fs::read_to_string(h.dir.path().join("journal/2026-05.md"))
            .await
            .unwrap();
        assert!(journal.contains("status=DUPLICATE"));
    }

    #[tokio::test]
    async fn inline_failure_is_recorded_immediately() {
        let h = harness(Err("403 Forbidden".into()), vec![]).await;

        h.dispatcher
            .ingest(envelope(15, vec![attachment("BROKEN", 4)]))
            .await
            .unwrap();

        let file = files::file_by_content_id(h.dispatcher.database(), "BROKEN")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(file.status, FileStatus::Failed);
        assert_eq!(job_count(h.dispatcher.database()).await, 0);

        let stats = failures::failure_stats(h.dispatcher.database(), None)
            .await
            .unwrap();
        assert_eq!(stats.len(), 1);
        // No origin means no message URL, so the secondary never ran.
        assert_eq!(stats[0].0, FailureKind::PrimaryFailedSecondarySkipped);

        let journal = tokio::fs::read_to_string(h.dir.path().join("journal/2026-05.md"))
            .await
            .unwrap();
        assert!(journal.contains("status=FAILED"));
    }

    #[tokio::test]
    async fn sender_outside_allowlist_is_dropped() {
        let h = harness(Ok(b"tiny".to_vec()), vec![99]).await;

        h.dispatcher
            .ingest(envelope(16, vec![attachment("NOPE", 4)]))
            .await
            .unwrap();

        let messages: i64 = h
            .dispatcher
            .database()
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))
            })
            .await
            .unwrap();
        assert_eq!(messages, 0);
        assert_eq!(h.primary.calls.load(Ordering::SeqCst), 0);
    }
}
