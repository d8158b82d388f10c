// SPDX-FileCopyrightText: 2026 Arkiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The worker loop: claim, download, verify, settle.
//!
//! Every per-job error is folded into exactly one of three settlements —
//! DONE, RETRY with backoff, or terminal FAILED — at the loop boundary.
//! Only the claim/settle store operations themselves can surface an error,
//! and those are logged and absorbed by the poll sleep.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arkiv_config::StorageMode;
use arkiv_core::{ArkivError, FailureKind, FileStatus, SourceKind, SourceRef};
use arkiv_fetch::{
    DownloadMethod, DownloadOutcome, FetchPlan, PrimaryFetch, TdlRunner, build_message_url,
    run_chain,
};
use arkiv_store::models::{FileRow, JobRow, MessageRow};
use arkiv_store::queries::{failures, files, jobs, messages, sources};
use arkiv_store::Database;
use arkiv_archive::journal::{CompletionEntry, FailureEntry, Journal};
use arkiv_archive::{layout, verify, webdav, WebdavClient};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::backoff::backoff_secs;
use crate::throttle::LogThrottle;

/// Repeated claim failures (store unreachable) log at most this often.
const CLAIM_ERROR_LOG_INTERVAL: Duration = Duration::from_secs(60);

/// Tunables lifted from `[worker]` and `[storage]` config.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub archive_root: PathBuf,
    pub mode: StorageMode,
    pub max_attempts: i64,
    pub stale_after_minutes: i64,
    pub poll_interval: Duration,
}

/// One worker process. Several may share the same database file; the store's
/// conditional claim update keeps them from stepping on each other.
pub struct Worker {
    db: Database,
    primary: Arc<dyn PrimaryFetch>,
    tdl: TdlRunner,
    journal: Journal,
    webdav: Option<WebdavClient>,
    settings: WorkerSettings,
    worker_id: String,
    claim_error_log: LogThrottle,
}

/// How a single job attempt ended, before settlement.
enum AttemptError {
    Download {
        kind: FailureKind,
        primary_error: Option<String>,
        secondary_error: Option<String>,
    },
    Other(String),
}

impl AttemptError {
    fn other(message: impl Into<String>) -> Self {
        AttemptError::Other(message.into())
    }

    fn summary(&self) -> String {
        match self {
            AttemptError::Download {
                kind,
                primary_error,
                secondary_error,
            } => {
                let mut parts = vec![kind.to_string()];
                if let Some(e) = primary_error {
                    parts.push(format!("primary: {e}"));
                }
                if let Some(e) = secondary_error {
                    parts.push(format!("secondary: {e}"));
                }
                parts.join("; ")
            }
            AttemptError::Other(message) => message.clone(),
        }
    }
}

impl Worker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: Database,
        primary: Arc<dyn PrimaryFetch>,
        tdl: TdlRunner,
        journal: Journal,
        webdav: Option<WebdavClient>,
        settings: WorkerSettings,
        worker_id: String,
    ) -> Self {
        Self {
            db,
            primary,
            tdl,
            journal,
            webdav,
            settings,
            worker_id,
            claim_error_log: LogThrottle::new(CLAIM_ERROR_LOG_INTERVAL),
        }
    }

    /// Run until the token is cancelled. Stale jobs left behind by a crashed
    /// worker are repaired once at startup.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), ArkivError> {
        info!(worker_id = %self.worker_id, "worker starting");

        let recovered = jobs::recover_stale(&self.db, self.settings.stale_after_minutes).await?;
        if recovered > 0 {
            info!(recovered, "recovered stale jobs at startup");
        }

        loop {
            if shutdown.is_cancelled() {
                break;
            }
            match jobs::claim_next(&self.db, &self.worker_id).await {
                Ok(Some(job)) => {
                    let job_id = job.id;
                    if let Err(e) = self.process_job(job).await {
                        // Settlement itself failed; the job stays RUNNING and
                        // will come back through stale recovery.
                        error!(job_id, error = %e, "job settlement failed");
                    }
                }
                Ok(None) => {
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(self.settings.poll_interval) => {}
                    }
                }
                Err(e) => {
                    if self.claim_error_log.permit() {
                        error!(error = %e, "claim failed");
                    }
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(self.settings.poll_interval) => {}
                    }
                }
            }
        }

        info!(worker_id = %self.worker_id, "worker stopped");
        Ok(())
    }

    /// Process one claimed job end to end, settling it in the store.
    pub async fn process_job(&self, job: JobRow) -> Result<(), ArkivError> {
        info!(job_id = job.id, attempts = job.attempts, "processing job");
        match self.attempt(&job).await {
            Ok(()) => Ok(()),
            Err(failure) => self.settle_failure(&job, failure).await,
        }
    }

    async fn attempt(&self, job: &JobRow) -> Result<(), AttemptError> {
        let file = files::file_by_id(&self.db, job.file_id)
            .await
            .map_err(|e| AttemptError::other(e.to_string()))?
            .ok_or_else(|| AttemptError::other(format!("file {} not found", job.file_id)))?;

        // A previous worker may have finished this file already.
        if file.status == FileStatus::Downloaded
            && let Some(path) = &file.local_path
            && verify::verify_size(Path::new(path), file.declared_size)
                .await
                .is_ok()
        {
            info!(job_id = job.id, content_id = %file.content_id, "already downloaded, completing");
            jobs::complete(&self.db, job.id)
                .await
                .map_err(|e| AttemptError::other(e.to_string()))?;
            return Ok(());
        }

        let message = messages::message_by_id(&self.db, job.message_id)
            .await
            .map_err(|e| AttemptError::other(e.to_string()))?
            .ok_or_else(|| AttemptError::other(format!("message {} not found", job.message_id)))?;

        let source = match message.source_id {
            Some(source_id) => sources::source_by_id(&self.db, source_id)
                .await
                .map_err(|e| AttemptError::other(e.to_string()))?
                .map(|row| SourceRef {
                    kind: row.kind,
                    chat_id: row.chat_id,
                    title: row.title,
                    username: row.username,
                }),
            None => None,
        }
        .unwrap_or_else(SourceRef::unknown);

        let (_, target) = layout::archive_path(
            &self.settings.archive_root,
            source.kind,
            source.chat_id,
            source.title.as_deref(),
            &file.content_id,
            file.original_name.as_deref(),
        );
        info!(job_id = job.id, target = %target.display(), "downloading");

        let message_url = build_message_url(
            source.username.as_deref(),
            (source.chat_id != 0).then_some(source.chat_id),
            message.original_message_id,
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

        match outcome {
            DownloadOutcome::Success { method } => {
                self.finish_success(job, &file, &message, &target, method).await
            }
            DownloadOutcome::Failure {
                kind,
                primary_error,
                secondary_error,
            } => Err(AttemptError::Download {
                kind,
                primary_error,
                secondary_error,
            }),
        }
    }

    async fn finish_success(
        &self,
        job: &JobRow,
        file: &FileRow,
        message: &MessageRow,
        target: &Path,
        method: DownloadMethod,
    ) -> Result<(), AttemptError> {
        // Transfer success is not enough; the artifact must check out.
        let actual_size = verify::verify_size(target, file.declared_size)
            .await
            .map_err(|e| AttemptError::other(e.to_string()))?;
        let sha256 = verify::sha256_file(target)
            .await
            .map_err(|e| AttemptError::other(e.to_string()))?;

        let target_str = target.to_string_lossy().into_owned();
        files::mark_downloaded(&self.db, file.id, &target_str, actual_size, Some(sha256.clone()))
            .await
            .map_err(|e| AttemptError::other(e.to_string()))?;
        jobs::complete(&self.db, job.id)
            .await
            .map_err(|e| AttemptError::other(e.to_string()))?;

        let method_label: &'static str = match method {
            DownloadMethod::Primary => "primary",
            DownloadMethod::Secondary => "secondary",
        };
        if let Err(e) = self
            .journal
            .append_completion(&CompletionEntry {
                job_id: job.id,
                message_id: job.message_id,
                content_id: file.content_id.clone(),
                local_path: target_str,
                local_size: actual_size,
                sha256: Some(sha256),
                method: method_label,
                received_at: message.received_at.clone(),
            })
            .await
        {
            warn!(job_id = job.id, error = %e, "journal completion append failed");
        }

        self.mirror_if_configured(target).await;

        info!(job_id = job.id, "job complete");
        Ok(())
    }

    /// Mirror to WebDAV when configured. Mirror problems never affect the
    /// job outcome; the local artifact is already settled.
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
                if !self.settings.mode.saves_local() {
                    if let Err(e) = tokio::fs::remove_file(target).await {
                        warn!(path = %target.display(), error = %e, "failed to remove local copy after mirror");
                    }
                }
            }
            Err(e) => {
                warn!(remote, error = %e, "WebDAV mirror failed, keeping local copy");
            }
        }
    }

    async fn settle_failure(&self, job: &JobRow, failure: AttemptError) -> Result<(), ArkivError> {
        let summary = failure.summary();
        if job.attempts < self.settings.max_attempts {
            let delay = backoff_secs(job.attempts);
            warn!(job_id = job.id, attempts = job.attempts, delay, error = %summary, "job will retry");
            return jobs::reschedule(&self.db, job.id, &summary, delay).await;
        }

        error!(job_id = job.id, attempts = job.attempts, error = %summary, "job permanently failed");
        jobs::fail(&self.db, job.id, &summary).await?;
        files::mark_failed(&self.db, job.file_id).await?;

        let (kind, primary_error, secondary_error) = match failure {
            AttemptError::Download {
                kind,
                primary_error,
                secondary_error,
            } => (kind, primary_error, secondary_error),
            // Non-chain errors (lookups, verification) are attributed to the
            // primary stage for classification purposes.
            AttemptError::Other(message) => (
                FailureKind::PrimaryFailedSecondarySkipped,
                Some(message),
                None,
            ),
        };

        let file = files::file_by_id(&self.db, job.file_id).await?;
        let message = messages::message_by_id(&self.db, job.message_id).await?;
        let source = match message.as_ref().and_then(|m| m.source_id) {
            Some(source_id) => sources::source_by_id(&self.db, source_id).await?,
            None => None,
        };

        let content_id = file
            .as_ref()
            .map(|f| f.content_id.clone())
            .unwrap_or_default();
        failures::record_failure(
            &self.db,
            &failures::NewFailure {
                file_id: job.file_id,
                content_id: content_id.clone(),
                source_kind: source.as_ref().map(|s| s.kind).or(Some(SourceKind::Unknown)),
                chat_id: source.as_ref().map(|s| s.chat_id),
                original_name: file.as_ref().and_then(|f| f.original_name.clone()),
                kind,
                primary_error: primary_error.clone(),
                secondary_error: secondary_error.clone(),
            },
        )
        .await?;

        if let Some(message) = &message
            && let Err(e) = self
                .journal
                .append_failure(&FailureEntry {
                    job_id: job.id,
                    message_id: job.message_id,
                    content_id,
                    kind,
                    primary_error,
                    secondary_error,
                    received_at: message.received_at.clone(),
                })
                .await
        {
            warn!(job_id = job.id, error = %e, "journal failure append failed");
        }

        Ok(())
    }
}
