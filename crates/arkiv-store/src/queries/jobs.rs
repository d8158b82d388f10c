// SPDX-FileCopyrightText: 2026 Arkiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable job queue operations.
//!
//! The queue relies on two store-level guarantees:
//!
//! 1. `idx_jobs_one_active_per_file` — at most one job per file in
//!    {QUEUED, RUNNING, RETRY}, enforced by a partial unique index.
//! 2. `claim_next` — a transaction whose UPDATE re-checks eligibility, so
//!    N concurrent claimers (including other processes) get exactly one win.

use arkiv_core::{ArkivError, JobStatus};
use rusqlite::{OptionalExtension, Row, TransactionBehavior, params};
use tracing::debug;

use crate::database::{Database, map_tr_err};
use crate::models::{JobInsert, JobRow};
use crate::queries::parse_enum;

const NOW: &str = "strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";

const JOB_COLUMNS: &str = "id, file_id, message_id, status, attempts, last_error,
                           next_attempt_at, locked_by, locked_at, created_at";

fn row_to_job(row: &Row<'_>) -> Result<JobRow, rusqlite::Error> {
    Ok(JobRow {
        id: row.get(0)?,
        file_id: row.get(1)?,
        message_id: row.get(2)?,
        status: parse_enum(row.get(3)?)?,
        attempts: row.get(4)?,
        last_error: row.get(5)?,
        next_attempt_at: row.get(6)?,
        locked_by: row.get(7)?,
        locked_at: row.get(8)?,
        created_at: row.get(9)?,
    })
}

/// Try to enqueue a download job for a file.
///
/// Returns `AlreadyActive` when the file already has a QUEUED, RUNNING or
/// RETRY job — the partial unique index rejects the insert, which is the
/// intended mutual exclusion, not an error.
pub async fn try_enqueue(
    db: &Database,
    file_id: i64,
    message_id: i64,
) -> Result<JobInsert, ArkivError> {
    db.connection()
        .call(move |conn| {
            let result = conn.execute(
                "INSERT INTO jobs (file_id, message_id, status) VALUES (?1, ?2, 'QUEUED')",
                params![file_id, message_id],
            );
            match result {
                Ok(_) => Ok(JobInsert::Created(conn.last_insert_rowid())),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    Ok(JobInsert::AlreadyActive)
                }
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Claim the next eligible job for `worker_id`.
///
/// Selects the oldest-created job in {QUEUED, RETRY} whose next-attempt time
/// has passed, then transitions it to RUNNING with attempts+1 and the lock
/// holder/time recorded. The UPDATE re-checks eligibility so a claim that
/// raced another process simply returns `None`.
pub async fn claim_next(db: &Database, worker_id: &str) -> Result<Option<JobRow>, ArkivError> {
    let worker_id = worker_id.to_string();
    db.connection()
        .call(move |conn| {
            // Immediate: racing cross-process claimers queue on busy_timeout
            // instead of failing the deferred read-to-write upgrade.
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let candidate: Option<i64> = tx
                .query_row(
                    &format!(
                        "SELECT id FROM jobs
                         WHERE status IN ('QUEUED', 'RETRY') AND next_attempt_at <= {NOW}
                         ORDER BY created_at ASC, id ASC
                         LIMIT 1"
                    ),
                    [],
                    |row| row.get(0),
                )
                .optional()?;

            let Some(id) = candidate else {
                tx.commit()?;
                return Ok(None);
            };

            let changed = tx.execute(
                &format!(
                    "UPDATE jobs
                     SET status = 'RUNNING', attempts = attempts + 1,
                         locked_by = ?1, locked_at = {NOW}
                     WHERE id = ?2
                       AND status IN ('QUEUED', 'RETRY') AND next_attempt_at <= {NOW}"
                ),
                params![worker_id, id],
            )?;

            if changed == 0 {
                // Another claimer won between SELECT and UPDATE.
                tx.commit()?;
                return Ok(None);
            }

            let job = tx.query_row(
                &format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?1"),
                params![id],
                |row| row_to_job(row),
            )?;
            tx.commit()?;
            Ok(Some(job))
        })
        .await
        .map_err(map_tr_err)
}

/// Mark a job DONE and release its lock.
pub async fn complete(db: &Database, id: i64) -> Result<(), ArkivError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                &format!(
                    "UPDATE jobs
                     SET status = 'DONE', locked_by = NULL, locked_at = NULL,
                         completed_at = {NOW}
                     WHERE id = ?1"
                ),
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Put a job back in RETRY, eligible again after `backoff_secs`.
pub async fn reschedule(
    db: &Database,
    id: i64,
    error: &str,
    backoff_secs: i64,
) -> Result<(), ArkivError> {
    let error = error.to_string();
    let delay = format!("+{backoff_secs} seconds");
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE jobs
                 SET status = 'RETRY', last_error = ?1,
                     next_attempt_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?2),
                     locked_by = NULL, locked_at = NULL
                 WHERE id = ?3",
                params![error, delay, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Mark a job FAILED. Terminal.
pub async fn fail(db: &Database, id: i64, error: &str) -> Result<(), ArkivError> {
    let error = error.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                &format!(
                    "UPDATE jobs
                     SET status = 'FAILED', last_error = ?1, locked_by = NULL,
                         locked_at = NULL, completed_at = {NOW}
                     WHERE id = ?2"
                ),
                params![error, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Return RUNNING jobs whose lock is older than `threshold_minutes` to RETRY,
/// eligible immediately. Run once at worker startup to repair locks abandoned
/// by a crashed worker.
pub async fn recover_stale(db: &Database, threshold_minutes: i64) -> Result<u64, ArkivError> {
    let cutoff = format!("-{threshold_minutes} minutes");
    let recovered = db
        .connection()
        .call(move |conn| {
            let changed = conn.execute(
                &format!(
                    "UPDATE jobs
                     SET status = 'RETRY', locked_by = NULL, locked_at = NULL,
                         next_attempt_at = {NOW}
                     WHERE status = 'RUNNING'
                       AND locked_at IS NOT NULL
                       AND locked_at <= strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?1)"
                ),
                params![cutoff],
            )?;
            Ok(changed as u64)
        })
        .await
        .map_err(map_tr_err)?;
    if recovered > 0 {
        debug!(recovered, "recovered stale jobs");
    }
    Ok(recovered)
}

/// Count jobs per status, for operational reporting.
pub async fn status_counts(db: &Database) -> Result<Vec<(JobStatus, i64)>, ArkivError> {
    db.connection()
        .call(|conn| {
            let mut stmt =
                conn.prepare("SELECT status, COUNT(*) FROM jobs GROUP BY status ORDER BY status")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((parse_enum::<JobStatus>(row.get(0)?)?, row.get::<_, i64>(1)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageInsert;
    use crate::queries::{files, messages};
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("jobs_test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    /// Insert a file + message pair and return their ids.
    async fn seed(db: &Database, content_id: &str, message_id: i64) -> (i64, i64) {
        let file_id = files::upsert_file(db, content_id, "handle", Some(1024), None, None)
            .await
            .unwrap();
        let msg = messages::NewMessage {
            chat_id: 1,
            message_id,
            original_message_id: None,
            sender_id: None,
            received_at: "2026-03-01T00:00:00.000Z".into(),
            forwarded_at: None,
            source_id: None,
            text: None,
            raw_json: "{}".into(),
        };
        let MessageInsert::Created(msg_id) = messages::insert_message(db, &msg).await.unwrap()
        else {
            panic!("seed message already present");
        };
        (file_id, msg_id)
    }

    #[tokio::test]
    async fn at_most_one_active_job_per_file() {
        let (db, _dir) = setup_db().await;
        let (file_id, msg_id) = seed(&db, "f1", 1).await;

        let first = try_enqueue(&db, file_id, msg_id).await.unwrap();
        let JobInsert::Created(job_id) = first else {
            panic!("first enqueue must create");
        };

        // QUEUED blocks a second job.
        assert_eq!(
            try_enqueue(&db, file_id, msg_id).await.unwrap(),
            JobInsert::AlreadyActive
        );

        // RUNNING blocks too.
        let claimed = claim_next(&db, "w1").await.unwrap().unwrap();
        assert_eq!(claimed.id, job_id);
        assert_eq!(
            try_enqueue(&db, file_id, msg_id).await.unwrap(),
            JobInsert::AlreadyActive
        );

        // RETRY blocks too.
        reschedule(&db, job_id, "transient", 60).await.unwrap();
        assert_eq!(
            try_enqueue(&db, file_id, msg_id).await.unwrap(),
            JobInsert::AlreadyActive
        );

        // Terminal FAILED frees the slot for a fresh job.
        fail(&db, job_id, "permanent").await.unwrap();
        assert!(matches!(
            try_enqueue(&db, file_id, msg_id).await.unwrap(),
            JobInsert::Created(_)
        ));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn claim_is_fifo_by_creation() {
        let (db, _dir) = setup_db().await;
        let (file_a, msg_a) = seed(&db, "fa", 1).await;
        let (file_b, msg_b) = seed(&db, "fb", 2).await;

        let JobInsert::Created(job_a) = try_enqueue(&db, file_a, msg_a).await.unwrap() else {
            panic!()
        };
        let JobInsert::Created(job_b) = try_enqueue(&db, file_b, msg_b).await.unwrap() else {
            panic!()
        };

        let first = claim_next(&db, "w1").await.unwrap().unwrap();
        let second = claim_next(&db, "w1").await.unwrap().unwrap();
        assert_eq!(first.id, job_a);
        assert_eq!(second.id, job_b);
        assert!(claim_next(&db, "w1").await.unwrap().is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn claim_records_lock_and_increments_attempts() {
        let (db, _dir) = setup_db().await;
        let (file_id, msg_id) = seed(&db, "f1", 1).await;
        let JobInsert::Created(job_id) = try_enqueue(&db, file_id, msg_id).await.unwrap() else {
            panic!()
        };

        let job = claim_next(&db, "worker-77").await.unwrap().unwrap();
        assert_eq!(job.id, job_id);
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.attempts, 1);
        assert_eq!(job.locked_by.as_deref(), Some("worker-77"));
        assert!(job.locked_at.is_some());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn retry_is_not_eligible_until_backoff_elapses() {
        let (db, _dir) = setup_db().await;
        let (file_id, msg_id) = seed(&db, "f1", 1).await;
        let JobInsert::Created(job_id) = try_enqueue(&db, file_id, msg_id).await.unwrap() else {
            panic!()
        };

        let _ = claim_next(&db, "w1").await.unwrap().unwrap();
        reschedule(&db, job_id, "rate limited", 3600).await.unwrap();

        assert!(
            claim_next(&db, "w1").await.unwrap().is_none(),
            "job an hour out must not be claimable"
        );

        // Zero backoff makes it immediately eligible again.
        reschedule(&db, job_id, "rate limited", 0).await.unwrap();
        let job = claim_next(&db, "w1").await.unwrap().unwrap();
        assert_eq!(job.id, job_id);
        assert_eq!(job.attempts, 2);
        assert_eq!(job.last_error.as_deref(), Some("rate limited"));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn stale_running_job_returns_to_retry() {
        let (db, _dir) = setup_db().await;
        let (file_id, msg_id) = seed(&db, "f1", 1).await;
        let JobInsert::Created(job_id) = try_enqueue(&db, file_id, msg_id).await.unwrap() else {
            panic!()
        };
        let _ = claim_next(&db, "w-dead").await.unwrap().unwrap();

        // Fresh lock: not stale.
        assert_eq!(recover_stale(&db, 30).await.unwrap(), 0);
        assert!(claim_next(&db, "w2").await.unwrap().is_none());

        // Backdate the lock past the threshold, simulating a crashed worker.
        db.connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "UPDATE jobs
                     SET locked_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', '-45 minutes')
                     WHERE id = ?1",
                    params![job_id],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(recover_stale(&db, 30).await.unwrap(), 1);

        let job = claim_next(&db, "w2").await.unwrap().unwrap();
        assert_eq!(job.id, job_id);
        assert_eq!(job.attempts, 2);
        assert_eq!(job.locked_by.as_deref(), Some("w2"));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn racing_claimers_get_exactly_one_win() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("race.db");
        let path = db_path.to_str().unwrap().to_string();

        let db = Database::open(&path).await.unwrap();
        let (file_id, msg_id) = seed(&db, "f1", 1).await;

        // Separate connections simulate independent worker processes. A lost
        // race must come back as a clean `None`, never as a busy error.
        for round in 0..5 {
            let JobInsert::Created(_) = try_enqueue(&db, file_id, msg_id).await.unwrap() else {
                panic!("round {round}: enqueue failed");
            };

            let mut handles = Vec::new();
            for i in 0..8 {
                let path = path.clone();
                handles.push(tokio::spawn(async move {
                    let db = Database::open(&path).await.unwrap();
                    claim_next(&db, &format!("w-{i}")).await.unwrap()
                }));
            }

            let mut winner = None;
            for handle in handles {
                if let Some(job) = handle.await.unwrap() {
                    assert!(winner.is_none(), "round {round}: two claimers won");
                    winner = Some(job);
                }
            }
            let Some(job) = winner else {
                panic!("round {round}: no claimer won");
            };
            complete(&db, job.id).await.unwrap();
        }

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn complete_frees_the_file_for_new_jobs() {
        let (db, _dir) = setup_db().await;
        let (file_id, msg_id) = seed(&db, "f1", 1).await;
        let JobInsert::Created(job_id) = try_enqueue(&db, file_id, msg_id).await.unwrap() else {
            panic!()
        };
        let _ = claim_next(&db, "w1").await.unwrap().unwrap();
        complete(&db, job_id).await.unwrap();

        assert!(matches!(
            try_enqueue(&db, file_id, msg_id).await.unwrap(),
            JobInsert::Created(_)
        ));

        let counts = status_counts(&db).await.unwrap();
        assert!(counts.contains(&(JobStatus::Done, 1)));
        assert!(counts.contains(&(JobStatus::Queued, 1)));

        db.close().await.unwrap();
    }
}
