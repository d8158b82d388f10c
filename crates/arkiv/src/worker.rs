// SPDX-FileCopyrightText: 2026 Arkiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `arkiv worker` command implementation.
//!
//! Several worker processes may share one database file; the store's
//! conditional claim updates keep them from processing the same job. A
//! worker without a bot token still runs, using only the `tdl` fallback.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use arkiv_archive::Journal;
use arkiv_config::ArkivConfig;
use arkiv_core::ArkivError;
use arkiv_fetch::{DisabledPrimary, PrimaryFetch, TdlRunner};
use arkiv_store::Database;
use arkiv_telegram::BotApiFetcher;
use arkiv_worker::{Worker, WorkerSettings};
use teloxide::Bot;
use tracing::info;

use crate::serve::webdav_client;
use crate::shutdown;

/// Runs the `arkiv worker` command.
pub async fn run_worker(config: ArkivConfig, id: Option<String>) -> Result<(), ArkivError> {
    let worker_id = id.unwrap_or_else(|| format!("worker-{}", std::process::id()));
    info!(worker_id, "starting arkiv worker");

    let db = Database::open(&config.storage.database_path).await?;
    let journal = Journal::new(&config.storage.journal_root);
    let webdav = webdav_client(&config)?;

    let primary: Arc<dyn PrimaryFetch> = match config.telegram.bot_token.as_deref() {
        Some(token) if !token.is_empty() => Arc::new(BotApiFetcher::new(Bot::new(token))),
        _ => {
            info!("no bot token configured, primary download method disabled");
            Arc::new(DisabledPrimary)
        }
    };

    let worker = Worker::new(
        db,
        primary,
        TdlRunner::new(),
        journal,
        webdav,
        WorkerSettings {
            archive_root: PathBuf::from(&config.storage.archive_root),
            mode: config.storage.mode,
            max_attempts: config.worker.max_attempts,
            stale_after_minutes: config.worker.stale_after_minutes,
            poll_interval: Duration::from_secs(config.worker.poll_interval_secs),
        },
        worker_id,
    );

    let shutdown = shutdown::install_signal_handler();
    worker.run(shutdown).await
}
