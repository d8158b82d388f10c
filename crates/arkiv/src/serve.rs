// SPDX-FileCopyrightText: 2026 Arkiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `arkiv serve` command implementation.
//!
//! Wires the store, journal, download chain and Telegram bot together and
//! polls until a shutdown signal arrives. The same process performs inline
//! downloads for small attachments; large ones land in the job queue for
//! `arkiv worker` processes.

use std::path::PathBuf;
use std::sync::Arc;

use arkiv_archive::{Journal, WebdavClient};
use arkiv_config::ArkivConfig;
use arkiv_core::ArkivError;
use arkiv_fetch::TdlRunner;
use arkiv_store::Database;
use arkiv_telegram::ingest::IngestSettings;
use arkiv_telegram::{ArchiveBot, BotApiFetcher, IngestDispatcher, bot_from_config};
use tracing::info;

use crate::shutdown;

/// Build the optional WebDAV mirror client from config.
pub(crate) fn webdav_client(config: &ArkivConfig) -> Result<Option<WebdavClient>, ArkivError> {
    if !config.storage.mode.saves_webdav() {
        return Ok(None);
    }
    let Some(url) = config.webdav.url.as_deref() else {
        return Err(ArkivError::Config(
            "storage.mode requests webdav but webdav.url is not set".into(),
        ));
    };
    let client = WebdavClient::new(
        url,
        config.webdav.username.as_deref().unwrap_or_default(),
        config.webdav.password.as_deref().unwrap_or_default(),
    )?;
    Ok(Some(client))
}

/// Runs the `arkiv serve` command.
pub async fn run_serve(config: ArkivConfig) -> Result<(), ArkivError> {
    info!("starting arkiv serve");

    let db = Database::open(&config.storage.database_path).await?;
    let journal = Journal::new(&config.storage.journal_root);
    let webdav = webdav_client(&config)?;

    let bot = bot_from_config(&config.telegram)?;
    let primary = Arc::new(BotApiFetcher::new(bot.clone()));

    let dispatcher = Arc::new(IngestDispatcher::new(
        db,
        journal,
        primary,
        TdlRunner::new(),
        webdav,
        IngestSettings {
            archive_root: PathBuf::from(&config.storage.archive_root),
            mode: config.storage.mode,
            small_file_threshold: config.worker.small_file_threshold_bytes,
            max_concurrent_downloads: config.worker.max_concurrent_downloads,
            allowed_users: config.telegram.allowed_users.clone(),
        },
    ));

    let shutdown = shutdown::install_signal_handler();
    ArchiveBot::with_bot(bot, dispatcher).run(shutdown).await
}
