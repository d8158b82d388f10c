// SPDX-FileCopyrightText: 2026 Arkiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Arkiv attachment archiver.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use serde::{Deserialize, Serialize};

/// Top-level Arkiv configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values; only `telegram.bot_token` is required to actually run.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ArkivConfig {
    /// Telegram bot integration settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Durable store and archive tree locations.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Worker scheduling and download settings.
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Optional WebDAV mirror sink.
    #[serde(default)]
    pub webdav: WebdavConfig,
}

/// Telegram bot integration configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Telegram Bot API token. `None` disables ingestion and the Bot API
    /// download method (the worker then relies on the secondary method only).
    #[serde(default)]
    pub bot_token: Option<String>,

    /// List of allowed sender user IDs. Empty accepts every sender.
    #[serde(default)]
    pub allowed_users: Vec<i64>,
}

/// Durable store and archive layout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Root directory of the archive tree.
    #[serde(default = "default_archive_root")]
    pub archive_root: String,

    /// Root directory of the monthly audit journal.
    #[serde(default = "default_journal_root")]
    pub journal_root: String,

    /// Which sinks receive downloaded artifacts.
    #[serde(default)]
    pub mode: StorageMode,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            archive_root: default_archive_root(),
            journal_root: default_journal_root(),
            mode: StorageMode::default(),
        }
    }
}

fn data_dir() -> std::path::PathBuf {
    dirs::data_dir()
        .map(|p| p.join("arkiv"))
        .unwrap_or_else(|| std::path::PathBuf::from("arkiv-data"))
}

fn default_database_path() -> String {
    data_dir().join("arkiv.db").to_string_lossy().into_owned()
}

fn default_archive_root() -> String {
    data_dir().join("files").to_string_lossy().into_owned()
}

fn default_journal_root() -> String {
    data_dir().join("notes").to_string_lossy().into_owned()
}

/// Worker scheduling and download configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerConfig {
    /// Bound on parallel inline downloads within the ingesting process.
    #[serde(default = "default_max_concurrent_downloads")]
    pub max_concurrent_downloads: usize,

    /// Attachments with a declared size below this download inline during
    /// ingestion; larger ones are queued for the worker loop.
    #[serde(default = "default_small_file_threshold")]
    pub small_file_threshold_bytes: i64,

    /// Maximum download attempts before a job fails permanently.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: i64,

    /// RUNNING jobs locked longer than this are presumed abandoned.
    #[serde(default = "default_stale_after_minutes")]
    pub stale_after_minutes: i64,

    /// Sleep between claim attempts when the queue is empty.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: default_max_concurrent_downloads(),
            small_file_threshold_bytes: default_small_file_threshold(),
            max_attempts: default_max_attempts(),
            stale_after_minutes: default_stale_after_minutes(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

fn default_max_concurrent_downloads() -> usize {
    4
}

fn default_small_file_threshold() -> i64 {
    20 * 1024 * 1024
}

fn default_max_attempts() -> i64 {
    8
}

fn default_stale_after_minutes() -> i64 {
    30
}

fn default_poll_interval_secs() -> u64 {
    5
}

/// WebDAV mirror configuration. Ignored unless `storage.mode` includes webdav.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WebdavConfig {
    /// Base URL of the WebDAV collection. `None` disables the mirror.
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

/// Which sinks receive a downloaded artifact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    #[default]
    Local,
    Webdav,
    Both,
}

impl StorageMode {
    pub fn saves_local(self) -> bool {
        matches!(self, StorageMode::Local | StorageMode::Both)
    }

    pub fn saves_webdav(self) -> bool {
        matches!(self, StorageMode::Webdav | StorageMode::Both)
    }
}
