// SPDX-FileCopyrightText: 2026 Arkiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Arkiv attachment archiver.

use std::path::PathBuf;

use thiserror::Error;

/// The primary error type used across all Arkiv crates.
#[derive(Debug, Error)]
pub enum ArkivError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Metadata store errors (database open, query failure, migration failure).
    #[error("store error: {source}")]
    Store {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Channel boundary errors (Bot API failure, message decode, polling).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Download errors from either stage of the fallback chain.
    #[error("fetch error: {message}")]
    Fetch { message: String },

    /// Archive sink errors (local filesystem, journal append, WebDAV mirror).
    #[error("archive error: {message}")]
    Archive {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Post-transfer verification failed: the stored artifact does not match
    /// the declared size. Treated as a download failure by callers.
    #[error("size mismatch for {path}: expected {expected}, got {actual}")]
    SizeMismatch {
        path: PathBuf,
        expected: i64,
        actual: i64,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ArkivError {
    /// Wrap an I/O error as an archive error with context.
    pub fn archive_io(message: impl Into<String>, err: std::io::Error) -> Self {
        ArkivError::Archive {
            message: message.into(),
            source: Some(Box::new(err)),
        }
    }
}
