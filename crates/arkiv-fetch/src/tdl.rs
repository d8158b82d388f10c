// SPDX-FileCopyrightText: 2026 Arkiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Secondary download stage: `tdl` subprocess.
//!
//! `tdl` downloads into a scratch directory next to the target; the produced
//! file is renamed into the target path. Exactly one produced file is
//! expected; more than one is tolerated with a warning (first wins, sorted
//! for determinism).

use std::path::{Path, PathBuf};

use arkiv_core::ArkivError;
use tokio::process::Command;
use tracing::{info, warn};

/// Runner for the external `tdl` downloader.
pub struct TdlRunner {
    program: String,
}

impl Default for TdlRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl TdlRunner {
    pub fn new() -> Self {
        Self {
            program: "tdl".to_string(),
        }
    }

    /// Use a different executable. Tests substitute a stub here.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Download the message behind `message_url` and place its file at `target`.
    pub async fn download(&self, message_url: &str, target: &Path) -> Result<(), ArkivError> {
        let scratch = scratch_dir(target);
        tokio::fs::create_dir_all(&scratch)
            .await
            .map_err(|e| ArkivError::archive_io("creating tdl scratch directory", e))?;

        info!(url = message_url, "running tdl");
        let output = Command::new(&self.program)
            .arg("dl")
            .arg("-u")
            .arg(message_url)
            .arg("-d")
            .arg(&scratch)
            .arg("--continue")
            .arg("--skip-same")
            .output()
            .await
            .map_err(|e| ArkivError::Fetch {
                message: format!("spawning {}: {e}", self.program),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let detail = if !stderr.trim().is_empty() {
                stderr.trim().to_string()
            } else if !stdout.trim().is_empty() {
                stdout.trim().to_string()
            } else {
                "unknown error".to_string()
            };
            return Err(ArkivError::Fetch {
                message: format!("tdl exit {}: {detail}", output.status),
            });
        }

        let mut produced = Vec::new();
        let mut entries = tokio::fs::read_dir(&scratch)
            .await
            .map_err(|e| ArkivError::archive_io("listing tdl scratch directory", e))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ArkivError::archive_io("listing tdl scratch directory", e))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| ArkivError::archive_io("inspecting tdl output", e))?;
            if file_type.is_file() {
                produced.push(entry.path());
            }
        }

        if produced.is_empty() {
            return Err(ArkivError::Fetch {
                message: "tdl produced no file".to_string(),
            });
        }
        produced.sort();
        if produced.len() > 1 {
            warn!(count = produced.len(), "tdl produced multiple files, using first");
        }

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ArkivError::archive_io("creating archive directory", e))?;
        }
        tokio::fs::rename(&produced[0], target)
            .await
            .map_err(|e| ArkivError::archive_io("moving tdl download into place", e))?;

        // Best-effort scratch cleanup; leftovers only waste space.
        let _ = tokio::fs::remove_dir_all(&scratch).await;

        info!(target = %target.display(), "tdl download complete");
        Ok(())
    }
}

fn scratch_dir(target: &Path) -> PathBuf {
    target
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(".tmp")
}
