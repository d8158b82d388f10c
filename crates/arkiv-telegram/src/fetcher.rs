// SPDX-FileCopyrightText: 2026 Arkiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Primary download stage: the Bot API.
//!
//! `getFile` resolves the transient handle to a server path, the content
//! streams into a `.part` sibling, and the artifact is renamed into place.
//! The Bot API refuses files above 20 MiB, so larger files skip straight
//! to the secondary stage.

use std::path::Path;

use arkiv_core::ArkivError;
use arkiv_fetch::PrimaryFetch;
use async_trait::async_trait;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::FileId;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Bot API hard limit for `getFile` downloads.
const BOT_API_DOWNLOAD_LIMIT: i64 = 20 * 1024 * 1024;

pub struct BotApiFetcher {
    bot: Bot,
}

impl BotApiFetcher {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl PrimaryFetch for BotApiFetcher {
    fn can_fetch(&self, declared_size: Option<i64>) -> bool {
        declared_size.is_none_or(|size| size <= BOT_API_DOWNLOAD_LIMIT)
    }

    async fn fetch(&self, handle: &str, target: &Path) -> Result<(), ArkivError> {
        let file = self
            .bot
            .get_file(FileId(handle.to_owned()))
            .await
            .map_err(|e| ArkivError::Channel {
                message: format!("getFile failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let part = arkiv_archive::verify::part_path(target);
        if let Some(parent) = part.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ArkivError::archive_io("creating download directory", e))?;
        }

        let mut dst = tokio::fs::File::create(&part)
            .await
            .map_err(|e| ArkivError::archive_io("creating download temp file", e))?;
        self.bot
            .download_file(&file.path, &mut dst)
            .await
            .map_err(|e| ArkivError::Channel {
                message: format!("file download failed: {e}"),
                source: Some(Box::new(e)),
            })?;
        dst.flush()
            .await
            .map_err(|e| ArkivError::archive_io("flushing download temp file", e))?;
        drop(dst);

        arkiv_archive::verify::commit_part(&part, target).await?;
        debug!(handle, target = %target.display(), "bot api download complete");
        Ok(())
    }
}
