// SPDX-FileCopyrightText: 2026 Arkiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Long-polling bot loop.
//!
//! Every message update is decoded into an envelope and handed to the
//! ingestion dispatcher; all other update kinds are ignored. Polling stops
//! when the process-wide cancellation token fires.

use std::sync::Arc;

use arkiv_config::TelegramConfig;
use arkiv_core::ArkivError;
use teloxide::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::envelope::decode_envelope;
use crate::ingest::IngestDispatcher;

/// Build a [`Bot`] from config, requiring a set, non-empty token.
pub fn bot_from_config(config: &TelegramConfig) -> Result<Bot, ArkivError> {
    let token = config.bot_token.as_deref().ok_or_else(|| {
        ArkivError::Config("telegram.bot_token is required to run the bot".into())
    })?;
    if token.is_empty() {
        return Err(ArkivError::Config(
            "telegram.bot_token cannot be empty".into(),
        ));
    }
    Ok(Bot::new(token))
}

/// The archiving bot: long polling plus ingestion dispatch.
pub struct ArchiveBot {
    bot: Bot,
    dispatcher: Arc<IngestDispatcher>,
}

impl ArchiveBot {
    /// Requires `telegram.bot_token` to be set and non-empty.
    pub fn new(
        config: &TelegramConfig,
        dispatcher: Arc<IngestDispatcher>,
    ) -> Result<Self, ArkivError> {
        Ok(Self::with_bot(bot_from_config(config)?, dispatcher))
    }

    /// Wire an already-built [`Bot`], e.g. one shared with the primary
    /// download fetcher.
    pub fn with_bot(bot: Bot, dispatcher: Arc<IngestDispatcher>) -> Self {
        Self { bot, dispatcher }
    }

    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    /// Poll until the token is cancelled.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), ArkivError> {
        info!("starting Telegram long polling");

        let dispatcher = self.dispatcher.clone();
        let handler = Update::filter_message().endpoint(move |msg: Message| {
            let dispatcher = dispatcher.clone();
            async move {
                let envelope = decode_envelope(&msg);
                if let Err(e) = dispatcher.ingest(envelope).await {
                    error!(
                        chat_id = msg.chat.id.0,
                        message_id = msg.id.0,
                        error = %e,
                        "ingestion failed"
                    );
                }
                respond(())
            }
        });

        let mut poller = Dispatcher::builder(self.bot, handler)
            .default_handler(|_| async {}) // Silently ignore non-message updates
            .build();

        let stop = poller.shutdown_token();
        tokio::spawn(async move {
            shutdown.cancelled().await;
            if let Ok(done) = stop.shutdown() {
                done.await;
            }
        });

        poller.dispatch().await;
        info!("Telegram polling stopped");
        Ok(())
    }
}
