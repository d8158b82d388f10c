// SPDX-FileCopyrightText: 2026 Arkiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram boundary for the Arkiv attachment archiver.
//!
//! Decodes inbound teloxide messages into [`arkiv_core::IncomingEnvelope`],
//! dispatches them through the ingestion pipeline, and implements the
//! primary download stage against the Bot API.

pub mod attachments;
pub mod channel;
pub mod envelope;
pub mod fetcher;
pub mod ingest;
pub mod origin;

pub use channel::{ArchiveBot, bot_from_config};
pub use envelope::decode_envelope;
pub use fetcher::BotApiFetcher;
pub use ingest::IngestDispatcher;
