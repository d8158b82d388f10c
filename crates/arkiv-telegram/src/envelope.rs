// SPDX-FileCopyrightText: 2026 Arkiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound message decoding.

use arkiv_core::IncomingEnvelope;
use chrono::{DateTime, Utc};
use teloxide::types::Message;
use tracing::warn;

use crate::{attachments, origin};

/// ISO-8601 UTC with millisecond precision, the store's timestamp format.
pub fn iso_millis(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Decode a teloxide message into the channel-agnostic envelope.
///
/// `received_at` is stamped here, at the moment the bot saw the message;
/// `forwarded_at` is the platform's original send time when the message is
/// a forward.
pub fn decode_envelope(msg: &Message) -> IncomingEnvelope {
    let origin = origin::decode_origin(msg);
    let raw_json = serde_json::to_string(msg).unwrap_or_else(|e| {
        warn!(error = %e, "failed to serialize raw message snapshot");
        "{}".to_string()
    });

    IncomingEnvelope {
        chat_id: msg.chat.id.0,
        message_id: msg.id.0 as i64,
        original_message_id: origin.original_message_id(),
        sender_id: msg.from.as_ref().map(|u| u.id.0 as i64),
        received_at: Utc::now(),
        forwarded_at: msg.forward_date(),
        text: msg.text().or(msg.caption()).map(str::to_owned),
        raw_json,
        attachments: attachments::extract_attachments(msg),
        origin,
    }
}
