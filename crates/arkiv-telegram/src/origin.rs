// SPDX-FileCopyrightText: 2026 Arkiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Forward-origin decoding.
//!
//! Maps teloxide's `MessageOrigin` onto the closed [`ForwardOrigin`] enum,
//! so everything downstream matches on variants instead of probing optional
//! platform fields.

use arkiv_core::{ForwardOrigin, SourceKind};
use teloxide::types::{Chat, Message, MessageOrigin};

fn chat_kind(chat: &Chat) -> SourceKind {
    if chat.is_channel() {
        SourceKind::Channel
    } else if chat.is_supergroup() {
        SourceKind::Supergroup
    } else if chat.is_group() {
        SourceKind::Group
    } else {
        SourceKind::Unknown
    }
}

/// Decode the forward provenance of a message.
pub fn decode_origin(msg: &Message) -> ForwardOrigin {
    match msg.forward_origin() {
        Some(MessageOrigin::Channel {
            chat, message_id, ..
        }) => ForwardOrigin::ChannelOrigin {
            chat_id: chat.id.0,
            title: chat.title().map(str::to_owned),
            username: chat.username().map(str::to_owned),
            message_id: Some(message_id.0 as i64),
        },
        Some(MessageOrigin::Chat { sender_chat, .. }) => ForwardOrigin::ChatOrigin {
            chat_id: sender_chat.id.0,
            kind: chat_kind(sender_chat),
            title: sender_chat.title().map(str::to_owned),
            username: sender_chat.username().map(str::to_owned),
        },
        Some(MessageOrigin::User { sender_user, .. }) => ForwardOrigin::UserOrigin {
            user_id: sender_user.id.0 as i64,
            name: sender_user.full_name(),
            username: sender_user.username.clone(),
        },
        Some(MessageOrigin::HiddenUser {
            sender_user_name, ..
        }) => ForwardOrigin::HiddenUserOrigin {
            name: sender_user_name.clone(),
        },
        None => ForwardOrigin::None,
    }
}
