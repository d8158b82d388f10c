// SPDX-FileCopyrightText: 2026 Arkiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message URL reconstruction for the secondary download stage.

/// Build a `t.me` message URL from whatever provenance is known.
///
/// Prefers the public `https://t.me/{username}/{id}` form. Without a public
/// handle, falls back to the private `/c/` form, stripping the `-100`
/// supergroup prefix or a bare `-` group prefix from the numeric chat id.
/// Without an original message id no URL can exist.
pub fn build_message_url(
    username: Option<&str>,
    chat_id: Option<i64>,
    original_message_id: Option<i64>,
) -> Option<String> {
    let message_id = original_message_id?;

    if let Some(username) = username.filter(|u| !u.is_empty()) {
        return Some(format!("https://t.me/{username}/{message_id}"));
    }

    let chat_id = chat_id?;
    let raw = chat_id.to_string();
    let clean = raw
        .strip_prefix("-100")
        .or_else(|| raw.strip_prefix('-'))
        .unwrap_or(&raw);
    Some(format!("https://t.me/c/{clean}/{message_id}"))
}
