// SPDX-FileCopyrightText: 2026 Arkiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed attachment extraction.
//!
//! One message can carry at most one attachment of each recognized kind.
//! Photos come in multiple sizes; the largest variant (last in the array)
//! is the one archived. Kinds without a platform-supplied name get one
//! synthesized from the content id.

use arkiv_core::{AttachmentInfo, AttachmentKind};
use teloxide::types::{FileMeta, Message};

fn info(
    kind: AttachmentKind,
    file: &FileMeta,
    mime_type: Option<String>,
    name: Option<String>,
) -> AttachmentInfo {
    AttachmentInfo {
        kind,
        content_id: file.unique_id.to_string(),
        handle: file.id.to_string(),
        declared_size: Some(file.size as i64),
        mime_type,
        name,
    }
}

/// Extract every recognized attachment on a message.
pub fn extract_attachments(msg: &Message) -> Vec<AttachmentInfo> {
    let mut out = Vec::new();

    if let Some(doc) = msg.document() {
        out.push(info(
            AttachmentKind::Document,
            &doc.file,
            doc.mime_type.as_ref().map(|m| m.to_string()),
            doc.file_name.clone(),
        ));
    }

    if let Some(photos) = msg.photo()
        && let Some(largest) = photos.last()
    {
        out.push(info(
            AttachmentKind::Photo,
            &largest.file,
            Some("image/jpeg".to_string()),
            Some(format!("{}.jpg", largest.file.unique_id)),
        ));
    }

    if let Some(video) = msg.video() {
        out.push(info(
            AttachmentKind::Video,
            &video.file,
            video.mime_type.as_ref().map(|m| m.to_string()),
            video
                .file_name
                .clone()
                .or_else(|| Some(format!("{}.mp4", video.file.unique_id))),
        ));
    }

    if let Some(audio) = msg.audio() {
        out.push(info(
            AttachmentKind::Audio,
            &audio.file,
            audio.mime_type.as_ref().map(|m| m.to_string()),
            audio
                .file_name
                .clone()
                .or_else(|| Some(format!("{}.mp3", audio.file.unique_id))),
        ));
    }

    if let Some(voice) = msg.voice() {
        out.push(info(
            AttachmentKind::Voice,
            &voice.file,
            voice.mime_type.as_ref().map(|m| m.to_string()),
            Some(format!("{}.ogg", voice.file.unique_id)),
        ));
    }

    if let Some(animation) = msg.animation() {
        out.push(info(
            AttachmentKind::Animation,
            &animation.file,
            animation.mime_type.as_ref().map(|m| m.to_string()),
            animation
                .file_name
                .clone()
                .or_else(|| Some(format!("{}.mp4", animation.file.unique_id))),
        ));
    }

    if let Some(sticker) = msg.sticker() {
        out.push(info(
            AttachmentKind::Sticker,
            &sticker.file,
            Some("image/webp".to_string()),
            Some(format!("{}.webp", sticker.file.unique_id)),
        ));
    }

    out
}
