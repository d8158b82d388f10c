// SPDX-FileCopyrightText: 2026 Arkiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Archive-side concerns: deterministic on-disk layout, artifact
//! verification, the append-only monthly audit journal, and the optional
//! WebDAV mirror sink.

pub mod journal;
pub mod layout;
pub mod verify;
pub mod webdav;

pub use journal::{AttachmentLine, AttachmentStatus, CompletionEntry, FailureEntry, Journal, MessageEntry};
pub use layout::{archive_path, sanitize_filename};
pub use webdav::WebdavClient;
