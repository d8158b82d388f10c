// SPDX-FileCopyrightText: 2026 Arkiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across the Arkiv workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Kind of chat a forwarded message originated from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Channel,
    Group,
    Supergroup,
    User,
    Unknown,
}

/// Typed attachment categories recognized on inbound messages.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Document,
    Photo,
    Video,
    Audio,
    Voice,
    Animation,
    Sticker,
}

/// Lifecycle state of a deduplicated file entity.
///
/// FAILED files may be retried back toward DOWNLOADED via a fresh job.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum FileStatus {
    New,
    Downloaded,
    Failed,
}

/// Lifecycle state of a download job.
///
/// QUEUED -> RUNNING -> {DONE | RETRY | FAILED}; RETRY becomes claimable
/// again once its next-attempt time passes. DONE and FAILED are terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    Queued,
    Running,
    Retry,
    Done,
    Failed,
}

/// Classification of a terminal download failure.
///
/// Exactly one category applies: which stages of the fallback chain ran,
/// and with what result. A stage is "skipped" only when it could not be
/// attempted at all (e.g. no message URL could be built for the secondary).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    PrimaryFailedSecondarySkipped,
    PrimaryFailedSecondaryFailed,
    PrimarySkippedSecondaryFailed,
}

/// The (kind, chat id, title, username) tuple a forward origin resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRef {
    pub kind: SourceKind,
    pub chat_id: i64,
    pub title: Option<String>,
    pub username: Option<String>,
}

impl SourceRef {
    /// The fallback used when a message carries no forward provenance.
    pub fn unknown() -> Self {
        SourceRef {
            kind: SourceKind::Unknown,
            chat_id: 0,
            title: None,
            username: None,
        }
    }
}

/// Forward provenance of an inbound message, as a closed set of variants.
///
/// Each variant carries only the fields its platform shape can supply.
/// The first four mirror the current Bot API origin objects; the `Legacy*`
/// variants cover the pre-origin fields still present in older raw
/// snapshots. `None` means the message was not forwarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForwardOrigin {
    ChannelOrigin {
        chat_id: i64,
        title: Option<String>,
        username: Option<String>,
        message_id: Option<i64>,
    },
    ChatOrigin {
        chat_id: i64,
        kind: SourceKind,
        title: Option<String>,
        username: Option<String>,
    },
    UserOrigin {
        user_id: i64,
        name: String,
        username: Option<String>,
    },
    HiddenUserOrigin {
        name: String,
    },
    LegacyForwardFromChat {
        chat_id: i64,
        kind: SourceKind,
        title: Option<String>,
        username: Option<String>,
    },
    LegacyForwardFrom {
        user_id: i64,
        name: String,
        username: Option<String>,
    },
    LegacyForwardSenderName {
        name: String,
    },
    None,
}

impl ForwardOrigin {
    /// Derive the source tuple by total match over every variant.
    pub fn derive_source(&self) -> SourceRef {
        match self {
            ForwardOrigin::ChannelOrigin {
                chat_id,
                title,
                username,
                ..
            } => SourceRef {
                kind: SourceKind::Channel,
                chat_id: *chat_id,
                title: title.clone(),
                username: username.clone(),
            },
            ForwardOrigin::ChatOrigin {
                chat_id,
                kind,
                title,
                username,
            }
            | ForwardOrigin::LegacyForwardFromChat {
                chat_id,
                kind,
                title,
                username,
            } => SourceRef {
                kind: *kind,
                chat_id: *chat_id,
                title: title.clone(),
                username: username.clone(),
            },
            ForwardOrigin::UserOrigin {
                user_id,
                name,
                username,
            }
            | ForwardOrigin::LegacyForwardFrom {
                user_id,
                name,
                username,
            } => SourceRef {
                kind: SourceKind::User,
                chat_id: *user_id,
                title: Some(name.clone()),
                username: username.clone(),
            },
            ForwardOrigin::HiddenUserOrigin { name }
            | ForwardOrigin::LegacyForwardSenderName { name } => SourceRef {
                kind: SourceKind::Unknown,
                chat_id: 0,
                title: Some(name.clone()),
                username: None,
            },
            ForwardOrigin::None => SourceRef::unknown(),
        }
    }

    /// The original message id in the source chat, when the variant carries one.
    pub fn original_message_id(&self) -> Option<i64> {
        match self {
            ForwardOrigin::ChannelOrigin { message_id, .. } => *message_id,
            _ => None,
        }
    }
}

/// One typed attachment on an inbound message.
///
/// `content_id` is the content-stable identifier used for deduplication;
/// `handle` is the transient per-sighting reference used by the primary
/// download method and may change across sightings of identical content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentInfo {
    pub kind: AttachmentKind,
    pub content_id: String,
    pub handle: String,
    pub declared_size: Option<i64>,
    pub mime_type: Option<String>,
    pub name: Option<String>,
}

/// A decoded inbound message, ready for the ingestion dispatcher.
#[derive(Debug, Clone)]
pub struct IncomingEnvelope {
    pub chat_id: i64,
    pub message_id: i64,
    pub original_message_id: Option<i64>,
    pub sender_id: Option<i64>,
    pub received_at: DateTime<Utc>,
    pub forwarded_at: Option<DateTime<Utc>>,
    pub origin: ForwardOrigin,
    pub text: Option<String>,
    pub raw_json: String,
    pub attachments: Vec<AttachmentInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn source_kind_round_trips_lowercase() {
        for kind in [
            SourceKind::Channel,
            SourceKind::Group,
            SourceKind::Supergroup,
            SourceKind::User,
            SourceKind::Unknown,
        ] {
            let s = kind.to_string();
            assert_eq!(s, s.to_lowercase());
            assert_eq!(SourceKind::from_str(&s).unwrap(), kind);
        }
    }

    #[test]
    fn job_status_round_trips_uppercase() {
        for status in [
            JobStatus::Queued,
            JobStatus::Running,
            JobStatus::Retry,
            JobStatus::Done,
            JobStatus::Failed,
        ] {
            let s = status.to_string();
            assert_eq!(s, s.to_uppercase());
            assert_eq!(JobStatus::from_str(&s).unwrap(), status);
        }
    }

    #[test]
    fn failure_kind_has_exact_wire_names() {
        assert_eq!(
            FailureKind::PrimaryFailedSecondarySkipped.to_string(),
            "PRIMARY_FAILED_SECONDARY_SKIPPED"
        );
        assert_eq!(
            FailureKind::PrimaryFailedSecondaryFailed.to_string(),
            "PRIMARY_FAILED_SECONDARY_FAILED"
        );
        assert_eq!(
            FailureKind::PrimarySkippedSecondaryFailed.to_string(),
            "PRIMARY_SKIPPED_SECONDARY_FAILED"
        );
    }

    #[test]
    fn channel_origin_derives_channel_source() {
        let origin = ForwardOrigin::ChannelOrigin {
            chat_id: -1001234,
            title: Some("Backups".into()),
            username: Some("backups".into()),
            message_id: Some(42),
        };
        let src = origin.derive_source();
        assert_eq!(src.kind, SourceKind::Channel);
        assert_eq!(src.chat_id, -1001234);
        assert_eq!(src.title.as_deref(), Some("Backups"));
        assert_eq!(origin.original_message_id(), Some(42));
    }

    #[test]
    fn hidden_user_derives_unknown_with_zero_chat() {
        let origin = ForwardOrigin::HiddenUserOrigin {
            name: "Somebody".into(),
        };
        let src = origin.derive_source();
        assert_eq!(src.kind, SourceKind::Unknown);
        assert_eq!(src.chat_id, 0);
        assert_eq!(src.title.as_deref(), Some("Somebody"));
        assert_eq!(origin.original_message_id(), None);
    }

    #[test]
    fn every_variant_derives_a_source() {
        // Total match: each variant must resolve without panicking.
        let variants = vec![
            ForwardOrigin::ChannelOrigin {
                chat_id: 1,
                title: None,
                username: None,
                message_id: None,
            },
            ForwardOrigin::ChatOrigin {
                chat_id: 2,
                kind: SourceKind::Supergroup,
                title: None,
                username: None,
            },
            ForwardOrigin::UserOrigin {
                user_id: 3,
                name: "u".into(),
                username: None,
            },
            ForwardOrigin::HiddenUserOrigin { name: "h".into() },
            ForwardOrigin::LegacyForwardFromChat {
                chat_id: 4,
                kind: SourceKind::Group,
                title: None,
                username: None,
            },
            ForwardOrigin::LegacyForwardFrom {
                user_id: 5,
                name: "l".into(),
                username: None,
            },
            ForwardOrigin::LegacyForwardSenderName { name: "s".into() },
            ForwardOrigin::None,
        ];
        for origin in variants {
            let _ = origin.derive_source();
        }
    }
}
