// SPDX-FileCopyrightText: 2026 Arkiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Arkiv attachment archiver.
//!
//! This crate provides the error type and the domain vocabulary shared by
//! every other crate in the workspace: source and attachment kinds, file and
//! job lifecycle states, the closed forward-origin type, and the decoded
//! inbound envelope handed from the channel boundary to the dispatcher.

pub mod error;
pub mod types;

pub use error::ArkivError;
pub use types::{
    AttachmentInfo, AttachmentKind, FailureKind, FileStatus, ForwardOrigin, IncomingEnvelope,
    JobStatus, SourceKind, SourceRef,
};
