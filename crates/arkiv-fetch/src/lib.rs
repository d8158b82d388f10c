// SPDX-FileCopyrightText: 2026 Arkiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Two-stage download fallback chain.
//!
//! The primary stage is direct platform file retrieval behind the
//! [`PrimaryFetch`] trait; the secondary stage shells out to `tdl` against a
//! reconstructed public message URL. [`chain::run_chain`] ties the two
//! together and classifies every failure into exactly one category.

pub mod chain;
pub mod tdl;
pub mod url;

pub use chain::{
    DisabledPrimary, DownloadMethod, DownloadOutcome, FetchPlan, PrimaryFetch, run_chain,
};
pub use tdl::TdlRunner;
pub use url::build_message_url;
