// SPDX-FileCopyrightText: 2026 Arkiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The download worker: claims jobs from the durable queue, drives the
//! fallback chain, verifies artifacts and settles each job as DONE, RETRY
//! or FAILED. The loop itself never dies; every error folds into that
//! per-job decision.

pub mod backoff;
pub mod throttle;
pub mod worker;

pub use backoff::backoff_secs;
pub use throttle::LogThrottle;
pub use worker::{Worker, WorkerSettings};
