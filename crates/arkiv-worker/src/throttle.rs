// SPDX-FileCopyrightText: 2026 Arkiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rate limiting for repetitive log lines.
//!
//! A polling loop that keeps hitting the same error (store unreachable,
//! disk full) would otherwise emit one line per poll interval. Each
//! `LogThrottle` is owned by its call site; there is no process-wide state.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Permits at most one log emission per interval.
pub struct LogThrottle {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl LogThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    /// Whether the caller may emit now. Granting a permit starts the
    /// suppression window.
    pub fn permit(&self) -> bool {
        let Ok(mut last) = self.last.lock() else {
            // Poisoned lock: better to over-log than to go silent.
            return true;
        };
        let now = Instant::now();
        match *last {
            Some(previous) if now.duration_since(previous) < self.interval => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}
