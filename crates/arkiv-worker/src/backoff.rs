// SPDX-FileCopyrightText: 2026 Arkiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retry backoff schedule.

const BASE_SECS: i64 = 30;
const CAP_SECS: i64 = 21_600; // 6 hours

/// Exponential backoff: `min(2^attempts * 30, 21600)` seconds.
pub fn backoff_secs(attempts: i64) -> i64 {
    // 2^10 * 30 already exceeds the cap; clamp the exponent to avoid overflow.
    if attempts >= 10 {
        return CAP_SECS;
    }
    let attempts = attempts.max(0) as u32;
    (BASE_SECS << attempts).min(CAP_SECS)
}
