// SPDX-FileCopyrightText: 2026 Arkiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `arkiv stats` command implementation.

use arkiv_config::ArkivConfig;
use arkiv_core::ArkivError;
use arkiv_store::Database;
use arkiv_store::queries::{failures, jobs};

/// Runs the `arkiv stats` command: job counts by status, then terminal
/// failure counts by classification, optionally restricted to one month.
pub async fn run_stats(config: ArkivConfig, month: Option<String>) -> Result<(), ArkivError> {
    let db = Database::open(&config.storage.database_path).await?;

    let counts = jobs::status_counts(&db).await?;
    println!("jobs:");
    if counts.is_empty() {
        println!("  (none)");
    }
    for (status, count) in counts {
        println!("  {status}: {count}");
    }

    let stats = failures::failure_stats(&db, month.as_deref()).await?;
    match &month {
        Some(month) => println!("failures ({month}):"),
        None => println!("failures:"),
    }
    if stats.is_empty() {
        println!("  (none)");
    }
    for (kind, count) in stats {
        println!("  {kind}: {count}");
    }

    db.close().await?;
    Ok(())
}
