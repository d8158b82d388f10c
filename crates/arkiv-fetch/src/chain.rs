// SPDX-FileCopyrightText: 2026 Arkiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The fallback chain: primary platform fetch, then `tdl`.
//!
//! Every run resolves to a success with the method that worked, or a failure
//! classified into exactly one category describing which stages ran and how
//! they ended. A stage is "skipped" only when it could not be attempted at
//! all.

use std::path::Path;

use arkiv_core::{ArkivError, FailureKind};
use async_trait::async_trait;
use strum::Display;
use tracing::{info, warn};

use crate::tdl::TdlRunner;

/// Primary platform file retrieval, implemented at the messaging boundary.
#[async_trait]
pub trait PrimaryFetch: Send + Sync {
    /// Whether this fetcher can attempt a file of the declared size.
    fn can_fetch(&self, declared_size: Option<i64>) -> bool {
        let _ = declared_size;
        true
    }

    /// Download the file behind `handle` to `target`, atomically.
    async fn fetch(&self, handle: &str, target: &Path) -> Result<(), ArkivError>;
}

/// Primary stage stand-in for processes running without platform
/// credentials. Never attempts anything, so every file goes straight to
/// the secondary stage.
pub struct DisabledPrimary;

#[async_trait]
impl PrimaryFetch for DisabledPrimary {
    fn can_fetch(&self, _declared_size: Option<i64>) -> bool {
        false
    }

    async fn fetch(&self, _handle: &str, _target: &Path) -> Result<(), ArkivError> {
        Err(ArkivError::Fetch {
            message: "primary download method is disabled".into(),
        })
    }
}

/// Which stage produced the artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum DownloadMethod {
    Primary,
    Secondary,
}

/// Result of one chain run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Success {
        method: DownloadMethod,
    },
    Failure {
        kind: FailureKind,
        primary_error: Option<String>,
        secondary_error: Option<String>,
    },
}

/// Everything the chain needs to attempt one file.
pub struct FetchPlan<'a> {
    /// Transient platform handle for the primary stage; absent means skip.
    pub handle: Option<&'a str>,
    pub declared_size: Option<i64>,
    /// Reconstructed message URL for the secondary stage; absent means skip.
    pub message_url: Option<String>,
    pub target: &'a Path,
}

/// Run the chain: primary when attemptable, then `tdl` when a URL exists.
pub async fn run_chain(
    primary: &dyn PrimaryFetch,
    tdl: &TdlRunner,
    plan: FetchPlan<'_>,
) -> DownloadOutcome {
    let primary_error = match plan.handle {
        Some(handle) if primary.can_fetch(plan.declared_size) => {
            match primary.fetch(handle, plan.target).await {
                Ok(()) => {
                    info!(target = %plan.target.display(), "primary download complete");
                    return DownloadOutcome::Success {
                        method: DownloadMethod::Primary,
                    };
                }
                Err(e) => {
                    warn!(error = %e, "primary download failed, trying fallback");
                    Some(e.to_string())
                }
            }
        }
        _ => {
            info!("primary stage skipped");
            None
        }
    };

    match &plan.message_url {
        Some(url) => match tdl.download(url, plan.target).await {
            Ok(()) => DownloadOutcome::Success {
                method: DownloadMethod::Secondary,
            },
            Err(e) => {
                let kind = if primary_error.is_some() {
                    FailureKind::PrimaryFailedSecondaryFailed
                } else {
                    FailureKind::PrimarySkippedSecondaryFailed
                };
                DownloadOutcome::Failure {
                    kind,
                    primary_error,
                    secondary_error: Some(e.to_string()),
                }
            }
        },
        None => {
            // Nothing left to try. When even the primary never ran, the
            // missing locator is the secondary stage's failure.
            if primary_error.is_some() {
                DownloadOutcome::Failure {
                    kind: FailureKind::PrimaryFailedSecondarySkipped,
                    primary_error,
                    secondary_error: None,
                }
            } else {
                DownloadOutcome::Failure {
                    kind: FailureKind::PrimarySkippedSecondaryFailed,
                    primary_error: None,
                    secondary_error: Some("cannot build message URL".to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::tempdir;

    struct FakePrimary {
        result: Result<Vec<u8>, String>,
        size_limit: Option<i64>,
    }

    #[async_trait]
    impl PrimaryFetch for FakePrimary {
        fn can_fetch(&self, declared_size: Option<i64>) -> bool {
            match (self.size_limit, declared_size) {
                (Some(limit), Some(size)) => size <= limit,
                _ => true,
            }
        }

        async fn fetch(&self, _handle: &str, target: &Path) -> Result<(), ArkivError> {
            match &self.result {
                Ok(bytes) => {
                    tokio::fs::write(target, bytes)
                        .await
                        .map_err(|e| ArkivError::archive_io("writing test artifact", e))?;
                    Ok(())
                }
                Err(msg) => Err(ArkivError::Fetch {
                    message: msg.clone(),
                }),
            }
        }
    }

    fn failing_tdl(dir: &Path) -> TdlRunner {
        let script = dir.join("tdl-fail");
        std::fs::write(&script, "#!/bin/sh\necho 'no session' >&2\nexit 1\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        TdlRunner::with_program(script.to_str().unwrap())
    }

    fn producing_tdl(dir: &Path) -> TdlRunner {
        let script = dir.join("tdl-ok");
        std::fs::write(
            &script,
            "#!/bin/sh\n\
             while [ $# -gt 0 ]; do\n\
               if [ \"$1\" = \"-d\" ]; then out=\"$2\"; fi\n\
               shift\n\
             done\n\
             printf fallback > \"$out/f.bin\"\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        TdlRunner::with_program(script.to_str().unwrap())
    }

    #[tokio::test]
    async fn primary_success_never_touches_secondary() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("out.bin");
        let primary = FakePrimary {
            result: Ok(b"direct".to_vec()),
            size_limit: None,
        };
        // A tdl stub that would panic the test if invoked.
        let tdl = TdlRunner::with_program("/nonexistent/tdl");

        let outcome = run_chain(
            &primary,
            &tdl,
            FetchPlan {
                handle: Some("h"),
                declared_size: Some(6),
                message_url: Some("https://t.me/c/1/1".into()),
                target: &target,
            },
        )
        .await;
        assert_eq!(
            outcome,
            DownloadOutcome::Success {
                method: DownloadMethod::Primary
            }
        );
        assert_eq!(tokio::fs::read(&target).await.unwrap(), b"direct");
    }

    #[tokio::test]
    async fn primary_failure_falls_back_to_secondary() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("out.bin");
        let primary = FakePrimary {
            result: Err("file is too big".into()),
            size_limit: None,
        };
        let tdl = producing_tdl(dir.path());

        let outcome = run_chain(
            &primary,
            &tdl,
            FetchPlan {
                handle: Some("h"),
                declared_size: None,
                message_url: Some("https://t.me/c/1/1".into()),
                target: &target,
            },
        )
        .await;
        assert_eq!(
            outcome,
            DownloadOutcome::Success {
                method: DownloadMethod::Secondary
            }
        );
        assert_eq!(tokio::fs::read(&target).await.unwrap(), b"fallback");
    }

    #[tokio::test]
    async fn both_failing_is_primary_failed_secondary_failed() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("out.bin");
        let primary = FakePrimary {
            result: Err("403".into()),
            size_limit: None,
        };
        let tdl = failing_tdl(dir.path());

        let outcome = run_chain(
            &primary,
            &tdl,
            FetchPlan {
                handle: Some("h"),
                declared_size: None,
                message_url: Some("https://t.me/c/1/1".into()),
                target: &target,
            },
        )
        .await;
        let DownloadOutcome::Failure {
            kind,
            primary_error,
            secondary_error,
        } = outcome
        else {
            panic!("expected failure");
        };
        assert_eq!(kind, FailureKind::PrimaryFailedSecondaryFailed);
        assert!(primary_error.unwrap().contains("403"));
        assert!(secondary_error.unwrap().contains("no session"));
    }

    #[tokio::test]
    async fn missing_url_after_primary_failure_skips_secondary() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("out.bin");
        let primary = FakePrimary {
            result: Err("403".into()),
            size_limit: None,
        };
        let tdl = TdlRunner::with_program("/nonexistent/tdl");

        let outcome = run_chain(
            &primary,
            &tdl,
            FetchPlan {
                handle: Some("h"),
                declared_size: None,
                message_url: None,
                target: &target,
            },
        )
        .await;
        let DownloadOutcome::Failure { kind, .. } = outcome else {
            panic!("expected failure");
        };
        assert_eq!(kind, FailureKind::PrimaryFailedSecondarySkipped);
    }

    #[tokio::test]
    async fn disabled_primary_always_defers_to_secondary() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("out.bin");
        let tdl = producing_tdl(dir.path());

        let outcome = run_chain(
            &DisabledPrimary,
            &tdl,
            FetchPlan {
                handle: Some("h"),
                declared_size: Some(10),
                message_url: Some("https://t.me/c/1/1".into()),
                target: &target,
            },
        )
        .await;
        assert_eq!(
            outcome,
            DownloadOutcome::Success {
                method: DownloadMethod::Secondary
            }
        );
    }

    #[tokio::test]
    async fn oversized_file_skips_primary() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("out.bin");
        let primary = FakePrimary {
            result: Ok(b"never".to_vec()),
            size_limit: Some(100),
        };
        let tdl = failing_tdl(dir.path());

        let outcome = run_chain(
            &primary,
            &tdl,
            FetchPlan {
                handle: Some("h"),
                declared_size: Some(1_000),
                message_url: Some("https://t.me/c/1/1".into()),
                target: &target,
            },
        )
        .await;
        let DownloadOutcome::Failure {
            kind,
            primary_error,
            ..
        } = outcome
        else {
            panic!("expected failure");
        };
        assert_eq!(kind, FailureKind::PrimarySkippedSecondaryFailed);
        assert!(primary_error.is_none());
    }

    #[tokio::test]
    async fn nothing_attemptable_reports_missing_locator() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("out.bin");
        let primary = FakePrimary {
            result: Ok(vec![]),
            size_limit: None,
        };
        let tdl = TdlRunner::with_program("/nonexistent/tdl");

        let outcome = run_chain(
            &primary,
            &tdl,
            FetchPlan {
                handle: None,
                declared_size: None,
                message_url: None,
                target: &target,
            },
        )
        .await;
        let DownloadOutcome::Failure {
            kind,
            secondary_error,
            ..
        } = outcome
        else {
            panic!("expected failure");
        };
        assert_eq!(kind, FailureKind::PrimarySkippedSecondaryFailed);
        assert!(secondary_error.unwrap().contains("cannot build message URL"));
    }
}
