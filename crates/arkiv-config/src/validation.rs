// SPDX-FileCopyrightText: 2026 Arkiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as non-empty paths and consistent storage-mode settings.

use crate::diagnostic::ConfigError;
use crate::model::ArkivConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &ArkivConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    for (key, value) in [
        ("storage.database_path", &config.storage.database_path),
        ("storage.archive_root", &config.storage.archive_root),
        ("storage.journal_root", &config.storage.journal_root),
    ] {
        if value.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("{key} must not be empty"),
            });
        }
    }

    if config.worker.max_concurrent_downloads == 0 {
        errors.push(ConfigError::Validation {
            message: "worker.max_concurrent_downloads must be at least 1".to_string(),
        });
    }

    if config.worker.max_attempts < 1 {
        errors.push(ConfigError::Validation {
            message: format!(
                "worker.max_attempts must be at least 1, got {}",
                config.worker.max_attempts
            ),
        });
    }

    if config.worker.small_file_threshold_bytes < 0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "worker.small_file_threshold_bytes must be non-negative, got {}",
                config.worker.small_file_threshold_bytes
            ),
        });
    }

    if config.worker.stale_after_minutes < 1 {
        errors.push(ConfigError::Validation {
            message: format!(
                "worker.stale_after_minutes must be at least 1, got {}",
                config.worker.stale_after_minutes
            ),
        });
    }

    // A webdav storage mode without a configured URL can never mirror anything.
    if config.storage.mode.saves_webdav() && config.webdav.url.is_none() {
        errors.push(ConfigError::Validation {
            message: "storage.mode includes webdav but webdav.url is not set".to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StorageMode;

    #[test]
    fn default_config_is_valid() {
        let config = ArkivConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn webdav_mode_requires_url() {
        let mut config = ArkivConfig::default();
        config.storage.mode = StorageMode::Both;
        let errors = validate_config(&config).unwrap_err();
        assert!(
            errors
                .iter()
                .any(|e| e.to_string().contains("webdav.url")),
            "expected a webdav.url validation error"
        );
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let mut config = ArkivConfig::default();
        config.worker.max_concurrent_downloads = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn collects_multiple_errors() {
        let mut config = ArkivConfig::default();
        config.storage.database_path = "  ".into();
        config.worker.max_attempts = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.len() >= 2);
    }
}
