// SPDX-FileCopyrightText: 2026 Arkiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration error diagnostics rendered via miette.

use miette::Diagnostic;
use thiserror::Error;

/// A configuration error suitable for user-facing diagnostic output.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// The configuration failed to parse or deserialize.
    #[error("failed to load configuration: {message}")]
    #[diagnostic(
        code(arkiv::config::parse),
        help("check arkiv.toml for typos; run with ARKIV_* env vars to override")
    )]
    Parse { message: String },

    /// A semantic constraint on a parsed value was violated.
    #[error("validation error: {message}")]
    #[diagnostic(code(arkiv::config::validation))]
    Validation { message: String },
}

/// Convert a figment extraction error into diagnostic errors.
pub fn figment_to_config_errors(err: figment::Error) -> Vec<ConfigError> {
    err.into_iter()
        .map(|e| ConfigError::Parse {
            message: e.to_string(),
        })
        .collect()
}

/// Render collected configuration errors to stderr.
pub fn render_errors(errors: &[ConfigError]) {
    for error in errors {
        eprintln!("{:?}", miette::Report::msg(error.to_string()));
    }
}
