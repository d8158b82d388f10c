// SPDX-FileCopyrightText: 2026 Arkiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports the XDG hierarchy: `./arkiv.toml` > `~/.config/arkiv/arkiv.toml`
//! > `/etc/arkiv/arkiv.toml`, with environment variable overrides via the
//! `ARKIV_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::ArkivConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/arkiv/arkiv.toml` (system-wide)
/// 3. `~/.config/arkiv/arkiv.toml` (user XDG config)
/// 4. `./arkiv.toml` (local directory)
/// 5. `ARKIV_*` environment variables
pub fn load_config() -> Result<ArkivConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ArkivConfig::default()))
        .merge(Toml::file("/etc/arkiv/arkiv.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("arkiv/arkiv.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("arkiv.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<ArkivConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ArkivConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ArkivConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ArkivConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` so underscore-containing
/// key names stay intact: `ARKIV_TELEGRAM_BOT_TOKEN` must map to
/// `telegram.bot_token`, not `telegram.bot.token`.
fn env_provider() -> Env {
    Env::prefixed("ARKIV_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("telegram_", "telegram.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("worker_", "worker.", 1)
            .replacen("webdav_", "webdav.", 1);
        mapped.into()
    })
}
