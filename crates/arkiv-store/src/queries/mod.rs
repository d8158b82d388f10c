// SPDX-FileCopyrightText: 2026 Arkiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. All functions take `&Database` and run inside the
//! single writer thread via `conn.call()`.

pub mod failures;
pub mod files;
pub mod jobs;
pub mod messages;
pub mod sources;

use std::str::FromStr;

/// Parse a stored status string, mapping unknown values to a conversion error.
pub(crate) fn parse_enum<T>(value: String) -> Result<T, rusqlite::Error>
where
    T: FromStr,
{
    T::from_str(&value).map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            format!("unrecognized stored value `{value}`").into(),
        )
    })
}
