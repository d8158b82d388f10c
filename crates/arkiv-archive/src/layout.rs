// SPDX-FileCopyrightText: 2026 Arkiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic archive layout.
//!
//! Paths depend only on their inputs, so re-processing a job lands on the
//! same file, and distinct content ids can never collide.

use std::path::{Path, PathBuf};

use arkiv_core::SourceKind;

const MAX_NAME_LEN: usize = 64;
const MAX_EXT_LEN: usize = 10;

/// Reduce a user-supplied name to a safe filename component.
///
/// Keeps CJK ideographs, ASCII letters and digits, and `._-`; maps spaces to
/// underscores and drops everything else. Runs of underscores collapse,
/// leading/trailing `_` and `.` are trimmed, and the result is truncated to
/// 64 characters while preserving a short extension.
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_underscore = false;
    for c in name.chars() {
        let kept = if c == ' ' {
            Some('_')
        } else if c.is_ascii_alphanumeric()
            || matches!(c, '.' | '_' | '-')
            || ('\u{4e00}'..='\u{9fff}').contains(&c)
        {
            Some(c)
        } else {
            None
        };
        if let Some(c) = kept {
            if c == '_' {
                if prev_underscore {
                    continue;
                }
                prev_underscore = true;
            } else {
                prev_underscore = false;
            }
            out.push(c);
        }
    }

    let trimmed = out.trim_matches(['_', '.']);
    truncate_preserving_ext(trimmed, MAX_NAME_LEN)
}

fn truncate_preserving_ext(name: &str, max: usize) -> String {
    if name.chars().count() <= max {
        return name.to_string();
    }
    if let Some(dot) = name.rfind('.') {
        let ext = &name[dot + 1..];
        let ext_len = ext.chars().count();
        if ext_len > 0 && ext_len <= MAX_EXT_LEN {
            let stem: String = name[..dot].chars().take(max - ext_len - 1).collect();
            return format!("{stem}.{ext}");
        }
    }
    name.chars().take(max).collect()
}

/// Compute the archive directory and full path for a file.
///
/// Directory: `{root}/{kind}/{chat_id}_{title}` (or just `{chat_id}` when no
/// usable title). Filename: `{content_id}__{name}` (or `{content_id}.bin`
/// when no usable name). The content id prefix makes paths injective across
/// distinct files regardless of name collisions.
pub fn archive_path(
    root: &Path,
    kind: SourceKind,
    chat_id: i64,
    title: Option<&str>,
    content_id: &str,
    name: Option<&str>,
) -> (PathBuf, PathBuf) {
    let title = title.map(sanitize_filename).unwrap_or_default();
    let dir_name = if title.is_empty() {
        chat_id.to_string()
    } else {
        format!("{chat_id}_{title}")
    };
    let dir = root.join(kind.to_string()).join(dir_name);

    let filename = match name.map(sanitize_filename).filter(|n| !n.is_empty()) {
        Some(n) => format!("{content_id}__{n}"),
        None => format!("{content_id}.bin"),
    };
    let path = dir.join(filename);
    (dir, path)
}
