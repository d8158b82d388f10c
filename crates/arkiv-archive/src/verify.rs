// SPDX-FileCopyrightText: 2026 Arkiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Artifact verification and atomic placement.
//!
//! Downloads land in a `.part` sibling first and are renamed into place only
//! once complete, so a crash mid-transfer never leaves a plausible-looking
//! artifact at the final path.

use std::path::{Path, PathBuf};

use arkiv_core::ArkivError;
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;
use tracing::warn;

/// The in-progress sibling of a target path (`name.ext` -> `name.ext.part`).
pub fn part_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Rename a completed `.part` file into its final place, creating parent
/// directories as needed.
pub async fn commit_part(part: &Path, target: &Path) -> Result<(), ArkivError> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ArkivError::archive_io("creating archive directory", e))?;
    }
    tokio::fs::rename(part, target)
        .await
        .map_err(|e| ArkivError::archive_io("moving download into place", e))
}

/// Check the artifact exists and (when a size is declared) has that exact
/// size. Returns the actual size on success.
pub async fn verify_size(path: &Path, expected: Option<i64>) -> Result<i64, ArkivError> {
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|e| ArkivError::archive_io("reading artifact metadata", e))?;
    let actual = meta.len() as i64;
    if let Some(expected) = expected
        && actual != expected
    {
        warn!(path = %path.display(), expected, actual, "artifact size mismatch");
        return Err(ArkivError::SizeMismatch {
            path: path.to_path_buf(),
            expected,
            actual,
        });
    }
    Ok(actual)
}

/// Streaming SHA-256 of a file, hex-encoded.
pub async fn sha256_file(path: &Path) -> Result<String, ArkivError> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| ArkivError::archive_io("opening artifact for hashing", e))?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = file
            .read(&mut buf)
            .await
            .map_err(|e| ArkivError::archive_io("reading artifact for hashing", e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn part_then_commit_places_file_atomically() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("nested/deep/file.bin");
        let part = part_path(&target);
        assert_eq!(part, dir.path().join("nested/deep/file.bin.part"));

        tokio::fs::create_dir_all(part.parent().unwrap()).await.unwrap();
        tokio::fs::write(&part, b"payload").await.unwrap();
        commit_part(&part, &target).await.unwrap();

        assert!(target.exists());
        assert!(!part.exists());
        assert_eq!(verify_size(&target, Some(7)).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn size_mismatch_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f.bin");
        tokio::fs::write(&path, b"abc").await.unwrap();

        assert_eq!(verify_size(&path, Some(3)).await.unwrap(), 3);
        assert_eq!(verify_size(&path, None).await.unwrap(), 3);
        assert!(matches!(
            verify_size(&path, Some(99)).await,
            Err(ArkivError::SizeMismatch { expected: 99, actual: 3, .. })
        ));
        assert!(verify_size(&dir.path().join("missing"), None).await.is_err());
    }

    #[tokio::test]
    async fn sha256_matches_known_digest() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f.bin");
        tokio::fs::write(&path, b"hello world").await.unwrap();
        assert_eq!(
            sha256_file(&path).await.unwrap(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }
}
