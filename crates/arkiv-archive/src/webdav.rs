// SPDX-FileCopyrightText: 2026 Arkiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Optional WebDAV mirror sink.
//!
//! Mirrors archived files to a remote WebDAV collection, preserving the
//! archive-relative layout. Mirror failures are reported to the caller but
//! must never block local persistence.

use std::path::Path;

use arkiv_core::ArkivError;
use reqwest::{Method, StatusCode};
use tracing::{debug, warn};

/// Client for one WebDAV endpoint with basic-auth credentials.
pub struct WebdavClient {
    base_url: String,
    username: String,
    password: String,
    http: reqwest::Client,
}

/// The remote path a local artifact maps to: its path relative to the
/// archive root, or just the file name when outside it.
pub fn remote_path(archive_root: &Path, local_path: &Path) -> String {
    let relative = local_path
        .strip_prefix(archive_root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| {
            local_path
                .file_name()
                .map(Into::into)
                .unwrap_or_default()
        });
    let mut out = String::from("/");
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    out.push_str(&parts.join("/"));
    out
}

impl WebdavClient {
    pub fn new(url: &str, username: &str, password: &str) -> Result<Self, ArkivError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ArkivError::Archive {
                message: "building WebDAV client".into(),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            base_url: url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
            http,
        })
    }

    /// Ensure the collection chain for `remote_parent` exists.
    ///
    /// MKCOL per segment; 405 and 409 mean the collection already exists.
    /// Other statuses are logged and tolerated — the subsequent PUT is the
    /// authoritative failure signal.
    async fn ensure_collections(&self, remote_parent: &str) {
        let mkcol = match Method::from_bytes(b"MKCOL") {
            Ok(m) => m,
            Err(_) => return,
        };
        let mut current = String::new();
        for part in remote_parent.split('/').filter(|p| !p.is_empty()) {
            current.push('/');
            current.push_str(part);
            let url = format!("{}{}", self.base_url, current);
            let result = self
                .http
                .request(mkcol.clone(), &url)
                .basic_auth(&self.username, Some(&self.password))
                .send()
                .await;
            match result {
                Ok(resp)
                    if resp.status() == StatusCode::CREATED
                        || resp.status() == StatusCode::METHOD_NOT_ALLOWED
                        || resp.status() == StatusCode::CONFLICT => {}
                Ok(resp) => {
                    warn!(path = %current, status = %resp.status(), "MKCOL returned unexpected status");
                }
                Err(e) => {
                    warn!(path = %current, error = %e, "MKCOL request failed");
                }
            }
        }
    }

    /// Upload a local artifact to `remote` (e.g. `/channel/-1001_News/AQID.bin`).
    pub async fn mirror(&self, local_path: &Path, remote: &str) -> Result<(), ArkivError> {
        if let Some(pos) = remote.rfind('/')
            && pos > 0
        {
            self.ensure_collections(&remote[..pos]).await;
        }

        let body = tokio::fs::read(local_path)
            .await
            .map_err(|e| ArkivError::archive_io("reading artifact for mirror", e))?;

        let url = format!("{}{}", self.base_url, remote);
        let resp = self
            .http
            .put(&url)
            .basic_auth(&self.username, Some(&self.password))
            .body(body)
            .send()
            .await
            .map_err(|e| ArkivError::Archive {
                message: format!("WebDAV PUT {remote}"),
                source: Some(Box::new(e)),
            })?;

        match resp.status() {
            StatusCode::OK | StatusCode::CREATED | StatusCode::NO_CONTENT => {
                debug!(remote, "mirrored to WebDAV");
                Ok(())
            }
            status => Err(ArkivError::Archive {
                message: format!("WebDAV PUT {remote} returned HTTP {status}"),
                source: None,
            }),
        }
    }
}
