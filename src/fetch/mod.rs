//! Artifact fetching.
//!
//! [`fetch_http_file`] is an idempotent download: if the destination file
//! already exists it is returned untouched, with no freshness check.
//! [`fetch_remote_dir`] mirrors a remote directory tree with `wget`.

mod http;
mod mirror;

use std::fs::{self, File};
use std::io::{self, Read};

use anyhow::Result;
use camino::{Utf8Path, Utf8PathBuf};
use tracing::info;

use crate::error::RsprovisionError;

pub use http::ReqwestFetcher;
pub use mirror::{MirrorPlan, fetch_remote_dir};

/// HTTP access used by the fetchers.
pub trait HttpFetch: Send + Sync {
    /// Opens `url` for a streaming read. Non-success statuses are errors.
    fn open(&self, url: &str) -> Result<Box<dyn Read>, RsprovisionError>;

    /// Returns true if `url` answers with a success or redirect status.
    ///
    /// Unreachable hosts are reported as `Ok(false)`, not as errors.
    fn exists(&self, url: &str) -> Result<bool, RsprovisionError>;
}

/// Joins a base URL and a file name with exactly one `/`.
pub fn join_url(base_url: &str, file_name: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), file_name.trim_start_matches('/'))
}

/// Downloads `base_url/file_name` into `dest_dir`, unless it is already there.
///
/// Returns the local path in both cases. The destination directory is
/// created if missing. A failed transfer removes the partial file so a
/// later call retries instead of treating it as fetched.
pub fn fetch_http_file(
    fetcher: &dyn HttpFetch,
    base_url: &str,
    file_name: &str,
    dest_dir: &Utf8Path,
) -> Result<Utf8PathBuf, RsprovisionError> {
    if file_name.is_empty() || file_name.contains('/') {
        return Err(RsprovisionError::Validation(format!(
            "file name must be a single path component: {:?}",
            file_name
        )));
    }

    fs::create_dir_all(dest_dir)
        .map_err(|e| RsprovisionError::io(format!("failed to create {}", dest_dir), e))?;

    let src = join_url(base_url, file_name);
    let dst = dest_dir.join(file_name);

    if dst.exists() {
        info!("Already fetched {}", dst);
        return Ok(dst);
    }

    info!("Fetching: {}", src);
    info!("  and saving to {}", dst);

    let mut remote = fetcher.open(&src)?;
    let mut file = File::create(&dst)
        .map_err(|e| RsprovisionError::io(format!("failed to create {}", dst), e))?;

    if let Err(e) = io::copy(&mut remote, &mut file) {
        drop(file);
        if let Err(rm) = fs::remove_file(&dst) {
            tracing::warn!("failed to remove partial download {}: {}", dst, rm);
        }
        return Err(RsprovisionError::fetch(src, e));
    }

    Ok(dst)
}
