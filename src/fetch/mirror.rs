//! Recursive directory mirroring through `wget`.

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use tracing::info;
use url::Url;

use crate::error::RsprovisionError;
use crate::executor::{CommandExecutor, CommandSpec, OutputLevel};

/// How a remote directory URL maps onto the local mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorPlan {
    /// The URL, always ending with `/`.
    pub url: String,
    /// Name of the last directory in the URL path; the mirror lands in `dest_dir/leaf`.
    pub leaf: String,
    /// Number of leading path directories `wget` should drop.
    pub cut_dirs: usize,
}

impl MirrorPlan {
    /// Derives the plan for `url`.
    ///
    /// The path is split on `/` with its leading empty element standing in
    /// for the host, so `segment_count - 2` cuts everything above the leaf.
    /// Only the leaf directory level is reproduced locally; deeper layouts
    /// under the leaf are mirrored as-is. Empty segments (`a//b`) are
    /// dropped before counting, so they never shift the cut.
    pub fn new(url: &str) -> Result<Self, RsprovisionError> {
        let mut normalized = url.to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }

        let parsed = Url::parse(&normalized).map_err(|e| {
            RsprovisionError::Validation(format!("invalid mirror URL {}: {}", url, e))
        })?;
        let chunks: Vec<&str> = parsed
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        let Some(leaf) = chunks.last() else {
            return Err(RsprovisionError::Validation(format!(
                "mirror URL has no directory to fetch: {}",
                url
            )));
        };

        let segment_count = chunks.len() + 1;
        Ok(Self {
            url: normalized,
            leaf: (*leaf).to_string(),
            cut_dirs: segment_count - 2,
        })
    }

    /// Builds the `wget` invocation that mirrors into `dest_dir`.
    pub fn command(&self, dest_dir: &Utf8Path) -> CommandSpec {
        let args = vec![
            "-nv".to_string(),
            "-P".to_string(),
            dest_dir.to_string(),
            "--reject".to_string(),
            "index.html*,*.gif".to_string(),
            format!("--cut-dirs={}", self.cut_dirs),
            "-np".to_string(),
            "-nH".to_string(),
            "--no-check-certificate".to_string(),
            "-r".to_string(),
            self.url.clone(),
        ];
        CommandSpec::new("wget", args).with_output(OutputLevel::Debug)
    }
}

/// Mirrors the remote directory at `url` into `dest_dir`.
///
/// Returns `dest_dir/<leaf>`, where `<leaf>` is the last directory of the URL.
/// A non-zero `wget` exit fails the call with the URL and exit code.
pub fn fetch_remote_dir(
    executor: &dyn CommandExecutor,
    url: &str,
    dest_dir: &Utf8Path,
) -> Result<Utf8PathBuf> {
    let plan = MirrorPlan::new(url)?;
    let dst = dest_dir.join(&plan.leaf);
    let spec = plan.command(dest_dir);

    info!("Fetching remote directory: {}", plan.url);
    info!("  and saving to {}", dst);
    info!("  using command: {}", spec.display());

    let result = executor
        .execute(&spec)
        .with_context(|| format!("failed to run wget for {}", plan.url))?;
    if !result.success() {
        return Err(RsprovisionError::Execution {
            command: format!("fetch_remote_dir {}", plan.url),
            status: match result.code() {
                Some(code) => format!("exit code {}", code),
                None => "terminated by signal".to_string(),
            },
        }
        .into());
    }

    Ok(dst)
}
