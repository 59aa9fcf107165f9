//! Content-addressed download cache for manifest artifacts.
//!
//! Files are stored as `<sha256>--<filename>` under the downloads directory,
//! keyed by the hash of the bytes actually received. A cache hit is only
//! reported after the stored file has been re-hashed.

mod download;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

pub(crate) use download::fetch_artifact;

pub(crate) const HTTP_TIMEOUT: Duration = Duration::from_secs(300);
const USER_AGENT: &str = concat!("vinst/", env!("CARGO_PKG_VERSION"));

#[derive(Clone, Copy, Debug)]
pub struct FetchRequest<'a> {
    pub name: &'a str,
    pub url: &'a str,
    pub filename: &'a str,
    /// Expected hash, used to look the artifact up in the cache.
    pub sha256: &'a str,
    pub online: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedArtifact {
    pub path: PathBuf,
    /// Hash of the bytes on disk, which may differ from the expected one.
    pub sha256: String,
    pub size: u64,
    pub from_cache: bool,
}

pub(crate) fn cache_file_name(sha256: &str, filename: &str) -> String {
    format!("{sha256}--{filename}")
}

pub(crate) fn cached_path(dest_dir: &Path, sha256: &str, filename: &str) -> PathBuf {
    dest_dir.join(cache_file_name(sha256, filename))
}

pub fn http_client() -> Result<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(HTTP_TIMEOUT)
        .build()
        .context("failed to build http client")
}
