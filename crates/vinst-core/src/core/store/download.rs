use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use url::Url;

use super::{cached_path, http_client, FetchRequest, FetchedArtifact};

const BUFFER_SIZE: usize = 64 * 1024;

/// Fetches `request` into `dest_dir` without comparing hashes; callers decide
/// what a mismatch means.
pub(crate) fn fetch_artifact(dest_dir: &Path, request: &FetchRequest<'_>) -> Result<FetchedArtifact> {
    fs::create_dir_all(dest_dir)
        .with_context(|| format!("creating download cache {}", dest_dir.display()))?;

    let cached = cached_path(dest_dir, request.sha256, request.filename);
    if cached.is_file() {
        let (actual, size) = sha256_file(&cached)?;
        if actual == request.sha256 {
            debug!(name = request.name, path = %cached.display(), "using cached artifact");
            return Ok(FetchedArtifact {
                path: cached,
                sha256: actual,
                size,
                from_cache: true,
            });
        }
        warn!(name = request.name, path = %cached.display(), "discarding corrupt cache entry");
        fs::remove_file(&cached)
            .with_context(|| format!("removing corrupt cache entry {}", cached.display()))?;
    }

    let mut tmp = NamedTempFile::new_in(dest_dir)?;
    let (sha256, size) = match local_source(request.url) {
        Some(path) => {
            let mut src = File::open(&path)
                .with_context(|| format!("failed to open local artifact at {}", path.display()))?;
            copy_hashing(&mut src, tmp.as_file_mut(), request.filename)?
        }
        None => {
            if !request.online {
                bail!(
                    "network access disabled (VINST_ONLINE=0) and {} is not cached",
                    request.url
                );
            }
            download_once(request, tmp.as_file_mut())?
        }
    };

    let dest = cached_path(dest_dir, &sha256, request.filename);
    tmp.persist(&dest)
        .map_err(|err| err.error)
        .with_context(|| format!("storing {}", dest.display()))?;
    debug!(name = request.name, path = %dest.display(), size, "fetched artifact");
    Ok(FetchedArtifact {
        path: dest,
        sha256,
        size,
        from_cache: false,
    })
}

fn download_once(request: &FetchRequest<'_>, out: &mut File) -> Result<(String, u64)> {
    let client = http_client()?;
    let mut response = client
        .get(request.url)
        .send()
        .with_context(|| format!("failed to fetch {}", request.url))?
        .error_for_status()
        .with_context(|| format!("unexpected response for {}", request.url))?;
    copy_hashing(&mut response, out, request.filename)
}

fn copy_hashing(reader: &mut dyn Read, out: &mut File, label: &str) -> Result<(String, u64)> {
    let mut hasher = Sha256::new();
    let mut buffer = vec![0_u8; BUFFER_SIZE];
    let mut size = 0_u64;
    loop {
        let read = reader
            .read(&mut buffer)
            .with_context(|| format!("stream error for {label}"))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
        out.write_all(&buffer[..read])?;
        size += read as u64;
    }
    out.flush()?;
    Ok((hex::encode(hasher.finalize()), size))
}

/// Hashes a file on disk, returning its sha256 and size.
pub(crate) fn sha256_file(path: &Path) -> Result<(String, u64)> {
    let mut file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0_u8; BUFFER_SIZE];
    let mut size = 0_u64;
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
        size += read as u64;
    }
    Ok((hex::encode(hasher.finalize()), size))
}

fn local_source(raw: &str) -> Option<PathBuf> {
    if raw.starts_with("file://") {
        return Url::parse(raw).ok()?.to_file_path().ok();
    }
    let path = Path::new(raw);
    path.is_absolute().then(|| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest(bytes: &[u8]) -> String {
        hex::encode(Sha256::digest(bytes))
    }

    fn request<'a>(url: &'a str, sha256: &'a str, online: bool) -> FetchRequest<'a> {
        FetchRequest {
            name: "demo",
            url,
            filename: "demo-1.0.tar.gz",
            sha256,
            online,
        }
    }

    #[test]
    fn fetches_local_path_into_cache() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let source = temp.path().join("demo-1.0.tar.gz");
        fs::write(&source, b"demo archive")?;
        let expected = digest(b"demo archive");
        let cache = temp.path().join("cache");
        let url = source.display().to_string();

        let fetched = fetch_artifact(&cache, &request(&url, &expected, false))?;
        assert_eq!(fetched.sha256, expected);
        assert_eq!(fetched.size, 12);
        assert!(!fetched.from_cache);
        assert_eq!(
            fetched.path,
            cache.join(format!("{expected}--demo-1.0.tar.gz"))
        );

        let again = fetch_artifact(&cache, &request(&url, &expected, false))?;
        assert!(again.from_cache);
        assert_eq!(again.path, fetched.path);
        Ok(())
    }

    #[test]
    fn file_urls_are_supported() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let source = temp.path().join("demo-1.0.tar.gz");
        fs::write(&source, b"bytes")?;
        let url = Url::from_file_path(&source)
            .map_err(|()| anyhow::anyhow!("file url"))?
            .to_string();
        let expected = digest(b"bytes");
        let fetched = fetch_artifact(&temp.path().join("cache"), &request(&url, &expected, true))?;
        assert_eq!(fetched.sha256, expected);
        Ok(())
    }

    #[test]
    fn mismatched_content_reports_actual_hash() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let source = temp.path().join("demo-1.0.tar.gz");
        fs::write(&source, b"tampered")?;
        let declared = digest(b"original");
        let url = source.display().to_string();
        let fetched = fetch_artifact(&temp.path().join("cache"), &request(&url, &declared, false))?;
        assert_eq!(fetched.sha256, digest(b"tampered"));
        assert_ne!(fetched.sha256, declared);
        Ok(())
    }

    #[test]
    fn corrupt_cache_entries_are_replaced() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let source = temp.path().join("demo-1.0.tar.gz");
        fs::write(&source, b"good")?;
        let expected = digest(b"good");
        let cache = temp.path().join("cache");
        fs::create_dir_all(&cache)?;
        let entry = cached_path(&cache, &expected, "demo-1.0.tar.gz");
        fs::write(&entry, b"bad")?;

        let url = source.display().to_string();
        let fetched = fetch_artifact(&cache, &request(&url, &expected, false))?;
        assert!(!fetched.from_cache);
        assert_eq!(fs::read(&entry)?, b"good");
        Ok(())
    }

    #[test]
    fn offline_mode_refuses_network_downloads() {
        let temp = tempfile::tempdir().expect("tempdir");
        let hash = digest(b"x");
        let err = fetch_artifact(
            temp.path(),
            &request("https://example.invalid/demo-1.0.tar.gz", &hash, false),
        )
        .expect_err("offline");
        assert!(err.to_string().contains("VINST_ONLINE=0"), "{err}");
    }
}
