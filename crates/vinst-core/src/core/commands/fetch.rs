use anyhow::Result;
use serde_json::json;
use tracing::info;
use vinst_domain::Manifest;

use super::install_error_outcome;
use crate::config::context::CommandContext;
use crate::install::fetch_verified;
use crate::outcome::ExecutionOutcome;

/// Downloads and verifies every artifact without touching any environment.
pub(super) fn fetch(ctx: &CommandContext<'_>, manifest: &Manifest) -> Result<ExecutionOutcome> {
    let downloads = ctx.layout().downloads_dir();
    let mut artifacts = Vec::new();
    let mut cached = 0_usize;
    let mut bytes = 0_u64;
    for spec in manifest.artifacts() {
        let fetched = match fetch_verified(
            ctx.effects().fetcher(),
            &downloads,
            spec,
            ctx.is_online(),
        ) {
            Ok(fetched) => fetched,
            Err(err) => return Ok(install_error_outcome(&err, None)),
        };
        info!(name = %spec.name, cached = fetched.from_cache, "verified");
        if fetched.from_cache {
            cached += 1;
        }
        bytes += fetched.size;
        artifacts.push(json!({
            "name": spec.name,
            "path": fetched.path.display().to_string(),
            "sha256": fetched.sha256,
            "size": fetched.size,
            "cached": fetched.from_cache,
        }));
    }

    Ok(ExecutionOutcome::success(
        format!(
            "verified {} artifacts for {} {} ({cached} cached)",
            artifacts.len(),
            manifest.name,
            manifest.version
        ),
        json!({
            "downloads": downloads.display().to_string(),
            "artifacts": artifacts,
            "cached": cached,
            "bytes": bytes,
        }),
    ))
}
