use std::fmt::Write as _;

use anyhow::Result;
use serde_json::json;
use vinst_domain::{manifest_fingerprint, Manifest};

use crate::config::context::CommandContext;
use crate::config::InstallLayout;
use crate::install::InstallReceipt;
use crate::outcome::ExecutionOutcome;

pub(super) fn info(ctx: &CommandContext<'_>, manifest: &Manifest) -> Result<ExecutionOutcome> {
    let keg = ctx.layout().keg_root(manifest);
    let receipt = InstallReceipt::read(&InstallLayout::receipt_path(&keg))?
        .filter(|receipt| receipt.fingerprint == manifest_fingerprint(manifest));
    let source_build = manifest.source_resource().map(|spec| spec.name.clone());

    let mut text = format!("{} {}", manifest.name, manifest.version);
    if let Some(description) = &manifest.description {
        let _ = write!(text, "\n{description}");
    }
    if let Some(homepage) = &manifest.homepage {
        let _ = write!(text, "\nhomepage: {homepage}");
    }
    let _ = write!(text, "\nresources: {}", manifest.resources.len());
    if let Some(name) = &source_build {
        let _ = write!(text, "\nsource build: {name}");
    }
    if !manifest.links.is_empty() {
        let _ = write!(text, "\nlinks: {}", manifest.links.join(", "));
    }
    match &receipt {
        Some(receipt) => {
            let _ = write!(
                text,
                "\ninstalled: {} ({})",
                keg.display(),
                receipt.installed_at
            );
        }
        None => text.push_str("\ninstalled: no"),
    }

    Ok(ExecutionOutcome::success(
        text,
        json!({
            "passthrough": true,
            "name": manifest.name,
            "version": manifest.version,
            "description": manifest.description,
            "homepage": manifest.homepage,
            "python": manifest.runtime.python,
            "build_requires": manifest.runtime.build_requires,
            "resources": manifest.resources.len(),
            "source_build": source_build,
            "links": manifest.links,
            "keg": keg.display().to_string(),
            "installed": receipt.is_some(),
            "installed_at": receipt.as_ref().map(|receipt| receipt.installed_at.clone()),
        }),
    ))
}
