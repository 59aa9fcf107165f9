use anyhow::Result;
use serde_json::json;
use tracing::warn;
use vinst_domain::Manifest;

use super::install_error_outcome;
use crate::config::context::CommandContext;
use crate::install::Installer;
use crate::outcome::ExecutionOutcome;

pub(super) fn install(ctx: &CommandContext<'_>, manifest: &Manifest) -> Result<ExecutionOutcome> {
    let mut installer = Installer::from_context(ctx);
    let report = match installer.install(manifest) {
        Ok(report) => report,
        Err(err) => {
            let phase = installer.state().phase();
            warn!(phase = %phase, error = %err, "install aborted");
            return Ok(install_error_outcome(&err, Some(phase)));
        }
    };

    let message = if report.reused {
        format!("{} {} is already installed", report.name, report.version)
    } else {
        format!(
            "installed {} {} with {} dependencies",
            report.name,
            report.version,
            report.dependency_count()
        )
    };
    Ok(ExecutionOutcome::success(
        message,
        json!({
            "name": report.name,
            "version": report.version,
            "keg": report.keg.display().to_string(),
            "entry_point": report.entry_point.display().to_string(),
            "links": report
                .links
                .iter()
                .map(|path| path.display().to_string())
                .collect::<Vec<_>>(),
            "packages": report.packages,
            "installed": report.packages.len(),
            "reused": report.reused,
        }),
    ))
}
