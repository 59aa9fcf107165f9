use anyhow::Result;
use serde_json::json;
use tracing::debug;
use vinst_domain::{manifest_fingerprint, Manifest};

use crate::config::context::CommandContext;
use crate::config::InstallLayout;
use crate::install::InstallReceipt;
use crate::outcome::ExecutionOutcome;
use crate::smoke::run_smoke_test;

const OUTPUT_TAIL_LINES: usize = 20;

pub(super) fn smoke(ctx: &CommandContext<'_>, manifest: &Manifest) -> Result<ExecutionOutcome> {
    let keg = ctx.layout().keg_root(manifest);
    // unreadable receipts count as not installed
    let receipt = match InstallReceipt::read(&InstallLayout::receipt_path(&keg)) {
        Ok(receipt) => receipt,
        Err(err) => {
            debug!(error = %format!("{err:#}"), "ignoring unreadable receipt");
            None
        }
    }
    .filter(|receipt| receipt.fingerprint == manifest_fingerprint(manifest));
    let Some(receipt) = receipt else {
        return Ok(ExecutionOutcome::user_error(
            format!("{} {} is not installed", manifest.name, manifest.version),
            json!({
                "reason": "not_installed",
                "keg": keg.display().to_string(),
                "hint": "run `vinst install` with the same manifest first",
            }),
        ));
    };

    let report = run_smoke_test(ctx.effects().python(), &receipt.entry_point, &manifest.test)?;
    let command_line = std::iter::once(report.entry_point.display().to_string())
        .chain(report.args.iter().cloned())
        .collect::<Vec<_>>()
        .join(" ");
    let lines: Vec<&str> = report.output.lines().collect();
    let tail = lines[lines.len().saturating_sub(OUTPUT_TAIL_LINES)..].join("\n");
    let details = json!({
        "entry_point": report.entry_point.display().to_string(),
        "args": report.args,
        "code": report.code,
        "expected": report.expected,
        "output": tail,
    });
    if report.passed {
        Ok(ExecutionOutcome::success(
            format!("`{command_line}` passed"),
            details,
        ))
    } else if report.code == 0 {
        Ok(ExecutionOutcome::failure(
            format!(
                "`{command_line}` output did not contain {:?}",
                report.expected.as_deref().unwrap_or_default()
            ),
            details,
        ))
    } else {
        Ok(ExecutionOutcome::failure(
            format!("`{command_line}` failed with exit code {}", report.code),
            details,
        ))
    }
}
