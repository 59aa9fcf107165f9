use atty::Stream;
use color_eyre::Result;
use serde_json::Value;
use vinst_core::{CommandGroup, CommandInfo, CommandStatus, ExecutionOutcome};

use crate::style::Style;

#[derive(Clone, Copy, Debug)]
pub struct OutputOptions {
    pub quiet: bool,
    pub json: bool,
    pub no_color: bool,
}

pub fn emit_output(opts: &OutputOptions, info: CommandInfo, outcome: &ExecutionOutcome) -> Result<i32> {
    let code = outcome.exit_code();
    let style = Style::new(opts.no_color, atty::is(Stream::Stdout));

    if opts.json {
        let payload = vinst_core::to_json_response(info, outcome);
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(code);
    }

    if outcome.status != CommandStatus::Ok {
        // errors reach stderr even with --quiet
        let message = vinst_core::format_status_message(info, &outcome.message);
        eprintln!("{}", style.status(&outcome.status, &message));
        for issue in issues_from_details(&outcome.details) {
            eprintln!("  • {issue}");
        }
        if let Some(output) = outcome.details.get("output").and_then(Value::as_str) {
            if !output.trim().is_empty() {
                eprintln!("{}", style.detail(output.trim_end()));
            }
        }
        if let Some(hint) = hint_from_details(&outcome.details) {
            eprintln!("{}", style.info(&format!("Hint: {hint}")));
        }
        return Ok(code);
    }

    if opts.quiet {
        return Ok(code);
    }
    if is_passthrough(&outcome.details) {
        println!("{}", outcome.message);
    } else {
        let message = vinst_core::format_status_message(info, &outcome.message);
        println!("{}", style.status(&outcome.status, &message));
        if let Some(table) = render_package_table(&style, info, &outcome.details) {
            println!("{table}");
        }
        if let Some(entry) = outcome.details.get("entry_point").and_then(Value::as_str) {
            println!("{}", style.info(&format!("entry point: {entry}")));
        }
    }
    Ok(code)
}

fn hint_from_details(details: &Value) -> Option<&str> {
    details
        .as_object()
        .and_then(|map| map.get("hint"))
        .and_then(Value::as_str)
}

fn issues_from_details(details: &Value) -> Vec<&str> {
    details
        .get("issues")
        .and_then(Value::as_array)
        .map(|issues| issues.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

fn is_passthrough(details: &Value) -> bool {
    details
        .as_object()
        .and_then(|map| map.get("passthrough"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn render_package_table(style: &Style, info: CommandInfo, details: &Value) -> Option<String> {
    if info.group != CommandGroup::Install || details.get("reused")?.as_bool()? {
        return None;
    }
    let packages = details.get("packages")?.as_array()?;
    if packages.is_empty() {
        return None;
    }

    let mut rows = Vec::with_capacity(packages.len());
    for pkg in packages {
        rows.push(["name", "build", "role"].map(|key| {
            pkg.get(key)
                .and_then(Value::as_str)
                .unwrap_or("-")
                .to_string()
        }));
    }
    Some(format_table(style, ["Package", "Build", "Role"], &rows))
}

fn format_table<const N: usize>(style: &Style, headers: [&str; N], rows: &[[String; N]]) -> String {
    let mut widths = headers.map(str::len);
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }
    let mut lines = vec![
        style.table_header(&render_row(headers.iter().copied(), widths)),
        widths.map(|width| "-".repeat(width)).join("  "),
    ];
    lines.extend(
        rows.iter()
            .map(|row| render_row(row.iter().map(String::as_str), widths)),
    );
    lines.join("\n")
}

fn render_row<'a, const N: usize>(cells: impl Iterator<Item = &'a str>, widths: [usize; N]) -> String {
    let padded: Vec<String> = cells
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect();
    padded.join("  ").trim_end().to_string()
}
