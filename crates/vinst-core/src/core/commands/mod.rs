mod fetch;
mod info;
mod install;
mod smoke;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use serde_json::{json, Value};
use tracing::debug;
use vinst_domain::{load_manifest, Manifest, ManifestError};

use crate::config::context::CommandContext;
use crate::config::GlobalOptions;
use crate::effects::SystemEffects;
use crate::formula::{bundled_manifest, BUNDLED_MANIFEST_NAME};
use crate::install::{InstallError, InstallPhase};
use crate::outcome::{CommandStatus, ExecutionOutcome};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandGroup {
    Install,
    Test,
    Fetch,
    Info,
}

impl CommandGroup {
    pub const fn as_str(self) -> &'static str {
        match self {
            CommandGroup::Install => "install",
            CommandGroup::Test => "test",
            CommandGroup::Fetch => "fetch",
            CommandGroup::Info => "info",
        }
    }
}

impl fmt::Display for CommandGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug)]
pub struct CommandInfo {
    pub group: CommandGroup,
    pub name: &'static str,
}

impl CommandInfo {
    #[must_use]
    pub const fn new(group: CommandGroup, name: &'static str) -> Self {
        Self { group, name }
    }
}

/// Where a command reads its manifest from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ManifestSource {
    /// The dbt-snowflake manifest compiled into the binary.
    Bundled,
    Path(PathBuf),
}

impl ManifestSource {
    pub fn from_arg(path: Option<PathBuf>) -> Self {
        path.map_or(Self::Bundled, Self::Path)
    }

    pub fn label(&self) -> String {
        match self {
            Self::Bundled => format!("{BUNDLED_MANIFEST_NAME} (bundled)"),
            Self::Path(path) => path.display().to_string(),
        }
    }

    pub fn load(&self) -> Result<Manifest, ManifestError> {
        match self {
            Self::Bundled => bundled_manifest(),
            Self::Path(path) => load_manifest(path),
        }
    }
}

#[derive(Clone, Debug)]
pub struct VinstCommand {
    pub group: CommandGroup,
    pub manifest: ManifestSource,
}

impl VinstCommand {
    pub fn new(group: CommandGroup, manifest: ManifestSource) -> Self {
        Self { group, manifest }
    }

    pub fn info(&self) -> CommandInfo {
        CommandInfo::new(self.group, self.group.as_str())
    }
}

/// Runs `command` against the real system.
///
/// # Errors
/// Returns an error when configuration cannot be prepared or the command
/// fails in a way that has no structured outcome.
pub fn execute(global: &GlobalOptions, command: &VinstCommand) -> Result<ExecutionOutcome> {
    let ctx = CommandContext::new(global, Arc::new(SystemEffects::new()))?;
    execute_with(&ctx, command)
}

/// Runs `command` with the effects and configuration carried by `ctx`.
///
/// # Errors
/// Returns an error for failures outside the install error model, such as an
/// unreadable receipt.
pub fn execute_with(ctx: &CommandContext<'_>, command: &VinstCommand) -> Result<ExecutionOutcome> {
    let manifest = match command.manifest.load() {
        Ok(manifest) => manifest,
        Err(err) => return Ok(manifest_error_outcome(&command.manifest, &err)),
    };
    debug!(
        command = %command.group,
        manifest = %command.manifest.label(),
        resources = manifest.resources.len(),
        "loaded manifest"
    );
    match command.group {
        CommandGroup::Install => install::install(ctx, &manifest),
        CommandGroup::Test => smoke::smoke(ctx, &manifest),
        CommandGroup::Fetch => fetch::fetch(ctx, &manifest),
        CommandGroup::Info => info::info(ctx, &manifest),
    }
}

pub(crate) fn manifest_error_outcome(source: &ManifestSource, err: &ManifestError) -> ExecutionOutcome {
    let label = source.label();
    match err {
        ManifestError::Invalid(issues) => ExecutionOutcome::user_error(
            format!("manifest {label} is invalid"),
            json!({
                "reason": "invalid_manifest",
                "manifest": label,
                "issues": issues.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "hint": "fix the listed fields and rerun the command",
            }),
        ),
        ManifestError::Syntax(_) => ExecutionOutcome::user_error(
            format!("manifest {label} is not valid TOML"),
            json!({
                "reason": "invalid_manifest",
                "manifest": label,
                "error": err.to_string(),
            }),
        ),
        ManifestError::Read { .. } => ExecutionOutcome::user_error(
            format!("manifest {label} could not be read"),
            json!({
                "reason": "missing_manifest",
                "manifest": label,
                "error": err.to_string(),
            }),
        ),
    }
}

pub(crate) fn install_error_outcome(err: &InstallError, phase: Option<InstallPhase>) -> ExecutionOutcome {
    let details = err.details(phase);
    if err.is_user_error() {
        ExecutionOutcome::user_error(err.to_string(), details)
    } else {
        ExecutionOutcome::failure(err.to_string(), details)
    }
}

#[must_use]
pub fn to_json_response(info: CommandInfo, outcome: &ExecutionOutcome) -> Value {
    let status = match outcome.status {
        CommandStatus::Ok => "ok",
        CommandStatus::UserError => "user-error",
        CommandStatus::Failure => "error",
    };
    let details = match &outcome.details {
        Value::Object(_) => outcome.details.clone(),
        Value::Null => json!({}),
        other => json!({ "value": other }),
    };
    json!({
        "status": status,
        "message": format_status_message(info, &outcome.message),
        "details": details,
    })
}

#[must_use]
pub fn format_status_message(info: CommandInfo, message: &str) -> String {
    let prefix = format!("vinst {}", info.name);
    if message.is_empty() {
        prefix
    } else if message.starts_with(&prefix) {
        message.to_string()
    } else {
        format!("{prefix}: {message}")
    }
}
