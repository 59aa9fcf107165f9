use color_eyre::Result;
use vinst_core::{
    CommandGroup, CommandInfo, ExecutionOutcome, GlobalOptions, InstallUserError, ManifestSource,
    VinstCommand,
};

use crate::cli::{CommandGroupCli, ManifestArgs};

pub fn build_command(group: &CommandGroupCli) -> VinstCommand {
    let (group, args) = match group {
        CommandGroupCli::Install(args) => (CommandGroup::Install, args),
        CommandGroupCli::Test(args) => (CommandGroup::Test, args),
        CommandGroupCli::Fetch(args) => (CommandGroup::Fetch, args),
        CommandGroupCli::Info(args) => (CommandGroup::Info, args),
    };
    VinstCommand::new(group, manifest_source(args))
}

fn manifest_source(args: &ManifestArgs) -> ManifestSource {
    ManifestSource::from_arg(args.manifest.clone())
}

pub fn dispatch_command(
    global: &GlobalOptions,
    command: &VinstCommand,
) -> Result<(CommandInfo, ExecutionOutcome)> {
    let info = command.info();
    core_call(info, || vinst_core::execute(global, command))
}

fn core_call<F>(info: CommandInfo, action: F) -> Result<(CommandInfo, ExecutionOutcome)>
where
    F: FnOnce() -> anyhow::Result<ExecutionOutcome>,
{
    match action() {
        Ok(outcome) => Ok((info, outcome)),
        Err(err) => {
            if let Some(user) = err.downcast_ref::<InstallUserError>() {
                return Ok((
                    info,
                    ExecutionOutcome::user_error(
                        user.message().to_string(),
                        user.details().clone(),
                    ),
                ));
            }
            let issues: Vec<String> = err.chain().map(ToString::to_string).collect();
            Ok((
                info,
                ExecutionOutcome::failure(
                    err.to_string(),
                    serde_json::json!({
                        "reason": "internal_error",
                        "error": err.to_string(),
                        "issues": issues,
                        "hint": "Re-run with `-vv` for more detail.",
                    }),
                ),
            ))
        }
    }
}
