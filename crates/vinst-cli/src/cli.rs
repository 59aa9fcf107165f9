use std::path::PathBuf;

use clap::{value_parser, ArgAction, Args, Parser, Subcommand};

pub const VINST_HELP_TEMPLATE: &str =
    "{before-help}\nUsage:\n    {usage}\n\nCommands:\n{subcommands}\n\nGlobal options:\n{options}\n";

pub const VINST_BEFORE_HELP: &str = concat!(
    "vinst ",
    env!("CARGO_PKG_VERSION"),
    " – install Python applications into pinned virtual environments\n\n",
    "Without MANIFEST every command uses the bundled dbt-snowflake manifest.\n",
);

#[derive(Parser, Debug)]
#[command(
    name = "vinst",
    author,
    version,
    propagate_version = false,
    disable_help_subcommand = true,
    before_help = VINST_BEFORE_HELP,
    help_template = VINST_HELP_TEMPLATE
)]
pub struct VinstCli {
    #[arg(
        short,
        long,
        help = "Suppress human output (errors still print to stderr)",
        global = true
    )]
    pub quiet: bool,
    #[arg(
        short,
        long,
        action = ArgAction::Count,
        help = "Increase logging (-vv reaches trace)",
        global = true
    )]
    pub verbose: u8,
    #[arg(long, help = "Force trace logging regardless of -v/-q", global = true)]
    pub trace: bool,
    #[arg(
        long,
        help = "Emit {status,message,details} JSON envelopes",
        global = true
    )]
    pub json: bool,
    #[arg(long, help = "Disable colored human output", global = true)]
    pub no_color: bool,
    #[command(subcommand)]
    pub command: CommandGroupCli,
}

#[derive(Subcommand, Debug)]
pub enum CommandGroupCli {
    #[command(
        about = "Create the environment, install every pinned package, and link entry points.",
        override_usage = "vinst install [MANIFEST]"
    )]
    Install(ManifestArgs),
    #[command(
        about = "Run the installed entry point as a smoke test.",
        override_usage = "vinst test [MANIFEST]"
    )]
    Test(ManifestArgs),
    #[command(
        about = "Download and verify every artifact into the cache without installing.",
        override_usage = "vinst fetch [MANIFEST]"
    )]
    Fetch(ManifestArgs),
    #[command(
        about = "Describe a manifest and whether it is installed.",
        override_usage = "vinst info [MANIFEST]"
    )]
    Info(ManifestArgs),
}

#[derive(Args, Debug)]
pub struct ManifestArgs {
    #[arg(
        value_name = "MANIFEST",
        value_parser = value_parser!(PathBuf),
        help = "Path to a manifest TOML file (defaults to the bundled dbt-snowflake manifest)"
    )]
    pub manifest: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        VinstCli::command().debug_assert();
    }

    #[test]
    fn manifest_is_optional_and_globals_follow_subcommands() {
        let cli = VinstCli::try_parse_from(["vinst", "install"]).expect("parse");
        assert!(matches!(
            cli.command,
            CommandGroupCli::Install(ManifestArgs { manifest: None })
        ));

        let cli = VinstCli::try_parse_from(["vinst", "fetch", "demo.toml", "--json", "-vv"])
            .expect("parse");
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            CommandGroupCli::Fetch(args) => {
                assert_eq!(args.manifest, Some(PathBuf::from("demo.toml")));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn install_takes_no_extra_flags() {
        assert!(VinstCli::try_parse_from(["vinst", "install", "--force"]).is_err());
    }
}
