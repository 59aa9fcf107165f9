use clap::Parser;
use color_eyre::Result;
use vinst_core::GlobalOptions;

mod cli;
mod dispatch;
mod output;
mod style;

use cli::VinstCli;
use dispatch::{build_command, dispatch_command};
use output::{emit_output, OutputOptions};

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = VinstCli::parse();
    init_tracing(cli.trace, cli.quiet, cli.verbose);

    let global = GlobalOptions {
        quiet: cli.quiet,
        verbose: cli.verbose,
        trace: cli.trace,
        json: cli.json,
    };

    let command = build_command(&cli.command);
    let (info, outcome) = dispatch_command(&global, &command)?;
    let code = emit_output(
        &OutputOptions {
            quiet: cli.quiet,
            json: cli.json,
            no_color: cli.no_color,
        },
        info,
        &outcome,
    )?;

    if code == 0 {
        Ok(())
    } else {
        std::process::exit(code);
    }
}

fn init_tracing(trace: bool, quiet: bool, verbose: u8) {
    let level = if trace {
        "trace"
    } else if quiet {
        "warn"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = format!("vinst={level},vinst_core={level},vinst_cli={level}");
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
