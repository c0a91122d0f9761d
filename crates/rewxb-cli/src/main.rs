//! rewxb - Resample the waves of an XACT wave bank
//!
//! Reads an `.xwb` bank, converts every PCM and MS-ADPCM entry to a new
//! sample rate and writes a consistent bank with the updated layout.

use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use rewxb_bank::RewriteOptions;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use rewxb_cli::commands;

mod cli_args;

use cli_args::Cli;

fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    if cli.inspect {
        return commands::inspect::run(&cli.infile, cli.json);
    }

    let (Some(outfile), Some(rate)) = (cli.outfile.as_deref(), cli.rate) else {
        anyhow::bail!("OUTFILE and RATE are required unless --inspect is given");
    };
    let options = RewriteOptions::new(rate)
        .with_force_pcm(cli.force_pcm)
        .with_force_mono(cli.mono);
    debug!(?options, input = %cli.infile.display(), "parsed arguments");
    commands::rewrite::run(&cli.infile, outfile, options, cli.percentage, cli.json)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if cli.json {
        colored::control::set_override(false);
    }

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {:#}", "error:".red().bold(), err);
            ExitCode::from(commands::exit_status(&err))
        }
    }
}
