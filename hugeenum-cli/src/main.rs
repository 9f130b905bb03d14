mod app;
mod commands;
mod output;

use anyhow::Context;
use clap::Parser;

use crate::app::{Cli, Command};

fn main() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        eprintln!("\nCancelled.");
        std::process::exit(130);
    })
    .context("failed to set Ctrl+C handler")?;

    let cli = Cli::parse();

    // Logs go to stderr, so --json output on stdout stays clean; RUST_LOG overrides
    let level = if cli.global.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_module("hugeenum", level)
        .filter_module("hugeenum_cli", level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false)
        .init();

    match &cli.command {
        Command::Generate {
            name,
            dir,
            elements,
            count,
            algorithm,
        } => commands::generate::run(
            &commands::generate::GenerateOptions {
                name,
                dir: dir.as_deref(),
                elements: elements.as_deref(),
                count: *count,
                algorithm,
            },
            &cli.global,
        ),
        Command::List => commands::list::run(&cli.global),
        Command::Inspect {
            path,
            disasm,
            method,
        } => commands::inspect::run(path, *disasm, method.as_deref(), &cli.global),
    }
}
