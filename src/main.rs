mod analysis;
mod audio;
mod cli;
mod commands;
mod config;
mod dsp;
mod error;
mod music;
mod paths;
mod report;
mod util;

use anyhow::Result;
use clap::Parser;
use analysis::listener::Listener;
use cli::{Cli, Command};
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    let default = if verbose { "pitchscope=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = config::load_config(cli.config.as_deref())?;
    tracing::debug!(?config, "config loaded");

    let listener = Listener::new();

    match cli.command {
        Command::Frequency {
            note,
            octave,
            reference,
        } => commands::frequency(&config, &note, octave, reference),

        Command::Note {
            frequency,
            reference,
            rounding,
        } => commands::note(&config, &frequency, reference, rounding),

        Command::Listen { capture, yes } => commands::listen(&config, &capture, yes, &listener),

        Command::Analyze { file, capture } => commands::analyze(&config, &file, &capture),

        Command::Devices => audio::devices::list_devices(),

        Command::Paths => {
            commands::show_paths();
            Ok(())
        }
    }
}
