//! Seamloop CLI - Seamless Audio Loop Builder
//!
//! Command-line interface for the Seamloop loop builder.

use anyhow::Result;
use clap::Parser;
use env_logger::Env;
use log::info;

use seamloop::cli::commands;
use seamloop::cli::{Cli, Commands};
use seamloop::config::LooperConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    info!("Seamloop v{}", env!("CARGO_PKG_VERSION"));

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Some(cmd) => handle_command(&config, cmd),
        None => {
            println!("Seamloop v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(config: &LooperConfig, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Info { input } => commands::info(&input),
        Commands::Loop {
            input,
            start,
            end,
            crossfade,
            curve,
            output,
            data_url,
        } => commands::make_loop(config, &input, start, end, crossfade, curve, output, data_url),
        Commands::Waveform {
            input,
            columns,
            channel,
        } => commands::waveform(config, &input, columns, channel),
        Commands::Preview {
            input,
            start,
            end,
            seconds,
            looped,
        } => commands::preview(config, &input, start, end, seconds, looped),
    }
}
