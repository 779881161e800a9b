//! kiln - A front-end asset pipeline with a live-reloading dev server.

mod actor;
mod asset;
mod cli;
mod config;
mod core;
mod embed;
mod logger;
mod pipeline;
mod reload;
mod task;
mod utils;

use std::sync::Arc;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::Config;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();
    logger::set_verbose(cli.verbose);

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let config = Arc::new(Config::load(&cli)?);
    let registry = Arc::new(pipeline::registry(&config));

    match cli.command() {
        Commands::Build => cli::build::build(&config, &registry),
        Commands::Dev { .. } => cli::dev::dev(&config, registry),
        Commands::Watch => cli::dev::watch(&config, registry),
        Commands::Serve { .. } => cli::dev::serve(&config, registry),
        command => match command.task_name() {
            Some(task) => cli::build::run_task(&config, &registry, task),
            None => Ok(()),
        },
    }
}
