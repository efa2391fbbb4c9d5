// src/main.rs

mod cli;
mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use depmark::ResolverConfig;
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

/// Set from the SIGINT handler, polled by the resolver
static INTERRUPT: OnceLock<Arc<AtomicBool>> = OnceLock::new();

extern "C" fn on_sigint(_: std::ffi::c_int) {
    if let Some(flag) = INTERRUPT.get() {
        flag.store(true, Ordering::Relaxed);
    }
}

fn install_interrupt_handler() -> Arc<AtomicBool> {
    let flag = INTERRUPT
        .get_or_init(|| Arc::new(AtomicBool::new(false)))
        .clone();
    let action = SigAction::new(
        SigHandler::Handler(on_sigint),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    // SAFETY: the handler only does an atomic store
    if let Err(e) = unsafe { sigaction(Signal::SIGINT, &action) } {
        warn!("Failed to install SIGINT handler: {}", e);
    }
    flag
}

fn load_config(cli: &Cli) -> Result<ResolverConfig> {
    match &cli.config {
        Some(path) => ResolverConfig::load(path)
            .with_context(|| format!("Failed to load configuration {}", path.display())),
        None => ResolverConfig::load_default().context("Failed to load configuration"),
    }
}

fn run(cli: Cli) -> Result<bool> {
    match &cli.command {
        Commands::Install { tokens, resolve } => {
            let config = load_config(&cli)?;
            commands::cmd_install(tokens, resolve, &config, install_interrupt_handler())
        }
        Commands::Uninstall { tokens, resolve } => {
            let config = load_config(&cli)?;
            commands::cmd_uninstall(tokens, resolve, &config, install_interrupt_handler())
        }
        Commands::Verify { tokens, resolve } => {
            let config = load_config(&cli)?;
            commands::cmd_verify(tokens, resolve, &config, install_interrupt_handler())
        }
        Commands::Whatprovides {
            capability,
            catalog,
        } => commands::cmd_whatprovides(capability, catalog),
        Commands::Vercmp { first, second } => commands::cmd_vercmp(first, second),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
    debug!("depmark {}", env!("CARGO_PKG_VERSION"));

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}
