//! VoxProc CLI - Vocal Processing Chain
//!
//! Command-line interface for inspecting VoxProc presets.

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use voxproc::cli::{commands, Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise --verbose selects debug. Logs go to stderr so
    // JSON on stdout stays clean.
    let default_filter = if cli.verbose { "voxproc=debug,info" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("VoxProc v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Some(cmd) => handle_command(cmd),
        None => {
            println!("VoxProc v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Defaults => commands::print_defaults(),
        Commands::Check { path } => commands::check_preset(&path),
        Commands::Response {
            params,
            sample_rate,
            points,
            band,
        } => commands::print_response(params.as_deref(), sample_rate, points, band),
        Commands::Curve {
            params,
            from,
            to,
            step,
        } => commands::print_curve(params.as_deref(), from, to, step),
    }
}
