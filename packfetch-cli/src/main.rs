//! Packfetch CLI - Command-line interface
//!
//! Downloads a complete modpack: the pack archive, every mod its manifest
//! lists, and the pack's override files, resuming earlier runs.

mod error;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use console::style;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use packfetch::catalog::{HttpCatalog, PackRef};
use packfetch::config::ConfigFile;
use packfetch::logging::{default_log_dir, init_logging};
use packfetch::manager::{check_required_tools, ManagerConfig, ManagerError, PackInstaller};

use error::CliError;
use output::{print_summary, ConfirmPrompt, ConsoleOutput};

/// Downloads full Minecraft modpacks from CurseForge.
#[derive(Debug, Parser)]
#[command(name = "packfetch", version, about)]
struct Cli {
    /// Pack ID, slug, or CurseForge URL
    #[arg(value_name = "PACK")]
    pack: String,

    /// Release (file) ID to install instead of the latest
    #[arg(value_name = "RELEASE_ID")]
    release_id: Option<u64>,

    /// Re-download every file even if it is already present
    #[arg(short, long)]
    force: bool,

    /// Directory packs are installed under [default: config or current directory]
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Show progress details on stderr
    #[arg(short, long)]
    verbose: bool,
}

/// Combine the settings file with command-line overrides.
fn build_config(cli: &Cli, file: &ConfigFile) -> ManagerConfig {
    let mut config = ManagerConfig::from_config_file(file).with_force(cli.force);
    if let Some(dir) = &cli.output_dir {
        config = config.with_output_dir(dir.clone());
    }
    config
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config_file = ConfigFile::load().map_err(|e| CliError::Config(e.to_string()))?;
    let _logging = init_logging(&default_log_dir(), cli.verbose)
        .map_err(|e| CliError::Config(e.to_string()))?;

    let pack = PackRef::parse(&cli.pack)?.with_release(cli.release_id);
    let config = build_config(&cli, &config_file);
    info!(pack = %pack.target, release_id = ?pack.release_id, force = config.force, "Starting");

    check_required_tools()?;

    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || handler_token.cancel())
        .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    let catalog = HttpCatalog::new(
        config.transport().map_err(ManagerError::from)?,
        config.catalog.clone(),
    );
    let transport = config.transport().map_err(ManagerError::from)?;

    let console = ConsoleOutput::new();
    let prompt = ConfirmPrompt::new(cancel.clone());
    let installer = PackInstaller::new(catalog, transport, config)
        .with_cancellation(cancel)
        .with_progress_callback(console.stage_callback())
        .with_event_callback(console.event_callback());

    match installer.install(&pack, &prompt) {
        Ok(report) => {
            print_summary(&report);
            Ok(())
        }
        Err(e) => {
            console.abandon();
            warn!(error = %e, "Installation did not complete");
            Err(e.into())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            ExitCode::from(e.exit_code())
        }
    }
}
