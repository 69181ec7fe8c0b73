//! firmkit: build configurator for Arduino-compatible firmware projects.

mod commands;
mod flags;
mod manifest;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use firmkit_env::EnvironmentSettings;

use manifest::FirmkitManifest;

#[derive(Parser)]
#[command(name = "firmkit", version, about = "Firmware build configurator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover the toolchain, set up flags and resolve library dependencies
    Build {
        /// Board model to build for (see `list-models`)
        #[arg(short = 'm', long)]
        board_model: Option<String>,
        /// Distribution directory
        #[arg(short = 'd', long)]
        dist: Option<PathBuf>,
        /// Debug logging
        #[arg(short, long)]
        verbose: bool,
    },
    /// List the board models the distribution supports
    ListModels {
        /// Distribution directory
        #[arg(short = 'd', long)]
        dist: Option<PathBuf>,
    },
    /// Remove build output
    Clean,
}

fn main() {
    let cli = Cli::parse();

    let verbose = matches!(cli.command, Commands::Build { verbose: true, .. });
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;

    match cli.command {
        Commands::Build {
            board_model, dist, ..
        } => {
            let settings = load_settings(&cwd, dist.as_deref())?;
            commands::build::run(settings, board_model.as_deref())
        }

        Commands::ListModels { dist } => {
            let settings = load_settings(&cwd, dist.as_deref())?;
            commands::list_models::run(settings)
        }

        Commands::Clean => {
            let settings = load_settings(&cwd, None)?;
            commands::clean::run(&settings.output_dir)
        }
    }
}

/// Settings for the project containing `cwd`. Without a manifest the working
/// directory is the project root.
fn load_settings(cwd: &Path, dist: Option<&Path>) -> anyhow::Result<EnvironmentSettings> {
    let settings = match FirmkitManifest::find_and_load(cwd)? {
        Some((manifest, project_dir)) => {
            log::debug!("project {} at {}", manifest.project.name, project_dir.display());
            manifest::environment_settings(&project_dir, Some(&manifest), dist)
        }
        None => manifest::environment_settings(cwd, None, dist),
    };
    Ok(settings)
}
