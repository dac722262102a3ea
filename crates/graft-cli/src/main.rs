#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::needless_pass_by_value)]

mod commands;
mod logging;
mod observe;

use clap::Parser;
use graft_core::config::CONFIG_FILE_NAME;
use graft_core::BuildConfig;
use miette::{IntoDiagnostic, Result};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "graft")]
#[command(author, version, about = "Import-map aware module graph builder", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Build the project: copy, compile, hash and graph every entrypoint
    Build {
        /// Config file (defaults to graft.json in the working directory)
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Keep the existing output directory
        #[arg(long)]
        no_clean: bool,
    },

    /// Print one entrypoint's module graph
    Graph {
        /// Entrypoint path, relative to the project root
        entry: String,

        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Resolve a single specifier
    Resolve {
        specifier: String,

        /// URL of the importing module
        #[arg(long)]
        referrer: String,

        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

impl Commands {
    fn config(&self) -> Option<&Path> {
        match self {
            Self::Build { config, .. } | Self::Graph { config, .. } | Self::Resolve { config, .. } => {
                config.as_deref()
            }
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cwd = match cli.cwd {
        Some(path) => path,
        None => std::env::current_dir().into_diagnostic()?,
    };
    let config_path = commands::config_path(&cwd, cli.command.config());

    let log_level = BuildConfig::load(&config_path)
        .ok()
        .and_then(|config| config.log_level);
    logging::init(cli.verbose, cli.json, log_level);

    tracing::debug!(
        cwd = %cwd.display(),
        config = %config_path.display(),
        default_config = CONFIG_FILE_NAME,
        "Starting graft"
    );

    match cli.command {
        Commands::Build { no_clean, .. } => commands::build::run(
            commands::build::BuildAction {
                config: config_path,
                no_clean,
            },
            cli.json,
        ),
        Commands::Graph { entry, .. } => commands::graph::run(
            commands::graph::GraphAction {
                config: config_path,
                entry,
            },
            cli.json,
        ),
        Commands::Resolve {
            specifier,
            referrer,
            ..
        } => commands::resolve::run(
            commands::resolve::ResolveAction {
                config: config_path,
                specifier,
                referrer,
            },
            cli.json,
        ),
    }
}
