//! Binary entry point for remoteconf.
//!
//! This binary provides the CLI for importing remote privacy configuration
//! and evaluating remote-message matching attributes.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use remoteconf::config::RemoteConfConfig;
use remoteconf::observability::{self, InitOptions};

/// Remoteconf - remote feature configuration and message targeting.
#[derive(Parser)]
#[command(name = "remoteconf")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "REMOTECONF_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Path to the feature database (overrides the configuration).
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Import one feature payload through the importer registry.
    Import {
        /// Feature name as published in the remote config, e.g. `drm`.
        feature: String,

        /// Payload file, or `-` for stdin.
        input: PathBuf,
    },

    /// Ingest a full privacy configuration document.
    Ingest {
        /// Document file, or `-` for stdin.
        input: PathBuf,
    },

    /// List persisted feature toggles.
    Toggles,

    /// List the exceptions of a feature.
    Exceptions {
        /// Feature name.
        feature: String,
    },

    /// Check whether a feature is enabled.
    Enabled {
        /// Feature name.
        feature: String,

        /// App version code (defaults to the configured `app_version`).
        #[arg(long)]
        app_version: Option<i64>,

        /// Also check whether this host is excepted from the feature.
        #[arg(long)]
        host: Option<String>,
    },

    /// Map and evaluate a matching attribute object against fixed state.
    Match {
        /// Attribute object file, or `-` for stdin.
        input: PathBuf,

        /// Report the VPN as onboarded.
        #[arg(long)]
        onboarded: bool,

        /// App version code (defaults to the configured `app_version`).
        #[arg(long)]
        version_code: Option<i64>,

        /// Device locale.
        #[arg(long, default_value = "en-US")]
        locale: String,
    },
}

/// Main entry point.
#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref(), cli.db.clone()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    let _observability = match observability::init_from_config(
        &config.observability,
        InitOptions {
            verbose: cli.verbose,
            metrics_expose: false,
        },
    ) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Failed to initialize observability: {e}");
            return ExitCode::FAILURE;
        },
    };

    match run_command(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
async fn run_command(command: Commands, config: &RemoteConfConfig) -> anyhow::Result<()> {
    match command {
        Commands::Import { feature, input } => commands::cmd_import(config, &feature, &input),
        Commands::Ingest { input } => commands::cmd_ingest(config, &input),
        Commands::Toggles => commands::cmd_toggles(config),
        Commands::Exceptions { feature } => commands::cmd_exceptions(config, &feature),
        Commands::Enabled {
            feature,
            app_version,
            host,
        } => commands::cmd_enabled(config, &feature, app_version, host.as_deref()),
        Commands::Match {
            input,
            onboarded,
            version_code,
            locale,
        } => {
            let state = remoteconf::rmf::StaticDeviceState {
                onboarded,
                version_code: version_code.unwrap_or(config.app_version),
                locale,
            };
            commands::cmd_match(&input, state).await
        },
    }
}

/// Loads configuration: `--config`, else the default location, then
/// applies `--db`.
fn load_config(
    path: Option<&std::path::Path>,
    db: Option<PathBuf>,
) -> remoteconf::Result<RemoteConfConfig> {
    let config = match path {
        Some(config_path) => RemoteConfConfig::load_from_file(config_path)?,
        None => RemoteConfConfig::load_default(),
    };

    Ok(match db {
        Some(db) => config.with_database_path(db),
        None => config,
    })
}
