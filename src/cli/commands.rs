//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Seed Deploy - Self-healing deployment of a Seed node.
#[derive(Parser, Debug)]
#[command(name = "seed-deploy")]
#[command(author, version, about, long_about = None)]
#[command(disable_version_flag = true)]
pub struct Cli {
    /// Print version.
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    pub version: Option<bool>,

    /// Enable debug logging.
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute. Defaults to `deploy`.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Deploy or update the node (default).
    Deploy {
        /// Walk through the setup questions again before deploying.
        #[arg(long)]
        reconfigure: bool,
    },

    /// Stop all containers.
    Stop,

    /// Start all containers.
    Start,

    /// Restart all containers.
    Restart,

    /// Show configuration summary and container status.
    Status,

    /// Print the configuration record.
    Config,

    /// Follow container logs.
    Logs {
        /// Service to follow (all services if omitted).
        service: Option<String>,
    },

    /// Manage the scheduled jobs.
    Cron {
        /// Action to perform.
        #[arg(value_enum, default_value = "install")]
        action: CronAction,
    },

    /// Archive configuration and data.
    Backup {
        /// Archive path (defaults to `<root>/backups/seed-backup-<timestamp>.tar.gz`).
        path: Option<PathBuf>,
    },

    /// Restore an archive over the node root and redeploy.
    Restore {
        /// Archive path (defaults to the newest archive in `<root>/backups`).
        path: Option<PathBuf>,
    },

    /// Remove containers, scheduled jobs and generated files.
    Uninstall,
}

/// Scheduled job actions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum CronAction {
    /// Install or refresh the jobs.
    #[default]
    Install,
    /// Remove the jobs.
    Remove,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

impl Cli {
    /// Returns the command to run, `deploy` when none was given.
    #[must_use]
    pub fn command_or_default(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or(Commands::Deploy { reconfigure: false })
    }
}
