//! CLI module for the Seed deployment tool.
//!
//! This module provides the command-line interface for managing
//! a Seed node.

mod commands;
mod output;

pub use commands::{Cli, Commands, CronAction, OutputFormat};
pub use output::{OutputFormatter, human_size, mask_secret};
