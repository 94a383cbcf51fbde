// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Seed Deploy
//!
//! An idempotent, self-healing deployment engine for self-hosted Seed nodes.
//!
//! ## Overview
//!
//! A Seed node runs as three containers (`seed-proxy`, `seed-web`,
//! `seed-daemon`) described by a compose manifest published upstream.
//! Seed Deploy keeps a node in line with that manifest:
//!
//! - Interactive setup writes a single `config.json` record
//! - Every run fetches the manifest and compares its digest with the record
//! - Changes are applied with `docker compose`, health-checked and rolled
//!   back to the previous images on failure
//! - A nightly cron job repeats the run unattended
//!
//! ## Architecture
//!
//! The system is built around **reconciliation**:
//!
//! 1. **Desired State**: the published compose manifest plus `config.json`
//! 2. **Observed State**: container state queried from the docker CLI
//! 3. **Reconciler**: applies the manifest only when the two diverge
//!
//! ## Modules
//!
//! - [`config`]: The configuration record, its storage and paths
//! - [`exec`]: Shell and HTTP gateways
//! - [`render`]: Generated files and compose environment
//! - [`docker`]: Container probes, compose commands and health checks
//! - [`legacy`]: Detection of pre-compose installs
//! - [`setup`]: Interactive setup flows
//! - [`reconciler`]: The deployment engine
//! - [`self_update`]: Replacement of the installed binary
//! - [`cron`]: Scheduled jobs
//! - [`backup`]: Backup and restore archives
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```json
//! {
//!   "domain": "https://node1.seed.run",
//!   "email": "ops@example.com",
//!   "compose_url": "https://raw.githubusercontent.com/seed-hypermedia/seed/main/ops/docker-compose.yml",
//!   "compose_sha": "",
//!   "compose_envs": { "LOG_LEVEL": "info" },
//!   "environment": "prod",
//!   "release_channel": "latest",
//!   "testnet": false,
//!   "link_secret": "x7Kp2mQa9Z",
//!   "analytics": false,
//!   "gateway": false,
//!   "last_script_run": ""
//! }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod backup;
pub mod cli;
pub mod config;
pub mod cron;
pub mod docker;
pub mod error;
pub mod exec;
pub mod legacy;
pub mod reconciler;
pub mod render;
pub mod self_update;
pub mod setup;

#[cfg(test)]
mod testing;

// ============================================================================
// Re-exports
// ============================================================================

pub use backup::{BackupManager, BackupMetadata, BackupReport};
pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigStore, ContentHasher, DeployPaths, LocalConfigStore, NodeConfig};
pub use cron::{CronJobs, CronReconciler};
pub use docker::{ComposeDriver, ContainerObserver, HealthMonitor};
pub use error::{Result, SeedDeployError};
pub use exec::{Fetcher, HttpFetcher, ShellRunner, SystemShell};
pub use legacy::{LegacyDetector, LegacyInstall};
pub use reconciler::{DeployOutcome, Reconciler};
pub use self_update::{SelfUpdater, UpdateOutcome};
pub use setup::{InquireWizard, SetupFlows, Wizard};
