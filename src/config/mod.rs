//! Configuration module for the Seed deployment engine.
//!
//! This module handles everything about the node's persisted record:
//! - The `config.json` record and its environment presets
//! - The derived path set of an installation
//! - Loading and saving the record
//! - Digests for drift detection and registration secrets

mod hash;
mod paths;
mod secret;
mod spec;
mod store;
mod validator;

pub use hash::{ContentHasher, sha256, sha256_bytes};
pub use paths::DeployPaths;
pub use secret::{DEFAULT_SECRET_LENGTH, generate_secret};
pub use spec::{
    ComposeEnvs, DEFAULT_REPO_URL, DEFAULT_SEED_DIR, Environment, EnvironmentPresets,
    LIGHTNING_URL_MAINNET, LIGHTNING_URL_TESTNET, LogLevel, NOTIFY_SERVICE_HOST, NodeConfig,
    VERSION, binary_url_for, compose_url_for, environment_presets,
};
pub use store::{ConfigStore, LocalConfigStore, to_file_contents};
pub use validator::{ConfigValidator, validate_domain, validate_email};
