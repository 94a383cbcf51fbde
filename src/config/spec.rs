//! Configuration record for a Seed node.
//!
//! These types map one-to-one onto `config.json` in the seed directory. The
//! record is the single marker of a declaratively managed node: when it
//! exists, deployments run headless.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Crate version, reported by `--version` and embedded in backups.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default seed directory when neither `SEED_DIR` nor the executable path apply.
pub const DEFAULT_SEED_DIR: &str = "/opt/seed";

/// Repository serving the compose manifest and release builds.
pub const DEFAULT_REPO_URL: &str = "https://raw.githubusercontent.com/seed-hypermedia/seed/main";

/// Notification service used by the web frontend.
pub const NOTIFY_SERVICE_HOST: &str = "https://notify.seed.hyper.media";

/// Lightning endpoint on the main network.
pub const LIGHTNING_URL_MAINNET: &str = "https://ln.seed.hyper.media";

/// Lightning endpoint on the test network.
pub const LIGHTNING_URL_TESTNET: &str = "https://ln.testnet.seed.hyper.media";

/// Returns the compose manifest URL served by a repository.
#[must_use]
pub fn compose_url_for(repo_url: &str) -> String {
    format!("{}/ops/docker-compose.yml", repo_url.trim_end_matches('/'))
}

/// Returns the release build URL served by a repository.
#[must_use]
pub fn binary_url_for(repo_url: &str) -> String {
    format!("{}/ops/dist/seed-deploy", repo_url.trim_end_matches('/'))
}

/// The persisted configuration of a Seed node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeConfig {
    /// Public hostname, e.g. `https://node1.seed.run`.
    pub domain: String,
    /// Contact email for security and operational notices. May be empty.
    pub email: String,
    /// URL the compose manifest is fetched from.
    pub compose_url: String,
    /// SHA-256 of the last applied compose manifest. Empty before the first deploy.
    pub compose_sha: String,
    /// Environment variables passed through to compose services.
    pub compose_envs: ComposeEnvs,
    /// Deployment environment label.
    pub environment: Environment,
    /// Image tag to pull: `latest` for stable, `dev` for main-branch builds.
    pub release_channel: String,
    /// Whether the node joins the test P2P network.
    pub testnet: bool,
    /// Secret used for the initial site registration link.
    pub link_secret: String,
    /// Whether web analytics are enabled.
    pub analytics: bool,
    /// Whether the node serves all known public content.
    pub gateway: bool,
    /// ISO 8601 timestamp of the last successful deployment.
    pub last_script_run: String,
}

/// Environment overrides passed to compose services.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComposeEnvs {
    /// Log level of the Seed services.
    #[serde(rename = "LOG_LEVEL")]
    pub log_level: LogLevel,
}

/// Deployment environment label.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Development builds on the test network.
    Dev,
    /// Development builds on the main network.
    Staging,
    /// Stable releases on the main network.
    #[default]
    Prod,
}

/// Service log level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Very verbose.
    Debug,
    /// Standard operational logging.
    #[default]
    Info,
    /// Warnings and errors only.
    Warn,
    /// Errors only.
    Error,
}

/// Network mode and release channel derived from an [`Environment`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentPresets {
    /// Whether the node joins the test network.
    pub testnet: bool,
    /// Image tag to pull.
    pub release_channel: String,
}

/// Derives the network mode and release channel from an environment label.
///
/// Keeps the wizard to a single "Environment" question instead of three.
#[must_use]
pub fn environment_presets(environment: Environment) -> EnvironmentPresets {
    let (testnet, channel) = match environment {
        Environment::Dev => (true, "dev"),
        Environment::Staging => (false, "dev"),
        Environment::Prod => (false, "latest"),
    };
    EnvironmentPresets {
        testnet,
        release_channel: channel.to_string(),
    }
}

impl Environment {
    /// All environments in wizard order.
    pub const ALL: [Self; 3] = [Self::Prod, Self::Staging, Self::Dev];

    /// Returns the lowercase label stored in `config.json`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Staging => "staging",
            Self::Prod => "prod",
        }
    }

    /// Parses a stored label.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|env| env.as_str() == label)
    }
}

impl LogLevel {
    /// All log levels in wizard order.
    pub const ALL: [Self; 4] = [Self::Debug, Self::Info, Self::Warn, Self::Error];

    /// Returns the lowercase label stored in `config.json`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Parses a level recovered from a running container.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|level| level.as_str() == label)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl NodeConfig {
    /// Returns true if the stored network mode and channel no longer match
    /// what the environment label would derive.
    #[must_use]
    pub fn has_environment_drift(&self) -> bool {
        let presets = environment_presets(self.environment);
        presets.testnet != self.testnet || presets.release_channel != self.release_channel
    }

    /// Returns true if this node has never completed a deployment.
    #[must_use]
    pub fn is_first_deploy(&self) -> bool {
        self.compose_sha.is_empty()
    }

    /// Returns `(field, value)` pairs for display, in file order.
    ///
    /// The digest and last-run fields are bookkeeping and are skipped.
    #[must_use]
    pub fn summary_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("domain", self.domain.clone()),
            ("email", self.email.clone()),
            ("compose_url", self.compose_url.clone()),
            ("log_level", self.compose_envs.log_level.to_string()),
            ("environment", self.environment.to_string()),
            ("release_channel", self.release_channel.clone()),
            ("testnet", self.testnet.to_string()),
            ("link_secret", self.link_secret.clone()),
            ("analytics", self.analytics.to_string()),
            ("gateway", self.gateway.to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_config as sample;

    #[test]
    fn test_environment_presets() {
        let dev = environment_presets(Environment::Dev);
        assert!(dev.testnet);
        assert_eq!(dev.release_channel, "dev");

        let staging = environment_presets(Environment::Staging);
        assert!(!staging.testnet);
        assert_eq!(staging.release_channel, "dev");

        let prod = environment_presets(Environment::Prod);
        assert!(!prod.testnet);
        assert_eq!(prod.release_channel, "latest");
    }

    #[test]
    fn test_serialized_field_names() {
        let json = serde_json::to_value(sample()).expect("serialize");
        for key in [
            "domain",
            "email",
            "compose_url",
            "compose_sha",
            "compose_envs",
            "environment",
            "release_channel",
            "testnet",
            "link_secret",
            "analytics",
            "gateway",
            "last_script_run",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert_eq!(json["compose_envs"]["LOG_LEVEL"], "info");
        assert_eq!(json["environment"], "prod");
    }

    #[test]
    fn test_environment_drift() {
        let mut config = sample();
        assert!(!config.has_environment_drift());

        config.release_channel = String::from("dev");
        assert!(config.has_environment_drift());
    }

    #[test]
    fn test_compose_url_for_trims_slash() {
        assert_eq!(
            compose_url_for("https://example.com/repo/"),
            "https://example.com/repo/ops/docker-compose.yml"
        );
    }

    #[test]
    fn test_log_level_from_label() {
        assert_eq!(LogLevel::from_label("DEBUG"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::from_label("verbose"), None);
    }
}
