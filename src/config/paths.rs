//! File-system locations of a Seed node.
//!
//! Every path is derived from a single root directory. The root is resolved
//! once by the command dispatcher and passed down explicitly.

use std::path::{Path, PathBuf};

use super::spec::DEFAULT_SEED_DIR;

/// Config file name inside the seed directory.
const CONFIG_FILE: &str = "config.json";

/// Compose manifest file name.
const COMPOSE_FILE: &str = "docker-compose.yml";

/// Log file written by scheduled runs.
const DEPLOY_LOG: &str = "deploy.log";

/// Installed copy of this program.
const BINARY_FILE: &str = "seed-deploy";

/// The derived path set of a Seed node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployPaths {
    /// Root of the installation.
    pub seed_dir: PathBuf,
    /// Persisted configuration record.
    pub config_path: PathBuf,
    /// Compose manifest applied by the engine.
    pub compose_path: PathBuf,
    /// Log file for unattended runs.
    pub deploy_log: PathBuf,
    /// Installed program invoked by the scheduled job.
    pub binary_path: PathBuf,
}

impl DeployPaths {
    /// Derives the path set from a root directory.
    #[must_use]
    pub fn new(seed_dir: impl Into<PathBuf>) -> Self {
        let seed_dir = seed_dir.into();
        Self {
            config_path: seed_dir.join(CONFIG_FILE),
            compose_path: seed_dir.join(COMPOSE_FILE),
            deploy_log: seed_dir.join(DEPLOY_LOG),
            binary_path: seed_dir.join(BINARY_FILE),
            seed_dir,
        }
    }

    /// Resolves the root directory for this invocation.
    ///
    /// An explicit override (the `SEED_DIR` variable) wins, then the directory
    /// holding the running executable, then [`DEFAULT_SEED_DIR`].
    #[must_use]
    pub fn resolve(override_dir: Option<&str>, current_exe: Option<&Path>) -> Self {
        if let Some(dir) = override_dir.filter(|d| !d.trim().is_empty()) {
            return Self::new(dir);
        }
        current_exe
            .and_then(Path::parent)
            .filter(|dir| !dir.as_os_str().is_empty())
            .map_or_else(|| Self::new(DEFAULT_SEED_DIR), Self::new)
    }

    /// Returns the workspace directories mounted by the compose services.
    ///
    /// The daemon container always mounts the monitoring volumes, so those
    /// directories must exist even when the monitoring profile is off.
    #[must_use]
    pub fn workspace_dirs(&self) -> Vec<PathBuf> {
        [
            "proxy",
            "proxy/data",
            "proxy/config",
            "web",
            "daemon",
            "monitoring",
            "monitoring/grafana",
            "monitoring/prometheus",
        ]
        .iter()
        .map(|dir| self.seed_dir.join(dir))
        .collect()
    }

    /// Generated reverse-proxy configuration.
    #[must_use]
    pub fn caddyfile_path(&self) -> PathBuf {
        self.seed_dir.join("proxy").join("CaddyFile")
    }

    /// Web data file holding the registration secret.
    #[must_use]
    pub fn web_config_path(&self) -> PathBuf {
        self.seed_dir.join("web").join(CONFIG_FILE)
    }

    /// Directory holding backup archives.
    #[must_use]
    pub fn backups_dir(&self) -> PathBuf {
        self.seed_dir.join("backups")
    }
}
