//! Detection of a pre-compose Seed installation.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::{Environment, LogLevel};
use crate::docker::ContainerObserver;
use crate::exec::ShellRunner;

use super::env::{parse_daemon_env, parse_image_tag, parse_web_env};

/// Key holding an unused registration secret in `web/config.json`.
const SECRET_KEY: &str = "availableRegistrationSecret";

/// Key present once a site has been registered to an account.
const REGISTERED_KEY: &str = "registeredAccountUid";

/// State of the registration secret of a legacy install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretStatus {
    /// An unused secret was found.
    Present(String),
    /// The site was already registered; the secret was spent.
    Consumed,
    /// No web data file yielded either marker.
    Absent,
}

/// Snapshot of a legacy install, used to prefill the migration questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyInstall {
    /// Workspace directory of the old install.
    pub workspace: PathBuf,
    /// Registration secret status.
    pub secret: SecretStatus,
    /// Public hostname, from `SEED_BASE_URL`.
    pub hostname: Option<String>,
    /// Daemon log level.
    pub log_level: Option<LogLevel>,
    /// Tag of the web image.
    pub image_tag: Option<String>,
    /// Whether the daemon ran on the test network.
    pub testnet: bool,
    /// Whether the web container served as a public gateway.
    pub gateway: bool,
    /// Whether web statistics were enabled.
    pub analytics: bool,
}

/// Picks the default environment for a migrated node.
#[must_use]
pub fn infer_environment(install: &LegacyInstall) -> Environment {
    if install.testnet {
        Environment::Dev
    } else if install.image_tag.as_deref() == Some("dev") {
        Environment::Staging
    } else {
        Environment::Prod
    }
}

/// Looks for a legacy install on disk and in the container runtime.
pub struct LegacyDetector<'a> {
    shell: &'a dyn ShellRunner,
    home_workspace: PathBuf,
    candidates: Vec<PathBuf>,
    secret_fallbacks: Vec<PathBuf>,
}

impl<'a> LegacyDetector<'a> {
    /// Creates a detector probing the standard locations under `home`.
    #[must_use]
    pub fn new(shell: &'a dyn ShellRunner, home: &Path) -> Self {
        let home_workspace = home.join(".seed-site");
        Self {
            shell,
            candidates: vec![
                home_workspace.clone(),
                PathBuf::from("/shm/gateway"),
                PathBuf::from("/shm"),
            ],
            secret_fallbacks: vec![
                PathBuf::from("/shm/gateway/web/config.json"),
                home_workspace.join("web").join("config.json"),
            ],
            home_workspace,
        }
    }

    /// Replaces the probed workspace directories and secret files.
    #[must_use]
    pub fn with_locations(mut self, candidates: Vec<PathBuf>, secret_fallbacks: Vec<PathBuf>) -> Self {
        self.candidates = candidates;
        self.secret_fallbacks = secret_fallbacks;
        self
    }

    /// Detects a legacy install. Returns `None` when nothing was found.
    pub async fn detect(&self) -> Option<LegacyInstall> {
        let on_disk = self.candidates.iter().find(|dir| dir.exists()).cloned();
        let observer = ContainerObserver::new(self.shell);

        let workspace = match on_disk {
            Some(dir) => dir,
            None if observer.any_seed_container_running().await => self.home_workspace.clone(),
            None => {
                debug!("No legacy installation found");
                return None;
            }
        };
        info!("Found existing installation at {}", workspace.display());

        let secret = self.scan_secret(&workspace);

        let daemon = observer
            .env_json("seed-daemon")
            .await
            .map(|json| parse_daemon_env(&json))
            .unwrap_or_default();
        let web = observer
            .env_json("seed-web")
            .await
            .map(|json| parse_web_env(&json))
            .unwrap_or_default();
        let image_tag = observer.image_ref("seed-web").await.map(|image| parse_image_tag(&image));

        Some(LegacyInstall {
            workspace,
            secret,
            hostname: web.hostname,
            log_level: daemon.log_level,
            image_tag,
            testnet: daemon.testnet,
            gateway: web.gateway,
            analytics: web.analytics,
        })
    }

    fn scan_secret(&self, workspace: &Path) -> SecretStatus {
        let primary = workspace.join("web").join("config.json");
        let mut consumed = false;

        for path in std::iter::once(&primary).chain(&self.secret_fallbacks) {
            let Ok(raw) = std::fs::read_to_string(path) else {
                continue;
            };
            let Ok(value) = serde_json::from_str::<serde_json::Value>(&raw) else {
                debug!("Skipping unreadable {}", path.display());
                continue;
            };
            if let Some(secret) = value
                .get(SECRET_KEY)
                .and_then(serde_json::Value::as_str)
                .filter(|s| !s.is_empty())
            {
                return SecretStatus::Present(secret.to_string());
            }
            if value.get(REGISTERED_KEY).is_some() {
                consumed = true;
            }
        }

        if consumed {
            SecretStatus::Consumed
        } else {
            SecretStatus::Absent
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeShell;
    use tempfile::TempDir;

    fn snapshot(testnet: bool, image_tag: Option<&str>) -> LegacyInstall {
        LegacyInstall {
            workspace: PathBuf::from("/home/seed/.seed-site"),
            secret: SecretStatus::Absent,
            hostname: None,
            log_level: None,
            image_tag: image_tag.map(String::from),
            testnet,
            gateway: false,
            analytics: false,
        }
    }

    fn detector<'a>(shell: &'a FakeShell, temp: &TempDir) -> LegacyDetector<'a> {
        let workspace = temp.path().join("seed-site");
        LegacyDetector::new(shell, temp.path()).with_locations(
            vec![workspace, temp.path().join("gateway")],
            vec![temp.path().join("gateway").join("web").join("config.json")],
        )
    }

    fn write_web_config(dir: &Path, contents: &str) {
        std::fs::create_dir_all(dir.join("web")).expect("mkdir");
        std::fs::write(dir.join("web").join("config.json"), contents).expect("write");
    }

    #[test]
    fn test_infer_environment() {
        assert_eq!(infer_environment(&snapshot(true, Some("latest"))), Environment::Dev);
        assert_eq!(infer_environment(&snapshot(false, Some("dev"))), Environment::Staging);
        assert_eq!(infer_environment(&snapshot(false, Some("latest"))), Environment::Prod);
        assert_eq!(infer_environment(&snapshot(false, None)), Environment::Prod);
    }

    #[tokio::test]
    async fn test_nothing_found() {
        let temp = TempDir::new().expect("tempdir");
        let shell = FakeShell::new().fail_on("docker ps");

        assert!(detector(&shell, &temp).detect().await.is_none());
    }

    #[tokio::test]
    async fn test_containers_only_defaults_to_home_workspace() {
        let temp = TempDir::new().expect("tempdir");
        let shell = FakeShell::new().fail_on("docker inspect");

        let install = detector(&shell, &temp).detect().await.expect("install");
        assert_eq!(install.workspace, temp.path().join(".seed-site"));
        assert_eq!(install.secret, SecretStatus::Absent);
        assert!(install.image_tag.is_none());
    }

    #[tokio::test]
    async fn test_full_snapshot() {
        let temp = TempDir::new().expect("tempdir");
        let workspace = temp.path().join("seed-site");
        write_web_config(&workspace, r#"{"availableRegistrationSecret":"oldSecret1"}"#);

        let shell = FakeShell::new()
            .fail_on("docker ps")
            .on(
                "inspect seed-daemon --format '{{json .Config.Env}}'",
                r#"["SEED_LOG_LEVEL=debug","SEED_P2P_TESTNET_NAME=dev"]"#,
            )
            .on(
                "inspect seed-web --format '{{json .Config.Env}}'",
                r#"["SEED_BASE_URL=https://old.example.com","SEED_IS_GATEWAY=true"]"#,
            )
            .on("inspect seed-web --format '{{.Config.Image}}'", "seedhypermedia/web:dev");

        let install = detector(&shell, &temp).detect().await.expect("install");
        assert_eq!(install.workspace, workspace);
        assert_eq!(install.secret, SecretStatus::Present(String::from("oldSecret1")));
        assert_eq!(install.hostname.as_deref(), Some("https://old.example.com"));
        assert_eq!(install.log_level, Some(LogLevel::Debug));
        assert_eq!(install.image_tag.as_deref(), Some("dev"));
        assert!(install.testnet);
        assert!(install.gateway);
        assert!(!install.analytics);
    }

    #[tokio::test]
    async fn test_consumed_secret() {
        let temp = TempDir::new().expect("tempdir");
        let workspace = temp.path().join("seed-site");
        write_web_config(&workspace, r#"{"registeredAccountUid":"z6Mk..."}"#);

        let shell = FakeShell::new().fail_on("docker");
        let install = detector(&shell, &temp).detect().await.expect("install");

        assert_eq!(install.secret, SecretStatus::Consumed);
    }

    #[tokio::test]
    async fn test_secret_from_fallback_location() {
        let temp = TempDir::new().expect("tempdir");
        let workspace = temp.path().join("seed-site");
        write_web_config(&workspace, "not json");
        write_web_config(&temp.path().join("gateway"), r#"{"availableRegistrationSecret":"fromGateway"}"#);

        let shell = FakeShell::new().fail_on("docker");
        let install = detector(&shell, &temp).detect().await.expect("install");

        assert_eq!(install.workspace, workspace);
        assert_eq!(install.secret, SecretStatus::Present(String::from("fromGateway")));
    }
}
