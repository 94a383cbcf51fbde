//! Reconciliation engine.
//!
//! Brings the running containers in line with the compose manifest published
//! upstream. A run either short-circuits (manifest unchanged and every
//! container running) or goes through the full apply path:
//!
//! ```text
//! Fetching -> Applying -> Healthy
//!                     \-> RolledBack | Failed
//! ```
//!
//! Every phase is safe to re-run, so a failed unattended run is simply
//! retried by the next scheduled one.

use chrono::{SecondsFormat, Utc};
use std::fmt;
use std::path::Path;
use tokio::fs;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigStore, ContentHasher, DeployPaths, NodeConfig, compose_url_for};
use crate::docker::{
    ComposeDriver, ContainerObserver, HealthMonitor, HealthPolicy, ImageSnapshot, LEGACY_CONTAINERS,
    POST_DEPLOY_PRUNE_WINDOW, SEED_CONTAINERS, prune_images, remove_container, retag_image,
};
use crate::error::{ReconcileError, Result};
use crate::exec::{Fetcher, ShellRunner};
use crate::render::{ProcessIds, build_compose_env, generate_caddyfile};

/// Phase of a deployment run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployPhase {
    /// Manifest and containers already match the record.
    Unchanged,
    /// Downloading the manifest.
    Fetching,
    /// Writing files and starting containers.
    Applying,
    /// Containers are up with the new manifest.
    Healthy,
    /// The previous images were restored after a failure.
    RolledBack,
    /// The run failed without a rollback.
    Failed,
}

impl fmt::Display for DeployPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unchanged => "unchanged",
            Self::Fetching => "fetching",
            Self::Applying => "applying",
            Self::Healthy => "healthy",
            Self::RolledBack => "rolled back",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Successful result of a deployment run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployOutcome {
    /// Nothing to do; only the last-run timestamp was updated.
    Unchanged,
    /// A new manifest was applied.
    Deployed {
        /// Digest of the applied manifest.
        compose_sha: String,
        /// Whether this was the node's first compose-managed deployment.
        first_deploy: bool,
    },
}

/// Returns the current time as an ISO 8601 UTC timestamp.
#[must_use]
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Reconciliation engine for a single node.
pub struct Reconciler<'a> {
    /// Paths of the node.
    paths: &'a DeployPaths,
    /// Config store.
    store: &'a dyn ConfigStore,
    /// Shell gateway.
    shell: &'a dyn ShellRunner,
    /// Manifest fetcher.
    fetcher: &'a dyn Fetcher,
    /// Ids exported to the containers.
    ids: ProcessIds,
    /// Repository overriding the record's manifest URL.
    repo_override: Option<String>,
    /// Post-deploy health policy.
    health: HealthPolicy,
    /// Content hasher.
    hasher: ContentHasher,
}

impl<'a> Reconciler<'a> {
    /// Creates a new reconciler.
    #[must_use]
    pub fn new(
        paths: &'a DeployPaths,
        store: &'a dyn ConfigStore,
        shell: &'a dyn ShellRunner,
        fetcher: &'a dyn Fetcher,
        ids: ProcessIds,
    ) -> Self {
        Self {
            paths,
            store,
            shell,
            fetcher,
            ids,
            repo_override: None,
            health: HealthPolicy::default(),
            hasher: ContentHasher::new(),
        }
    }

    /// Fetches the manifest from `<repo>/ops/docker-compose.yml` instead of
    /// the record's URL.
    #[must_use]
    pub fn with_repo_override(mut self, repo_url: Option<String>) -> Self {
        self.repo_override = repo_url.filter(|url| !url.trim().is_empty());
        self
    }

    /// Sets the post-deploy health policy.
    #[must_use]
    pub const fn with_health_policy(mut self, health: HealthPolicy) -> Self {
        self.health = health;
        self
    }

    /// Returns the URL the manifest is fetched from.
    #[must_use]
    pub fn manifest_url(&self, config: &NodeConfig) -> String {
        self.repo_override
            .as_deref()
            .map_or_else(|| config.compose_url.clone(), compose_url_for)
    }

    /// Runs one reconciliation.
    ///
    /// On success the record's digest and last-run timestamp are updated and
    /// persisted.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest cannot be fetched, the workspace
    /// cannot be prepared, `compose up` fails or the containers never become
    /// healthy. The last two roll back first when previous images exist.
    pub async fn deploy(&self, config: &mut NodeConfig) -> Result<DeployOutcome> {
        if config.has_environment_drift() {
            warn!(
                "Environment '{}' does not match testnet={} release_channel={}; keeping the stored values",
                config.environment, config.testnet, config.release_channel
            );
        }

        enter(DeployPhase::Fetching);
        let url = self.manifest_url(config);
        info!("Fetching {url}");
        let manifest = self.fetcher.fetch_text(&url).await?;
        let digest = self.hasher.hash_manifest(&manifest);

        let observer = ContainerObserver::new(self.shell);

        if ContentHasher::hashes_match(&digest, &config.compose_sha)
            && observer.all_running(&SEED_CONTAINERS).await
        {
            enter(DeployPhase::Unchanged);
            info!("No changes detected: manifest matches and containers are running");
            config.last_script_run = timestamp_now();
            self.store.save(config).await?;
            return Ok(DeployOutcome::Unchanged);
        }

        let first_deploy = config.is_first_deploy();
        if !first_deploy && config.compose_sha != digest {
            info!(
                "Compose file changed: {} -> {}",
                self.hasher.short_hash(&config.compose_sha),
                self.hasher.short_hash(&digest)
            );
        }

        enter(DeployPhase::Applying);
        self.prepare_workspace(config, &manifest, first_deploy).await?;

        let snapshot = observer.snapshot_images(&SEED_CONTAINERS).await;
        debug!("Recorded {} previous image(s)", snapshot.len());

        if first_deploy {
            self.remove_legacy_containers(&observer).await;
        }

        let compose = ComposeDriver::new(
            self.shell,
            &self.paths.compose_path,
            build_compose_env(config, self.paths, self.ids),
        );

        if let Err(e) = compose.pull().await {
            warn!("Image pull failed, continuing with cached images: {e}");
        }

        if let Err(e) = compose.up().await {
            error!("docker compose up failed: {e}");
            let rolled_back = self.rollback(&compose, &snapshot).await;
            return Err(ReconcileError::ApplyFailed {
                reason: e.to_string(),
                rolled_back,
            }
            .into());
        }

        let report = HealthMonitor::new(&observer, self.health).wait_healthy().await;
        if !report.healthy {
            error!("Containers not running after {} health checks", report.attempts);
            let rolled_back = self.rollback(&compose, &snapshot).await;
            return Err(ReconcileError::HealthCheckFailed {
                attempts: report.attempts,
                rolled_back,
            }
            .into());
        }

        enter(DeployPhase::Healthy);
        config.compose_sha.clone_from(&digest);
        config.last_script_run = timestamp_now();
        self.store.save(config).await?;

        prune_images(self.shell, POST_DEPLOY_PRUNE_WINDOW).await;
        info!("Deployment complete ({})", self.hasher.short_hash(&digest));

        Ok(DeployOutcome::Deployed {
            compose_sha: digest,
            first_deploy,
        })
    }

    /// Writes the manifest and generated files.
    async fn prepare_workspace(&self, config: &NodeConfig, manifest: &str, first_deploy: bool) -> Result<()> {
        self.ensure_root().await?;

        write_file(&self.paths.compose_path, manifest).await?;

        for dir in self.paths.workspace_dirs() {
            fs::create_dir_all(&dir).await.map_err(|e| setup_failed(&dir, &e))?;
        }

        write_file(&self.paths.caddyfile_path(), &generate_caddyfile(config)).await?;

        let web_config = self.paths.web_config_path();
        if first_deploy && !fs::try_exists(&web_config).await.unwrap_or(false) {
            let contents = serde_json::json!({ "availableRegistrationSecret": config.link_secret });
            write_file(&web_config, &format!("{contents}\n")).await?;
            info!("Created {} with the registration secret", web_config.display());
        }

        Ok(())
    }

    /// Creates the root directory, escalating with sudo when needed.
    async fn ensure_root(&self) -> Result<()> {
        let root = &self.paths.seed_dir;
        if fs::try_exists(root).await.unwrap_or(false) {
            return Ok(());
        }
        if let Err(e) = fs::create_dir_all(root).await {
            info!("Creating {} requires elevated permissions ({e})", root.display());
            let root_str = root.display();
            for command in [
                format!("sudo mkdir -p \"{root_str}\""),
                format!("sudo chown \"$(id -u):$(id -g)\" \"{root_str}\""),
            ] {
                self.shell
                    .run(&command)
                    .await
                    .map_err(|err| ReconcileError::SetupFailed {
                        path: root.clone(),
                        reason: err.to_string(),
                    })?;
            }
        }
        Ok(())
    }

    /// Removes containers left by a pre-compose install.
    async fn remove_legacy_containers(&self, observer: &ContainerObserver<'_>) {
        for name in LEGACY_CONTAINERS {
            if observer.is_compose_managed(name).await == Some(false) {
                info!("Removing unmanaged container {name}");
                remove_container(self.shell, name).await;
            }
        }
    }

    /// Restores the snapshotted images. Returns true if a rollback ran.
    async fn rollback(&self, compose: &ComposeDriver<'_>, snapshot: &[ImageSnapshot]) -> bool {
        if snapshot.is_empty() {
            enter(DeployPhase::Failed);
            return false;
        }

        warn!("Rolling back to previous images");
        for image in snapshot {
            info!(
                "Restoring {} to {}",
                image.container,
                image.image_id.chars().take(19).collect::<String>()
            );
            remove_container(self.shell, &image.container).await;
            if let Err(e) = retag_image(self.shell, image).await {
                warn!("Could not re-tag {}: {e}", image.image_ref);
            }
        }

        if let Err(e) = compose.up_pinned().await {
            error!("Rollback could not restart containers: {e}");
        }
        enter(DeployPhase::RolledBack);
        true
    }
}

fn enter(phase: DeployPhase) {
    info!("Deploy phase: {phase}");
}

fn setup_failed(path: &Path, err: &std::io::Error) -> ReconcileError {
    ReconcileError::SetupFailed {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

async fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents)
        .await
        .map_err(|e| setup_failed(path, &e).into())
}
