//! Driver for `docker compose` and the few raw docker commands the engine needs.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::Result;
use crate::exec::ShellRunner;
use crate::render::ComposeEnv;

use super::observer::ImageSnapshot;

/// Age filter for the prune that follows a successful deployment.
pub const POST_DEPLOY_PRUNE_WINDOW: &str = "10m";

/// Runs compose commands against the node's manifest with its environment.
pub struct ComposeDriver<'a> {
    shell: &'a dyn ShellRunner,
    compose_path: PathBuf,
    env: ComposeEnv,
}

impl<'a> ComposeDriver<'a> {
    /// Creates a driver for the manifest at `compose_path`.
    #[must_use]
    pub fn new(shell: &'a dyn ShellRunner, compose_path: &Path, env: ComposeEnv) -> Self {
        Self {
            shell,
            compose_path: compose_path.to_path_buf(),
            env,
        }
    }

    /// Builds the full command line for a compose subcommand.
    #[must_use]
    pub fn command(&self, args: &str) -> String {
        format!(
            "{} docker compose -f \"{}\" {args}",
            self.env.to_assignments(),
            self.compose_path.display()
        )
    }

    async fn exec(&self, args: &str) -> Result<()> {
        let output = self.shell.exec(&self.command(args)).await?;
        if !output.stderr.trim().is_empty() {
            debug!("compose {args}: {}", output.stderr.trim());
        }
        Ok(())
    }

    /// Pulls the images referenced by the manifest.
    ///
    /// # Errors
    ///
    /// Returns an error if the pull fails.
    pub async fn pull(&self) -> Result<()> {
        self.exec("pull").await
    }

    /// Creates or updates the services without pulling again.
    ///
    /// # Errors
    ///
    /// Returns an error if compose fails.
    pub async fn up(&self) -> Result<()> {
        self.exec("up -d --quiet-pull").await
    }

    /// Starts the services using only images already present locally.
    ///
    /// # Errors
    ///
    /// Returns an error if compose fails.
    pub async fn up_pinned(&self) -> Result<()> {
        self.exec("up -d --pull never").await
    }

    /// Starts the services.
    ///
    /// # Errors
    ///
    /// Returns an error if compose fails.
    pub async fn start(&self) -> Result<()> {
        self.exec("up -d").await
    }

    /// Stops the services without removing them.
    ///
    /// # Errors
    ///
    /// Returns an error if compose fails.
    pub async fn stop(&self) -> Result<()> {
        self.exec("stop").await
    }

    /// Restarts the services.
    ///
    /// # Errors
    ///
    /// Returns an error if compose fails.
    pub async fn restart(&self) -> Result<()> {
        self.exec("restart").await
    }

    /// Stops and removes the services.
    ///
    /// # Errors
    ///
    /// Returns an error if compose fails.
    pub async fn down(&self) -> Result<()> {
        self.exec("down").await
    }

    /// Follows service logs in the current terminal.
    ///
    /// # Errors
    ///
    /// Returns an error if compose exits non-zero.
    pub async fn logs(&self, service: Option<&str>) -> Result<()> {
        let args = service.map_or_else(
            || String::from("logs -f --tail 100"),
            |service| format!("logs -f --tail 100 {service}"),
        );
        self.shell.run_interactive(&self.command(&args)).await
    }
}

/// Stops and removes a container. Failures are ignored.
pub async fn remove_container(shell: &dyn ShellRunner, name: &str) {
    debug!("Removing container {name}");
    shell.run_safe(&format!("docker stop {name} 2>/dev/null")).await;
    shell.run_safe(&format!("docker rm {name} 2>/dev/null")).await;
}

/// Points an image reference back at a previously recorded image id.
///
/// # Errors
///
/// Returns an error if `docker tag` fails.
pub async fn retag_image(shell: &dyn ShellRunner, snapshot: &ImageSnapshot) -> Result<()> {
    shell
        .run(&format!("docker tag {} {}", snapshot.image_id, snapshot.image_ref))
        .await
        .map(|_| ())
}

/// Removes unused images older than `until`. Failures are logged.
pub async fn prune_images(shell: &dyn ShellRunner, until: &str) {
    let command = format!("docker image prune -a -f --filter \"until={until}\"");
    if let Err(e) = shell.exec(&command).await {
        warn!("Image prune failed: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeployPaths;
    use crate::render::{ProcessIds, build_compose_env};
    use crate::testing::{FakeShell, sample_config};

    fn driver(shell: &FakeShell) -> ComposeDriver<'_> {
        let paths = DeployPaths::new("/opt/seed");
        let env = build_compose_env(&sample_config(), &paths, ProcessIds { uid: 1000, gid: 1000 });
        ComposeDriver::new(shell, &paths.compose_path, env)
    }

    #[test]
    fn test_command_prefixes_env() {
        let shell = FakeShell::new();
        let command = driver(&shell).command("up -d");

        assert!(command.starts_with("SEED_SITE_HOSTNAME=\"https://node1.seed.run\" "));
        assert!(command.ends_with(" docker compose -f \"/opt/seed/docker-compose.yml\" up -d"));
    }

    #[tokio::test]
    async fn test_subcommands() {
        let shell = FakeShell::new();
        let compose = driver(&shell);

        compose.pull().await.expect("pull");
        compose.up().await.expect("up");
        compose.up_pinned().await.expect("up pinned");
        compose.logs(Some("seed-web")).await.expect("logs");

        let calls = shell.calls();
        assert!(calls[0].ends_with("docker-compose.yml\" pull"));
        assert!(calls[1].ends_with("up -d --quiet-pull"));
        assert!(calls[2].ends_with("up -d --pull never"));
        assert!(calls[3].ends_with("logs -f --tail 100 seed-web"));
    }

    #[tokio::test]
    async fn test_failure_propagates() {
        let shell = FakeShell::new().fail_on("up -d --quiet-pull");
        assert!(driver(&shell).up().await.is_err());
    }

    #[tokio::test]
    async fn test_docker_helpers() {
        let shell = FakeShell::new().fail_on("docker image prune");

        remove_container(&shell, "grafana").await;
        retag_image(
            &shell,
            &ImageSnapshot {
                container: String::from("seed-web"),
                image_id: String::from("sha256:abc"),
                image_ref: String::from("seedhypermedia/web:latest"),
            },
        )
        .await
        .expect("tag");
        prune_images(&shell, POST_DEPLOY_PRUNE_WINDOW).await;

        assert_eq!(
            shell.calls(),
            vec![
                "docker stop grafana 2>/dev/null",
                "docker rm grafana 2>/dev/null",
                "docker tag sha256:abc seedhypermedia/web:latest",
                "docker image prune -a -f --filter \"until=10m\"",
            ]
        );
    }
}
