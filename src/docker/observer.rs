//! Read-only probes against the container runtime.
//!
//! Every probe goes through [`ShellRunner::run_safe`]: a missing container,
//! a stopped daemon or unexpected output all read as "unknown" rather than
//! as an error.

use serde::Serialize;
use tracing::debug;

use crate::exec::ShellRunner;

/// Containers that make up a compose-managed node.
pub const SEED_CONTAINERS: [&str; 3] = ["seed-proxy", "seed-web", "seed-daemon"];

/// Containers a pre-compose installation may have left behind.
pub const LEGACY_CONTAINERS: [&str; 6] = [
    "seed-site",
    "seed-web",
    "seed-daemon",
    "seed-proxy",
    "grafana",
    "prometheus",
];

/// Label set by `docker compose` on the containers it creates.
pub const COMPOSE_PROJECT_LABEL: &str = "com.docker.compose.project";

/// Image a container was running before a deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSnapshot {
    /// Container name.
    pub container: String,
    /// Content-addressed image id.
    pub image_id: String,
    /// Image reference the container was created from, e.g. `seedhypermedia/web:latest`.
    pub image_ref: String,
}

/// One row of `status` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerStatus {
    /// Container name.
    pub name: String,
    /// Human-readable state reported by docker.
    pub status: String,
    /// Image reference.
    pub image: String,
}

/// Probes container state through the shell.
pub struct ContainerObserver<'a> {
    shell: &'a dyn ShellRunner,
}

impl<'a> ContainerObserver<'a> {
    /// Creates an observer.
    #[must_use]
    pub const fn new(shell: &'a dyn ShellRunner) -> Self {
        Self { shell }
    }

    async fn inspect(&self, name: &str, format: &str) -> Option<String> {
        self.shell
            .run_safe(&format!("docker inspect {name} --format '{format}' 2>/dev/null"))
            .await
    }

    /// Returns true if the container exists and is running.
    pub async fn is_running(&self, name: &str) -> bool {
        self.inspect(name, "{{.State.Running}}").await.as_deref() == Some("true")
    }

    /// Returns true if every named container is running.
    pub async fn all_running(&self, names: &[&str]) -> bool {
        for name in names {
            if !self.is_running(name).await {
                debug!("Container {name} is not running");
                return false;
            }
        }
        true
    }

    /// Returns true if the container exists, running or not.
    pub async fn exists(&self, name: &str) -> bool {
        self.inspect(name, "{{.Name}}").await.is_some()
    }

    /// Records the image id and reference of a container, if it exists.
    pub async fn image_snapshot(&self, name: &str) -> Option<ImageSnapshot> {
        let output = self.inspect(name, "{{.Image}} {{.Config.Image}}").await?;
        let (image_id, image_ref) = output.split_once(' ')?;
        if image_id.is_empty() || image_ref.trim().is_empty() {
            return None;
        }
        Some(ImageSnapshot {
            container: name.to_string(),
            image_id: image_id.to_string(),
            image_ref: image_ref.trim().to_string(),
        })
    }

    /// Snapshots every named container that exists.
    pub async fn snapshot_images(&self, names: &[&str]) -> Vec<ImageSnapshot> {
        let mut snapshots = Vec::new();
        for name in names {
            if let Some(snapshot) = self.image_snapshot(name).await {
                snapshots.push(snapshot);
            }
        }
        snapshots
    }

    /// Returns whether the container carries the compose project label.
    ///
    /// `None` means the container does not exist.
    pub async fn is_compose_managed(&self, name: &str) -> Option<bool> {
        let label = self
            .inspect(name, &format!("{{{{index .Config.Labels \"{COMPOSE_PROJECT_LABEL}\"}}}}"))
            .await?;
        Some(!label.is_empty() && label != "<no value>")
    }

    /// Returns the container environment as the JSON array docker reports.
    pub async fn env_json(&self, name: &str) -> Option<String> {
        self.inspect(name, "{{json .Config.Env}}").await
    }

    /// Returns the image reference of a container.
    pub async fn image_ref(&self, name: &str) -> Option<String> {
        self.inspect(name, "{{.Config.Image}}").await
    }

    /// Returns true if any container whose name contains `seed` is running.
    pub async fn any_seed_container_running(&self) -> bool {
        self.shell
            .run_safe("docker ps --format '{{.Names}}' 2>/dev/null | grep -q seed")
            .await
            .is_some()
    }

    /// Lists the state of every known node container that exists.
    pub async fn list(&self) -> Vec<ContainerStatus> {
        let Some(output) = self
            .shell
            .run_safe("docker ps -a --format '{{.Names}}\t{{.Status}}\t{{.Image}}' 2>/dev/null")
            .await
        else {
            return Vec::new();
        };

        let mut rows: Vec<ContainerStatus> = output
            .lines()
            .filter_map(|line| {
                let mut parts = line.split('\t');
                let name = parts.next()?.trim();
                let status = parts.next()?.trim();
                let image = parts.next().unwrap_or("").trim();
                LEGACY_CONTAINERS.contains(&name).then(|| ContainerStatus {
                    name: name.to_string(),
                    status: status.to_string(),
                    image: image.to_string(),
                })
            })
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeShell;

    #[tokio::test]
    async fn test_all_running() {
        let shell = FakeShell::new()
            .on("inspect seed-proxy --format '{{.State.Running}}'", "true")
            .on("inspect seed-web --format '{{.State.Running}}'", "true")
            .on("inspect seed-daemon --format '{{.State.Running}}'", "true");
        let observer = ContainerObserver::new(&shell);
        assert!(observer.all_running(&SEED_CONTAINERS).await);

        let shell = FakeShell::new()
            .on("inspect seed-proxy --format '{{.State.Running}}'", "true")
            .on("inspect seed-web --format '{{.State.Running}}'", "false")
            .on("inspect seed-daemon --format '{{.State.Running}}'", "true");
        let observer = ContainerObserver::new(&shell);
        assert!(!observer.all_running(&SEED_CONTAINERS).await);
    }

    #[tokio::test]
    async fn test_missing_container_is_not_running() {
        let shell = FakeShell::new().fail_on("docker inspect");
        let observer = ContainerObserver::new(&shell);

        assert!(!observer.is_running("seed-web").await);
        assert!(!observer.exists("seed-web").await);
        assert!(observer.image_snapshot("seed-web").await.is_none());
        assert!(observer.is_compose_managed("seed-web").await.is_none());
    }

    #[tokio::test]
    async fn test_image_snapshot() {
        let shell = FakeShell::new().on(
            "inspect seed-web --format '{{.Image}} {{.Config.Image}}'",
            "sha256:abc seedhypermedia/web:latest",
        );
        let observer = ContainerObserver::new(&shell);

        let snapshot = observer.image_snapshot("seed-web").await.expect("snapshot");
        assert_eq!(snapshot.container, "seed-web");
        assert_eq!(snapshot.image_id, "sha256:abc");
        assert_eq!(snapshot.image_ref, "seedhypermedia/web:latest");

        let snapshots = observer.snapshot_images(&SEED_CONTAINERS).await;
        assert_eq!(snapshots.len(), 1);
    }

    #[tokio::test]
    async fn test_compose_label() {
        let shell = FakeShell::new()
            .on("inspect seed-web --format '{{index .Config.Labels", "seed")
            .on("inspect grafana --format '{{index .Config.Labels", "<no value>")
            .on("inspect seed-site --format '{{index .Config.Labels", "");
        let observer = ContainerObserver::new(&shell);

        assert_eq!(observer.is_compose_managed("seed-web").await, Some(true));
        assert_eq!(observer.is_compose_managed("grafana").await, Some(false));
        assert_eq!(observer.is_compose_managed("seed-site").await, Some(false));
        assert!(
            shell
                .calls()
                .iter()
                .any(|c| c.contains("{{index .Config.Labels \"com.docker.compose.project\"}}"))
        );
    }

    #[tokio::test]
    async fn test_list_keeps_known_containers() {
        let shell = FakeShell::new().on(
            "docker ps -a",
            "seed-web\tUp 2 hours\tseedhypermedia/web:latest\n\
             postgres\tUp 3 days\tpostgres:16\n\
             seed-daemon\tExited (1) 5 minutes ago\tseedhypermedia/site:latest",
        );
        let observer = ContainerObserver::new(&shell);

        let rows = observer.list().await;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "seed-daemon");
        assert_eq!(rows[1].status, "Up 2 hours");
    }
}
