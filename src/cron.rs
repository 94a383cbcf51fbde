//! Scheduled jobs for unattended operation.
//!
//! Two jobs are managed in the user's crontab, identified by trailing marker
//! comments: a nightly deployment and a periodic image cleanup. Every other
//! line of the crontab is left untouched.

use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info};

use crate::config::DeployPaths;
use crate::error::Result;
use crate::exec::ShellRunner;

/// Marker of the nightly deployment job.
pub const DEPLOY_MARKER: &str = "# seed-deploy";

/// Marker of the image cleanup job.
pub const CLEANUP_MARKER: &str = "# seed-cleanup";

/// Age filter of the scheduled image cleanup.
pub const CLEANUP_PRUNE_WINDOW: &str = "24h";

fn is_managed(line: &str) -> bool {
    line.contains(DEPLOY_MARKER) || line.contains(CLEANUP_MARKER)
}

/// The canonical job lines for a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronJobs {
    seed_dir: PathBuf,
    deploy_log: PathBuf,
    runner: String,
}

impl CronJobs {
    /// Jobs that run the installed binary of `paths`.
    #[must_use]
    pub fn new(paths: &DeployPaths) -> Self {
        Self {
            seed_dir: paths.seed_dir.clone(),
            deploy_log: paths.deploy_log.clone(),
            runner: paths.binary_path.display().to_string(),
        }
    }

    /// Uses another command to start the nightly deployment.
    #[must_use]
    pub fn with_runner(mut self, runner: impl Into<String>) -> Self {
        self.runner = runner.into();
        self
    }

    /// Nightly deployment at 02:00.
    #[must_use]
    pub fn deploy_line(&self) -> String {
        format!(
            "0 2 * * * {} deploy >> {} 2>&1 {DEPLOY_MARKER}",
            self.runner,
            self.deploy_log.display()
        )
    }

    /// Image cleanup every four hours.
    #[must_use]
    pub fn cleanup_line(&self) -> String {
        format!(
            "0 0,4,8,12,16,20 * * * docker image prune -a -f --filter \"until={CLEANUP_PRUNE_WINDOW}\" {CLEANUP_MARKER}"
        )
    }

    /// Both lines in install order.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        vec![self.deploy_line(), self.cleanup_line()]
    }

    /// Directory the jobs belong to.
    #[must_use]
    pub fn seed_dir(&self) -> &std::path::Path {
        &self.seed_dir
    }
}

/// Rewrites a crontab so it ends with exactly `lines` as its managed jobs.
///
/// Managed lines are dropped, blank lines at either end are removed and
/// runs of blank lines collapse to one. Applying the same lines twice gives
/// the same result.
#[must_use]
pub fn build_crontab(existing: &str, lines: &[String]) -> String {
    let mut kept: Vec<&str> = Vec::new();
    for line in existing.lines().filter(|line| !is_managed(line)) {
        let blank = line.trim().is_empty();
        let previous_blank = kept.last().is_none_or(|prev| prev.trim().is_empty());
        if blank && previous_blank {
            continue;
        }
        kept.push(if blank { "" } else { line });
    }
    while kept.last().is_some_and(|line| line.is_empty()) {
        kept.pop();
    }

    kept.extend(lines.iter().map(String::as_str));
    if kept.is_empty() {
        return String::new();
    }

    let mut crontab = kept.join("\n");
    crontab.push('\n');
    crontab
}

/// Returns the managed lines of a crontab.
#[must_use]
pub fn extract_cron_lines(existing: &str) -> Vec<String> {
    existing
        .lines()
        .filter(|line| is_managed(line))
        .map(str::to_string)
        .collect()
}

/// Reads and writes the user's crontab through the shell.
pub struct CronReconciler<'a> {
    shell: &'a dyn ShellRunner,
    temp_path: PathBuf,
}

impl<'a> CronReconciler<'a> {
    /// Creates a reconciler staging files in the node's root directory.
    #[must_use]
    pub fn new(shell: &'a dyn ShellRunner, paths: &DeployPaths) -> Self {
        Self {
            shell,
            temp_path: paths.seed_dir.join(".crontab.tmp"),
        }
    }

    /// Returns the current crontab, empty when none is installed.
    pub async fn current(&self) -> String {
        self.shell
            .run_safe("crontab -l 2>/dev/null")
            .await
            .unwrap_or_default()
    }

    /// Returns the managed lines of the current crontab.
    pub async fn current_lines(&self) -> Vec<String> {
        extract_cron_lines(&self.current().await)
    }

    /// Installs the canonical jobs.
    ///
    /// # Errors
    ///
    /// Returns an error if the crontab cannot be written.
    pub async fn install(&self, jobs: &CronJobs) -> Result<()> {
        debug!("Installing cron jobs for {}", jobs.seed_dir().display());
        self.install_lines(&jobs.lines()).await
    }

    /// Installs exactly `lines` as the managed jobs.
    ///
    /// # Errors
    ///
    /// Returns an error if the crontab cannot be written.
    pub async fn install_lines(&self, lines: &[String]) -> Result<()> {
        let crontab = build_crontab(&self.current().await, lines);
        self.write(&crontab).await?;
        info!("Installed {} scheduled job(s)", lines.len());
        Ok(())
    }

    /// Removes the managed jobs.
    ///
    /// # Errors
    ///
    /// Returns an error if the crontab cannot be written.
    pub async fn remove(&self) -> Result<()> {
        let existing = self.current().await;
        if extract_cron_lines(&existing).is_empty() {
            debug!("No scheduled jobs to remove");
            return Ok(());
        }
        self.write(&build_crontab(&existing, &[])).await?;
        info!("Removed scheduled jobs");
        Ok(())
    }

    async fn write(&self, crontab: &str) -> Result<()> {
        if let Some(parent) = self.temp_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&self.temp_path, crontab).await?;
        let result = self
            .shell
            .run(&format!("crontab \"{}\"", self.temp_path.display()))
            .await;
        let _ = fs::remove_file(&self.temp_path).await;
        result.map(|_| ())
    }
}
