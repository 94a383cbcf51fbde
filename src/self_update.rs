//! Self-update of the installed program.
//!
//! Scheduled runs first replace the installed binary with the latest
//! published build. The new build only takes effect on the next invocation,
//! and any failure leaves the current binary in place.

use std::fmt;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::{ContentHasher, binary_url_for, sha256_bytes};
use crate::error::Result;
use crate::exec::Fetcher;

/// Result of an update attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The binary was replaced.
    Updated,
    /// The published build matches the installed one.
    UpToDate,
    /// The update could not run.
    Skipped(String),
}

impl fmt::Display for UpdateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Updated => write!(f, "updated"),
            Self::UpToDate => write!(f, "up to date"),
            Self::Skipped(reason) => write!(f, "skipped: {reason}"),
        }
    }
}

/// Replaces the installed binary with the published build.
pub struct SelfUpdater<'a> {
    fetcher: &'a dyn Fetcher,
    binary_url: String,
    target: PathBuf,
}

impl<'a> SelfUpdater<'a> {
    /// Creates an updater that fetches from `repo_url` and replaces `target`.
    #[must_use]
    pub fn new(fetcher: &'a dyn Fetcher, repo_url: &str, target: &Path) -> Self {
        Self {
            fetcher,
            binary_url: binary_url_for(repo_url),
            target: target.to_path_buf(),
        }
    }

    /// Runs the update. Never fails; problems are logged and reported as
    /// [`UpdateOutcome::Skipped`].
    pub async fn update(&self) -> UpdateOutcome {
        match self.try_update().await {
            Ok(outcome) => {
                info!("Self-update: {outcome}");
                outcome
            }
            Err(e) => {
                warn!("Self-update failed, keeping current version: {e}");
                UpdateOutcome::Skipped(e.to_string())
            }
        }
    }

    async fn try_update(&self) -> Result<UpdateOutcome> {
        let current = match tokio::fs::read(&self.target).await {
            Ok(bytes) => bytes,
            Err(e) => {
                return Ok(UpdateOutcome::Skipped(format!(
                    "cannot read {}: {e}",
                    self.target.display()
                )));
            }
        };

        debug!("Checking {} for a newer build", self.binary_url);
        let latest = self.fetcher.fetch_bytes(&self.binary_url).await?;
        if latest.is_empty() {
            return Ok(UpdateOutcome::Skipped(String::from("published build is empty")));
        }

        if ContentHasher::hashes_match(&sha256_bytes(&latest), &sha256_bytes(&current)) {
            return Ok(UpdateOutcome::UpToDate);
        }

        let file_name = self
            .target
            .file_name()
            .map_or_else(|| String::from("seed-deploy"), |n| n.to_string_lossy().into_owned());
        let temp_path = self.target.with_file_name(format!(".{file_name}.update"));

        tokio::fs::write(&temp_path, &latest).await?;
        if let Err(e) = install(&temp_path, &self.target).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e);
        }

        Ok(UpdateOutcome::Updated)
    }
}

async fn install(temp_path: &Path, target: &Path) -> Result<()> {
    tokio::fs::set_permissions(temp_path, std::fs::Permissions::from_mode(0o755)).await?;
    tokio::fs::rename(temp_path, target).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::{HttpFetcher, MockFetcher};
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn installed(temp: &TempDir, contents: &[u8]) -> PathBuf {
        let target = temp.path().join("seed-deploy");
        std::fs::write(&target, contents).expect("write");
        target
    }

    async fn serve(body: &[u8]) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ops/dist/seed-deploy"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_replaces_changed_binary() {
        let temp = TempDir::new().expect("tempdir");
        let target = installed(&temp, b"old build");
        let server = serve(b"new build").await;
        let fetcher = HttpFetcher::new().expect("client");

        let outcome = SelfUpdater::new(&fetcher, &server.uri(), &target).update().await;

        assert_eq!(outcome, UpdateOutcome::Updated);
        assert_eq!(std::fs::read(&target).expect("read"), b"new build");
        let mode = std::fs::metadata(&target).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
        assert!(!temp.path().join(".seed-deploy.update").exists());
    }

    #[tokio::test]
    async fn test_identical_build_is_up_to_date() {
        let temp = TempDir::new().expect("tempdir");
        let target = installed(&temp, b"same build");
        let server = serve(b"same build").await;
        let fetcher = HttpFetcher::new().expect("client");

        let outcome = SelfUpdater::new(&fetcher, &server.uri(), &target).update().await;

        assert_eq!(outcome, UpdateOutcome::UpToDate);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_skipped() {
        let temp = TempDir::new().expect("tempdir");
        let target = installed(&temp, b"old build");
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let fetcher = HttpFetcher::new().expect("client");

        let outcome = SelfUpdater::new(&fetcher, &server.uri(), &target).update().await;

        assert!(matches!(outcome, UpdateOutcome::Skipped(_)));
        assert_eq!(std::fs::read(&target).expect("read"), b"old build");
    }

    #[tokio::test]
    async fn test_missing_target_is_skipped_without_fetching() {
        let temp = TempDir::new().expect("tempdir");
        let mut fetcher = MockFetcher::new();
        fetcher.expect_fetch_bytes().never();

        let outcome = SelfUpdater::new(&fetcher, "https://example.com", &temp.path().join("missing"))
            .update()
            .await;

        assert!(matches!(outcome, UpdateOutcome::Skipped(_)));
    }

    #[tokio::test]
    async fn test_empty_build_is_skipped() {
        let temp = TempDir::new().expect("tempdir");
        let target = installed(&temp, b"old build");
        let mut fetcher = MockFetcher::new();
        fetcher.expect_fetch_bytes().returning(|_| Ok(Vec::new()));

        let outcome = SelfUpdater::new(&fetcher, "https://example.com", &target).update().await;

        assert!(matches!(outcome, UpdateOutcome::Skipped(_)));
        assert_eq!(std::fs::read(&target).expect("read"), b"old build");
    }
}
