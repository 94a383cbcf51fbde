//! Backup and restore of a node's configuration and data.
//!
//! A backup is a gzip tarball of the node root holding only the allow-listed
//! entries below, plus a `backup-meta.json` describing where it came from.
//! Restoring unpacks the archive over the root and reinstalls the scheduled
//! jobs that were active when it was taken.

use chrono::Local;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tar::{Archive, Builder};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::config::{ConfigStore, DeployPaths, NodeConfig, VERSION};
use crate::cron::CronReconciler;
use crate::docker::{ComposeDriver, SEED_CONTAINERS, remove_container};
use crate::error::{BackupError, Result, SeedDeployError};
use crate::exec::ShellRunner;
use crate::reconciler::timestamp_now;
use crate::render::{ProcessIds, build_compose_env};

/// Name of the metadata file inside an archive.
pub const METADATA_FILE: &str = "backup-meta.json";

/// Entries of the node root that go into an archive.
pub const BACKUP_ENTRIES: [&str; 6] = [
    "config.json",
    METADATA_FILE,
    "docker-compose.yml",
    "proxy",
    "web",
    "daemon",
];

const ARCHIVE_PREFIX: &str = "seed-backup-";
const ARCHIVE_SUFFIX: &str = ".tar.gz";

/// Description of a backup, stored inside the archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupMetadata {
    /// Version of the program that wrote the archive.
    pub version: String,
    /// When the archive was written.
    pub timestamp: String,
    /// Public hostname of the node.
    pub hostname: String,
    /// Name of the machine the archive was written on.
    pub machine: String,
    /// Node root at backup time.
    pub seed_dir: String,
    /// Scheduled-job lines active at backup time.
    #[serde(default)]
    pub cron_lines: Vec<String>,
}

impl BackupMetadata {
    fn describe(config: &NodeConfig, paths: &DeployPaths, cron_lines: Vec<String>) -> Self {
        let machine = hostname::get()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|_| String::from("unknown"));

        Self {
            version: VERSION.to_string(),
            timestamp: timestamp_now(),
            hostname: config.domain.clone(),
            machine,
            seed_dir: paths.seed_dir.display().to_string(),
            cron_lines,
        }
    }

    fn to_file_contents(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self)
            .map_err(|e| SeedDeployError::internal(format!("Failed to serialize backup metadata: {e}")))?;
        json.push('\n');
        Ok(json)
    }
}

/// A written archive.
#[derive(Debug, Clone)]
pub struct BackupReport {
    /// Archive location.
    pub path: PathBuf,
    /// Archive size in bytes.
    pub size_bytes: u64,
    /// Embedded metadata.
    pub metadata: BackupMetadata,
}

/// Returns `<root>/backups/seed-backup-<YYYYmmdd-HHMMSS>.tar.gz` for now.
#[must_use]
pub fn default_archive_path(paths: &DeployPaths) -> PathBuf {
    let stamp = Local::now().format("%Y%m%d-%H%M%S");
    paths
        .backups_dir()
        .join(format!("{ARCHIVE_PREFIX}{stamp}{ARCHIVE_SUFFIX}"))
}

fn archive_error(path: &Path) -> impl Fn(std::io::Error) -> SeedDeployError + '_ {
    move |e| BackupError::archive(path, e.to_string()).into()
}

/// Packs the allow-listed entries of `root` into a gzip tarball at `dest`.
///
/// Missing entries are skipped. Returns the archive size.
///
/// # Errors
///
/// Returns an error if any entry cannot be read or the archive cannot be
/// written.
pub fn create_archive(root: &Path, dest: &Path) -> Result<u64> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(archive_error(dest))?;
    }

    let file = File::create(dest).map_err(archive_error(dest))?;
    let mut builder = Builder::new(GzEncoder::new(file, Compression::default()));

    for entry in BACKUP_ENTRIES {
        let source = root.join(entry);
        if source.is_dir() {
            builder.append_dir_all(entry, &source).map_err(archive_error(dest))?;
        } else if source.is_file() {
            builder
                .append_path_with_name(&source, entry)
                .map_err(archive_error(dest))?;
        } else {
            debug!("Skipping missing backup entry: {entry}");
        }
    }

    let encoder = builder.into_inner().map_err(archive_error(dest))?;
    let file = encoder.finish().map_err(archive_error(dest))?;
    file.sync_all().map_err(archive_error(dest))?;

    Ok(std::fs::metadata(dest)?.len())
}

/// Reads the embedded metadata without extracting anything.
///
/// # Errors
///
/// Returns an error if the archive cannot be read or carries no metadata.
pub fn read_metadata(archive: &Path) -> Result<BackupMetadata> {
    let file = File::open(archive).map_err(archive_error(archive))?;
    let mut tarball = Archive::new(GzDecoder::new(file));

    for entry in tarball.entries().map_err(archive_error(archive))? {
        let mut entry = entry.map_err(archive_error(archive))?;
        let is_metadata = entry
            .path()
            .map(|p| p == Path::new(METADATA_FILE))
            .unwrap_or(false);
        if !is_metadata {
            continue;
        }

        let mut content = String::new();
        entry
            .read_to_string(&mut content)
            .map_err(archive_error(archive))?;
        return serde_json::from_str(&content)
            .map_err(|e| BackupError::archive(archive, format!("invalid {METADATA_FILE}: {e}")).into());
    }

    Err(BackupError::MissingMetadata {
        path: archive.to_path_buf(),
        file: METADATA_FILE.to_string(),
    }
    .into())
}

/// Extracts an archive over `root`.
///
/// # Errors
///
/// Returns an error if extraction fails.
pub fn unpack_archive(archive: &Path, root: &Path) -> Result<()> {
    let file = File::open(archive).map_err(archive_error(archive))?;
    Archive::new(GzDecoder::new(file))
        .unpack(root)
        .map_err(archive_error(archive))
}

/// Returns the newest archive in `dir`.
///
/// # Errors
///
/// Returns an error if the directory holds no archives.
pub async fn latest_archive(dir: &Path) -> Result<PathBuf> {
    let no_archives = || BackupError::NoArchives {
        dir: dir.to_path_buf(),
    };

    let Ok(mut entries) = fs::read_dir(dir).await else {
        return Err(no_archives().into());
    };

    let mut newest: Option<String> = None;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(ARCHIVE_PREFIX)
            && name.ends_with(ARCHIVE_SUFFIX)
            && newest.as_ref().is_none_or(|current| name > *current)
        {
            newest = Some(name);
        }
    }

    newest.map(|name| dir.join(name)).ok_or_else(|| no_archives().into())
}

async fn run_blocking<T, F>(task: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| SeedDeployError::internal(format!("background task failed: {e}")))?
}

/// Takes and restores backups of one node.
pub struct BackupManager<'a> {
    paths: &'a DeployPaths,
    store: &'a dyn ConfigStore,
    shell: &'a dyn ShellRunner,
    ids: ProcessIds,
}

impl<'a> BackupManager<'a> {
    /// Creates a manager for the node at `paths`.
    #[must_use]
    pub const fn new(
        paths: &'a DeployPaths,
        store: &'a dyn ConfigStore,
        shell: &'a dyn ShellRunner,
        ids: ProcessIds,
    ) -> Self {
        Self {
            paths,
            store,
            shell,
            ids,
        }
    }

    fn metadata_path(&self) -> PathBuf {
        self.paths.seed_dir.join(METADATA_FILE)
    }

    async fn remove_metadata(&self) {
        let path = self.metadata_path();
        if let Err(e) = fs::remove_file(&path).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!("Failed to remove {}: {e}", path.display());
        }
    }

    /// Writes an archive to `dest`, or to [`default_archive_path`].
    ///
    /// Containers are stopped while the archive is written and started
    /// again afterwards, also when archiving fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the node has no configuration or the archive
    /// cannot be written.
    pub async fn backup(&self, dest: Option<PathBuf>) -> Result<BackupReport> {
        if !self.store.exists().await? {
            return Err(BackupError::NotConfigured {
                path: self.paths.config_path.clone(),
            }
            .into());
        }
        let config = self.store.load().await?;
        let dest = dest.unwrap_or_else(|| default_archive_path(self.paths));

        let compose = ComposeDriver::new(
            self.shell,
            &self.paths.compose_path,
            build_compose_env(&config, self.paths, self.ids),
        );

        info!("Stopping containers for a consistent backup");
        if let Err(e) = compose.stop().await {
            warn!("Failed to stop containers: {e}");
        }

        let result = self.write_archive(&config, &dest).await;

        info!("Starting containers");
        if let Err(e) = compose.start().await {
            warn!("Failed to restart containers: {e}");
        }

        let report = result?;
        info!("Backup written to {} ({} bytes)", report.path.display(), report.size_bytes);
        Ok(report)
    }

    async fn write_archive(&self, config: &NodeConfig, dest: &Path) -> Result<BackupReport> {
        let cron_lines = CronReconciler::new(self.shell, self.paths).current_lines().await;
        let metadata = BackupMetadata::describe(config, self.paths, cron_lines);

        self.remove_metadata().await;
        fs::write(self.metadata_path(), metadata.to_file_contents()?).await?;

        let root = self.paths.seed_dir.clone();
        let target = dest.to_path_buf();
        let packed = run_blocking(move || create_archive(&root, &target)).await;
        self.remove_metadata().await;

        match packed {
            Ok(size_bytes) => Ok(BackupReport {
                path: dest.to_path_buf(),
                size_bytes,
                metadata,
            }),
            Err(e) => {
                let _ = fs::remove_file(dest).await;
                Err(e)
            }
        }
    }

    /// Reads the metadata of `archive` for a summary before restoring.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive is unreadable or not a backup.
    pub async fn inspect(&self, archive: &Path) -> Result<BackupMetadata> {
        let archive = archive.to_path_buf();
        run_blocking(move || read_metadata(&archive)).await
    }

    /// Restores `archive` over the node root.
    ///
    /// Containers are removed first. The scheduled jobs recorded in the
    /// archive replace the current ones. Redeploying is left to the caller.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive is unreadable, extraction fails or
    /// the jobs cannot be reinstalled.
    pub async fn restore(&self, archive: &Path) -> Result<BackupMetadata> {
        let metadata = self.inspect(archive).await?;

        info!("Removing containers before restore");
        for name in SEED_CONTAINERS {
            remove_container(self.shell, name).await;
        }

        fs::create_dir_all(&self.paths.seed_dir).await?;
        let source = archive.to_path_buf();
        let root = self.paths.seed_dir.clone();
        run_blocking(move || unpack_archive(&source, &root)).await?;
        self.remove_metadata().await;
        info!("Restored {} into {}", archive.display(), self.paths.seed_dir.display());

        CronReconciler::new(self.shell, self.paths)
            .install_lines(&metadata.cron_lines)
            .await?;

        Ok(metadata)
    }
}
