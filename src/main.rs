//! Seed Deploy CLI entrypoint.
//!
//! This is the main entrypoint for the seed-deploy command-line tool.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use seed_deploy::backup::{BackupManager, latest_archive};
use seed_deploy::cli::{Cli, Commands, CronAction, OutputFormatter};
use seed_deploy::config::{ConfigStore, DEFAULT_REPO_URL, DeployPaths, LocalConfigStore, NodeConfig};
use seed_deploy::cron::{CronJobs, CronReconciler};
use seed_deploy::docker::{ComposeDriver, ContainerObserver, SEED_CONTAINERS, remove_container};
use seed_deploy::error::{ConfigError, Result, SeedDeployError};
use seed_deploy::exec::{HttpFetcher, ShellRunner, SystemShell};
use seed_deploy::legacy::LegacyDetector;
use seed_deploy::reconciler::{DeployOutcome, Reconciler};
use seed_deploy::render::{ProcessIds, build_compose_env};
use seed_deploy::self_update::SelfUpdater;
use seed_deploy::setup::{InquireWizard, SetupFlows, SetupStep, Wizard, confirm_or_decline, plan_deploy};

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            ErrorKind::InvalidSubcommand => {
                eprintln!("{e}");
                let _ = Cli::command().print_help();
                return ExitCode::from(2);
            }
            _ => e.exit(),
        },
    };

    // Initialize logging
    init_logging(cli.verbose);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_cancelled() => {
            eprintln!("{e}. Run seed-deploy again to resume.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool) {
    let filter = match std::env::var("SEED_DEPLOY_LOG") {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::new(directives),
        _ if verbose => EnvFilter::new("debug"),
        _ => EnvFilter::new("info"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Everything a command needs, resolved once per invocation.
struct Context {
    paths: DeployPaths,
    store: LocalConfigStore,
    shell: SystemShell,
    fetcher: HttpFetcher,
    ids: ProcessIds,
    repo_url: String,
    repo_override: Option<String>,
    current_exe: Option<PathBuf>,
    interactive: bool,
    formatter: OutputFormatter,
}

impl Context {
    fn from_env(cli: &Cli) -> Result<Self> {
        let current_exe = std::env::current_exe().ok();
        let seed_dir = std::env::var("SEED_DIR").ok();
        let repo_override = std::env::var("SEED_REPO_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let paths = DeployPaths::resolve(seed_dir.as_deref(), current_exe.as_deref());
        debug!("Using root {}", paths.seed_dir.display());

        Ok(Self {
            store: LocalConfigStore::new(&paths),
            paths,
            shell: SystemShell::new(),
            fetcher: HttpFetcher::new()?,
            ids: ProcessIds::current(),
            repo_url: repo_override.clone().unwrap_or_else(|| DEFAULT_REPO_URL.to_string()),
            repo_override,
            current_exe,
            interactive: std::io::stdin().is_terminal() && std::io::stdout().is_terminal(),
            formatter: OutputFormatter::new(cli.output),
        })
    }

    fn flows(&self) -> SetupFlows<'_> {
        SetupFlows::new(&self.paths, &self.store, &self.shell, self.ids)
    }

    fn reconciler(&self) -> Reconciler<'_> {
        Reconciler::new(&self.paths, &self.store, &self.shell, &self.fetcher, self.ids)
            .with_repo_override(self.repo_override.clone())
    }

    fn backups(&self) -> BackupManager<'_> {
        BackupManager::new(&self.paths, &self.store, &self.shell, self.ids)
    }

    fn cron(&self) -> CronReconciler<'_> {
        CronReconciler::new(&self.shell, &self.paths)
    }

    fn cron_jobs(&self) -> CronJobs {
        let jobs = CronJobs::new(&self.paths);
        match &self.current_exe {
            Some(exe) if *exe != self.paths.binary_path => jobs.with_runner(exe.display().to_string()),
            _ => jobs,
        }
    }

    async fn load_config(&self) -> Result<NodeConfig> {
        if !self.store.exists().await? {
            return Err(ConfigError::FileNotFound {
                path: self.paths.config_path.clone(),
            }
            .into());
        }
        self.store.load().await
    }

    fn compose(&self, config: &NodeConfig) -> ComposeDriver<'_> {
        ComposeDriver::new(
            &self.shell,
            &self.paths.compose_path,
            build_compose_env(config, &self.paths, self.ids),
        )
    }

    fn require_terminal(&self, command: &str) -> Result<()> {
        if self.interactive {
            Ok(())
        } else {
            Err(SeedDeployError::internal(format!(
                "{command} asks for confirmation and needs an interactive terminal"
            )))
        }
    }

    fn emit(&self, output: &str) {
        println!("{}", output.trim_end());
    }
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let ctx = Context::from_env(&cli)?;

    match cli.command_or_default() {
        Commands::Deploy { reconfigure } => cmd_deploy(&ctx, reconfigure).await,
        command @ (Commands::Stop | Commands::Start | Commands::Restart) => {
            cmd_lifecycle(&ctx, &command).await
        }
        Commands::Status => cmd_status(&ctx).await,
        Commands::Config => cmd_config(&ctx).await,
        Commands::Logs { service } => cmd_logs(&ctx, service.as_deref()).await,
        Commands::Cron { action } => cmd_cron(&ctx, action).await,
        Commands::Backup { path } => cmd_backup(&ctx, path).await,
        Commands::Restore { path } => cmd_restore(&ctx, path).await,
        Commands::Uninstall => cmd_uninstall(&ctx).await,
    }
}

/// Deploy, running setup first when the node has no configuration.
async fn cmd_deploy(ctx: &Context, reconfigure: bool) -> Result<()> {
    let has_config = ctx.store.exists().await?;
    let legacy = if !has_config && ctx.interactive {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/root"));
        LegacyDetector::new(&ctx.shell, &home).detect().await
    } else {
        None
    };
    let plan = plan_deploy(has_config, reconfigure, ctx.interactive, legacy.is_some());
    debug!("Deploy plan: {plan:?}");

    if plan.self_update {
        let target = ctx.current_exe.as_deref().unwrap_or(&ctx.paths.binary_path);
        SelfUpdater::new(&ctx.fetcher, &ctx.repo_url, target).update().await;
    }
    if plan.reconfigure_ignored {
        warn!("--reconfigure needs an interactive terminal; deploying the stored config");
    }

    let mut wizard = InquireWizard::new();
    let mut config = match plan.setup {
        SetupStep::MissingConfig => {
            return Err(ConfigError::FileNotFound {
                path: ctx.paths.config_path.clone(),
            }
            .into());
        }
        SetupStep::Headless => {
            info!(
                "Seed deploy v{} - config found at {}, running headless",
                seed_deploy::config::VERSION,
                ctx.paths.config_path.display()
            );
            ctx.store.load().await?
        }
        SetupStep::Reconfigure => {
            let existing = ctx.store.load().await?;
            ctx.flows().reconfigure(&mut wizard, &existing).await?
        }
        SetupStep::Migration => {
            let Some(install) = legacy.as_ref() else {
                return Err(SeedDeployError::internal("legacy install disappeared during setup"));
            };
            ctx.flows().migration(&mut wizard, install).await?
        }
        SetupStep::Fresh => ctx.flows().fresh(&mut wizard).await?,
    };

    if plan.offer_cron {
        offer_cron(ctx, &mut wizard).await;
    }

    let outcome = ctx.reconciler().deploy(&mut config).await?;
    ctx.emit(&ctx.formatter.format_deploy(&outcome));

    if ctx.interactive && matches!(outcome, DeployOutcome::Deployed { first_deploy: true, .. }) {
        ctx.emit(&ctx.formatter.format_site_ready(&config));
    }
    Ok(())
}

/// Offers to install the scheduled jobs. Failures are logged.
async fn offer_cron(ctx: &Context, wizard: &mut dyn Wizard) {
    if !confirm_or_decline(
        wizard,
        "Install nightly cron job for automatic updates? (runs at 02:00)",
        true,
    ) {
        return;
    }

    match ctx.cron().install(&ctx.cron_jobs()).await {
        Ok(()) => ctx.emit(&ctx.formatter.success(
            "Cron job installed. Your node will auto-update nightly at 02:00.",
        )),
        Err(e) => warn!("Failed to install cron job: {e}"),
    }
}

/// Stop, start or restart the containers.
async fn cmd_lifecycle(ctx: &Context, command: &Commands) -> Result<()> {
    let config = ctx.load_config().await?;
    let compose = ctx.compose(&config);
    let done = match command {
        Commands::Stop => {
            compose.stop().await?;
            "Stopped all containers"
        }
        Commands::Restart => {
            compose.restart().await?;
            "Restarted all containers"
        }
        _ => {
            compose.start().await?;
            "Started all containers"
        }
    };
    ctx.emit(&ctx.formatter.success(done));
    Ok(())
}

/// Show configuration summary and container status.
async fn cmd_status(ctx: &Context) -> Result<()> {
    let config = if ctx.store.exists().await? {
        Some(ctx.store.load().await?)
    } else {
        None
    };
    let containers = ContainerObserver::new(&ctx.shell).list().await;
    ctx.emit(&ctx.formatter.format_status(config.as_ref(), &containers));
    Ok(())
}

/// Print the configuration record.
async fn cmd_config(ctx: &Context) -> Result<()> {
    let config = ctx.load_config().await?;
    ctx.emit(&ctx.formatter.format_config(&config, &ctx.paths));
    Ok(())
}

/// Follow container logs.
async fn cmd_logs(ctx: &Context, service: Option<&str>) -> Result<()> {
    let config = ctx.load_config().await?;
    ctx.compose(&config).logs(service).await
}

/// Install or remove the scheduled jobs.
async fn cmd_cron(ctx: &Context, action: CronAction) -> Result<()> {
    let cron = ctx.cron();
    match action {
        CronAction::Install => cron.install(&ctx.cron_jobs()).await?,
        CronAction::Remove => cron.remove().await?,
    }
    ctx.emit(&ctx.formatter.format_cron(&cron.current_lines().await));
    Ok(())
}

/// Archive configuration and data.
async fn cmd_backup(ctx: &Context, path: Option<PathBuf>) -> Result<()> {
    let report = ctx.backups().backup(path).await?;
    ctx.emit(&ctx.formatter.format_backup(&report));
    Ok(())
}

/// Restore an archive, optionally review the restored config, and redeploy.
async fn cmd_restore(ctx: &Context, path: Option<PathBuf>) -> Result<()> {
    let archive = match path {
        Some(path) => path,
        None => latest_archive(&ctx.paths.backups_dir()).await?,
    };
    let manager = ctx.backups();
    let metadata = manager.inspect(&archive).await?;

    ctx.require_terminal("restore")?;
    let mut wizard = InquireWizard::new();
    wizard.note(
        &format!("Backup {}", archive.display()),
        &ctx.formatter.format_backup_metadata(&metadata),
    );
    let proceed = wizard.confirm(
        &format!(
            "Restore will remove the running containers and overwrite files in {}. Continue?",
            ctx.paths.seed_dir.display()
        ),
        false,
    )?;
    if !proceed {
        return Err(SeedDeployError::cancelled("Restore cancelled"));
    }

    manager.restore(&archive).await?;
    let restored = ctx.load_config().await?;
    let mut config = ctx.flows().offer_restore_review(&mut wizard, &restored).await?;

    let outcome = ctx.reconciler().deploy(&mut config).await?;
    ctx.emit(&ctx.formatter.format_deploy(&outcome));
    Ok(())
}

/// Remove containers, scheduled jobs and generated files.
async fn cmd_uninstall(ctx: &Context) -> Result<()> {
    ctx.require_terminal("uninstall")?;
    let mut wizard = InquireWizard::new();
    let proceed = wizard.confirm(
        "This removes all Seed containers, scheduled jobs and generated files. Continue?",
        false,
    )?;
    if !proceed {
        return Err(SeedDeployError::cancelled("Uninstall cancelled"));
    }

    match ctx.load_config().await {
        Ok(config) => {
            if let Err(e) = ctx.compose(&config).down().await {
                warn!("docker compose down failed: {e}");
            }
        }
        Err(e) => debug!("No config, removing containers by name: {e}"),
    }
    let observer = ContainerObserver::new(&ctx.shell);
    for name in SEED_CONTAINERS {
        if observer.exists(name).await {
            remove_container(&ctx.shell, name).await;
        }
    }

    if let Err(e) = ctx.cron().remove().await {
        warn!("Failed to remove cron jobs: {e}");
    }

    ctx.store.delete().await?;
    for file in [ctx.paths.compose_path.clone(), ctx.paths.caddyfile_path()] {
        remove_path(&ctx.shell, &file).await;
    }

    let wipe = confirm_or_decline(
        &mut wizard,
        "Also delete node data (proxy, web, daemon, monitoring)? This cannot be undone.",
        false,
    );
    if wipe {
        for dir in ["proxy", "web", "daemon", "monitoring"] {
            remove_path(&ctx.shell, &ctx.paths.seed_dir.join(dir)).await;
        }
    }

    ctx.emit(&ctx.formatter.success("Seed node uninstalled"));
    Ok(())
}

/// Removes a file or directory, escalating with sudo for container-owned data.
async fn remove_path(shell: &dyn ShellRunner, path: &Path) {
    let removed = match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(path).await,
        Ok(_) => tokio::fs::remove_file(path).await,
        Err(_) => return,
    };
    if let Err(e) = removed {
        debug!("Retrying removal of {} with sudo: {e}", path.display());
        if shell
            .run_safe(&format!("sudo rm -rf \"{}\"", path.display()))
            .await
            .is_none()
        {
            warn!("Could not remove {}", path.display());
        } else {
            info!("Removed {}", path.display());
        }
    }
}
