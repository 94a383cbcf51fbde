//! Setup flows: the ways a configuration record comes into existence.
//!
//! Every flow asks the same six questions with different defaults, shows a
//! summary, and persists only after a final confirmation.

use tracing::{info, warn};

use crate::config::{
    ComposeEnvs, ConfigStore, ConfigValidator, DEFAULT_REPO_URL, DEFAULT_SECRET_LENGTH, DeployPaths, Environment,
    LogLevel, NodeConfig, VERSION, compose_url_for, environment_presets, generate_secret,
    validate_domain, validate_email,
};
use crate::error::{Result, SeedDeployError};
use crate::exec::ShellRunner;
use crate::legacy::{LegacyInstall, SecretStatus, infer_environment};
use crate::render::ProcessIds;

use super::wizard::{Choice, MessageKind, TextQuestion, Wizard};

const ENVIRONMENT_CHOICES: [Choice; 3] = [
    Choice {
        label: "Production",
        hint: "stable releases, mainnet network (recommended)",
    },
    Choice {
        label: "Staging",
        hint: "development builds, mainnet network",
    },
    Choice {
        label: "Development",
        hint: "development builds, testnet network",
    },
];

const LOG_LEVEL_CHOICES: [Choice; 4] = [
    Choice {
        label: "Debug",
        hint: "very verbose, useful for troubleshooting",
    },
    Choice {
        label: "Info",
        hint: "standard operational logging (recommended)",
    },
    Choice {
        label: "Warn",
        hint: "only warnings and errors",
    },
    Choice {
        label: "Error",
        hint: "only critical errors",
    },
];

/// Which flow is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowKind {
    /// First-time setup with literal defaults.
    Fresh,
    /// Editing an existing record.
    Reconfigure,
    /// Importing a legacy install.
    Migration,
    /// Reviewing a record restored from backup.
    RestoreReview,
}

impl FlowKind {
    const fn title(self) -> &'static str {
        match self {
            Self::Fresh => "Seed Node Setup",
            Self::Reconfigure => "Seed Node Reconfiguration",
            Self::Migration => "Seed Node Migration",
            Self::RestoreReview => "Seed Node Restore",
        }
    }

    /// Message shown when the operator aborts the flow.
    #[must_use]
    pub const fn cancel_message(self) -> &'static str {
        match self {
            Self::Fresh => "Setup cancelled",
            Self::Reconfigure => "Reconfiguration cancelled",
            Self::Migration => "Migration cancelled",
            Self::RestoreReview => "Restore review cancelled",
        }
    }
}

/// Answers to the common questions, also used as their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Answers {
    /// Public hostname.
    pub domain: String,
    /// Contact email.
    pub email: String,
    /// Environment label.
    pub environment: Environment,
    /// Service log level.
    pub log_level: LogLevel,
    /// Public gateway flag.
    pub gateway: bool,
    /// Analytics flag.
    pub analytics: bool,
}

impl Answers {
    fn from_config(config: &NodeConfig) -> Self {
        Self {
            domain: config.domain.clone(),
            email: config.email.clone(),
            environment: config.environment,
            log_level: config.compose_envs.log_level,
            gateway: config.gateway,
            analytics: config.analytics,
        }
    }

    /// Builds a new record from the answers.
    fn into_config(self, link_secret: String) -> NodeConfig {
        let presets = environment_presets(self.environment);
        NodeConfig {
            domain: self.domain,
            email: self.email,
            compose_url: compose_url_for(DEFAULT_REPO_URL),
            compose_sha: String::new(),
            compose_envs: ComposeEnvs {
                log_level: self.log_level,
            },
            environment: self.environment,
            release_channel: presets.release_channel,
            testnet: presets.testnet,
            link_secret,
            analytics: self.analytics,
            gateway: self.gateway,
            last_script_run: String::new(),
        }
    }
}

/// Renders the configuration summary shown before confirmation.
///
/// With `previous`, every field whose value changed is marked with `*`.
#[must_use]
pub fn summarize(config: &NodeConfig, previous: Option<&NodeConfig>) -> String {
    let before = previous.map(NodeConfig::summary_fields);
    config
        .summary_fields()
        .into_iter()
        .map(|(key, value)| {
            let changed = before.as_ref().is_some_and(|fields| {
                fields.iter().any(|(k, v)| *k == key && *v != value)
            });
            let marker = if changed { "*" } else { " " };
            format!("{marker} {key}: {value}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn in_flow<T>(kind: FlowKind, result: Result<T>) -> Result<T> {
    result.map_err(|e| {
        if e.is_cancelled() {
            SeedDeployError::cancelled(kind.cancel_message())
        } else {
            e
        }
    })
}

/// Runs the setup flows against a config store.
pub struct SetupFlows<'a> {
    paths: &'a DeployPaths,
    store: &'a dyn ConfigStore,
    shell: &'a dyn ShellRunner,
    ids: ProcessIds,
}

impl<'a> SetupFlows<'a> {
    /// Creates the flows for a node.
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

    /// First-time setup.
    ///
    /// # Errors
    ///
    /// Returns [`SeedDeployError::Cancelled`] if the operator aborts, or an
    /// error if the record cannot be saved.
    pub async fn fresh(&self, wizard: &mut dyn Wizard) -> Result<NodeConfig> {
        let kind = FlowKind::Fresh;
        wizard.intro(&format!("{} v{VERSION}", kind.title()));
        wizard.note(
            "First-time setup",
            &format!(
                "Welcome! This wizard will configure your new Seed node.\n\n\
                 It sets up the containers, reverse proxy and networking so your node\n\
                 is reachable on the public internet.\n\n\
                 Configuration will be saved to {}.\n\
                 Later runs deploy automatically without questions.",
                self.paths.config_path.display()
            ),
        );

        let answers = in_flow(kind, ask_common(wizard, &Answers::default()))?;
        let config = answers.into_config(generate_secret(DEFAULT_SECRET_LENGTH));

        self.confirm_and_save(wizard, kind, config, None).await
    }

    /// Edits an existing record.
    ///
    /// The digest, secret, last-run timestamp and manifest URL are kept.
    ///
    /// # Errors
    ///
    /// Returns [`SeedDeployError::Cancelled`] if the operator aborts, or an
    /// error if the record cannot be saved.
    pub async fn reconfigure(&self, wizard: &mut dyn Wizard, existing: &NodeConfig) -> Result<NodeConfig> {
        let kind = FlowKind::Reconfigure;
        wizard.intro(&format!("{} v{VERSION}", kind.title()));

        let answers = in_flow(kind, ask_common(wizard, &Answers::from_config(existing)))?;

        let mut config = answers.into_config(existing.link_secret.clone());
        config.compose_url.clone_from(&existing.compose_url);
        config.compose_sha.clone_from(&existing.compose_sha);
        config.last_script_run.clone_from(&existing.last_script_run);

        self.confirm_and_save(wizard, kind, config, Some(existing)).await
    }

    /// Imports a legacy install.
    ///
    /// # Errors
    ///
    /// Returns [`SeedDeployError::Cancelled`] if the operator aborts, or an
    /// error if the record cannot be saved.
    pub async fn migration(&self, wizard: &mut dyn Wizard, install: &LegacyInstall) -> Result<NodeConfig> {
        let defaults = Answers {
            domain: install.hostname.clone().unwrap_or_default(),
            email: String::new(),
            environment: infer_environment(install),
            log_level: install.log_level.unwrap_or_default(),
            gateway: install.gateway,
            analytics: install.analytics,
        };
        self.migrate(wizard, FlowKind::Migration, install, &defaults, None)
            .await
    }

    /// Offers to review a record restored from backup.
    ///
    /// Declining the offer, or cancelling the review, hands back `restored`
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the reviewed record cannot be saved.
    pub async fn offer_restore_review(&self, wizard: &mut dyn Wizard, restored: &NodeConfig) -> Result<NodeConfig> {
        if !confirm_or_decline(wizard, "Review the restored configuration before redeploying?", false) {
            return Ok(restored.clone());
        }
        match self.restore_review(wizard, restored).await {
            Err(e) if e.is_cancelled() => {
                wizard.message(MessageKind::Info, "Keeping the restored configuration.");
                Ok(restored.clone())
            }
            result => result,
        }
    }

    /// Reviews a record restored from backup, then persists it as a migration.
    ///
    /// The manifest URL, digest and last-run timestamp of `restored` are kept.
    ///
    /// # Errors
    ///
    /// Returns [`SeedDeployError::Cancelled`] if the operator aborts, or an
    /// error if the record cannot be saved.
    pub async fn restore_review(&self, wizard: &mut dyn Wizard, restored: &NodeConfig) -> Result<NodeConfig> {
        let install = LegacyInstall {
            workspace: self.paths.seed_dir.clone(),
            secret: if restored.link_secret.is_empty() {
                SecretStatus::Absent
            } else {
                SecretStatus::Present(restored.link_secret.clone())
            },
            hostname: Some(restored.domain.clone()),
            log_level: Some(restored.compose_envs.log_level),
            image_tag: Some(restored.release_channel.clone()),
            testnet: restored.testnet,
            gateway: restored.gateway,
            analytics: restored.analytics,
        };
        self.migrate(
            wizard,
            FlowKind::RestoreReview,
            &install,
            &Answers::from_config(restored),
            Some(restored),
        )
        .await
    }

    async fn migrate(
        &self,
        wizard: &mut dyn Wizard,
        kind: FlowKind,
        install: &LegacyInstall,
        defaults: &Answers,
        base: Option<&NodeConfig>,
    ) -> Result<NodeConfig> {
        wizard.intro(&format!("{} v{VERSION}", kind.title()));
        wizard.note(
            "Existing installation found",
            &format!(
                "Detected Seed data at: {}\n\n\
                 Its settings were imported below. After confirmation the node is\n\
                 managed from {} and updated on a schedule.\n\n\
                 Please review the detected values.",
                install.workspace.display(),
                self.paths.seed_dir.display()
            ),
        );

        let answers = in_flow(kind, ask_common(wizard, defaults))?;

        let secret = match &install.secret {
            SecretStatus::Present(secret) => {
                wizard.message(MessageKind::Success, "Registration secret imported from existing installation.");
                secret.clone()
            }
            SecretStatus::Consumed => {
                wizard.message(
                    MessageKind::Info,
                    "The site is already registered. Generated a new secret for future links.",
                );
                generate_secret(DEFAULT_SECRET_LENGTH)
            }
            SecretStatus::Absent => {
                wizard.message(
                    MessageKind::Warning,
                    "No existing registration secret found. Generated a new one.",
                );
                generate_secret(DEFAULT_SECRET_LENGTH)
            }
        };

        let mut config = answers.into_config(secret);
        if let Some(base) = base {
            config.compose_url.clone_from(&base.compose_url);
            config.compose_sha.clone_from(&base.compose_sha);
            config.last_script_run.clone_from(&base.last_script_run);
        }
        let config = self.confirm_and_save(wizard, kind, config, base).await?;

        self.repair_ownership(wizard, install).await;
        Ok(config)
    }

    async fn confirm_and_save(
        &self,
        wizard: &mut dyn Wizard,
        kind: FlowKind,
        config: NodeConfig,
        previous: Option<&NodeConfig>,
    ) -> Result<NodeConfig> {
        ConfigValidator::new().validate(&config)?;

        wizard.note("Configuration summary", &summarize(&config, previous));

        let confirmed = in_flow(
            kind,
            wizard.confirm("Write config and proceed with deployment?", true),
        )?;
        if !confirmed {
            return Err(SeedDeployError::cancelled(kind.cancel_message()));
        }

        self.store.save(&config).await?;
        info!("Config written to {}", self.store.location());
        wizard.message(
            MessageKind::Success,
            &format!("Config written to {}", self.store.location()),
        );

        Ok(config)
    }

    /// Hands the legacy web data directory to the current user.
    async fn repair_ownership(&self, wizard: &mut dyn Wizard, install: &LegacyInstall) {
        let web_dir = install.workspace.join("web");
        let web_dir = web_dir.display();
        let Some(owner) = self
            .shell
            .run_safe(&format!("stat -c '%u:%g' \"{web_dir}\" 2>/dev/null"))
            .await
        else {
            return;
        };

        let expected = self.ids.to_string();
        if owner == expected {
            return;
        }

        wizard.message(
            MessageKind::Warning,
            &format!("{web_dir} is owned by {owner}. Updating ownership so the web container can write to it."),
        );
        if self
            .shell
            .run_safe(&format!("chown -R {expected} \"{web_dir}\" 2>/dev/null"))
            .await
            .is_none()
            && self
                .shell
                .run_safe(&format!("sudo chown -R {expected} \"{web_dir}\""))
                .await
                .is_none()
        {
            warn!("Could not change ownership of {web_dir}");
            return;
        }
        wizard.message(MessageKind::Success, "File ownership updated.");
    }
}

/// Asks a yes/no question where cancelling counts as "no".
pub fn confirm_or_decline(wizard: &mut dyn Wizard, message: &str, default: bool) -> bool {
    wizard.confirm(message, default).unwrap_or(false)
}

/// Asks the six common questions.
fn ask_common(wizard: &mut dyn Wizard, defaults: &Answers) -> Result<Answers> {
    let domain = wizard.text(&TextQuestion {
        message: "Public hostname (including https://)",
        placeholder: "https://node1.seed.run",
        initial: Some(defaults.domain.as_str()).filter(|d| !d.is_empty()),
        validator: validate_domain,
    })?;

    let email = wizard.text(&TextQuestion {
        message: "Contact email for security and node notices (optional, not shared)",
        placeholder: "you@example.com",
        initial: Some(defaults.email.as_str()).filter(|e| !e.is_empty()),
        validator: validate_email,
    })?;

    let env_default = Environment::ALL
        .iter()
        .position(|env| *env == defaults.environment)
        .unwrap_or(0);
    let env_index = wizard.select("Environment", &ENVIRONMENT_CHOICES, env_default)?;
    let environment = Environment::ALL.get(env_index).copied().unwrap_or_default();

    let level_default = LogLevel::ALL
        .iter()
        .position(|level| *level == defaults.log_level)
        .unwrap_or(1);
    let level_index = wizard.select("Log level for Seed services", &LOG_LEVEL_CHOICES, level_default)?;
    let log_level = LogLevel::ALL.get(level_index).copied().unwrap_or_default();

    let gateway = wizard.confirm(
        "Run as a public gateway? (serves all known public content)",
        defaults.gateway,
    )?;
    let analytics = wizard.confirm(
        "Enable web analytics? Adds a Plausible.io dashboard for your site's traffic.",
        defaults.analytics,
    )?;

    Ok(Answers {
        domain: domain.trim().to_string(),
        email: email.trim().to_string(),
        environment,
        log_level,
        gateway,
        analytics,
    })
}
