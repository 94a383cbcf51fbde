//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::backup::{BackupMetadata, BackupReport};
use crate::config::{DeployPaths, NodeConfig};
use crate::docker::ContainerStatus;
use crate::reconciler::DeployOutcome;

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Config field row for table display.
#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
}

/// Container row for table display.
#[derive(Tabled)]
struct ContainerRow {
    #[tabled(rename = "Container")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Image")]
    image: String,
}

/// Hides all but the first two characters of a secret.
#[must_use]
pub fn mask_secret(secret: &str) -> String {
    let visible: String = secret.chars().take(2).collect();
    let hidden = secret.chars().count().saturating_sub(2);
    format!("{visible}{}", "*".repeat(hidden))
}

/// Formats a byte count with a binary unit.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut size = bytes as f64 / 1024.0;
    let mut unit = UNITS[0];
    for next in &UNITS[1..] {
        if size < 1024.0 {
            break;
        }
        size /= 1024.0;
        unit = *next;
    }
    format!("{size:.1} {unit}")
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Returns true for JSON output.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Formats the configuration record. The secret is masked in text mode.
    #[must_use]
    pub fn format_config(&self, config: &NodeConfig, paths: &DeployPaths) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(config).unwrap_or_default(),
            OutputFormat::Text => {
                let mut output = format!("\nConfig: {}\n\n", paths.config_path.display());
                output.push_str(&Self::fields_table(config));
                output.push('\n');
                let _ = writeln!(output, "\n   Compose digest: {}", Self::or_never(&config.compose_sha));
                let _ = writeln!(output, "   Last deployment: {}", Self::or_never(&config.last_script_run));
                output
            }
        }
    }

    fn fields_table(config: &NodeConfig) -> String {
        let rows: Vec<FieldRow> = config
            .summary_fields()
            .into_iter()
            .map(|(field, value)| FieldRow {
                field: field.to_string(),
                value: if field == "link_secret" {
                    mask_secret(&value)
                } else {
                    value
                },
            })
            .collect();
        Table::new(rows).to_string()
    }

    fn or_never(value: &str) -> String {
        if value.is_empty() {
            "never".dimmed().to_string()
        } else {
            value.to_string()
        }
    }

    /// Formats the configuration summary and container table.
    #[must_use]
    pub fn format_status(&self, config: Option<&NodeConfig>, containers: &[ContainerStatus]) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = StatusJson {
                    configured: config.is_some(),
                    domain: config.map(|c| c.domain.clone()),
                    environment: config.map(|c| c.environment.to_string()),
                    release_channel: config.map(|c| c.release_channel.clone()),
                    compose_sha: config.map(|c| c.compose_sha.clone()),
                    last_script_run: config.map(|c| c.last_script_run.clone()),
                    containers,
                };
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => Self::format_status_text(config, containers),
        }
    }

    fn format_status_text(config: Option<&NodeConfig>, containers: &[ContainerStatus]) -> String {
        let mut output = String::new();

        match config {
            Some(config) => {
                let _ = write!(
                    output,
                    "\nNode: {} ({}, {})\n",
                    config.domain.bold(),
                    config.environment,
                    config.release_channel
                );
                let _ = writeln!(output, "   Last deployment: {}", Self::or_never(&config.last_script_run));
            }
            None => {
                let _ = writeln!(output, "\n{} No configuration found. Run `seed-deploy deploy` to set up.", "⚠".yellow());
            }
        }
        output.push('\n');

        if containers.is_empty() {
            output.push_str("   No Seed containers found.\n");
            return output;
        }

        let rows: Vec<ContainerRow> = containers
            .iter()
            .map(|c| ContainerRow {
                name: c.name.clone(),
                status: Self::format_container_status(&c.status),
                image: c.image.clone(),
            })
            .collect();
        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        let running = containers.iter().filter(|c| c.status.starts_with("Up")).count();
        let _ = write!(output, "\n{running}/{} containers running\n", containers.len());
        output
    }

    fn format_container_status(status: &str) -> String {
        if status.starts_with("Up") {
            status.green().to_string()
        } else if status.starts_with("Exited") {
            status.red().to_string()
        } else {
            status.yellow().to_string()
        }
    }

    /// Formats the outcome of a deployment.
    #[must_use]
    pub fn format_deploy(&self, outcome: &DeployOutcome) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = match outcome {
                    DeployOutcome::Unchanged => serde_json::json!({ "status": "unchanged" }),
                    DeployOutcome::Deployed {
                        compose_sha,
                        first_deploy,
                    } => serde_json::json!({
                        "status": "deployed",
                        "compose_sha": compose_sha,
                        "first_deploy": first_deploy,
                    }),
                };
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => match outcome {
                DeployOutcome::Unchanged => {
                    format!("{} No changes - node is up to date.\n", "✓".green())
                }
                DeployOutcome::Deployed { compose_sha, .. } => format!(
                    "{} Deployment complete (compose {}).\n",
                    "✓".green(),
                    &compose_sha[..8.min(compose_sha.len())]
                ),
            },
        }
    }

    /// Formats the linking instructions shown after a first deployment.
    #[must_use]
    pub fn format_site_ready(&self, config: &NodeConfig) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "domain": config.domain,
                    "link_secret": config.link_secret,
                });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => format!(
                "\nYour site is live at {}\n\n   Secret:  {}\n\nOpen the Seed desktop app and enter this secret to link\nyour publisher account to this site.\n",
                config.domain.bold(),
                config.link_secret.bold()
            ),
        }
    }

    /// Formats a written backup.
    #[must_use]
    pub fn format_backup(&self, report: &BackupReport) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "path": report.path.display().to_string(),
                    "size_bytes": report.size_bytes,
                    "metadata": report.metadata,
                });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => format!(
                "{} Backup written to {} ({})\n",
                "✓".green(),
                report.path.display(),
                human_size(report.size_bytes)
            ),
        }
    }

    /// Formats the metadata of an archive about to be restored.
    #[must_use]
    pub fn format_backup_metadata(&self, metadata: &BackupMetadata) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(metadata).unwrap_or_default(),
            OutputFormat::Text => {
                let mut output = String::new();
                let _ = writeln!(output, "   Taken:     {}", metadata.timestamp);
                let _ = writeln!(output, "   Node:      {}", metadata.hostname);
                let _ = writeln!(output, "   Machine:   {}", metadata.machine);
                let _ = writeln!(output, "   Root:      {}", metadata.seed_dir);
                let _ = writeln!(output, "   Version:   {}", metadata.version);
                let _ = writeln!(output, "   Cron jobs: {}", metadata.cron_lines.len());
                output
            }
        }
    }

    /// Formats the installed scheduled jobs.
    #[must_use]
    pub fn format_cron(&self, lines: &[String]) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(lines).unwrap_or_default(),
            OutputFormat::Text => {
                if lines.is_empty() {
                    return format!("{} No scheduled jobs installed.\n", "✓".green());
                }
                let mut output = format!("{} Scheduled jobs:\n", "✓".green());
                for line in lines {
                    let _ = writeln!(output, "   {line}");
                }
                output
            }
        }
    }

    /// Formats a success message.
    #[must_use]
    pub fn success(&self, message: &str) -> String {
        self.message("success", &"✓".green().to_string(), message)
    }

    /// Formats a warning message.
    #[must_use]
    pub fn warning(&self, message: &str) -> String {
        self.message("warning", &"⚠".yellow().to_string(), message)
    }

    /// Formats an error message.
    #[must_use]
    pub fn error(&self, message: &str) -> String {
        self.message("error", &"✗".red().to_string(), message)
    }

    fn message(&self, status: &str, symbol: &str, message: &str) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({ "status": status, "message": message });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => format!("{symbol} {message}"),
        }
    }
}

// JSON serialization helpers

#[derive(Serialize)]
struct StatusJson<'a> {
    configured: bool,
    domain: Option<String>,
    environment: Option<String>,
    release_channel: Option<String>,
    compose_sha: Option<String>,
    last_script_run: Option<String>,
    containers: &'a [ContainerStatus],
}
