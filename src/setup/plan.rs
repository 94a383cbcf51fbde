//! Deciding how a `deploy` invocation obtains its configuration record.

/// Where the record for this deployment comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStep {
    /// Use the stored record without asking anything.
    Headless,
    /// Walk through the questions again, starting from the stored record.
    Reconfigure,
    /// Import the detected legacy install.
    Migration,
    /// First-time setup.
    Fresh,
    /// No record and no terminal to create one.
    MissingConfig,
}

impl SetupStep {
    /// Returns true when the step creates a new record.
    #[must_use]
    pub const fn creates_record(self) -> bool {
        matches!(self, Self::Migration | Self::Fresh)
    }
}

/// Plan for one `deploy` invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeployPlan {
    /// Check for a newer release before deploying.
    pub self_update: bool,
    /// How the record is obtained.
    pub setup: SetupStep,
    /// `--reconfigure` was given but cannot be honoured.
    pub reconfigure_ignored: bool,
    /// Offer to install the scheduled jobs before deploying.
    pub offer_cron: bool,
}

/// Plans a `deploy` invocation.
///
/// Unattended runs self-update and never ask questions. The questions only
/// come back with `--reconfigure` at a terminal. Without a record, a legacy
/// install is migrated, otherwise a fresh setup runs; both end with the
/// scheduled jobs offer.
#[must_use]
#[allow(clippy::fn_params_excessive_bools)]
pub const fn plan_deploy(has_config: bool, reconfigure: bool, interactive: bool, legacy_found: bool) -> DeployPlan {
    let setup = match (has_config, interactive) {
        (true, true) if reconfigure => SetupStep::Reconfigure,
        (true, _) => SetupStep::Headless,
        (false, false) => SetupStep::MissingConfig,
        (false, true) if legacy_found => SetupStep::Migration,
        (false, true) => SetupStep::Fresh,
    };
    DeployPlan {
        self_update: !interactive,
        setup,
        reconfigure_ignored: reconfigure && has_config && !interactive,
        offer_cron: setup.creates_record(),
    }
}
