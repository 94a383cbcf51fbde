//! Post-deploy health checks.
//!
//! A node is healthy when every compose-managed container reports
//! `State.Running == true`.

use std::time::Duration;
use tracing::{debug, info};

use super::observer::{ContainerObserver, SEED_CONTAINERS};

/// Default number of health checks after `compose up`.
pub const DEFAULT_HEALTH_ATTEMPTS: u32 = 10;

/// Default delay before each health check.
pub const DEFAULT_HEALTH_INTERVAL: Duration = Duration::from_secs(3);

/// How often and how long to wait for containers to come up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthPolicy {
    /// Number of checks before giving up.
    pub attempts: u32,
    /// Delay before each check.
    pub interval: Duration,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_HEALTH_ATTEMPTS,
            interval: DEFAULT_HEALTH_INTERVAL,
        }
    }
}

/// Outcome of waiting for containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthReport {
    /// Whether all containers ended up running.
    pub healthy: bool,
    /// Number of checks performed.
    pub attempts: u32,
}

/// Polls container state until healthy or out of attempts.
pub struct HealthMonitor<'a, 'o> {
    observer: &'o ContainerObserver<'a>,
    policy: HealthPolicy,
}

impl<'a, 'o> HealthMonitor<'a, 'o> {
    /// Creates a monitor.
    #[must_use]
    pub const fn new(observer: &'o ContainerObserver<'a>, policy: HealthPolicy) -> Self {
        Self { observer, policy }
    }

    /// Waits for the node containers to run.
    pub async fn wait_healthy(&self) -> HealthReport {
        for attempt in 1..=self.policy.attempts {
            tokio::time::sleep(self.policy.interval).await;

            if self.observer.all_running(&SEED_CONTAINERS).await {
                info!("All containers running after {attempt} check(s)");
                return HealthReport {
                    healthy: true,
                    attempts: attempt,
                };
            }
            debug!("Health check attempt {attempt}/{}", self.policy.attempts);
        }

        HealthReport {
            healthy: false,
            attempts: self.policy.attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeShell;

    const FAST: HealthPolicy = HealthPolicy {
        attempts: 4,
        interval: Duration::ZERO,
    };

    #[tokio::test]
    async fn test_healthy_after_retries() {
        let shell = FakeShell::new()
            .on("{{.State.Running}}", "true")
            .on_sequence("inspect seed-web --format '{{.State.Running}}'", &["false", "false", "true"]);
        let observer = ContainerObserver::new(&shell);

        let report = HealthMonitor::new(&observer, FAST).wait_healthy().await;
        assert!(report.healthy);
        assert_eq!(report.attempts, 3);
    }

    #[tokio::test]
    async fn test_exhaustion() {
        let shell = FakeShell::new().on("{{.State.Running}}", "false");
        let observer = ContainerObserver::new(&shell);

        let report = HealthMonitor::new(&observer, FAST).wait_healthy().await;
        assert!(!report.healthy);
        assert_eq!(report.attempts, 4);
    }

    #[test]
    fn test_default_policy() {
        let policy = HealthPolicy::default();
        assert_eq!(policy.attempts, 10);
        assert_eq!(policy.interval, Duration::from_secs(3));
    }
}
