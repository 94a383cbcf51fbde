//! Environment passed to the compose services.

use std::fmt;

use crate::config::{
    DeployPaths, LIGHTNING_URL_MAINNET, LIGHTNING_URL_TESTNET, NOTIFY_SERVICE_HOST, NodeConfig,
};

/// Effective user and group of the running process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessIds {
    /// Effective user id.
    pub uid: u32,
    /// Effective group id.
    pub gid: u32,
}

impl ProcessIds {
    /// Reads the effective ids of the current process.
    #[must_use]
    pub fn current() -> Self {
        Self {
            uid: nix::unistd::geteuid().as_raw(),
            gid: nix::unistd::getegid().as_raw(),
        }
    }
}

impl fmt::Display for ProcessIds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.uid, self.gid)
    }
}

/// Ordered list of variables exported to `docker compose`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeEnv {
    vars: Vec<(&'static str, String)>,
}

impl ComposeEnv {
    /// Returns the variables in export order.
    #[must_use]
    pub fn vars(&self) -> &[(&'static str, String)] {
        &self.vars
    }

    /// Looks up a variable by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Renders `NAME="value"` pairs joined by spaces, ready to prefix a command.
    #[must_use]
    pub fn to_assignments(&self) -> String {
        self.vars
            .iter()
            .map(|(key, value)| format!("{key}=\"{value}\""))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Strips the URL scheme and trailing slashes from a hostname URL.
#[must_use]
pub fn extract_dns(url: &str) -> String {
    let host = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    host.trim_end_matches('/').to_string()
}

/// Builds the compose environment for a node.
#[must_use]
pub fn build_compose_env(config: &NodeConfig, paths: &DeployPaths, ids: ProcessIds) -> ComposeEnv {
    let (testnet_name, lightning_url) = if config.testnet {
        ("dev", LIGHTNING_URL_TESTNET)
    } else {
        ("", LIGHTNING_URL_MAINNET)
    };

    ComposeEnv {
        vars: vec![
            ("SEED_SITE_HOSTNAME", config.domain.clone()),
            ("SEED_SITE_DNS", extract_dns(&config.domain)),
            ("SEED_SITE_TAG", config.release_channel.clone()),
            ("SEED_SITE_WORKSPACE", paths.seed_dir.display().to_string()),
            ("SEED_UID", ids.uid.to_string()),
            ("SEED_GID", ids.gid.to_string()),
            ("SEED_LOG_LEVEL", config.compose_envs.log_level.to_string()),
            ("SEED_IS_GATEWAY", config.gateway.to_string()),
            ("SEED_ENABLE_STATISTICS", config.analytics.to_string()),
            ("SEED_P2P_TESTNET_NAME", testnet_name.to_string()),
            ("SEED_LIGHTNING_URL", lightning_url.to_string()),
            ("NOTIFY_SERVICE_HOST", NOTIFY_SERVICE_HOST.to_string()),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;
    use crate::testing::sample_config;

    const IDS: ProcessIds = ProcessIds { uid: 1001, gid: 1002 };

    #[test]
    fn test_extract_dns() {
        assert_eq!(extract_dns("https://node1.seed.run"), "node1.seed.run");
        assert_eq!(extract_dns("http://node1.seed.run/"), "node1.seed.run");
        assert_eq!(extract_dns("https://node1.seed.run:8443//"), "node1.seed.run:8443");
        assert_eq!(extract_dns("https://a.b.example.com"), "a.b.example.com");
        assert_eq!(extract_dns("localhost"), "localhost");
    }

    #[test]
    fn test_exactly_twelve_vars_in_order() {
        let env = build_compose_env(&sample_config(), &DeployPaths::new("/opt/seed"), IDS);
        let names: Vec<&str> = env.vars().iter().map(|(k, _)| *k).collect();

        assert_eq!(
            names,
            vec![
                "SEED_SITE_HOSTNAME",
                "SEED_SITE_DNS",
                "SEED_SITE_TAG",
                "SEED_SITE_WORKSPACE",
                "SEED_UID",
                "SEED_GID",
                "SEED_LOG_LEVEL",
                "SEED_IS_GATEWAY",
                "SEED_ENABLE_STATISTICS",
                "SEED_P2P_TESTNET_NAME",
                "SEED_LIGHTNING_URL",
                "NOTIFY_SERVICE_HOST",
            ]
        );
    }

    #[test]
    fn test_mainnet_values() {
        let env = build_compose_env(&sample_config(), &DeployPaths::new("/opt/seed"), IDS);

        assert_eq!(env.get("SEED_SITE_HOSTNAME"), Some("https://node1.seed.run"));
        assert_eq!(env.get("SEED_SITE_DNS"), Some("node1.seed.run"));
        assert_eq!(env.get("SEED_SITE_TAG"), Some("latest"));
        assert_eq!(env.get("SEED_SITE_WORKSPACE"), Some("/opt/seed"));
        assert_eq!(env.get("SEED_UID"), Some("1001"));
        assert_eq!(env.get("SEED_GID"), Some("1002"));
        assert_eq!(env.get("SEED_LOG_LEVEL"), Some("info"));
        assert_eq!(env.get("SEED_IS_GATEWAY"), Some("false"));
        assert_eq!(env.get("SEED_ENABLE_STATISTICS"), Some("false"));
        assert_eq!(env.get("SEED_P2P_TESTNET_NAME"), Some(""));
        assert_eq!(env.get("SEED_LIGHTNING_URL"), Some(LIGHTNING_URL_MAINNET));
        assert_eq!(env.get("NOTIFY_SERVICE_HOST"), Some("https://notify.seed.hyper.media"));
    }

    #[test]
    fn test_testnet_values() {
        let mut config = sample_config();
        config.testnet = true;
        config.gateway = true;
        config.analytics = true;
        config.compose_envs.log_level = LogLevel::Debug;

        let env = build_compose_env(&config, &DeployPaths::new("/opt/seed"), IDS);

        assert_eq!(env.get("SEED_P2P_TESTNET_NAME"), Some("dev"));
        assert_eq!(env.get("SEED_LIGHTNING_URL"), Some("https://ln.testnet.seed.hyper.media"));
        assert_eq!(env.get("SEED_IS_GATEWAY"), Some("true"));
        assert_eq!(env.get("SEED_ENABLE_STATISTICS"), Some("true"));
        assert_eq!(env.get("SEED_LOG_LEVEL"), Some("debug"));
    }

    #[test]
    fn test_assignments() {
        let env = build_compose_env(&sample_config(), &DeployPaths::new("/opt/seed"), IDS);
        let line = env.to_assignments();

        assert!(line.starts_with("SEED_SITE_HOSTNAME=\"https://node1.seed.run\" SEED_SITE_DNS="));
        assert!(line.contains(" SEED_P2P_TESTNET_NAME=\"\" "));
        assert!(line.ends_with("NOTIFY_SERVICE_HOST=\"https://notify.seed.hyper.media\""));
    }

    #[test]
    fn test_process_ids_display() {
        assert_eq!(IDS.to_string(), "1001:1002");
    }
}
