//! Parsers for values recovered from a pre-compose installation.
//!
//! Inputs come from `docker inspect` and are untrusted: anything malformed
//! yields defaults instead of an error.

use tracing::warn;

use crate::config::LogLevel;

/// Settings recovered from the daemon container environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DaemonEnv {
    /// Value of `SEED_LOG_LEVEL`, if it names a known level.
    pub log_level: Option<LogLevel>,
    /// Whether `SEED_P2P_TESTNET_NAME` had a non-empty value.
    pub testnet: bool,
}

/// Settings recovered from the web container environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebEnv {
    /// Value of `SEED_BASE_URL`.
    pub hostname: Option<String>,
    /// Whether `SEED_IS_GATEWAY=true` was set.
    pub gateway: bool,
    /// Whether `SEED_ENABLE_STATISTICS=true` was set.
    pub analytics: bool,
}

fn parse_env_array(env_json: &str) -> Vec<String> {
    match serde_json::from_str::<Vec<String>>(env_json) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Ignoring unreadable container environment: {e}");
            Vec::new()
        }
    }
}

fn value_of<'e>(entry: &'e str, name: &str) -> Option<&'e str> {
    entry.strip_prefix(name)?.strip_prefix('=')
}

/// Parses the daemon container's `{{json .Config.Env}}` output.
#[must_use]
pub fn parse_daemon_env(env_json: &str) -> DaemonEnv {
    let mut env = DaemonEnv::default();
    for entry in parse_env_array(env_json) {
        if let Some(level) = value_of(&entry, "SEED_LOG_LEVEL") {
            env.log_level = LogLevel::from_label(level);
        }
        if value_of(&entry, "SEED_P2P_TESTNET_NAME").is_some_and(|name| !name.is_empty()) {
            env.testnet = true;
        }
    }
    env
}

/// Parses the web container's `{{json .Config.Env}}` output.
#[must_use]
pub fn parse_web_env(env_json: &str) -> WebEnv {
    let mut env = WebEnv::default();
    for entry in parse_env_array(env_json) {
        if let Some(url) = value_of(&entry, "SEED_BASE_URL").filter(|url| !url.is_empty()) {
            env.hostname = Some(url.to_string());
        }
        if value_of(&entry, "SEED_IS_GATEWAY") == Some("true") {
            env.gateway = true;
        }
        if value_of(&entry, "SEED_ENABLE_STATISTICS") == Some("true") {
            env.analytics = true;
        }
    }
    env
}

/// Extracts the tag from an image reference, defaulting to `latest`.
///
/// A colon only separates a tag when it follows the last `/`, so registry
/// ports such as `registry:5000/web` are not mistaken for tags.
#[must_use]
pub fn parse_image_tag(image: &str) -> String {
    let image = image.trim();
    let name_start = image.rfind('/').map_or(0, |slash| slash + 1);
    image[name_start..]
        .rsplit_once(':')
        .map(|(_, tag)| tag)
        .filter(|tag| !tag.is_empty())
        .unwrap_or("latest")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daemon_env() {
        let env = parse_daemon_env(r#"["PATH=/usr/bin","SEED_LOG_LEVEL=debug","SEED_P2P_TESTNET_NAME=dev"]"#);
        assert_eq!(env.log_level, Some(LogLevel::Debug));
        assert!(env.testnet);

        let env = parse_daemon_env(r#"["SEED_LOG_LEVEL=warn","SEED_P2P_TESTNET_NAME="]"#);
        assert_eq!(env.log_level, Some(LogLevel::Warn));
        assert!(!env.testnet);
    }

    #[test]
    fn test_daemon_env_defaults() {
        assert_eq!(parse_daemon_env("not json"), DaemonEnv::default());
        assert_eq!(parse_daemon_env("[]"), DaemonEnv::default());
        assert_eq!(parse_daemon_env(r#"{"SEED_LOG_LEVEL":"debug"}"#), DaemonEnv::default());
    }

    #[test]
    fn test_web_env() {
        let env = parse_web_env(
            r#"["SEED_BASE_URL=https://node1.seed.run","SEED_IS_GATEWAY=true","SEED_ENABLE_STATISTICS=true"]"#,
        );
        assert_eq!(env.hostname.as_deref(), Some("https://node1.seed.run"));
        assert!(env.gateway);
        assert!(env.analytics);

        let env = parse_web_env(r#"["SEED_IS_GATEWAY=false","SEED_ENABLE_STATISTICS=TRUE"]"#);
        assert!(env.hostname.is_none());
        assert!(!env.gateway);
        assert!(!env.analytics);
    }

    #[test]
    fn test_web_env_malformed() {
        assert_eq!(parse_web_env(""), WebEnv::default());
        assert_eq!(parse_web_env("[1, 2]"), WebEnv::default());
    }

    #[test]
    fn test_image_tag() {
        assert_eq!(parse_image_tag("seedhypermedia/web:latest"), "latest");
        assert_eq!(parse_image_tag("seedhypermedia/web:dev"), "dev");
        assert_eq!(parse_image_tag("seedhypermedia/web"), "latest");
        assert_eq!(parse_image_tag("registry:5000/seed/web"), "latest");
        assert_eq!(parse_image_tag("registry:5000/seed/web:v1.2"), "v1.2");
        assert_eq!(parse_image_tag("web:"), "latest");
    }
}
