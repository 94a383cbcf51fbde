//! Reverse-proxy configuration.
//!
//! The Caddyfile is static: every node-specific value is read by Caddy from
//! the compose environment through `{$NAME}` placeholders.

use crate::config::NodeConfig;

const CADDYFILE: &str = "{$SEED_SITE_HOSTNAME}

encode zstd gzip

@ipfsget {
\tmethod GET HEAD OPTIONS
\tpath /ipfs/*
}

reverse_proxy /.metrics* grafana:{$SEED_SITE_MONITORING_PORT:3001}

reverse_proxy @ipfsget seed-daemon:{$HM_SITE_BACKEND_GRPCWEB_PORT:56001}

reverse_proxy * seed-web:{$SEED_SITE_LOCAL_PORT:3000}
";

/// Returns the Caddyfile for a node. The output does not depend on `config`.
#[must_use]
pub fn generate_caddyfile(_config: &NodeConfig) -> String {
    CADDYFILE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;
    use crate::testing::sample_config;

    #[test]
    fn test_contents() {
        let caddyfile = generate_caddyfile(&sample_config());

        assert!(caddyfile.starts_with("{$SEED_SITE_HOSTNAME}\n"));
        assert!(caddyfile.contains("encode zstd gzip"));
        assert!(caddyfile.contains("@ipfsget {\n\tmethod GET HEAD OPTIONS\n\tpath /ipfs/*\n}"));
        assert!(caddyfile.contains("reverse_proxy /.metrics* grafana:{$SEED_SITE_MONITORING_PORT:3001}"));
        assert!(caddyfile.contains("reverse_proxy @ipfsget seed-daemon:{$HM_SITE_BACKEND_GRPCWEB_PORT:56001}"));
        assert!(caddyfile.ends_with("reverse_proxy * seed-web:{$SEED_SITE_LOCAL_PORT:3000}\n"));
    }

    #[test]
    fn test_independent_of_config() {
        let mut other = sample_config();
        other.domain = String::from("http://other.example.com:8080");
        other.environment = Environment::Dev;
        other.testnet = true;
        other.gateway = true;

        assert_eq!(generate_caddyfile(&sample_config()), generate_caddyfile(&other));
    }
}
