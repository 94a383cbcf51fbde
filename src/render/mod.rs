//! Generated files and environment for the compose services.

mod caddy;
mod env;

pub use caddy::generate_caddyfile;
pub use env::{ComposeEnv, ProcessIds, build_compose_env, extract_dns};
