//! Bridge from pre-compose installations.
//!
//! Older nodes were installed ad hoc: containers started by hand, data in
//! `~/.seed-site` or `/shm`. This module recovers their settings so the
//! migration flow can prefill its questions.

mod detector;
mod env;

pub use detector::{LegacyDetector, LegacyInstall, SecretStatus, infer_environment};
pub use env::{DaemonEnv, WebEnv, parse_daemon_env, parse_image_tag, parse_web_env};
