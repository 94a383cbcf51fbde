//! Container runtime integration.
//!
//! - [`ContainerObserver`]: read-only probes
//! - [`ComposeDriver`]: `docker compose` commands against the node manifest
//! - [`HealthMonitor`]: post-deploy health checks

mod compose;
mod health;
mod observer;

pub use compose::{ComposeDriver, POST_DEPLOY_PRUNE_WINDOW, prune_images, remove_container, retag_image};
pub use health::{
    DEFAULT_HEALTH_ATTEMPTS, DEFAULT_HEALTH_INTERVAL, HealthMonitor, HealthPolicy, HealthReport,
};
pub use observer::{
    COMPOSE_PROJECT_LABEL, ContainerObserver, ContainerStatus, ImageSnapshot, LEGACY_CONTAINERS,
    SEED_CONTAINERS,
};
