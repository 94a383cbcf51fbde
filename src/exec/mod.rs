//! Access to the outside world: shell commands and network fetches.

mod fetch;
mod shell;

#[cfg(test)]
pub use fetch::MockFetcher;
pub use fetch::{Fetcher, HttpFetcher};
pub use shell::{CommandOutput, EXEC_TIMEOUT_SECS, RUN_TIMEOUT_SECS, ShellRunner, SystemShell};
