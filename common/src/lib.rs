//! Line transfer engine shared by the `rip` tool
//!
//! This crate implements sending text sources line by line to a remote TCP or UDP endpoint.
//!
//! # Core Modules
//!
//! - [`transfer`] - Sends one source: connects, paces every line through a [`throttle::Limiter`]
//!   and writes it without its line terminator
//! - [`batch`] - Sends piped stdin and a list of files one after another, continuing past
//!   failures and tallying the outcome
//! - [`progress`] - Shared transfer counters and the background progress reporter
//! - [`format`] - Human readable SI sizes for the progress line
//! - [`config`] - Runtime, output, progress and destination settings
//! - [`version`] - Build version information
//!
//! # Error Handling
//!
//! Per-source failures are reported through [`Error`]. The batch coordinator never aborts on
//! them; they are logged with the source name and counted in the [`batch::Report`].
//!
//! # Runtime
//!
//! [`run`] sets up logging and a tokio runtime and then drives the provided async function to
//! completion. Logs go to stderr; progress and completion lines go to stdout.

pub mod batch;
pub mod config;
pub mod error;
pub mod format;
pub mod progress;
pub mod transfer;
pub mod version;

#[cfg(test)]
mod testutils;

pub use config::{Destination, OutputConfig, ProgressSettings, Protocol, RuntimeConfig};
pub use error::Error;

/// Installs the console logger
///
/// `RUST_LOG` takes precedence over the level derived from `output`. Calling this more than once
/// is harmless, only the first subscriber is kept.
pub fn init_logging(output: &OutputConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(output.log_level().as_str().to_lowercase())
    });
    let res = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
    if res.is_ok() {
        tracing::debug!("Running with debug turned on");
    }
}

/// Sets up logging and a tokio runtime, then runs `func` to completion
///
/// # Errors
///
/// Returns an error if the runtime cannot be built or if `func` fails.
pub fn run<Fut, T>(
    output: &OutputConfig,
    runtime: &RuntimeConfig,
    func: impl FnOnce() -> Fut,
) -> anyhow::Result<T>
where
    Fut: std::future::Future<Output = anyhow::Result<T>>,
{
    use anyhow::Context;
    init_logging(output);
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if runtime.max_workers > 0 {
        builder.worker_threads(runtime.max_workers);
    }
    let runtime = builder.build().context("Failed to start the tokio runtime")?;
    runtime.block_on(func())
}

