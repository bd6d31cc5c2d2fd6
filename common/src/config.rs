//! Configuration types for runtime, output and transfer settings

/// Runtime configuration for tokio
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeConfig {
    /// Number of worker threads (0 = number of CPU cores)
    pub max_workers: usize,
}

/// Output and logging configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    /// Only report errors, no progress line
    pub quiet: bool,
    /// Write debug messages to console
    pub debug: bool,
}

impl OutputConfig {
    /// Default log filter when `RUST_LOG` is not set
    pub fn log_level(&self) -> tracing::Level {
        if self.debug {
            tracing::Level::DEBUG
        } else if self.quiet {
            tracing::Level::ERROR
        } else {
            tracing::Level::INFO
        }
    }
}

pub const DEFAULT_PROGRESS_DELAY: std::time::Duration = std::time::Duration::from_millis(100);

/// Live progress line settings
#[derive(Debug, Clone, Copy)]
pub struct ProgressSettings {
    /// Render the progress line at all
    pub enabled: bool,
    /// Time between two renders
    pub delay: std::time::Duration,
}

impl Default for ProgressSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            delay: DEFAULT_PROGRESS_DELAY,
        }
    }
}

impl ProgressSettings {
    /// Parses a human readable delay such as "100ms" or "1s"
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a valid duration or is zero.
    pub fn parse_delay(delay: &str) -> anyhow::Result<std::time::Duration> {
        let delay = humantime::parse_duration(delay)
            .map_err(|err| anyhow::anyhow!("invalid progress delay {delay:?}: {err}"))?;
        if delay.is_zero() {
            return Err(anyhow::anyhow!("progress delay must be greater than zero"));
        }
        Ok(delay)
    }
}

/// Transport used to reach the destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Protocol {
    /// Connection oriented, ordered delivery
    Tcp,
    /// Connectionless, best-effort delivery
    Udp,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "tcp"),
            Protocol::Udp => write!(f, "udp"),
        }
    }
}

/// Where lines are sent to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub protocol: Protocol,
    /// `host:port`, `[v6]:port` or `ip:port`
    pub address: String,
}

impl Destination {
    pub fn new(protocol: Protocol, address: impl Into<String>) -> Self {
        Self {
            protocol,
            address: address.into(),
        }
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}", self.protocol, self.address)
    }
}
