/// Errors produced while sending sources
///
/// Everything except [`Error::Usage`] is scoped to a single source: the batch coordinator logs
/// and counts it, then moves on to the next source.
///
/// # Logging Convention
/// The Display implementation already includes the underlying I/O error, so `{}` is enough:
/// ```ignore
/// tracing::error!("{}", &error);
/// ```
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Destination unreachable or connection refused
    #[error("failed to connect to {destination}: {source}")]
    Connect {
        destination: String,
        #[source]
        source: std::io::Error,
    },

    /// Source does not exist or cannot be read
    #[error("failed to open '{name}': {source}")]
    Open {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O failure while reading a source
    #[error("failed reading '{name}': {source}")]
    Read {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// Transport failure mid-transfer
    #[error("failed writing to {destination} after {lines_sent} lines: {source}")]
    Write {
        destination: String,
        lines_sent: u64,
        #[source]
        source: std::io::Error,
    },

    /// Nothing to do: missing arguments or no input at all
    #[error("{0}")]
    Usage(String),
}
