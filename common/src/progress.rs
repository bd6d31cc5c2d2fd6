use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::ProgressSettings;
use crate::format;

/// Counters of one in-flight transfer
///
/// Written only by the transfer loop, sampled by the progress reporter. Loads are `Relaxed`: the
/// reporter is a display-only sampler and may see a slightly stale, never torn, value.
#[derive(Debug)]
pub struct TransferStats {
    bytes_read: AtomicU64,
    lines_read: AtomicU64,
    total_size: u64,
    start_time: std::time::Instant,
}

impl TransferStats {
    /// `total_size` of 0 means the size of the source is unknown
    pub fn new(total_size: u64) -> Self {
        Self {
            bytes_read: AtomicU64::new(0),
            lines_read: AtomicU64::new(0),
            total_size,
            start_time: std::time::Instant::now(),
        }
    }

    /// Records one sent line; `bytes` includes the stripped delimiter
    pub fn add_line(&self, bytes: u64) {
        self.bytes_read.fetch_add(bytes, Ordering::Relaxed);
        self.lines_read.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes(&self) -> u64 {
        self.bytes_read.load(Ordering::Relaxed)
    }

    pub fn lines(&self) -> u64 {
        self.lines_read.load(Ordering::Relaxed)
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn get_duration(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }
}

/// Renders the single-line transfer status
pub struct ProgressPrinter<'a> {
    name: &'a str,
    stats: &'a TransferStats,
}

impl<'a> ProgressPrinter<'a> {
    pub fn new(name: &'a str, stats: &'a TransferStats) -> Self {
        Self { name, stats }
    }

    /// Carriage return prefixed so consecutive renders overwrite each other
    pub fn render(&self) -> String {
        let bytes = self.stats.bytes();
        let total = self.stats.total_size();
        let size = format::progress(bytes, total);
        match format::percent(bytes, total) {
            Some(percent) => format!(
                "\rtransfer: {} {:6}pkts {} {:>11}",
                self.name,
                self.stats.lines(),
                percent,
                size
            ),
            None => format!(
                "\rtransfer: {} {:6}pkts {:>11}",
                self.name,
                self.stats.lines(),
                size
            ),
        }
    }
}

/// Starts the background progress reporter
///
/// Prints a status line to stdout every `settings.delay` until `cancel` fires, and never after.
/// The task resolves to the number of lines it rendered.
pub fn spawn_reporter(
    name: String,
    stats: std::sync::Arc<TransferStats>,
    settings: ProgressSettings,
    cancel: tokio_util::sync::CancellationToken,
) -> tokio::task::JoinHandle<u64> {
    tokio::spawn(async move {
        use std::io::Write;
        let printer = ProgressPrinter::new(&name, &stats);
        let mut interval = tokio::time::interval(settings.delay);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // first tick completes immediately, nothing has been sent yet
        interval.tick().await;
        let mut renders = 0;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    let mut stdout = std::io::stdout().lock();
                    if let Err(error) = write!(stdout, "{}", printer.render()).and_then(|_| stdout.flush()) {
                        tracing::debug!("failed to print progress: {error}");
                    }
                    renders += 1;
                }
            }
        }
        renders
    })
}
