//! Message rate limiting for line transfers
//!
//! This crate provides the pacing primitive used by `rip` to bound how many messages per second
//! are written to a destination.
//!
//! # Overview
//!
//! A [`Limiter`] is built from a [`RateLimit`]:
//!
//! 1. **Unlimited** - [`Limiter::take`] always returns immediately
//! 2. **Per second** - [`Limiter::take`] hands out at most N tokens per second
//!
//! Pacing is applied per message, not per byte, so it bounds the message rate rather than the
//! raw throughput.
//!
//! # Usage
//!
//! ```rust,no_run
//! use throttle::{Limiter, RateLimit};
//!
//! # async fn example() {
//! let rate: RateLimit = "100".parse().unwrap();
//! let limiter = Limiter::new(rate);
//! for line in ["a", "b", "c"] {
//!     limiter.take().await;
//!     // write `line` here
//! #   let _ = line;
//! }
//! # }
//! ```
//!
//! # Token Bucket
//!
//! The limited variant is a single-slot token bucket: the first token is free and each
//! following token becomes available one period (`1s / N`) after the previous one was handed
//! out. A caller that was idle for longer than one period gets its token right away, but idle
//! time never builds up a burst of more than one token. This strict pacing is deliberate.
//!
//! The wait is deadline based (`tokio::time::sleep_until`), so no background replenish task is
//! needed and tests can drive it with tokio's paused clock.
//!
//! # Thread Safety
//!
//! [`Limiter`] can be shared between tasks. Concurrent callers of [`Limiter::take`] are
//! serialized, each one waiting for its own token.

mod bucket;

/// Configured message rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RateLimit {
    /// No pacing at all
    #[default]
    Unlimited,
    /// At most this many messages per second
    PerSecond(std::num::NonZeroU32),
}

impl RateLimit {
    /// Builds a rate from an operations-per-second value where any negative value means
    /// "unlimited".
    ///
    /// # Errors
    ///
    /// Returns an error for zero or for rates that do not fit in a `u32`.
    pub fn from_ops_per_sec(ops: i64) -> Result<Self, String> {
        if ops < 0 {
            return Ok(RateLimit::Unlimited);
        }
        let ops = u32::try_from(ops).map_err(|_| format!("rate limit {ops} is too large"))?;
        std::num::NonZeroU32::new(ops)
            .map(RateLimit::PerSecond)
            .ok_or_else(|| "rate limit must be a positive number, or -1 for no limit".to_string())
    }
}

impl std::str::FromStr for RateLimit {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ops = s
            .trim()
            .parse::<i64>()
            .map_err(|err| format!("invalid rate limit {s:?}: {err}"))?;
        Self::from_ops_per_sec(ops)
    }
}

impl std::fmt::Display for RateLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RateLimit::Unlimited => write!(f, "unlimited"),
            RateLimit::PerSecond(ops) => write!(f, "{ops} msg/sec"),
        }
    }
}

/// Paces callers to the configured [`RateLimit`]
pub struct Limiter {
    bucket: Option<bucket::Bucket>,
}

impl Limiter {
    #[must_use]
    pub fn new(rate: RateLimit) -> Self {
        let bucket = match rate {
            RateLimit::Unlimited => None,
            RateLimit::PerSecond(ops) => Some(bucket::Bucket::new(
                std::time::Duration::from_secs(1) / ops.get(),
            )),
        };
        Self { bucket }
    }

    #[must_use]
    pub fn unlimited() -> Self {
        Self::new(RateLimit::Unlimited)
    }

    /// Time between two consecutive tokens, `None` when unlimited
    #[must_use]
    pub fn period(&self) -> Option<std::time::Duration> {
        self.bucket.as_ref().map(bucket::Bucket::period)
    }

    /// Waits until one token may be consumed under the configured rate.
    pub async fn take(&self) {
        if let Some(bucket) = &self.bucket {
            bucket.consume().await;
        }
    }
}

impl std::fmt::Debug for Limiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Limiter")
            .field("period", &self.period())
            .finish()
    }
}
