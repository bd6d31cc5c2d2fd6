use tokio::time::{Duration, Instant};

/// Single-slot token bucket.
///
/// Holds the instant the last token was handed out. The next token becomes available one
/// `period` later; an idle bucket never accumulates more than that one token.
pub struct Bucket {
    period: Duration,
    last: tokio::sync::Mutex<Option<Instant>>,
}

impl Bucket {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            last: tokio::sync::Mutex::new(None),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub async fn consume(&self) {
        // lock is held across the sleep so that concurrent callers queue up behind each other
        let mut last = self.last.lock().await;
        let now = Instant::now();
        let due = match *last {
            None => now,
            Some(prev) => std::cmp::max(prev + self.period, now),
        };
        if due > now {
            tracing::trace!("waiting {:?} for next token", due - now);
            tokio::time::sleep_until(due).await;
        }
        *last = Some(due);
    }
}
