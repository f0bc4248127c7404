//! Rate-limited warnings for submissions the queued publisher rejects.
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

/// Default interval between rejected-submission warnings.
pub const DEFAULT_WARN_INTERVAL: Duration = Duration::from_secs(5);

/// Source of "now" in milliseconds since the UNIX epoch.
pub type TimeProvider = Box<dyn Fn() -> u64 + Send + Sync>;

/// Current wall-clock time in milliseconds.
///
/// Returns 0 if the system clock is before the UNIX epoch.
pub fn system_time_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Helper that rate limits rejected-submission warnings.
///
/// The caller increments the counter via [`record_drop`](Self::record_drop).
/// The next call to [`warn_if_due`](Self::warn_if_due) emits a warning using
/// the provided callback if the interval has elapsed.
/// [`flush`](Self::flush) reports pending drops immediately.
pub struct RateLimitedWarner {
    last_warn: AtomicU64,
    dropped: AtomicU64,
    interval_ms: u64,
    now: TimeProvider,
}

impl RateLimitedWarner {
    /// Create a warner using the system clock. The first warning can be
    /// emitted immediately.
    pub fn new(interval: Duration) -> Self {
        Self::with_time_provider(interval, Box::new(system_time_millis))
    }

    pub fn with_time_provider(interval: Duration, now: TimeProvider) -> Self {
        let interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        Self {
            last_warn: AtomicU64::new(now().saturating_sub(interval_ms)),
            dropped: AtomicU64::new(0),
            interval_ms,
            now,
        }
    }

    pub fn record_drop(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Emit a warning if the interval has elapsed since the last one.
    pub fn warn_if_due(&self, mut warn: impl FnMut(u64)) {
        let now = (self.now)();
        let prev = self.last_warn.load(Ordering::Relaxed);
        if now.saturating_sub(prev) >= self.interval_ms {
            let count = self.dropped.swap(0, Ordering::Relaxed);
            if count > 0 {
                warn(count);
            }
            self.last_warn.store(now, Ordering::Relaxed);
        }
    }

    /// Immediately warn about any pending drops.
    pub fn flush(&self, mut warn: impl FnMut(u64)) {
        let count = self.dropped.swap(0, Ordering::Relaxed);
        if count > 0 {
            warn(count);
            self.last_warn.store((self.now)(), Ordering::Relaxed);
        }
    }
}

impl std::fmt::Debug for RateLimitedWarner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitedWarner")
            .field("interval_ms", &self.interval_ms)
            .field("dropped", &self.dropped.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, atomic::AtomicU64};

    use super::*;

    fn manual_clock() -> (Arc<AtomicU64>, TimeProvider) {
        let clock = Arc::new(AtomicU64::new(10_000));
        let reader = Arc::clone(&clock);
        (clock, Box::new(move || reader.load(Ordering::SeqCst)))
    }

    #[test]
    fn emits_first_warning_immediately() {
        let warner = RateLimitedWarner::new(DEFAULT_WARN_INTERVAL);
        let mut warnings = Vec::new();
        warner.record_drop();
        warner.warn_if_due(|c| warnings.push(c));
        assert_eq!(warnings, vec![1]);
    }

    #[test]
    fn rate_limits_until_interval_elapses() {
        let (clock, now) = manual_clock();
        let warner = RateLimitedWarner::with_time_provider(Duration::from_secs(5), now);
        let mut warnings = Vec::new();
        warner.record_drop();
        warner.warn_if_due(|c| warnings.push(c));
        warner.record_drop();
        warner.record_drop();
        clock.fetch_add(4_999, Ordering::SeqCst);
        warner.warn_if_due(|c| warnings.push(c));
        assert_eq!(warnings, vec![1]);
        clock.fetch_add(1, Ordering::SeqCst);
        warner.warn_if_due(|c| warnings.push(c));
        assert_eq!(warnings, vec![1, 2]);
    }

    #[test]
    fn flush_emits_pending_warning() {
        let warner = RateLimitedWarner::new(DEFAULT_WARN_INTERVAL);
        let mut warnings = Vec::new();
        warner.flush(|c| warnings.push(c));
        warner.record_drop();
        warner.flush(|c| warnings.push(c));
        assert_eq!(warnings, vec![1]);
    }
}
