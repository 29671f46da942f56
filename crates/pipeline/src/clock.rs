//! Non-decreasing timestamps for deposit transitions.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use depositor_core::types::Timestamp;

type TimeSource = Box<dyn Fn() -> Timestamp + Send + Sync>;

/// Issues `max(now, last issued)` at microsecond precision, the precision
/// Postgres stores.
pub struct MonotonicClock {
    source: TimeSource,
    last_micros: AtomicI64,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::with_source(Utc::now)
    }

    /// Use `source` instead of the system clock.
    pub fn with_source(source: impl Fn() -> Timestamp + Send + Sync + 'static) -> Self {
        Self {
            source: Box::new(source),
            last_micros: AtomicI64::new(i64::MIN),
        }
    }

    pub fn now(&self) -> Timestamp {
        let now = (self.source)().timestamp_micros();
        let previous = self.last_micros.fetch_max(now, Ordering::SeqCst);
        let micros = previous.max(now);
        DateTime::from_timestamp_micros(micros).unwrap_or_else(Utc::now)
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MonotonicClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonotonicClock")
            .field("last_micros", &self.last_micros.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
