//! Timestamped cache entries and the clock that ages them.

use std::sync::{Arc, Mutex};

use time::{Duration, OffsetDateTime};

use super::lock::mutex_lock;

const SOURCE: &str = "cache::entry";

/// A cached value plus the moment it was stored.
#[derive(Debug)]
pub struct CacheEntry<T> {
    pub data: Arc<T>,
    pub last_update: OffsetDateTime,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T, now: OffsetDateTime) -> Self {
        Self {
            data: Arc::new(value),
            last_update: now,
        }
    }

    /// Expired once strictly more than `lifetime` has passed since the store.
    pub fn is_expired(&self, now: OffsetDateTime, lifetime: Duration) -> bool {
        now - self.last_update > lifetime
    }
}

impl<T> Clone for CacheEntry<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            last_update: self.last_update,
        }
    }
}

/// Source of "now" for expiry decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<OffsetDateTime>,
}

impl ManualClock {
    pub fn new(start: OffsetDateTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = mutex_lock(&self.now, SOURCE, "advance");
        *now += by;
    }

    pub fn set(&self, to: OffsetDateTime) {
        *mutex_lock(&self.now, SOURCE, "set") = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *mutex_lock(&self.now, SOURCE, "now")
    }
}
