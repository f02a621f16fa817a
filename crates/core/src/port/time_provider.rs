// Time Provider Port (for testability)

use chrono::{DateTime, Utc};

/// Time provider interface (allows mocking in tests)
pub trait TimeProvider: Send + Sync {
    /// Get current time in milliseconds since epoch
    fn now_millis(&self) -> i64;

    /// Current instant as a UTC timestamp
    fn now_utc(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(self.now_millis()).unwrap_or_default()
    }
}

/// System time provider (production)
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    fn now_utc(&self) -> DateTime<Utc> {
        chrono::Utc::now()
    }
}

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Fixed clock that tests can move forward
    pub struct FixedTimeProvider {
        millis: AtomicI64,
    }

    impl FixedTimeProvider {
        pub fn new(millis: i64) -> Self {
            Self {
                millis: AtomicI64::new(millis),
            }
        }

        pub fn at(instant: DateTime<Utc>) -> Self {
            Self::new(instant.timestamp_millis())
        }

        pub fn set(&self, millis: i64) {
            self.millis.store(millis, Ordering::SeqCst);
        }
    }

    impl TimeProvider for FixedTimeProvider {
        fn now_millis(&self) -> i64 {
            self.millis.load(Ordering::SeqCst)
        }
    }
}
