//! Wall-clock abstraction.
//!
//! Circuit timeouts and campaign windows are both expressed against
//! `SystemTime`, so every time-dependent component takes an `Arc<dyn Clock>`
//! instead of calling `SystemTime::now()` directly.

use std::fmt::Debug;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the current time.
pub trait Clock: Send + Sync + Debug {
    /// Current wall-clock time.
    fn now(&self) -> SystemTime;

    /// Current time as UNIX seconds.
    fn unix_secs(&self) -> u64 {
        self.now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

/// Clock backed by `SystemTime::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use mock::MockClock;

#[cfg(any(test, feature = "test-utils"))]
mod mock {
    use super::Clock;
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    /// Manually driven clock for deterministic tests.
    ///
    /// Clones share the same underlying time, so advancing one clone is
    /// observed by every component holding another.
    #[derive(Debug, Clone)]
    pub struct MockClock {
        current: Arc<Mutex<SystemTime>>,
    }

    impl MockClock {
        pub fn new(start: SystemTime) -> Self {
            Self {
                current: Arc::new(Mutex::new(start)),
            }
        }

        /// Clock positioned at the given UNIX timestamp.
        pub fn at_unix(secs: u64) -> Self {
            Self::new(UNIX_EPOCH + Duration::from_secs(secs))
        }

        pub fn advance(&self, by: Duration) {
            let mut current = self.current.lock().expect("MockClock mutex poisoned");
            *current += by;
        }

        pub fn set_unix(&self, secs: u64) {
            let mut current = self.current.lock().expect("MockClock mutex poisoned");
            *current = UNIX_EPOCH + Duration::from_secs(secs);
        }
    }

    impl Clock for MockClock {
        fn now(&self) -> SystemTime {
            *self.current.lock().expect("MockClock mutex poisoned")
        }
    }
}
