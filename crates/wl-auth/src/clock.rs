//! Monotonic-ish wall clock seam.
//!
//! Mint and Verifier are specified as pure functions of their inputs plus a
//! clock; a trait here keeps them testable against boundary instants
//! (`now == expiresAt`) without real sleeps.

use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// A clock that only advances when told to, for deterministic boundary tests.
    #[derive(Clone)]
    pub struct FixedClock(Arc<Mutex<DateTime<Utc>>>);

    impl FixedClock {
        pub fn new(start: DateTime<Utc>) -> Self {
            Self(Arc::new(Mutex::new(start)))
        }

        pub fn advance(&self, delta: chrono::Duration) {
            let mut guard = self.0.lock();
            *guard += delta;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock()
        }
    }
}
