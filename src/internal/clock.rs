use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Time source for deadlines (chords, notifications) and cache freshness.
///
/// Deadlines are stored in state and compared against the clock on the next
/// input event or tick, so tests can drive time without sleeping.
pub trait Clock: Send + Sync {
    /// Monotonic time for in-session deadlines.
    fn now(&self) -> Instant;

    /// Wall-clock time in Unix-epoch seconds.
    fn unix_now(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn unix_now(&self) -> i64 {
        jiff::Timestamp::now().as_second()
    }
}

pub fn system_clock() -> Arc<dyn Clock> {
    Arc::new(SystemClock)
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    state: Mutex<(Instant, i64)>,
}

impl ManualClock {
    pub fn new(unix_now: i64) -> Self {
        Self {
            state: Mutex::new((Instant::now(), unix_now)),
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut state) = self.state.lock() {
            state.0 += by;
            state.1 += by.as_secs() as i64;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        match self.state.lock() {
            Ok(state) => state.0,
            Err(poisoned) => poisoned.into_inner().0,
        }
    }

    fn unix_now(&self) -> i64 {
        match self.state.lock() {
            Ok(state) => state.1,
            Err(poisoned) => poisoned.into_inner().1,
        }
    }
}
