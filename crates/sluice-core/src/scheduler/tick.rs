//! Control tick cadence.
//!
//! Time is divided into fixed slots of `interval`; at most one tick runs per
//! slot. A worker that wakes up twice within the same slot (e.g. after a
//! command) does not tick again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic time source, as an offset from an arbitrary origin.
pub trait Clock: Send + Sync {
    fn now(&self) -> Duration;
}

#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock advanced by hand. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    millis: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.millis.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_millis(self.millis.load(Ordering::SeqCst))
    }
}

pub struct TickScheduler {
    clock: Arc<dyn Clock>,
    interval: Duration,
    last_slot: Option<u128>,
}

impl TickScheduler {
    pub fn new(clock: Arc<dyn Clock>, interval: Duration) -> Self {
        Self {
            clock,
            interval: interval.max(Duration::from_millis(1)),
            last_slot: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    fn slot_at(&self, now: Duration) -> u128 {
        now.as_nanos() / self.interval.as_nanos()
    }

    /// Claims the current slot. False if a tick already ran in it.
    pub fn try_begin_tick(&mut self) -> bool {
        let slot = self.slot_at(self.clock.now());
        if self.last_slot == Some(slot) {
            return false;
        }
        self.last_slot = Some(slot);
        true
    }

    /// Time until a tick may run again; zero when the current slot is unclaimed.
    pub fn until_next_tick(&self) -> Duration {
        let now = self.clock.now();
        let slot = self.slot_at(now);
        if self.last_slot != Some(slot) {
            return Duration::ZERO;
        }
        let next = Duration::from_nanos(((slot + 1) * self.interval.as_nanos()) as u64);
        next.saturating_sub(now)
    }
}
