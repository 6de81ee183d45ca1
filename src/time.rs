//! Millisecond time base.
//!
//! The acquisition state machines are polled between unrelated work, so all
//! timing is measured against wall clock instants, never tick counts. The
//! underlying counter is 32 bit and wraps after ~49.7 days; differences are
//! taken modulo 2^32.
use core::cell::Cell;

pub type Instant = fugit::TimerInstantU32<1000>;
pub type Duration = fugit::MillisDurationU32;

pub trait Clock {
    fn now(&self) -> Instant;
}

impl<C: Clock> Clock for &C {
    fn now(&self) -> Instant {
        (*self).now()
    }
}

/// Time elapsed from `since` to `now`, correct across counter wraparound
/// as long as the true interval is shorter than one wrap.
pub fn elapsed(now: Instant, since: Instant) -> Duration {
    Duration::from_ticks(now.ticks().wrapping_sub(since.ticks()))
}

/// A clock advanced by hand. Used for host simulation and tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    ticks: Cell<u32>,
}

impl ManualClock {
    pub fn new(ms: u32) -> Self {
        Self {
            ticks: Cell::new(ms),
        }
    }

    pub fn set(&self, ms: u32) {
        self.ticks.set(ms);
    }

    pub fn advance(&self, ms: u32) {
        self.ticks.set(self.ticks.get().wrapping_add(ms));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        Instant::from_ticks(self.ticks.get())
    }
}
