//! CLI subcommand implementations.

use std::time::Duration;

use chrono::{DateTime, Utc};

pub mod block;
pub mod bonus;
pub mod energy;
pub mod focus;
pub mod habit;
pub mod mode;
pub mod reflect;
pub mod reward;
pub mod sessions;
pub mod status;
pub mod task;
pub mod util;

/// Interval between engine ticks in the foreground loops.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Time source for the foreground loops.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
    fn sleep(&mut self, duration: Duration);
}

/// Wall clock with real sleeps.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Clock that only advances when slept on.
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub struct FakeClock {
    pub now: DateTime<Utc>,
}

#[cfg(test)]
impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn sleep(&mut self, duration: Duration) {
        self.now += chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::zero());
    }
}
