//! Focus sessions: the Pomodoro cycle and scheduled time blocks.

mod engine;
mod timeblock;

use serde::{Deserialize, Serialize};

pub use engine::{Completion, FocusEngine, FocusError, Snapshot, StopReport, Tick};
pub use timeblock::{BlockStatus, ScheduledBlock, TimeBlock, WindowError};

/// Settings key holding the persisted [`FocusMode`](crate::FocusMode).
pub const FOCUS_MODE_SETTING: &str = "focus_mode";

/// Pomodoro durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusConfig {
    /// Length of a focus phase in minutes. Default: 25.
    pub focus_minutes: u32,

    /// Length of a short break in minutes. Default: 5.
    pub break_minutes: u32,

    /// Length of a long break in minutes. Default: 15.
    pub long_break_minutes: u32,

    /// A long break replaces the short one after every N completed focus
    /// phases. Default: 4.
    pub sessions_before_long_break: u32,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            focus_minutes: 25,
            break_minutes: 5,
            long_break_minutes: 15,
            sessions_before_long_break: 4,
        }
    }
}

impl FocusConfig {
    pub(crate) fn seconds_for(&self, phase: crate::Phase) -> i64 {
        use crate::Phase;

        let minutes = match phase {
            Phase::Idle | Phase::Focus => self.focus_minutes,
            Phase::Break => self.break_minutes,
            Phase::LongBreak => self.long_break_minutes,
        };
        i64::from(minutes) * 60
    }
}

/// Formats a second count as `MM:SS`.
///
/// Minutes are not wrapped, so 90 minutes renders as `90:00`.
#[must_use]
pub fn format_clock(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
