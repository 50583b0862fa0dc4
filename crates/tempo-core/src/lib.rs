//! Core domain logic for tempo.
//!
//! This crate contains the two stateful pieces of the application:
//! - Focus: the Pomodoro phase state machine and time block scheduling
//! - Ledger: point rules for habits, tasks, the weekly bonus and rewards
//!
//! Neither piece performs I/O directly. Both talk to storage through the traits
//! in [`store`], which `tempo-db` implements on top of SQLite.

pub mod focus;
pub mod ledger;
pub mod store;
pub mod types;

#[cfg(test)]
mod testing;

pub use focus::{
    BlockStatus, Completion, FocusConfig, FocusEngine, FocusError, ScheduledBlock, Snapshot,
    StopReport, Tick, TimeBlock, WindowError, format_clock,
};
pub use ledger::{ClaimOutcome, current_streak, status_delta};
pub use store::{HabitId, LedgerStore, RewardId, SessionId, SessionLog, SettingsStore, TaskId};
pub use types::{FocusMode, HabitStatus, Phase, SessionType, ValidationError};
