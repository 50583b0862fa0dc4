//! Persistence traits consumed by the focus engine and the points ledger.
//!
//! The core never opens a database itself. `tempo-db` implements these traits
//! over SQLite; tests use an in-memory implementation.

use chrono::{DateTime, NaiveDate, Utc};

use crate::focus::TimeBlock;
use crate::ledger::ClaimOutcome;
use crate::types::{FocusMode, HabitStatus, SessionType};

/// Row id of a `focus_sessions` entry.
pub type SessionId = i64;
/// Row id of a habit.
pub type HabitId = i64;
/// Row id of a task.
pub type TaskId = i64;
/// Row id of a reward.
pub type RewardId = i64;

/// Key/value settings.
pub trait SettingsStore {
    /// Error produced by the backing store.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the stored value for `key`, or `default` when unset.
    fn get_setting(&self, key: &str, default: &str) -> Result<String, Self::Error>;

    /// Inserts or replaces the value for `key`.
    fn set_setting(&mut self, key: &str, value: &str) -> Result<(), Self::Error>;
}

/// The focus session log.
pub trait SessionLog: SettingsStore {
    /// Opens a session row with no end time.
    fn create_session(
        &mut self,
        mode: FocusMode,
        session_type: SessionType,
        start: DateTime<Utc>,
    ) -> Result<SessionId, Self::Error>;

    /// Writes a time block row. The whole interval is known upfront, so the row
    /// is written with its end time and duration already set.
    fn record_timeblock(&mut self, block: &TimeBlock) -> Result<SessionId, Self::Error>;

    /// Closes an open session row.
    fn close_session(
        &mut self,
        id: SessionId,
        end: DateTime<Utc>,
        duration_minutes: i64,
        completed: bool,
    ) -> Result<(), Self::Error>;
}

/// Balance, habit and task access used by the ledger.
pub trait LedgerStore: SettingsStore {
    /// Current points balance. Never negative.
    fn balance(&self) -> Result<i64, Self::Error>;

    /// Adds `amount` to the balance.
    fn add_points(&mut self, amount: i64) -> Result<(), Self::Error>;

    /// Subtracts `amount`, clamping the balance at zero.
    ///
    /// Implementations must apply this as a single read-modify-write.
    fn deduct_points(&mut self, amount: i64) -> Result<(), Self::Error>;

    /// Status logged for `habit` on `date`, [`HabitStatus::Missed`] when absent.
    fn habit_status(&self, habit: HabitId, date: NaiveDate) -> Result<HabitStatus, Self::Error>;

    /// Logs `status` for `habit` on `date`, replacing any previous entry, and
    /// adds `balance_delta` to the balance with the zero floor.
    ///
    /// Both changes land together or not at all.
    fn set_habit_status(
        &mut self,
        habit: HabitId,
        date: NaiveDate,
        status: HabitStatus,
        balance_delta: i64,
    ) -> Result<(), Self::Error>;

    /// Ids of all habits.
    fn list_habit_ids(&self) -> Result<Vec<HabitId>, Self::Error>;

    /// Statuses for the seven days ending on `today`, oldest first.
    fn week_status(
        &self,
        habit: HabitId,
        today: NaiveDate,
    ) -> Result<[HabitStatus; 7], Self::Error>;

    /// Marks a task completed.
    ///
    /// Returns the task's points when this call moved it from incomplete to
    /// completed, and `None` when it was already completed or does not exist.
    fn complete_task(&mut self, task: TaskId, date: NaiveDate) -> Result<Option<i64>, Self::Error>;

    /// Number of top-3 tasks not yet completed.
    fn count_incomplete_top3(&self) -> Result<u32, Self::Error>;

    /// Atomically checks the balance against the reward's cost, deducts it and
    /// logs the claim on success. The balance is untouched on failure.
    fn claim_reward(&mut self, reward: RewardId, date: NaiveDate)
    -> Result<ClaimOutcome, Self::Error>;
}
