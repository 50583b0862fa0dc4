//! In-memory store used by the engine and ledger tests.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Days, NaiveDate, Utc};
use thiserror::Error;

use crate::focus::TimeBlock;
use crate::ledger::ClaimOutcome;
use crate::store::{HabitId, LedgerStore, RewardId, SessionId, SessionLog, SettingsStore, TaskId};
use crate::types::{FocusMode, HabitStatus, SessionType};

#[derive(Debug, Error)]
#[error("memory store is unavailable")]
pub struct Unavailable;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRow {
    pub id: SessionId,
    pub mode: FocusMode,
    pub session_type: SessionType,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i64>,
    pub completed: bool,
    pub task_name: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryTask {
    pub points: i64,
    pub is_top3: bool,
    pub is_completed: bool,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    pub settings: HashMap<String, String>,
    pub sessions: Vec<SessionRow>,
    pub balance: i64,
    pub habits: BTreeMap<HabitId, BTreeMap<NaiveDate, HabitStatus>>,
    pub tasks: BTreeMap<TaskId, MemoryTask>,
    pub rewards: BTreeMap<RewardId, i64>,
    pub claims: Vec<(RewardId, NaiveDate)>,
    /// When set, every write fails with [`Unavailable`].
    pub fail_writes: bool,
    /// When set, only settings writes fail.
    pub fail_settings: bool,
}

impl MemoryStore {
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn with_balance(balance: i64) -> Self {
        Self {
            balance,
            ..Self::default()
        }
    }

    const fn check_write(&self) -> Result<(), Unavailable> {
        if self.fail_writes {
            Err(Unavailable)
        } else {
            Ok(())
        }
    }

    fn next_session_id(&self) -> SessionId {
        self.sessions.last().map_or(1, |row| row.id + 1)
    }
}

impl SettingsStore for MemoryStore {
    type Error = Unavailable;

    fn get_setting(&self, key: &str, default: &str) -> Result<String, Self::Error> {
        Ok(self
            .settings
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.to_string()))
    }

    fn set_setting(&mut self, key: &str, value: &str) -> Result<(), Self::Error> {
        self.check_write()?;
        if self.fail_settings {
            return Err(Unavailable);
        }
        self.settings.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

impl SessionLog for MemoryStore {
    fn create_session(
        &mut self,
        mode: FocusMode,
        session_type: SessionType,
        start: DateTime<Utc>,
    ) -> Result<SessionId, Self::Error> {
        self.check_write()?;
        let id = self.next_session_id();
        self.sessions.push(SessionRow {
            id,
            mode,
            session_type,
            start,
            end: None,
            duration_minutes: None,
            completed: false,
            task_name: None,
        });
        Ok(id)
    }

    fn record_timeblock(&mut self, block: &TimeBlock) -> Result<SessionId, Self::Error> {
        self.check_write()?;
        let id = self.next_session_id();
        self.sessions.push(SessionRow {
            id,
            mode: FocusMode::Timeblock,
            session_type: SessionType::Focus,
            start: block.start,
            end: Some(block.end),
            duration_minutes: Some(block.duration_minutes()),
            completed: false,
            task_name: Some(block.task_name.clone()),
        });
        Ok(id)
    }

    fn close_session(
        &mut self,
        id: SessionId,
        end: DateTime<Utc>,
        duration_minutes: i64,
        completed: bool,
    ) -> Result<(), Self::Error> {
        self.check_write()?;
        if let Some(row) = self.sessions.iter_mut().find(|row| row.id == id) {
            row.end = Some(end);
            row.duration_minutes = Some(duration_minutes);
            row.completed = completed;
        }
        Ok(())
    }
}

impl LedgerStore for MemoryStore {
    fn balance(&self) -> Result<i64, Self::Error> {
        Ok(self.balance)
    }

    fn add_points(&mut self, amount: i64) -> Result<(), Self::Error> {
        self.check_write()?;
        self.balance += amount;
        Ok(())
    }

    fn deduct_points(&mut self, amount: i64) -> Result<(), Self::Error> {
        self.check_write()?;
        self.balance = (self.balance - amount).max(0);
        Ok(())
    }

    fn habit_status(&self, habit: HabitId, date: NaiveDate) -> Result<HabitStatus, Self::Error> {
        Ok(self
            .habits
            .get(&habit)
            .and_then(|logs| logs.get(&date))
            .copied()
            .unwrap_or_default())
    }

    fn set_habit_status(
        &mut self,
        habit: HabitId,
        date: NaiveDate,
        status: HabitStatus,
        balance_delta: i64,
    ) -> Result<(), Self::Error> {
        self.check_write()?;
        self.habits.entry(habit).or_default().insert(date, status);
        self.balance = (self.balance + balance_delta).max(0);
        Ok(())
    }

    fn list_habit_ids(&self) -> Result<Vec<HabitId>, Self::Error> {
        Ok(self.habits.keys().copied().collect())
    }

    fn week_status(
        &self,
        habit: HabitId,
        today: NaiveDate,
    ) -> Result<[HabitStatus; 7], Self::Error> {
        let mut week = [HabitStatus::Missed; 7];
        for (offset, slot) in (0..7u64).rev().zip(week.iter_mut()) {
            if let Some(date) = today.checked_sub_days(Days::new(offset)) {
                *slot = self.habit_status(habit, date)?;
            }
        }
        Ok(week)
    }

    fn complete_task(&mut self, task: TaskId, _date: NaiveDate) -> Result<Option<i64>, Self::Error> {
        self.check_write()?;
        Ok(self.tasks.get_mut(&task).and_then(|entry| {
            if entry.is_completed {
                None
            } else {
                entry.is_completed = true;
                Some(entry.points)
            }
        }))
    }

    fn count_incomplete_top3(&self) -> Result<u32, Self::Error> {
        let count = self
            .tasks
            .values()
            .filter(|task| task.is_top3 && !task.is_completed)
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    fn claim_reward(
        &mut self,
        reward: RewardId,
        date: NaiveDate,
    ) -> Result<ClaimOutcome, Self::Error> {
        self.check_write()?;
        let Some(&cost) = self.rewards.get(&reward) else {
            return Ok(ClaimOutcome::UnknownReward);
        };
        let outcome = ClaimOutcome::evaluate(self.balance, cost);
        if let ClaimOutcome::Claimed { balance, .. } = outcome {
            self.balance = balance;
            self.claims.push((reward, date));
        }
        Ok(outcome)
    }
}
