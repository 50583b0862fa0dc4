//! Storage layer for tempo.
//!
//! Provides persistence for focus sessions, points, habits, tasks and rewards
//! using `rusqlite`, and implements the `tempo-core` store traits on top of it.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! This means a `Database` instance can be moved between threads but cannot be shared
//! across threads without external synchronization.
//!
//! Balance changes are single `UPDATE` statements and reward claims run in an
//! immediate transaction, so separate connections to the same file cannot lose
//! updates to the balance.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in RFC 3339 format (e.g., `2024-01-15T10:30:00.000Z`).
//! This format is used by `chrono::DateTime<Utc>` serialization and ensures:
//! - Lexicographic ordering matches chronological ordering
//! - Human-readable values in the database
//! - Timezone-aware (always UTC)
//!
//! Calendar days (habit logs, task and reward logs, reflections) are stored as
//! `YYYY-MM-DD`.
//!
//! ## Enum Columns
//!
//! `focus_sessions.mode` and `focus_sessions.session_type` hold the string forms
//! from `tempo_core::types`; `habit_logs.status` holds 0 (missed), 1 (partial)
//! or 2 (done). Unknown values read back as the default variant.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Datelike, Days, NaiveDate, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use serde::Serialize;
use thiserror::Error;

use tempo_core::focus::FOCUS_MODE_SETTING;
use tempo_core::{
    ClaimOutcome, FocusMode, HabitId, HabitStatus, LedgerStore, RewardId, SessionId, SessionLog,
    SessionType, SettingsStore, TaskId, TimeBlock,
};

/// Settings key for the user's energy level today.
pub const ENERGY_SETTING: &str = "energy_level";

/// Task priority stored in `tasks.priority` for high-priority tasks.
pub const PRIORITY_HIGH: i64 = 3;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp in {table} row {id}: {timestamp}")]
    TimestampParse {
        table: &'static str,
        id: i64,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// Failed to parse a stored calendar date.
    #[error("invalid date in {table}: {date}")]
    DateParse {
        table: &'static str,
        date: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A year and month that do not name a calendar month.
    #[error("invalid month: {year}-{month:02}")]
    InvalidMonth { year: i32, month: u32 },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// A row of the focus session log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionRecord {
    pub id: SessionId,
    pub mode: FocusMode,
    pub session_type: SessionType,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i64>,
    pub completed: bool,
    pub task_name: Option<String>,
}

/// A tracked habit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HabitRecord {
    pub id: HabitId,
    pub name: String,
    pub created_at: NaiveDate,
}

/// A task as stored in the database.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub name: String,
    pub deadline: Option<String>,
    /// 3 = high, 2 = medium, 1 = low.
    pub priority: i64,
    pub points: i64,
    pub is_completed: bool,
    pub energy_level: Option<String>,
    pub is_top3: bool,
    pub duration_hours: f64,
}

/// Fields for a new task.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub name: String,
    /// `YYYY-MM-DD HH:MM`, free-form as entered.
    pub deadline: Option<String>,
    pub priority: i64,
    pub points: i64,
    pub energy_level: Option<String>,
    pub duration_hours: f64,
}

/// Filters for [`Database::list_tasks`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub include_completed: bool,
    pub top3_only: bool,
    pub energy_level: Option<String>,
}

/// A claimable reward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewardRecord {
    pub id: RewardId,
    pub name: String,
    pub points_cost: i64,
}

/// Answers to the end-of-day reflection. Empty strings are unanswered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reflection {
    pub completed: String,
    pub difficult: String,
    pub win: String,
}

/// Done and logged habit counts for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayProgress {
    pub date: NaiveDate,
    pub logged: u32,
    pub done: u32,
}

/// Habit completion across a calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthSummary {
    pub year: i32,
    pub month: u32,
    pub total_habits: u32,
    pub days_in_month: u32,
    pub total_done: u32,
    /// `total_habits * days_in_month`.
    pub total_possible: u32,
    /// Percentage of `total_possible` marked done. 0 with no habits.
    pub completion_rate: f64,
    /// Days with at least one log, in date order.
    pub daily: Vec<DayProgress>,
}

/// One habit's logs for a calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HabitMonth {
    pub id: HabitId,
    pub name: String,
    /// Indexed by day of month minus one. `None` where nothing was logged.
    pub days: Vec<Option<HabitStatus>>,
}

/// Counters for the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TodayStats {
    pub habits_done: u32,
    pub total_habits: u32,
    pub pending_tasks: u32,
    pub top3_pending: u32,
    pub high_priority_done: u32,
    pub points_balance: i64,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT
            );

            -- Focus session log
            -- mode: 'pomodoro' | 'timeblock'
            -- session_type: 'focus' | 'break' | 'long_break'
            -- end_time is NULL while a pomodoro phase is running
            CREATE TABLE IF NOT EXISTS focus_sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                mode TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT,
                duration_minutes INTEGER,
                completed INTEGER DEFAULT 0,
                session_type TEXT DEFAULT 'focus',
                task_name TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_focus_sessions_start ON focus_sessions(start_time);

            CREATE TABLE IF NOT EXISTS points_balance (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                balance INTEGER NOT NULL DEFAULT 0 CHECK (balance >= 0)
            );

            CREATE TABLE IF NOT EXISTS habits (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            -- status: 0 = missed, 1 = partial, 2 = done
            CREATE TABLE IF NOT EXISTS habit_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                habit_id INTEGER NOT NULL,
                date TEXT NOT NULL,
                status INTEGER NOT NULL DEFAULT 0,
                UNIQUE (habit_id, date),
                FOREIGN KEY (habit_id) REFERENCES habits(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_habit_logs_date ON habit_logs(date);

            CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                deadline TEXT,
                priority INTEGER NOT NULL DEFAULT 1,
                points INTEGER NOT NULL DEFAULT 0,
                is_completed INTEGER NOT NULL DEFAULT 0,
                energy_level TEXT,
                is_top3 INTEGER NOT NULL DEFAULT 0,
                duration_hours REAL NOT NULL DEFAULT 0
            );

            -- action: 'completed' | 'postponed'
            CREATE TABLE IF NOT EXISTS task_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                task_id INTEGER NOT NULL,
                date TEXT NOT NULL,
                action TEXT NOT NULL,
                reason TEXT,
                FOREIGN KEY (task_id) REFERENCES tasks(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS rewards (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                points_cost INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS reward_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                reward_id INTEGER,
                date TEXT NOT NULL,
                cost INTEGER NOT NULL,
                FOREIGN KEY (reward_id) REFERENCES rewards(id) ON DELETE SET NULL
            );

            -- One end-of-day reflection per calendar day
            CREATE TABLE IF NOT EXISTS reflections (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL UNIQUE,
                completed TEXT,
                difficult TEXT,
                win TEXT
            );

            INSERT OR IGNORE INTO points_balance (id, balance) VALUES (1, 0);
            ",
        )?;
        self.conn.execute(
            "INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)",
            params![FOCUS_MODE_SETTING, FocusMode::Pomodoro.as_str()],
        )?;
        Ok(())
    }

    // ========== Focus sessions ==========

    /// Lists the most recent sessions, newest first.
    pub fn list_sessions(&self, limit: usize) -> Result<Vec<SessionRecord>, DbError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare(
            "
            SELECT id, mode, start_time, end_time, duration_minutes, completed, session_type, task_name
            FROM focus_sessions
            ORDER BY start_time DESC, id DESC
            LIMIT ?
            ",
        )?;
        let rows = stmt.query_map([limit], |row| {
            Ok(RawSession {
                id: row.get(0)?,
                mode: row.get(1)?,
                start_time: row.get(2)?,
                end_time: row.get(3)?,
                duration_minutes: row.get(4)?,
                completed: row.get(5)?,
                session_type: row.get(6)?,
                task_name: row.get(7)?,
            })
        })?;
        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row?.into_record()?);
        }
        Ok(sessions)
    }

    /// Closes pomodoro rows still open from a previous process as not completed.
    ///
    /// Returns the number of rows closed.
    pub fn close_open_sessions(&mut self, now: DateTime<Utc>) -> Result<usize, DbError> {
        let open: Vec<(SessionId, String)> = {
            let mut stmt = self
                .conn
                .prepare("SELECT id, start_time FROM focus_sessions WHERE end_time IS NULL")?;
            let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
            rows.collect::<Result<_, _>>()?
        };
        if open.is_empty() {
            return Ok(0);
        }

        let end_time = format_timestamp(now);
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "
                UPDATE focus_sessions
                SET end_time = ?, duration_minutes = ?, completed = 0
                WHERE id = ?
                ",
            )?;
            for (id, start_time) in &open {
                let start = parse_timestamp(start_time, "focus_sessions", *id)?;
                let duration = (now - start).num_minutes().max(0);
                stmt.execute(params![end_time, duration, id])?;
            }
        }
        tx.commit()?;
        tracing::info!(count = open.len(), "closed sessions left open");
        Ok(open.len())
    }

    /// The most recently scheduled time block that has not ended by `now`.
    ///
    /// A new schedule replaces the held block, so this is the block an engine
    /// would still be holding.
    pub fn current_timeblock(&self, now: DateTime<Utc>) -> Result<Option<TimeBlock>, DbError> {
        let row: Option<(SessionId, String, String, Option<String>)> = self
            .conn
            .query_row(
                "
                SELECT id, start_time, end_time, task_name
                FROM focus_sessions
                WHERE mode = ? AND end_time > ?
                ORDER BY id DESC
                LIMIT 1
                ",
                params![FocusMode::Timeblock.as_str(), format_timestamp(now)],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;
        let Some((id, start, end, task_name)) = row else {
            return Ok(None);
        };
        Ok(Some(TimeBlock {
            start: parse_timestamp(&start, "focus_sessions", id)?,
            end: parse_timestamp(&end, "focus_sessions", id)?,
            task_name: task_name.unwrap_or_default(),
        }))
    }

    // ========== Habits ==========

    /// Adds a habit created on `today`. Returns its id.
    pub fn add_habit(&mut self, name: &str, today: NaiveDate) -> Result<HabitId, DbError> {
        self.conn.execute(
            "INSERT INTO habits (name, created_at) VALUES (?, ?)",
            params![name, format_date(today)],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Lists habits ordered by ID.
    pub fn list_habits(&self) -> Result<Vec<HabitRecord>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, created_at FROM habits ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, HabitId>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        let mut habits = Vec::new();
        for row in rows {
            let (id, name, created_at) = row?;
            habits.push(HabitRecord {
                id,
                name,
                created_at: parse_date(&created_at, "habits")?,
            });
        }
        Ok(habits)
    }

    /// Deletes a habit and its logs. Returns whether it existed.
    pub fn delete_habit(&mut self, habit: HabitId) -> Result<bool, DbError> {
        let deleted = self
            .conn
            .execute("DELETE FROM habits WHERE id = ?", [habit])?;
        Ok(deleted > 0)
    }

    /// All logged days for a habit, newest first.
    pub fn habit_logs(&self, habit: HabitId) -> Result<Vec<(NaiveDate, HabitStatus)>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT date, status FROM habit_logs WHERE habit_id = ? ORDER BY date DESC",
        )?;
        let rows = stmt.query_map([habit], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        let mut logs = Vec::new();
        for row in rows {
            let (date, status) = row?;
            logs.push((
                parse_date(&date, "habit_logs")?,
                HabitStatus::from_stored_i64(status),
            ));
        }
        Ok(logs)
    }

    /// Per-habit logs for a calendar month, ordered by habit ID.
    pub fn month_habits(&self, year: i32, month: u32) -> Result<Vec<HabitMonth>, DbError> {
        let (start, end) = month_range(year, month)?;
        let days = days_in_month(end);

        let mut months: Vec<HabitMonth> = self
            .list_habits()?
            .into_iter()
            .map(|habit| HabitMonth {
                id: habit.id,
                name: habit.name,
                days: vec![None; days as usize],
            })
            .collect();

        let mut stmt = self.conn.prepare(
            "SELECT habit_id, date, status FROM habit_logs WHERE date >= ? AND date < ?",
        )?;
        let rows = stmt.query_map(params![format_date(start), format_date(end)], |row| {
            Ok((
                row.get::<_, HabitId>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;
        for row in rows {
            let (habit, date, status) = row?;
            let date = parse_date(&date, "habit_logs")?;
            let slot = months
                .iter_mut()
                .find(|entry| entry.id == habit)
                .and_then(|entry| entry.days.get_mut(date.day0() as usize));
            if let Some(slot) = slot {
                *slot = Some(HabitStatus::from_stored_i64(status));
            }
        }
        Ok(months)
    }

    /// Completion totals for a calendar month.
    ///
    /// Every habit counts for every day of the month, whenever it was created.
    pub fn month_summary(&self, year: i32, month: u32) -> Result<MonthSummary, DbError> {
        let (start, end) = month_range(year, month)?;
        let days_in_month = days_in_month(end);
        let total_habits: u32 = self
            .conn
            .query_row("SELECT COUNT(*) FROM habits", [], |row| row.get(0))?;

        let mut stmt = self.conn.prepare(
            "
            SELECT date, COUNT(*), SUM(CASE WHEN status = 2 THEN 1 ELSE 0 END)
            FROM habit_logs
            WHERE date >= ? AND date < ?
            GROUP BY date
            ORDER BY date ASC
            ",
        )?;
        let rows = stmt.query_map(params![format_date(start), format_date(end)], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u32>(1)?,
                row.get::<_, u32>(2)?,
            ))
        })?;
        let mut daily = Vec::new();
        let mut total_done = 0u32;
        for row in rows {
            let (date, logged, done) = row?;
            total_done += done;
            daily.push(DayProgress {
                date: parse_date(&date, "habit_logs")?,
                logged,
                done,
            });
        }

        let total_possible = total_habits.saturating_mul(days_in_month);
        let completion_rate = if total_possible == 0 {
            0.0
        } else {
            f64::from(total_done) * 100.0 / f64::from(total_possible)
        };
        Ok(MonthSummary {
            year,
            month,
            total_habits,
            days_in_month,
            total_done,
            total_possible,
            completion_rate,
            daily,
        })
    }

    // ========== Reflections ==========

    /// Saves the reflection for `date`, replacing any earlier one.
    pub fn save_reflection(
        &mut self,
        date: NaiveDate,
        reflection: &Reflection,
    ) -> Result<(), DbError> {
        self.conn.execute(
            "
            INSERT INTO reflections (date, completed, difficult, win) VALUES (?, ?, ?, ?)
            ON CONFLICT(date) DO UPDATE SET
                completed = excluded.completed,
                difficult = excluded.difficult,
                win = excluded.win
            ",
            params![
                format_date(date),
                reflection.completed,
                reflection.difficult,
                reflection.win,
            ],
        )?;
        Ok(())
    }

    /// The reflection saved for `date`, if any.
    pub fn reflection(&self, date: NaiveDate) -> Result<Option<Reflection>, DbError> {
        let reflection = self
            .conn
            .query_row(
                "SELECT completed, difficult, win FROM reflections WHERE date = ?",
                [format_date(date)],
                |row| {
                    Ok(Reflection {
                        completed: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                        difficult: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                        win: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    })
                },
            )
            .optional()?;
        Ok(reflection)
    }

    // ========== Tasks ==========

    /// Adds an incomplete, non top-3 task. Returns its id.
    pub fn add_task(&mut self, task: &NewTask) -> Result<TaskId, DbError> {
        self.conn.execute(
            "
            INSERT INTO tasks (name, deadline, priority, points, energy_level, is_completed, is_top3, duration_hours)
            VALUES (?, ?, ?, ?, ?, 0, 0, ?)
            ",
            params![
                task.name,
                task.deadline,
                task.priority,
                task.points,
                task.energy_level,
                task.duration_hours,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Lists tasks, highest priority first, then by deadline.
    pub fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<TaskRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, name, deadline, priority, points, is_completed, energy_level, is_top3, duration_hours
            FROM tasks
            WHERE (?1 OR is_completed = 0)
              AND (NOT ?2 OR is_top3 = 1)
              AND (?3 IS NULL OR energy_level = ?3)
            ORDER BY priority DESC, deadline IS NULL, deadline ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map(
            params![filter.include_completed, filter.top3_only, filter.energy_level],
            |row| {
                Ok(TaskRecord {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    deadline: row.get(2)?,
                    priority: row.get(3)?,
                    points: row.get(4)?,
                    is_completed: row.get(5)?,
                    energy_level: row.get(6)?,
                    is_top3: row.get(7)?,
                    duration_hours: row.get(8)?,
                })
            },
        )?;
        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?);
        }
        Ok(tasks)
    }

    /// Marks or unmarks a task as top-3. Returns whether the task exists.
    pub fn set_task_top3(&mut self, task: TaskId, is_top3: bool) -> Result<bool, DbError> {
        let updated = self.conn.execute(
            "UPDATE tasks SET is_top3 = ? WHERE id = ?",
            params![is_top3, task],
        )?;
        Ok(updated > 0)
    }

    /// Logs a postponement and optionally moves the deadline.
    pub fn postpone_task(
        &mut self,
        task: TaskId,
        today: NaiveDate,
        reason: &str,
        new_deadline: Option<&str>,
    ) -> Result<bool, DbError> {
        let tx = self.conn.transaction()?;
        let exists = tx
            .query_row("SELECT 1 FROM tasks WHERE id = ?", [task], |_| Ok(()))
            .optional()?
            .is_some();
        if !exists {
            return Ok(false);
        }
        tx.execute(
            "INSERT INTO task_logs (task_id, date, action, reason) VALUES (?, ?, 'postponed', ?)",
            params![task, format_date(today), reason],
        )?;
        if let Some(deadline) = new_deadline {
            tx.execute(
                "UPDATE tasks SET deadline = ? WHERE id = ?",
                params![deadline, task],
            )?;
        }
        tx.commit()?;
        Ok(true)
    }

    /// Deletes a task and its logs. Returns whether it existed.
    pub fn delete_task(&mut self, task: TaskId) -> Result<bool, DbError> {
        let deleted = self.conn.execute("DELETE FROM tasks WHERE id = ?", [task])?;
        Ok(deleted > 0)
    }

    // ========== Rewards ==========

    /// Adds a reward. Returns its id.
    pub fn add_reward(&mut self, name: &str, points_cost: i64) -> Result<RewardId, DbError> {
        self.conn.execute(
            "INSERT INTO rewards (name, points_cost) VALUES (?, ?)",
            params![name, points_cost],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Lists rewards ordered by ID.
    pub fn list_rewards(&self) -> Result<Vec<RewardRecord>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, points_cost FROM rewards ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok(RewardRecord {
                id: row.get(0)?,
                name: row.get(1)?,
                points_cost: row.get(2)?,
            })
        })?;
        let mut rewards = Vec::new();
        for row in rows {
            rewards.push(row?);
        }
        Ok(rewards)
    }

    /// Deletes a reward. Claim history is kept. Returns whether it existed.
    pub fn delete_reward(&mut self, reward: RewardId) -> Result<bool, DbError> {
        let deleted = self
            .conn
            .execute("DELETE FROM rewards WHERE id = ?", [reward])?;
        Ok(deleted > 0)
    }

    // ========== Dashboard ==========

    /// Summary counters for `today`.
    pub fn today_stats(&self, today: NaiveDate) -> Result<TodayStats, DbError> {
        let today = format_date(today);
        let habits_done = self.conn.query_row(
            "SELECT COUNT(*) FROM habit_logs WHERE date = ? AND status = 2",
            [&today],
            |row| row.get(0),
        )?;
        let total_habits = self
            .conn
            .query_row("SELECT COUNT(*) FROM habits", [], |row| row.get(0))?;
        let pending_tasks = self.conn.query_row(
            "SELECT COUNT(*) FROM tasks WHERE is_completed = 0",
            [],
            |row| row.get(0),
        )?;
        let high_priority_done = self.conn.query_row(
            "
            SELECT COUNT(*) FROM task_logs tl
            JOIN tasks t ON tl.task_id = t.id
            WHERE tl.date = ? AND tl.action = 'completed' AND t.priority = ?
            ",
            params![today, PRIORITY_HIGH],
            |row| row.get(0),
        )?;
        Ok(TodayStats {
            habits_done,
            total_habits,
            pending_tasks,
            top3_pending: self.count_incomplete_top3()?,
            high_priority_done,
            points_balance: self.balance()?,
        })
    }
}

impl SettingsStore for Database {
    type Error = DbError;

    fn get_setting(&self, key: &str, default: &str) -> Result<String, DbError> {
        let value: Option<Option<String>> = self
            .conn
            .query_row("SELECT value FROM settings WHERE key = ?", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value.flatten().unwrap_or_else(|| default.to_string()))
    }

    fn set_setting(&mut self, key: &str, value: &str) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)",
            params![key, value],
        )?;
        Ok(())
    }
}

impl SessionLog for Database {
    fn create_session(
        &mut self,
        mode: FocusMode,
        session_type: SessionType,
        start: DateTime<Utc>,
    ) -> Result<SessionId, DbError> {
        self.conn.execute(
            "INSERT INTO focus_sessions (mode, start_time, session_type) VALUES (?, ?, ?)",
            params![mode.as_str(), format_timestamp(start), session_type.as_str()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn record_timeblock(&mut self, block: &TimeBlock) -> Result<SessionId, DbError> {
        self.conn.execute(
            "
            INSERT INTO focus_sessions (mode, start_time, end_time, duration_minutes, session_type, task_name)
            VALUES (?, ?, ?, ?, ?, ?)
            ",
            params![
                FocusMode::Timeblock.as_str(),
                format_timestamp(block.start),
                format_timestamp(block.end),
                block.duration_minutes(),
                SessionType::Focus.as_str(),
                block.task_name,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn close_session(
        &mut self,
        id: SessionId,
        end: DateTime<Utc>,
        duration_minutes: i64,
        completed: bool,
    ) -> Result<(), DbError> {
        let updated = self.conn.execute(
            "
            UPDATE focus_sessions
            SET end_time = ?, duration_minutes = ?, completed = ?
            WHERE id = ? AND end_time IS NULL
            ",
            params![format_timestamp(end), duration_minutes, completed, id],
        )?;
        if updated == 0 {
            tracing::debug!(session_id = id, "session already closed or missing");
        }
        Ok(())
    }
}

impl LedgerStore for Database {
    fn balance(&self) -> Result<i64, DbError> {
        let balance = self
            .conn
            .query_row("SELECT balance FROM points_balance WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(balance.unwrap_or(0))
    }

    fn add_points(&mut self, amount: i64) -> Result<(), DbError> {
        self.conn.execute(
            "UPDATE points_balance SET balance = MAX(0, balance + ?) WHERE id = 1",
            [amount],
        )?;
        Ok(())
    }

    fn deduct_points(&mut self, amount: i64) -> Result<(), DbError> {
        self.conn.execute(
            "UPDATE points_balance SET balance = MAX(0, balance - ?) WHERE id = 1",
            [amount],
        )?;
        Ok(())
    }

    fn habit_status(&self, habit: HabitId, date: NaiveDate) -> Result<HabitStatus, DbError> {
        let status: Option<i64> = self
            .conn
            .query_row(
                "SELECT status FROM habit_logs WHERE habit_id = ? AND date = ?",
                params![habit, format_date(date)],
                |row| row.get(0),
            )
            .optional()?;
        Ok(status.map_or(HabitStatus::Missed, HabitStatus::from_stored_i64))
    }

    fn set_habit_status(
        &mut self,
        habit: HabitId,
        date: NaiveDate,
        status: HabitStatus,
        balance_delta: i64,
    ) -> Result<(), DbError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "
            INSERT INTO habit_logs (habit_id, date, status) VALUES (?, ?, ?)
            ON CONFLICT(habit_id, date) DO UPDATE SET status = excluded.status
            ",
            params![habit, format_date(date), status.as_i64()],
        )?;
        if balance_delta != 0 {
            tx.execute(
                "UPDATE points_balance SET balance = MAX(0, balance + ?) WHERE id = 1",
                [balance_delta],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn list_habit_ids(&self) -> Result<Vec<HabitId>, DbError> {
        let mut stmt = self.conn.prepare("SELECT id FROM habits ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }

    fn week_status(&self, habit: HabitId, today: NaiveDate) -> Result<[HabitStatus; 7], DbError> {
        let week_start = today.checked_sub_days(Days::new(6)).unwrap_or(today);
        let mut stmt = self.conn.prepare(
            "
            SELECT date, status FROM habit_logs
            WHERE habit_id = ? AND date >= ? AND date <= ?
            ",
        )?;
        let rows = stmt.query_map(
            params![habit, format_date(week_start), format_date(today)],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
        )?;
        let mut logged = HashMap::new();
        for row in rows {
            let (date, status) = row?;
            logged.insert(date, HabitStatus::from_stored_i64(status));
        }

        let mut week = [HabitStatus::Missed; 7];
        for (offset, slot) in (0..7u64).zip(week.iter_mut()) {
            if let Some(date) = week_start.checked_add_days(Days::new(offset)) {
                *slot = logged
                    .get(&format_date(date))
                    .copied()
                    .unwrap_or(HabitStatus::Missed);
            }
        }
        Ok(week)
    }

    fn complete_task(&mut self, task: TaskId, date: NaiveDate) -> Result<Option<i64>, DbError> {
        let tx = self.conn.transaction()?;
        let updated = tx.execute(
            "UPDATE tasks SET is_completed = 1 WHERE id = ? AND is_completed = 0",
            [task],
        )?;
        if updated == 0 {
            return Ok(None);
        }
        let points: i64 =
            tx.query_row("SELECT points FROM tasks WHERE id = ?", [task], |row| row.get(0))?;
        tx.execute(
            "INSERT INTO task_logs (task_id, date, action) VALUES (?, ?, 'completed')",
            params![task, format_date(date)],
        )?;
        tx.commit()?;
        Ok(Some(points))
    }

    fn count_incomplete_top3(&self) -> Result<u32, DbError> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM tasks WHERE is_top3 = 1 AND is_completed = 0",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn claim_reward(&mut self, reward: RewardId, date: NaiveDate) -> Result<ClaimOutcome, DbError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let cost: Option<i64> = tx
            .query_row(
                "SELECT points_cost FROM rewards WHERE id = ?",
                [reward],
                |row| row.get(0),
            )
            .optional()?;
        let Some(cost) = cost else {
            return Ok(ClaimOutcome::UnknownReward);
        };
        let balance: i64 =
            tx.query_row("SELECT balance FROM points_balance WHERE id = 1", [], |row| {
                row.get(0)
            })?;

        let outcome = ClaimOutcome::evaluate(balance, cost);
        if let ClaimOutcome::Claimed { balance, .. } = outcome {
            tx.execute(
                "UPDATE points_balance SET balance = ? WHERE id = 1",
                [balance],
            )?;
            tx.execute(
                "INSERT INTO reward_logs (reward_id, date, cost) VALUES (?, ?, ?)",
                params![reward, format_date(date), cost],
            )?;
            tx.commit()?;
        }
        Ok(outcome)
    }
}

/// Session row as read, before enum and timestamp decoding.
struct RawSession {
    id: SessionId,
    mode: String,
    start_time: String,
    end_time: Option<String>,
    duration_minutes: Option<i64>,
    completed: bool,
    session_type: Option<String>,
    task_name: Option<String>,
}

impl RawSession {
    fn into_record(self) -> Result<SessionRecord, DbError> {
        let end_time = self
            .end_time
            .as_deref()
            .map(|end| parse_timestamp(end, "focus_sessions", self.id))
            .transpose()?;
        Ok(SessionRecord {
            id: self.id,
            mode: FocusMode::from_stored(&self.mode),
            session_type: self
                .session_type
                .as_deref()
                .map_or(SessionType::Focus, SessionType::from_stored),
            start_time: parse_timestamp(&self.start_time, "focus_sessions", self.id)?,
            end_time,
            duration_minutes: self.duration_minutes,
            completed: self.completed,
            task_name: self.task_name,
        })
    }
}

fn parse_timestamp(timestamp: &str, table: &'static str, id: i64) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            table,
            id,
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_date(date: &str, table: &'static str) -> Result<NaiveDate, DbError> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|source| DbError::DateParse {
        table,
        date: date.to_string(),
        source,
    })
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// First day of the month and first day of the next month.
fn month_range(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate), DbError> {
    let start = NaiveDate::from_ymd_opt(year, month, 1);
    let end = if month == 12 {
        year.checked_add(1).and_then(|next| NaiveDate::from_ymd_opt(next, 1, 1))
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    match (start, end) {
        (Some(start), Some(end)) => Ok((start, end)),
        _ => Err(DbError::InvalidMonth { year, month }),
    }
}

/// Days in the month that ends just before `next_month_start`.
fn days_in_month(next_month_start: NaiveDate) -> u32 {
    next_month_start.pred_opt().map_or(0, |last| last.day())
}
