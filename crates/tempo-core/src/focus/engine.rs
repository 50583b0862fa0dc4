//! Focus engine implementation.
//!
//! The engine is a wall-clock-based state machine. It does not use internal
//! threads: the presentation layer calls [`FocusEngine::tick`] about once per
//! second while a phase is running.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Focus -> Idle          (start_focus, then tick to completion or stop)
//! Idle -> Break | LongBreak -> Idle
//! ```
//!
//! Remaining time is always recomputed from the absolute end timestamp, never
//! decremented, so a late or skipped tick corrects itself on the next call.
//!
//! ## Persistence
//!
//! Every phase and time block is written to the session log. Log failures are
//! reported with `tracing::warn!` and otherwise ignored: the timer keeps running
//! with whatever state it had.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use super::timeblock::{BlockStatus, ScheduledBlock, TimeBlock, WindowError};
use super::{FOCUS_MODE_SETTING, FocusConfig};
use crate::store::{SessionId, SessionLog, SettingsStore};
use crate::types::{FocusMode, Phase};

/// Rejected focus operations. These are expected outcomes the presentation
/// layer shows to the user, not faults.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FocusError {
    #[error("a {phase} phase is already running")]
    AlreadyRunning { phase: Phase },

    #[error("no phase is running")]
    NotRunning,

    #[error("cannot switch mode while a {phase} phase is running")]
    ModeLocked { phase: Phase },

    #[error("invalid time block: {0}")]
    InvalidWindow(#[from] WindowError),

    #[error("time block overlaps the scheduled block {start} - {end}")]
    Overlap {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// Timer fields that only exist while a phase runs.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ActiveTimer {
    phase: Phase,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    /// `None` when the log row could not be written.
    session_id: Option<SessionId>,
}

/// Point-in-time view of the Pomodoro timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub mode: FocusMode,
    pub phase: Phase,
    pub is_running: bool,
    pub remaining_seconds: i64,
    pub session_count: u32,
}

/// A phase that ran to its end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Completion {
    /// The phase that just finished.
    pub phase: Phase,
    /// Completed focus phases since the engine was created, including this one.
    pub session_count: u32,
}

/// Outcome of an early stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StopReport {
    pub phase: Phase,
    pub elapsed_seconds: i64,
}

/// Outcome of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Tick {
    /// Nothing is running; the tick was a no-op.
    Idle(Snapshot),
    /// A phase is still counting down.
    Running(Snapshot),
    /// The running phase reached zero on this tick. The engine is idle again.
    Completed(Completion),
}

/// Owns the Pomodoro phase state and the held time block.
///
/// The presentation layer holds a single instance for the life of the process
/// and passes the store into every operation that writes.
#[derive(Debug, Clone)]
pub struct FocusEngine {
    config: FocusConfig,
    mode: FocusMode,
    session_count: u32,
    remaining_seconds: i64,
    active: Option<ActiveTimer>,
    timeblock: Option<TimeBlock>,
}

impl FocusEngine {
    /// Creates an idle engine in Pomodoro mode.
    pub fn new(config: FocusConfig) -> Self {
        Self {
            remaining_seconds: config.seconds_for(Phase::Focus),
            config,
            mode: FocusMode::Pomodoro,
            session_count: 0,
            active: None,
            timeblock: None,
        }
    }

    /// Creates an idle engine using the persisted focus mode.
    pub fn load<S: SettingsStore>(store: &S, config: FocusConfig) -> Self {
        let mut engine = Self::new(config);
        match store.get_setting(FOCUS_MODE_SETTING, FocusMode::Pomodoro.as_str()) {
            Ok(value) => engine.mode = FocusMode::from_stored(&value),
            Err(err) => tracing::warn!(error = %err, "failed to read focus mode"),
        }
        engine
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub const fn config(&self) -> &FocusConfig {
        &self.config
    }

    pub const fn mode(&self) -> FocusMode {
        self.mode
    }

    pub fn phase(&self) -> Phase {
        self.active.as_ref().map_or(Phase::Idle, |active| active.phase)
    }

    pub const fn is_running(&self) -> bool {
        self.active.is_some()
    }

    pub const fn session_count(&self) -> u32 {
        self.session_count
    }

    /// Seconds left as of the last tick or start.
    pub const fn remaining_seconds(&self) -> i64 {
        self.remaining_seconds
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.active.as_ref().map(|active| active.start_time)
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.active.as_ref().map(|active| active.end_time)
    }

    /// Log row of the running phase, if it was written.
    pub fn current_session_id(&self) -> Option<SessionId> {
        self.active.as_ref().and_then(|active| active.session_id)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            mode: self.mode,
            phase: self.phase(),
            is_running: self.is_running(),
            remaining_seconds: self.remaining_seconds,
            session_count: self.session_count,
        }
    }

    /// The break [`start_break`](Self::start_break) would begin right now.
    pub const fn next_break_phase(&self) -> Phase {
        let every = self.config.sessions_before_long_break;
        if self.session_count > 0 && every > 0 && self.session_count % every == 0 {
            Phase::LongBreak
        } else {
            Phase::Break
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Switches between Pomodoro and time block mode and persists the choice.
    pub fn set_mode<S: SettingsStore>(
        &mut self,
        store: &mut S,
        mode: FocusMode,
    ) -> Result<(), FocusError> {
        if let Some(active) = &self.active {
            return Err(FocusError::ModeLocked {
                phase: active.phase,
            });
        }
        self.mode = mode;
        if let Err(err) = store.set_setting(FOCUS_MODE_SETTING, mode.as_str()) {
            tracing::warn!(error = %err, %mode, "failed to persist focus mode");
        }
        Ok(())
    }

    pub fn start_focus<S: SessionLog>(&mut self, store: &mut S) -> Result<Snapshot, FocusError> {
        self.start_focus_at(store, Utc::now())
    }

    pub fn start_focus_at<S: SessionLog>(
        &mut self,
        store: &mut S,
        now: DateTime<Utc>,
    ) -> Result<Snapshot, FocusError> {
        self.begin(store, Phase::Focus, now)
    }

    /// Starts a short break, or a long one after every N completed focus phases.
    pub fn start_break<S: SessionLog>(&mut self, store: &mut S) -> Result<Snapshot, FocusError> {
        self.start_break_at(store, Utc::now())
    }

    pub fn start_break_at<S: SessionLog>(
        &mut self,
        store: &mut S,
        now: DateTime<Utc>,
    ) -> Result<Snapshot, FocusError> {
        self.begin(store, self.next_break_phase(), now)
    }

    /// Stops the running phase early. The log row is closed as not completed
    /// and no session is counted.
    pub fn stop<S: SessionLog>(&mut self, store: &mut S) -> Result<StopReport, FocusError> {
        self.stop_at(store, Utc::now())
    }

    pub fn stop_at<S: SessionLog>(
        &mut self,
        store: &mut S,
        now: DateTime<Utc>,
    ) -> Result<StopReport, FocusError> {
        let active = self.active.take().ok_or(FocusError::NotRunning)?;
        let elapsed_seconds = (now - active.start_time).num_seconds().max(0);
        close_session(store, &active, now, false);
        self.reset();

        tracing::debug!(phase = %active.phase, elapsed_seconds, "phase stopped");
        Ok(StopReport {
            phase: active.phase,
            elapsed_seconds,
        })
    }

    pub fn tick<S: SessionLog>(&mut self, store: &mut S) -> Tick {
        self.tick_at(store, Utc::now())
    }

    /// Recomputes the remaining time and completes the phase once it hits zero.
    pub fn tick_at<S: SessionLog>(&mut self, store: &mut S, now: DateTime<Utc>) -> Tick {
        let Some(end_time) = self.end_time() else {
            return Tick::Idle(self.snapshot());
        };

        self.remaining_seconds = (end_time - now).num_seconds().max(0);
        if self.remaining_seconds > 0 {
            return Tick::Running(self.snapshot());
        }

        let Some(active) = self.active.take() else {
            return Tick::Idle(self.snapshot());
        };
        close_session(store, &active, now, true);
        if active.phase == Phase::Focus {
            self.session_count += 1;
        }
        self.reset();

        tracing::debug!(
            phase = %active.phase,
            session_count = self.session_count,
            "phase completed"
        );
        Tick::Completed(Completion {
            phase: active.phase,
            session_count: self.session_count,
        })
    }

    fn begin<S: SessionLog>(
        &mut self,
        store: &mut S,
        phase: Phase,
        now: DateTime<Utc>,
    ) -> Result<Snapshot, FocusError> {
        if let Some(active) = &self.active {
            return Err(FocusError::AlreadyRunning {
                phase: active.phase,
            });
        }
        let Some(session_type) = phase.session_type() else {
            return Ok(self.snapshot());
        };

        let seconds = self.config.seconds_for(phase);
        let session_id = match store.create_session(FocusMode::Pomodoro, session_type, now) {
            Ok(id) => Some(id),
            Err(err) => {
                tracing::warn!(error = %err, %phase, "failed to log session start");
                None
            }
        };

        self.remaining_seconds = seconds;
        self.active = Some(ActiveTimer {
            phase,
            start_time: now,
            end_time: now + chrono::Duration::seconds(seconds),
            session_id,
        });

        tracing::debug!(%phase, seconds, ?session_id, "phase started");
        Ok(self.snapshot())
    }

    fn reset(&mut self) {
        self.active = None;
        self.remaining_seconds = self.config.seconds_for(Phase::Focus);
    }

    // ── Time blocks ──────────────────────────────────────────────────

    /// The block currently held, if any.
    pub const fn timeblock(&self) -> Option<&TimeBlock> {
        self.timeblock.as_ref()
    }

    pub fn schedule_timeblock<S: SessionLog>(
        &mut self,
        store: &mut S,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        task_name: &str,
    ) -> Result<ScheduledBlock, FocusError> {
        self.schedule_timeblock_at(store, start, end, task_name, Utc::now())
    }

    /// Holds an already logged block, such as one scheduled by an earlier
    /// process, so later schedules are checked against it.
    pub fn hold_timeblock(&mut self, block: TimeBlock) {
        tracing::debug!(start = %block.start, end = %block.end, "holding time block");
        self.timeblock = Some(block);
    }

    /// Validates and holds a future block, replacing any non-overlapping one.
    pub fn schedule_timeblock_at<S: SessionLog>(
        &mut self,
        store: &mut S,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        task_name: &str,
        now: DateTime<Utc>,
    ) -> Result<ScheduledBlock, FocusError> {
        let block = TimeBlock::new(start, end, task_name, now)?;
        if let Some(held) = self
            .timeblock
            .as_ref()
            .filter(|held| held.overlaps(block.start, block.end))
        {
            return Err(FocusError::Overlap {
                start: held.start,
                end: held.end,
            });
        }

        let session_id = match store.record_timeblock(&block) {
            Ok(id) => Some(id),
            Err(err) => {
                tracing::warn!(error = %err, "failed to log time block");
                None
            }
        };
        let duration_minutes = block.duration_minutes();
        self.timeblock = Some(block.clone());

        tracing::debug!(%start, %end, duration_minutes, "time block scheduled");
        Ok(ScheduledBlock {
            session_id,
            block,
            duration_minutes,
        })
    }

    pub fn timeblock_status(&self) -> BlockStatus {
        self.timeblock_status_at(Utc::now())
    }

    pub fn timeblock_status_at(&self, now: DateTime<Utc>) -> BlockStatus {
        self.timeblock
            .as_ref()
            .map_or(BlockStatus::Inactive, |block| block.status_at(now))
    }

    /// Drops the held block. Its log row is kept.
    pub fn clear_timeblock(&mut self) -> Option<TimeBlock> {
        self.timeblock.take()
    }
}

fn close_session<S: SessionLog>(
    store: &mut S,
    active: &ActiveTimer,
    now: DateTime<Utc>,
    completed: bool,
) {
    let Some(id) = active.session_id else {
        return;
    };
    let duration_minutes = (now - active.start_time).num_minutes().max(0);
    if let Err(err) = store.close_session(id, now, duration_minutes, completed) {
        tracing::warn!(error = %err, session_id = id, "failed to log session end");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;
    use crate::types::SessionType;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    fn secs(n: i64) -> DateTime<Utc> {
        t0() + Duration::seconds(n)
    }

    fn engine() -> FocusEngine {
        FocusEngine::new(FocusConfig::default())
    }

    /// Runs one full focus phase to natural completion.
    fn complete_focus(engine: &mut FocusEngine, store: &mut MemoryStore, start: DateTime<Utc>) {
        engine.start_focus_at(store, start).unwrap();
        let tick = engine.tick_at(store, start + Duration::minutes(25));
        assert!(matches!(tick, Tick::Completed(_)), "got {tick:?}");
    }

    fn complete_break(engine: &mut FocusEngine, store: &mut MemoryStore, start: DateTime<Utc>) -> Phase {
        let snapshot = engine.start_break_at(store, start).unwrap();
        let tick = engine.tick_at(store, start + Duration::hours(1));
        assert!(matches!(tick, Tick::Completed(_)), "got {tick:?}");
        snapshot.phase
    }

    #[test]
    fn test_new_engine_is_idle() {
        let engine = engine();
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.phase, Phase::Idle);
        assert!(!snapshot.is_running);
        assert_eq!(snapshot.remaining_seconds, 25 * 60);
        assert_eq!(snapshot.session_count, 0);
        assert_eq!(snapshot.mode, FocusMode::Pomodoro);
        assert_eq!(engine.start_time(), None);
        assert_eq!(engine.end_time(), None);
    }

    #[test]
    fn test_start_focus_opens_session_row() {
        let mut store = MemoryStore::default();
        let mut engine = engine();

        let snapshot = engine.start_focus_at(&mut store, t0()).unwrap();

        assert_eq!(snapshot.phase, Phase::Focus);
        assert!(snapshot.is_running);
        assert_eq!(snapshot.remaining_seconds, 1500);
        assert_eq!(engine.start_time(), Some(t0()));
        assert_eq!(engine.end_time(), Some(secs(1500)));

        assert_eq!(store.sessions.len(), 1);
        let row = &store.sessions[0];
        assert_eq!(row.mode, FocusMode::Pomodoro);
        assert_eq!(row.session_type, SessionType::Focus);
        assert_eq!(row.start, t0());
        assert_eq!(row.end, None);
        assert_eq!(engine.current_session_id(), Some(row.id));
    }

    #[test]
    fn test_start_while_running_is_rejected_and_state_unchanged() {
        let mut store = MemoryStore::default();
        let mut engine = engine();
        engine.start_focus_at(&mut store, t0()).unwrap();
        let before = engine.snapshot();

        let err = engine.start_focus_at(&mut store, secs(10)).unwrap_err();
        assert_eq!(
            err,
            FocusError::AlreadyRunning {
                phase: Phase::Focus
            }
        );
        let err = engine.start_break_at(&mut store, secs(10)).unwrap_err();
        assert!(matches!(err, FocusError::AlreadyRunning { .. }));

        assert_eq!(engine.snapshot(), before);
        assert_eq!(engine.start_time(), Some(t0()));
        assert_eq!(store.sessions.len(), 1);
    }

    #[test]
    fn test_tick_recomputes_from_end_time() {
        let mut store = MemoryStore::default();
        let mut engine = engine();
        engine.start_focus_at(&mut store, t0()).unwrap();

        let Tick::Running(snapshot) = engine.tick_at(&mut store, secs(1)) else {
            panic!("expected running");
        };
        assert_eq!(snapshot.remaining_seconds, 1499);

        // A delayed tick jumps straight to the wall-clock value.
        let Tick::Running(snapshot) = engine.tick_at(&mut store, secs(600)) else {
            panic!("expected running");
        };
        assert_eq!(snapshot.remaining_seconds, 900);
    }

    #[test]
    fn test_tick_is_idempotent_within_the_same_instant() {
        let mut store = MemoryStore::default();
        let mut engine = engine();
        engine.start_focus_at(&mut store, t0()).unwrap();

        let now = secs(42) + Duration::milliseconds(300);
        let first = engine.tick_at(&mut store, now);
        let second = engine.tick_at(&mut store, now);
        assert_eq!(first, second);
        assert_eq!(engine.remaining_seconds(), 1458);
    }

    #[test]
    fn test_tick_when_idle_is_noop() {
        let mut store = MemoryStore::default();
        let mut engine = engine();

        let tick = engine.tick_at(&mut store, t0());

        assert_eq!(tick, Tick::Idle(engine.snapshot()));
        assert!(store.sessions.is_empty());
    }

    #[test]
    fn test_natural_completion_logs_completed_and_counts_focus() {
        let mut store = MemoryStore::default();
        let mut engine = engine();
        engine.start_focus_at(&mut store, t0()).unwrap();

        let tick = engine.tick_at(&mut store, secs(1500));

        assert_eq!(
            tick,
            Tick::Completed(Completion {
                phase: Phase::Focus,
                session_count: 1,
            })
        );
        assert!(!engine.is_running());
        assert_eq!(engine.phase(), Phase::Idle);
        assert_eq!(engine.remaining_seconds(), 1500);
        assert_eq!(engine.current_session_id(), None);

        let row = &store.sessions[0];
        assert_eq!(row.end, Some(secs(1500)));
        assert_eq!(row.duration_minutes, Some(25));
        assert!(row.completed);
    }

    #[test]
    fn test_late_tick_still_completes_once() {
        let mut store = MemoryStore::default();
        let mut engine = engine();
        engine.start_focus_at(&mut store, t0()).unwrap();

        let tick = engine.tick_at(&mut store, secs(4000));
        assert!(matches!(tick, Tick::Completed(_)));
        let tick = engine.tick_at(&mut store, secs(4001));
        assert!(matches!(tick, Tick::Idle(_)));
        assert_eq!(engine.session_count(), 1);
    }

    #[test]
    fn test_break_completion_does_not_count_session() {
        let mut store = MemoryStore::default();
        let mut engine = engine();

        let snapshot = engine.start_break_at(&mut store, t0()).unwrap();
        assert_eq!(snapshot.phase, Phase::Break);
        assert_eq!(snapshot.remaining_seconds, 300);
        assert_eq!(store.sessions[0].session_type, SessionType::Break);

        let tick = engine.tick_at(&mut store, secs(300));
        assert_eq!(
            tick,
            Tick::Completed(Completion {
                phase: Phase::Break,
                session_count: 0,
            })
        );
        assert!(store.sessions[0].completed);
    }

    #[test]
    fn test_stop_logs_incomplete_and_resets() {
        let mut store = MemoryStore::default();
        let mut engine = engine();
        engine.start_focus_at(&mut store, t0()).unwrap();

        let report = engine.stop_at(&mut store, secs(125)).unwrap();

        assert_eq!(
            report,
            StopReport {
                phase: Phase::Focus,
                elapsed_seconds: 125,
            }
        );
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.phase, Phase::Idle);
        assert!(!snapshot.is_running);
        assert_eq!(snapshot.remaining_seconds, 1500);
        assert_eq!(snapshot.session_count, 0);

        let row = &store.sessions[0];
        assert_eq!(row.end, Some(secs(125)));
        assert_eq!(row.duration_minutes, Some(2));
        assert!(!row.completed);
    }

    #[test]
    fn test_stop_when_idle_is_rejected() {
        let mut store = MemoryStore::default();
        let mut engine = engine();
        assert_eq!(
            engine.stop_at(&mut store, t0()),
            Err(FocusError::NotRunning)
        );
    }

    #[test]
    fn test_long_break_after_every_fourth_focus() {
        let mut store = MemoryStore::default();
        let mut engine = engine();
        let mut clock = t0();

        assert_eq!(engine.next_break_phase(), Phase::Break);
        for cycle in 1..=8u32 {
            complete_focus(&mut engine, &mut store, clock);
            clock += Duration::hours(1);
            assert_eq!(engine.session_count(), cycle);

            let phase = complete_break(&mut engine, &mut store, clock);
            clock += Duration::hours(2);
            let expected = if cycle % 4 == 0 {
                Phase::LongBreak
            } else {
                Phase::Break
            };
            assert_eq!(phase, expected, "cycle {cycle}");
        }

        let long_rows = store
            .sessions
            .iter()
            .filter(|row| row.session_type == SessionType::LongBreak)
            .count();
        assert_eq!(long_rows, 2);
    }

    #[test]
    fn test_long_break_duration_is_used() {
        let mut store = MemoryStore::default();
        let mut engine = engine();
        let mut clock = t0();
        for _ in 0..4 {
            complete_focus(&mut engine, &mut store, clock);
            clock += Duration::hours(1);
        }

        let snapshot = engine.start_break_at(&mut store, clock).unwrap();
        assert_eq!(snapshot.phase, Phase::LongBreak);
        assert_eq!(snapshot.remaining_seconds, 15 * 60);
    }

    #[test]
    fn test_at_most_one_open_session_row() {
        let mut store = MemoryStore::default();
        let mut engine = engine();

        engine.start_focus_at(&mut store, t0()).unwrap();
        let _ = engine.start_focus_at(&mut store, secs(5));
        engine.stop_at(&mut store, secs(10)).unwrap();
        engine.start_break_at(&mut store, secs(20)).unwrap();

        let open = store.sessions.iter().filter(|row| row.end.is_none()).count();
        assert_eq!(open, 1);
    }

    #[test]
    fn test_set_mode_rejected_while_running() {
        let mut store = MemoryStore::default();
        let mut engine = engine();
        engine.start_focus_at(&mut store, t0()).unwrap();

        let err = engine.set_mode(&mut store, FocusMode::Timeblock).unwrap_err();

        assert_eq!(
            err,
            FocusError::ModeLocked {
                phase: Phase::Focus
            }
        );
        assert_eq!(engine.mode(), FocusMode::Pomodoro);
        assert!(!store.settings.contains_key(FOCUS_MODE_SETTING));
    }

    #[test]
    fn test_set_mode_persists_and_load_restores() {
        let mut store = MemoryStore::default();
        let mut engine = engine();

        engine.set_mode(&mut store, FocusMode::Timeblock).unwrap();
        assert_eq!(engine.mode(), FocusMode::Timeblock);
        assert_eq!(store.settings[FOCUS_MODE_SETTING], "timeblock");

        let restored = FocusEngine::load(&store, FocusConfig::default());
        assert_eq!(restored.mode(), FocusMode::Timeblock);
    }

    #[test]
    fn test_load_defaults_unknown_mode() {
        let mut store = MemoryStore::default();
        store
            .settings
            .insert(FOCUS_MODE_SETTING.to_string(), "flow".to_string());

        let engine = FocusEngine::load(&store, FocusConfig::default());
        assert_eq!(engine.mode(), FocusMode::Pomodoro);
    }

    #[test]
    fn test_log_failures_do_not_stop_the_timer() {
        let mut store = MemoryStore::failing();
        let mut engine = engine();

        let snapshot = engine.start_focus_at(&mut store, t0()).unwrap();
        assert!(snapshot.is_running);
        assert_eq!(engine.current_session_id(), None);

        let Tick::Running(snapshot) = engine.tick_at(&mut store, secs(60)) else {
            panic!("expected running");
        };
        assert_eq!(snapshot.remaining_seconds, 1440);

        let tick = engine.tick_at(&mut store, secs(1500));
        assert_eq!(
            tick,
            Tick::Completed(Completion {
                phase: Phase::Focus,
                session_count: 1,
            })
        );
        assert!(store.sessions.is_empty());
    }

    #[test]
    fn test_close_failure_still_resets_state() {
        let mut store = MemoryStore::default();
        let mut engine = engine();
        engine.start_focus_at(&mut store, t0()).unwrap();
        store.fail_writes = true;

        let report = engine.stop_at(&mut store, secs(30)).unwrap();

        assert_eq!(report.elapsed_seconds, 30);
        assert!(!engine.is_running());
        assert_eq!(store.sessions[0].end, None);
    }

    #[test]
    fn test_custom_durations_are_respected() {
        let mut store = MemoryStore::default();
        let mut engine = FocusEngine::new(FocusConfig {
            focus_minutes: 50,
            break_minutes: 10,
            long_break_minutes: 30,
            sessions_before_long_break: 2,
        });

        let snapshot = engine.start_focus_at(&mut store, t0()).unwrap();
        assert_eq!(snapshot.remaining_seconds, 3000);
        engine.tick_at(&mut store, secs(3000));

        let snapshot = engine.start_break_at(&mut store, secs(3000)).unwrap();
        assert_eq!(snapshot.phase, Phase::Break);
        assert_eq!(snapshot.remaining_seconds, 600);
        engine.tick_at(&mut store, secs(3600));

        engine.start_focus_at(&mut store, secs(3600)).unwrap();
        engine.tick_at(&mut store, secs(6600));
        assert_eq!(engine.session_count(), 2);

        let snapshot = engine.start_break_at(&mut store, secs(6600)).unwrap();
        assert_eq!(snapshot.phase, Phase::LongBreak);
        assert_eq!(snapshot.remaining_seconds, 1800);
    }

    // ========== Time block tests ==========

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_schedule_logs_closed_timeblock_row() {
        let mut store = MemoryStore::default();
        let mut engine = engine();

        let scheduled = engine
            .schedule_timeblock_at(&mut store, at(10, 0), at(11, 30), "write report", at(8, 0))
            .unwrap();

        assert_eq!(scheduled.duration_minutes, 90);
        assert_eq!(scheduled.block.task_name, "write report");
        assert_eq!(engine.timeblock(), Some(&scheduled.block));

        let row = &store.sessions[0];
        assert_eq!(Some(row.id), scheduled.session_id);
        assert_eq!(row.mode, FocusMode::Timeblock);
        assert_eq!(row.session_type, SessionType::Focus);
        assert_eq!(row.start, at(10, 0));
        assert_eq!(row.end, Some(at(11, 30)));
        assert_eq!(row.duration_minutes, Some(90));
        assert_eq!(row.task_name.as_deref(), Some("write report"));
    }

    #[test]
    fn test_schedule_rejects_invalid_windows() {
        let mut store = MemoryStore::default();
        let mut engine = engine();

        let err = engine
            .schedule_timeblock_at(&mut store, at(7, 0), at(9, 0), "", at(8, 0))
            .unwrap_err();
        assert_eq!(err, FocusError::InvalidWindow(WindowError::StartNotInFuture));

        let err = engine
            .schedule_timeblock_at(&mut store, at(10, 0), at(9, 30), "", at(8, 0))
            .unwrap_err();
        assert_eq!(err, FocusError::InvalidWindow(WindowError::EndNotAfterStart));

        assert!(store.sessions.is_empty());
        assert_eq!(engine.timeblock(), None);
    }

    #[test]
    fn test_schedule_rejects_overlap_but_allows_touching() {
        let mut store = MemoryStore::default();
        let mut engine = engine();
        let now = at(8, 0);
        engine
            .schedule_timeblock_at(&mut store, at(10, 0), at(11, 0), "", now)
            .unwrap();

        let err = engine
            .schedule_timeblock_at(&mut store, at(10, 30), at(10, 45), "", now)
            .unwrap_err();
        assert_eq!(
            err,
            FocusError::Overlap {
                start: at(10, 0),
                end: at(11, 0),
            }
        );
        assert_eq!(engine.timeblock().unwrap().start, at(10, 0));

        let touching = engine
            .schedule_timeblock_at(&mut store, at(9, 0), at(10, 0), "", now)
            .unwrap();
        assert_eq!(engine.timeblock(), Some(&touching.block));
        assert_eq!(store.sessions.len(), 2);
    }

    #[test]
    fn test_held_block_from_the_log_blocks_overlaps() {
        let mut store = MemoryStore::default();
        let mut engine = engine();
        engine.hold_timeblock(TimeBlock {
            start: at(10, 0),
            end: at(11, 0),
            task_name: "review".to_string(),
        });

        let err = engine
            .schedule_timeblock_at(&mut store, at(10, 30), at(10, 45), "", at(8, 0))
            .unwrap_err();
        assert!(matches!(err, FocusError::Overlap { .. }));
        assert!(store.sessions.is_empty());
        assert_eq!(
            engine.timeblock_status_at(at(10, 30)),
            BlockStatus::InProgress {
                remaining_seconds: 1800
            }
        );
    }

    #[test]
    fn test_status_moves_scheduled_in_progress_completed() {
        let mut store = MemoryStore::default();
        let mut engine = engine();
        assert_eq!(engine.timeblock_status_at(at(8, 0)), BlockStatus::Inactive);

        engine
            .schedule_timeblock_at(&mut store, at(10, 0), at(11, 0), "", at(8, 0))
            .unwrap();

        assert_eq!(
            engine.timeblock_status_at(at(9, 0)),
            BlockStatus::Scheduled {
                remaining_seconds: 3600
            }
        );
        assert_eq!(
            engine.timeblock_status_at(at(10, 15)),
            BlockStatus::InProgress {
                remaining_seconds: 2700
            }
        );
        assert_eq!(engine.timeblock_status_at(at(11, 0)), BlockStatus::Completed);
    }

    #[test]
    fn test_clear_keeps_the_log_row() {
        let mut store = MemoryStore::default();
        let mut engine = engine();
        engine
            .schedule_timeblock_at(&mut store, at(10, 0), at(11, 0), "", at(8, 0))
            .unwrap();

        let cleared = engine.clear_timeblock();

        assert!(cleared.is_some());
        assert_eq!(engine.timeblock_status_at(at(10, 30)), BlockStatus::Inactive);
        assert_eq!(store.sessions.len(), 1);

        // With the block gone, the same window can be scheduled again.
        engine
            .schedule_timeblock_at(&mut store, at(10, 0), at(11, 0), "", at(8, 0))
            .unwrap();
    }

    #[test]
    fn test_timeblock_is_independent_of_pomodoro() {
        let mut store = MemoryStore::default();
        let mut engine = engine();
        engine.start_focus_at(&mut store, at(8, 0)).unwrap();

        engine
            .schedule_timeblock_at(&mut store, at(10, 0), at(11, 0), "", at(8, 1))
            .unwrap();

        assert!(engine.is_running());
        assert_eq!(engine.phase(), Phase::Focus);
    }

    #[test]
    fn test_schedule_log_failure_still_holds_block() {
        let mut store = MemoryStore::failing();
        let mut engine = engine();

        let scheduled = engine
            .schedule_timeblock_at(&mut store, at(10, 0), at(11, 0), "", at(8, 0))
            .unwrap();

        assert_eq!(scheduled.session_id, None);
        assert!(engine.timeblock().is_some());
    }
}
