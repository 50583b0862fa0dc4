//! Points and rewards rules.
//!
//! The ledger owns no state. Each function turns a habit, task or reward event
//! into balance operations on a [`LedgerStore`].
//!
//! # Rules
//!
//! - Habit day: done = 2, partial = 1, missed = 0. Changing today's status
//!   applies the difference, so flipping done to missed costs 2.
//! - Task completion awards the task's points once.
//! - Missing a high-priority deadline costs [`MISSED_HIGH_PRIORITY_PENALTY`].
//! - At least 80% done across all habits over the trailing seven days earns
//!   [`WEEKLY_CONSISTENCY_BONUS`], at most once per ISO week.
//! - Rewards unlock once no top-3 task is left open.
//!
//! Deductions never take the balance below zero.

use std::collections::HashMap;

use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;

use crate::store::{HabitId, LedgerStore, RewardId, TaskId};
use crate::types::HabitStatus;

/// Points removed when a high-priority task's deadline passes.
pub const MISSED_HIGH_PRIORITY_PENALTY: i64 = 2;

/// Points awarded by a successful weekly consistency check.
pub const WEEKLY_CONSISTENCY_BONUS: i64 = 10;

/// Settings key holding the ISO week (e.g. `2026-W42`) of the last bonus.
pub const WEEKLY_BONUS_SETTING: &str = "weekly_bonus_week";

/// Result of a reward claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ClaimOutcome {
    /// The cost was deducted. `balance` is the balance afterwards.
    Claimed { cost: i64, balance: i64 },
    /// The balance is below the cost and was left untouched.
    InsufficientBalance { cost: i64, balance: i64 },
    /// No reward with that id exists.
    UnknownReward,
}

impl ClaimOutcome {
    /// Decides a claim of `cost` against `balance`.
    #[must_use]
    pub const fn evaluate(balance: i64, cost: i64) -> Self {
        if balance >= cost {
            Self::Claimed {
                cost,
                balance: balance - cost,
            }
        } else {
            Self::InsufficientBalance { cost, balance }
        }
    }

    #[must_use]
    pub const fn is_claimed(&self) -> bool {
        matches!(self, Self::Claimed { .. })
    }
}

/// Balance change for moving a habit day from `old` to `new`.
#[must_use]
pub const fn status_delta(old: HabitStatus, new: HabitStatus) -> i64 {
    new.points() - old.points()
}

/// Logs a habit status for `date` and applies the point difference.
///
/// Returns the delta that was applied. Negative deltas are deducted with the
/// usual zero floor, so the balance may move by less than the delta.
pub fn record_habit_status<S: LedgerStore>(
    store: &mut S,
    habit: HabitId,
    date: NaiveDate,
    status: HabitStatus,
) -> Result<i64, S::Error> {
    let previous = store.habit_status(habit, date)?;
    let delta = status_delta(previous, status);
    store.set_habit_status(habit, date, status, delta)?;

    tracing::debug!(habit, %date, %previous, %status, delta, "habit status recorded");
    Ok(delta)
}

/// Completes a task and awards its points.
///
/// Completing an already completed task awards nothing and returns 0.
pub fn complete_task<S: LedgerStore>(
    store: &mut S,
    task: TaskId,
    date: NaiveDate,
) -> Result<i64, S::Error> {
    let Some(points) = store.complete_task(task, date)? else {
        tracing::debug!(task, "task already completed or missing");
        return Ok(0);
    };
    if points > 0 {
        store.add_points(points)?;
    }
    tracing::info!(task, points, "task completed");
    Ok(points)
}

/// Deducts the missed high-priority penalty. Returns the penalty.
///
/// Nothing in the core calls this; whatever watches deadlines does.
pub fn penalize_missed_high_priority<S: LedgerStore>(
    store: &mut S,
    task: TaskId,
) -> Result<i64, S::Error> {
    store.deduct_points(MISSED_HIGH_PRIORITY_PENALTY)?;
    tracing::info!(
        task,
        penalty = MISSED_HIGH_PRIORITY_PENALTY,
        "missed high-priority task"
    );
    Ok(MISSED_HIGH_PRIORITY_PENALTY)
}

/// Whether the week grid reaches the 80% done threshold.
///
/// Each entry is one habit's last seven days. An empty grid never qualifies.
#[must_use]
pub fn qualifies_for_weekly_bonus(weeks: &[[HabitStatus; 7]]) -> bool {
    let total = weeks.len() * 7;
    if total == 0 {
        return false;
    }
    let done = weeks
        .iter()
        .flatten()
        .filter(|status| **status == HabitStatus::Done)
        .count();
    done * 5 >= total * 4
}

/// Awards the weekly consistency bonus if earned and not yet awarded for the
/// ISO week containing `today`. Returns the points awarded.
pub fn check_weekly_bonus<S: LedgerStore>(store: &mut S, today: NaiveDate) -> Result<i64, S::Error> {
    let week = iso_week_label(today);
    if store.get_setting(WEEKLY_BONUS_SETTING, "")? == week {
        tracing::debug!(%week, "weekly bonus already awarded");
        return Ok(0);
    }

    let habits = store.list_habit_ids()?;
    let mut grid = Vec::with_capacity(habits.len());
    for habit in habits {
        grid.push(store.week_status(habit, today)?);
    }
    if !qualifies_for_weekly_bonus(&grid) {
        return Ok(0);
    }

    // Mark the week before paying so a failed write never pays twice.
    store.set_setting(WEEKLY_BONUS_SETTING, &week)?;
    store.add_points(WEEKLY_CONSISTENCY_BONUS)?;
    tracing::info!(%week, bonus = WEEKLY_CONSISTENCY_BONUS, "weekly bonus awarded");
    Ok(WEEKLY_CONSISTENCY_BONUS)
}

/// Rewards can be claimed once no top-3 task is left incomplete.
pub fn can_unlock_rewards<S: LedgerStore>(store: &S) -> Result<bool, S::Error> {
    Ok(store.count_incomplete_top3()? == 0)
}

/// Claims a reward, deducting its cost if the balance covers it.
pub fn claim_reward<S: LedgerStore>(
    store: &mut S,
    reward: RewardId,
    date: NaiveDate,
) -> Result<ClaimOutcome, S::Error> {
    let outcome = store.claim_reward(reward, date)?;
    match outcome {
        ClaimOutcome::Claimed { cost, balance } => {
            tracing::info!(reward, cost, balance, "reward claimed");
        }
        ClaimOutcome::InsufficientBalance { cost, balance } => {
            tracing::debug!(reward, cost, balance, "insufficient balance for reward");
        }
        ClaimOutcome::UnknownReward => tracing::debug!(reward, "unknown reward"),
    }
    Ok(outcome)
}

/// Consecutive `done` days ending on `today`.
///
/// A day without a log, or with any status other than done, ends the streak.
#[must_use]
pub fn current_streak(today: NaiveDate, logs: &[(NaiveDate, HabitStatus)]) -> u32 {
    let by_date: HashMap<NaiveDate, HabitStatus> = logs.iter().copied().collect();
    let mut streak = 0;
    let mut day = Some(today);
    while let Some(date) = day {
        if by_date.get(&date) != Some(&HabitStatus::Done) {
            break;
        }
        streak += 1;
        day = date.checked_sub_days(Days::new(1));
    }
    streak
}

fn iso_week_label(date: NaiveDate) -> String {
    let week = date.iso_week();
    format!("{}-W{:02}", week.year(), week.week())
}
