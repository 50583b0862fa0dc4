//! Status command: the dashboard summary for today.

use std::io::Write;

use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;
use tempo_core::focus::FOCUS_MODE_SETTING;
use tempo_core::ledger;
use tempo_core::{FocusMode, SettingsStore};
use tempo_db::{Database, TodayStats};

use super::energy;

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub date: NaiveDate,
    pub mode: FocusMode,
    pub energy_level: String,
    pub rewards_unlocked: bool,
    #[serde(flatten)]
    pub stats: TodayStats,
}

pub fn collect(db: &Database, today: NaiveDate) -> Result<StatusReport> {
    let mode = db.get_setting(FOCUS_MODE_SETTING, FocusMode::Pomodoro.as_str())?;
    Ok(StatusReport {
        date: today,
        mode: FocusMode::from_stored(&mode),
        energy_level: energy::current(db)?,
        rewards_unlocked: ledger::can_unlock_rewards(db)?,
        stats: db.today_stats(today)?,
    })
}

pub fn run<W: Write>(writer: &mut W, db: &Database, today: NaiveDate, json: bool) -> Result<()> {
    let report = collect(db, today)?;

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&report)?)?;
        return Ok(());
    }

    let stats = &report.stats;
    writeln!(writer, "Tempo status for {}", report.date)?;
    writeln!(writer, "Points: {}", stats.points_balance)?;
    writeln!(writer, "Focus mode: {}", report.mode)?;
    writeln!(writer, "Energy: {}", report.energy_level)?;
    writeln!(
        writer,
        "Habits done today: {}/{}",
        stats.habits_done, stats.total_habits
    )?;
    writeln!(
        writer,
        "Open tasks: {} (top 3 open: {})",
        stats.pending_tasks, stats.top3_pending
    )?;
    writeln!(
        writer,
        "High-priority tasks done today: {}",
        stats.high_priority_done
    )?;
    writeln!(
        writer,
        "Rewards: {}",
        if report.rewards_unlocked {
            "unlocked"
        } else {
            "locked"
        }
    )?;
    Ok(())
}
