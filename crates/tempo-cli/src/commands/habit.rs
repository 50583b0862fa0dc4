//! Habit commands: add, list, log and remove daily habits, and the monthly view.

use std::io::Write;

use anyhow::{Context, Result, bail};
use chrono::{Datelike, NaiveDate};
use clap::Subcommand;
use serde::Serialize;
use tempo_core::ledger;
use tempo_core::{HabitId, HabitStatus, LedgerStore, current_streak};
use tempo_db::{Database, HabitMonth, HabitRecord, MonthSummary};

use super::util::{parse_date, parse_month};

#[derive(Debug, Subcommand)]
pub enum HabitAction {
    /// Add a habit.
    Add {
        /// Habit name.
        name: String,
    },

    /// List habits with today's status, the last 7 days and the streak.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Log a habit as done, partial or missed and adjust points.
    Log {
        /// Habit ID.
        id: HabitId,

        /// New status: done, partial or missed.
        status: HabitStatus,

        /// Day to log (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        date: Option<String>,
    },

    /// Delete a habit and its history.
    Rm {
        /// Habit ID.
        id: HabitId,
    },

    /// Show a month of habit logs with completion totals.
    Month {
        /// Month to show (YYYY-MM). Defaults to the current month.
        month: Option<String>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Month view: totals plus each habit's days.
#[derive(Debug, Clone, Serialize)]
pub struct MonthReport {
    #[serde(flatten)]
    pub summary: MonthSummary,
    pub habits: Vec<HabitMonth>,
}

/// Habit row for display.
#[derive(Debug, Clone, Serialize)]
pub struct HabitEntry {
    pub id: HabitId,
    pub name: String,
    pub today: HabitStatus,
    /// Oldest first, ending today.
    pub week: [HabitStatus; 7],
    pub streak: u32,
}

pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    action: &HabitAction,
    today: NaiveDate,
) -> Result<()> {
    match action {
        HabitAction::Add { name } => {
            let name = name.trim();
            if name.is_empty() {
                bail!("habit name cannot be empty");
            }
            let id = db.add_habit(name, today)?;
            writeln!(writer, "Added habit {id}: {name}")?;
        }
        HabitAction::List { json } => {
            let entries = list_entries(db, today)?;
            if *json {
                writeln!(writer, "{}", serde_json::to_string_pretty(&entries)?)?;
            } else {
                write!(writer, "{}", format_habits(&entries))?;
            }
        }
        HabitAction::Log { id, status, date } => {
            let date = match date {
                Some(date) => parse_date(date)?,
                None => today,
            };
            if date > today {
                bail!("cannot log a habit for a future date: {date}");
            }
            let habit = find_habit(db, *id)?;
            let delta = ledger::record_habit_status(db, habit.id, date, *status)
                .context("failed to log habit")?;
            writeln!(
                writer,
                "Logged {} as {status} for {date} ({delta:+} points, balance {})",
                habit.name,
                db.balance()?
            )?;
        }
        HabitAction::Rm { id } => {
            if !db.delete_habit(*id)? {
                bail!("habit not found: {id}");
            }
            writeln!(writer, "Deleted habit {id}")?;
        }
        HabitAction::Month { month, json } => {
            let (year, month) = match month {
                Some(month) => parse_month(month)?,
                None => (today.year(), today.month()),
            };
            let report = MonthReport {
                summary: db.month_summary(year, month)?,
                habits: db.month_habits(year, month)?,
            };
            if *json {
                writeln!(writer, "{}", serde_json::to_string_pretty(&report)?)?;
            } else {
                write!(writer, "{}", format_month(&report))?;
            }
        }
    }
    Ok(())
}

fn find_habit(db: &Database, id: HabitId) -> Result<HabitRecord> {
    db.list_habits()?
        .into_iter()
        .find(|habit| habit.id == id)
        .with_context(|| format!("habit not found: {id}"))
}

fn list_entries(db: &Database, today: NaiveDate) -> Result<Vec<HabitEntry>> {
    let mut entries = Vec::new();
    for habit in db.list_habits()? {
        let logs = db.habit_logs(habit.id)?;
        entries.push(HabitEntry {
            id: habit.id,
            today: db.habit_status(habit.id, today)?,
            week: db.week_status(habit.id, today)?,
            streak: current_streak(today, &logs),
            name: habit.name,
        });
    }
    Ok(entries)
}

const fn status_mark(status: HabitStatus) -> char {
    match status {
        HabitStatus::Done => 'x',
        HabitStatus::Partial => '~',
        HabitStatus::Missed => '.',
    }
}

fn format_habits(entries: &[HabitEntry]) -> String {
    use std::fmt::Write;

    let mut output = String::new();
    if entries.is_empty() {
        output.push_str("No habits yet. Add one with `tempo habit add <name>`.\n");
        return output;
    }

    let _ = writeln!(
        output,
        "{:<4}  {:<20}  {:<7}  {:<7}  Streak",
        "ID", "Habit", "Today", "Week"
    );
    for entry in entries {
        let week: String = entry.week.iter().copied().map(status_mark).collect();
        let _ = writeln!(
            output,
            "{:<4}  {:<20}  {:<7}  {:<7}  {}",
            entry.id,
            truncate(&entry.name, 20),
            entry.today.as_str(),
            week,
            entry.streak
        );
    }
    output
}

fn format_month(report: &MonthReport) -> String {
    use std::fmt::Write;

    let summary = &report.summary;
    let mut output = String::new();
    let _ = writeln!(
        output,
        "{}-{:02}: {}/{} done ({:.1}%)",
        summary.year,
        summary.month,
        summary.total_done,
        summary.total_possible,
        summary.completion_rate
    );
    if report.habits.is_empty() {
        output.push_str("No habits yet. Add one with `tempo habit add <name>`.\n");
        return output;
    }

    // Ones digit of each day of the month.
    let days: String = (1..=summary.days_in_month)
        .filter_map(|day| char::from_digit(day % 10, 10))
        .collect();
    let _ = writeln!(output, "{:<4}  {:<20}  {days}", "ID", "Habit");
    for habit in &report.habits {
        let marks: String = habit
            .days
            .iter()
            .map(|status| status.map_or('-', status_mark))
            .collect();
        let _ = writeln!(
            output,
            "{:<4}  {:<20}  {marks}",
            habit.id,
            truncate(&habit.name, 20)
        );
    }
    output
}

/// Truncate by characters, not bytes.
fn truncate(name: &str, width: usize) -> String {
    if name.chars().count() > width {
        format!("{}...", name.chars().take(width - 3).collect::<String>())
    } else {
        name.to_string()
    }
}
