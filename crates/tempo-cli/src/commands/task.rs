//! Task commands: add, list, complete, pick top 3, postpone, miss and remove.

use std::io::Write;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Args, Subcommand, ValueEnum};
use tempo_core::ledger::{self, MISSED_HIGH_PRIORITY_PENALTY};
use tempo_core::{LedgerStore, TaskId};
use tempo_db::{Database, NewTask, PRIORITY_HIGH, TaskFilter, TaskRecord};

use super::energy::EnergyLevel;
use super::util::parse_deadline;

/// Most tasks that can be marked top-3 at once.
pub const TOP3_LIMIT: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// Stored value: 1 = low, 2 = medium, 3 = high.
    pub const fn value(self) -> i64 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => PRIORITY_HIGH,
        }
    }
}

const fn priority_label(priority: i64) -> &'static str {
    match priority {
        3 => "high",
        2 => "medium",
        1 => "low",
        _ => "?",
    }
}

#[derive(Debug, Args)]
pub struct AddTaskArgs {
    /// Task name.
    pub name: String,

    /// Deadline as 'YYYY-MM-DD HH:MM'.
    #[arg(long)]
    pub deadline: Option<String>,

    #[arg(long, value_enum, default_value_t = Priority::Low)]
    pub priority: Priority,

    /// Points awarded on completion.
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(i64).range(0..=100))]
    pub points: i64,

    /// Energy the task needs.
    #[arg(long, value_enum, default_value_t = EnergyLevel::High)]
    pub energy: EnergyLevel,

    /// Estimated duration in hours.
    #[arg(long, default_value_t = 1.0)]
    pub hours: f64,
}

#[derive(Debug, Subcommand)]
pub enum TaskAction {
    /// Add a task.
    Add(AddTaskArgs),

    /// List open tasks, highest priority first.
    List {
        /// Include completed tasks.
        #[arg(long)]
        all: bool,

        /// Only top-3 tasks.
        #[arg(long)]
        top3: bool,

        /// Only tasks tagged with this energy level.
        #[arg(long, value_enum)]
        energy: Option<EnergyLevel>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Complete a task and collect its points.
    Done {
        /// Task ID.
        id: TaskId,
    },

    /// Mark a task as one of today's top 3.
    Top3 {
        /// Task ID.
        id: TaskId,

        /// Remove the mark instead.
        #[arg(long)]
        unset: bool,
    },

    /// Postpone a task, optionally moving its deadline.
    Postpone {
        /// Task ID.
        id: TaskId,

        /// Why the task is postponed (e.g. "No time", "Too hard").
        #[arg(long)]
        reason: String,

        /// New deadline as 'YYYY-MM-DD HH:MM'.
        #[arg(long)]
        deadline: Option<String>,
    },

    /// Record a missed high-priority deadline and take the penalty.
    Miss {
        /// Task ID.
        id: TaskId,
    },

    /// Delete a task.
    Rm {
        /// Task ID.
        id: TaskId,
    },
}

pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    action: &TaskAction,
    today: NaiveDate,
) -> Result<()> {
    match action {
        TaskAction::Add(args) => add(writer, db, args),
        TaskAction::List {
            all,
            top3,
            energy,
            json,
        } => {
            let filter = TaskFilter {
                include_completed: *all,
                top3_only: *top3,
                energy_level: energy.map(|level| level.as_str().to_string()),
            };
            let tasks = db.list_tasks(&filter)?;
            if *json {
                writeln!(writer, "{}", serde_json::to_string_pretty(&tasks)?)?;
            } else {
                let top3_open = db.count_incomplete_top3()?;
                write!(writer, "{}", format_tasks(&tasks, top3_open))?;
            }
            Ok(())
        }
        TaskAction::Done { id } => done(writer, db, *id, today),
        TaskAction::Top3 { id, unset } => top3(writer, db, *id, !*unset),
        TaskAction::Postpone {
            id,
            reason,
            deadline,
        } => {
            let reason = reason.trim();
            if reason.is_empty() {
                bail!("postpone reason cannot be empty");
            }
            let deadline = deadline.as_deref().map(parse_deadline).transpose()?;
            let task = find_task(db, *id)?;
            db.postpone_task(task.id, today, reason, deadline.as_deref())?;
            match deadline {
                Some(deadline) => writeln!(
                    writer,
                    "Postponed {} to {deadline} ({reason})",
                    task.name
                )?,
                None => writeln!(writer, "Postponed {} ({reason})", task.name)?,
            }
            Ok(())
        }
        TaskAction::Miss { id } => {
            let task = find_task(db, *id)?;
            if task.is_completed {
                bail!("task {id} is already completed");
            }
            if task.priority != PRIORITY_HIGH {
                bail!("only high-priority tasks carry a missed-deadline penalty");
            }
            ledger::penalize_missed_high_priority(db, task.id)?;
            writeln!(
                writer,
                "Missed {} (-{MISSED_HIGH_PRIORITY_PENALTY} points, balance {})",
                task.name,
                db.balance()?
            )?;
            Ok(())
        }
        TaskAction::Rm { id } => {
            if !db.delete_task(*id)? {
                bail!("task not found: {id}");
            }
            writeln!(writer, "Deleted task {id}")?;
            Ok(())
        }
    }
}

fn add<W: Write>(writer: &mut W, db: &mut Database, args: &AddTaskArgs) -> Result<()> {
    let name = args.name.trim();
    if name.is_empty() {
        bail!("task name cannot be empty");
    }
    if !args.hours.is_finite() || args.hours < 0.0 {
        bail!("task duration must be a non-negative number of hours");
    }
    let task = NewTask {
        name: name.to_string(),
        deadline: args.deadline.as_deref().map(parse_deadline).transpose()?,
        priority: args.priority.value(),
        points: args.points,
        energy_level: Some(args.energy.as_str().to_string()),
        duration_hours: args.hours,
    };
    let id = db.add_task(&task)?;
    writeln!(writer, "Added task {id}: {name} ({} points)", task.points)?;
    Ok(())
}

fn done<W: Write>(writer: &mut W, db: &mut Database, id: TaskId, today: NaiveDate) -> Result<()> {
    let task = find_task(db, id)?;
    if task.is_completed {
        writeln!(writer, "Task {id} is already completed")?;
        return Ok(());
    }
    let points = ledger::complete_task(db, id, today).context("failed to complete task")?;
    writeln!(
        writer,
        "Completed {} (+{points} points, balance {})",
        task.name,
        db.balance()?
    )?;
    if task.is_top3 && ledger::can_unlock_rewards(&*db)? {
        writeln!(writer, "All top-3 tasks done: rewards unlocked")?;
    }
    Ok(())
}

fn top3<W: Write>(writer: &mut W, db: &mut Database, id: TaskId, mark: bool) -> Result<()> {
    let task = find_task(db, id)?;
    if mark {
        if task.is_completed {
            bail!("task {id} is already completed");
        }
        if !task.is_top3 && db.count_incomplete_top3()? >= TOP3_LIMIT {
            bail!("already {TOP3_LIMIT} top-3 tasks; unset one first");
        }
    }
    db.set_task_top3(id, mark)?;
    if mark {
        writeln!(writer, "Marked {} as top 3", task.name)?;
    } else {
        writeln!(writer, "Removed {} from top 3", task.name)?;
    }
    Ok(())
}

fn find_task(db: &Database, id: TaskId) -> Result<TaskRecord> {
    let filter = TaskFilter {
        include_completed: true,
        ..TaskFilter::default()
    };
    db.list_tasks(&filter)?
        .into_iter()
        .find(|task| task.id == id)
        .with_context(|| format!("task not found: {id}"))
}

fn format_tasks(tasks: &[TaskRecord], top3_open: u32) -> String {
    use std::fmt::Write;

    let mut output = String::new();
    let _ = writeln!(output, "Top 3: {top3_open}/{TOP3_LIMIT} open");
    if tasks.is_empty() {
        output.push_str("No tasks.\n");
        return output;
    }

    let _ = writeln!(
        output,
        "{:<4}  {:<1}  {:<24}  {:<16}  {:<6}  {:>6}  {:<6}  Hours",
        "ID", "*", "Task", "Deadline", "Prio", "Points", "Energy"
    );
    for task in tasks {
        let name = if task.is_completed {
            format!("[done] {}", task.name)
        } else {
            task.name.clone()
        };
        let _ = writeln!(
            output,
            "{:<4}  {:<1}  {:<24}  {:<16}  {:<6}  {:>6}  {:<6}  {:.1}",
            task.id,
            if task.is_top3 { "*" } else { "" },
            truncate(&name, 24),
            task.deadline.as_deref().unwrap_or("-"),
            priority_label(task.priority),
            task.points,
            task.energy_level.as_deref().unwrap_or("-"),
            task.duration_hours
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
