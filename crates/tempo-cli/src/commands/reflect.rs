//! Reflect command: the short end-of-day reflection.

use std::io::Write;

use anyhow::{Result, bail};
use chrono::NaiveDate;
use clap::Args;
use serde::Serialize;
use tempo_db::{Database, Reflection};

use super::util::parse_date;

#[derive(Debug, Args)]
pub struct ReflectArgs {
    /// What you completed, e.g. "Most tasks", "Some tasks", "Few", "Nothing".
    #[arg(long)]
    pub completed: Option<String>,

    /// What felt difficult, e.g. "Focus", "Time", "Energy", "Motivation".
    #[arg(long)]
    pub difficult: Option<String>,

    /// One small win, e.g. "Habit done", "Task done", "Stayed focused".
    #[arg(long)]
    pub win: Option<String>,

    /// Day to reflect on (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    pub date: Option<String>,

    /// Output as JSON when showing a reflection.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct ReflectionEntry<'a> {
    date: NaiveDate,
    #[serde(flatten)]
    reflection: &'a Reflection,
}

/// Saves a reflection when any answer is given, otherwise shows the saved one.
///
/// Saving replaces the whole entry for the day; answers left out are stored
/// empty.
pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    args: &ReflectArgs,
    today: NaiveDate,
) -> Result<()> {
    let date = match &args.date {
        Some(date) => parse_date(date)?,
        None => today,
    };
    if date > today {
        bail!("cannot reflect on a future date: {date}");
    }

    if args.completed.is_some() || args.difficult.is_some() || args.win.is_some() {
        let answer = |value: Option<&str>| value.unwrap_or("").trim().to_string();
        let reflection = Reflection {
            completed: answer(args.completed.as_deref()),
            difficult: answer(args.difficult.as_deref()),
            win: answer(args.win.as_deref()),
        };
        db.save_reflection(date, &reflection)?;
        tracing::debug!(%date, "reflection saved");
        writeln!(writer, "Saved reflection for {date}")?;
        return Ok(());
    }

    let saved = db.reflection(date)?;
    if args.json {
        let entry = saved
            .as_ref()
            .map(|reflection| ReflectionEntry { date, reflection });
        writeln!(writer, "{}", serde_json::to_string_pretty(&entry)?)?;
        return Ok(());
    }

    let Some(reflection) = saved else {
        writeln!(writer, "No reflection for {date}")?;
        return Ok(());
    };
    writeln!(writer, "Reflection for {date}")?;
    writeln!(writer, "Completed: {}", or_dash(&reflection.completed))?;
    writeln!(writer, "Difficult: {}", or_dash(&reflection.difficult))?;
    writeln!(writer, "Win: {}", or_dash(&reflection.win))?;
    Ok(())
}

fn or_dash(answer: &str) -> &str {
    if answer.is_empty() { "-" } else { answer }
}
