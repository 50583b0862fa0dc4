//! Sessions command for listing the focus session log.

use std::io::Write;

use anyhow::Result;
use tempo_db::{Database, SessionRecord};

pub fn run<W: Write>(writer: &mut W, db: &Database, limit: usize, json: bool) -> Result<()> {
    let sessions = db.list_sessions(limit)?;

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&sessions)?)?;
        return Ok(());
    }

    if sessions.is_empty() {
        writeln!(writer, "No focus sessions recorded.")?;
        return Ok(());
    }

    writeln!(
        writer,
        "{:<5}  {:<9}  {:<10}  {:<16}  {:>7}  {:<4}  Task",
        "ID", "Mode", "Type", "Start (UTC)", "Minutes", "Done"
    )?;
    for session in &sessions {
        writeln!(writer, "{}", format_row(session).trim_end())?;
    }
    Ok(())
}

fn format_row(session: &SessionRecord) -> String {
    let minutes = session
        .duration_minutes
        .map_or_else(|| "-".to_string(), |m| m.to_string());
    let done = match (session.end_time, session.completed) {
        (None, _) => "open",
        (Some(_), true) => "yes",
        (Some(_), false) => "no",
    };
    format!(
        "{:<5}  {:<9}  {:<10}  {:<16}  {:>7}  {:<4}  {}",
        session.id,
        session.mode.as_str(),
        session.session_type.as_str(),
        session.start_time.format("%Y-%m-%d %H:%M"),
        minutes,
        done,
        session.task_name.as_deref().unwrap_or("")
    )
}
