//! Block command: schedules a time block and counts it down.

use std::io::Write;

use anyhow::{Result, bail};
use chrono::{DateTime, SecondsFormat, Utc};
use clap::Args;
use tempo_core::{BlockStatus, FocusConfig, FocusEngine, FocusMode, format_clock};
use tempo_db::Database;

use super::util::parse_datetime;
use super::{Clock, TICK_INTERVAL};

#[derive(Debug, Args)]
pub struct BlockArgs {
    /// Start time (RFC 3339 or relative, e.g. "in 10 minutes").
    #[arg(long)]
    pub start: String,

    /// End time (RFC 3339 or relative, e.g. "in 1 hour").
    #[arg(long)]
    pub end: String,

    /// What the block is for.
    #[arg(long, default_value = "")]
    pub task: String,

    /// Record the block and exit instead of waiting for it.
    #[arg(long)]
    pub no_wait: bool,
}

pub fn run<W: Write, C: Clock>(
    writer: &mut W,
    db: &mut Database,
    args: &BlockArgs,
    config: &FocusConfig,
    clock: &mut C,
) -> Result<()> {
    let mut engine = FocusEngine::load(&*db, *config);
    if engine.mode() != FocusMode::Timeblock {
        bail!(
            "focus mode is {}; run `tempo mode timeblock` first",
            engine.mode()
        );
    }

    let now = clock.now();
    if let Some(held) = db.current_timeblock(now)? {
        engine.hold_timeblock(held);
    }
    let start = parse_datetime(&args.start, now)?;
    let end = parse_datetime(&args.end, now)?;
    let scheduled = engine.schedule_timeblock_at(db, start, end, &args.task, now)?;

    let label = if scheduled.block.task_name.is_empty() {
        String::new()
    } else {
        format!(" for {}", scheduled.block.task_name)
    };
    writeln!(
        writer,
        "Scheduled block{label}: {} - {} ({} min)",
        format_time(scheduled.block.start),
        format_time(scheduled.block.end),
        scheduled.duration_minutes
    )?;
    if args.no_wait {
        return Ok(());
    }

    loop {
        clock.sleep(TICK_INTERVAL);
        match engine.timeblock_status_at(clock.now()) {
            BlockStatus::Scheduled { remaining_seconds } => {
                write!(writer, "\rstarts in {}", format_clock(remaining_seconds))?;
            }
            BlockStatus::InProgress { remaining_seconds } => {
                write!(writer, "\rin progress {}", format_clock(remaining_seconds))?;
            }
            BlockStatus::Completed | BlockStatus::Inactive => break,
        }
        writer.flush()?;
    }

    engine.clear_timeblock();
    writeln!(writer)?;
    writeln!(writer, "Time block complete")?;
    Ok(())
}

fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}
