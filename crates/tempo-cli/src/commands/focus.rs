//! Focus command: runs Pomodoro phases in the foreground.
//!
//! The loop ticks the engine once per [`TICK_INTERVAL`] and redraws the
//! countdown in place. Each phase row is closed when it completes. If the
//! process is killed mid-phase, its row is closed as not completed the next
//! time `tempo focus` starts.

use std::io::Write;

use anyhow::{Result, bail};
use clap::Args;
use tempo_core::{FocusConfig, FocusEngine, FocusMode, Phase, Tick, format_clock};
use tempo_db::Database;

use super::{Clock, TICK_INTERVAL};

#[derive(Debug, Args)]
pub struct FocusArgs {
    /// Take a break instead of starting a focus phase.
    #[arg(long = "break")]
    pub take_break: bool,

    /// Number of focus phases to run, each followed by its break.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub cycles: u32,
}

pub fn run<W: Write, C: Clock>(
    writer: &mut W,
    db: &mut Database,
    args: &FocusArgs,
    config: &FocusConfig,
    clock: &mut C,
) -> Result<()> {
    let mut engine = FocusEngine::load(&*db, *config);
    if engine.mode() != FocusMode::Pomodoro {
        bail!(
            "focus mode is {}; run `tempo mode pomodoro` first",
            engine.mode()
        );
    }

    let closed = db.close_open_sessions(clock.now())?;
    if closed > 0 {
        writeln!(writer, "Closed {closed} interrupted session(s)")?;
    }

    if args.take_break {
        run_phase(writer, db, &mut engine, clock, false)?;
        return Ok(());
    }
    for _ in 0..args.cycles {
        run_phase(writer, db, &mut engine, clock, true)?;
        run_phase(writer, db, &mut engine, clock, false)?;
    }
    Ok(())
}

fn run_phase<W: Write, C: Clock>(
    writer: &mut W,
    db: &mut Database,
    engine: &mut FocusEngine,
    clock: &mut C,
    focus: bool,
) -> Result<()> {
    let started = if focus {
        engine.start_focus_at(db, clock.now())?
    } else {
        engine.start_break_at(db, clock.now())?
    };
    writeln!(
        writer,
        "{} started ({})",
        phase_label(started.phase),
        format_clock(started.remaining_seconds)
    )?;

    loop {
        clock.sleep(TICK_INTERVAL);
        match engine.tick_at(db, clock.now()) {
            Tick::Running(snapshot) => {
                write!(writer, "\r{}", format_clock(snapshot.remaining_seconds))?;
                writer.flush()?;
            }
            Tick::Completed(completion) => {
                writeln!(writer, "\r00:00")?;
                if completion.phase == Phase::Focus {
                    writeln!(
                        writer,
                        "{} complete (sessions: {})",
                        phase_label(completion.phase),
                        completion.session_count
                    )?;
                } else {
                    writeln!(writer, "{} complete", phase_label(completion.phase))?;
                }
                return Ok(());
            }
            Tick::Idle(_) => return Ok(()),
        }
    }
}

const fn phase_label(phase: Phase) -> &'static str {
    match phase {
        Phase::Idle => "Idle",
        Phase::Focus => "Focus",
        Phase::Break => "Break",
        Phase::LongBreak => "Long break",
    }
}
