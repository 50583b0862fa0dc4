//! Mode command for switching between Pomodoro and time blocks.

use std::io::Write;

use anyhow::Result;
use tempo_core::{FocusConfig, FocusEngine, FocusMode};
use tempo_db::Database;

pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    mode: Option<FocusMode>,
    config: &FocusConfig,
) -> Result<()> {
    let mut engine = FocusEngine::load(&*db, *config);
    match mode {
        None => writeln!(writer, "Focus mode: {}", engine.mode())?,
        Some(mode) => {
            engine.set_mode(db, mode)?;
            writeln!(writer, "Focus mode set to {mode}")?;
        }
    }
    Ok(())
}
