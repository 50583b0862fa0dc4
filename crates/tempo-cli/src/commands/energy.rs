//! Energy command for the user's self-reported energy today.

use std::io::Write;

use anyhow::Result;
use clap::ValueEnum;
use tempo_core::SettingsStore;
use tempo_db::{Database, ENERGY_SETTING};

/// Self-reported energy, also used to tag and filter tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EnergyLevel {
    High,
    Medium,
    Low,
}

impl EnergyLevel {
    /// Stored form, capitalized as shown to the user.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

/// Reads today's energy level, `Medium` when never set.
pub fn current(db: &Database) -> Result<String> {
    Ok(db.get_setting(ENERGY_SETTING, EnergyLevel::Medium.as_str())?)
}

pub fn run<W: Write>(writer: &mut W, db: &mut Database, level: Option<EnergyLevel>) -> Result<()> {
    match level {
        Some(level) => {
            db.set_setting(ENERGY_SETTING, level.as_str())?;
            writeln!(writer, "Energy set to {}", level.as_str())?;
        }
        None => writeln!(writer, "Energy: {}", current(db)?)?,
    }
    Ok(())
}
