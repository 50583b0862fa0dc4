//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tempo_core::FocusMode;

use crate::commands::block::BlockArgs;
use crate::commands::energy::EnergyLevel;
use crate::commands::focus::FocusArgs;
use crate::commands::habit::HabitAction;
use crate::commands::reflect::ReflectArgs;
use crate::commands::reward::RewardAction;
use crate::commands::task::TaskAction;

/// Pomodoro timer, habit tracker and points ledger.
///
/// Runs focus phases and time blocks, tracks daily habits and tasks, and
/// turns them into points you can spend on rewards.
#[derive(Debug, Parser)]
#[command(name = "tempo", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show points, today's progress and the focus mode.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show or switch the focus mode (pomodoro or timeblock).
    Mode {
        /// Mode to switch to. Prints the current mode when omitted.
        mode: Option<FocusMode>,
    },

    /// Run Pomodoro phases in the foreground.
    Focus(FocusArgs),

    /// Schedule a time block and wait for it to finish.
    Block(BlockArgs),

    /// List recent focus sessions.
    Sessions {
        /// Maximum number of sessions to show.
        #[arg(long, default_value_t = 20)]
        limit: usize,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Manage daily habits.
    #[command(subcommand)]
    Habit(HabitAction),

    /// Manage tasks.
    #[command(subcommand)]
    Task(TaskAction),

    /// Manage and claim rewards.
    #[command(subcommand)]
    Reward(RewardAction),

    /// Award the weekly consistency bonus if it was earned.
    Bonus,

    /// Show or set today's energy level.
    Energy {
        /// Level to set. Prints the current level when omitted.
        level: Option<EnergyLevel>,
    },

    /// Save or show the end-of-day reflection.
    Reflect(ReflectArgs),
}
