use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tempo_cli::commands::{
    SystemClock, block, bonus, energy, focus, habit, mode, reflect, reward, sessions, status,
    task,
};
use tempo_cli::{Cli, Commands, Config};

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(tempo_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = tempo_db::Database::open(&config.database_path).context("failed to open database")?;
    Ok((db, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let (mut db, config) = open_database(cli.config.as_deref())?;
    let today = Local::now().date_naive();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match command {
        Commands::Status { json } => status::run(&mut out, &db, today, *json)?,
        Commands::Mode { mode: new_mode } => mode::run(&mut out, &mut db, *new_mode, &config.focus)?,
        Commands::Focus(args) => {
            focus::run(&mut out, &mut db, args, &config.focus, &mut SystemClock)?;
        }
        Commands::Block(args) => {
            block::run(&mut out, &mut db, args, &config.focus, &mut SystemClock)?;
        }
        Commands::Sessions { limit, json } => sessions::run(&mut out, &db, *limit, *json)?,
        Commands::Habit(action) => habit::run(&mut out, &mut db, action, today)?,
        Commands::Task(action) => task::run(&mut out, &mut db, action, today)?,
        Commands::Reward(action) => reward::run(&mut out, &mut db, action, today)?,
        Commands::Bonus => bonus::run(&mut out, &mut db, today)?,
        Commands::Energy { level } => energy::run(&mut out, &mut db, *level)?,
        Commands::Reflect(args) => reflect::run(&mut out, &mut db, args, today)?,
    }

    out.flush()?;
    Ok(())
}
