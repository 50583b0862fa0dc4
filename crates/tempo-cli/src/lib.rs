//! Tempo CLI library.
//!
//! This crate provides the command-line presentation layer over the focus
//! engine and points ledger.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands};
pub use config::Config;
