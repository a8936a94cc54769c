//! Stackgraph CLI library.
//!
//! This crate provides the CLI interface for stackgraph.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, PlayersAction};
pub use config::Config;
