//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::graph::GraphArgs;

/// Poker session stack graphs.
///
/// Rebuilds every player's stack, buy-in and net, hand by hand, from a
/// roster export and an action log.
#[derive(Debug, Parser)]
#[command(name = "sg", version, about, long_about = None)]
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
    /// Reconstruct a session from its two exports.
    Graph(GraphArgs),

    /// Manage registered players and their identifiers.
    #[command(subcommand)]
    Players(PlayersAction),

    /// List recorded sessions.
    Sessions,

    /// Rank registered players by their recorded nets.
    Leaderboard {
        /// Rank by average net per session instead of total net.
        #[arg(long)]
        avg: bool,
    },

    /// Show one player's nets across sessions with a running total.
    Career {
        /// Registered name, or any part of it.
        name: String,
    },

    /// Show database location and contents.
    Status,
}

/// Player directory actions.
#[derive(Debug, Subcommand)]
pub enum PlayersAction {
    /// Register a player by name.
    Add {
        /// Canonical player name.
        name: String,
    },

    /// Link a platform identifier to a player, registering them if needed.
    Link {
        /// Identifier as it appears in the roster export.
        identifier: String,

        /// Canonical player name.
        name: String,
    },

    /// List registered players.
    List,
}
