use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use sg_cli::commands::{self, career, graph, leaderboard, players, sessions, status};
use sg_cli::{Cli, Commands, Config, PlayersAction};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Logs go to stderr so JSON on stdout stays clean.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let mut stdout = io::stdout().lock();
    match &cli.command {
        Some(Commands::Graph(args)) => {
            let mut stderr = io::stderr().lock();
            graph::run(&mut stdout, &mut stderr, args, &config)?;
        }
        Some(Commands::Players(action)) => {
            let mut db = commands::open_database(&config)?;
            match action {
                PlayersAction::Add { name } => players::add(&mut stdout, &mut db, name)?,
                PlayersAction::Link { identifier, name } => {
                    players::link(&mut stdout, &mut db, identifier, name)?;
                }
                PlayersAction::List => players::list(&mut stdout, &db)?,
            }
        }
        Some(Commands::Sessions) => {
            let db = commands::open_database(&config)?;
            sessions::run(&mut stdout, &db)?;
        }
        Some(Commands::Leaderboard { avg }) => {
            let db = commands::open_database(&config)?;
            leaderboard::run(&mut stdout, &db, *avg)?;
        }
        Some(Commands::Career { name }) => {
            let db = commands::open_database(&config)?;
            career::run(&mut stdout, &db, name)?;
        }
        Some(Commands::Status) => {
            status::run(&mut stdout, &config)?;
        }
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
