//! Status command for showing where data lives and how much there is.

use std::io::Write;

use anyhow::Result;

use super::open_database;
use crate::Config;

pub fn run<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let db = open_database(config)?;
    let (players, identifiers, sessions) = db.counts()?;

    writeln!(writer, "Stackgraph status")?;
    writeln!(writer, "Database: {}", config.database_path.display())?;
    writeln!(writer, "Players: {players}")?;
    writeln!(writer, "Linked identifiers: {identifiers}")?;
    writeln!(writer, "Recorded sessions: {sessions}")?;
    if let Some(secs) = config.timeout_secs {
        writeln!(writer, "Graph timeout: {secs}s")?;
    }

    Ok(())
}
