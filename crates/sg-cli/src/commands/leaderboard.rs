//! Leaderboard command: totals across every recorded session.

use std::io::Write;

use anyhow::Result;
use sg_db::Database;

pub fn run<W: Write>(writer: &mut W, db: &Database, by_average: bool) -> Result<()> {
    let board = db.leaderboard(by_average)?;
    if board.is_empty() {
        writeln!(writer, "No results for registered players.")?;
        writeln!(writer)?;
        writeln!(
            writer,
            "Hint: Link identifiers with 'sg players link', then record with 'sg graph --save'."
        )?;
        return Ok(());
    }

    writeln!(
        writer,
        "{:<4}  {:<20}  {:>5}  {:>10}  {:>10}",
        "#", "PLAYER", "GAMES", "TOTAL", "AVERAGE"
    )?;
    for (rank, entry) in board.iter().enumerate() {
        writeln!(
            writer,
            "{:<4}  {:<20}  {:>5}  {:>10}  {:>10}",
            rank + 1,
            entry.player,
            entry.appearances,
            entry.total_net.to_string(),
            entry.average_net.to_string(),
        )?;
    }
    Ok(())
}
