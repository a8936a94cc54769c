//! Sessions command for listing recorded results.

use std::io::Write;

use anyhow::Result;
use sg_db::Database;

pub fn run<W: Write>(writer: &mut W, db: &Database) -> Result<()> {
    let sessions = db.list_sessions()?;
    if sessions.is_empty() {
        writeln!(writer, "No sessions recorded.")?;
        writeln!(writer)?;
        writeln!(writer, "Hint: Run 'sg graph <LOG> <LEDGER> --save' to record one.")?;
        return Ok(());
    }

    for session in sessions {
        let id_short: String = session.id.chars().take(8).collect();
        writeln!(
            writer,
            "{id_short}  {}  {} hands",
            session.recorded_at, session.hands
        )?;
        for net in session.nets {
            let marker = if net.registered { "" } else { "*" };
            let label = format!("{}{marker}", net.player);
            writeln!(writer, "  {label:<20}  {:>10}", net.net.to_string())?;
        }
    }
    Ok(())
}
