//! Players command for maintaining the name directory.

use std::io::Write;

use anyhow::Result;
use sg_db::Database;

pub fn add<W: Write>(writer: &mut W, db: &mut Database, name: &str) -> Result<()> {
    if db.add_player(name)? {
        writeln!(writer, "Added player {}", name.trim())?;
    } else {
        writeln!(writer, "Player {} already registered", name.trim())?;
    }
    Ok(())
}

pub fn link<W: Write>(writer: &mut W, db: &mut Database, identifier: &str, name: &str) -> Result<()> {
    db.link_user(identifier, name)?;
    writeln!(writer, "Linked {} to {}", identifier.trim(), name.trim())?;
    Ok(())
}

pub fn list<W: Write>(writer: &mut W, db: &Database) -> Result<()> {
    let players = db.list_players()?;
    if players.is_empty() {
        writeln!(writer, "No players registered.")?;
        return Ok(());
    }
    for player in players {
        if player.identifiers.is_empty() {
            writeln!(writer, "{}: (no identifiers)", player.name)?;
        } else {
            writeln!(writer, "{}: {}", player.name, player.identifiers.join(", "))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;

    #[test]
    fn players_commands_round_out_directory() {
        let mut db = Database::open_in_memory().unwrap();
        let mut output = Vec::new();

        list(&mut output, &db).unwrap();
        add(&mut output, &mut db, "Eve").unwrap();
        add(&mut output, &mut db, "eve").unwrap();
        link(&mut output, &mut db, "ph-77", "Dana").unwrap();
        link(&mut output, &mut db, "lt-12", "Dana").unwrap();
        list(&mut output, &db).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert_snapshot!(output, @r"
        No players registered.
        Added player Eve
        Player eve already registered
        Linked ph-77 to Dana
        Linked lt-12 to Dana
        Dana: lt-12, ph-77
        Eve: (no identifiers)
        ");
    }

    #[test]
    fn blank_name_is_rejected() {
        let mut db = Database::open_in_memory().unwrap();
        let mut output = Vec::new();
        let err = link(&mut output, &mut db, "ph-77", " ").unwrap_err();
        assert_eq!(err.to_string(), "player name cannot be empty");
    }
}
