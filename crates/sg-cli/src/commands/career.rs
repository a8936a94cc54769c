//! Career command: one player's nets session by session.

use std::io::Write;

use anyhow::Result;
use sg_db::Database;

pub fn run<W: Write>(writer: &mut W, db: &Database, name: &str) -> Result<()> {
    let points = db.career(name)?;
    if points.is_empty() {
        writeln!(writer, "No recorded sessions for players matching '{}'.", name.trim())?;
        return Ok(());
    }

    writeln!(
        writer,
        "{:<10}  {:<20}  {:>10}  {:>10}",
        "DATE", "PLAYER", "NET", "CAREER"
    )?;
    for point in points {
        let date = point.recorded_at.get(..10).unwrap_or(&point.recorded_at);
        writeln!(
            writer,
            "{:<10}  {:<20}  {:>10}  {:>10}",
            date,
            point.player,
            point.net.to_string(),
            point.career.to_string(),
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use sg_core::{Series, Standing, Standings};

    fn record(db: &mut Database, name: &str, net: Decimal) {
        db.record_session(&Standings {
            hands: 1,
            players: vec![Standing {
                name: name.to_string(),
                registered: true,
                identifiers: vec![name.to_lowercase()],
                series: Series {
                    stack: vec![dec!(0), net],
                    buyin: vec![dec!(0), dec!(0)],
                    net: vec![dec!(0), net],
                },
            }],
            advisories: Vec::new(),
        })
        .unwrap();
    }

    #[test]
    fn prints_running_total() {
        let mut db = Database::open_in_memory().unwrap();
        record(&mut db, "Dana", dec!(10.00));
        record(&mut db, "Dana", dec!(-4.00));
        record(&mut db, "Eve", dec!(3.00));
        record(&mut db, "Dana", dec!(10.00));

        let mut output = Vec::new();
        run(&mut output, &db, "dana").unwrap();
        let output = String::from_utf8(output).unwrap();
        let date = db.career("dana").unwrap()[0].recorded_at[..10].to_string();
        let output = output.replace(&date, "[DATE]");
        assert_snapshot!(output, @r"
        DATE        PLAYER                       NET      CAREER
        [DATE]  Dana                       10.00       10.00
        [DATE]  Dana                       -4.00        6.00
        [DATE]  Dana                       10.00       16.00
        ");
    }

    #[test]
    fn unknown_player_has_no_history() {
        let db = Database::open_in_memory().unwrap();
        let mut output = Vec::new();
        run(&mut output, &db, " Zed ").unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "No recorded sessions for players matching 'Zed'.\n"
        );
    }
}
