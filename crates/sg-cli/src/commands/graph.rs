//! Graph command: reconstruct one session and report every player's figures.
//!
//! The engine runs synchronously unless a deadline is set, in which case it
//! runs on a blocking task raced against the timer. A run that misses its
//! deadline is abandoned and nothing is printed or saved.

use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Args;
use rust_decimal::Decimal;
use sg_core::{DirectoryError, NameDirectory, Standings};
use sg_db::Database;

use super::open_database;
use crate::Config;

#[derive(Debug, Args)]
pub struct GraphArgs {
    /// First export (roster or log, in either order).
    pub first: PathBuf,

    /// Second export.
    pub second: PathBuf,

    /// Print the full per-hand series as JSON.
    #[arg(long)]
    pub json: bool,

    /// Write JSON to this file, or into this directory under a derived name.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Skip the name directory and group players by in-game alias.
    #[arg(long)]
    pub no_directory: bool,

    /// Record the final nets in the database.
    #[arg(long)]
    pub save: bool,

    /// Abandon the reconstruction after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

/// Name directory used for one run.
enum Directory {
    Disabled,
    Open(Database),
    Unreachable(Unreachable),
}

impl Directory {
    fn connect(config: &Config) -> Self {
        match open_database(config) {
            Ok(db) => Self::Open(db),
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "name directory unavailable");
                Self::Unreachable(Unreachable(format!("{err:#}")))
            }
        }
    }

    fn lookup(&self) -> Option<&dyn NameDirectory> {
        match self {
            Self::Disabled => None,
            Self::Open(db) => Some(db as &dyn NameDirectory),
            Self::Unreachable(down) => Some(down as &dyn NameDirectory),
        }
    }
}

/// A directory whose database could not be opened. Every lookup fails, so
/// the engine falls back to aliases and reports why.
struct Unreachable(String);

impl NameDirectory for Unreachable {
    fn resolve(&self, _identifier: &str) -> Result<Option<String>, DirectoryError> {
        Err(DirectoryError::Unavailable(self.0.clone()))
    }
}

pub fn run<W: Write, E: Write>(
    writer: &mut W,
    diagnostics: &mut E,
    args: &GraphArgs,
    config: &Config,
) -> Result<()> {
    let first = std::fs::read(&args.first)
        .with_context(|| format!("failed to read {}", args.first.display()))?;
    let second = std::fs::read(&args.second)
        .with_context(|| format!("failed to read {}", args.second.display()))?;

    let directory = if args.no_directory {
        Directory::Disabled
    } else {
        Directory::connect(config)
    };
    let deadline = args.timeout.or(config.timeout_secs).map(Duration::from_secs);

    let (standings, directory) = run_with_deadline(
        move || {
            let standings =
                sg_core::reconstruct_with_directory(&first, &second, directory.lookup());
            (standings, directory)
        },
        deadline,
    )?;
    let standings = standings.context("failed to reconstruct session")?;

    for advisory in &standings.advisories {
        writeln!(diagnostics, "warning: {advisory}")?;
    }

    if let Some(target) = &args.output {
        let path = if target.is_dir() {
            target.join(output_name(&args.first, &args.second))
        } else {
            target.clone()
        };
        std::fs::write(&path, serde_json::to_string_pretty(&standings)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        writeln!(writer, "Wrote {}", path.display())?;
    } else if args.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&standings)?)?;
    } else {
        write_table(writer, &standings)?;
    }

    if args.save {
        let mut db = match directory {
            Directory::Open(db) => db,
            Directory::Disabled | Directory::Unreachable(_) => open_database(config)?,
        };
        let session_id = db
            .record_session(&standings)
            .context("failed to record session")?;
        writeln!(diagnostics, "Saved session {session_id}")?;
    }

    Ok(())
}

/// Runs `job`, abandoning it once `deadline` passes.
fn run_with_deadline<F, T>(job: F, deadline: Option<Duration>) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let Some(limit) = deadline else {
        return Ok(job());
    };

    let runtime = tokio::runtime::Runtime::new().context("failed to initialize tokio runtime")?;
    let outcome = runtime.block_on(async move {
        let task = tokio::task::spawn_blocking(job);
        match tokio::time::timeout(limit, task).await {
            Ok(joined) => joined.context("reconstruction task failed"),
            Err(_) => bail!("reconstruction timed out after {limit:?}"),
        }
    });
    // A timed-out task may still be running; don't wait for it.
    runtime.shutdown_background();
    outcome
}

/// Derives `nets_<a>_<b>.json` from the two input file stems.
///
/// Stems carrying a `_pg` game marker are cut down to the part starting at
/// `pg`, so a roster and a log from the same game collapse to one name.
pub fn output_name(first: &Path, second: &Path) -> String {
    let stems: BTreeSet<String> = [first, second]
        .into_iter()
        .map(|path| {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            match stem.find("_pg") {
                Some(idx) => stem[idx + 1..].to_string(),
                None => stem,
            }
        })
        .collect();
    let joined: Vec<String> = stems.into_iter().collect();
    format!("nets_{}.json", joined.join("_"))
}

/// Writes the final stack, buy-in and net of every player.
pub fn write_table<W: Write>(writer: &mut W, standings: &Standings) -> std::io::Result<()> {
    writeln!(writer, "Hands: {}", standings.hands)?;
    writeln!(writer)?;

    if standings.players.is_empty() {
        writeln!(writer, "No players in roster.")?;
        return Ok(());
    }

    writeln!(
        writer,
        "{:<20}  {:>10}  {:>10}  {:>10}",
        "PLAYER", "STACK", "BUY-IN", "NET"
    )?;
    for standing in &standings.players {
        let series = &standing.series;
        let last = |points: &[Decimal]| {
            points.last().map(ToString::to_string).unwrap_or_default()
        };
        writeln!(
            writer,
            "{:<20}  {:>10}  {:>10}  {:>10}",
            standing.label(),
            last(&series.stack),
            last(&series.buyin),
            last(&series.net),
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;

    const ROSTER: &str = "player_nickname,player_id,session_start_at,session_end_at,buy_in,buy_out,stack,net\n\
                          A,ida,,,,,,\n\
                          B,idb,,,,,,\n";
    const LOG: &str = "entry,at,order\n\
                       -- ending hand #1 --,2024-05-01T20:02:00.000Z,2\n\
                       \"\"\"A @ ida\"\" collected 5.00 from pot\",2024-05-01T20:01:00.000Z,1\n\
                       \"\"\"B @ idb\"\" bets 5.00\",2024-05-01T20:00:00.000Z,0\n";

    struct Fixture {
        temp: tempfile::TempDir,
        config: Config,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = tempfile::tempdir().unwrap();
            std::fs::write(temp.path().join("ledger_pg7Qx.csv"), ROSTER).unwrap();
            std::fs::write(temp.path().join("poker_now_log_pg7Qx.csv"), LOG).unwrap();
            let config = Config {
                database_path: temp.path().join("data/sg.db"),
                timeout_secs: None,
            };
            Self { temp, config }
        }

        fn args(&self) -> GraphArgs {
            GraphArgs {
                first: self.temp.path().join("poker_now_log_pg7Qx.csv"),
                second: self.temp.path().join("ledger_pg7Qx.csv"),
                json: false,
                output: None,
                no_directory: false,
                save: false,
                timeout: None,
            }
        }

        fn run(&self, args: &GraphArgs) -> (String, String) {
            let mut out = Vec::new();
            let mut err = Vec::new();
            run(&mut out, &mut err, args, &self.config).unwrap();
            (
                String::from_utf8(out).unwrap(),
                String::from_utf8(err).unwrap(),
            )
        }
    }

    #[test]
    fn table_marks_unregistered_players() {
        let fixture = Fixture::new();
        let args = GraphArgs {
            no_directory: true,
            ..fixture.args()
        };
        let (out, err) = fixture.run(&args);

        assert!(err.is_empty());
        assert_snapshot!(out, @r"
        Hands: 1

        PLAYER                     STACK      BUY-IN         NET
        A*                          5.00        0.00        5.00
        B*                         -5.00        0.00       -5.00
        ");
    }

    #[test]
    fn table_uses_registered_names() {
        let fixture = Fixture::new();
        let mut db = open_database(&fixture.config).unwrap();
        db.link_user("ida", "alice").unwrap();
        drop(db);

        let (out, _) = fixture.run(&fixture.args());
        assert_snapshot!(out, @r"
        Hands: 1

        PLAYER                     STACK      BUY-IN         NET
        Alice                       5.00        0.00        5.00
        B*                         -5.00        0.00       -5.00
        ");
    }

    #[test]
    fn unopenable_directory_falls_back_with_warning() {
        let mut fixture = Fixture::new();
        // A regular file where the database directory should be.
        let blocker = fixture.temp.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        fixture.config.database_path = blocker.join("sg.db");

        let (out, err) = fixture.run(&fixture.args());
        assert!(out.contains("A*"));
        assert!(err.starts_with("warning: name directory unavailable: "));
        assert!(err.trim_end().ends_with("; grouped by in-game alias"));
    }

    #[test]
    fn json_carries_full_series() {
        let fixture = Fixture::new();
        let args = GraphArgs {
            json: true,
            no_directory: true,
            ..fixture.args()
        };
        let (out, _) = fixture.run(&args);

        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["hands"], 1);
        assert_eq!(value["players"][0]["name"], "A");
        assert_eq!(value["players"][0]["registered"], false);
        assert_eq!(
            value["players"][1]["stack"],
            serde_json::json!(["0.00", "-5.00"])
        );
        assert_eq!(value["advisories"], serde_json::json!([]));
    }

    #[test]
    fn output_directory_gets_derived_name() {
        let fixture = Fixture::new();
        let out_dir = fixture.temp.path().join("out");
        std::fs::create_dir(&out_dir).unwrap();
        let args = GraphArgs {
            output: Some(out_dir.clone()),
            no_directory: true,
            ..fixture.args()
        };
        let (out, _) = fixture.run(&args);

        let written = out_dir.join("nets_pg7Qx.json");
        assert!(written.exists());
        assert_eq!(out.trim_end(), format!("Wrote {}", written.display()));
    }

    #[test]
    fn save_records_session() {
        let fixture = Fixture::new();
        let args = GraphArgs {
            save: true,
            timeout: Some(30),
            ..fixture.args()
        };
        let (_, err) = fixture.run(&args);
        assert!(err.starts_with("Saved session "));

        let db = open_database(&fixture.config).unwrap();
        let sessions = db.list_sessions().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].hands, 1);
        assert_eq!(sessions[0].nets.len(), 2);
    }

    #[test]
    fn swapped_inputs_fail() {
        let fixture = Fixture::new();
        let args = GraphArgs {
            second: fixture.args().first,
            ..fixture.args()
        };
        let mut out = Vec::new();
        let mut err = Vec::new();
        let error = run(&mut out, &mut err, &args, &fixture.config).unwrap_err();
        assert_eq!(error.to_string(), "failed to reconstruct session");
        assert!(
            format!("{error:#}").contains("expected one roster export and one action log")
        );
        assert!(out.is_empty());
    }

    #[test]
    fn deadline_abandons_slow_job() {
        let err = run_with_deadline(
            || std::thread::sleep(Duration::from_millis(500)),
            Some(Duration::from_millis(10)),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "reconstruction timed out after 10ms");

        let value = run_with_deadline(|| 7, Some(Duration::from_secs(5))).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn output_name_collapses_game_markers() {
        assert_eq!(
            output_name(
                Path::new("dl/poker_now_log_pgAbC.csv"),
                Path::new("ledger_pgAbC.csv")
            ),
            "nets_pgAbC.json"
        );
        assert_eq!(
            output_name(Path::new("b.csv"), Path::new("a.csv")),
            "nets_a_b.json"
        );
    }
}
