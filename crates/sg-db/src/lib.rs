//! Storage layer for stackgraph.
//!
//! Provides the player name directory and recorded session results using
//! `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` can be moved onto a worker thread together with a
//! reconstruction, but cannot be shared across threads without external
//! synchronization.
//!
//! # Schema
//!
//! ## Players and users
//!
//! A *player* is a real person with a canonical name. A *user* is one
//! platform identifier (one device or account) linked to a player. Several
//! users may link to the same player; the directory lookup goes
//! `users.user_id → players.name`.
//!
//! ## Amounts
//!
//! Money is stored as TEXT holding the decimal literal (e.g. `-12.40`) so
//! that values round-trip without binary float error.
//!
//! ## Timestamps
//!
//! Timestamps are stored as TEXT in RFC 3339 format with a `Z` suffix, so
//! lexicographic ordering matches chronological ordering.

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::{Decimal, RoundingStrategy};
use sg_core::{DirectoryError, NameDirectory, Standings};
use thiserror::Error;
use uuid::Uuid;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A player or identifier name was blank.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },
    /// A stored amount could not be parsed back into a decimal.
    #[error("invalid stored amount for session {session_id}: {value}")]
    InvalidAmount {
        session_id: String,
        value: String,
        #[source]
        source: rust_decimal::Error,
    },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// A registered player and the identifiers linked to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRecord {
    pub name: String,
    pub identifiers: Vec<String>,
}

/// One player's final figure in a recorded session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionNet {
    pub player: String,
    pub registered: bool,
    pub net: Decimal,
}

/// A recorded session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub id: String,
    pub recorded_at: String,
    pub hands: i64,
    pub nets: Vec<SessionNet>,
}

/// Aggregated results of one registered player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub player: String,
    pub appearances: i64,
    pub total_net: Decimal,
    /// Rounded half away from zero to cents.
    pub average_net: Decimal,
}

/// One session in a player's history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CareerPoint {
    pub player: String,
    pub recorded_at: String,
    pub net: Decimal,
    /// Running total up to and including this session.
    pub career: Decimal,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS players (
                player_id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE COLLATE NOCASE
            );

            -- users: one row per platform identifier
            CREATE TABLE IF NOT EXISTS users (
                user_id TEXT PRIMARY KEY,
                player_id INTEGER NOT NULL,
                FOREIGN KEY (player_id) REFERENCES players(player_id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_users_player ON users(player_id);

            CREATE TABLE IF NOT EXISTS sessions (
                session_id TEXT PRIMARY KEY,
                recorded_at TEXT NOT NULL,
                hands INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_recorded ON sessions(recorded_at);

            -- net: decimal literal, e.g. '-12.40'
            -- a registered name and an unlinked alias may coincide
            CREATE TABLE IF NOT EXISTS session_nets (
                session_id TEXT NOT NULL,
                player TEXT NOT NULL,
                registered INTEGER NOT NULL,
                net TEXT NOT NULL,
                PRIMARY KEY (session_id, registered, player),
                FOREIGN KEY (session_id) REFERENCES sessions(session_id) ON DELETE CASCADE
            );
            ",
        )?;
        Ok(())
    }

    /// Adds a player, ignoring duplicates. Returns whether a row was created.
    pub fn add_player(&mut self, name: &str) -> Result<bool, DbError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DbError::Empty { field: "player name" });
        }
        let inserted = self
            .conn
            .execute("INSERT OR IGNORE INTO players (name) VALUES (?)", [name])?;
        Ok(inserted > 0)
    }

    /// Links a platform identifier to a player, creating the player if needed.
    ///
    /// Relinking an identifier moves it to the new player.
    pub fn link_user(&mut self, identifier: &str, name: &str) -> Result<(), DbError> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(DbError::Empty { field: "identifier" });
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(DbError::Empty { field: "player name" });
        }
        let tx = self.conn.transaction()?;
        tx.execute("INSERT OR IGNORE INTO players (name) VALUES (?)", [name])?;
        let player_id: i64 = tx.query_row(
            "SELECT player_id FROM players WHERE name = ?",
            [name],
            |row| row.get(0),
        )?;
        tx.execute(
            "
            INSERT INTO users (user_id, player_id) VALUES (?, ?)
            ON CONFLICT(user_id) DO UPDATE SET player_id = excluded.player_id
            ",
            params![identifier, player_id],
        )?;
        tx.commit()?;
        tracing::debug!(identifier, player = name, "linked identifier");
        Ok(())
    }

    /// Lists players ordered by name, with their identifiers.
    pub fn list_players(&self) -> Result<Vec<PlayerRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT p.name, u.user_id
            FROM players p
            LEFT JOIN users u ON u.player_id = p.player_id
            ORDER BY p.name COLLATE NOCASE ASC, u.user_id ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            let name: String = row.get(0)?;
            let identifier: Option<String> = row.get(1)?;
            Ok((name, identifier))
        })?;
        let mut players: Vec<PlayerRecord> = Vec::new();
        for row in rows {
            let (name, identifier) = row?;
            if players.last().is_none_or(|last| last.name != name) {
                players.push(PlayerRecord {
                    name,
                    identifiers: Vec::new(),
                });
            }
            if let Some(player) = players.last_mut() {
                player.identifiers.extend(identifier);
            }
        }
        Ok(players)
    }

    /// Looks up the player linked to an identifier, title-cased.
    pub fn player_for(&self, identifier: &str) -> Result<Option<String>, DbError> {
        let name: Option<String> = self
            .conn
            .query_row(
                "
                SELECT p.name FROM players p
                JOIN users u ON u.player_id = p.player_id AND u.user_id = ?
                ",
                [identifier],
                |row| row.get(0),
            )
            .optional()?;
        Ok(name.as_deref().map(title_case))
    }

    /// Stores the final net of every player in a reconstruction.
    pub fn record_session(&mut self, standings: &Standings) -> Result<String, DbError> {
        let session_id = Uuid::new_v4().to_string();
        let recorded_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let hands = i64::try_from(standings.hands).unwrap_or(i64::MAX);

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO sessions (session_id, recorded_at, hands) VALUES (?, ?, ?)",
            params![session_id, recorded_at, hands],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO session_nets (session_id, player, registered, net) VALUES (?, ?, ?, ?)",
            )?;
            for standing in &standings.players {
                let net = standing.series.net.last().copied().unwrap_or_default();
                stmt.execute(params![
                    session_id,
                    standing.name,
                    standing.registered,
                    net.to_string(),
                ])?;
            }
        }
        tx.commit()?;
        tracing::info!(%session_id, players = standings.players.len(), "recorded session");
        Ok(session_id)
    }

    /// Lists recorded sessions, most recent first.
    pub fn list_sessions(&self) -> Result<Vec<SessionRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT s.session_id, s.recorded_at, s.hands, n.player, n.registered, n.net
            FROM sessions s
            LEFT JOIN session_nets n ON n.session_id = s.session_id
            ORDER BY s.recorded_at DESC, s.rowid DESC, n.registered DESC, n.player ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<bool>>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })?;

        let mut sessions: Vec<SessionRecord> = Vec::new();
        for row in rows {
            let (id, recorded_at, hands, player, registered, net) = row?;
            if sessions.last().is_none_or(|last| last.id != id) {
                sessions.push(SessionRecord {
                    id: id.clone(),
                    recorded_at,
                    hands,
                    nets: Vec::new(),
                });
            }
            let (Some(player), Some(registered), Some(net)) = (player, registered, net) else {
                continue;
            };
            let net = parse_net(&id, &net)?;
            if let Some(session) = sessions.last_mut() {
                session.nets.push(SessionNet {
                    player,
                    registered,
                    net,
                });
            }
        }
        Ok(sessions)
    }

    /// Totals and averages the recorded nets of every registered player.
    ///
    /// Sorted by total net, or by average net per appearance when
    /// `order_by_average` is set, highest first. Unlinked aliases are left
    /// out since they cannot be attributed to anyone across sessions.
    pub fn leaderboard(&self, order_by_average: bool) -> Result<Vec<LeaderboardEntry>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT session_id, player, net FROM session_nets WHERE registered = 1")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut totals: BTreeMap<String, (i64, Decimal)> = BTreeMap::new();
        for row in rows {
            let (session_id, player, net) = row?;
            let net = parse_net(&session_id, &net)?;
            let entry = totals.entry(player).or_insert((0, Decimal::ZERO));
            entry.0 += 1;
            entry.1 += net;
        }

        let mut board: Vec<LeaderboardEntry> = totals
            .into_iter()
            .map(|(player, (appearances, total_net))| {
                let mut average_net = (total_net / Decimal::from(appearances))
                    .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
                average_net.rescale(2);
                LeaderboardEntry {
                    player,
                    appearances,
                    total_net,
                    average_net,
                }
            })
            .collect();
        // Stable sort keeps name order among ties.
        if order_by_average {
            board.sort_by(|a, b| b.average_net.cmp(&a.average_net));
        } else {
            board.sort_by(|a, b| b.total_net.cmp(&a.total_net));
        }
        Ok(board)
    }

    /// Session-by-session nets of registered players whose name contains
    /// `name` (ASCII case-insensitive), oldest first, with a running total.
    pub fn career(&self, name: &str) -> Result<Vec<CareerPoint>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT n.session_id, n.player, s.recorded_at, n.net
            FROM session_nets n
            JOIN sessions s ON s.session_id = n.session_id
            WHERE n.registered = 1 AND n.player LIKE '%' || ? || '%'
            ORDER BY s.recorded_at ASC, s.rowid ASC, n.player ASC
            ",
        )?;
        let rows = stmt.query_map([name.trim()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut career = Decimal::ZERO;
        let mut points = Vec::new();
        for row in rows {
            let (session_id, player, recorded_at, net) = row?;
            let net = parse_net(&session_id, &net)?;
            career += net;
            points.push(CareerPoint {
                player,
                recorded_at,
                net,
                career,
            });
        }
        Ok(points)
    }

    /// Counts players, linked identifiers and recorded sessions.
    pub fn counts(&self) -> Result<(i64, i64, i64), DbError> {
        let players = self
            .conn
            .query_row("SELECT COUNT(*) FROM players", [], |row| row.get(0))?;
        let users = self
            .conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        let sessions = self
            .conn
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
        Ok((players, users, sessions))
    }
}

fn parse_net(session_id: &str, value: &str) -> Result<Decimal, DbError> {
    Decimal::from_str(value).map_err(|source| DbError::InvalidAmount {
        session_id: session_id.to_string(),
        value: value.to_string(),
        source,
    })
}

impl NameDirectory for Database {
    fn resolve(&self, identifier: &str) -> Result<Option<String>, DirectoryError> {
        self.player_for(identifier)
            .map_err(|err| DirectoryError::Unavailable(err.to_string()))
    }
}

/// Capitalizes the first letter of every word and lowercases the rest.
///
/// A word starts after any non-alphabetic character, so `o'neil` becomes
/// `O'Neil`.
pub fn title_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut at_word_start = true;
    for ch in name.chars() {
        if at_word_start {
            out.extend(ch.to_uppercase());
        } else {
            out.extend(ch.to_lowercase());
        }
        at_word_start = !ch.is_alphabetic();
    }
    out
}
