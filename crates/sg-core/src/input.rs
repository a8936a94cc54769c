//! Export ingestion: format sniffing, roster loading and log normalization.
//!
//! Both exports are delimited text whose header row identifies the kind of
//! export by its first field. The action log is exported newest-first; the
//! engine only ever sees it after [`chronological`] has put it oldest-first.

use std::collections::BTreeMap;

use csv::{ReaderBuilder, StringRecord};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// First header field of the action log export.
pub const LOG_MARKER: &str = "entry";

/// First header field of the roster (ledger) export.
pub const ROSTER_MARKER: &str = "player_nickname";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Which export a blob holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Roster,
    Log,
}

impl ExportKind {
    /// Classifies an export from the first field of its header row.
    pub fn from_marker(field: &str) -> Option<Self> {
        match field.trim() {
            ROSTER_MARKER => Some(Self::Roster),
            LOG_MARKER => Some(Self::Log),
            _ => None,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Roster => "roster",
            Self::Log => "log",
        }
    }
}

/// Data rows of both exports, header rows stripped.
#[derive(Debug, Clone)]
pub struct Exports {
    pub roster: Vec<StringRecord>,
    pub log: Vec<StringRecord>,
}

/// Assigns two blobs to roster and log, in either order.
///
/// Exactly one blob must carry each marker. Anything else is rejected rather
/// than guessed at.
pub fn sniff(first: &[u8], second: &[u8]) -> Result<Exports, EngineError> {
    let first = read_rows(first)?;
    let second = read_rows(second)?;

    let kinds = (header_kind(&first), header_kind(&second));
    let (roster, log) = match kinds {
        (Some(ExportKind::Roster), Some(ExportKind::Log)) => (first, second),
        (Some(ExportKind::Log), Some(ExportKind::Roster)) => (second, first),
        (a, b) => {
            return Err(EngineError::UnrecognizedInputPair {
                detail: format!("got {} and {}", describe(a), describe(b)),
            });
        }
    };

    Ok(Exports {
        roster: roster.into_iter().skip(1).collect(),
        log: log.into_iter().skip(1).collect(),
    })
}

fn describe(kind: Option<ExportKind>) -> &'static str {
    kind.map_or("unrecognized", ExportKind::as_str)
}

fn header_kind(rows: &[StringRecord]) -> Option<ExportKind> {
    rows.first()
        .and_then(|header| header.get(0))
        .and_then(ExportKind::from_marker)
}

fn read_rows(bytes: &[u8]) -> Result<Vec<StringRecord>, EngineError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);
    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?);
    }
    Ok(rows)
}

/// A player as listed in the roster export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    /// Opaque platform id, unique per device/account.
    pub identifier: String,
    /// In-game display name.
    pub alias: String,
}

/// Registry of roster players keyed by identifier.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    players: BTreeMap<String, PlayerRecord>,
}

impl Roster {
    /// Builds the registry from roster data rows `(alias, identifier, ...)`.
    ///
    /// A repeated identifier keeps the last alias seen.
    pub fn load(rows: &[StringRecord]) -> Self {
        let mut players = BTreeMap::new();
        for (idx, row) in rows.iter().enumerate() {
            let (Some(alias), Some(identifier)) = (row.get(0), row.get(1)) else {
                tracing::warn!(row = idx + 2, "skipping roster row without an identifier");
                continue;
            };
            let identifier = identifier.trim();
            if identifier.is_empty() {
                tracing::warn!(row = idx + 2, "skipping roster row with empty identifier");
                continue;
            }
            players.insert(
                identifier.to_string(),
                PlayerRecord {
                    identifier: identifier.to_string(),
                    alias: alias.trim().to_string(),
                },
            );
        }
        Self { players }
    }

    pub fn get(&self, identifier: &str) -> Option<&PlayerRecord> {
        self.players.get(identifier)
    }

    /// Players in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &PlayerRecord> {
        self.players.values()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

/// Puts newest-first log rows into chronological order.
///
/// Only the free-text first field is kept; the optional timestamp column is
/// not needed for reconstruction.
pub fn chronological(rows: &[StringRecord]) -> Vec<String> {
    rows.iter()
        .rev()
        .map(|row| row.get(0).unwrap_or_default().to_string())
        .collect()
}
