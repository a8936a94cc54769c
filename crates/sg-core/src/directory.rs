//! Grouping per-identifier series under real player names.
//!
//! One person may play from several devices, each with its own platform
//! identifier. A [`NameDirectory`] maps identifiers to canonical names and
//! [`resolve_aliases`] sums the series of every identifier that maps to the
//! same name.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{DirectoryError, EngineError};
use crate::ledger::{Ledger, Series};

/// Lookup from platform identifier to registered player name.
pub trait NameDirectory {
    /// Returns the canonical name linked to `identifier`, if any.
    fn resolve(&self, identifier: &str) -> Result<Option<String>, DirectoryError>;
}

impl NameDirectory for BTreeMap<String, String> {
    fn resolve(&self, identifier: &str) -> Result<Option<String>, DirectoryError> {
        Ok(self.get(identifier).cloned())
    }
}

/// Non-fatal conditions reported alongside valid output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Advisory {
    /// The directory failed; every series is grouped by roster alias.
    DirectoryUnavailable { reason: String },
}

impl std::fmt::Display for Advisory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DirectoryUnavailable { reason } => {
                write!(f, "{reason}; grouped by in-game alias")
            }
        }
    }
}

/// Series for one real or presumed player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Standing {
    /// Canonical name when registered, roster alias otherwise.
    pub name: String,
    pub registered: bool,
    /// Platform identifiers folded into this standing.
    pub identifiers: Vec<String>,
    #[serde(flatten)]
    pub series: Series,
}

impl Standing {
    /// Display name, unregistered players marked with `*`.
    pub fn label(&self) -> String {
        if self.registered {
            self.name.clone()
        } else {
            format!("{}*", self.name)
        }
    }
}

/// Final per-player output of a reconstruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Standings {
    pub hands: usize,
    /// Registered players first, each group ordered by name.
    pub players: Vec<Standing>,
    pub advisories: Vec<Advisory>,
}

impl Standings {
    /// Keeps every identifier under its roster alias.
    pub fn unresolved(ledger: Ledger) -> Self {
        let hands = ledger.hands;
        let mut grouped = Grouped::default();
        for (identifier, finished) in ledger.players {
            grouped.add_unregistered(identifier, finished.player.alias, finished.series);
        }
        Self {
            hands,
            players: grouped.into_players(),
            advisories: Vec::new(),
        }
    }

    pub fn get(&self, label: &str) -> Option<&Standing> {
        self.players.iter().find(|standing| standing.label() == label)
    }
}

/// Groups a ledger's series by canonical name.
///
/// Series resolved to the same name are added element-wise. If any lookup
/// fails the directory is treated as down for the whole run: everything is
/// grouped by roster alias and an [`Advisory::DirectoryUnavailable`] is
/// attached.
pub fn resolve_aliases(
    ledger: Ledger,
    directory: &dyn NameDirectory,
) -> Result<Standings, EngineError> {
    let lookups: Result<BTreeMap<String, Option<String>>, DirectoryError> = ledger
        .players
        .keys()
        .map(|identifier| {
            directory
                .resolve(identifier)
                .map(|name| (identifier.clone(), name))
        })
        .collect();
    let mut names = match lookups {
        Ok(names) => names,
        Err(err) => {
            tracing::warn!(error = %err, "name directory lookup failed");
            let mut standings = Standings::unresolved(ledger);
            standings.advisories.push(Advisory::DirectoryUnavailable {
                reason: err.to_string(),
            });
            return Ok(standings);
        }
    };

    let hands = ledger.hands;
    let mut grouped = Grouped::default();
    for (identifier, finished) in ledger.players {
        match names.remove(&identifier).flatten() {
            Some(name) => grouped.add_registered(identifier, name, finished.series)?,
            None => grouped.add_unregistered(identifier, finished.player.alias, finished.series),
        }
    }
    tracing::debug!(
        registered = grouped.registered.len(),
        unregistered = grouped.unregistered.len(),
        "resolved player names"
    );

    Ok(Standings {
        hands,
        players: grouped.into_players(),
        advisories: Vec::new(),
    })
}

#[derive(Default)]
struct Grouped {
    registered: BTreeMap<String, Standing>,
    unregistered: BTreeMap<String, Standing>,
}

impl Grouped {
    fn add_registered(
        &mut self,
        identifier: String,
        name: String,
        series: Series,
    ) -> Result<(), EngineError> {
        if let Some(existing) = self.registered.get_mut(&name) {
            existing
                .series
                .absorb(&series)
                .map_err(|(left, right)| EngineError::SeriesLengthMismatch {
                    name: name.clone(),
                    left: left.saturating_sub(1),
                    right: right.saturating_sub(1),
                })?;
            existing.identifiers.push(identifier);
            return Ok(());
        }
        self.registered.insert(
            name.clone(),
            Standing {
                name,
                registered: true,
                identifiers: vec![identifier],
                series,
            },
        );
        Ok(())
    }

    /// Unregistered identifiers are never merged: two strangers sharing an
    /// alias keep separate series, the later one suffixed with its identifier.
    fn add_unregistered(&mut self, identifier: String, alias: String, series: Series) {
        let name = if self.unregistered.contains_key(&alias) {
            format!("{alias} ({identifier})")
        } else {
            alias
        };
        self.unregistered.insert(
            name.clone(),
            Standing {
                name,
                registered: false,
                identifiers: vec![identifier],
                series,
            },
        );
    }

    fn into_players(self) -> Vec<Standing> {
        self.registered
            .into_values()
            .chain(self.unregistered.into_values())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::PlayerRecord;
    use crate::ledger::PlayerSeries;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn series(points: &[(Decimal, Decimal)]) -> Series {
        Series {
            stack: points.iter().map(|(s, _)| *s).collect(),
            buyin: points.iter().map(|(_, b)| *b).collect(),
            net: points.iter().map(|(s, b)| *s - *b).collect(),
        }
    }

    fn ledger(entries: &[(&str, &str, Series)]) -> Ledger {
        let players = entries
            .iter()
            .map(|(id, alias, series)| {
                (
                    (*id).to_string(),
                    PlayerSeries {
                        player: PlayerRecord {
                            identifier: (*id).to_string(),
                            alias: (*alias).to_string(),
                        },
                        series: series.clone(),
                    },
                )
            })
            .collect();
        Ledger {
            hands: entries.first().map_or(0, |(_, _, s)| s.len() - 1),
            players,
        }
    }

    fn directory() -> BTreeMap<String, String> {
        [("phone", "Dana"), ("laptop", "Dana")]
            .into_iter()
            .map(|(id, name)| (id.to_string(), name.to_string()))
            .collect()
    }

    struct Down;

    impl NameDirectory for Down {
        fn resolve(&self, _identifier: &str) -> Result<Option<String>, DirectoryError> {
            Err(DirectoryError::Unavailable("connection refused".to_string()))
        }
    }

    #[test]
    fn merges_identifiers_of_one_person() {
        let ledger = ledger(&[
            ("laptop", "dana", series(&[(dec!(0), dec!(0)), (dec!(30), dec!(20))])),
            ("phone", "d", series(&[(dec!(0), dec!(0)), (dec!(5), dec!(10))])),
            ("x9", "Eve", series(&[(dec!(0), dec!(0)), (dec!(-5), dec!(0))])),
        ]);
        let standings = resolve_aliases(ledger, &directory()).unwrap();

        assert!(standings.advisories.is_empty());
        assert_eq!(standings.players.len(), 2);
        let dana = standings.get("Dana").unwrap();
        assert_eq!(dana.identifiers, ["laptop", "phone"]);
        assert_eq!(dana.series.stack, [dec!(0), dec!(35)]);
        assert_eq!(dana.series.buyin, [dec!(0), dec!(30)]);
        assert_eq!(dana.series.net, [dec!(0), dec!(5)]);

        let eve = standings.get("Eve*").unwrap();
        assert!(!eve.registered);
        assert_eq!(eve.series.net, [dec!(0), dec!(-5)]);
    }

    #[test]
    fn outage_falls_back_to_aliases() {
        let ledger = ledger(&[
            ("laptop", "dana", series(&[(dec!(0), dec!(0))])),
            ("phone", "d", series(&[(dec!(0), dec!(0))])),
        ]);
        let standings = resolve_aliases(ledger, &Down).unwrap();

        let labels: Vec<_> = standings.players.iter().map(Standing::label).collect();
        assert_eq!(labels, ["d*", "dana*"]);
        assert_eq!(
            standings.advisories,
            [Advisory::DirectoryUnavailable {
                reason: "name directory unavailable: connection refused".to_string()
            }]
        );
    }

    #[test]
    fn shared_alias_strangers_stay_apart() {
        let ledger = ledger(&[
            ("u1", "Sam", series(&[(dec!(0), dec!(0)), (dec!(1), dec!(0))])),
            ("u2", "Sam", series(&[(dec!(0), dec!(0)), (dec!(-1), dec!(0))])),
        ]);
        let standings = Standings::unresolved(ledger);
        let labels: Vec<_> = standings.players.iter().map(Standing::label).collect();
        assert_eq!(labels, ["Sam*", "Sam (u2)*"]);
    }

    #[test]
    fn merge_rejects_unequal_lengths() {
        let ledger = ledger(&[
            ("laptop", "dana", series(&[(dec!(0), dec!(0)), (dec!(1), dec!(0))])),
            ("phone", "d", series(&[(dec!(0), dec!(0))])),
        ]);
        let err = resolve_aliases(ledger, &directory()).unwrap_err();
        assert!(matches!(
            err,
            EngineError::SeriesLengthMismatch { left: 1, right: 0, .. }
        ));
    }
}
