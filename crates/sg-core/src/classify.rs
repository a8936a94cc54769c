//! Line classification and the chronological scan.
//!
//! Each log line is handled by exactly one rule: the first entry of
//! [`RULES`] whose predicate accepts it. The order is load-bearing. A
//! stacks snapshot must be recognized before any per-player rule sees the
//! line, and the catch-all play rule must come last.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::error::EngineError;
use crate::input::Roster;
use crate::ledger::{Ledger, PlayerBook};
use crate::money::{self, parse_amount};

/// The kind of event a log line reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// `-- starting hand #N ...`
    HandStart,
    /// `Player stacks: #1 "Ann @ a1" (20.00) | ...`
    StacksSnapshot,
    /// `Flop:`, `Turn:`, `River:` or `-- ending hand #N --`
    StreetEnd,
    /// The host approved a buy-in.
    BuyInApproved,
    /// The host edited a player's stack.
    StackUpdated,
    /// A player left the table with chips.
    PlayerQuit,
    /// A player posted a missing small blind.
    MissingSmallBlind,
    /// Anything else: bets, calls, returns, collections, chatter.
    Play,
}

struct Rule {
    kind: LineKind,
    matches: fn(&str) -> bool,
    apply: fn(&mut Scan, &Line<'_>) -> Result<(), EngineError>,
}

/// Classification rules in priority order, first match wins.
static RULES: &[Rule] = &[
    Rule {
        kind: LineKind::HandStart,
        matches: is_hand_start,
        apply: Scan::start_hand,
    },
    Rule {
        kind: LineKind::StacksSnapshot,
        matches: is_stacks_snapshot,
        apply: Scan::resolve_boundary,
    },
    Rule {
        kind: LineKind::StreetEnd,
        matches: is_street_end,
        apply: Scan::close_street,
    },
    Rule {
        kind: LineKind::BuyInApproved,
        matches: is_buy_in_approved,
        apply: Scan::approve_buy_in,
    },
    Rule {
        kind: LineKind::StackUpdated,
        matches: is_stack_updated,
        apply: Scan::update_stack,
    },
    Rule {
        kind: LineKind::PlayerQuit,
        matches: is_player_quit,
        apply: Scan::quit,
    },
    Rule {
        kind: LineKind::MissingSmallBlind,
        matches: is_missing_small_blind,
        apply: Scan::post_missing_blind,
    },
    Rule {
        kind: LineKind::Play,
        matches: is_anything,
        apply: Scan::play,
    },
];

fn is_hand_start(line: &str) -> bool {
    line.starts_with("-- starting")
}

fn is_stacks_snapshot(line: &str) -> bool {
    line.starts_with("Player stacks:")
}

fn is_street_end(line: &str) -> bool {
    ["-- ending", "Flop:", "Turn:", "River:"]
        .iter()
        .any(|prefix| line.starts_with(prefix))
}

fn is_buy_in_approved(line: &str) -> bool {
    line.contains("approved")
}

fn is_stack_updated(line: &str) -> bool {
    line.contains("updated")
}

fn is_player_quit(line: &str) -> bool {
    line.contains("quits the game")
}

fn is_missing_small_blind(line: &str) -> bool {
    line.contains("missing small blind")
}

const fn is_anything(_line: &str) -> bool {
    true
}

/// Returns the kind of the first rule accepting `line`.
pub fn classify(line: &str) -> LineKind {
    rule_for(line).kind
}

fn rule_for(line: &str) -> &'static Rule {
    RULES
        .iter()
        .find(|rule| (rule.matches)(line))
        .unwrap_or(&RULES[RULES.len() - 1])
}

/// A chronological log line with its 1-based position.
struct Line<'a> {
    ordinal: usize,
    text: &'a str,
}

impl Line<'_> {
    fn malformed(&self) -> EngineError {
        EngineError::MalformedAmount {
            ordinal: self.ordinal,
            line: self.text.to_string(),
        }
    }

    fn first_amount(&self) -> Result<Decimal, EngineError> {
        money::first_amount(self.text).ok_or_else(|| self.malformed())
    }

    /// Whether the line mentions `identifier` anywhere.
    ///
    /// This is a plain substring test. An identifier that is a substring of
    /// another identifier or of engine vocabulary will match spuriously.
    fn mentions(&self, identifier: &str) -> bool {
        self.text.contains(identifier)
    }

    /// Amount the snapshot states for `identifier`, written as `id" (12.34)`.
    fn stated_stack(&self, identifier: &str) -> Option<Decimal> {
        let needle = format!("{identifier}\" (");
        self.text.match_indices(&needle).find_map(|(at, _)| {
            let rest = &self.text[at + needle.len()..];
            let end = rest.find(')')?;
            parse_amount(&rest[..end])
        })
    }

    /// Text after the first `@ ` of a line opening with a quoted player,
    /// i.e. `a1" collected 5.00 from pot` for `"Ann @ a1" collected ...`.
    fn subject_tail(&self) -> Option<&str> {
        if !self.text.starts_with('"') {
            return None;
        }
        self.text.split_once("@ ").map(|(_, tail)| tail)
    }
}

/// Scan state, owned by a single reconstruction.
struct Scan {
    books: BTreeMap<String, PlayerBook>,
    hand_counter: usize,
}

impl Scan {
    fn new(roster: &Roster) -> Self {
        let books = roster
            .iter()
            .map(|player| (player.identifier.clone(), PlayerBook::new(player.clone())))
            .collect();
        Self {
            books,
            hand_counter: 0,
        }
    }

    fn mentioned<'s>(&'s mut self, line: &'s Line<'_>) -> impl Iterator<Item = &'s mut PlayerBook> {
        self.books
            .iter_mut()
            .filter(|(identifier, _)| line.mentions(identifier))
            .map(|(_, book)| book)
    }

    fn start_hand(&mut self, _line: &Line<'_>) -> Result<(), EngineError> {
        self.hand_counter += 1;
        Ok(())
    }

    /// A stacks snapshot closes the previous hand for everyone.
    ///
    /// A snapshot seen before any hand-start marker still lands in slot 1,
    /// the baseline is never overwritten.
    fn resolve_boundary(&mut self, line: &Line<'_>) -> Result<(), EngineError> {
        let hand = self.hand_counter.max(1);
        for (identifier, book) in &mut self.books {
            let stated = if line.mentions(identifier) {
                Some(
                    line.stated_stack(identifier)
                        .ok_or_else(|| line.malformed())?,
                )
            } else {
                None
            };
            book.settle(hand, stated);
        }
        Ok(())
    }

    fn close_street(&mut self, _line: &Line<'_>) -> Result<(), EngineError> {
        for book in self.books.values_mut() {
            book.accumulator.close_street();
        }
        Ok(())
    }

    /// Amounts are only read for roster players the line names. An
    /// approval, update or quit for someone outside the roster is skipped
    /// even when it carries no amount.
    fn approve_buy_in(&mut self, line: &Line<'_>) -> Result<(), EngineError> {
        for book in self.mentioned(line) {
            let amount = line.first_amount()?;
            book.accumulator.add_external(amount);
        }
        Ok(())
    }

    /// `... stack from 20.00 to 35.00.` adds the difference as external money.
    fn update_stack(&mut self, line: &Line<'_>) -> Result<(), EngineError> {
        for book in self.mentioned(line) {
            let found: Vec<Decimal> = money::amounts(line.text).collect();
            let [old, .., new] = found.as_slice() else {
                return Err(line.malformed());
            };
            book.accumulator.add_external(*new - *old);
        }
        Ok(())
    }

    fn quit(&mut self, line: &Line<'_>) -> Result<(), EngineError> {
        for book in self.mentioned(line) {
            let amount = line.first_amount()?;
            book.accumulator.add_external(-amount);
        }
        Ok(())
    }

    fn post_missing_blind(&mut self, line: &Line<'_>) -> Result<(), EngineError> {
        for book in self.mentioned(line) {
            let amount = line.first_amount()?;
            book.accumulator.pot -= amount;
        }
        Ok(())
    }

    fn play(&mut self, line: &Line<'_>) -> Result<(), EngineError> {
        let uncalled = line.text.split_whitespace().next() == Some("Uncalled");
        for (identifier, book) in &mut self.books {
            if !line.mentions(identifier) {
                continue;
            }
            let acc = &mut book.accumulator;
            if uncalled {
                // Uncalled bet of 2.00 returned to "Ann @ a1"
                let amount = line
                    .text
                    .split_whitespace()
                    .nth(3)
                    .and_then(parse_amount)
                    .ok_or_else(|| line.malformed())?;
                acc.pot += amount;
                continue;
            }
            let Some(tail) = line
                .subject_tail()
                .filter(|tail| tail.starts_with(identifier.as_str()))
            else {
                continue;
            };
            let mut words = tail.split_whitespace().skip(1);
            if words.next() == Some("collected") {
                let amount = words
                    .next()
                    .and_then(parse_amount)
                    .ok_or_else(|| line.malformed())?;
                acc.pot += amount;
            } else if !line.text.contains("joined") {
                if let Some(amount) = money::first_amount(line.text) {
                    acc.street = -amount;
                }
            }
        }
        Ok(())
    }
}

/// Runs every chronological line through the rules and closes the series.
pub fn scan(roster: &Roster, lines: &[String]) -> Result<Ledger, EngineError> {
    let mut state = Scan::new(roster);
    for (idx, text) in lines.iter().enumerate() {
        let line = Line {
            ordinal: idx + 1,
            text,
        };
        let rule = rule_for(text);
        tracing::trace!(ordinal = line.ordinal, kind = ?rule.kind, "classified line");
        (rule.apply)(&mut state, &line)?;
    }

    tracing::debug!(
        lines = lines.len(),
        players = roster.len(),
        hands = state.hand_counter,
        "scanned action log"
    );
    Ok(Ledger::close(state.books, state.hand_counter, lines.is_empty()))
}
