//! Per-player accumulators, series and hand boundary folding.
//!
//! # Folding rules
//!
//! At every boundary each player's pending [`Accumulator`] is folded into
//! slot `i` of its [`Series`]:
//!
//! - A player absent from the stacks snapshot rolls forward:
//!   `stack[i] = stack[i-1] + pot` (plus the external delta when flagged) and
//!   `buyin[i] = buyin[i-1] + external`.
//! - A player named in the snapshot takes the stated amount as `stack[i]`
//!   outright. The snapshot is ground truth and beats accumulated arithmetic.
//!
//! `net` is derived once, after the closing fold.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::input::PlayerRecord;
use crate::money::ZERO;

/// Uncommitted money movements for one player within the current hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accumulator {
    /// Won or lost through play, not yet committed to the series.
    pub pot: Decimal,
    /// Pending buy-in (positive) or cash-out (negative).
    pub external: Decimal,
    /// Whether `external` applies at the next boundary.
    pub external_pending: bool,
    /// Contribution on the current betting street.
    ///
    /// Kept apart from `pot` so an uncalled-bet return later in the street
    /// can credit `pot` while the original contribution is still open.
    pub street: Decimal,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self {
            pot: ZERO,
            external: ZERO,
            external_pending: false,
            street: ZERO,
        }
    }
}

impl Accumulator {
    /// Commits the open street contribution to the pot delta.
    pub fn close_street(&mut self) {
        self.pot += self.street;
        self.street = ZERO;
    }

    /// Records money entering (positive) or leaving (negative) the game.
    pub fn add_external(&mut self, amount: Decimal) {
        self.external += amount;
        self.external_pending = true;
    }
}

/// Append-only per-hand figures for one player, index 0 is the pre-game
/// baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Series {
    pub stack: Vec<Decimal>,
    pub buyin: Vec<Decimal>,
    pub net: Vec<Decimal>,
}

impl Default for Series {
    fn default() -> Self {
        Self {
            stack: vec![ZERO],
            buyin: vec![ZERO],
            net: vec![ZERO],
        }
    }
}

impl Series {
    /// Number of points, baseline included.
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Makes slot `hand` writable, carrying the last figures forward over
    /// any hand that never produced a boundary.
    fn open_slot(&mut self, hand: usize) -> usize {
        while self.stack.len() <= hand {
            let stack = self.stack.last().copied().unwrap_or(ZERO);
            let buyin = self.buyin.last().copied().unwrap_or(ZERO);
            self.stack.push(stack);
            self.buyin.push(buyin);
        }
        hand
    }

    fn derive_net(&mut self) {
        self.net = self
            .stack
            .iter()
            .zip(&self.buyin)
            .map(|(stack, buyin)| *stack - *buyin)
            .collect();
    }

    /// Adds another series element-wise.
    ///
    /// Returns the two lengths on mismatch.
    pub fn absorb(&mut self, other: &Self) -> Result<(), (usize, usize)> {
        if self.len() != other.len() || self.net.len() != other.net.len() {
            return Err((self.len(), other.len()));
        }
        add_into(&mut self.stack, &other.stack);
        add_into(&mut self.buyin, &other.buyin);
        add_into(&mut self.net, &other.net);
        Ok(())
    }
}

fn add_into(target: &mut [Decimal], source: &[Decimal]) {
    for (t, s) in target.iter_mut().zip(source) {
        *t += *s;
    }
}

/// One player's accumulator and series. Created and dropped together.
#[derive(Debug, Clone)]
pub struct PlayerBook {
    pub player: PlayerRecord,
    pub accumulator: Accumulator,
    pub series: Series,
}

impl PlayerBook {
    pub fn new(player: PlayerRecord) -> Self {
        Self {
            player,
            accumulator: Accumulator::default(),
            series: Series::default(),
        }
    }

    /// Folds the accumulator into slot `hand`.
    ///
    /// `stated` is the player's amount from the stacks snapshot, `None` when
    /// the snapshot does not name them.
    pub fn settle(&mut self, hand: usize, stated: Option<Decimal>) {
        let i = self.series.open_slot(hand);
        let acc = &mut self.accumulator;
        match stated {
            None => {
                self.series.stack[i] += acc.pot;
                if acc.external_pending {
                    self.series.stack[i] += acc.external;
                }
                self.series.buyin[i] += acc.external;
                acc.pot = ZERO;
                acc.external = ZERO;
                acc.external_pending = false;
            }
            Some(amount) => {
                self.series.stack[i] = amount;
                self.series.buyin[i] += acc.external;
                acc.pot = ZERO;
                if acc.external_pending {
                    acc.external = ZERO;
                    acc.external_pending = false;
                }
            }
        }
    }
}

/// A player's finished series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSeries {
    pub player: PlayerRecord,
    #[serde(flatten)]
    pub series: Series,
}

/// Hand where stack movement and buy-in movement disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConservationGap {
    pub hand: usize,
    /// `Σ Δstack - Σ Δbuyin` across all players.
    pub discrepancy: Decimal,
}

/// Reconstructed series for every roster player, keyed by identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    /// Closed hands; every series has `hands + 1` points.
    pub hands: usize,
    pub players: BTreeMap<String, PlayerSeries>,
}

impl Ledger {
    /// Closes the final hand and derives nets.
    ///
    /// With an empty log nothing was played, so no closing fold happens and
    /// every series stays at its baseline.
    pub(crate) fn close(
        books: BTreeMap<String, PlayerBook>,
        hand_counter: usize,
        log_was_empty: bool,
    ) -> Self {
        let hands = if log_was_empty { 0 } else { hand_counter + 1 };
        let players = books
            .into_iter()
            .map(|(identifier, mut book)| {
                if !log_was_empty {
                    book.settle(hands, None);
                }
                book.series.derive_net();
                let finished = PlayerSeries {
                    player: book.player,
                    series: book.series,
                };
                (identifier, finished)
            })
            .collect();

        let ledger = Self { hands, players };
        for gap in ledger.conservation_gaps() {
            tracing::warn!(
                hand = gap.hand,
                discrepancy = %gap.discrepancy,
                "chip movement does not balance external money"
            );
        }
        ledger
    }

    pub fn get(&self, identifier: &str) -> Option<&PlayerSeries> {
        self.players.get(identifier)
    }

    /// Every hand whose summed stack change differs from its summed buy-in
    /// change.
    pub fn conservation_gaps(&self) -> Vec<ConservationGap> {
        (1..=self.hands)
            .filter_map(|hand| {
                let discrepancy: Decimal = self
                    .players
                    .values()
                    .map(|p| {
                        let s = &p.series;
                        (s.stack[hand] - s.stack[hand - 1]) - (s.buyin[hand] - s.buyin[hand - 1])
                    })
                    .sum();
                (!discrepancy.is_zero()).then_some(ConservationGap { hand, discrepancy })
            })
            .collect()
    }
}
