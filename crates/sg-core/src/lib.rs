//! Stack and net reconstruction for poker session exports.
//!
//! Given a roster export and an action log from one session, this crate
//! rebuilds every player's per-hand stack, cumulative buy-in and net:
//! - Input: format sniffing, roster loading, chronological log ordering
//! - Classification: one rule per log line, in fixed priority order
//! - Ledger: accumulator folding at hand boundaries and final closing
//! - Directory: grouping identifiers under registered player names
//!
//! Every entry point is a pure function of its inputs. Calls share no state
//! and can run on as many threads as the caller likes.

mod classify;
mod directory;
mod error;
mod input;
mod ledger;
pub mod money;

use rayon::prelude::*;

pub use classify::{LineKind, classify};
pub use directory::{Advisory, NameDirectory, Standing, Standings, resolve_aliases};
pub use error::{DirectoryError, EngineError};
pub use input::{ExportKind, LOG_MARKER, PlayerRecord, ROSTER_MARKER, Roster};
pub use ledger::{Accumulator, ConservationGap, Ledger, PlayerSeries, Series};

/// Rebuilds per-identifier series from two exports given in either order.
pub fn reconstruct(first: &[u8], second: &[u8]) -> Result<Ledger, EngineError> {
    let exports = input::sniff(first, second)?;
    let roster = Roster::load(&exports.roster);
    let lines = input::chronological(&exports.log);
    classify::scan(&roster, &lines)
}

/// Rebuilds series and groups them by name.
///
/// Without a directory every player stays under their roster alias.
pub fn reconstruct_with_directory(
    first: &[u8],
    second: &[u8],
    directory: Option<&dyn NameDirectory>,
) -> Result<Standings, EngineError> {
    let ledger = reconstruct(first, second)?;
    match directory {
        Some(directory) => resolve_aliases(ledger, directory),
        None => Ok(Standings::unresolved(ledger)),
    }
}

/// Reconstructs independent sessions in parallel, preserving input order.
pub fn reconstruct_batch<T>(pairs: &[(T, T)]) -> Vec<Result<Ledger, EngineError>>
where
    T: AsRef<[u8]> + Sync,
{
    pairs
        .par_iter()
        .map(|(first, second)| reconstruct(first.as_ref(), second.as_ref()))
        .collect()
}
