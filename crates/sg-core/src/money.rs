//! Two-decimal money literals.
//!
//! Every amount the platform prints has exactly two fractional digits.
//! Amounts are parsed straight into [`Decimal`] so hundreds of hands
//! accumulate without cent drift.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;

/// Zero with cent scale, so untouched series print as `0.00`.
pub const ZERO: Decimal = Decimal::from_parts(0, 0, 0, false, 2);

/// A two-decimal numeral preceded by whitespace or the start of the line.
static AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)(\d+\.\d\d)").unwrap());

/// Parses a bare `12.34` token.
pub fn parse_amount(token: &str) -> Option<Decimal> {
    let token = token.trim_end_matches(['.', ',']);
    let (whole, frac) = token.split_once('.')?;
    if whole.is_empty() || frac.len() != 2 || !token.bytes().all(|b| b.is_ascii_digit() || b == b'.')
    {
        return None;
    }
    Decimal::from_str(token).ok()
}

/// Returns the first two-decimal amount in a line.
pub fn first_amount(line: &str) -> Option<Decimal> {
    amounts(line).next()
}

/// Iterates all two-decimal amounts in a line, left to right.
pub fn amounts(line: &str) -> impl Iterator<Item = Decimal> + '_ {
    AMOUNT_RE
        .captures_iter(line)
        .filter_map(|caps| Decimal::from_str(&caps[1]).ok())
}
