// src/weight.rs
//! Weight parsing, display formatting and the stones/pounds split.
//!
//! Weights are `Decimal` so that values typed into the form survive a save and
//! reload without binary floating point drift. In stones mode everything that is
//! persisted is a pounds-equivalent value.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt;
use std::str::FromStr;

pub const POUNDS_PER_STONE: i32 = 14;

/// Decimal places shown in weight fields.
const DISPLAY_DECIMAL_PLACES: u32 = 1;

/// A weight split into whole stones plus the pounds left over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StonesAndPounds {
    pub whole: i32,
    pub remainder: Decimal,
}

impl StonesAndPounds {
    pub const fn new(whole: i32, remainder: Decimal) -> Self {
        Self { whole, remainder }
    }

    /// Splits a pounds value; the stones part truncates toward zero.
    pub fn from_pounds(pounds: Decimal) -> Self {
        let per_stone = Decimal::from(POUNDS_PER_STONE);
        let stones = (pounds / per_stone).trunc();
        let whole = stones.to_i32().unwrap_or(if stones.is_sign_negative() {
            i32::MIN
        } else {
            i32::MAX
        });
        let remainder = pounds - Decimal::from(whole) * per_stone;
        Self { whole, remainder }
    }

    /// Total in pounds, or `None` when it does not fit in a `Decimal`.
    pub fn checked_to_pounds(self) -> Option<Decimal> {
        Decimal::from(self.whole)
            .checked_mul(Decimal::from(POUNDS_PER_STONE))?
            .checked_add(self.remainder)
    }
}

impl fmt::Display for StonesAndPounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} st {} lb", self.whole, format_weight(self.remainder))
    }
}

/// Parses a decimal weight field. Surrounding whitespace is ignored.
///
/// Accepts plain invariant notation only (`1000.5`, `-3`); group separators
/// such as `1,000` and locale decimal commas are rejected.
pub fn parse_weight(input: &str) -> Option<Decimal> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(trimmed).ok()
}

/// Parses the whole-stones field.
pub fn parse_stones(input: &str) -> Option<i32> {
    input.trim().parse::<i32>().ok()
}

/// Parses a (stones, pounds) field pair.
pub fn parse_stones_and_pounds(stones: &str, pounds: &str) -> Option<StonesAndPounds> {
    let whole = parse_stones(stones)?;
    let remainder = parse_weight(pounds)?;
    Some(StonesAndPounds::new(whole, remainder))
}

/// Fixed one-decimal display format used for every weight field.
pub fn format_weight(weight: Decimal) -> String {
    let mut rounded =
        weight.round_dp_with_strategy(DISPLAY_DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(DISPLAY_DECIMAL_PLACES);
    rounded.to_string()
}
