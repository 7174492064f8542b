//! Fixed-point amount and odds conversion.
//!
//! - Stable-asset amounts use 6 decimals
//! - Odds use 12 decimals
//! - Minimum acceptable odds: 1 + (odds - 1) * (100 - slippage) / 100

use std::str::FromStr;

use alloy::primitives::U256;
use bookie_types::{BookieError, Result};
use rust_decimal::{Decimal, RoundingStrategy};

/// Decimals of the stable asset the bets are placed in.
pub const STAKE_DECIMALS: u8 = 6;

/// Decimals the betting contracts use for odds.
pub const ODDS_DECIMALS: u32 = 12;

/// Convert a non-negative decimal string into an integer scaled by `10^decimals`.
///
/// Digits past `decimals` are only accepted when they are zeros; anything else
/// would be silently truncated on-chain.
pub fn to_fixed_point(value: &str, decimals: u8) -> Result<U256> {
    let invalid = |why: &str| BookieError::InvalidAmount(format!("{:?}: {}", value, why));

    let s = value.trim();
    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, f),
        None => (s, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid("empty"));
    }
    if !int_part.chars().all(|c| c.is_ascii_digit()) || !frac_part.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("not a non-negative decimal number"));
    }

    let significant_frac = frac_part.trim_end_matches('0');
    if significant_frac.len() > decimals as usize {
        return Err(invalid(&format!("more than {} fractional digits", decimals)));
    }

    let mut digits = String::with_capacity(int_part.len() + decimals as usize);
    digits.push_str(int_part);
    digits.push_str(significant_frac);
    for _ in significant_frac.len()..decimals as usize {
        digits.push('0');
    }
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }

    U256::from_str_radix(digits, 10).map_err(|_| invalid("does not fit in 256 bits"))
}

/// Render a fixed-point integer back as a decimal string, without trailing zeros.
pub fn from_fixed_point(value: U256, decimals: u8) -> String {
    let digits = value.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }

    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals - digits.len() + 1), digits)
    } else {
        digits
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - decimals);
    let frac_part = frac_part.trim_end_matches('0');
    if frac_part.is_empty() {
        int_part.to_string()
    } else {
        format!("{}.{}", int_part, frac_part)
    }
}

/// Parse user-facing decimal input (odds, slippage percentages).
pub fn parse_decimal(value: &str) -> Result<Decimal> {
    Decimal::from_str(value.trim())
        .map_err(|e| BookieError::InvalidOdds(format!("{:?}: {}", value, e)))
}

/// Slippage-adjusted lower bound for the odds, as a decimal rounded to 12 places.
pub fn min_acceptable_odds_decimal(current_odds: Decimal, slippage_percent: Decimal) -> Result<Decimal> {
    if current_odds.is_sign_negative() {
        return Err(BookieError::InvalidOdds(format!("negative odds {}", current_odds)));
    }
    if slippage_percent.is_sign_negative() || slippage_percent > Decimal::ONE_HUNDRED {
        return Err(BookieError::InvalidOdds(format!(
            "slippage {}% outside 0..=100",
            slippage_percent
        )));
    }

    let overflow = || BookieError::InvalidOdds(format!("odds {} out of range", current_odds));
    let margin = current_odds.checked_sub(Decimal::ONE).ok_or_else(overflow)?;
    let kept = Decimal::ONE_HUNDRED - slippage_percent;
    let bound = margin
        .checked_mul(kept)
        .and_then(|m| m.checked_div(Decimal::ONE_HUNDRED))
        .and_then(|m| m.checked_add(Decimal::ONE))
        .ok_or_else(overflow)?;

    Ok(bound.round_dp_with_strategy(ODDS_DECIMALS, RoundingStrategy::MidpointAwayFromZero))
}

/// Slippage-adjusted lower bound for the odds in contract fixed-point form.
///
/// Odds at or below 1 produce a bound at or below 1; rejecting those is up to the caller.
pub fn min_acceptable_odds(current_odds: Decimal, slippage_percent: Decimal) -> Result<U256> {
    let bound = min_acceptable_odds_decimal(current_odds, slippage_percent)?;
    to_fixed_point(&bound.to_string(), ODDS_DECIMALS as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(s: &str) -> String {
        let s = if s.starts_with('.') { format!("0{}", s) } else { s.to_string() };
        match s.split_once('.') {
            Some((i, f)) => {
                let f = f.trim_end_matches('0');
                if f.is_empty() { i.to_string() } else { format!("{}.{}", i, f) }
            }
            None => s,
        }
    }

    #[test]
    fn test_fixed_point_vectors_from_json() {
        let data = include_str!("../../../tests/vectors/fixed_point.json");
        let vectors: Vec<serde_json::Value> = serde_json::from_str(data).unwrap();

        for v in &vectors {
            let input = v["input"].as_str().unwrap();
            let decimals = v["decimals"].as_u64().unwrap() as u8;
            let expected = v["expected"].as_str().unwrap();

            let got = to_fixed_point(input, decimals).unwrap();
            assert_eq!(
                got.to_string(), expected,
                "fixed-point mismatch for '{}'",
                v["name"].as_str().unwrap()
            );

            let back = from_fixed_point(got, decimals);
            assert_eq!(
                back, normalize(input),
                "round trip mismatch for '{}'",
                v["name"].as_str().unwrap()
            );
        }
    }

    #[test]
    fn test_stake_tenth_is_one_hundred_thousand() {
        assert_eq!(to_fixed_point("0.1", STAKE_DECIMALS).unwrap(), U256::from(100_000u64));
    }

    #[test]
    fn test_invalid_amounts() {
        for bad in ["", ".", "-1", "+1", "1.2.3", "abc", "1e6", "0.1234567", " - "] {
            assert!(
                matches!(to_fixed_point(bad, 6), Err(BookieError::InvalidAmount(_))),
                "expected InvalidAmount for {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_overflow_is_invalid_amount() {
        let huge = "9".repeat(80);
        assert!(matches!(to_fixed_point(&huge, 0), Err(BookieError::InvalidAmount(_))));
    }

    #[test]
    fn test_from_fixed_point_small_values() {
        assert_eq!(from_fixed_point(U256::from(5u64), 6), "0.000005");
        assert_eq!(from_fixed_point(U256::ZERO, 6), "0");
        assert_eq!(from_fixed_point(U256::from(42u64), 0), "42");
    }

    #[test]
    fn test_odds_vectors_from_json() {
        let data = include_str!("../../../tests/vectors/odds.json");
        let vectors: Vec<serde_json::Value> = serde_json::from_str(data).unwrap();

        for v in &vectors {
            let odds = parse_decimal(v["current_odds"].as_str().unwrap()).unwrap();
            let slippage = parse_decimal(v["slippage"].as_str().unwrap()).unwrap();
            let expected = v["expected"].as_str().unwrap();

            let got = min_acceptable_odds(odds, slippage).unwrap();
            assert_eq!(
                got.to_string(), expected,
                "min odds mismatch for '{}'",
                v["name"].as_str().unwrap()
            );
        }
    }

    #[test]
    fn test_odds_at_or_below_one() {
        let one = min_acceptable_odds(Decimal::ONE, Decimal::from(4)).unwrap();
        assert_eq!(one, U256::from(1_000_000_000_000u64));

        let below = min_acceptable_odds_decimal(parse_decimal("0.5").unwrap(), Decimal::from(4)).unwrap();
        assert!(below < Decimal::ONE);
    }

    #[test]
    fn test_slippage_out_of_range() {
        let odds = parse_decimal("1.8").unwrap();
        assert!(min_acceptable_odds(odds, Decimal::from(101)).is_err());
        assert!(min_acceptable_odds(odds, Decimal::from(-1)).is_err());
    }
}
