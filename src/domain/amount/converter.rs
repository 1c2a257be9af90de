//! Display <-> base-unit conversion.
//!
//! Scaling is done on decimal digit strings and `U256` only. A floating point
//! value never sits between the user's input and the ledger amount, so
//! `10^decimals` is exact for every supported exponent.

use alloy_primitives::U256;

use crate::shared::errors::{AmountErrorKind, InvalidAmount};

/// Maximum decimals s.t. 10^decimals fits in 256 bits.
/// floor(log10(2^256-1)) = 77
pub const MAX_DECIMALS: u8 = 77;

/// Number of decimal digits in `U256::MAX`.
const U256_MAX_DIGITS: usize = 78;

/// A non-negative decimal number: `digits * 10^-scale`.
struct ParsedDecimal<'a> {
    int_part: &'a str,
    frac_part: &'a str,
    exponent: i64,
}

fn parse_decimal(input: &str) -> Result<ParsedDecimal<'_>, AmountErrorKind> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AmountErrorKind::Empty);
    }
    if trimmed.starts_with('-') {
        return Err(AmountErrorKind::Negative);
    }

    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let lowered = unsigned.to_ascii_lowercase();
    if matches!(lowered.as_str(), "inf" | "infinity" | "nan") {
        return Err(AmountErrorKind::NonFinite);
    }

    let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
        Some(pos) => {
            let exp = unsigned[pos + 1..]
                .parse::<i64>()
                .map_err(|_| AmountErrorKind::Malformed)?;
            (&unsigned[..pos], exp)
        }
        None => (unsigned, 0),
    };

    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(AmountErrorKind::Malformed);
    }
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int_part) || !all_digits(frac_part) {
        return Err(AmountErrorKind::Malformed);
    }

    Ok(ParsedDecimal {
        int_part,
        frac_part,
        exponent,
    })
}

/// Convert a human-entered decimal amount into the token's base unit.
///
/// Fractional digits beyond `decimals` are rounded half-up to the nearest base
/// unit. Scientific notation (`1.5e3`) is accepted.
///
/// # Examples
/// - "1.5", decimals=18 -> 1_500_000_000_000_000_000
/// - "2", decimals=6 -> 2_000_000
///
/// # Errors
///
/// Returns [`InvalidAmount`] for empty, negative, non-finite or malformed
/// input, when the result does not fit in 256 bits, or when `decimals`
/// exceeds [`MAX_DECIMALS`].
pub fn to_base_units(display: &str, decimals: u8) -> Result<U256, InvalidAmount> {
    scale_up(display, decimals).map_err(|kind| InvalidAmount::new(display, kind))
}

fn scale_up(display: &str, decimals: u8) -> Result<U256, AmountErrorKind> {
    if decimals > MAX_DECIMALS {
        return Err(AmountErrorKind::DecimalsOutOfRange(decimals));
    }
    let parsed = parse_decimal(display)?;

    // value * 10^decimals == digits * 10^shift
    // Saturating: an extreme exponent either overflows or rounds to zero below.
    let scale = i64::try_from(parsed.frac_part.len())
        .unwrap_or(i64::MAX)
        .saturating_sub(parsed.exponent);
    let shift = i64::from(decimals).saturating_sub(scale);

    let joined = format!("{}{}", parsed.int_part, parsed.frac_part);
    let digits = joined.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }

    if shift >= 0 {
        let padding = usize::try_from(shift).map_err(|_| AmountErrorKind::Overflow)?;
        if digits.len().saturating_add(padding) > U256_MAX_DIGITS {
            return Err(AmountErrorKind::Overflow);
        }
        let mut scaled = String::with_capacity(digits.len() + padding);
        scaled.push_str(digits);
        scaled.extend(std::iter::repeat('0').take(padding));
        return parse_u256(&scaled);
    }

    // More fractional digits than the token supports: drop them, round half-up.
    let dropped = shift.unsigned_abs();
    if dropped > digits.len() as u64 {
        return Ok(U256::ZERO);
    }
    let keep = digits.len() - dropped as usize;
    let (head, tail) = digits.split_at(keep);
    let base = if head.is_empty() {
        U256::ZERO
    } else {
        parse_u256(head)?
    };
    if tail.as_bytes()[0] >= b'5' {
        base.checked_add(U256::from(1u8))
            .ok_or(AmountErrorKind::Overflow)
    } else {
        Ok(base)
    }
}

fn parse_u256(digits: &str) -> Result<U256, AmountErrorKind> {
    U256::from_str_radix(digits, 10).map_err(|_| AmountErrorKind::Overflow)
}

/// Split `amount / 10^decimals` into (integer digits, fractional digits with length == decimals).
fn split_scaled(amount: U256, decimals: u8) -> (String, String) {
    let digits = amount.to_string();
    let d = decimals as usize;
    if digits.len() > d {
        let (int_part, frac) = digits.split_at(digits.len() - d);
        (int_part.to_string(), frac.to_string())
    } else {
        let mut frac = "0".repeat(d - digits.len());
        frac.push_str(&digits);
        ("0".to_string(), frac)
    }
}

fn join_display(int_part: &str, frac: &str) -> String {
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        int_part.to_string()
    } else {
        format!("{}.{}", int_part, frac)
    }
}

/// Exact decimal rendering of a base-unit amount.
///
/// # Examples
/// - amount=1_000_000_000_000_000_000, decimals=18 -> "1"
/// - amount=12345, decimals=6 -> "0.012345"
pub fn to_display(base: U256, decimals: u8) -> String {
    let (int_part, frac) = split_scaled(base, decimals);
    join_display(&int_part, &frac)
}

/// Presentation-only rendering, rounded half-up to `max_fraction_digits`.
///
/// The result must never be parsed back into a transaction amount; re-derive
/// from the base-unit value instead.
pub fn to_display_rounded(base: U256, decimals: u8, max_fraction_digits: usize) -> String {
    let (int_part, frac) = split_scaled(base, decimals);
    if frac.len() <= max_fraction_digits {
        return join_display(&int_part, &frac);
    }

    let round_up = frac.as_bytes()[max_fraction_digits] >= b'5';
    let mut digits: Vec<u8> = int_part
        .bytes()
        .chain(frac.bytes().take(max_fraction_digits))
        .collect();

    if round_up {
        let mut carried = true;
        for digit in digits.iter_mut().rev() {
            if *digit == b'9' {
                *digit = b'0';
            } else {
                *digit += 1;
                carried = false;
                break;
            }
        }
        if carried {
            digits.insert(0, b'1');
        }
    }

    let split = digits.len() - max_fraction_digits;
    let rendered = String::from_utf8_lossy(&digits).into_owned();
    join_display(&rendered[..split], &rendered[split..])
}
