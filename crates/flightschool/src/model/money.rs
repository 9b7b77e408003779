//! Amounts are whole cents in `i64`.

use crate::error::{Error, Result};

/// Parse `850`, `850.5` or `850.50` into cents. A comma is accepted as the
/// decimal separator.
///
/// # Errors
///
/// Returns an error for negative amounts, more than two decimals, or
/// non-numeric input.
pub fn parse_cents(field: &'static str, raw: &str) -> Result<i64> {
    let value = raw.trim().replace(',', ".");
    let invalid = |reason: &str| Error::invalid_field(field, raw.trim(), reason);

    let (units, fraction) = value.split_once('.').unwrap_or((value.as_str(), ""));
    if units.is_empty() || !units.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("expected a non-negative amount"));
    }
    if fraction.len() > 2 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("at most two decimals"));
    }

    let units: i64 = units.parse().map_err(|_| invalid("amount too large"))?;
    let fraction: i64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<i64>().map_err(|_| invalid("bad decimals"))? * 10,
        _ => fraction.parse().map_err(|_| invalid("bad decimals"))?,
    };
    units
        .checked_mul(100)
        .and_then(|c| c.checked_add(fraction))
        .ok_or_else(|| invalid("amount too large"))
}

/// Format cents as `1234.50`.
#[must_use]
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

/// `amount * percent / 100`, rounded half up.
///
/// # Errors
///
/// Returns a validation error if the intermediate product overflows.
pub fn percent_of(amount_cents: i64, percent: u32) -> Result<i64> {
    amount_cents
        .checked_mul(i64::from(percent))
        .and_then(|scaled| scaled.checked_add(50))
        .map(|scaled| scaled.div_euclid(100))
        .ok_or_else(|| {
            Error::validation(format!(
                "{percent}% of {} is out of range",
                format_cents(amount_cents)
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cents() {
        assert_eq!(parse_cents("rate", "850").unwrap(), 85_000);
        assert_eq!(parse_cents("rate", "850.5").unwrap(), 85_050);
        assert_eq!(parse_cents("rate", "850,05").unwrap(), 85_005);
        assert_eq!(parse_cents("rate", " 0.99 ").unwrap(), 99);
    }

    #[test]
    fn test_parse_cents_rejects_bad_input() {
        for raw in ["", "-5", "1.234", "abc", "1.2.3", ".50"] {
            assert!(parse_cents("rate", raw).is_err(), "accepted {raw:?}");
        }
    }

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(0), "0.00");
        assert_eq!(format_cents(123_450), "1234.50");
        assert_eq!(format_cents(-5), "-0.05");
    }

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(10_000, 19).unwrap(), 1_900);
        assert_eq!(percent_of(1_050, 19).unwrap(), 200); // 199.5 rounds up
        assert_eq!(percent_of(12_345, 0).unwrap(), 0);
    }

    #[test]
    fn test_percent_of_out_of_range() {
        assert!(percent_of(i64::MAX, 19).unwrap_err().is_validation());
        assert!(percent_of(i64::MAX, 1).is_err());
        assert_eq!(percent_of(i64::MAX, 0).unwrap(), 0);
    }
}
