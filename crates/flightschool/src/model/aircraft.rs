//! Fleet registry records.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::error::{Error, Result};

/// Which duration an aircraft is billed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingBasis {
    /// Off-block to on-block.
    #[default]
    Block,
    /// Engine meter.
    Hobbs,
}

impl BillingBasis {
    /// Parse `block` or `hobbs`; blank means block.
    ///
    /// # Errors
    ///
    /// Returns an error for any other value.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "block" => Ok(Self::Block),
            "hobbs" | "engine" => Ok(Self::Hobbs),
            other => Err(Error::invalid_field(
                "billing_basis",
                other,
                "expected block or hobbs",
            )),
        }
    }

    /// Canonical name as stored.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::Hobbs => "hobbs",
        }
    }
}

impl fmt::Display for BillingBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn registration_regex() -> &'static Regex {
    static REGISTRATION: OnceLock<Regex> = OnceLock::new();
    REGISTRATION.get_or_init(|| {
        Regex::new(r"^[A-Z0-9]{1,3}-?[A-Z0-9]{1,5}$").expect("static regex")
    })
}

/// Uppercase and validate a registration mark (`YR-ABC`, `D-EFGH`, `N123AB`).
///
/// # Errors
///
/// Returns an error if the mark does not look like a registration.
pub fn normalize_registration(field: &'static str, raw: &str) -> Result<String> {
    let registration = raw.trim().to_ascii_uppercase();
    if registration.len() >= 3 && registration_regex().is_match(&registration) {
        Ok(registration)
    } else {
        Err(Error::invalid_field(
            field,
            raw.trim(),
            "not a valid registration mark",
        ))
    }
}

/// An aircraft in the school's fleet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Aircraft {
    /// Row id, assigned by storage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Registration mark; the natural key.
    pub registration: String,
    /// ICAO type designator, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icao_type: Option<String>,
    /// Free-text model name.
    pub model: String,
    /// Rental price per hour.
    pub hourly_rate_cents: i64,
    /// Duration the rate applies to.
    pub billing_basis: BillingBasis,
    /// Whether the aircraft can be flown.
    pub active: bool,
}

impl Aircraft {
    /// Create a validated, active aircraft billed on block time.
    ///
    /// # Errors
    ///
    /// Returns an error if the registration is invalid or the rate negative.
    pub fn new(registration: &str, model: &str, hourly_rate_cents: i64) -> Result<Self> {
        let registration = normalize_registration("registration", registration)?;
        if hourly_rate_cents < 0 {
            return Err(Error::validation(format!(
                "hourly rate for {registration} cannot be negative"
            )));
        }
        Ok(Self {
            id: None,
            registration,
            icao_type: None,
            model: model.trim().to_string(),
            hourly_rate_cents,
            billing_basis: BillingBasis::Block,
            active: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_registration() {
        assert_eq!(normalize_registration("r", "yr-abc").unwrap(), "YR-ABC");
        assert_eq!(normalize_registration("r", "D-EFGH").unwrap(), "D-EFGH");
        assert_eq!(normalize_registration("r", "n123ab").unwrap(), "N123AB");
        assert!(normalize_registration("r", "").is_err());
        assert!(normalize_registration("r", "YR").is_err());
        assert!(normalize_registration("r", "YR ABC").is_err());
        assert!(normalize_registration("r", "YR--ABC").is_err());
    }

    #[test]
    fn test_billing_basis_parse() {
        assert_eq!(BillingBasis::parse("").unwrap(), BillingBasis::Block);
        assert_eq!(BillingBasis::parse("Hobbs").unwrap(), BillingBasis::Hobbs);
        assert!(BillingBasis::parse("tach").is_err());
    }

    #[test]
    fn test_aircraft_new() {
        let aircraft = Aircraft::new("yr-abc", "Cessna 152", 85_000).unwrap();
        assert_eq!(aircraft.registration, "YR-ABC");
        assert!(aircraft.active);
        assert_eq!(aircraft.billing_basis, BillingBasis::Block);
    }

    #[test]
    fn test_aircraft_rejects_negative_rate() {
        assert!(Aircraft::new("YR-ABC", "C152", -1).is_err());
    }
}
