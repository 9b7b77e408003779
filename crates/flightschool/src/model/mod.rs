//! Domain records for the school: people, fleet, reference data and flights.

pub mod aircraft;
pub mod flight_log;
pub mod money;
pub mod reference;
pub mod user;

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};

pub use aircraft::{Aircraft, BillingBasis};
pub use flight_log::{FlightLog, FlightLogInput, FlightType};
pub use reference::{Airport, IcaoAircraftType, OperationalArea, WakeCategory};
pub use user::{Role, User};

/// Location identifiers: ICAO codes (`LRCL`) and local codes (`RO-0012`).
fn ident_regex() -> &'static Regex {
    static IDENT: OnceLock<Regex> = OnceLock::new();
    IDENT.get_or_init(|| Regex::new(r"^[A-Z0-9][A-Z0-9-]{1,9}$").expect("static regex"))
}

/// Uppercase and validate an airfield identifier.
///
/// # Errors
///
/// Returns an error if the identifier is empty or has characters outside
/// `A-Z`, `0-9` and `-`.
pub fn normalize_ident(field: &'static str, raw: &str) -> Result<String> {
    let ident = raw.trim().to_ascii_uppercase();
    if ident_regex().is_match(&ident) {
        Ok(ident)
    } else {
        Err(Error::invalid_field(
            field,
            raw.trim(),
            "expected 2-10 letters, digits or dashes",
        ))
    }
}

/// Trim a free-text field, mapping blank to `None`.
#[must_use]
pub fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
