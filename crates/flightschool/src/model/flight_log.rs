//! Flight log records and the derivation of their computed fields.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::flight_time::{FlightRole, FlightTimes, Hobbs, HourCategories};

use super::aircraft::{normalize_registration, BillingBasis};
use super::normalize_ident;
use super::user::normalize_email;

/// Purpose of a flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlightType {
    /// Syllabus training flight.
    #[default]
    Training,
    /// Private or rental flight.
    Private,
    /// Proficiency or skill test.
    Check,
    /// Positioning or maintenance flight.
    Ferry,
}

impl FlightType {
    /// Parse a flight type; blank means training.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown types.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "training" | "school" | "instruction" => Ok(Self::Training),
            "private" | "rental" => Ok(Self::Private),
            "check" | "exam" | "proficiency" => Ok(Self::Check),
            "ferry" | "maintenance" | "positioning" => Ok(Self::Ferry),
            other => Err(Error::invalid_field(
                "flight_type",
                other,
                "expected training, private, check or ferry",
            )),
        }
    }

    /// Canonical name as stored.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Training => "training",
            Self::Private => "private",
            Self::Check => "check",
            Self::Ferry => "ferry",
        }
    }
}

impl fmt::Display for FlightType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entered values for one leg, before derivation.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightLogInput {
    /// Date of off-block (UTC).
    pub date: NaiveDate,
    /// Logging pilot.
    pub pilot_email: String,
    /// Instructor on board, for dual flights.
    pub instructor_email: Option<String>,
    /// Aircraft flown.
    pub aircraft_registration: String,
    /// Departure airfield.
    pub departure: String,
    /// Arrival airfield.
    pub arrival: String,
    /// Clock times.
    pub times: FlightTimes,
    /// Engine meter readings.
    pub hobbs: Option<Hobbs>,
    /// Day landings.
    pub landings_day: u32,
    /// Night landings.
    pub landings_night: u32,
    /// Capacity of the logging pilot.
    pub role: FlightRole,
    /// Purpose.
    pub flight_type: FlightType,
    /// Night minutes.
    pub night_minutes: u32,
    /// Instrument minutes.
    pub ifr_minutes: u32,
    /// Free text.
    pub remarks: Option<String>,
}

/// A validated flight log with its derived hour categories.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightLog {
    /// Row id, assigned by storage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Date of off-block (UTC).
    pub date: NaiveDate,
    /// Logging pilot.
    pub pilot_email: String,
    /// Instructor on board.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructor_email: Option<String>,
    /// Aircraft flown.
    pub aircraft_registration: String,
    /// Departure airfield.
    pub departure: String,
    /// Arrival airfield.
    pub arrival: String,
    /// Clock times.
    pub times: FlightTimes,
    /// Engine meter readings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hobbs: Option<Hobbs>,
    /// Day landings.
    pub landings_day: u32,
    /// Night landings.
    pub landings_night: u32,
    /// Capacity of the logging pilot.
    pub role: FlightRole,
    /// Purpose.
    pub flight_type: FlightType,
    /// Free text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    /// Derived hour columns.
    pub categories: HourCategories,
    /// Duplicate-detection key.
    pub fingerprint: String,
    /// Invoice this leg was billed on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<i64>,
}

/// Upper bound on day or night landings logged for one leg.
pub const MAX_LANDINGS_PER_LEG: u32 = 99;

impl FlightLog {
    /// Validate the input and derive block, airborne and category times.
    ///
    /// # Errors
    ///
    /// Returns an error if an identifier is malformed, the clock times are
    /// inconsistent, crew rules are broken, or landings do not add up.
    pub fn new(input: FlightLogInput, max_block_minutes: u32) -> Result<Self> {
        let pilot_email = normalize_email("pilot_email", &input.pilot_email)?;
        let instructor_email = input
            .instructor_email
            .as_deref()
            .map(|e| normalize_email("instructor_email", e))
            .transpose()?;
        let aircraft_registration =
            normalize_registration("aircraft", &input.aircraft_registration)?;
        let departure = normalize_ident("departure", &input.departure)?;
        let arrival = normalize_ident("arrival", &input.arrival)?;

        match (input.role, instructor_email.as_deref()) {
            (FlightRole::Dual, None) => {
                return Err(Error::validation("a dual flight needs an instructor"));
            }
            (FlightRole::Solo, Some(_)) => {
                return Err(Error::validation("a solo flight cannot carry an instructor"));
            }
            (_, Some(instructor)) if instructor == pilot_email => {
                return Err(Error::validation(format!(
                    "{pilot_email} cannot instruct themselves"
                )));
            }
            _ => {}
        }

        if input.landings_day == 0 && input.landings_night == 0 {
            return Err(Error::validation("at least one landing is required"));
        }
        for (field, count) in [
            ("landings_day", input.landings_day),
            ("landings_night", input.landings_night),
        ] {
            if count > MAX_LANDINGS_PER_LEG {
                return Err(Error::invalid_field(
                    field,
                    count.to_string(),
                    format!("at most {MAX_LANDINGS_PER_LEG} landings per leg"),
                ));
            }
        }
        if input.landings_night > 0 && input.night_minutes == 0 {
            return Err(Error::validation(
                "night landings require night time to be logged",
            ));
        }

        input.times.validate(max_block_minutes)?;
        let categories = HourCategories::derive(
            input.times.block_minutes(),
            input.times.airborne_minutes(),
            input.role,
            input.night_minutes,
            input.ifr_minutes,
        )?;

        let fingerprint =
            Self::compute_fingerprint(input.date, &aircraft_registration, &pilot_email, &input.times);

        Ok(Self {
            id: None,
            date: input.date,
            pilot_email,
            instructor_email,
            aircraft_registration,
            departure,
            arrival,
            times: input.times,
            hobbs: input.hobbs,
            landings_day: input.landings_day,
            landings_night: input.landings_night,
            role: input.role,
            flight_type: input.flight_type,
            remarks: input.remarks.filter(|r| !r.trim().is_empty()),
            categories,
            fingerprint,
            invoice_id: None,
        })
    }

    /// BLAKE3 over date, aircraft, pilot and off-block time.
    ///
    /// The same aircraft cannot leave the blocks twice at one minute with the
    /// same pilot, so this identifies a leg across re-imports.
    #[must_use]
    pub fn compute_fingerprint(
        date: NaiveDate,
        registration: &str,
        pilot_email: &str,
        times: &FlightTimes,
    ) -> String {
        let key = format!("{date}|{registration}|{pilot_email}|{}", times.off_block);
        blake3::hash(key.as_bytes()).to_hex().to_string()
    }

    /// Minutes charged for this leg under `basis`.
    ///
    /// Falls back to block time when the aircraft bills on Hobbs but no
    /// readings were logged.
    #[must_use]
    pub fn billable_minutes(&self, basis: BillingBasis) -> u32 {
        match (basis, self.hobbs) {
            (BillingBasis::Hobbs, Some(hobbs)) => hobbs.minutes(),
            _ => self.categories.block,
        }
    }

    /// Whether this leg is already on an invoice.
    #[must_use]
    pub fn is_billed(&self) -> bool {
        self.invoice_id.is_some()
    }
}
