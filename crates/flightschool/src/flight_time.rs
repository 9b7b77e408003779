//! Flight-time arithmetic.
//!
//! Clock times are minutes since midnight UTC. Durations between them are
//! measured forward on the 24-hour circle from off-block, so a leg that
//! departs at 23:40 and blocks in at 00:35 has 55 minutes of block time.
//! All durations are whole minutes.

use std::fmt;

use chrono::NaiveDate;
use serde::{Serialize, Serializer};

use crate::error::{Error, Result};

/// Minutes in one day.
pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Accepted date layouts, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y"];

/// A time of day with minute resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime(u16);

impl ClockTime {
    /// Build a clock time from hour and minute.
    ///
    /// # Errors
    ///
    /// Returns an error if the hour is above 23 or the minute above 59.
    pub fn from_hm(hour: u16, minute: u16) -> Result<Self> {
        if hour > 23 {
            return Err(Error::invalid_field(
                "time",
                format!("{hour}:{minute:02}"),
                "hour out of range",
            ));
        }
        if minute > 59 {
            return Err(Error::invalid_field(
                "time",
                format!("{hour}:{minute:02}"),
                "minute out of range",
            ));
        }
        Ok(Self(hour * 60 + minute))
    }

    /// Parse `HH:MM`, `H:MM`, `HH.MM`, `HHMM` or `HMM`, with an optional
    /// trailing `Z`.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a valid time of day.
    pub fn parse(raw: &str) -> Result<Self> {
        let value = raw.trim().trim_end_matches(['Z', 'z']);
        let invalid = |reason: &str| Error::invalid_field("time", raw.trim(), reason);

        let (hours, minutes) = if let Some(split) = value.split_once([':', '.']) {
            split
        } else if value.bytes().all(|b| b.is_ascii_digit()) && (3..=4).contains(&value.len()) {
            value.split_at(value.len() - 2)
        } else {
            return Err(invalid("expected HH:MM"));
        };

        let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(hours) || hours.len() > 2 || !all_digits(minutes) || minutes.len() != 2 {
            return Err(invalid("expected HH:MM"));
        }

        let hour: u16 = hours.parse().map_err(|_| invalid("expected HH:MM"))?;
        let minute: u16 = minutes.parse().map_err(|_| invalid("expected HH:MM"))?;
        Self::from_hm(hour, minute).map_err(|_| {
            invalid(if hour > 23 {
                "hour out of range"
            } else {
                "minute out of range"
            })
        })
    }

    /// Minutes since midnight.
    #[must_use]
    pub fn minutes(self) -> u32 {
        u32::from(self.0)
    }

    /// Minutes elapsed going forward from `self` to `later`, wrapping at midnight.
    #[must_use]
    pub fn minutes_until(self, later: Self) -> u32 {
        (later.minutes() + MINUTES_PER_DAY - self.minutes()) % MINUTES_PER_DAY
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The clock times of one leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FlightTimes {
    /// Chocks off.
    pub off_block: ClockTime,
    /// Wheels up, if recorded.
    pub takeoff: Option<ClockTime>,
    /// Wheels down, if recorded.
    pub landing: Option<ClockTime>,
    /// Chocks on.
    pub on_block: ClockTime,
}

impl FlightTimes {
    /// Off-block to on-block.
    #[must_use]
    pub fn block_minutes(&self) -> u32 {
        self.off_block.minutes_until(self.on_block)
    }

    /// Takeoff to landing, or block time when either is missing.
    #[must_use]
    pub fn airborne_minutes(&self) -> u32 {
        match (self.takeoff, self.landing) {
            (Some(takeoff), Some(landing)) => self
                .off_block
                .minutes_until(landing)
                .saturating_sub(self.off_block.minutes_until(takeoff)),
            _ => self.block_minutes(),
        }
    }

    /// Check ordering and length.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the block time is zero or longer than
    /// `max_block_minutes`, when only one of takeoff/landing is given, or when
    /// the times are out of order.
    pub fn validate(&self, max_block_minutes: u32) -> Result<()> {
        let block = self.block_minutes();
        if block == 0 {
            return Err(Error::validation(format!(
                "off-block and on-block are both {}",
                self.off_block
            )));
        }
        if block > max_block_minutes {
            return Err(Error::validation(format!(
                "block time {} exceeds the {} limit",
                format_hhmm(block),
                format_hhmm(max_block_minutes)
            )));
        }

        match (self.takeoff, self.landing) {
            (None, None) => Ok(()),
            (Some(takeoff), Some(landing)) => {
                let up = self.off_block.minutes_until(takeoff);
                let down = self.off_block.minutes_until(landing);
                if up > block || down > block {
                    return Err(Error::validation(format!(
                        "takeoff {takeoff} and landing {landing} must lie between off-block {} and on-block {}",
                        self.off_block, self.on_block
                    )));
                }
                if down < up {
                    return Err(Error::validation(format!(
                        "landing {landing} must not precede takeoff {takeoff}"
                    )));
                }
                Ok(())
            }
            _ => Err(Error::validation(
                "takeoff and landing must be given together",
            )),
        }
    }
}

/// Engine meter readings in decimal hours.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Hobbs {
    /// Reading before the flight.
    pub start: f64,
    /// Reading after the flight.
    pub end: f64,
}

impl Hobbs {
    /// Build a validated pair of readings.
    ///
    /// # Errors
    ///
    /// Returns an error if a reading is negative or not finite, or if the meter
    /// ran backwards.
    pub fn new(start: f64, end: f64) -> Result<Self> {
        if !start.is_finite() || !end.is_finite() || start < 0.0 || end < 0.0 {
            return Err(Error::validation(format!(
                "hobbs readings must be non-negative numbers (got {start} and {end})"
            )));
        }
        if end < start {
            return Err(Error::validation(format!(
                "hobbs end {end} is lower than hobbs start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Elapsed meter time rounded to the nearest minute.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn minutes(&self) -> u32 {
        ((self.end - self.start) * 60.0).round() as u32
    }
}

/// Outcome of comparing the Hobbs meter with the computed block time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HobbsCheck {
    /// Within tolerance.
    Consistent,
    /// Outside tolerance.
    Mismatch {
        /// Meter minutes.
        hobbs: u32,
        /// Computed block minutes.
        block: u32,
        /// Absolute difference in minutes.
        diff: u32,
    },
}

/// Compare meter minutes with block minutes.
#[must_use]
pub fn check_hobbs(hobbs: &Hobbs, block_minutes: u32, tolerance_minutes: u32) -> HobbsCheck {
    let meter = hobbs.minutes();
    let diff = meter.abs_diff(block_minutes);
    if diff > tolerance_minutes {
        HobbsCheck::Mismatch {
            hobbs: meter,
            block: block_minutes,
            diff,
        }
    } else {
        HobbsCheck::Consistent
    }
}

/// The capacity in which the logging pilot flew.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlightRole {
    /// Pilot in command.
    Pic,
    /// Student under instruction.
    Dual,
    /// Flight instructor giving instruction.
    Instructor,
    /// Student pilot flying solo.
    Solo,
}

impl FlightRole {
    /// Parse a role string, accepting common logbook abbreviations.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown roles.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pic" | "p1" | "captain" => Ok(Self::Pic),
            "dual" | "p/ut" | "put" | "student" => Ok(Self::Dual),
            "instructor" | "fi" | "cri" | "fi/pic" => Ok(Self::Instructor),
            "solo" | "spic" => Ok(Self::Solo),
            _ => Err(Error::invalid_field(
                "role",
                raw.trim(),
                "expected pic, dual, instructor or solo",
            )),
        }
    }

    /// Canonical lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pic => "pic",
            Self::Dual => "dual",
            Self::Instructor => "instructor",
            Self::Solo => "solo",
        }
    }
}

impl fmt::Display for FlightRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logbook hour columns derived for one leg, in minutes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HourCategories {
    /// Off-block to on-block.
    pub block: u32,
    /// Takeoff to landing.
    pub airborne: u32,
    /// Pilot-in-command time.
    pub pic: u32,
    /// Dual instruction received.
    pub dual: u32,
    /// Instruction given.
    pub instructor: u32,
    /// Student solo time.
    pub solo: u32,
    /// Night time.
    pub night: u32,
    /// Instrument time.
    pub ifr: u32,
}

impl HourCategories {
    /// Distribute block time into the columns for `role`.
    ///
    /// Instructor and solo time also count as PIC time.
    ///
    /// # Errors
    ///
    /// Returns an error if night or instrument time exceeds block time.
    pub fn derive(
        block: u32,
        airborne: u32,
        role: FlightRole,
        night: u32,
        ifr: u32,
    ) -> Result<Self> {
        if night > block {
            return Err(Error::validation(format!(
                "night time {} exceeds block time {}",
                format_hhmm(night),
                format_hhmm(block)
            )));
        }
        if ifr > block {
            return Err(Error::validation(format!(
                "instrument time {} exceeds block time {}",
                format_hhmm(ifr),
                format_hhmm(block)
            )));
        }

        let mut categories = Self {
            block,
            airborne,
            night,
            ifr,
            ..Self::default()
        };
        match role {
            FlightRole::Pic => categories.pic = block,
            FlightRole::Dual => categories.dual = block,
            FlightRole::Instructor => {
                categories.instructor = block;
                categories.pic = block;
            }
            FlightRole::Solo => {
                categories.solo = block;
                categories.pic = block;
            }
        }
        Ok(categories)
    }

    /// Add another leg's columns to this one.
    pub fn accumulate(&mut self, other: &Self) {
        self.block += other.block;
        self.airborne += other.airborne;
        self.pic += other.pic;
        self.dual += other.dual;
        self.instructor += other.instructor;
        self.solo += other.solo;
        self.night += other.night;
        self.ifr += other.ifr;
    }
}

/// Parse a calendar date.
///
/// # Errors
///
/// Returns an error if the value matches none of the accepted layouts.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let value = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .ok_or_else(|| {
            Error::invalid_field("date", value, "expected YYYY-MM-DD, DD.MM.YYYY or DD/MM/YYYY")
        })
}

/// Parse a duration given as `H:MM` or as decimal hours. Empty means zero.
///
/// # Errors
///
/// Returns an error if the value is negative or malformed.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn parse_duration(raw: &str) -> Result<u32> {
    let value = raw.trim();
    if value.is_empty() {
        return Ok(0);
    }
    let invalid = || Error::invalid_field("duration", value, "expected H:MM or decimal hours");

    if let Some((hours, minutes)) = value.split_once(':') {
        let hours: u32 = hours.parse().map_err(|_| invalid())?;
        let minutes: u32 = minutes.parse().map_err(|_| invalid())?;
        if minutes > 59 {
            return Err(invalid());
        }
        return hours
            .checked_mul(60)
            .and_then(|total| total.checked_add(minutes))
            .ok_or_else(invalid);
    }

    let hours: f64 = value.parse().map_err(|_| invalid())?;
    if !hours.is_finite() || hours < 0.0 {
        return Err(invalid());
    }
    let minutes = (hours * 60.0).round();
    if minutes > f64::from(u32::MAX) {
        return Err(invalid());
    }
    Ok(minutes as u32)
}

/// Format minutes as `H:MM`.
#[must_use]
pub fn format_hhmm(minutes: u32) -> String {
    format!("{}:{:02}", minutes / 60, minutes % 60)
}

/// Format minutes as decimal hours with two places.
#[must_use]
pub fn format_decimal(minutes: u32) -> String {
    format!("{:.2}", f64::from(minutes) / 60.0)
}
