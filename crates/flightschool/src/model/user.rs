//! School members and their roles.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::error::{Error, Result};

/// What a member is allowed to do at the school.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full access.
    Admin,
    /// Base manager: fleet and scheduling for one base.
    BaseManager,
    /// Flight instructor.
    Instructor,
    /// Student pilot.
    Student,
    /// Licensed member renting aircraft.
    Pilot,
}

impl Role {
    /// Parse a role string, case-insensitively, with the aliases found in
    /// member exports.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown roles.
    pub fn parse(raw: &str) -> Result<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "admin" | "administrator" | "superadmin" => Ok(Self::Admin),
            "base_manager" | "manager" => Ok(Self::BaseManager),
            "instructor" | "fi" | "flight_instructor" => Ok(Self::Instructor),
            "student" | "trainee" => Ok(Self::Student),
            "pilot" | "member" | "renter" => Ok(Self::Pilot),
            _ => Err(Error::invalid_field(
                "role",
                raw.trim(),
                "expected admin, base_manager, instructor, student or pilot",
            )),
        }
    }

    /// Canonical name as stored.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::BaseManager => "base_manager",
            Self::Instructor => "instructor",
            Self::Student => "student",
            Self::Pilot => "pilot",
        }
    }

    /// Whether a member with this role may sign as instructor on a dual flight.
    #[must_use]
    pub fn can_instruct(self) -> bool {
        matches!(self, Self::Instructor | Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[a-z0-9._%+-]+@[a-z0-9-]+(\.[a-z0-9-]+)*\.[a-z]{2,}$").expect("static regex")
    })
}

/// Lowercase and validate an email address.
///
/// # Errors
///
/// Returns an error if the address is not of the form `local@domain.tld`.
pub fn normalize_email(field: &'static str, raw: &str) -> Result<String> {
    let email = raw.trim().to_ascii_lowercase();
    if email_regex().is_match(&email) {
        Ok(email)
    } else {
        Err(Error::invalid_field(field, raw.trim(), "not a valid email address"))
    }
}

/// A school member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    /// Row id, assigned by storage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Lowercase email; the natural key.
    pub email: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Access role.
    pub role: Role,
    /// Contact phone.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Pilot licence number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,
}

impl User {
    /// Create a validated member record.
    ///
    /// # Errors
    ///
    /// Returns an error if the email is invalid or a name is blank.
    pub fn new(email: &str, first_name: &str, last_name: &str, role: Role) -> Result<Self> {
        let email = normalize_email("email", email)?;
        let first_name = first_name.trim();
        let last_name = last_name.trim();
        if first_name.is_empty() || last_name.is_empty() {
            return Err(Error::validation(format!(
                "first and last name are required for {email}"
            )));
        }
        Ok(Self {
            id: None,
            email,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            role,
            phone: None,
            license_number: None,
        })
    }

    /// `First Last`.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
