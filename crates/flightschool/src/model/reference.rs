//! Reference datasets: ICAO aircraft types, airports and operational areas.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::error::{Error, Result};

/// ICAO wake turbulence category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WakeCategory {
    /// Light.
    L,
    /// Medium.
    M,
    /// Heavy.
    H,
    /// Super.
    J,
}

impl WakeCategory {
    /// Parse a one-letter category, or the `L/M` form used for types that
    /// straddle two categories (the heavier one wins).
    ///
    /// # Errors
    ///
    /// Returns an error for unknown categories.
    pub fn parse(raw: &str) -> Result<Self> {
        let value = raw.trim().to_ascii_uppercase();
        let heaviest = value
            .split('/')
            .map(|part| match part.trim() {
                "L" => Ok(Self::L),
                "M" => Ok(Self::M),
                "H" => Ok(Self::H),
                "J" => Ok(Self::J),
                _ => Err(Error::invalid_field(
                    "wake_category",
                    raw.trim(),
                    "expected L, M, H or J",
                )),
            })
            .collect::<Result<Vec<_>>>()?;
        heaviest
            .into_iter()
            .max_by_key(|c| *c as u8)
            .ok_or_else(|| Error::invalid_field("wake_category", raw.trim(), "empty"))
    }

    /// One-letter code.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::L => "L",
            Self::M => "M",
            Self::H => "H",
            Self::J => "J",
        }
    }
}

impl fmt::Display for WakeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn designator_regex() -> &'static Regex {
    static DESIGNATOR: OnceLock<Regex> = OnceLock::new();
    DESIGNATOR.get_or_init(|| Regex::new(r"^[A-Z][A-Z0-9]{2,3}$").expect("static regex"))
}

fn description_regex() -> &'static Regex {
    static DESCRIPTION: OnceLock<Regex> = OnceLock::new();
    // Aircraft kind, engine count, engine type: L1P, H2T, A2J ...
    DESCRIPTION.get_or_init(|| Regex::new(r"^[LSAGHT][1-8C][PTJER]$").expect("static regex"))
}

/// Uppercase and validate an ICAO type designator (`C152`, `PA28`, `B738`).
///
/// # Errors
///
/// Returns an error unless the value is 3-4 alphanumerics starting with a letter.
pub fn normalize_designator(field: &'static str, raw: &str) -> Result<String> {
    let designator = raw.trim().to_ascii_uppercase();
    if designator_regex().is_match(&designator) {
        Ok(designator)
    } else {
        Err(Error::invalid_field(
            field,
            raw.trim(),
            "expected a 3-4 character ICAO type designator",
        ))
    }
}

/// One row of the ICAO aircraft type reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IcaoAircraftType {
    /// Type designator; the natural key.
    pub designator: String,
    /// Manufacturer name.
    pub manufacturer: String,
    /// Model name.
    pub model: String,
    /// Short description such as `L1P`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Wake turbulence category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wake_category: Option<WakeCategory>,
}

impl IcaoAircraftType {
    /// Create a validated type record.
    ///
    /// # Errors
    ///
    /// Returns an error if the designator or description is malformed or the
    /// model is blank.
    pub fn new(
        designator: &str,
        manufacturer: &str,
        model: &str,
        description: Option<&str>,
        wake_category: Option<WakeCategory>,
    ) -> Result<Self> {
        let designator = normalize_designator("designator", designator)?;
        let model = model.trim();
        if model.is_empty() {
            return Err(Error::validation(format!("model is required for {designator}")));
        }
        let description = match description.map(|d| d.trim().to_ascii_uppercase()) {
            Some(d) if d.is_empty() => None,
            Some(d) if description_regex().is_match(&d) => Some(d),
            Some(d) => {
                return Err(Error::invalid_field(
                    "description",
                    d,
                    "expected kind, engine count and engine type such as L1P",
                ))
            }
            None => None,
        };
        Ok(Self {
            designator,
            manufacturer: manufacturer.trim().to_string(),
            model: model.to_string(),
            description,
            wake_category,
        })
    }
}

/// An airport or airfield from the reference dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Airport {
    /// Identifier; the natural key.
    pub ident: String,
    /// Display name.
    pub name: String,
    /// Facility kind such as `small_airport` or `heliport`.
    pub kind: String,
    /// Degrees north.
    pub latitude: f64,
    /// Degrees east.
    pub longitude: f64,
    /// Field elevation in feet.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevation_ft: Option<i32>,
    /// ISO 3166-1 alpha-2 country.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iso_country: Option<String>,
    /// Nearest town.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub municipality: Option<String>,
    /// IATA code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iata_code: Option<String>,
}

impl Airport {
    /// Check coordinates and codes.
    ///
    /// # Errors
    ///
    /// Returns an error if coordinates are out of range or a code is malformed.
    pub fn validate(&self) -> Result<()> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(Error::invalid_field(
                "latitude",
                self.latitude.to_string(),
                "must be within -90..90",
            ));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(Error::invalid_field(
                "longitude",
                self.longitude.to_string(),
                "must be within -180..180",
            ));
        }
        if self.name.trim().is_empty() {
            return Err(Error::validation(format!("name is required for {}", self.ident)));
        }
        if let Some(country) = &self.iso_country {
            if country.len() != 2 || !country.bytes().all(|b| b.is_ascii_uppercase()) {
                return Err(Error::invalid_field(
                    "iso_country",
                    country.clone(),
                    "expected two uppercase letters",
                ));
            }
        }
        if let Some(iata) = &self.iata_code {
            if iata.len() != 3 || !iata.bytes().all(|b| b.is_ascii_alphanumeric()) {
                return Err(Error::invalid_field(
                    "iata_code",
                    iata.clone(),
                    "expected three letters",
                ));
            }
        }
        Ok(())
    }
}

/// A named training or operating area around a base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationalArea {
    /// Short code; the natural key.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Home airfield identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_airfield: Option<String>,
    /// Free text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Uppercase and validate an area code.
///
/// # Errors
///
/// Returns an error unless the code is 1-16 letters, digits, `_` or `-`.
pub fn normalize_area_code(raw: &str) -> Result<String> {
    let code = raw.trim().to_ascii_uppercase();
    let valid = (1..=16).contains(&code.len())
        && code
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    if valid {
        Ok(code)
    } else {
        Err(Error::invalid_field(
            "code",
            raw.trim(),
            "expected 1-16 letters, digits, '_' or '-'",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn airport() -> Airport {
        Airport {
            ident: "LRCL".to_string(),
            name: "Cluj-Napoca International".to_string(),
            kind: "medium_airport".to_string(),
            latitude: 46.785,
            longitude: 23.686,
            elevation_ft: Some(1036),
            iso_country: Some("RO".to_string()),
            municipality: Some("Cluj-Napoca".to_string()),
            iata_code: Some("CLJ".to_string()),
        }
    }

    #[test]
    fn test_wake_category_parse() {
        assert_eq!(WakeCategory::parse("l").unwrap(), WakeCategory::L);
        assert_eq!(WakeCategory::parse("L/M").unwrap(), WakeCategory::M);
        assert_eq!(WakeCategory::parse("J").unwrap(), WakeCategory::J);
        assert!(WakeCategory::parse("X").is_err());
    }

    #[test]
    fn test_normalize_designator() {
        assert_eq!(normalize_designator("d", "c152").unwrap(), "C152");
        assert_eq!(normalize_designator("d", "PA28").unwrap(), "PA28");
        assert_eq!(normalize_designator("d", "V22").unwrap(), "V22");
        assert!(normalize_designator("d", "C1").is_err());
        assert!(normalize_designator("d", "C1525").is_err());
        assert!(normalize_designator("d", "152").is_err());
        assert!(normalize_designator("d", "C-52").is_err());
    }

    #[test]
    fn test_icao_type_new() {
        let t = IcaoAircraftType::new("c172", "Cessna", "172 Skyhawk", Some("l1p"), None).unwrap();
        assert_eq!(t.designator, "C172");
        assert_eq!(t.description.as_deref(), Some("L1P"));

        let t = IcaoAircraftType::new("C172", "Cessna", "172", Some(" "), None).unwrap();
        assert!(t.description.is_none());
    }

    #[test]
    fn test_icao_type_rejects_bad_description() {
        assert!(IcaoAircraftType::new("C172", "Cessna", "172", Some("X1P"), None).is_err());
        assert!(IcaoAircraftType::new("C172", "Cessna", "", None, None).is_err());
    }

    #[test]
    fn test_airport_validate() {
        assert!(airport().validate().is_ok());

        let mut bad = airport();
        bad.latitude = 91.0;
        assert!(bad.validate().is_err());

        let mut bad = airport();
        bad.longitude = -180.5;
        assert!(bad.validate().is_err());

        let mut bad = airport();
        bad.iso_country = Some("ROU".to_string());
        assert!(bad.validate().is_err());

        let mut bad = airport();
        bad.name = " ".to_string();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_normalize_area_code() {
        assert_eq!(normalize_area_code("tra-1").unwrap(), "TRA-1");
        assert!(normalize_area_code("").is_err());
        assert!(normalize_area_code("AREA 1").is_err());
        assert!(normalize_area_code(&"A".repeat(17)).is_err());
    }
}
