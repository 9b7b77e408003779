//! Column layouts and row parsers for each import kind.

use crate::error::{Error, Result};
use crate::flight_time::{parse_date, parse_duration, ClockTime, FlightRole, FlightTimes, Hobbs};
use crate::model::money::parse_cents;
use crate::model::reference::{normalize_area_code, normalize_designator};
use crate::model::{
    non_empty, normalize_ident, Aircraft, Airport, BillingBasis, FlightLogInput, FlightType,
    IcaoAircraftType, OperationalArea, Role, User, WakeCategory,
};

use super::table::{ColumnSpec, Fields};

pub(crate) const USER_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::required("email", &["e_mail", "mail", "email_address"]),
    ColumnSpec::required("first_name", &["firstname", "given_name", "prenume"]),
    ColumnSpec::required("last_name", &["lastname", "surname", "family_name", "nume"]),
    ColumnSpec::required("role", &["rol", "user_role"]),
    ColumnSpec::optional("phone", &["telephone", "mobile", "telefon"]),
    ColumnSpec::optional("license_number", &["license", "licence", "licence_number"]),
];

pub(crate) const AIRCRAFT_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::required("registration", &["reg", "aircraft", "callsign", "tail_number"]),
    ColumnSpec::required("model", &["aircraft_model", "type_name"]),
    ColumnSpec::required("hourly_rate", &["rate", "price_per_hour", "hourly_price"]),
    ColumnSpec::optional("icao_type", &["icao", "type_designator", "designator"]),
    ColumnSpec::optional("billing_basis", &["billing", "billed_on"]),
    ColumnSpec::optional("active", &["is_active", "enabled"]),
];

pub(crate) const ICAO_TYPE_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::required("designator", &["type_designator", "icao_code", "icao", "tdesig"]),
    ColumnSpec::required("manufacturer", &["manufacturer_code", "manufacturer_name"]),
    ColumnSpec::required("model", &["model_full_name", "model_name", "modelfullname"]),
    ColumnSpec::optional("description", &["aircraft_description", "desc"]),
    ColumnSpec::optional("wake_category", &["wtc", "wake_turbulence_category", "wake"]),
];

pub(crate) const AIRPORT_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::required("ident", &["icao", "icao_code", "gps_code"]),
    ColumnSpec::required("name", &["airport_name"]),
    ColumnSpec::required("latitude", &["latitude_deg", "lat"]),
    ColumnSpec::required("longitude", &["longitude_deg", "lon", "lng"]),
    ColumnSpec::optional("kind", &["type", "airport_type"]),
    ColumnSpec::optional("elevation_ft", &["elevation", "elev"]),
    ColumnSpec::optional("iso_country", &["country", "country_code"]),
    ColumnSpec::optional("municipality", &["city", "town"]),
    ColumnSpec::optional("iata_code", &["iata"]),
];

pub(crate) const AREA_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::required("code", &["area_code", "area"]),
    ColumnSpec::required("name", &["area_name"]),
    ColumnSpec::optional("base_airfield", &["base", "airfield", "home_base"]),
    ColumnSpec::optional("description", &["notes", "remarks"]),
];

pub(crate) const FLIGHT_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::required("date", &["flight_date", "day"]),
    ColumnSpec::required("pilot_email", &["pilot", "email", "student"]),
    ColumnSpec::required("aircraft", &["aircraft_registration", "registration", "reg"]),
    ColumnSpec::required("departure", &["from", "dep", "origin"]),
    ColumnSpec::required("arrival", &["to", "arr", "destination"]),
    ColumnSpec::required("off_block", &["block_off", "out", "chocks_off"]),
    ColumnSpec::required("on_block", &["block_on", "in", "chocks_on"]),
    ColumnSpec::required("role", &["function", "capacity", "pilot_function"]),
    ColumnSpec::optional("instructor_email", &["instructor", "fi"]),
    ColumnSpec::optional("takeoff", &["take_off", "takeoff_time", "off"]),
    ColumnSpec::optional("landing", &["landing_time", "touchdown", "on"]),
    ColumnSpec::optional("hobbs_start", &["hobbs_out", "hobbs_begin"]),
    ColumnSpec::optional("hobbs_end", &["hobbs_in", "hobbs_stop"]),
    ColumnSpec::optional("landings_day", &["landings", "day_landings", "ldg_day"]),
    ColumnSpec::optional("landings_night", &["night_landings", "ldg_night"]),
    ColumnSpec::optional("flight_type", &["type", "purpose", "mission"]),
    ColumnSpec::optional("night", &["night_time", "night_minutes"]),
    ColumnSpec::optional("ifr", &["ifr_time", "instrument", "instrument_time"]),
    ColumnSpec::optional("remarks", &["notes", "comment", "comments"]),
];

fn parse_bool(field: &'static str, raw: Option<&str>) -> Result<bool> {
    match raw.map(str::to_ascii_lowercase).as_deref() {
        None | Some("1" | "true" | "yes" | "y" | "da") => Ok(true),
        Some("0" | "false" | "no" | "n" | "nu") => Ok(false),
        Some(other) => Err(Error::invalid_field(field, other, "expected yes or no")),
    }
}

fn parse_count(field: &'static str, raw: Option<&str>) -> Result<u32> {
    raw.map_or(Ok(0), |value| {
        value
            .parse()
            .map_err(|_| Error::invalid_field(field, value, "expected a whole number"))
    })
}

fn parse_float(field: &'static str, raw: &str) -> Result<f64> {
    raw.replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| Error::invalid_field(field, raw, "expected a number"))
}

pub(crate) fn parse_user(fields: &Fields<'_>) -> Result<User> {
    let role = Role::parse(fields.require("role")?)?;
    let mut user = User::new(
        fields.require("email")?,
        fields.or_empty("first_name"),
        fields.or_empty("last_name"),
        role,
    )?;
    user.phone = fields.get("phone").and_then(non_empty);
    user.license_number = fields.get("license_number").and_then(non_empty);
    Ok(user)
}

pub(crate) fn parse_aircraft(fields: &Fields<'_>) -> Result<Aircraft> {
    let rate = parse_cents("hourly_rate", fields.require("hourly_rate")?)?;
    let mut aircraft = Aircraft::new(
        fields.require("registration")?,
        fields.require("model")?,
        rate,
    )?;
    aircraft.icao_type = fields
        .get("icao_type")
        .map(|t| normalize_designator("icao_type", t))
        .transpose()?;
    aircraft.billing_basis = BillingBasis::parse(fields.or_empty("billing_basis"))?;
    aircraft.active = parse_bool("active", fields.get("active"))?;
    Ok(aircraft)
}

pub(crate) fn parse_icao_type(fields: &Fields<'_>) -> Result<IcaoAircraftType> {
    let wake = fields
        .get("wake_category")
        .map(WakeCategory::parse)
        .transpose()?;
    IcaoAircraftType::new(
        fields.require("designator")?,
        fields.or_empty("manufacturer"),
        fields.require("model")?,
        fields.get("description"),
        wake,
    )
}

pub(crate) fn parse_airport(fields: &Fields<'_>) -> Result<Airport> {
    let elevation_ft = fields
        .get("elevation_ft")
        .map(|raw| {
            raw.parse::<i32>()
                .map_err(|_| Error::invalid_field("elevation_ft", raw, "expected whole feet"))
        })
        .transpose()?;

    let airport = Airport {
        ident: normalize_ident("ident", fields.require("ident")?)?,
        name: fields.require("name")?.to_string(),
        kind: fields.get("kind").unwrap_or("airfield").to_string(),
        latitude: parse_float("latitude", fields.require("latitude")?)?,
        longitude: parse_float("longitude", fields.require("longitude")?)?,
        elevation_ft,
        iso_country: fields.get("iso_country").map(str::to_ascii_uppercase),
        municipality: fields.get("municipality").and_then(non_empty),
        iata_code: fields.get("iata_code").map(str::to_ascii_uppercase),
    };
    airport.validate()?;
    Ok(airport)
}

pub(crate) fn parse_area(fields: &Fields<'_>) -> Result<OperationalArea> {
    Ok(OperationalArea {
        code: normalize_area_code(fields.require("code")?)?,
        name: fields.require("name")?.to_string(),
        base_airfield: fields
            .get("base_airfield")
            .map(|a| normalize_ident("base_airfield", a))
            .transpose()?,
        description: fields.get("description").and_then(non_empty),
    })
}

/// Parse the entered values of a flight log row. Derivation and crew rules
/// are applied later by [`crate::model::FlightLog::new`].
pub(crate) fn parse_flight(fields: &Fields<'_>) -> Result<FlightLogInput> {
    let clock = |column: &'static str| fields.get(column).map(ClockTime::parse).transpose();

    let hobbs = match (fields.get("hobbs_start"), fields.get("hobbs_end")) {
        (None, None) => None,
        (Some(start), Some(end)) => Some(Hobbs::new(
            parse_float("hobbs_start", start)?,
            parse_float("hobbs_end", end)?,
        )?),
        _ => {
            return Err(Error::validation(
                "hobbs_start and hobbs_end must be given together",
            ))
        }
    };

    let mut landings_day = parse_count("landings_day", fields.get("landings_day"))?;
    let landings_night = parse_count("landings_night", fields.get("landings_night"))?;
    if fields.get("landings_day").is_none() && fields.get("landings_night").is_none() {
        landings_day = 1;
    }

    Ok(FlightLogInput {
        date: parse_date(fields.require("date")?)?,
        pilot_email: fields.require("pilot_email")?.to_string(),
        instructor_email: fields.get("instructor_email").map(str::to_string),
        aircraft_registration: fields.require("aircraft")?.to_string(),
        departure: fields.require("departure")?.to_string(),
        arrival: fields.require("arrival")?.to_string(),
        times: FlightTimes {
            off_block: ClockTime::parse(fields.require("off_block")?)?,
            takeoff: clock("takeoff")?,
            landing: clock("landing")?,
            on_block: ClockTime::parse(fields.require("on_block")?)?,
        },
        hobbs,
        landings_day,
        landings_night,
        role: FlightRole::parse(fields.require("role")?)?,
        flight_type: FlightType::parse(fields.or_empty("flight_type"))?,
        night_minutes: parse_duration(fields.or_empty("night"))?,
        ifr_minutes: parse_duration(fields.or_empty("ifr"))?,
        remarks: fields.get("remarks").and_then(non_empty),
    })
}
