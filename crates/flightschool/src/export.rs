//! Flight-log CSV export.
//!
//! The leading columns use the canonical import names, so an exported file
//! can be fed back through [`crate::import::Importer`]. The trailing derived
//! columns are ignored on import.

use std::io::Write;

use csv::WriterBuilder;
use tracing::{debug, info};

use crate::error::Result;
use crate::flight_time::format_hhmm;
use crate::model::FlightLog;
use crate::storage::{FlightFilter, Storage};

const HEADER: [&str; 25] = [
    "date",
    "pilot_email",
    "instructor_email",
    "aircraft",
    "departure",
    "arrival",
    "off_block",
    "takeoff",
    "landing",
    "on_block",
    "hobbs_start",
    "hobbs_end",
    "landings_day",
    "landings_night",
    "role",
    "flight_type",
    "night",
    "ifr",
    "remarks",
    "block_time",
    "airborne_time",
    "pic_time",
    "dual_time",
    "instructor_time",
    "solo_time",
];

/// Write every flight matching `filter` to `writer` as CSV.
///
/// Returns the number of data rows written.
///
/// # Errors
///
/// Returns an error if the query fails or the writer cannot be written to.
pub fn export_flights<W: Write>(
    storage: &Storage,
    filter: &FlightFilter,
    writer: W,
) -> Result<usize> {
    let flights = storage.list_flights(filter)?;
    debug!("Exporting {} flights with {:?}", flights.len(), filter);

    let mut out = WriterBuilder::new().from_writer(writer);
    out.write_record(HEADER)?;
    for log in &flights {
        out.write_record(record(log))?;
    }
    out.flush()?;

    info!("Exported {} flights", flights.len());
    Ok(flights.len())
}

fn record(log: &FlightLog) -> Vec<String> {
    let optional = |value: Option<String>| value.unwrap_or_default();
    let hours = &log.categories;

    vec![
        log.date.to_string(),
        log.pilot_email.clone(),
        optional(log.instructor_email.clone()),
        log.aircraft_registration.clone(),
        log.departure.clone(),
        log.arrival.clone(),
        log.times.off_block.to_string(),
        optional(log.times.takeoff.map(|t| t.to_string())),
        optional(log.times.landing.map(|t| t.to_string())),
        log.times.on_block.to_string(),
        optional(log.hobbs.map(|h| h.start.to_string())),
        optional(log.hobbs.map(|h| h.end.to_string())),
        log.landings_day.to_string(),
        log.landings_night.to_string(),
        log.role.to_string(),
        log.flight_type.to_string(),
        format_hhmm(hours.night),
        format_hhmm(hours.ifr),
        optional(log.remarks.clone()),
        format_hhmm(hours.block),
        format_hhmm(hours.airborne),
        format_hhmm(hours.pic),
        format_hhmm(hours.dual),
        format_hhmm(hours.instructor),
        format_hhmm(hours.solo),
    ]
}
