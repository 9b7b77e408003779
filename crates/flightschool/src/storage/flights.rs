//! Flight log persistence, filtering and logbook totals.

use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::flight_time::{ClockTime, FlightRole, FlightTimes, Hobbs, HourCategories};
use crate::model::{FlightLog, FlightType};

use super::{corrupt_column, Storage};

const FLIGHT_COLUMNS: &str = r"
    id, fingerprint, date, pilot_email, instructor_email, aircraft_registration,
    departure, arrival, off_block, takeoff, landing, on_block, hobbs_start, hobbs_end,
    landings_day, landings_night, role, flight_type, remarks, block_minutes,
    airborne_minutes, pic_minutes, dual_minutes, instructor_minutes, solo_minutes,
    night_minutes, ifr_minutes, invoice_id
";

/// Criteria for [`Storage::list_flights`]. Empty fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlightFilter {
    /// Logging pilot email.
    pub pilot: Option<String>,
    /// Aircraft registration.
    pub aircraft: Option<String>,
    /// First date, inclusive.
    pub from: Option<NaiveDate>,
    /// Last date, inclusive.
    pub to: Option<NaiveDate>,
    /// Only legs not yet on an invoice.
    pub unbilled_only: bool,
    /// Maximum number of rows.
    pub limit: Option<usize>,
}

impl FlightFilter {
    /// Build the `WHERE` clause and its bound values.
    fn to_sql(&self) -> (String, Vec<Value>) {
        let mut clauses = Vec::new();
        let mut values = Vec::new();

        if let Some(pilot) = &self.pilot {
            values.push(Value::Text(pilot.clone()));
            clauses.push(format!("pilot_email = ?{}", values.len()));
        }
        if let Some(aircraft) = &self.aircraft {
            values.push(Value::Text(aircraft.clone()));
            clauses.push(format!("aircraft_registration = ?{}", values.len()));
        }
        if let Some(from) = self.from {
            values.push(Value::Text(from.to_string()));
            clauses.push(format!("date >= ?{}", values.len()));
        }
        if let Some(to) = self.to {
            values.push(Value::Text(to.to_string()));
            clauses.push(format!("date <= ?{}", values.len()));
        }
        if self.unbilled_only {
            clauses.push("invoice_id IS NULL".to_string());
        }

        let mut sql = String::new();
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        (sql, values)
    }
}

/// A pilot's summed logbook columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PilotTotals {
    /// Pilot email.
    pub pilot_email: String,
    /// Number of legs.
    pub flights: u32,
    /// Day plus night landings.
    pub landings: u32,
    /// Summed hour columns, in minutes.
    pub categories: HourCategories,
}

impl Storage {
    /// Check if a leg with this fingerprint is already stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn flight_exists(&self, fingerprint: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM flight_logs WHERE fingerprint = ?1",
            [fingerprint],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Insert a validated leg and return its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the fingerprint already exists or the database
    /// operation fails.
    pub fn insert_flight(&self, log: &FlightLog) -> Result<i64> {
        let c = &log.categories;
        self.conn.execute(
            &format!(
                r"
                INSERT INTO flight_logs ({FLIGHT_COLUMNS})
                VALUES (NULL, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                    ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, NULL)
                "
            ),
            params![
                log.fingerprint,
                log.date.to_string(),
                log.pilot_email,
                log.instructor_email,
                log.aircraft_registration,
                log.departure,
                log.arrival,
                log.times.off_block.to_string(),
                log.times.takeoff.map(|t| t.to_string()),
                log.times.landing.map(|t| t.to_string()),
                log.times.on_block.to_string(),
                log.hobbs.map(|h| h.start),
                log.hobbs.map(|h| h.end),
                log.landings_day,
                log.landings_night,
                log.role.as_str(),
                log.flight_type.as_str(),
                log.remarks,
                c.block,
                c.airborne,
                c.pic,
                c.dual,
                c.instructor,
                c.solo,
                c.night,
                c.ifr,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(
            "Inserted flight {} {} {} with id {}",
            log.date, log.aircraft_registration, log.times.off_block, id
        );
        Ok(id)
    }

    /// Overwrite the stored leg with the same fingerprint.
    ///
    /// Billed legs are left untouched. Returns `true` if a row was updated.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn update_flight(&self, log: &FlightLog) -> Result<bool> {
        let c = &log.categories;
        let affected = self.conn.execute(
            r"
            UPDATE flight_logs SET instructor_email = ?2, departure = ?3, arrival = ?4,
                takeoff = ?5, landing = ?6, on_block = ?7, hobbs_start = ?8, hobbs_end = ?9,
                landings_day = ?10, landings_night = ?11, role = ?12, flight_type = ?13,
                remarks = ?14, block_minutes = ?15, airborne_minutes = ?16, pic_minutes = ?17,
                dual_minutes = ?18, instructor_minutes = ?19, solo_minutes = ?20,
                night_minutes = ?21, ifr_minutes = ?22
            WHERE fingerprint = ?1 AND invoice_id IS NULL
            ",
            params![
                log.fingerprint,
                log.instructor_email,
                log.departure,
                log.arrival,
                log.times.takeoff.map(|t| t.to_string()),
                log.times.landing.map(|t| t.to_string()),
                log.times.on_block.to_string(),
                log.hobbs.map(|h| h.start),
                log.hobbs.map(|h| h.end),
                log.landings_day,
                log.landings_night,
                log.role.as_str(),
                log.flight_type.as_str(),
                log.remarks,
                c.block,
                c.airborne,
                c.pic,
                c.dual,
                c.instructor,
                c.solo,
                c.night,
                c.ifr,
            ],
        )?;
        Ok(affected > 0)
    }

    /// Get a leg by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_flight(&self, id: i64) -> Result<Option<FlightLog>> {
        let log = self
            .conn
            .query_row(
                &format!("SELECT {FLIGHT_COLUMNS} FROM flight_logs WHERE id = ?1"),
                [id],
                Self::row_to_flight,
            )
            .optional()?;
        Ok(log)
    }

    /// Get a leg by fingerprint.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_flight_by_fingerprint(&self, fingerprint: &str) -> Result<Option<FlightLog>> {
        let log = self
            .conn
            .query_row(
                &format!("SELECT {FLIGHT_COLUMNS} FROM flight_logs WHERE fingerprint = ?1"),
                [fingerprint],
                Self::row_to_flight,
            )
            .optional()?;
        Ok(log)
    }

    /// List legs matching `filter`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_flights(&self, filter: &FlightFilter) -> Result<Vec<FlightLog>> {
        let (where_clause, values) = filter.to_sql();
        let mut sql = format!(
            "SELECT {FLIGHT_COLUMNS} FROM flight_logs{where_clause} ORDER BY date, off_block, id"
        );
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let flights = stmt
            .query_map(params_from_iter(values), Self::row_to_flight)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(flights)
    }

    /// A pilot's legs in `[from, to]` that are not on any invoice yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn unbilled_flights(
        &self,
        pilot_email: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<FlightLog>> {
        self.list_flights(&FlightFilter {
            pilot: Some(pilot_email.to_string()),
            from: Some(from),
            to: Some(to),
            unbilled_only: true,
            ..FlightFilter::default()
        })
    }

    /// Sum the logbook columns for one pilot.
    ///
    /// A pilot with no legs gets all-zero totals.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn pilot_totals(&self, pilot_email: &str) -> Result<PilotTotals> {
        let totals = self.conn.query_row(
            r"
            SELECT COUNT(*),
                COALESCE(SUM(landings_day + landings_night), 0),
                COALESCE(SUM(block_minutes), 0), COALESCE(SUM(airborne_minutes), 0),
                COALESCE(SUM(pic_minutes), 0), COALESCE(SUM(dual_minutes), 0),
                COALESCE(SUM(instructor_minutes), 0), COALESCE(SUM(solo_minutes), 0),
                COALESCE(SUM(night_minutes), 0), COALESCE(SUM(ifr_minutes), 0)
            FROM flight_logs WHERE pilot_email = ?1
            ",
            [pilot_email],
            |row| {
                Ok(PilotTotals {
                    pilot_email: pilot_email.to_string(),
                    flights: row.get(0)?,
                    landings: row.get(1)?,
                    categories: HourCategories {
                        block: row.get(2)?,
                        airborne: row.get(3)?,
                        pic: row.get(4)?,
                        dual: row.get(5)?,
                        instructor: row.get(6)?,
                        solo: row.get(7)?,
                        night: row.get(8)?,
                        ifr: row.get(9)?,
                    },
                })
            },
        )?;
        Ok(totals)
    }

    /// Attach legs to an invoice, or detach them with `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn set_flight_invoice(&self, flight_ids: &[i64], invoice_id: Option<i64>) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare("UPDATE flight_logs SET invoice_id = ?2 WHERE id = ?1")?;
        for id in flight_ids {
            stmt.execute(params![id, invoice_id])?;
        }
        Ok(())
    }

    /// Detach every leg from `invoice_id`, returning how many were released.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn release_flights(&self, invoice_id: i64) -> Result<usize> {
        let released = self.conn.execute(
            "UPDATE flight_logs SET invoice_id = NULL WHERE invoice_id = ?1",
            [invoice_id],
        )?;
        Ok(released)
    }

    fn row_to_flight(row: &Row) -> rusqlite::Result<FlightLog> {
        let clock = |index: usize| -> rusqlite::Result<ClockTime> {
            let raw: String = row.get(index)?;
            ClockTime::parse(&raw).map_err(|e| corrupt_column(index, e.to_string()))
        };
        let optional_clock = |index: usize| -> rusqlite::Result<Option<ClockTime>> {
            let raw: Option<String> = row.get(index)?;
            raw.map(|r| ClockTime::parse(&r))
                .transpose()
                .map_err(|e| corrupt_column(index, e.to_string()))
        };

        let date: String = row.get(2)?;
        let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
            .map_err(|e| corrupt_column(2, e.to_string()))?;

        let hobbs_start: Option<f64> = row.get(12)?;
        let hobbs_end: Option<f64> = row.get(13)?;
        let hobbs = match (hobbs_start, hobbs_end) {
            (Some(start), Some(end)) => {
                Some(Hobbs::new(start, end).map_err(|e| corrupt_column(12, e.to_string()))?)
            }
            _ => None,
        };

        let role: String = row.get(16)?;
        let flight_type: String = row.get(17)?;

        Ok(FlightLog {
            id: Some(row.get(0)?),
            fingerprint: row.get(1)?,
            date,
            pilot_email: row.get(3)?,
            instructor_email: row.get(4)?,
            aircraft_registration: row.get(5)?,
            departure: row.get(6)?,
            arrival: row.get(7)?,
            times: FlightTimes {
                off_block: clock(8)?,
                takeoff: optional_clock(9)?,
                landing: optional_clock(10)?,
                on_block: clock(11)?,
            },
            hobbs,
            landings_day: row.get(14)?,
            landings_night: row.get(15)?,
            role: FlightRole::parse(&role).map_err(|e| corrupt_column(16, e.to_string()))?,
            flight_type: FlightType::parse(&flight_type)
                .map_err(|e| corrupt_column(17, e.to_string()))?,
            remarks: row.get(18)?,
            categories: HourCategories {
                block: row.get(19)?,
                airborne: row.get(20)?,
                pic: row.get(21)?,
                dual: row.get(22)?,
                instructor: row.get(23)?,
                solo: row.get(24)?,
                night: row.get(25)?,
                ifr: row.get(26)?,
            },
            invoice_id: row.get(27)?,
        })
    }
}
