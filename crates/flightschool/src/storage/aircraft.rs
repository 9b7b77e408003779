//! Fleet table.

use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use crate::error::Result;
use crate::model::{Aircraft, BillingBasis};

use super::{corrupt_column, Storage};

const AIRCRAFT_COLUMNS: &str =
    "id, registration, icao_type, model, hourly_rate_cents, billing_basis, active";

impl Storage {
    /// Check if an aircraft with this registration exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn aircraft_exists(&self, registration: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM aircraft WHERE registration = ?1",
            [registration],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Insert a new aircraft and return its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the registration already exists or the database
    /// operation fails.
    pub fn insert_aircraft(&self, aircraft: &Aircraft) -> Result<i64> {
        self.conn.execute(
            r"
            INSERT INTO aircraft (registration, icao_type, model, hourly_rate_cents,
                billing_basis, active)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
            params![
                aircraft.registration,
                aircraft.icao_type,
                aircraft.model,
                aircraft.hourly_rate_cents,
                aircraft.billing_basis.as_str(),
                aircraft.active,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!("Inserted aircraft {} with id {}", aircraft.registration, id);
        Ok(id)
    }

    /// Overwrite an aircraft's details, keyed by registration.
    ///
    /// Returns `true` if a row was updated.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn update_aircraft(&self, aircraft: &Aircraft) -> Result<bool> {
        let affected = self.conn.execute(
            r"
            UPDATE aircraft SET icao_type = ?2, model = ?3, hourly_rate_cents = ?4,
                billing_basis = ?5, active = ?6
            WHERE registration = ?1
            ",
            params![
                aircraft.registration,
                aircraft.icao_type,
                aircraft.model,
                aircraft.hourly_rate_cents,
                aircraft.billing_basis.as_str(),
                aircraft.active,
            ],
        )?;
        Ok(affected > 0)
    }

    /// Get an aircraft by registration.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_aircraft(&self, registration: &str) -> Result<Option<Aircraft>> {
        let aircraft = self
            .conn
            .query_row(
                &format!("SELECT {AIRCRAFT_COLUMNS} FROM aircraft WHERE registration = ?1"),
                [registration],
                Self::row_to_aircraft,
            )
            .optional()?;
        Ok(aircraft)
    }

    /// List the fleet ordered by registration.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_aircraft(&self) -> Result<Vec<Aircraft>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {AIRCRAFT_COLUMNS} FROM aircraft ORDER BY registration"
        ))?;
        let fleet = stmt
            .query_map([], Self::row_to_aircraft)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(fleet)
    }

    fn row_to_aircraft(row: &Row) -> rusqlite::Result<Aircraft> {
        let basis: String = row.get(5)?;
        Ok(Aircraft {
            id: Some(row.get(0)?),
            registration: row.get(1)?,
            icao_type: row.get(2)?,
            model: row.get(3)?,
            hourly_rate_cents: row.get(4)?,
            billing_basis: BillingBasis::parse(&basis)
                .map_err(|e| corrupt_column(5, e.to_string()))?,
            active: row.get(6)?,
        })
    }
}
