//! Reference tables: ICAO types, airports, operational areas.
//!
//! These are bulk datasets, so writes are upserts keyed on the natural key.

use rusqlite::{params, OptionalExtension, Row};

use crate::error::Result;
use crate::model::{Airport, IcaoAircraftType, OperationalArea, WakeCategory};

use super::{corrupt_column, Storage};

const AIRPORT_COLUMNS: &str = "ident, name, kind, latitude, longitude, elevation_ft, \
    iso_country, municipality, iata_code";

impl Storage {
    /// Check if an ICAO type designator is known.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn icao_type_exists(&self, designator: &str) -> Result<bool> {
        self.key_exists("icao_types", "designator", designator)
    }

    /// Insert or replace an ICAO type.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn upsert_icao_type(&self, icao: &IcaoAircraftType) -> Result<()> {
        self.conn.execute(
            r"
            INSERT INTO icao_types (designator, manufacturer, model, description, wake_category)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(designator) DO UPDATE SET manufacturer = excluded.manufacturer,
                model = excluded.model, description = excluded.description,
                wake_category = excluded.wake_category
            ",
            params![
                icao.designator,
                icao.manufacturer,
                icao.model,
                icao.description,
                icao.wake_category.map(WakeCategory::as_str),
            ],
        )?;
        Ok(())
    }

    /// Get an ICAO type by designator.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_icao_type(&self, designator: &str) -> Result<Option<IcaoAircraftType>> {
        let icao = self
            .conn
            .query_row(
                r"
                SELECT designator, manufacturer, model, description, wake_category
                FROM icao_types WHERE designator = ?1
                ",
                [designator],
                Self::row_to_icao_type,
            )
            .optional()?;
        Ok(icao)
    }

    /// List ICAO types ordered by designator.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_icao_types(&self) -> Result<Vec<IcaoAircraftType>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT designator, manufacturer, model, description, wake_category
            FROM icao_types ORDER BY designator
            ",
        )?;
        let types = stmt
            .query_map([], Self::row_to_icao_type)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(types)
    }

    fn row_to_icao_type(row: &Row) -> rusqlite::Result<IcaoAircraftType> {
        let wake: Option<String> = row.get(4)?;
        Ok(IcaoAircraftType {
            designator: row.get(0)?,
            manufacturer: row.get(1)?,
            model: row.get(2)?,
            description: row.get(3)?,
            wake_category: wake
                .map(|w| WakeCategory::parse(&w))
                .transpose()
                .map_err(|e| corrupt_column(4, e.to_string()))?,
        })
    }

    /// Check if an airport identifier is known.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn airport_exists(&self, ident: &str) -> Result<bool> {
        self.key_exists("airports", "ident", ident)
    }

    /// Insert or replace an airport.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn upsert_airport(&self, airport: &Airport) -> Result<()> {
        self.conn.execute(
            r"
            INSERT INTO airports (ident, name, kind, latitude, longitude, elevation_ft,
                iso_country, municipality, iata_code)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(ident) DO UPDATE SET name = excluded.name, kind = excluded.kind,
                latitude = excluded.latitude, longitude = excluded.longitude,
                elevation_ft = excluded.elevation_ft, iso_country = excluded.iso_country,
                municipality = excluded.municipality, iata_code = excluded.iata_code
            ",
            params![
                airport.ident,
                airport.name,
                airport.kind,
                airport.latitude,
                airport.longitude,
                airport.elevation_ft,
                airport.iso_country,
                airport.municipality,
                airport.iata_code,
            ],
        )?;
        Ok(())
    }

    /// Get an airport by identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_airport(&self, ident: &str) -> Result<Option<Airport>> {
        let airport = self
            .conn
            .query_row(
                &format!("SELECT {AIRPORT_COLUMNS} FROM airports WHERE ident = ?1"),
                [ident],
                Self::row_to_airport,
            )
            .optional()?;
        Ok(airport)
    }

    /// List airports ordered by identifier, optionally restricted to one
    /// ISO country code.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_airports(&self, iso_country: Option<&str>) -> Result<Vec<Airport>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {AIRPORT_COLUMNS} FROM airports
             WHERE ?1 IS NULL OR iso_country = ?1
             ORDER BY ident"
        ))?;
        let airports = stmt
            .query_map([iso_country], Self::row_to_airport)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(airports)
    }

    fn row_to_airport(row: &Row) -> rusqlite::Result<Airport> {
        Ok(Airport {
            ident: row.get(0)?,
            name: row.get(1)?,
            kind: row.get(2)?,
            latitude: row.get(3)?,
            longitude: row.get(4)?,
            elevation_ft: row.get(5)?,
            iso_country: row.get(6)?,
            municipality: row.get(7)?,
            iata_code: row.get(8)?,
        })
    }

    /// Check if an area code is known.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn area_exists(&self, code: &str) -> Result<bool> {
        self.key_exists("areas", "code", code)
    }

    /// Insert or replace an operational area.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn upsert_area(&self, area: &OperationalArea) -> Result<()> {
        self.conn.execute(
            r"
            INSERT INTO areas (code, name, base_airfield, description)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(code) DO UPDATE SET name = excluded.name,
                base_airfield = excluded.base_airfield, description = excluded.description
            ",
            params![area.code, area.name, area.base_airfield, area.description],
        )?;
        Ok(())
    }

    /// Get an operational area by code.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_area(&self, code: &str) -> Result<Option<OperationalArea>> {
        let area = self
            .conn
            .query_row(
                "SELECT code, name, base_airfield, description FROM areas WHERE code = ?1",
                [code],
                Self::row_to_area,
            )
            .optional()?;
        Ok(area)
    }

    /// List operational areas ordered by code.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_areas(&self) -> Result<Vec<OperationalArea>> {
        let mut stmt = self
            .conn
            .prepare("SELECT code, name, base_airfield, description FROM areas ORDER BY code")?;
        let areas = stmt
            .query_map([], Self::row_to_area)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(areas)
    }

    fn row_to_area(row: &Row) -> rusqlite::Result<OperationalArea> {
        Ok(OperationalArea {
            code: row.get(0)?,
            name: row.get(1)?,
            base_airfield: row.get(2)?,
            description: row.get(3)?,
        })
    }

    /// Equality lookup on a natural key column.
    fn key_exists(&self, table: &'static str, column: &'static str, key: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {table} WHERE {column} = ?1"),
            [key],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> Storage {
        Storage::open_in_memory().expect("failed to create test storage")
    }

    #[test]
    fn test_upsert_icao_type() {
        let storage = storage();
        let mut icao =
            IcaoAircraftType::new("C152", "Cessna", "152", Some("L1P"), Some(WakeCategory::L))
                .unwrap();
        storage.upsert_icao_type(&icao).unwrap();
        assert!(storage.icao_type_exists("C152").unwrap());

        icao.model = "152 Aerobat".to_string();
        storage.upsert_icao_type(&icao).unwrap();

        let stored = storage.get_icao_type("C152").unwrap().unwrap();
        assert_eq!(stored.model, "152 Aerobat");
        assert_eq!(stored.wake_category, Some(WakeCategory::L));
        assert_eq!(storage.stats().unwrap().icao_types, 1);
    }

    #[test]
    fn test_list_icao_types_sorted() {
        let storage = storage();
        for designator in ["P28A", "C152", "DA40"] {
            let icao = IcaoAircraftType::new(designator, "Maker", "Model", None, None).unwrap();
            storage.upsert_icao_type(&icao).unwrap();
        }

        let designators: Vec<String> = storage
            .list_icao_types()
            .unwrap()
            .into_iter()
            .map(|t| t.designator)
            .collect();
        assert_eq!(designators, vec!["C152", "DA40", "P28A"]);
    }

    fn airport(ident: &str, country: Option<&str>) -> Airport {
        Airport {
            ident: ident.to_string(),
            name: format!("{ident} field"),
            kind: "small_airport".to_string(),
            latitude: 45.0,
            longitude: 25.0,
            elevation_ft: None,
            iso_country: country.map(str::to_string),
            municipality: None,
            iata_code: None,
        }
    }

    #[test]
    fn test_list_airports_by_country() {
        let storage = storage();
        storage.upsert_airport(&airport("LRTM", Some("RO"))).unwrap();
        storage.upsert_airport(&airport("LHBP", Some("HU"))).unwrap();
        storage.upsert_airport(&airport("LRCL", Some("RO"))).unwrap();
        storage.upsert_airport(&airport("ZZ01", None)).unwrap();

        let all = storage.list_airports(None).unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].ident, "LHBP");

        let romanian: Vec<String> = storage
            .list_airports(Some("RO"))
            .unwrap()
            .into_iter()
            .map(|a| a.ident)
            .collect();
        assert_eq!(romanian, vec!["LRCL", "LRTM"]);
        assert!(storage.list_airports(Some("DE")).unwrap().is_empty());
    }

    #[test]
    fn test_upsert_airport() {
        let storage = storage();
        let airport = Airport {
            ident: "LRCL".to_string(),
            name: "Cluj".to_string(),
            kind: "medium_airport".to_string(),
            latitude: 46.785,
            longitude: 23.686,
            elevation_ft: Some(1036),
            iso_country: Some("RO".to_string()),
            municipality: None,
            iata_code: Some("CLJ".to_string()),
        };
        storage.upsert_airport(&airport).unwrap();
        assert!(storage.airport_exists("LRCL").unwrap());
        assert!(!storage.airport_exists("LROP").unwrap());

        let stored = storage.get_airport("LRCL").unwrap().unwrap();
        assert_eq!(stored, airport);
    }

    #[test]
    fn test_upsert_and_list_areas() {
        let storage = storage();
        let area = OperationalArea {
            code: "TRA-1".to_string(),
            name: "Training area north".to_string(),
            base_airfield: Some("LRCL".to_string()),
            description: None,
        };
        storage.upsert_area(&area).unwrap();
        storage.upsert_area(&area).unwrap();

        let areas = storage.list_areas().unwrap();
        assert_eq!(areas, vec![area]);
        assert!(storage.area_exists("TRA-1").unwrap());
    }

    #[test]
    fn test_get_area() {
        let storage = storage();
        assert!(storage.get_area("TRA-2").unwrap().is_none());

        let area = OperationalArea {
            code: "TRA-2".to_string(),
            name: "Training area south".to_string(),
            base_airfield: None,
            description: Some("below 3000 ft".to_string()),
        };
        storage.upsert_area(&area).unwrap();
        assert_eq!(storage.get_area("TRA-2").unwrap(), Some(area));
    }
}
