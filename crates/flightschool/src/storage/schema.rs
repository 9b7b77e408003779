//! `SQLite` schema definitions for flightschool.
//!
//! This module contains the SQL statements for creating and managing
//! the database schema.

/// SQL statement to create the users table.
pub const CREATE_USERS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    role TEXT NOT NULL,
    phone TEXT,
    license_number TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create the aircraft table.
pub const CREATE_AIRCRAFT_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS aircraft (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    registration TEXT NOT NULL UNIQUE,
    icao_type TEXT,
    model TEXT NOT NULL,
    hourly_rate_cents INTEGER NOT NULL,
    billing_basis TEXT NOT NULL,
    active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create the ICAO aircraft type reference table.
pub const CREATE_ICAO_TYPES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS icao_types (
    designator TEXT PRIMARY KEY,
    manufacturer TEXT NOT NULL,
    model TEXT NOT NULL,
    description TEXT,
    wake_category TEXT
)
";

/// SQL statement to create the airport reference table.
pub const CREATE_AIRPORTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS airports (
    ident TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    kind TEXT NOT NULL,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    elevation_ft INTEGER,
    iso_country TEXT,
    municipality TEXT,
    iata_code TEXT
)
";

/// SQL statement to create the operational areas table.
pub const CREATE_AREAS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS areas (
    code TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    base_airfield TEXT,
    description TEXT
)
";

/// SQL statement to create the flight logs table.
pub const CREATE_FLIGHT_LOGS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS flight_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    fingerprint TEXT NOT NULL UNIQUE,
    date TEXT NOT NULL,
    pilot_email TEXT NOT NULL,
    instructor_email TEXT,
    aircraft_registration TEXT NOT NULL,
    departure TEXT NOT NULL,
    arrival TEXT NOT NULL,
    off_block TEXT NOT NULL,
    takeoff TEXT,
    landing TEXT,
    on_block TEXT NOT NULL,
    hobbs_start REAL,
    hobbs_end REAL,
    landings_day INTEGER NOT NULL,
    landings_night INTEGER NOT NULL,
    role TEXT NOT NULL,
    flight_type TEXT NOT NULL,
    remarks TEXT,
    block_minutes INTEGER NOT NULL,
    airborne_minutes INTEGER NOT NULL,
    pic_minutes INTEGER NOT NULL,
    dual_minutes INTEGER NOT NULL,
    instructor_minutes INTEGER NOT NULL,
    solo_minutes INTEGER NOT NULL,
    night_minutes INTEGER NOT NULL,
    ifr_minutes INTEGER NOT NULL,
    invoice_id INTEGER REFERENCES invoices(id),
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create an index on flight date for range queries.
pub const CREATE_FLIGHT_DATE_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_flight_logs_date ON flight_logs(date, off_block)
";

/// SQL statement to create an index on pilot for logbook totals.
pub const CREATE_FLIGHT_PILOT_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_flight_logs_pilot ON flight_logs(pilot_email)
";

/// SQL statement to create an index on aircraft for fleet queries.
pub const CREATE_FLIGHT_AIRCRAFT_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_flight_logs_aircraft ON flight_logs(aircraft_registration)
";

/// SQL statement to create the invoices table.
///
/// A row starts as a proforma and becomes fiscal once payment is confirmed;
/// `fiscal_number` is set at that point.
pub const CREATE_INVOICES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS invoices (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    number TEXT NOT NULL UNIQUE,
    fiscal_number TEXT UNIQUE,
    status TEXT NOT NULL,
    pilot_email TEXT NOT NULL,
    period_from TEXT NOT NULL,
    period_to TEXT NOT NULL,
    currency TEXT NOT NULL,
    net_cents INTEGER NOT NULL,
    vat_cents INTEGER NOT NULL,
    total_cents INTEGER NOT NULL,
    issued_at TEXT NOT NULL,
    paid_at TEXT
)
";

/// SQL statement to create the invoice lines table.
pub const CREATE_INVOICE_LINES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS invoice_lines (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    invoice_id INTEGER NOT NULL REFERENCES invoices(id),
    flight_id INTEGER REFERENCES flight_logs(id),
    description TEXT NOT NULL,
    minutes INTEGER NOT NULL,
    rate_cents INTEGER NOT NULL,
    amount_cents INTEGER NOT NULL
)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_USERS_TABLE,
    CREATE_AIRCRAFT_TABLE,
    CREATE_ICAO_TYPES_TABLE,
    CREATE_AIRPORTS_TABLE,
    CREATE_AREAS_TABLE,
    CREATE_INVOICES_TABLE,
    CREATE_FLIGHT_LOGS_TABLE,
    CREATE_FLIGHT_DATE_INDEX,
    CREATE_FLIGHT_PILOT_INDEX,
    CREATE_FLIGHT_AIRCRAFT_INDEX,
    CREATE_INVOICE_LINES_TABLE,
    CREATE_METADATA_TABLE,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements_not_empty() {
        assert!(!SCHEMA_STATEMENTS.is_empty());
        for stmt in SCHEMA_STATEMENTS {
            assert!(!stmt.is_empty());
        }
    }

    #[test]
    fn test_natural_keys_are_unique() {
        assert!(CREATE_USERS_TABLE.contains("email TEXT NOT NULL UNIQUE"));
        assert!(CREATE_AIRCRAFT_TABLE.contains("registration TEXT NOT NULL UNIQUE"));
        assert!(CREATE_FLIGHT_LOGS_TABLE.contains("fingerprint TEXT NOT NULL UNIQUE"));
        assert!(CREATE_ICAO_TYPES_TABLE.contains("designator TEXT PRIMARY KEY"));
        assert!(CREATE_AIRPORTS_TABLE.contains("ident TEXT PRIMARY KEY"));
        assert!(CREATE_AREAS_TABLE.contains("code TEXT PRIMARY KEY"));
    }

    #[test]
    fn test_invoices_created_before_flight_logs() {
        let invoices = SCHEMA_STATEMENTS
            .iter()
            .position(|s| *s == CREATE_INVOICES_TABLE)
            .unwrap();
        let flights = SCHEMA_STATEMENTS
            .iter()
            .position(|s| *s == CREATE_FLIGHT_LOGS_TABLE)
            .unwrap();
        assert!(invoices < flights);
    }

    #[test]
    fn test_create_metadata_table_structure() {
        assert!(CREATE_METADATA_TABLE.contains("key TEXT PRIMARY KEY"));
        assert!(CREATE_METADATA_TABLE.contains("value TEXT NOT NULL"));
    }
}
