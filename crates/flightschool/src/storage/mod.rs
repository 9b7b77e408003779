//! Storage layer for flightschool.
//!
//! This module provides `SQLite`-based persistent storage for members, the
//! fleet, reference data, flight logs and invoices. Every table has a natural
//! key that the import pipeline uses for duplicate detection.

mod aircraft;
mod flights;
mod invoices;
pub mod migrations;
mod reference;
pub mod schema;
mod users;

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{Error, Result};

pub use flights::{FlightFilter, PilotTotals};
pub use invoices::{Invoice, InvoiceLine, InvoiceStatus};

/// Storage engine for school records.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

/// Whether [`Storage::in_transaction`] keeps its writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxMode {
    /// Commit when the closure succeeds.
    Commit,
    /// Always roll back; used for dry runs.
    Rollback,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        migrations::initialize_schema(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` inside one transaction.
    ///
    /// An `Err` from `f` always rolls back. On success the transaction is
    /// committed or rolled back according to `mode`.
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or an error if the transaction cannot be
    /// started or finished.
    pub fn in_transaction<T>(&self, mode: TxMode, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        let tx = self.conn.unchecked_transaction()?;
        let value = f(self)?;
        match mode {
            TxMode::Commit => tx.commit()?,
            TxMode::Rollback => tx.rollback()?,
        }
        Ok(value)
    }

    /// Read a value from the metadata table.
    fn metadata(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM metadata WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Write a value to the metadata table.
    fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            (key, value),
        )?;
        Ok(())
    }

    fn count_rows(&self, table: &str) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(count)
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let unbilled_flights: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM flight_logs WHERE invoice_id IS NULL",
            [],
            |row| row.get(0),
        )?;

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            users: self.count_rows("users")?,
            aircraft: self.count_rows("aircraft")?,
            icao_types: self.count_rows("icao_types")?,
            airports: self.count_rows("airports")?,
            areas: self.count_rows("areas")?,
            flight_logs: self.count_rows("flight_logs")?,
            unbilled_flights,
            invoices: self.count_rows("invoices")?,
            db_size_bytes,
        })
    }
}

/// Row counts and file size.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StorageStats {
    /// Members.
    pub users: i64,
    /// Fleet size.
    pub aircraft: i64,
    /// ICAO type reference rows.
    pub icao_types: i64,
    /// Airport reference rows.
    pub airports: i64,
    /// Operational areas.
    pub areas: i64,
    /// Logged legs.
    pub flight_logs: i64,
    /// Legs not yet on an invoice.
    pub unbilled_flights: i64,
    /// Invoices of any status.
    pub invoices: i64,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

/// Error for a stored value that no longer parses.
pub(crate) fn corrupt_column(index: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        index,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, message)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let storage = Storage::open_in_memory();
        assert!(storage.is_ok());
    }

    #[test]
    fn test_path() {
        let storage = Storage::open_in_memory().unwrap();
        assert_eq!(storage.path().to_string_lossy(), ":memory:");
    }

    #[test]
    fn test_stats_empty() {
        let storage = Storage::open_in_memory().unwrap();
        let stats = storage.stats().unwrap();

        assert_eq!(stats.users, 0);
        assert_eq!(stats.flight_logs, 0);
        assert_eq!(stats.db_size_bytes, 0);
    }

    #[test]
    fn test_metadata_round_trip() {
        let storage = Storage::open_in_memory().unwrap();
        assert_eq!(storage.metadata("missing").unwrap(), None);

        storage.set_metadata("series:PF", "3").unwrap();
        assert_eq!(storage.metadata("series:PF").unwrap().as_deref(), Some("3"));
    }

    #[test]
    fn test_in_transaction_rollback_mode_discards_writes() {
        let storage = Storage::open_in_memory().unwrap();

        let value = storage
            .in_transaction(TxMode::Rollback, |s| {
                s.set_metadata("k", "v")?;
                Ok(42)
            })
            .unwrap();

        assert_eq!(value, 42);
        assert_eq!(storage.metadata("k").unwrap(), None);
    }

    #[test]
    fn test_in_transaction_error_rolls_back() {
        let storage = Storage::open_in_memory().unwrap();

        let result: Result<()> = storage.in_transaction(TxMode::Commit, |s| {
            s.set_metadata("k", "v")?;
            Err(Error::validation("stop"))
        });

        assert!(result.is_err());
        assert_eq!(storage.metadata("k").unwrap(), None);
    }

    #[test]
    fn test_in_transaction_commit() {
        let storage = Storage::open_in_memory().unwrap();
        storage
            .in_transaction(TxMode::Commit, |s| s.set_metadata("k", "v"))
            .unwrap();
        assert_eq!(storage.metadata("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let nested_path = dir.path().join("nested/deeper/school.db");

        let storage = Storage::open(&nested_path).unwrap();
        assert!(nested_path.exists());
        assert_eq!(storage.path(), nested_path);

        let stats = storage.stats().unwrap();
        assert!(stats.db_size_bytes > 0);
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("school.db");

        {
            let storage = Storage::open(&path).unwrap();
            storage.set_metadata("k", "v").unwrap();
        }

        let storage = Storage::open(&path).unwrap();
        assert_eq!(storage.metadata("k").unwrap().as_deref(), Some("v"));
    }
}
