//! Database migration system for flightschool.
//!
//! This module handles database schema versioning and migrations,
//! ensuring the database schema stays up-to-date as the application evolves.

use rusqlite::Connection;

use crate::error::{Error, Result};

use super::schema::SCHEMA_STATEMENTS;

/// The current schema version.
pub const CURRENT_VERSION: i32 = 1;

/// Key used to store the schema version in the metadata table.
const VERSION_KEY: &str = "schema_version";

/// Initialize the database schema.
///
/// Creates all tables and indexes if they don't exist, then runs any
/// pending migrations to bring the schema up to the current version.
///
/// # Errors
///
/// Returns an error if schema creation or migration fails, or if the
/// database was written by a newer version of this crate.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;

    for statement in SCHEMA_STATEMENTS {
        conn.execute(statement, [])?;
    }

    let version = get_schema_version(conn)?;
    if version > CURRENT_VERSION {
        return Err(Error::DatabaseMigration {
            message: format!(
                "database schema version {version} is newer than supported version {CURRENT_VERSION}"
            ),
        });
    }
    if version < CURRENT_VERSION {
        run_migrations(conn, version)?;
    }

    Ok(())
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (fresh database).
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let result: std::result::Result<String, rusqlite::Error> = conn.query_row(
        "SELECT value FROM metadata WHERE key = ?1",
        [VERSION_KEY],
        |row| row.get(0),
    );

    match result {
        Ok(value) => value.parse().map_err(|_| Error::DatabaseMigration {
            message: format!("invalid schema version: {value}"),
        }),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(e.into()),
    }
}

/// Set the schema version in the database.
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        (VERSION_KEY, version.to_string()),
    )?;
    Ok(())
}

/// Run migrations from the given version to the current version.
fn run_migrations(conn: &Connection, from_version: i32) -> Result<()> {
    let mut current = from_version;

    while current < CURRENT_VERSION {
        current += 1;
        run_migration(conn, current)?;
    }

    set_schema_version(conn, CURRENT_VERSION)?;
    Ok(())
}

/// Run a specific migration version.
fn run_migration(conn: &Connection, version: i32) -> Result<()> {
    match version {
        1 => migrate_v1(conn),
        _ => Err(Error::DatabaseMigration {
            message: format!("unknown migration version: {version}"),
        }),
    }
}

/// Version 1 is the base schema from `SCHEMA_STATEMENTS`.
fn migrate_v1(conn: &Connection) -> Result<()> {
    set_schema_version(conn, 1)?;
    Ok(())
}
