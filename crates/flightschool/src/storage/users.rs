//! Member table.

use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use crate::error::Result;
use crate::model::{Role, User};

use super::{corrupt_column, Storage};

const USER_COLUMNS: &str = "id, email, first_name, last_name, role, phone, license_number";

impl Storage {
    /// Check if a member with this (normalized) email exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn user_exists(&self, email: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM users WHERE email = ?1",
            [email],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Insert a new member and return its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the email already exists or the database operation fails.
    pub fn insert_user(&self, user: &User) -> Result<i64> {
        self.conn.execute(
            r"
            INSERT INTO users (email, first_name, last_name, role, phone, license_number)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
            params![
                user.email,
                user.first_name,
                user.last_name,
                user.role.as_str(),
                user.phone,
                user.license_number,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!("Inserted user {} with id {}", user.email, id);
        Ok(id)
    }

    /// Overwrite a member's details, keyed by email.
    ///
    /// Returns `true` if a row was updated.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn update_user(&self, user: &User) -> Result<bool> {
        let affected = self.conn.execute(
            r"
            UPDATE users SET first_name = ?2, last_name = ?3, role = ?4, phone = ?5,
                license_number = ?6
            WHERE email = ?1
            ",
            params![
                user.email,
                user.first_name,
                user.last_name,
                user.role.as_str(),
                user.phone,
                user.license_number,
            ],
        )?;
        Ok(affected > 0)
    }

    /// Get a member by email.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_user(&self, email: &str) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                [email],
                Self::row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// List members ordered by last name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_users(&self) -> Result<Vec<User>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY last_name, first_name"
        ))?;
        let users = stmt
            .query_map([], Self::row_to_user)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(users)
    }

    fn row_to_user(row: &Row) -> rusqlite::Result<User> {
        let role: String = row.get(4)?;
        Ok(User {
            id: Some(row.get(0)?),
            email: row.get(1)?,
            first_name: row.get(2)?,
            last_name: row.get(3)?,
            role: Role::parse(&role).map_err(|e| corrupt_column(4, e.to_string()))?,
            phone: row.get(5)?,
            license_number: row.get(6)?,
        })
    }
}
