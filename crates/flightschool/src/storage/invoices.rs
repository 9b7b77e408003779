//! Invoice rows, their lines, and per-series numbering.

use std::fmt;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};

use super::{corrupt_column, Storage};

const INVOICE_COLUMNS: &str = r"
    id, number, fiscal_number, status, pilot_email, period_from, period_to, currency,
    net_cents, vat_cents, total_cents, issued_at, paid_at
";

/// Lifecycle of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Issued, awaiting payment. Flights are reserved.
    Proforma,
    /// Paid; carries a fiscal number.
    Fiscal,
    /// Withdrawn before payment. Flights were released.
    Cancelled,
}

impl InvoiceStatus {
    /// Canonical name as stored.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Proforma => "proforma",
            Self::Fiscal => "fiscal",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse a stored status.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown statuses.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "proforma" => Ok(Self::Proforma),
            "fiscal" => Ok(Self::Fiscal),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(Error::invalid_field(
                "invoice status",
                other,
                "expected proforma, fiscal or cancelled",
            )),
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One priced leg on an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceLine {
    /// Flight this line bills, if it is a flight line.
    pub flight_id: Option<i64>,
    /// Human-readable line text.
    pub description: String,
    /// Billable minutes.
    pub minutes: u32,
    /// Hourly rate in cents.
    pub rate_cents: i64,
    /// Net amount in cents.
    pub amount_cents: i64,
}

/// A proforma or fiscal invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invoice {
    /// Row id, assigned by storage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Proforma number, e.g. `PF-0001`.
    pub number: String,
    /// Fiscal number once paid, e.g. `FS-0001`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fiscal_number: Option<String>,
    /// Current status.
    pub status: InvoiceStatus,
    /// Billed pilot.
    pub pilot_email: String,
    /// First flight date covered.
    pub period_from: NaiveDate,
    /// Last flight date covered.
    pub period_to: NaiveDate,
    /// ISO currency code.
    pub currency: String,
    /// Sum of line amounts.
    pub net_cents: i64,
    /// VAT on the net amount.
    pub vat_cents: i64,
    /// Net plus VAT.
    pub total_cents: i64,
    /// When the proforma was issued.
    pub issued_at: DateTime<Utc>,
    /// When payment was confirmed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    /// Priced lines.
    pub lines: Vec<InvoiceLine>,
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_timestamp(index: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| corrupt_column(index, e.to_string()))
}

fn parse_day(index: usize, raw: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| corrupt_column(index, e.to_string()))
}

impl Storage {
    /// Reserve the next number in `series`, e.g. `PF-0007`.
    ///
    /// The counter lives in the metadata table, so numbers are never reused
    /// within a database even if an invoice is cancelled.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored counter is corrupt or the database
    /// operation fails.
    pub fn next_invoice_number(&self, series: &str) -> Result<String> {
        let key = format!("series:{}", series.to_ascii_uppercase());
        let last: u32 = match self.metadata(&key)? {
            Some(value) => value
                .parse()
                .map_err(|_| Error::internal(format!("corrupt counter {key}: {value}")))?,
            None => 0,
        };
        let next = last + 1;
        self.set_metadata(&key, &next.to_string())?;
        Ok(format!("{series}-{next:04}"))
    }

    /// Insert an invoice with its lines and return its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the number is taken or the database operation fails.
    pub fn insert_invoice(&self, invoice: &Invoice) -> Result<i64> {
        self.conn.execute(
            r"
            INSERT INTO invoices (number, fiscal_number, status, pilot_email, period_from,
                period_to, currency, net_cents, vat_cents, total_cents, issued_at, paid_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ",
            params![
                invoice.number,
                invoice.fiscal_number,
                invoice.status.as_str(),
                invoice.pilot_email,
                invoice.period_from.to_string(),
                invoice.period_to.to_string(),
                invoice.currency,
                invoice.net_cents,
                invoice.vat_cents,
                invoice.total_cents,
                timestamp(invoice.issued_at),
                invoice.paid_at.map(timestamp),
            ],
        )?;
        let id = self.conn.last_insert_rowid();

        let mut stmt = self.conn.prepare(
            r"
            INSERT INTO invoice_lines (invoice_id, flight_id, description, minutes,
                rate_cents, amount_cents)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )?;
        for line in &invoice.lines {
            stmt.execute(params![
                id,
                line.flight_id,
                line.description,
                line.minutes,
                line.rate_cents,
                line.amount_cents,
            ])?;
        }

        debug!(
            "Inserted invoice {} with {} lines",
            invoice.number,
            invoice.lines.len()
        );
        Ok(id)
    }

    /// Look up an invoice by proforma or fiscal number, with its lines.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_invoice(&self, number: &str) -> Result<Option<Invoice>> {
        let invoice = self
            .conn
            .query_row(
                &format!(
                    "SELECT {INVOICE_COLUMNS} FROM invoices WHERE number = ?1 OR fiscal_number = ?1"
                ),
                [number],
                Self::row_to_invoice,
            )
            .optional()?;

        match invoice {
            Some(mut invoice) => {
                if let Some(id) = invoice.id {
                    invoice.lines = self.invoice_lines(id)?;
                }
                Ok(Some(invoice))
            }
            None => Ok(None),
        }
    }

    /// List invoices, newest first, optionally for one pilot. Lines are not loaded.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_invoices(&self, pilot_email: Option<&str>) -> Result<Vec<Invoice>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE ?1 IS NULL OR pilot_email = ?1 ORDER BY id DESC"
        ))?;
        let invoices = stmt
            .query_map([pilot_email], Self::row_to_invoice)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(invoices)
    }

    /// Record payment: assign the fiscal number and move to [`InvoiceStatus::Fiscal`].
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn mark_invoice_paid(
        &self,
        invoice_id: i64,
        fiscal_number: &str,
        paid_at: DateTime<Utc>,
    ) -> Result<()> {
        self.conn.execute(
            "UPDATE invoices SET status = ?2, fiscal_number = ?3, paid_at = ?4 WHERE id = ?1",
            params![
                invoice_id,
                InvoiceStatus::Fiscal.as_str(),
                fiscal_number,
                timestamp(paid_at)
            ],
        )?;
        Ok(())
    }

    /// Change an invoice's status.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn set_invoice_status(&self, invoice_id: i64, status: InvoiceStatus) -> Result<()> {
        self.conn.execute(
            "UPDATE invoices SET status = ?2 WHERE id = ?1",
            params![invoice_id, status.as_str()],
        )?;
        Ok(())
    }

    fn invoice_lines(&self, invoice_id: i64) -> Result<Vec<InvoiceLine>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT flight_id, description, minutes, rate_cents, amount_cents
            FROM invoice_lines WHERE invoice_id = ?1 ORDER BY id
            ",
        )?;
        let lines = stmt
            .query_map([invoice_id], |row| {
                Ok(InvoiceLine {
                    flight_id: row.get(0)?,
                    description: row.get(1)?,
                    minutes: row.get(2)?,
                    rate_cents: row.get(3)?,
                    amount_cents: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(lines)
    }

    fn row_to_invoice(row: &Row) -> rusqlite::Result<Invoice> {
        let status: String = row.get(3)?;
        let period_from: String = row.get(5)?;
        let period_to: String = row.get(6)?;
        let issued_at: String = row.get(11)?;
        let paid_at: Option<String> = row.get(12)?;

        Ok(Invoice {
            id: Some(row.get(0)?),
            number: row.get(1)?,
            fiscal_number: row.get(2)?,
            status: InvoiceStatus::parse(&status).map_err(|e| corrupt_column(3, e.to_string()))?,
            pilot_email: row.get(4)?,
            period_from: parse_day(5, &period_from)?,
            period_to: parse_day(6, &period_to)?,
            currency: row.get(7)?,
            net_cents: row.get(8)?,
            vat_cents: row.get(9)?,
            total_cents: row.get(10)?,
            issued_at: parse_timestamp(11, &issued_at)?,
            paid_at: paid_at.map(|raw| parse_timestamp(12, &raw)).transpose()?,
            lines: Vec::new(),
        })
    }
}
