//! Header-aware CSV reading.
//!
//! Exports from different tools name the same column differently
//! (`Pilot`, `pilot_email`, `Pilot E-mail`). Headers are normalised and each
//! canonical column is resolved through its alias list once, before any row
//! is read.

use std::collections::HashMap;
use std::io::Read;

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{debug, trace};

use crate::error::{Error, Result};

/// A canonical column and the header spellings that map to it.
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    /// Canonical name, used in error messages and exports.
    pub name: &'static str,
    /// Accepted normalised headers, tried in order after `name`.
    pub aliases: &'static [&'static str],
    /// Whether the import fails when no header matches.
    pub required: bool,
}

impl ColumnSpec {
    /// A column the import cannot do without.
    #[must_use]
    pub const fn required(name: &'static str, aliases: &'static [&'static str]) -> Self {
        Self {
            name,
            aliases,
            required: true,
        }
    }

    /// A column that may be absent.
    #[must_use]
    pub const fn optional(name: &'static str, aliases: &'static [&'static str]) -> Self {
        Self {
            name,
            aliases,
            required: false,
        }
    }
}

/// One data row, or the reason it could not be read.
#[derive(Debug)]
pub struct TableRow {
    /// 1-based line number in the source file.
    pub line: u64,
    /// The parsed fields.
    pub record: std::result::Result<StringRecord, String>,
}

/// A fully read CSV file with resolved columns.
#[derive(Debug)]
pub struct CsvTable {
    headers: Vec<String>,
    columns: HashMap<&'static str, usize>,
    rows: Vec<TableRow>,
}

/// Lowercase a header and fold separators to `_`.
///
/// A leading byte-order mark is dropped, so files saved by spreadsheet tools
/// resolve like any other.
#[must_use]
pub fn normalize_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.trim_start_matches('\u{feff}').trim().chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else if matches!(c, ' ' | '-' | '_' | '.' | '/') && !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}

impl CsvTable {
    /// Read every row of `reader` and resolve `specs` against its header.
    ///
    /// Rows are kept in memory so the total is known before processing.
    /// Malformed rows are kept as per-row errors.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingColumn`] if a required column has no matching
    /// header, or a CSV error if the header itself cannot be read.
    pub fn read<R: Read>(reader: R, delimiter: u8, specs: &[ColumnSpec]) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .trim(Trim::All)
            .has_headers(true)
            .from_reader(reader);

        let headers: Vec<String> = rdr.headers()?.iter().map(normalize_header).collect();
        trace!("Normalised headers: {:?}", headers);

        let mut columns = HashMap::new();
        for spec in specs {
            let found = std::iter::once(spec.name)
                .chain(spec.aliases.iter().copied())
                .find_map(|alias| headers.iter().position(|h| h == alias));
            match found {
                Some(index) => {
                    columns.insert(spec.name, index);
                }
                None if spec.required => {
                    return Err(Error::MissingColumn { column: spec.name });
                }
                None => {}
            }
        }
        debug!("Resolved {} of {} columns", columns.len(), specs.len());

        let mut rows = Vec::new();
        let mut last_line = 1;
        for result in rdr.records() {
            let row = match result {
                Ok(record) => {
                    let line = record.position().map_or(last_line + 1, csv::Position::line);
                    if record.iter().all(str::is_empty) {
                        last_line = line;
                        continue;
                    }
                    TableRow {
                        line,
                        record: Ok(record),
                    }
                }
                Err(e) => {
                    let line = e.position().map_or(last_line + 1, csv::Position::line);
                    TableRow {
                        line,
                        record: Err(e.to_string()),
                    }
                }
            };
            last_line = row.line;
            rows.push(row);
        }

        Ok(Self {
            headers,
            columns,
            rows,
        })
    }

    /// The normalised header row.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Whether a canonical column was found in the header.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Number of data rows, blank lines excluded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the file has no data rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The data rows in file order.
    #[must_use]
    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    /// Field accessor for one record.
    #[must_use]
    pub fn fields<'a>(&'a self, record: &'a StringRecord) -> Fields<'a> {
        Fields {
            columns: &self.columns,
            record,
        }
    }
}

/// Named access to the fields of one record.
#[derive(Debug, Clone, Copy)]
pub struct Fields<'a> {
    columns: &'a HashMap<&'static str, usize>,
    record: &'a StringRecord,
}

impl<'a> Fields<'a> {
    /// The value of `column`, or `None` when the column is absent, the row
    /// is short, or the cell is blank.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&'a str> {
        self.columns
            .get(column)
            .and_then(|&index| self.record.get(index))
            .filter(|value| !value.is_empty())
    }

    /// The value of `column`, which must not be blank.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the column when the cell is blank.
    pub fn require(&self, column: &'static str) -> Result<&'a str> {
        self.get(column)
            .ok_or_else(|| Error::validation(format!("{column} is required")))
    }

    /// The value of `column`, or `""` when blank.
    #[must_use]
    pub fn or_empty(&self, column: &str) -> &'a str {
        self.get(column).unwrap_or("")
    }
}
