//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Subcommand, ValueEnum};

use crate::config::DuplicatePolicy;
use crate::import::ImportKind;
use crate::storage::FlightFilter;

/// Accept every date layout the importer accepts.
fn date_arg(raw: &str) -> Result<NaiveDate, String> {
    crate::flight_time::parse_date(raw).map_err(|e| e.to_string())
}

/// Import command arguments.
#[derive(Debug, Args)]
pub struct ImportCommand {
    /// What the file contains
    #[arg(value_enum)]
    pub kind: KindArg,

    /// CSV file to import
    pub file: PathBuf,

    /// Validate and count without writing anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// What to do with rows that already exist (defaults to the configured policy)
    #[arg(long, value_enum)]
    pub on_duplicate: Option<DuplicateArg>,

    /// Print the report as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Flight selection shared by `export` and `flights`.
#[derive(Debug, Clone, Default, Args)]
pub struct FlightSelection {
    /// Only flights logged by this pilot
    #[arg(short, long)]
    pub pilot: Option<String>,

    /// Only flights in this aircraft
    #[arg(short, long)]
    pub aircraft: Option<String>,

    /// First date, inclusive
    #[arg(long, value_parser = date_arg)]
    pub from: Option<NaiveDate>,

    /// Last date, inclusive
    #[arg(long, value_parser = date_arg)]
    pub to: Option<NaiveDate>,

    /// Only flights not yet invoiced
    #[arg(long)]
    pub unbilled: bool,
}

impl FlightSelection {
    /// Build a storage filter, normalising pilot and aircraft the way
    /// imported records are stored.
    #[must_use]
    pub fn to_filter(&self, limit: Option<usize>) -> FlightFilter {
        FlightFilter {
            pilot: self.pilot.as_ref().map(|p| p.trim().to_ascii_lowercase()),
            aircraft: self.aircraft.as_ref().map(|a| a.trim().to_ascii_uppercase()),
            from: self.from,
            to: self.to,
            unbilled_only: self.unbilled,
            limit,
        }
    }
}

/// Export command arguments.
#[derive(Debug, Args)]
pub struct ExportCommand {
    /// Which flights to export
    #[command(flatten)]
    pub selection: FlightSelection,

    /// Write to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Flights command arguments.
#[derive(Debug, Args)]
pub struct FlightsCommand {
    /// Which flights to list
    #[command(flatten)]
    pub selection: FlightSelection,

    /// Maximum number of flights
    #[arg(short, long, default_value = "50")]
    pub limit: usize,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Totals command arguments.
#[derive(Debug, Args)]
pub struct TotalsCommand {
    /// Pilot email
    pub email: String,

    /// Show hours as decimals instead of H:MM
    #[arg(short, long)]
    pub decimal: bool,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Invoice commands.
#[derive(Debug, Subcommand)]
pub enum InvoiceCommand {
    /// Issue a proforma invoice for a pilot's unbilled flights
    Proforma {
        /// Pilot email
        pilot: String,

        /// First flight date, inclusive
        #[arg(long, value_parser = date_arg)]
        from: NaiveDate,

        /// Last flight date, inclusive
        #[arg(long, value_parser = date_arg)]
        to: NaiveDate,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Confirm payment and issue the fiscal invoice
    Pay {
        /// Proforma number
        number: String,
    },

    /// Cancel a proforma and release its flights
    Cancel {
        /// Proforma number
        number: String,
    },

    /// Show an invoice with its lines
    Show {
        /// Proforma or fiscal number
        number: String,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// List invoices, newest first
    List {
        /// Only invoices for this pilot
        #[arg(short, long)]
        pilot: Option<String>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Record kind argument for `import`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    /// Flight log legs
    #[value(alias = "flights")]
    FlightLogs,
    /// School members
    Users,
    /// Fleet registry
    Aircraft,
    /// ICAO aircraft type reference
    IcaoTypes,
    /// Airport reference
    Airports,
    /// Operational areas
    Areas,
}

impl From<KindArg> for ImportKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::FlightLogs => Self::FlightLogs,
            KindArg::Users => Self::Users,
            KindArg::Aircraft => Self::Aircraft,
            KindArg::IcaoTypes => Self::IcaoTypes,
            KindArg::Airports => Self::Airports,
            KindArg::Areas => Self::Areas,
        }
    }
}

/// Duplicate policy argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DuplicateArg {
    /// Keep the stored record
    Skip,
    /// Overwrite the stored record
    Update,
}

impl From<DuplicateArg> for DuplicatePolicy {
    fn from(arg: DuplicateArg) -> Self {
        match arg {
            DuplicateArg::Skip => Self::Skip,
            DuplicateArg::Update => Self::Update,
        }
    }
}
