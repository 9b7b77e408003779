//! `flightschool` - Operations data core for a flight school
//!
//! This library imports flight logs, members, fleet and aviation reference
//! data from CSV into a local SQLite database, derives logbook hour
//! categories, and issues proforma and fiscal invoices for flown time.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod billing;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod flight_time;
pub mod import;
pub mod logging;
pub mod model;
pub mod storage;

pub use billing::Billing;
pub use config::Config;
pub use error::{Error, Result};
pub use export::export_flights;
pub use import::{ImportKind, ImportOptions, ImportReport, Importer};
pub use logging::init_logging;
pub use storage::{FlightFilter, Storage, StorageStats};
