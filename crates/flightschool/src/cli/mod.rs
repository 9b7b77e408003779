//! Command-line interface for flightschool.
//!
//! This module provides the CLI structure for the `fsops` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, DuplicateArg, ExportCommand, FlightSelection, FlightsCommand, ImportCommand,
    InvoiceCommand, KindArg, StatusCommand, TotalsCommand,
};

/// fsops - Flight school operations data
///
/// Imports flight logs, members, fleet and reference data from CSV, keeps
/// logbook totals, and issues proforma and fiscal invoices.
#[derive(Debug, Parser)]
#[command(name = "fsops")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Import records from a CSV file
    Import(ImportCommand),

    /// Export flight logs as CSV
    Export(ExportCommand),

    /// List flight logs
    Flights(FlightsCommand),

    /// Show a pilot's logbook totals
    Totals(TotalsCommand),

    /// Issue, settle and inspect invoices
    #[command(subcommand)]
    Invoice(InvoiceCommand),

    /// Show database status
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        crate::logging::Verbosity::from_flags(self.verbose, self.quiet)
    }

    /// The configuration file in effect: `--config`, else the default path.
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(crate::config::Config::default_config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "fsops");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity() {
        use crate::logging::Verbosity;

        assert_eq!(parse(&["fsops", "status"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["fsops", "-v", "status"]).verbosity(), Verbosity::Verbose);
        assert_eq!(parse(&["fsops", "-vv", "status"]).verbosity(), Verbosity::Trace);
        assert_eq!(parse(&["fsops", "-q", "status"]).verbosity(), Verbosity::Quiet);
    }

    #[test]
    fn test_parse_import() {
        let cli = parse(&[
            "fsops",
            "import",
            "flight-logs",
            "logs.csv",
            "--dry-run",
            "--on-duplicate",
            "update",
        ]);
        let Command::Import(cmd) = cli.command else {
            panic!("expected import");
        };
        assert_eq!(cmd.kind, KindArg::FlightLogs);
        assert_eq!(cmd.file, PathBuf::from("logs.csv"));
        assert!(cmd.dry_run);
        assert_eq!(cmd.on_duplicate, Some(DuplicateArg::Update));
    }

    #[test]
    fn test_parse_import_kind_alias() {
        let cli = parse(&["fsops", "import", "flights", "logs.csv"]);
        assert!(matches!(
            cli.command,
            Command::Import(ImportCommand {
                kind: KindArg::FlightLogs,
                dry_run: false,
                on_duplicate: None,
                ..
            })
        ));
    }

    #[test]
    fn test_parse_import_rejects_unknown_kind() {
        assert!(Cli::try_parse_from(["fsops", "import", "pilots", "x.csv"]).is_err());
    }

    #[test]
    fn test_parse_export() {
        let cli = parse(&[
            "fsops",
            "export",
            "--pilot",
            "ana@school.ro",
            "--from",
            "2024-05-01",
            "-o",
            "out.csv",
        ]);
        let Command::Export(cmd) = cli.command else {
            panic!("expected export");
        };
        assert_eq!(cmd.selection.pilot.as_deref(), Some("ana@school.ro"));
        assert!(cmd.selection.from.is_some());
        assert!(cmd.selection.to.is_none());
        assert_eq!(cmd.output, Some(PathBuf::from("out.csv")));
    }

    #[test]
    fn test_parse_flights_rejects_bad_date() {
        assert!(Cli::try_parse_from(["fsops", "flights", "--from", "May"]).is_err());
    }

    #[test]
    fn test_parse_flights_defaults() {
        let Command::Flights(cmd) = parse(&["fsops", "flights"]).command else {
            panic!("expected flights");
        };
        assert_eq!(cmd.limit, 50);
        assert!(!cmd.json);
    }

    #[test]
    fn test_parse_invoice_proforma() {
        let cli = parse(&[
            "fsops",
            "invoice",
            "proforma",
            "ana@school.ro",
            "--from",
            "01.05.2024",
            "--to",
            "31.05.2024",
        ]);
        assert!(matches!(
            cli.command,
            Command::Invoice(InvoiceCommand::Proforma { .. })
        ));
    }

    #[test]
    fn test_parse_invoice_pay() {
        let cli = parse(&["fsops", "invoice", "pay", "PF-0001"]);
        assert!(matches!(
            cli.command,
            Command::Invoice(InvoiceCommand::Pay { ref number }) if number == "PF-0001"
        ));
    }

    #[test]
    fn test_parse_with_config() {
        let cli = parse(&["fsops", "-c", "/custom/config.toml", "status"]);
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_parse_config_validate() {
        let cli = parse(&["fsops", "config", "validate", "--file", "x.toml"]);
        assert!(matches!(
            cli.command,
            Command::Config(ConfigCommand::Validate { file: Some(_) })
        ));
    }

    #[test]
    fn test_config_path() {
        let cli = parse(&["fsops", "-c", "/etc/fs.toml", "config", "validate"]);
        assert_eq!(cli.config_path(), PathBuf::from("/etc/fs.toml"));

        let cli = parse(&["fsops", "config", "path"]);
        assert_eq!(cli.config_path(), crate::config::Config::default_config_path());
    }
}
