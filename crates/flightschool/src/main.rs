//! `fsops` - CLI for flightschool
//!
//! This binary provides the command-line interface for importing school data,
//! reviewing flight logs and issuing invoices.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use flightschool::billing::Billing;
use flightschool::cli::{
    Cli, Command, ConfigCommand, ExportCommand, FlightsCommand, ImportCommand, InvoiceCommand,
    TotalsCommand,
};
use flightschool::flight_time::{format_decimal, format_hhmm};
use flightschool::import::{ImportOptions, ImportReport, Importer, LogProgress};
use flightschool::model::money::format_cents;
use flightschool::storage::Invoice;
use flightschool::{export_flights, init_logging, Config, Storage};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // `config` subcommands load (or refuse to load) the file themselves
    let config_path = cli.config_path();
    let load = || Config::load_from(Some(config_path.clone())).context("loading configuration");

    match cli.command {
        Command::Import(cmd) => handle_import(&load()?, &cmd),
        Command::Export(cmd) => handle_export(&load()?, &cmd),
        Command::Flights(cmd) => handle_flights(&load()?, &cmd),
        Command::Totals(cmd) => handle_totals(&load()?, &cmd),
        Command::Invoice(cmd) => handle_invoice(&load()?, cmd),
        Command::Status(cmd) => handle_status(&load()?, cmd.json),
        Command::Config(cmd) => handle_config(config_path, cmd),
    }
}

fn open_storage(config: &Config) -> Result<Storage> {
    let path = config.database_path();
    Storage::open(&path).with_context(|| format!("opening database {}", path.display()))
}

fn handle_import(config: &Config, cmd: &ImportCommand) -> Result<()> {
    let storage = open_storage(config)?;
    let file = File::open(&cmd.file)
        .with_context(|| format!("opening {}", cmd.file.display()))?;

    let mut options = ImportOptions::from_config(config);
    options.dry_run = cmd.dry_run;
    if let Some(policy) = cmd.on_duplicate {
        options.on_duplicate = policy.into();
    }

    let report = Importer::new(&storage, options)
        .run(cmd.kind.into(), BufReader::new(file), &mut LogProgress)
        .with_context(|| format!("importing {}", cmd.file.display()))?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_import_report(&report);
    }
    Ok(())
}

fn print_import_report(report: &ImportReport) {
    let p = &report.progress;
    println!(
        "Import of {}{}",
        report.kind,
        if report.dry_run { " (dry run, nothing written)" } else { "" }
    );
    println!("  Rows:        {}", p.total);
    println!("  Inserted:    {}", p.inserted);
    println!("  Updated:     {}", p.updated);
    println!("  Duplicates:  {}", p.duplicates);
    println!("  Failed:      {}", p.failed);
    if report.stopped_early {
        println!(
            "  Stopped after {} errors; {} rows not processed",
            p.failed,
            p.total - p.processed
        );
    }

    if !report.warnings.is_empty() {
        println!();
        println!("Warnings:");
        for warning in &report.warnings {
            println!("  line {:>5}: {}", warning.line, warning.message);
        }
    }
    if !report.errors.is_empty() {
        println!();
        println!("Errors:");
        for error in &report.errors {
            println!("  line {:>5}: {}", error.line, error.message);
        }
    }
}

fn handle_export(config: &Config, cmd: &ExportCommand) -> Result<()> {
    let storage = open_storage(config)?;
    let filter = cmd.selection.to_filter(None);

    let count = if let Some(path) = &cmd.output {
        let file =
            File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let count = export_flights(&storage, &filter, BufWriter::new(file))?;
        eprintln!("Wrote {count} flights to {}", path.display());
        count
    } else {
        export_flights(&storage, &filter, io::stdout().lock())?
    };
    tracing::debug!("Export finished with {count} rows");
    Ok(())
}

fn handle_flights(config: &Config, cmd: &FlightsCommand) -> Result<()> {
    let storage = open_storage(config)?;
    let flights = storage.list_flights(&cmd.selection.to_filter(Some(cmd.limit)))?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&flights)?);
        return Ok(());
    }
    if flights.is_empty() {
        println!("No flights found.");
        return Ok(());
    }

    let mut out = io::stdout().lock();
    writeln!(
        out,
        "{:<10}  {:<24}  {:<7}  {:<9}  {:>5}  {:>5}  {:<10}  {}",
        "DATE", "PILOT", "AIRCRAFT", "ROUTE", "BLOCK", "AIR", "ROLE", "INVOICED"
    )?;
    for log in &flights {
        writeln!(
            out,
            "{:<10}  {:<24}  {:<7}  {:<9}  {:>5}  {:>5}  {:<10}  {}",
            log.date.to_string(),
            log.pilot_email,
            log.aircraft_registration,
            format!("{}-{}", log.departure, log.arrival),
            format_hhmm(log.categories.block),
            format_hhmm(log.categories.airborne),
            log.role.to_string(),
            if log.is_billed() { "yes" } else { "no" }
        )?;
    }
    Ok(())
}

fn handle_totals(config: &Config, cmd: &TotalsCommand) -> Result<()> {
    let storage = open_storage(config)?;
    let email = cmd.email.trim().to_ascii_lowercase();
    let totals = storage.pilot_totals(&email)?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&totals)?);
        return Ok(());
    }

    let hours = |minutes: u32| {
        if cmd.decimal {
            format_decimal(minutes)
        } else {
            format_hhmm(minutes)
        }
    };
    let c = &totals.categories;
    println!("Logbook totals for {}", totals.pilot_email);
    println!("------------------{}", "-".repeat(totals.pilot_email.len()));
    println!("Flights:     {}", totals.flights);
    println!("Landings:    {}", totals.landings);
    println!("Block:       {}", hours(c.block));
    println!("Airborne:    {}", hours(c.airborne));
    println!("PIC:         {}", hours(c.pic));
    println!("Dual:        {}", hours(c.dual));
    println!("Instructor:  {}", hours(c.instructor));
    println!("Solo:        {}", hours(c.solo));
    println!("Night:       {}", hours(c.night));
    println!("IFR:         {}", hours(c.ifr));
    Ok(())
}

fn handle_invoice(config: &Config, cmd: InvoiceCommand) -> Result<()> {
    let storage = open_storage(config)?;
    let billing = Billing::new(&storage, config.billing.clone());

    match cmd {
        InvoiceCommand::Proforma {
            pilot,
            from,
            to,
            json,
        } => {
            let invoice = billing
                .issue_proforma(&pilot, from, to)
                .with_context(|| format!("issuing proforma for {pilot}"))?;
            print_invoice(&invoice, json)?;
        }
        InvoiceCommand::Pay { number } => {
            let invoice = billing
                .confirm_payment(&number)
                .with_context(|| format!("confirming payment of {number}"))?;
            println!(
                "Invoice {} paid; fiscal invoice {}",
                invoice.number,
                invoice.fiscal_number.as_deref().unwrap_or("-")
            );
        }
        InvoiceCommand::Cancel { number } => {
            let invoice = billing
                .cancel(&number)
                .with_context(|| format!("cancelling {number}"))?;
            println!("Invoice {} cancelled; its flights can be billed again", invoice.number);
        }
        InvoiceCommand::Show { number, json } => {
            print_invoice(&billing.show(&number)?, json)?;
        }
        InvoiceCommand::List { pilot, json } => {
            let invoices = billing.list(pilot.as_deref())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&invoices)?);
            } else if invoices.is_empty() {
                println!("No invoices found.");
            } else {
                println!(
                    "{:<10}  {:<10}  {:<9}  {:<24}  {:>12}",
                    "NUMBER", "FISCAL", "STATUS", "PILOT", "TOTAL"
                );
                for invoice in &invoices {
                    println!(
                        "{:<10}  {:<10}  {:<9}  {:<24}  {:>12}",
                        invoice.number,
                        invoice.fiscal_number.as_deref().unwrap_or("-"),
                        invoice.status.to_string(),
                        invoice.pilot_email,
                        format!("{} {}", format_cents(invoice.total_cents), invoice.currency)
                    );
                }
            }
        }
    }
    Ok(())
}

fn print_invoice(invoice: &Invoice, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(invoice)?);
        return Ok(());
    }

    println!("Invoice {} ({})", invoice.number, invoice.status);
    if let Some(fiscal) = &invoice.fiscal_number {
        println!("Fiscal number: {fiscal}");
    }
    println!("Pilot:   {}", invoice.pilot_email);
    println!("Period:  {} to {}", invoice.period_from, invoice.period_to);
    println!("Issued:  {}", invoice.issued_at.format("%Y-%m-%d %H:%M UTC"));
    if let Some(paid) = invoice.paid_at {
        println!("Paid:    {}", paid.format("%Y-%m-%d %H:%M UTC"));
    }
    println!();
    for line in &invoice.lines {
        println!(
            "  {:<48}  {:>12}",
            line.description,
            format_cents(line.amount_cents)
        );
    }
    println!();
    println!("  {:<48}  {:>12}", "Net", format_cents(invoice.net_cents));
    println!("  {:<48}  {:>12}", "VAT", format_cents(invoice.vat_cents));
    println!(
        "  {:<48}  {:>12}",
        format!("Total ({})", invoice.currency),
        format_cents(invoice.total_cents)
    );
    Ok(())
}

fn handle_status(config: &Config, json: bool) -> Result<()> {
    let storage = open_storage(config)?;
    let stats = storage.stats()?;

    if json {
        let status = serde_json::json!({
            "database_path": storage.path(),
            "stats": stats,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("fsops status");
        println!("------------");
        println!("Database:      {}", storage.path().display());
        println!("Size:          {} bytes", stats.db_size_bytes);
        println!();
        println!("Users:         {}", stats.users);
        println!("Aircraft:      {}", stats.aircraft);
        println!("ICAO types:    {}", stats.icao_types);
        println!("Airports:      {}", stats.airports);
        println!("Areas:         {}", stats.areas);
        println!(
            "Flight logs:   {} ({} unbilled)",
            stats.flight_logs, stats.unbilled_flights
        );
        println!("Invoices:      {}", stats.invoices);
    }
    Ok(())
}

fn handle_config(config_path: PathBuf, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(Some(config_path)).context("loading configuration")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Import]");
                println!("  Delimiter:          {:?}", config.import.delimiter);
                println!("  On duplicate:       {}", config.import.on_duplicate);
                println!("  Progress interval:  {}", config.import.progress_interval);
                println!("  Stop after errors:  {}", config.import.stop_after_errors);
                println!();
                println!("[Flight]");
                println!(
                    "  Hobbs tolerance:    {} min",
                    config.flight.hobbs_tolerance_minutes
                );
                println!(
                    "  Max block time:     {}",
                    format_hhmm(config.flight.max_block_minutes)
                );
                println!();
                println!("[Billing]");
                println!("  Currency:           {}", config.billing.currency);
                println!("  VAT:                {}%", config.billing.vat_percent);
                println!("  Proforma series:    {}", config.billing.proforma_series);
                println!("  Fiscal series:      {}", config.billing.fiscal_series);
            }
        }
        ConfigCommand::Path => {
            println!("{}", config_path.display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or(config_path);
            println!("Validating configuration: {}", path.display());
            if !path.exists() {
                println!("No file at this path; checking defaults and environment.");
            }
            Config::load_from(Some(path.clone()))
                .with_context(|| format!("configuration {} is invalid", path.display()))?;
            println!("Configuration is valid.");
        }
    }
    Ok(())
}
