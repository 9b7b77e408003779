//! CSV bulk import.
//!
//! Every kind of record goes through the same sequential pipeline:
//!
//! 1. the header is resolved once ([`CsvTable`]); a missing required column
//!    fails the whole import before any row is touched,
//! 2. each row is parsed and validated,
//! 3. its natural key is checked against earlier rows of the same file and
//!    then against storage,
//! 4. the record is inserted or, under [`DuplicatePolicy::Update`], updated.
//!
//! A failing row is recorded as a [`RowError`] and the batch carries on.
//! The whole batch runs in one transaction, which a dry run rolls back.

mod rows;
mod table;

use std::collections::HashSet;
use std::fmt;
use std::io::Read;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{Config, DuplicatePolicy};
use crate::error::{Error, Result};
use crate::flight_time::{check_hobbs, format_hhmm, HobbsCheck};
use crate::model::FlightLog;
use crate::storage::{Storage, TxMode};

pub use table::{normalize_header, ColumnSpec, CsvTable, Fields, TableRow};

/// The kind of records a CSV file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    /// Flight log legs.
    FlightLogs,
    /// School members.
    Users,
    /// Fleet registry.
    Aircraft,
    /// ICAO aircraft type reference.
    IcaoTypes,
    /// Airport reference.
    Airports,
    /// Operational areas.
    Areas,
}

impl ImportKind {
    /// Every kind, in dependency order: flight logs reference users and aircraft.
    pub const ALL: [Self; 6] = [
        Self::IcaoTypes,
        Self::Airports,
        Self::Areas,
        Self::Users,
        Self::Aircraft,
        Self::FlightLogs,
    ];

    /// Canonical name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FlightLogs => "flight_logs",
            Self::Users => "users",
            Self::Aircraft => "aircraft",
            Self::IcaoTypes => "icao_types",
            Self::Airports => "airports",
            Self::Areas => "areas",
        }
    }

    /// The columns this kind reads.
    #[must_use]
    pub fn columns(self) -> &'static [ColumnSpec] {
        match self {
            Self::FlightLogs => rows::FLIGHT_COLUMNS,
            Self::Users => rows::USER_COLUMNS,
            Self::Aircraft => rows::AIRCRAFT_COLUMNS,
            Self::IcaoTypes => rows::ICAO_TYPE_COLUMNS,
            Self::Airports => rows::AIRPORT_COLUMNS,
            Self::Areas => rows::AREA_COLUMNS,
        }
    }
}

impl fmt::Display for ImportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Knobs for one import run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOptions {
    /// Validate and count, but roll back every write.
    pub dry_run: bool,
    /// What to do with rows that match a stored record.
    pub on_duplicate: DuplicatePolicy,
    /// Report progress every N processed rows.
    pub progress_interval: usize,
    /// CSV field delimiter.
    pub delimiter: u8,
    /// Stop after this many failed rows; 0 never stops.
    pub stop_after_errors: usize,
    /// Hobbs minutes may differ from block minutes by this much.
    pub hobbs_tolerance_minutes: u32,
    /// Longest accepted block time.
    pub max_block_minutes: u32,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ImportOptions {
    /// Options from the `[import]` and `[flight]` configuration sections.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            dry_run: false,
            on_duplicate: config.import.on_duplicate,
            progress_interval: config.import.progress_interval.max(1),
            delimiter: config.delimiter_byte(),
            stop_after_errors: config.import.stop_after_errors,
            hobbs_tolerance_minutes: config.flight.hobbs_tolerance_minutes,
            max_block_minutes: config.flight.max_block_minutes,
        }
    }
}

/// A row that could not be imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    /// Line number in the source file.
    pub line: u64,
    /// What was wrong.
    pub message: String,
}

/// A row that was imported but deserves a look.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowWarning {
    /// Line number in the source file.
    pub line: u64,
    /// What looked off.
    pub message: String,
}

/// Running counters of an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportProgress {
    /// Data rows in the file.
    pub total: usize,
    /// Rows handled so far.
    pub processed: usize,
    /// New records written.
    pub inserted: usize,
    /// Existing records overwritten.
    pub updated: usize,
    /// Rows skipped because the record already existed.
    pub duplicates: usize,
    /// Rows rejected.
    pub failed: usize,
}

impl ImportProgress {
    /// Percentage of rows handled, 100 for an empty file.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.processed as f64 * 100.0 / self.total as f64
        }
    }
}

/// Receives progress updates during an import.
pub trait ProgressSink {
    /// Called every `progress_interval` rows and once when the run ends.
    fn report(&mut self, kind: ImportKind, progress: &ImportProgress);
}

/// Logs progress at INFO.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn report(&mut self, kind: ImportKind, progress: &ImportProgress) {
        info!(
            kind = %kind,
            processed = progress.processed,
            total = progress.total,
            inserted = progress.inserted,
            updated = progress.updated,
            duplicates = progress.duplicates,
            failed = progress.failed,
            "Import progress {:.0}%",
            progress.percent()
        );
    }
}

/// Discards progress updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _kind: ImportKind, _progress: &ImportProgress) {}
}

/// Outcome of an import run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// What was imported.
    pub kind: ImportKind,
    /// Whether writes were rolled back.
    pub dry_run: bool,
    /// Final counters.
    pub progress: ImportProgress,
    /// Rejected rows.
    pub errors: Vec<RowError>,
    /// Imported rows with remarks.
    pub warnings: Vec<RowWarning>,
    /// The error limit was hit before the end of the file.
    pub stopped_early: bool,
}

impl ImportReport {
    /// Whether every row was imported or recognised as a duplicate.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && !self.stopped_early
    }
}

/// What happened to one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowOutcome {
    Inserted,
    Updated,
    Duplicate,
}

/// Runs CSV imports against a [`Storage`].
#[derive(Debug)]
pub struct Importer<'a> {
    storage: &'a Storage,
    options: ImportOptions,
}

impl<'a> Importer<'a> {
    /// Create an importer.
    #[must_use]
    pub fn new(storage: &'a Storage, options: ImportOptions) -> Self {
        Self { storage, options }
    }

    /// The options this importer runs with.
    #[must_use]
    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    /// Import every row of `reader` as `kind`.
    ///
    /// # Errors
    ///
    /// Returns an error only for failures that affect the whole file: an
    /// unreadable header, a missing required column, or a storage failure
    /// when starting or finishing the transaction. Row problems are in the
    /// report.
    pub fn run<R: Read>(
        &self,
        kind: ImportKind,
        reader: R,
        progress: &mut dyn ProgressSink,
    ) -> Result<ImportReport> {
        let table = CsvTable::read(reader, self.options.delimiter, kind.columns())?;
        info!(
            "Importing {} rows of {}{}",
            table.len(),
            kind,
            if self.options.dry_run { " (dry run)" } else { "" }
        );

        let mode = if self.options.dry_run {
            TxMode::Rollback
        } else {
            TxMode::Commit
        };
        let report = self
            .storage
            .in_transaction(mode, |_| Ok(self.process(kind, &table, progress)))?;

        info!(
            "Imported {}: {} inserted, {} updated, {} duplicates, {} failed",
            kind,
            report.progress.inserted,
            report.progress.updated,
            report.progress.duplicates,
            report.progress.failed
        );
        Ok(report)
    }

    fn process(
        &self,
        kind: ImportKind,
        table: &CsvTable,
        sink: &mut dyn ProgressSink,
    ) -> ImportReport {
        let mut report = ImportReport {
            kind,
            dry_run: self.options.dry_run,
            progress: ImportProgress {
                total: table.len(),
                ..ImportProgress::default()
            },
            errors: Vec::new(),
            warnings: Vec::new(),
            stopped_early: false,
        };
        let mut seen = HashSet::new();

        for row in table.rows() {
            let result = match &row.record {
                Ok(record) => {
                    let fields = table.fields(record);
                    self.process_row(kind, &fields, row.line, &mut seen, &mut report.warnings)
                }
                Err(message) => Err(Error::validation(message.clone())),
            };

            report.progress.processed += 1;
            match result {
                Ok(RowOutcome::Inserted) => report.progress.inserted += 1,
                Ok(RowOutcome::Updated) => report.progress.updated += 1,
                Ok(RowOutcome::Duplicate) => report.progress.duplicates += 1,
                Err(e) => {
                    debug!("Line {} rejected: {}", row.line, e);
                    report.progress.failed += 1;
                    report.errors.push(RowError {
                        line: row.line,
                        message: e.to_string(),
                    });
                }
            }

            if report.progress.processed % self.options.progress_interval == 0 {
                sink.report(kind, &report.progress);
            }

            let limit = self.options.stop_after_errors;
            if limit > 0 && report.progress.failed >= limit {
                warn!(
                    "Stopping {} import after {} failed rows at line {}",
                    kind, report.progress.failed, row.line
                );
                report.stopped_early = report.progress.processed < report.progress.total;
                break;
            }
        }

        sink.report(kind, &report.progress);
        report
    }

    fn process_row(
        &self,
        kind: ImportKind,
        fields: &Fields<'_>,
        line: u64,
        seen: &mut HashSet<String>,
        warnings: &mut Vec<RowWarning>,
    ) -> Result<RowOutcome> {
        let policy = self.options.on_duplicate;
        let storage = self.storage;

        match kind {
            ImportKind::Users => {
                let user = rows::parse_user(fields)?;
                if !first_in_file(seen, &user.email) {
                    return Ok(RowOutcome::Duplicate);
                }
                if storage.user_exists(&user.email)? {
                    return match policy {
                        DuplicatePolicy::Skip => Ok(RowOutcome::Duplicate),
                        DuplicatePolicy::Update => {
                            storage.update_user(&user)?;
                            Ok(RowOutcome::Updated)
                        }
                    };
                }
                storage.insert_user(&user)?;
                Ok(RowOutcome::Inserted)
            }
            ImportKind::Aircraft => {
                let aircraft = rows::parse_aircraft(fields)?;
                if !first_in_file(seen, &aircraft.registration) {
                    return Ok(RowOutcome::Duplicate);
                }
                if let Some(icao) = &aircraft.icao_type {
                    if !storage.icao_type_exists(icao)? {
                        warnings.push(RowWarning {
                            line,
                            message: format!("ICAO type {icao} is not in the reference data"),
                        });
                    }
                }
                if storage.aircraft_exists(&aircraft.registration)? {
                    return match policy {
                        DuplicatePolicy::Skip => Ok(RowOutcome::Duplicate),
                        DuplicatePolicy::Update => {
                            storage.update_aircraft(&aircraft)?;
                            Ok(RowOutcome::Updated)
                        }
                    };
                }
                storage.insert_aircraft(&aircraft)?;
                Ok(RowOutcome::Inserted)
            }
            ImportKind::IcaoTypes => {
                let icao = rows::parse_icao_type(fields)?;
                if !first_in_file(seen, &icao.designator) {
                    return Ok(RowOutcome::Duplicate);
                }
                let exists = storage.icao_type_exists(&icao.designator)?;
                upsert_reference(exists, policy, || storage.upsert_icao_type(&icao))
            }
            ImportKind::Airports => {
                let airport = rows::parse_airport(fields)?;
                if !first_in_file(seen, &airport.ident) {
                    return Ok(RowOutcome::Duplicate);
                }
                let exists = storage.airport_exists(&airport.ident)?;
                upsert_reference(exists, policy, || storage.upsert_airport(&airport))
            }
            ImportKind::Areas => {
                let area = rows::parse_area(fields)?;
                if !first_in_file(seen, &area.code) {
                    return Ok(RowOutcome::Duplicate);
                }
                let exists = storage.area_exists(&area.code)?;
                upsert_reference(exists, policy, || storage.upsert_area(&area))
            }
            ImportKind::FlightLogs => self.process_flight(fields, line, seen, warnings),
        }
    }

    fn process_flight(
        &self,
        fields: &Fields<'_>,
        line: u64,
        seen: &mut HashSet<String>,
        warnings: &mut Vec<RowWarning>,
    ) -> Result<RowOutcome> {
        let storage = self.storage;
        let input = rows::parse_flight(fields)?;
        let log = FlightLog::new(input, self.options.max_block_minutes)?;

        let aircraft = storage
            .get_aircraft(&log.aircraft_registration)?
            .ok_or_else(|| Error::not_found("aircraft", log.aircraft_registration.clone()))?;
        if !storage.user_exists(&log.pilot_email)? {
            return Err(Error::not_found("pilot", log.pilot_email.clone()));
        }
        if let Some(instructor) = &log.instructor_email {
            let user = storage
                .get_user(instructor)?
                .ok_or_else(|| Error::not_found("instructor", instructor.clone()))?;
            if !user.role.can_instruct() {
                return Err(Error::validation(format!(
                    "{instructor} has role {} and cannot instruct",
                    user.role
                )));
            }
        }

        if !first_in_file(seen, &log.fingerprint) {
            return Ok(RowOutcome::Duplicate);
        }

        if !aircraft.active {
            warnings.push(RowWarning {
                line,
                message: format!("aircraft {} is marked inactive", aircraft.registration),
            });
        }
        if let Some(hobbs) = &log.hobbs {
            let check = check_hobbs(
                hobbs,
                log.categories.block,
                self.options.hobbs_tolerance_minutes,
            );
            if let HobbsCheck::Mismatch { hobbs, block, diff } = check {
                warnings.push(RowWarning {
                    line,
                    message: format!(
                        "hobbs time {} differs from block time {} by {} min",
                        format_hhmm(hobbs),
                        format_hhmm(block),
                        diff
                    ),
                });
            }
        }

        if storage.flight_exists(&log.fingerprint)? {
            return match self.options.on_duplicate {
                DuplicatePolicy::Skip => Ok(RowOutcome::Duplicate),
                DuplicatePolicy::Update => {
                    if storage.update_flight(&log)? {
                        Ok(RowOutcome::Updated)
                    } else {
                        warnings.push(RowWarning {
                            line,
                            message: "flight is already invoiced and was not updated".to_string(),
                        });
                        Ok(RowOutcome::Duplicate)
                    }
                }
            };
        }

        storage.insert_flight(&log)?;
        Ok(RowOutcome::Inserted)
    }
}

/// Record `key`; `false` if an earlier row of the file had it.
fn first_in_file(seen: &mut HashSet<String>, key: &str) -> bool {
    seen.insert(key.to_string())
}

fn upsert_reference(
    exists: bool,
    policy: DuplicatePolicy,
    write: impl FnOnce() -> Result<()>,
) -> Result<RowOutcome> {
    match (exists, policy) {
        (true, DuplicatePolicy::Skip) => Ok(RowOutcome::Duplicate),
        (true, DuplicatePolicy::Update) => write().map(|()| RowOutcome::Updated),
        (false, _) => write().map(|()| RowOutcome::Inserted),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Aircraft, Role, User};

    const FLIGHTS_HEADER: &str =
        "date,pilot_email,instructor_email,aircraft,departure,arrival,off_block,takeoff,landing,on_block,hobbs_start,hobbs_end,landings_day,role,remarks\n";

    #[derive(Default)]
    struct Recorder(Vec<ImportProgress>);

    impl ProgressSink for Recorder {
        fn report(&mut self, _kind: ImportKind, progress: &ImportProgress) {
            self.0.push(*progress);
        }
    }

    fn seeded_storage() -> Storage {
        crate::logging::init_test_logging();
        let storage = Storage::open_in_memory().unwrap();
        storage
            .insert_user(&User::new("student@school.ro", "Ana", "Pop", Role::Student).unwrap())
            .unwrap();
        storage
            .insert_user(&User::new("fi@school.ro", "Ion", "Rus", Role::Instructor).unwrap())
            .unwrap();
        storage
            .insert_user(&User::new("pilot@school.ro", "Dan", "Vlad", Role::Pilot).unwrap())
            .unwrap();
        storage
            .insert_aircraft(&Aircraft::new("YR-ABC", "Cessna 152", 85_000).unwrap())
            .unwrap();
        storage
    }

    fn run(
        storage: &Storage,
        kind: ImportKind,
        options: ImportOptions,
        csv: &str,
    ) -> ImportReport {
        Importer::new(storage, options)
            .run(kind, csv.as_bytes(), &mut NoProgress)
            .unwrap()
    }

    fn flights(rows: &[&str]) -> String {
        let mut csv = FLIGHTS_HEADER.to_string();
        for row in rows {
            csv.push_str(row);
            csv.push('\n');
        }
        csv
    }

    const DUAL: &str =
        "2024-05-14,student@school.ro,fi@school.ro,YR-ABC,LRCL,LRCL,10:00,10:10,11:05,11:15,1200.0,1201.3,3,dual,circuits";

    #[test]
    fn test_import_users_counts_and_duplicates() {
        let storage = Storage::open_in_memory().unwrap();
        let csv = "email,first_name,last_name,role\n\
                   a@school.ro,Ana,Pop,student\n\
                   A@School.ro,Ana,Pop,student\n\
                   b@school.ro,Bob,Ene,wizard\n\
                   c@school.ro,Cris,Lup,pilot\n";

        let report = run(&storage, ImportKind::Users, ImportOptions::default(), csv);
        assert_eq!(report.progress.total, 4);
        assert_eq!(report.progress.processed, 4);
        assert_eq!(report.progress.inserted, 2);
        assert_eq!(report.progress.duplicates, 1);
        assert_eq!(report.progress.failed, 1);
        assert_eq!(report.errors[0].line, 4);
        assert!(report.errors[0].message.contains("role"));
        assert!(!report.is_clean());
        assert_eq!(storage.stats().unwrap().users, 2);

        let again = run(&storage, ImportKind::Users, ImportOptions::default(), csv);
        assert_eq!(again.progress.inserted, 0);
        assert_eq!(again.progress.duplicates, 3);
    }

    #[test]
    fn test_import_users_update_policy() {
        let storage = seeded_storage();
        let options = ImportOptions {
            on_duplicate: DuplicatePolicy::Update,
            ..ImportOptions::default()
        };
        let csv = "email,first_name,last_name,role,license\nstudent@school.ro,Ana,Pop,pilot,PPL-1\n";

        let report = run(&storage, ImportKind::Users, options, csv);
        assert_eq!(report.progress.updated, 1);
        let user = storage.get_user("student@school.ro").unwrap().unwrap();
        assert_eq!(user.role, Role::Pilot);
        assert_eq!(user.license_number.as_deref(), Some("PPL-1"));
    }

    #[test]
    fn test_missing_column_fails_before_any_row() {
        let storage = Storage::open_in_memory().unwrap();
        let csv = "email,first_name,role\na@school.ro,Ana,student\n";
        let err = Importer::new(&storage, ImportOptions::default())
            .run(ImportKind::Users, csv.as_bytes(), &mut NoProgress)
            .unwrap_err();
        assert!(matches!(err, Error::MissingColumn { column: "last_name" }));
        assert_eq!(storage.stats().unwrap().users, 0);
    }

    #[test]
    fn test_import_flight_logs() {
        let storage = seeded_storage();
        let csv = flights(&[DUAL]);
        let report = run(&storage, ImportKind::FlightLogs, ImportOptions::default(), &csv);

        assert_eq!(report.progress.inserted, 1);
        assert!(report.is_clean());
        assert!(report.warnings.is_empty());

        let stored = storage
            .list_flights(&crate::storage::FlightFilter::default())
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].categories.block, 75);
        assert_eq!(stored[0].categories.dual, 75);
    }

    #[test]
    fn test_flight_references_must_exist() {
        let storage = seeded_storage();
        let csv = flights(&[
            "2024-05-14,nobody@school.ro,,YR-ABC,LRCL,LRCL,10:00,,,11:00,,,1,pic,",
            "2024-05-14,pilot@school.ro,,YR-ZZZ,LRCL,LRCL,10:00,,,11:00,,,1,pic,",
            "2024-05-14,student@school.ro,pilot@school.ro,YR-ABC,LRCL,LRCL,10:00,,,11:00,,,1,dual,",
        ]);
        let report = run(&storage, ImportKind::FlightLogs, ImportOptions::default(), &csv);

        assert_eq!(report.progress.failed, 3);
        assert!(report.errors[0].message.contains("pilot not found"));
        assert!(report.errors[1].message.contains("aircraft not found"));
        assert!(report.errors[2].message.contains("cannot instruct"));
    }

    #[test]
    fn test_hobbs_mismatch_is_a_warning() {
        let storage = seeded_storage();
        let csv = flights(&[
            "2024-05-14,pilot@school.ro,,YR-ABC,LRCL,LRTM,09:00,,,10:00,500.0,501.5,1,pic,",
        ]);
        let report = run(&storage, ImportKind::FlightLogs, ImportOptions::default(), &csv);

        assert_eq!(report.progress.inserted, 1);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].line, 2);
        assert!(report.warnings[0].message.contains("differs"));
        assert!(report.is_clean());
    }

    #[test]
    fn test_duplicate_flights_within_file_and_storage() {
        let storage = seeded_storage();
        let csv = flights(&[DUAL, DUAL]);
        let report = run(&storage, ImportKind::FlightLogs, ImportOptions::default(), &csv);
        assert_eq!(report.progress.inserted, 1);
        assert_eq!(report.progress.duplicates, 1);

        let report = run(&storage, ImportKind::FlightLogs, ImportOptions::default(), &flights(&[DUAL]));
        assert_eq!(report.progress.duplicates, 1);
        assert_eq!(storage.stats().unwrap().flight_logs, 1);
    }

    #[test]
    fn test_update_never_touches_billed_flights() {
        let storage = seeded_storage();
        run(&storage, ImportKind::FlightLogs, ImportOptions::default(), &flights(&[DUAL]));

        let id = storage
            .list_flights(&crate::storage::FlightFilter::default())
            .unwrap()[0]
            .id
            .unwrap();
        let invoice = crate::storage::Invoice {
            id: None,
            number: "PF-0001".to_string(),
            fiscal_number: None,
            status: crate::storage::InvoiceStatus::Proforma,
            pilot_email: "student@school.ro".to_string(),
            period_from: chrono::NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            period_to: chrono::NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
            currency: "RON".to_string(),
            net_cents: 0,
            vat_cents: 0,
            total_cents: 0,
            issued_at: chrono::Utc::now(),
            paid_at: None,
            lines: Vec::new(),
        };
        let invoice_id = storage.insert_invoice(&invoice).unwrap();
        storage.set_flight_invoice(&[id], Some(invoice_id)).unwrap();

        let options = ImportOptions {
            on_duplicate: DuplicatePolicy::Update,
            ..ImportOptions::default()
        };
        let changed = DUAL.replace("circuits", "stalls");
        let report = run(&storage, ImportKind::FlightLogs, options, &flights(&[changed.as_str()]));

        assert_eq!(report.progress.updated, 0);
        assert_eq!(report.progress.duplicates, 1);
        assert!(report.warnings[0].message.contains("invoiced"));
        let stored = storage.get_flight(id).unwrap().unwrap();
        assert_eq!(stored.remarks.as_deref(), Some("circuits"));
    }

    #[test]
    fn test_update_rewrites_unbilled_flight() {
        let storage = seeded_storage();
        run(&storage, ImportKind::FlightLogs, ImportOptions::default(), &flights(&[DUAL]));

        let options = ImportOptions {
            on_duplicate: DuplicatePolicy::Update,
            ..ImportOptions::default()
        };
        let changed = DUAL.replace("circuits", "stalls");
        let report = run(&storage, ImportKind::FlightLogs, options, &flights(&[changed.as_str()]));

        assert_eq!(report.progress.updated, 1);
        assert_eq!(report.progress.duplicates, 0);
        assert!(report.is_clean());
        let stored = storage
            .list_flights(&crate::storage::FlightFilter::default())
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].remarks.as_deref(), Some("stalls"));
        assert!(!stored[0].is_billed());
    }

    #[test]
    fn test_oversized_counts_fail_only_their_row() {
        let storage = seeded_storage();
        let csv = "date,pilot_email,aircraft,departure,arrival,off_block,on_block,landings_day,landings_night,night,role
                   2024-05-14,pilot@school.ro,YR-ABC,LRCL,LRCL,10:00,11:00,1,0,99999999:00,pic
                   2024-05-14,pilot@school.ro,YR-ABC,LRCL,LRCL,12:00,13:00,4294967295,1,0:30,pic
                   2024-05-14,pilot@school.ro,YR-ABC,LRCL,LRCL,14:00,15:00,100,0,,pic
                   2024-05-14,pilot@school.ro,YR-ABC,LRCL,LRCL,16:00,17:00,2,1,0:30,pic
";
        let report = run(&storage, ImportKind::FlightLogs, ImportOptions::default(), csv);

        assert_eq!(report.progress.processed, 4);
        assert_eq!(report.progress.failed, 3);
        assert_eq!(report.progress.inserted, 1);
        let lines: Vec<u64> = report.errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![2, 3, 4]);
        assert!(report.errors[0].message.contains("duration"));
        assert!(report.errors[2].message.contains("landings_day"));

        let stored = storage
            .list_flights(&crate::storage::FlightFilter::default())
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].categories.night, 30);
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let storage = seeded_storage();
        let options = ImportOptions {
            dry_run: true,
            ..ImportOptions::default()
        };
        let report = run(&storage, ImportKind::FlightLogs, options, &flights(&[DUAL]));

        assert!(report.dry_run);
        assert_eq!(report.progress.inserted, 1);
        assert_eq!(storage.stats().unwrap().flight_logs, 0);
    }

    #[test]
    fn test_stop_after_errors() {
        let storage = Storage::open_in_memory().unwrap();
        let options = ImportOptions {
            stop_after_errors: 2,
            ..ImportOptions::default()
        };
        let csv = "email,first_name,last_name,role\n\
                   bad,Ana,Pop,student\n\
                   worse,Bob,Ene,student\n\
                   c@school.ro,Cris,Lup,pilot\n";
        let report = run(&storage, ImportKind::Users, options, csv);

        assert!(report.stopped_early);
        assert_eq!(report.progress.processed, 2);
        assert_eq!(report.progress.failed, 2);
        assert_eq!(storage.stats().unwrap().users, 0);
    }

    #[test]
    fn test_progress_reported_every_interval_and_at_end() {
        let storage = Storage::open_in_memory().unwrap();
        let options = ImportOptions {
            progress_interval: 2,
            ..ImportOptions::default()
        };
        let mut csv = "code,name\n".to_string();
        for i in 0..5 {
            csv.push_str(&format!("A{i},Area {i}\n"));
        }

        let mut recorder = Recorder::default();
        Importer::new(&storage, options)
            .run(ImportKind::Areas, csv.as_bytes(), &mut recorder)
            .unwrap();

        let processed: Vec<usize> = recorder.0.iter().map(|p| p.processed).collect();
        assert_eq!(processed, vec![2, 4, 5]);
        assert_eq!(recorder.0.last().unwrap().inserted, 5);
    }

    #[test]
    fn test_reference_imports() {
        let storage = Storage::open_in_memory().unwrap();
        let icao = "designator,manufacturer,model,description,wtc\nC152,Cessna,152,L1P,L\nP28A,Piper,PA-28,L1P,L\n";
        let report = run(&storage, ImportKind::IcaoTypes, ImportOptions::default(), icao);
        assert_eq!(report.progress.inserted, 2);

        let airports = "ident,type,name,latitude_deg,longitude_deg\nLRCL,medium_airport,Cluj,46.78,23.68\n";
        let report = run(&storage, ImportKind::Airports, ImportOptions::default(), airports);
        assert_eq!(report.progress.inserted, 1);

        let options = ImportOptions {
            on_duplicate: DuplicatePolicy::Update,
            ..ImportOptions::default()
        };
        let renamed = "ident,type,name,latitude_deg,longitude_deg\nLRCL,medium_airport,Cluj Avram Iancu,46.78,23.68\n";
        let report = run(&storage, ImportKind::Airports, options, renamed);
        assert_eq!(report.progress.updated, 1);
        assert_eq!(
            storage.get_airport("LRCL").unwrap().unwrap().name,
            "Cluj Avram Iancu"
        );
    }

    #[test]
    fn test_aircraft_with_unknown_icao_type_warns() {
        let storage = Storage::open_in_memory().unwrap();
        let csv = "registration,model,hourly_rate,icao_type\nYR-XYZ,Zlin,900,Z42\n";
        let report = run(&storage, ImportKind::Aircraft, ImportOptions::default(), csv);
        assert_eq!(report.progress.inserted, 1);
        assert!(report.warnings[0].message.contains("Z42"));
    }

    #[test]
    fn test_malformed_row_is_captured() {
        let storage = Storage::open_in_memory().unwrap();
        let csv = b"code,name\nA1,Area\nA2,\xff\xfe\n";
        let report = Importer::new(&storage, ImportOptions::default())
            .run(ImportKind::Areas, &csv[..], &mut NoProgress)
            .unwrap();
        assert_eq!(report.progress.inserted, 1);
        assert_eq!(report.progress.failed, 1);
        assert_eq!(report.errors[0].line, 3);
    }

    #[test]
    fn test_import_kind_names() {
        assert_eq!(ImportKind::FlightLogs.to_string(), "flight_logs");
        assert_eq!(ImportKind::ALL.len(), 6);
        assert_eq!(ImportKind::ALL.last(), Some(&ImportKind::FlightLogs));
    }
}
