//! Local invoicing: proforma invoices for unbilled flights, converted to
//! fiscal invoices once payment is confirmed.
//!
//! Each operation runs in its own transaction, so a failure leaves neither
//! a half-written invoice nor a consumed invoice number behind.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use tracing::{debug, info};

use crate::config::BillingConfig;
use crate::error::{Error, Result};
use crate::flight_time::format_hhmm;
use crate::model::money::{format_cents, percent_of};
use crate::model::user::normalize_email;
use crate::model::{Aircraft, FlightLog};
use crate::storage::{Invoice, InvoiceLine, InvoiceStatus, Storage, TxMode};

/// Issues and settles invoices against a [`Storage`].
#[derive(Debug)]
pub struct Billing<'a> {
    storage: &'a Storage,
    config: BillingConfig,
}

/// Net price of `minutes` at an hourly rate, rounded to the nearest cent.
///
/// # Errors
///
/// Returns a validation error if the amount does not fit in `i64` cents.
pub fn price_minutes(rate_cents: i64, minutes: u32) -> Result<i64> {
    rate_cents
        .checked_mul(i64::from(minutes))
        .and_then(|scaled| scaled.checked_add(30))
        .map(|scaled| scaled.div_euclid(60))
        .ok_or_else(|| {
            Error::validation(format!(
                "{} at {}/h is out of range",
                format_hhmm(minutes),
                format_cents(rate_cents)
            ))
        })
}

fn price_line(log: &FlightLog, aircraft: &Aircraft) -> Result<InvoiceLine> {
    let minutes = log.billable_minutes(aircraft.billing_basis);
    Ok(InvoiceLine {
        flight_id: log.id,
        description: format!(
            "{} {} {}-{} {} ({})",
            log.date,
            log.aircraft_registration,
            log.departure,
            log.arrival,
            format_hhmm(minutes),
            aircraft.billing_basis
        ),
        minutes,
        rate_cents: aircraft.hourly_rate_cents,
        amount_cents: price_minutes(aircraft.hourly_rate_cents, minutes)?,
    })
}

fn checked_total(amounts: impl IntoIterator<Item = i64>) -> Result<i64> {
    amounts
        .into_iter()
        .try_fold(0_i64, i64::checked_add)
        .ok_or_else(|| Error::validation("invoice total is out of range"))
}

impl<'a> Billing<'a> {
    /// Create a billing service.
    #[must_use]
    pub fn new(storage: &'a Storage, config: BillingConfig) -> Self {
        Self { storage, config }
    }

    /// Issue a proforma invoice for the pilot's unbilled flights in `[from, to]`.
    ///
    /// The flights are attached to the new invoice and will not be billed again.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty range or when there is nothing
    /// to bill, and a not-found error for an unknown pilot or aircraft.
    pub fn issue_proforma(&self, pilot: &str, from: NaiveDate, to: NaiveDate) -> Result<Invoice> {
        let pilot = normalize_email("pilot", pilot)?;
        if from > to {
            return Err(Error::validation(format!(
                "billing period starts after it ends ({from} > {to})"
            )));
        }

        self.storage.in_transaction(TxMode::Commit, |storage| {
            if !storage.user_exists(&pilot)? {
                return Err(Error::not_found("pilot", pilot.clone()));
            }
            let flights = storage.unbilled_flights(&pilot, from, to)?;
            if flights.is_empty() {
                return Err(Error::validation(format!(
                    "no unbilled flights for {pilot} between {from} and {to}"
                )));
            }

            let mut fleet: HashMap<String, Aircraft> = HashMap::new();
            let mut lines = Vec::with_capacity(flights.len());
            for log in &flights {
                if !fleet.contains_key(&log.aircraft_registration) {
                    let aircraft = storage
                        .get_aircraft(&log.aircraft_registration)?
                        .ok_or_else(|| {
                            Error::not_found("aircraft", log.aircraft_registration.clone())
                        })?;
                    fleet.insert(log.aircraft_registration.clone(), aircraft);
                }
                if let Some(aircraft) = fleet.get(&log.aircraft_registration) {
                    lines.push(price_line(log, aircraft)?);
                }
            }

            let net_cents = checked_total(lines.iter().map(|l| l.amount_cents))?;
            let vat_cents = percent_of(net_cents, self.config.vat_percent)?;
            let total_cents = checked_total([net_cents, vat_cents])?;
            let mut invoice = Invoice {
                id: None,
                number: storage.next_invoice_number(&self.config.proforma_series)?,
                fiscal_number: None,
                status: InvoiceStatus::Proforma,
                pilot_email: pilot.clone(),
                period_from: from,
                period_to: to,
                currency: self.config.currency.clone(),
                net_cents,
                vat_cents,
                total_cents,
                issued_at: Utc::now(),
                paid_at: None,
                lines,
            };

            let id = storage.insert_invoice(&invoice)?;
            let flight_ids: Vec<i64> = flights.iter().filter_map(|f| f.id).collect();
            storage.set_flight_invoice(&flight_ids, Some(id))?;
            invoice.id = Some(id);

            info!(
                "Issued {} for {}: {} flights, {} {}",
                invoice.number,
                pilot,
                flight_ids.len(),
                format_cents(invoice.total_cents),
                invoice.currency
            );
            Ok(invoice)
        })
    }

    /// Confirm payment of a proforma and give it the next fiscal number.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for an unknown number and an invalid-state
    /// error unless the invoice is still a proforma.
    pub fn confirm_payment(&self, number: &str) -> Result<Invoice> {
        self.storage.in_transaction(TxMode::Commit, |storage| {
            let invoice = self.proforma(storage, number, "paid")?;
            let id = invoice.id.ok_or_else(|| Error::internal("stored invoice without id"))?;

            let fiscal = storage.next_invoice_number(&self.config.fiscal_series)?;
            storage.mark_invoice_paid(id, &fiscal, Utc::now())?;
            info!("Invoice {} paid as {}", invoice.number, fiscal);

            storage
                .get_invoice(&invoice.number)?
                .ok_or_else(|| Error::not_found("invoice", invoice.number.clone()))
        })
    }

    /// Cancel a proforma and release its flights for billing.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for an unknown number and an invalid-state
    /// error unless the invoice is still a proforma.
    pub fn cancel(&self, number: &str) -> Result<Invoice> {
        self.storage.in_transaction(TxMode::Commit, |storage| {
            let mut invoice = self.proforma(storage, number, "cancelled")?;
            let id = invoice.id.ok_or_else(|| Error::internal("stored invoice without id"))?;

            storage.set_invoice_status(id, InvoiceStatus::Cancelled)?;
            let released = storage.release_flights(id)?;
            info!("Cancelled {}, released {} flights", invoice.number, released);

            invoice.status = InvoiceStatus::Cancelled;
            Ok(invoice)
        })
    }

    /// Fetch an invoice by proforma or fiscal number.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for an unknown number.
    pub fn show(&self, number: &str) -> Result<Invoice> {
        self.storage
            .get_invoice(number.trim())?
            .ok_or_else(|| Error::not_found("invoice", number.trim()))
    }

    /// List invoices, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list(&self, pilot: Option<&str>) -> Result<Vec<Invoice>> {
        let pilot = pilot.map(|p| normalize_email("pilot", p)).transpose()?;
        self.storage.list_invoices(pilot.as_deref())
    }

    fn proforma(&self, storage: &Storage, number: &str, action: &str) -> Result<Invoice> {
        let invoice = storage
            .get_invoice(number.trim())?
            .ok_or_else(|| Error::not_found("invoice", number.trim()))?;
        debug!("Loaded {} ({})", invoice.number, invoice.status);
        if invoice.status != InvoiceStatus::Proforma {
            return Err(Error::invalid_state(format!(
                "invoice {} is {} and cannot be {action}",
                invoice.number, invoice.status
            )));
        }
        Ok(invoice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::flight_log::tests::sample_input;
    use crate::model::{BillingBasis, Role, User};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn seeded(basis: BillingBasis) -> Storage {
        crate::logging::init_test_logging();
        let storage = Storage::open_in_memory().unwrap();
        storage
            .insert_user(&User::new("student@school.ro", "Ana", "Pop", Role::Student).unwrap())
            .unwrap();
        storage
            .insert_user(&User::new("fi@school.ro", "Ion", "Rus", Role::Instructor).unwrap())
            .unwrap();
        let mut aircraft = Aircraft::new("YR-ABC", "Cessna 152", 85_000).unwrap();
        aircraft.billing_basis = basis;
        storage.insert_aircraft(&aircraft).unwrap();
        storage
            .insert_flight(&FlightLog::new(sample_input(), 1080).unwrap())
            .unwrap();
        storage
    }

    fn billing(storage: &Storage) -> Billing<'_> {
        Billing::new(storage, BillingConfig::default())
    }

    #[test]
    fn test_price_minutes_rounds() {
        assert_eq!(price_minutes(85_000, 60).unwrap(), 85_000);
        assert_eq!(price_minutes(85_000, 75).unwrap(), 106_250);
        assert_eq!(price_minutes(100, 1).unwrap(), 2);
        assert_eq!(price_minutes(100, 0).unwrap(), 0);
    }

    #[test]
    fn test_price_minutes_out_of_range() {
        assert!(price_minutes(i64::MAX, 2).unwrap_err().is_validation());
        assert!(price_minutes(i64::MAX / 60, 61).is_err());
        assert_eq!(price_minutes(i64::MAX, 0).unwrap(), 0);
    }

    #[test]
    fn test_checked_total() {
        assert_eq!(checked_total([1, 2, 3]).unwrap(), 6);
        assert_eq!(checked_total(Vec::new()).unwrap(), 0);
        assert!(checked_total([i64::MAX, 1]).is_err());
    }

    #[test]
    fn test_oversized_rate_rolls_back_issue() {
        let storage = seeded(BillingBasis::Block);
        let mut aircraft = storage.get_aircraft("YR-ABC").unwrap().unwrap();
        aircraft.hourly_rate_cents = i64::MAX / 2;
        storage.update_aircraft(&aircraft).unwrap();

        let b = billing(&storage);
        let err = b
            .issue_proforma("student@school.ro", day(1), day(31))
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(storage.stats().unwrap().unbilled_flights, 1);

        aircraft.hourly_rate_cents = 85_000;
        storage.update_aircraft(&aircraft).unwrap();
        let invoice = b.issue_proforma("student@school.ro", day(1), day(31)).unwrap();
        assert_eq!(invoice.number, "PF-0001");
    }

    #[test]
    fn test_issue_proforma_block_basis() {
        let storage = seeded(BillingBasis::Block);
        let invoice = billing(&storage)
            .issue_proforma("Student@School.ro", day(1), day(31))
            .unwrap();

        assert_eq!(invoice.number, "PF-0001");
        assert_eq!(invoice.status, InvoiceStatus::Proforma);
        assert_eq!(invoice.lines.len(), 1);
        assert_eq!(invoice.lines[0].minutes, 75);
        assert_eq!(invoice.net_cents, 106_250);
        assert_eq!(invoice.vat_cents, 20_188);
        assert_eq!(invoice.total_cents, 126_438);
        assert_eq!(storage.stats().unwrap().unbilled_flights, 0);
    }

    #[test]
    fn test_issue_proforma_hobbs_basis() {
        let storage = seeded(BillingBasis::Hobbs);
        let invoice = billing(&storage)
            .issue_proforma("student@school.ro", day(1), day(31))
            .unwrap();
        assert_eq!(invoice.lines[0].minutes, 78);
        assert_eq!(invoice.net_cents, 110_500);
    }

    #[test]
    fn test_nothing_to_bill() {
        let storage = seeded(BillingBasis::Block);
        let err = billing(&storage)
            .issue_proforma("student@school.ro", day(20), day(31))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        billing(&storage)
            .issue_proforma("student@school.ro", day(1), day(31))
            .unwrap();
        let err = billing(&storage)
            .issue_proforma("student@school.ro", day(1), day(31))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_failed_issue_does_not_consume_a_number() {
        let storage = seeded(BillingBasis::Block);
        let b = billing(&storage);
        assert!(b.issue_proforma("student@school.ro", day(20), day(31)).is_err());
        let invoice = b.issue_proforma("student@school.ro", day(1), day(31)).unwrap();
        assert_eq!(invoice.number, "PF-0001");
    }

    #[test]
    fn test_unknown_pilot_and_bad_range() {
        let storage = seeded(BillingBasis::Block);
        let b = billing(&storage);
        assert!(b
            .issue_proforma("nobody@school.ro", day(1), day(31))
            .unwrap_err()
            .is_not_found());
        assert!(matches!(
            b.issue_proforma("student@school.ro", day(31), day(1)),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_confirm_payment() {
        let storage = seeded(BillingBasis::Block);
        let b = billing(&storage);
        b.issue_proforma("student@school.ro", day(1), day(31)).unwrap();

        let paid = b.confirm_payment("PF-0001").unwrap();
        assert_eq!(paid.status, InvoiceStatus::Fiscal);
        assert_eq!(paid.fiscal_number.as_deref(), Some("FS-0001"));
        assert!(paid.paid_at.is_some());
        assert_eq!(b.show("FS-0001").unwrap().number, "PF-0001");

        let err = b.confirm_payment("PF-0001").unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
        assert!(b.cancel("PF-0001").is_err());
    }

    #[test]
    fn test_cancel_releases_flights() {
        let storage = seeded(BillingBasis::Block);
        let b = billing(&storage);
        b.issue_proforma("student@school.ro", day(1), day(31)).unwrap();

        let cancelled = b.cancel("PF-0001").unwrap();
        assert_eq!(cancelled.status, InvoiceStatus::Cancelled);
        assert_eq!(storage.stats().unwrap().unbilled_flights, 1);
        assert!(matches!(
            b.confirm_payment("PF-0001"),
            Err(Error::InvalidState(_))
        ));

        let reissued = b.issue_proforma("student@school.ro", day(1), day(31)).unwrap();
        assert_eq!(reissued.number, "PF-0002");
        assert_eq!(b.list(None).unwrap().len(), 2);
    }

    #[test]
    fn test_unknown_invoice() {
        let storage = seeded(BillingBasis::Block);
        let b = billing(&storage);
        assert!(b.show("PF-9999").unwrap_err().is_not_found());
        assert!(b.confirm_payment("PF-9999").unwrap_err().is_not_found());
        assert!(b.cancel("PF-9999").unwrap_err().is_not_found());
    }
}
