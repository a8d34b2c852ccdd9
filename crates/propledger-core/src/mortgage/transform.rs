//! Backend mortgage payloads into fully-defaulted mortgage accounts.
//!
//! The marketplace API returns mortgage records where nearly every field
//! may be missing, ids come as either `_id` or `id`, and related entities
//! arrive nested. Every field here is optional on the way in and has one
//! defaulting rule on the way out, so downstream code never checks for
//! absence again.

use log::warn;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::mortgage::calculator::{self, generate_payment_schedule};
use crate::mortgage::schedule::{
    default_method, PaymentKind, PaymentRecord, PaymentScheduleEntry, PaymentStatus,
};
use crate::mortgage::tracker;
use crate::types::{Money, Percent, Timestamp};
use crate::PropLedgerResult;

const UNKNOWN_PROPERTY: &str = "Unknown Property";
const UNKNOWN_LOCATION: &str = "Location not specified";
const UNKNOWN_BANK: &str = "Unknown Bank";
const DEFAULT_STATUS: &str = "active";

// ---------------------------------------------------------------------------
// Backend payload
// ---------------------------------------------------------------------------

/// Lists may arrive as `null`; treat that like a missing key.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendProperty {
    #[serde(alias = "_id")]
    pub id: Option<String>,
    pub title: Option<String>,
    pub location: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub price: Option<Money>,
    #[serde(deserialize_with = "null_as_empty")]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendParty {
    #[serde(alias = "_id")]
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendPayment {
    #[serde(alias = "_id")]
    pub id: Option<String>,
    pub payment_number: Option<u32>,
    pub amount: Option<Money>,
    pub due_date: Option<Timestamp>,
    pub paid_date: Option<Timestamp>,
    pub status: Option<String>,
    pub payment_method: Option<String>,
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
}

/// Mortgage record as returned by the marketplace API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendMortgage {
    #[serde(alias = "_id")]
    pub id: Option<String>,
    pub property: Option<BackendProperty>,
    pub property_id: Option<String>,
    pub buyer: Option<BackendParty>,
    pub buyer_id: Option<String>,
    pub mortgage_bank: Option<BackendParty>,
    pub loan_amount: Option<Money>,
    pub down_payment: Option<Money>,
    pub interest_rate: Option<Percent>,
    pub loan_term_years: Option<u32>,
    pub monthly_payment: Option<Money>,
    pub total_payments: Option<u32>,
    pub payments_made: Option<u32>,
    pub payments_remaining: Option<u32>,
    pub start_date: Option<Timestamp>,
    pub next_payment_date: Option<Timestamp>,
    pub status: Option<String>,
    #[serde(deserialize_with = "null_as_empty")]
    pub payment_history: Vec<BackendPayment>,
    pub remaining_balance: Option<Money>,
    pub total_paid: Option<Money>,
    pub auto_pay: Option<bool>,
    pub created_at: Option<Timestamp>,
    pub updated_at: Option<Timestamp>,
}

// ---------------------------------------------------------------------------
// Defaulted account
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MortgageAccount {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_id: Option<String>,
    pub property_title: String,
    pub property_location: String,
    pub property_price: Money,
    pub property_images: Vec<String>,
    pub bank_name: String,
    pub loan_amount: Money,
    pub down_payment: Money,
    pub annual_rate_pct: Percent,
    pub term_years: u32,
    pub monthly_payment: Money,
    pub total_payments: u32,
    pub payments_made: u32,
    pub payments_remaining: u32,
    pub start_date: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_payment_date: Option<Timestamp>,
    pub status: String,
    pub payment_history: Vec<PaymentRecord>,
    pub payment_schedule: Vec<PaymentScheduleEntry>,
    pub remaining_balance: Money,
    pub total_paid: Money,
    pub auto_pay: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

fn payment_record(index: usize, payment: &BackendPayment) -> PaymentRecord {
    let status = match payment.status.as_deref() {
        Some(s) if s.eq_ignore_ascii_case("paid") => PaymentStatus::Paid,
        _ => PaymentStatus::Pending,
    };

    PaymentRecord {
        id: payment
            .id
            .clone()
            .unwrap_or_else(|| format!("PAY-{index}-{}", Uuid::new_v4())),
        sequence_number: payment.payment_number,
        amount: payment.amount.unwrap_or(Decimal::ZERO),
        due_date: payment.due_date,
        paid_date: payment.paid_date,
        status,
        method: payment.payment_method.clone().unwrap_or_else(default_method),
        transaction_id: payment.transaction_id.clone(),
        notes: payment.notes.clone(),
    }
}

fn property_location(property: &BackendProperty) -> String {
    if let Some(location) = property.location.as_ref().filter(|l| !l.is_empty()) {
        return location.clone();
    }
    match (&property.city, &property.state) {
        (Some(city), Some(state)) if !city.is_empty() && !state.is_empty() => {
            format!("{city}, {state}")
        }
        _ => UNKNOWN_LOCATION.to_string(),
    }
}

/// Build a mortgage account from a backend record: generate its schedule,
/// reconcile the history against it, and fill every missing field.
///
/// `as_of` stands in for "now" wherever the record lacks a date.
pub fn transform_mortgage(
    backend: &BackendMortgage,
    as_of: Timestamp,
) -> PropLedgerResult<MortgageAccount> {
    let property = backend.property.clone().unwrap_or_default();
    let loan_amount = backend.loan_amount.unwrap_or(Decimal::ZERO);
    let down_payment = backend.down_payment.unwrap_or(Decimal::ZERO);
    let annual_rate_pct = backend.interest_rate.unwrap_or(Decimal::ZERO);
    let term_years = backend.loan_term_years.unwrap_or(0);
    let start_date = backend.start_date.unwrap_or(as_of);

    let payment_history: Vec<PaymentRecord> = backend
        .payment_history
        .iter()
        .enumerate()
        .map(|(i, p)| payment_record(i, p))
        .collect();

    let mut schedule = generate_payment_schedule(
        loan_amount,
        annual_rate_pct,
        term_years,
        start_date,
        down_payment,
    )?;
    tracker::reconcile(&mut schedule, &payment_history);

    let monthly = || {
        schedule
            .iter()
            .filter(|e| e.kind == PaymentKind::Monthly)
    };
    let scheduled = monthly().count() as u32;
    let paid = monthly().filter(|e| e.is_paid()).count() as u32;

    let total_paid = backend.total_paid.unwrap_or_else(|| {
        payment_history
            .iter()
            .filter(|p| p.status == PaymentStatus::Paid)
            .map(|p| p.amount)
            .sum()
    });

    let next_payment_date = backend
        .next_payment_date
        .or_else(|| tracker::next_payment(&schedule, as_of).map(|e| e.due_date));

    Ok(MortgageAccount {
        id: backend.id.clone(),
        user_id: backend
            .buyer
            .as_ref()
            .and_then(|b| b.id.clone())
            .or_else(|| backend.buyer_id.clone()),
        property_id: property.id.clone().or_else(|| backend.property_id.clone()),
        property_title: property
            .title
            .clone()
            .unwrap_or_else(|| UNKNOWN_PROPERTY.to_string()),
        property_location: property_location(&property),
        property_price: property.price.unwrap_or(Decimal::ZERO),
        property_images: property.images.clone(),
        bank_name: backend
            .mortgage_bank
            .as_ref()
            .and_then(|b| b.name.clone())
            .unwrap_or_else(|| UNKNOWN_BANK.to_string()),
        loan_amount,
        down_payment,
        annual_rate_pct,
        term_years,
        monthly_payment: backend.monthly_payment.unwrap_or_else(|| {
            calculator::monthly_payment(loan_amount, annual_rate_pct, term_years)
        }),
        total_payments: backend.total_payments.unwrap_or(scheduled),
        payments_made: backend.payments_made.unwrap_or(paid),
        payments_remaining: backend
            .payments_remaining
            .unwrap_or(scheduled.saturating_sub(paid)),
        start_date,
        next_payment_date,
        status: backend
            .status
            .clone()
            .unwrap_or_else(|| DEFAULT_STATUS.to_string()),
        payment_history,
        remaining_balance: backend.remaining_balance.unwrap_or(loan_amount),
        total_paid,
        auto_pay: backend.auto_pay.unwrap_or(false),
        created_at: backend.created_at.unwrap_or(as_of),
        updated_at: backend.updated_at.unwrap_or(as_of),
        payment_schedule: schedule,
    })
}

/// Transform a batch of backend records. Records whose schedule cannot be
/// built are dropped with a warning.
pub fn transform_mortgages(backend: &[BackendMortgage], as_of: Timestamp) -> Vec<MortgageAccount> {
    backend
        .iter()
        .filter_map(|record| match transform_mortgage(record, as_of) {
            Ok(account) => Some(account),
            Err(e) => {
                warn!(
                    "transform: skipping mortgage {}: {e}",
                    record.id.as_deref().unwrap_or("<no id>")
                );
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn as_of() -> Timestamp {
        Utc.with_ymd_and_hms(2025, 3, 20, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_record_defaults() {
        let account = transform_mortgage(&BackendMortgage::default(), as_of()).unwrap();
        assert_eq!(account.property_title, "Unknown Property");
        assert_eq!(account.property_location, "Location not specified");
        assert_eq!(account.bank_name, "Unknown Bank");
        assert_eq!(account.status, "active");
        assert_eq!(account.loan_amount, Decimal::ZERO);
        assert_eq!(account.monthly_payment, Decimal::ZERO);
        assert!(account.payment_schedule.is_empty());
        assert_eq!(account.start_date, as_of());
        assert_eq!(account.created_at, as_of());
        assert!(!account.auto_pay);
    }

    #[test]
    fn test_backend_json_with_history() {
        let json = serde_json::json!({
            "_id": "mtg-1",
            "property": { "_id": "prop-9", "title": "Lekki Duplex", "city": "Lagos", "state": "LA", "price": 12000000 },
            "buyer": { "_id": "user-3" },
            "mortgageBank": { "name": "First Bank" },
            "loanAmount": 1000000,
            "downPayment": 200000,
            "interestRate": 12,
            "loanTermYears": 5,
            "startDate": "2025-01-15T09:00:00Z",
            "paymentHistory": [
                { "_id": "p0", "paymentNumber": 0, "amount": 200000, "status": "paid",
                  "paidDate": "2025-01-15T10:00:00Z", "paymentMethod": "bank_transfer" },
                { "_id": "p1", "amount": 22244, "status": "paid",
                  "dueDate": "2025-02-15T00:00:00Z", "paidDate": "2025-02-14T10:00:00Z" },
                { "_id": "p2", "paymentNumber": 2, "amount": 22244, "status": "failed" }
            ]
        });
        let backend: BackendMortgage = serde_json::from_value(json).unwrap();
        let account = transform_mortgage(&backend, as_of()).unwrap();

        assert_eq!(account.id.as_deref(), Some("mtg-1"));
        assert_eq!(account.user_id.as_deref(), Some("user-3"));
        assert_eq!(account.property_id.as_deref(), Some("prop-9"));
        assert_eq!(account.property_location, "Lagos, LA");
        assert_eq!(account.bank_name, "First Bank");
        assert_eq!(account.monthly_payment, dec!(22_244));
        assert_eq!(account.payment_schedule.len(), 61);

        assert!(account.payment_schedule[0].is_paid());
        assert_eq!(
            account.payment_schedule[0].payment_method.as_deref(),
            Some("bank_transfer")
        );
        // Matched by due day, method defaulted
        assert!(account.payment_schedule[1].is_paid());
        assert_eq!(account.payment_schedule[1].payment_method.as_deref(), Some("manual"));
        assert!(account.payment_schedule[2].is_pending());

        assert_eq!(account.total_payments, 60);
        assert_eq!(account.payments_made, 1);
        assert_eq!(account.payments_remaining, 59);
        assert_eq!(account.total_paid, dec!(222_244));
        assert_eq!(account.remaining_balance, dec!(1_000_000));
        assert_eq!(
            account.next_payment_date,
            Some(Utc.with_ymd_and_hms(2025, 4, 15, 9, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_null_lists_default_to_empty() {
        let json = serde_json::json!({
            "id": "mtg-2",
            "paymentHistory": null,
            "property": { "title": "Ikoyi Flat", "images": null }
        });
        let backend: BackendMortgage = serde_json::from_value(json).unwrap();
        assert!(backend.payment_history.is_empty());

        let account = transform_mortgage(&backend, as_of()).unwrap();
        assert_eq!(account.property_title, "Ikoyi Flat");
        assert!(account.property_images.is_empty());
        assert!(account.payment_history.is_empty());
    }

    #[test]
    fn test_backend_values_take_precedence() {
        let backend = BackendMortgage {
            loan_amount: Some(dec!(1_000_000)),
            interest_rate: Some(dec!(12)),
            loan_term_years: Some(5),
            monthly_payment: Some(dec!(25_000)),
            payments_made: Some(7),
            remaining_balance: Some(dec!(900_000)),
            status: Some("overdue".into()),
            ..Default::default()
        };
        let account = transform_mortgage(&backend, as_of()).unwrap();
        assert_eq!(account.monthly_payment, dec!(25_000));
        assert_eq!(account.payments_made, 7);
        assert_eq!(account.remaining_balance, dec!(900_000));
        assert_eq!(account.status, "overdue");
    }

    #[test]
    fn test_transform_batch() {
        let records = vec![BackendMortgage::default(), BackendMortgage::default()];
        assert_eq!(transform_mortgages(&records, as_of()).len(), 2);
    }
}
