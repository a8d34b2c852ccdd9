use chrono::{DateTime, Utc};
use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;
use serde::Deserialize;

use propledger_core::escrow::lifecycle::{self, EscrowAction};
use propledger_core::escrow::{fees, timer, transactions_for_user, EscrowTransaction};
use propledger_core::mortgage::calculator::{self, MortgageInput};
use propledger_core::mortgage::transform::{self, BackendMortgage};
use propledger_core::mortgage::{tracker, PaymentRecord, PaymentScheduleEntry};
use propledger_core::Timestamp;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Optional RFC 3339 instant from JS; absent means now.
/// Decimal from a JS string such as "10000000" or "12.5".
fn parse_decimal(value: &str, field: &str) -> NapiResult<Decimal> {
    value
        .trim()
        .parse::<Decimal>()
        .map_err(|e| to_napi_error(format!("{field} '{value}' is not a number: {e}")))
}

fn parse_as_of(as_of: Option<String>) -> NapiResult<Timestamp> {
    match as_of {
        Some(s) => DateTime::parse_from_rfc3339(&s)
            .map(|d| d.with_timezone(&Utc))
            .map_err(|e| to_napi_error(format!("asOf '{s}' is not an RFC 3339 date: {e}"))),
        None => Ok(Utc::now()),
    }
}

// ---------------------------------------------------------------------------
// Amortization
// ---------------------------------------------------------------------------

#[napi]
pub fn monthly_payment(
    principal: String,
    annual_rate_pct: String,
    term_years: u32,
) -> NapiResult<String> {
    let payment = calculator::monthly_payment(
        parse_decimal(&principal, "principal")?,
        parse_decimal(&annual_rate_pct, "annualRatePct")?,
        term_years,
    );
    Ok(payment.to_string())
}

#[napi]
pub fn total_interest(
    principal: String,
    annual_rate_pct: String,
    term_years: u32,
) -> NapiResult<String> {
    let interest = calculator::total_interest(
        parse_decimal(&principal, "principal")?,
        parse_decimal(&annual_rate_pct, "annualRatePct")?,
        term_years,
    );
    Ok(interest.to_string())
}

#[napi]
pub fn analyze_mortgage(input_json: String) -> NapiResult<String> {
    let input: MortgageInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = calculator::analyze_mortgage(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[derive(Deserialize)]
struct ScheduleRequest {
    principal: Decimal,
    annual_rate_pct: Decimal,
    term_years: u32,
    #[serde(default)]
    down_payment: Decimal,
    #[serde(default = "Utc::now")]
    start_date: Timestamp,
}

#[napi]
pub fn generate_payment_schedule(input_json: String) -> NapiResult<String> {
    let req: ScheduleRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let schedule = calculator::generate_payment_schedule(
        req.principal,
        req.annual_rate_pct,
        req.term_years,
        req.start_date,
        req.down_payment,
    )
    .map_err(to_napi_error)?;
    serde_json::to_string(&schedule).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Backend records and tracking
// ---------------------------------------------------------------------------

#[napi]
pub fn transform_mortgage(mortgage_json: String, as_of: Option<String>) -> NapiResult<String> {
    let backend: BackendMortgage = serde_json::from_str(&mortgage_json).map_err(to_napi_error)?;
    let account =
        transform::transform_mortgage(&backend, parse_as_of(as_of)?).map_err(to_napi_error)?;
    serde_json::to_string(&account).map_err(to_napi_error)
}

#[napi]
pub fn transform_mortgages(mortgages_json: String, as_of: Option<String>) -> NapiResult<String> {
    let backend: Vec<BackendMortgage> =
        serde_json::from_str(&mortgages_json).map_err(to_napi_error)?;
    let accounts = transform::transform_mortgages(&backend, parse_as_of(as_of)?);
    serde_json::to_string(&accounts).map_err(to_napi_error)
}

#[napi]
pub fn next_payment(schedule_json: String, as_of: Option<String>) -> NapiResult<String> {
    let schedule: Vec<PaymentScheduleEntry> =
        serde_json::from_str(&schedule_json).map_err(to_napi_error)?;
    let next = tracker::next_payment(&schedule, parse_as_of(as_of)?);
    serde_json::to_string(&next).map_err(to_napi_error)
}

#[napi]
pub fn days_until_payment(due_date: String, as_of: Option<String>) -> NapiResult<i64> {
    let due = parse_as_of(Some(due_date))?;
    Ok(tracker::days_until_payment(due, parse_as_of(as_of)?))
}

/// Returns the reconciled schedule.
#[napi]
pub fn reconcile(schedule_json: String, history_json: String) -> NapiResult<String> {
    let mut schedule: Vec<PaymentScheduleEntry> =
        serde_json::from_str(&schedule_json).map_err(to_napi_error)?;
    let history: Vec<PaymentRecord> = serde_json::from_str(&history_json).map_err(to_napi_error)?;
    tracker::reconcile(&mut schedule, &history);
    serde_json::to_string(&schedule).map_err(to_napi_error)
}

#[napi]
pub fn upcoming_payments(
    schedule_json: String,
    days_ahead: u32,
    as_of: Option<String>,
) -> NapiResult<String> {
    let schedule: Vec<PaymentScheduleEntry> =
        serde_json::from_str(&schedule_json).map_err(to_napi_error)?;
    let upcoming = tracker::upcoming_payments(&schedule, days_ahead, parse_as_of(as_of)?);
    serde_json::to_string(&upcoming).map_err(to_napi_error)
}

#[napi]
pub fn payment_outlook(
    schedule_json: String,
    days_ahead: u32,
    as_of: Option<String>,
) -> NapiResult<String> {
    let schedule: Vec<PaymentScheduleEntry> =
        serde_json::from_str(&schedule_json).map_err(to_napi_error)?;
    let outlook = tracker::payment_outlook(&schedule, days_ahead, parse_as_of(as_of)?);
    serde_json::to_string(&outlook).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Escrow
// ---------------------------------------------------------------------------

/// Apply `{"action": "...", ...}` to a transaction and return
/// `{"transaction": ..., "changed": bool}`.
#[napi]
pub fn escrow_transition(
    transaction_json: String,
    action_json: String,
    as_of: Option<String>,
) -> NapiResult<String> {
    let mut tx: EscrowTransaction =
        serde_json::from_str(&transaction_json).map_err(to_napi_error)?;
    let action: EscrowAction = serde_json::from_str(&action_json).map_err(to_napi_error)?;
    let changed = lifecycle::apply(&mut tx, &action, parse_as_of(as_of)?).map_err(to_napi_error)?;
    serde_json::to_string(&serde_json::json!({
        "transaction": tx,
        "changed": changed,
    }))
    .map_err(to_napi_error)
}

#[napi]
pub fn escrow_timer(transaction_json: String, as_of: Option<String>) -> NapiResult<String> {
    let tx: EscrowTransaction = serde_json::from_str(&transaction_json).map_err(to_napi_error)?;
    let countdown = timer::transaction_timer(&tx, parse_as_of(as_of)?);
    serde_json::to_string(&countdown).map_err(to_napi_error)
}

#[napi]
pub fn escrow_fees(amount: String, processing_fee: Option<String>) -> NapiResult<String> {
    let amount = parse_decimal(&amount, "amount")?;
    let processing = match processing_fee {
        Some(fee) => parse_decimal(&fee, "processingFee")?,
        None => Decimal::ZERO,
    };
    let breakdown = fees::fee_breakdown(amount, processing);
    serde_json::to_string(&serde_json::json!({
        "fees": breakdown,
        "totalPayable": amount + breakdown.total_fees,
    }))
    .map_err(to_napi_error)
}

#[napi]
pub fn escrow_transactions_for_user(
    transactions_json: String,
    user_id: String,
) -> NapiResult<String> {
    let txs: Vec<EscrowTransaction> =
        serde_json::from_str(&transactions_json).map_err(to_napi_error)?;
    serde_json::to_string(&transactions_for_user(&txs, &user_id)).map_err(to_napi_error)
}
