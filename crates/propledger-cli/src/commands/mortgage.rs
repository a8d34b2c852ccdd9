use chrono::{DateTime, Utc};
use clap::Args;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};

use propledger_core::mortgage::calculator::{self, MortgageInput};
use propledger_core::mortgage::tracker;
use propledger_core::mortgage::transform::{self, BackendMortgage, MortgageAccount};
use propledger_core::{Money, Percent, Timestamp};

use crate::input;

/// Arguments for a full mortgage analysis
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct MortgageArgs {
    /// Property price in whole currency units
    #[arg(long)]
    pub home_price: Option<Decimal>,

    /// Down payment amount (takes precedence over --down-payment-pct)
    #[arg(long)]
    pub down_payment: Option<Decimal>,

    /// Down payment as a percentage of the price (e.g. 20 for 20%)
    #[arg(long)]
    pub down_payment_pct: Option<Decimal>,

    /// Annual interest rate in percent (e.g. 12 for 12%)
    #[arg(long, alias = "rate")]
    pub annual_rate_pct: Option<Decimal>,

    /// Loan term in years
    #[arg(long)]
    pub term_years: Option<u32>,

    /// Schedule start date (RFC 3339); defaults to --as-of or now
    #[arg(long)]
    pub start_date: Option<DateTime<Utc>>,

    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for schedule generation
#[derive(Args)]
pub struct ScheduleArgs {
    /// Loan principal
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Annual interest rate in percent
    #[arg(long, alias = "rate")]
    pub annual_rate_pct: Option<Decimal>,

    /// Loan term in years
    #[arg(long)]
    pub term_years: Option<u32>,

    /// Down payment collected on the start date
    #[arg(long, default_value = "0")]
    pub down_payment: Decimal,

    /// Schedule start date (RFC 3339); defaults to --as-of or now
    #[arg(long)]
    pub start_date: Option<DateTime<Utc>>,

    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for tracking backend mortgage records
#[derive(Args)]
pub struct TrackerArgs {
    /// Path to a JSON file holding one backend mortgage or an array of them
    #[arg(long)]
    pub input: Option<String>,

    /// Window for upcoming payments, in days
    #[arg(long, default_value = "30")]
    pub days_ahead: u32,
}

#[derive(Deserialize)]
struct ScheduleRequest {
    principal: Money,
    annual_rate_pct: Percent,
    term_years: u32,
    #[serde(default)]
    down_payment: Money,
    start_date: Option<Timestamp>,
}

/// Read `--input`, then stdin. `None` when neither supplied anything.
fn read_input(path: &Option<String>) -> Result<Option<Value>, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return Ok(Some(input::file::read_json_value(path)?));
    }
    input::stdin::read_stdin()
}

pub fn run_mortgage(args: MortgageArgs, now: Timestamp) -> Result<Value, Box<dyn std::error::Error>> {
    let mortgage_input: MortgageInput = if let Some(mut data) = read_input(&args.input)? {
        // A pinned clock also pins the default start date
        if let Value::Object(ref mut map) = data {
            map.entry("start_date").or_insert_with(|| json!(now));
        }
        serde_json::from_value(data)?
    } else {
        MortgageInput {
            home_price: args
                .home_price
                .ok_or("--home-price is required (or provide --input)")?,
            down_payment: args.down_payment,
            down_payment_pct: args.down_payment_pct,
            annual_rate_pct: args
                .annual_rate_pct
                .ok_or("--annual-rate-pct is required (or provide --input)")?,
            term_years: args
                .term_years
                .ok_or("--term-years is required (or provide --input)")?,
            start_date: args.start_date.unwrap_or(now),
        }
    };

    let result = calculator::analyze_mortgage(&mortgage_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_schedule(args: ScheduleArgs, now: Timestamp) -> Result<Value, Box<dyn std::error::Error>> {
    let request: ScheduleRequest = if let Some(data) = read_input(&args.input)? {
        serde_json::from_value(data)?
    } else {
        ScheduleRequest {
            principal: args
                .principal
                .ok_or("--principal is required (or provide --input)")?,
            annual_rate_pct: args
                .annual_rate_pct
                .ok_or("--annual-rate-pct is required (or provide --input)")?,
            term_years: args
                .term_years
                .ok_or("--term-years is required (or provide --input)")?,
            down_payment: args.down_payment,
            start_date: args.start_date,
        }
    };

    let schedule = calculator::generate_payment_schedule(
        request.principal,
        request.annual_rate_pct,
        request.term_years,
        request.start_date.unwrap_or(now),
        request.down_payment,
    )?;
    Ok(serde_json::to_value(schedule)?)
}

pub fn run_tracker(args: TrackerArgs, now: Timestamp) -> Result<Value, Box<dyn std::error::Error>> {
    let data = read_input(&args.input)?
        .ok_or("--input <file.json> or stdin required for payment tracking")?;

    match data {
        Value::Array(_) => {
            let records: Vec<BackendMortgage> = serde_json::from_value(data)?;
            let summaries: Vec<Value> = transform::transform_mortgages(&records, now)
                .iter()
                .map(|account| account_summary(account, args.days_ahead, now))
                .collect();
            Ok(Value::Array(summaries))
        }
        _ => {
            let record: BackendMortgage = serde_json::from_value(data)?;
            let account = transform::transform_mortgage(&record, now)?;
            let outlook = tracker::payment_outlook(&account.payment_schedule, args.days_ahead, now);
            Ok(json!({
                "result": account_summary(&account, args.days_ahead, now),
                "outlook": outlook,
            }))
        }
    }
}

fn account_summary(account: &MortgageAccount, days_ahead: u32, now: Timestamp) -> Value {
    let outlook = tracker::payment_outlook(&account.payment_schedule, days_ahead, now);
    let next = outlook.next_payment.as_ref();

    json!({
        "id": account.id,
        "property_title": account.property_title,
        "bank_name": account.bank_name,
        "status": account.status,
        "monthly_payment": account.monthly_payment,
        "next_payment_date": next.map(|e| e.due_date),
        "next_payment_amount": next.map(|e| e.amount),
        "days_until_next": outlook.days_until_next,
        "upcoming_count": outlook.upcoming.len(),
        "overdue_count": outlook.overdue.len(),
        "overdue_amount": outlook.overdue_amount,
        "payments_made": account.payments_made,
        "payments_remaining": account.payments_remaining,
        "total_paid": account.total_paid,
        "remaining_balance": account.remaining_balance,
    })
}
