//! Fixed-rate mortgage amortization.
//!
//! The functions here are lenient by contract: non-positive principal,
//! rate or term never raise an error, they produce zero so that a
//! half-filled calculator form can be re-evaluated on every keystroke.
//! A zero monthly payment therefore means "not computable".
//!
//! All arithmetic uses `rust_decimal::Decimal`; every amount is rounded to a
//! whole currency unit as soon as it is produced.

use chrono::Months;
use log::debug;
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::PropLedgerError;
use crate::mortgage::schedule::PaymentScheduleEntry;
use crate::types::{round_money, with_metadata, ComputationOutput, Money, Percent, Timestamp};
use crate::PropLedgerResult;

pub const MONTHS_PER_YEAR: u32 = 12;

const PERCENT: Decimal = dec!(100);

// ---------------------------------------------------------------------------
// Core formulas
// ---------------------------------------------------------------------------

/// Number of monthly installments over the loan term.
pub fn number_of_payments(term_years: u32) -> u32 {
    term_years.saturating_mul(MONTHS_PER_YEAR)
}

fn monthly_rate(annual_rate_pct: Percent) -> Decimal {
    annual_rate_pct / PERCENT / Decimal::from(MONTHS_PER_YEAR)
}

/// Monthly payment on a fixed-rate loan:
/// `P * r(1+r)^n / ((1+r)^n - 1)` with `r` the monthly rate and `n` the
/// number of installments, rounded to a whole unit.
pub fn monthly_payment(principal: Money, annual_rate_pct: Percent, term_years: u32) -> Money {
    if principal <= Decimal::ZERO || annual_rate_pct <= Decimal::ZERO || term_years == 0 {
        return Decimal::ZERO;
    }

    let rate = monthly_rate(annual_rate_pct);
    let n = number_of_payments(term_years);

    // Rates too small to survive the division behave as interest-free.
    if rate.is_zero() {
        return round_money(principal / Decimal::from(n));
    }

    let factor = match (Decimal::ONE + rate).checked_powu(u64::from(n)) {
        Some(f) => f,
        None => return Decimal::ZERO,
    };
    let denominator = factor - Decimal::ONE;
    if denominator.is_zero() {
        return Decimal::ZERO;
    }

    match principal
        .checked_mul(rate)
        .and_then(|v| v.checked_mul(factor))
        .and_then(|v| v.checked_div(denominator))
    {
        Some(payment) => round_money(payment),
        None => Decimal::ZERO,
    }
}

/// Down payment as a percentage of the home price.
pub fn down_payment(home_price: Money, down_payment_pct: Percent) -> Money {
    if home_price <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    round_money(home_price * down_payment_pct / PERCENT)
}

/// Amount to borrow after the down payment. Not clamped: a down payment
/// larger than the price yields a negative loan, which callers validate.
pub fn loan_amount(home_price: Money, down_payment: Money) -> Money {
    home_price - down_payment
}

/// Interest paid over the life of the loan. Zero when the payment is not
/// computable.
pub fn total_interest(principal: Money, annual_rate_pct: Percent, term_years: u32) -> Money {
    let payment = monthly_payment(principal, annual_rate_pct, term_years);
    if payment.is_zero() {
        return Decimal::ZERO;
    }
    payment * Decimal::from(number_of_payments(term_years)) - principal
}

pub(crate) fn add_months(date: Timestamp, months: u32) -> PropLedgerResult<Timestamp> {
    date.checked_add_months(Months::new(months))
        .ok_or_else(|| PropLedgerError::DateError(format!("{date} + {months} months is out of range")))
}

/// Build the full payment schedule.
///
/// A positive `down_payment` becomes sequence 0, due on `start_date`; it is
/// an up-front line item and does not reduce the amortized principal, so its
/// `remaining_balance_after` is the full principal. Installment `i` is due
/// `i` calendar months after `start_date` and pays exactly the monthly
/// payment. Whatever the whole-unit rounding leaves over stays in the last
/// line's `remaining_balance_after`; the balance never goes below zero.
///
/// Degenerate terms produce no monthly lines.
pub fn generate_payment_schedule(
    principal: Money,
    annual_rate_pct: Percent,
    term_years: u32,
    start_date: Timestamp,
    down_payment: Money,
) -> PropLedgerResult<Vec<PaymentScheduleEntry>> {
    let n = number_of_payments(term_years);
    let mut schedule = Vec::with_capacity(n as usize + 1);

    if down_payment > Decimal::ZERO {
        schedule.push(PaymentScheduleEntry::down_payment(
            down_payment,
            start_date,
            principal,
        ));
    }

    let payment = monthly_payment(principal, annual_rate_pct, term_years);
    if payment.is_zero() {
        debug!(
            "schedule: terms not computable (principal={principal}, rate={annual_rate_pct}%, term={term_years}y)"
        );
        return Ok(schedule);
    }

    let rate = monthly_rate(annual_rate_pct);
    let mut balance = principal;

    for i in 1..=n {
        let due_date = add_months(start_date, i)?;
        let interest = round_money(balance * rate);
        let principal_portion = payment - interest;
        balance = (balance - principal_portion).max(Decimal::ZERO);

        schedule.push(PaymentScheduleEntry::monthly(
            i,
            payment,
            due_date,
            principal_portion,
            interest,
            balance,
        ));
    }

    debug!(
        "schedule: {} lines, payment {payment}, residual {balance}",
        schedule.len()
    );
    Ok(schedule)
}

// ---------------------------------------------------------------------------
// Analysis envelope
// ---------------------------------------------------------------------------

/// Input for a full mortgage analysis, as submitted by the calculator and
/// application forms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MortgageInput {
    pub home_price: Money,
    /// Down payment as an amount. Takes precedence over the percentage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down_payment: Option<Money>,
    /// Down payment as a percentage of the home price (0-100).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down_payment_pct: Option<Percent>,
    pub annual_rate_pct: Percent,
    pub term_years: u32,
    #[serde(default = "chrono::Utc::now")]
    pub start_date: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MortgageAnalysis {
    pub home_price: Money,
    pub down_payment: Money,
    /// Effective down payment share of the price, in percent.
    pub down_payment_pct: Percent,
    pub loan_amount: Money,
    pub monthly_payment: Money,
    pub number_of_payments: u32,
    pub total_interest: Money,
    /// Monthly payment times the number of installments; excludes the down
    /// payment.
    pub total_of_payments: Money,
    /// Down payment plus all installments.
    pub total_cost: Money,
    pub schedule: Vec<PaymentScheduleEntry>,
}

/// Price a mortgage end to end: down payment, loan amount, payment,
/// totals and the schedule.
pub fn analyze_mortgage(
    input: &MortgageInput,
) -> PropLedgerResult<ComputationOutput<MortgageAnalysis>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_input(input)?;

    let down = match (input.down_payment, input.down_payment_pct) {
        (Some(amount), Some(_)) => {
            warnings.push(
                "Both down_payment and down_payment_pct supplied; using the amount".into(),
            );
            round_money(amount)
        }
        (Some(amount), None) => round_money(amount),
        (None, Some(pct)) => down_payment(input.home_price, pct),
        (None, None) => Decimal::ZERO,
    };

    let loan = loan_amount(input.home_price, down);
    if loan < Decimal::ZERO {
        warnings.push(format!(
            "Down payment {down} exceeds home price {}; loan amount is negative",
            input.home_price
        ));
    }

    let payment = monthly_payment(loan, input.annual_rate_pct, input.term_years);
    if payment.is_zero() {
        warnings.push(
            "Monthly payment is not computable from the supplied terms; derived amounts are zero"
                .into(),
        );
    }

    let schedule = generate_payment_schedule(
        loan,
        input.annual_rate_pct,
        input.term_years,
        input.start_date,
        down,
    )?;

    let interest = total_interest(loan, input.annual_rate_pct, input.term_years);
    let total_of_payments = if payment.is_zero() {
        Decimal::ZERO
    } else {
        payment * Decimal::from(number_of_payments(input.term_years))
    };

    let effective_pct = if input.home_price > Decimal::ZERO {
        (down / input.home_price * PERCENT).round_dp(2)
    } else {
        Decimal::ZERO
    };

    let output = MortgageAnalysis {
        home_price: input.home_price,
        down_payment: down,
        down_payment_pct: effective_pct,
        loan_amount: loan,
        monthly_payment: payment,
        number_of_payments: if payment.is_zero() {
            0
        } else {
            number_of_payments(input.term_years)
        },
        total_interest: interest,
        total_of_payments,
        total_cost: down + total_of_payments,
        schedule,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Fixed-rate amortization (monthly compounding, whole-unit rounding)",
        &serde_json::json!({
            "home_price": input.home_price.to_string(),
            "annual_rate_pct": input.annual_rate_pct.to_string(),
            "term_years": input.term_years,
            "start_date": input.start_date.to_rfc3339(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

fn validate_input(input: &MortgageInput) -> PropLedgerResult<()> {
    if let Some(pct) = input.down_payment_pct {
        if pct < Decimal::ZERO || pct > PERCENT {
            return Err(PropLedgerError::validation(
                "down_payment_pct",
                "Down payment percentage must be between 0 and 100",
            ));
        }
    }
    if let Some(amount) = input.down_payment {
        if amount < Decimal::ZERO {
            return Err(PropLedgerError::validation(
                "down_payment",
                "Down payment cannot be negative",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mortgage::schedule::{PaymentKind, PaymentStatus};
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn start() -> Timestamp {
        Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_monthly_payment_known_answer() {
        // 10M at 12% over 20 years: 110,108.61 before rounding
        let payment = monthly_payment(dec!(10_000_000), dec!(12), 20);
        assert_eq!(payment, dec!(110_109));
    }

    #[test]
    fn test_monthly_payment_degenerate_inputs_are_zero() {
        assert_eq!(monthly_payment(dec!(0), dec!(12), 20), Decimal::ZERO);
        assert_eq!(monthly_payment(dec!(-1000), dec!(12), 20), Decimal::ZERO);
        assert_eq!(monthly_payment(dec!(1000), dec!(0), 20), Decimal::ZERO);
        assert_eq!(monthly_payment(dec!(1000), dec!(-12), 20), Decimal::ZERO);
        assert_eq!(monthly_payment(dec!(1000), dec!(12), 0), Decimal::ZERO);
    }

    #[test]
    fn test_shorter_term_costs_more_per_month() {
        let p15 = monthly_payment(dec!(10_000_000), dec!(12), 15);
        let p30 = monthly_payment(dec!(10_000_000), dec!(12), 30);
        assert_eq!(p15, dec!(120_017));
        assert_eq!(p30, dec!(102_861));
        assert!(p15 > p30);
    }

    #[test]
    fn test_down_payment_and_loan_amount() {
        let down = down_payment(dec!(10_000_000), dec!(20));
        assert_eq!(down, dec!(2_000_000));
        assert_eq!(loan_amount(dec!(10_000_000), down), dec!(8_000_000));
        assert_eq!(down_payment(dec!(0), dec!(20)), Decimal::ZERO);
        assert_eq!(loan_amount(dec!(100), dec!(150)), dec!(-50));
    }

    #[test]
    fn test_total_interest_bounds() {
        let interest = total_interest(dec!(10_000_000), dec!(12), 20);
        // 110,109 * 240 - 10M
        assert_eq!(interest, dec!(16_426_160));
        assert!(interest > Decimal::ZERO);
        assert!(interest < dec!(20_000_000));
        assert_eq!(total_interest(dec!(10_000_000), dec!(0), 20), Decimal::ZERO);
    }

    #[test]
    fn test_schedule_first_and_last_lines() {
        let schedule =
            generate_payment_schedule(dec!(1_000_000), dec!(12), 5, start(), Decimal::ZERO)
                .unwrap();
        assert_eq!(schedule.len(), 60);

        let first = &schedule[0];
        assert_eq!(first.sequence_number, 1);
        assert_eq!(first.kind, PaymentKind::Monthly);
        assert_eq!(
            first.due_date,
            Utc.with_ymd_and_hms(2025, 2, 15, 9, 0, 0).unwrap()
        );
        assert_eq!(first.amount, dec!(22_244));
        assert_eq!(first.interest_portion, dec!(10_000));
        assert_eq!(first.principal_portion, dec!(12_244));
        assert_eq!(first.remaining_balance_after, dec!(987_756));
        assert_eq!(first.status, PaymentStatus::Pending);

        let last = schedule.last().unwrap();
        assert_eq!(last.sequence_number, 60);
        assert_eq!(last.amount, dec!(22_244));
        assert_eq!(last.principal_portion, last.amount - last.interest_portion);
        // Rounding residual is left on the balance
        assert_eq!(last.remaining_balance_after, dec!(37));
        assert_eq!(
            last.due_date,
            Utc.with_ymd_and_hms(2030, 1, 15, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_every_installment_pays_the_monthly_payment() {
        let payment = monthly_payment(dec!(10_000_000), dec!(12), 20);
        let schedule =
            generate_payment_schedule(dec!(10_000_000), dec!(12), 20, start(), Decimal::ZERO)
                .unwrap();
        for entry in &schedule {
            assert_eq!(entry.amount, payment);
            assert_eq!(entry.principal_portion, payment - entry.interest_portion);
        }
        let last = schedule.last().unwrap();
        assert_eq!(last.amount, dec!(110_109));
        assert_eq!(last.remaining_balance_after, Decimal::ZERO);
    }

    #[test]
    fn test_schedule_with_down_payment() {
        let schedule =
            generate_payment_schedule(dec!(1_000_000), dec!(12), 5, start(), dec!(200_000))
                .unwrap();
        assert_eq!(schedule.len(), 61);

        let dp = &schedule[0];
        assert_eq!(dp.kind, PaymentKind::DownPayment);
        assert_eq!(dp.sequence_number, 0);
        assert_eq!(dp.amount, dec!(200_000));
        assert_eq!(dp.principal_portion, dec!(200_000));
        assert_eq!(dp.interest_portion, Decimal::ZERO);
        assert_eq!(dp.remaining_balance_after, dec!(1_000_000));
        assert_eq!(dp.due_date, start());

        // First installment one month after the down payment
        assert_eq!(
            schedule[1].due_date,
            Utc.with_ymd_and_hms(2025, 2, 15, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_schedule_month_end_clamps_per_month() {
        let jan31 = Utc.with_ymd_and_hms(2025, 1, 31, 0, 0, 0).unwrap();
        let schedule =
            generate_payment_schedule(dec!(100_000), dec!(10), 1, jan31, Decimal::ZERO).unwrap();
        assert_eq!(
            schedule[0].due_date,
            Utc.with_ymd_and_hms(2025, 2, 28, 0, 0, 0).unwrap()
        );
        // Each date is offset from the start, so March is back on the 31st
        assert_eq!(
            schedule[1].due_date,
            Utc.with_ymd_and_hms(2025, 3, 31, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_schedule_degenerate_terms_has_only_down_payment() {
        let schedule =
            generate_payment_schedule(dec!(1_000_000), dec!(0), 5, start(), dec!(50_000)).unwrap();
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule[0].kind, PaymentKind::DownPayment);

        let empty =
            generate_payment_schedule(dec!(0), dec!(12), 5, start(), Decimal::ZERO).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_analyze_mortgage_from_percentage() {
        let input = MortgageInput {
            home_price: dec!(10_000_000),
            down_payment: None,
            down_payment_pct: Some(dec!(20)),
            annual_rate_pct: dec!(12),
            term_years: 20,
            start_date: start(),
        };
        let out = analyze_mortgage(&input).unwrap();
        let a = &out.result;
        assert_eq!(a.down_payment, dec!(2_000_000));
        assert_eq!(a.loan_amount, dec!(8_000_000));
        assert_eq!(a.monthly_payment, dec!(88_087));
        assert_eq!(a.number_of_payments, 240);
        assert_eq!(a.schedule.len(), 241);
        assert_eq!(a.down_payment_pct, dec!(20));
        assert_eq!(
            a.total_interest,
            total_interest(dec!(8_000_000), dec!(12), 20)
        );
        assert_eq!(a.total_interest, dec!(13_140_880));
        assert_eq!(a.total_of_payments, dec!(88_087) * dec!(240));
        assert_eq!(a.total_of_payments, a.loan_amount + a.total_interest);
        assert_eq!(a.total_cost, a.down_payment + a.total_of_payments);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_analyze_mortgage_warns_when_not_computable() {
        let input = MortgageInput {
            home_price: dec!(5_000_000),
            down_payment: Some(dec!(6_000_000)),
            down_payment_pct: Some(dec!(10)),
            annual_rate_pct: dec!(12),
            term_years: 20,
            start_date: start(),
        };
        let out = analyze_mortgage(&input).unwrap();
        assert_eq!(out.result.loan_amount, dec!(-1_000_000));
        assert_eq!(out.result.monthly_payment, Decimal::ZERO);
        assert_eq!(out.result.number_of_payments, 0);
        assert_eq!(out.warnings.len(), 3);
    }

    #[test]
    fn test_analyze_mortgage_rejects_bad_percentage() {
        let input = MortgageInput {
            home_price: dec!(5_000_000),
            down_payment: None,
            down_payment_pct: Some(dec!(120)),
            annual_rate_pct: dec!(12),
            term_years: 20,
            start_date: start(),
        };
        match analyze_mortgage(&input) {
            Err(PropLedgerError::Validation { field, .. }) => {
                assert_eq!(field, "down_payment_pct")
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
