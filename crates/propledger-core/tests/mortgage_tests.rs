use chrono::{Duration, TimeZone, Utc};
use pretty_assertions::assert_eq;
use propledger_core::mortgage::calculator::{self, MortgageInput};
use propledger_core::mortgage::transform::{self, BackendMortgage};
use propledger_core::mortgage::{tracker, PaymentKind, PaymentRecord, PaymentStatus};
use propledger_core::Timestamp;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn start() -> Timestamp {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

// ===========================================================================
// Amortization engine
// ===========================================================================

#[test]
fn test_payment_covers_principal_over_life() {
    for (principal, rate, term) in [
        (dec!(1_000_000), dec!(12), 5u32),
        (dec!(10_000_000), dec!(12), 20),
        (dec!(35_000_000), dec!(18.5), 25),
        (dec!(250_000), dec!(3.75), 30),
        (dec!(5_000), dec!(0.5), 1),
    ] {
        let payment = calculator::monthly_payment(principal, rate, term);
        assert!(
            payment * Decimal::from(term * 12) >= principal,
            "payment {payment} does not cover {principal} at {rate}% over {term}y"
        );
    }
}

#[test]
fn test_schedule_length_and_final_balance() {
    for (principal, rate, term, down) in [
        (dec!(10_000_000), dec!(12), 20u32, Decimal::ZERO),
        (dec!(8_000_000), dec!(12), 20, dec!(2_000_000)),
        (dec!(250_000), dec!(3.75), 30, Decimal::ZERO),
        (dec!(100_000), dec!(10), 1, dec!(20_000)),
    ] {
        let payment = calculator::monthly_payment(principal, rate, term);
        let schedule =
            calculator::generate_payment_schedule(principal, rate, term, start(), down).unwrap();
        let monthly: Vec<_> = schedule
            .iter()
            .filter(|e| e.kind == PaymentKind::Monthly)
            .collect();
        let down_lines = schedule
            .iter()
            .filter(|e| e.kind == PaymentKind::DownPayment)
            .count();

        assert_eq!(monthly.len(), (term * 12) as usize);
        assert_eq!(down_lines, usize::from(down > Decimal::ZERO));

        for entry in &monthly {
            assert_eq!(entry.amount, payment);
            assert_eq!(entry.principal_portion, payment - entry.interest_portion);
            assert!(entry.remaining_balance_after >= Decimal::ZERO);
        }

        let last = schedule.last().unwrap();
        assert!(last.remaining_balance_after.abs() <= dec!(12));
    }
}

#[test]
fn test_installments_fall_due_month_by_month_from_start() {
    let schedule =
        calculator::generate_payment_schedule(dec!(1_000_000), dec!(12), 5, start(), Decimal::ZERO)
            .unwrap();
    assert_eq!(
        schedule[0].due_date,
        Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap()
    );
    assert_eq!(
        schedule[59].due_date,
        Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
    );

    let with_down =
        calculator::generate_payment_schedule(dec!(1_000_000), dec!(12), 5, start(), dec!(1))
            .unwrap();
    assert_eq!(with_down[0].due_date, start());
    for (a, b) in schedule.iter().zip(&with_down[1..]) {
        assert_eq!(a.due_date, b.due_date);
    }
}

#[test]
fn test_schedule_generation_is_repeatable() {
    let a = calculator::generate_payment_schedule(dec!(8_000_000), dec!(12), 20, start(), dec!(2_000_000))
        .unwrap();
    let b = calculator::generate_payment_schedule(dec!(8_000_000), dec!(12), 20, start(), dec!(2_000_000))
        .unwrap();

    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(&b) {
        assert_eq!(x.sequence_number, y.sequence_number);
        assert_eq!(x.amount, y.amount);
        assert_eq!(x.due_date, y.due_date);
        assert_eq!(x.principal_portion, y.principal_portion);
        assert_eq!(x.interest_portion, y.interest_portion);
        assert_eq!(x.remaining_balance_after, y.remaining_balance_after);
    }
    // Ids are fresh per generation
    assert!(a[0].id != b[0].id);
}

#[test]
fn test_concrete_ten_million_twenty_years() {
    let payment = calculator::monthly_payment(dec!(10_000_000), dec!(12), 20);
    assert!((payment - dec!(110_109)).abs() <= dec!(1));

    let interest = calculator::total_interest(dec!(10_000_000), dec!(12), 20);
    assert!(interest > Decimal::ZERO && interest < dec!(20_000_000));
    assert_eq!(interest, payment * dec!(240) - dec!(10_000_000));
}

#[test]
fn test_concrete_down_payment_split() {
    let down = calculator::down_payment(dec!(10_000_000), dec!(20));
    assert_eq!(down, dec!(2_000_000));
    assert_eq!(calculator::loan_amount(dec!(10_000_000), down), dec!(8_000_000));
}

#[test]
fn test_analysis_envelope_serializes() {
    let input: MortgageInput = serde_json::from_value(serde_json::json!({
        "home_price": "10000000",
        "down_payment_pct": "20",
        "annual_rate_pct": "12",
        "term_years": 20,
        "start_date": "2025-01-01T00:00:00Z"
    }))
    .unwrap();
    let out = calculator::analyze_mortgage(&input).unwrap();
    let json = serde_json::to_value(&out).unwrap();
    assert_eq!(json["result"]["monthly_payment"], serde_json::json!("88087"));
    assert_eq!(json["result"]["schedule"].as_array().map(|s| s.len()), Some(241));
    assert_eq!(json["result"]["total_interest"], serde_json::json!("13140880"));
    assert_eq!(json["metadata"]["currency"], serde_json::json!("NGN"));
}

// ===========================================================================
// Schedule tracking
// ===========================================================================

#[test]
fn test_due_in_fifteen_days() {
    let now = Utc.with_ymd_and_hms(2025, 5, 10, 14, 30, 0).unwrap();
    // The down-payment line is due on the start date itself
    let mut schedule = calculator::generate_payment_schedule(
        dec!(1_000_000),
        dec!(12),
        1,
        now + Duration::days(15),
        dec!(100_000),
    )
    .unwrap();
    schedule.truncate(1);

    let next = tracker::next_payment(&schedule, now).unwrap();
    assert_eq!(tracker::days_until_payment(next.due_date, now), 15);
    assert_eq!(tracker::upcoming_payments(&schedule, 30, now).len(), 1);
    assert!(tracker::upcoming_payments(&schedule, 10, now).is_empty());
}

#[test]
fn test_next_payment_never_paid() {
    let mut schedule =
        calculator::generate_payment_schedule(dec!(1_000_000), dec!(12), 5, start(), Decimal::ZERO)
            .unwrap();
    let history: Vec<PaymentRecord> = (1..=3)
        .map(|n| PaymentRecord {
            id: format!("rec-{n}"),
            sequence_number: Some(n),
            amount: dec!(22_244),
            due_date: None,
            paid_date: Some(start()),
            status: PaymentStatus::Paid,
            method: "card".into(),
            transaction_id: None,
            notes: None,
        })
        .collect();
    assert_eq!(tracker::reconcile(&mut schedule, &history), 3);

    // Before the first due date every paid line is still in the future
    let as_of = start() - Duration::days(1);
    let next = tracker::next_payment(&schedule, as_of).unwrap();
    assert_eq!(next.status, PaymentStatus::Pending);
    assert_eq!(next.sequence_number, 4);

    assert_eq!(tracker::reconcile(&mut schedule, &history), 0);
}

// ===========================================================================
// Backend transform
// ===========================================================================

#[test]
fn test_transform_array_from_api_payload() {
    let payload = serde_json::json!([
        {
            "id": "m-1",
            "loanAmount": 8000000,
            "downPayment": 2000000,
            "interestRate": 12,
            "loanTermYears": 20,
            "startDate": "2025-01-01T00:00:00.000Z",
            "autoPay": true
        },
        { "_id": "m-2" }
    ]);
    let records: Vec<BackendMortgage> = serde_json::from_value(payload).unwrap();
    let accounts = transform::transform_mortgages(&records, start());

    assert_eq!(accounts.len(), 2);
    assert_eq!(accounts[0].monthly_payment, dec!(88_087));
    assert_eq!(accounts[0].payment_schedule.len(), 241);
    assert_eq!(accounts[0].total_payments, 240);
    assert!(accounts[0].auto_pay);
    assert_eq!(accounts[1].id.as_deref(), Some("m-2"));
    assert!(accounts[1].payment_schedule.is_empty());
}
