//! Answers "what is due next" over a payment schedule and reconciles the
//! recorded payment history against it.
//!
//! Nothing here fails: absence is `None` or an empty list. The current
//! instant is always passed in as `as_of`.

use chrono::{DateTime, Duration, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::mortgage::schedule::{PaymentKind, PaymentRecord, PaymentScheduleEntry, PaymentStatus};
use crate::types::{Money, Timestamp};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Earliest pending entry due at or after `as_of`. Paid entries are never
/// returned, whatever their date.
pub fn next_payment(
    schedule: &[PaymentScheduleEntry],
    as_of: Timestamp,
) -> Option<&PaymentScheduleEntry> {
    schedule
        .iter()
        .filter(|e| e.is_pending() && e.due_date >= as_of)
        .min_by_key(|e| e.due_date)
}

/// Whole days until `due_date`, rounded up. Zero when due now, negative
/// once overdue.
pub fn days_until_payment(due_date: Timestamp, as_of: Timestamp) -> i64 {
    let millis = (due_date - as_of).num_milliseconds();
    let days = millis / MILLIS_PER_DAY;
    // Integer division truncates toward zero, which is already the ceiling
    // for negative spans.
    if millis > 0 && millis % MILLIS_PER_DAY != 0 {
        days + 1
    } else {
        days
    }
}

/// Pending entries due within `[as_of, as_of + days_ahead]`, in schedule
/// order.
pub fn upcoming_payments(
    schedule: &[PaymentScheduleEntry],
    days_ahead: u32,
    as_of: Timestamp,
) -> Vec<&PaymentScheduleEntry> {
    // Horizons past the calendar's end cover everything
    let horizon = as_of
        .checked_add_signed(Duration::days(i64::from(days_ahead)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    schedule
        .iter()
        .filter(|e| e.is_pending() && e.due_date >= as_of && e.due_date <= horizon)
        .collect()
}

/// Pending entries whose due date has already passed.
pub fn overdue_payments(
    schedule: &[PaymentScheduleEntry],
    as_of: Timestamp,
) -> Vec<&PaymentScheduleEntry> {
    schedule
        .iter()
        .filter(|e| e.is_pending() && e.due_date < as_of)
        .collect()
}

/// Mark schedule entries paid from the payment history.
///
/// A paid record matches the first entry with the same sequence number or,
/// when the record carries none, the first entry due on the same UTC
/// calendar day. Records that match nothing are skipped. Entries already
/// paid are left as they are, so reconciling twice is a no-op.
///
/// Returns how many entries moved to paid.
pub fn reconcile(schedule: &mut [PaymentScheduleEntry], history: &[PaymentRecord]) -> usize {
    let mut marked = 0;

    for record in history.iter().filter(|r| r.status == PaymentStatus::Paid) {
        let matched = schedule.iter_mut().find(|entry| match record.sequence_number {
            Some(seq) => entry.sequence_number == seq,
            None => record
                .due_date
                .is_some_and(|due| due.date_naive() == entry.due_date.date_naive()),
        });

        match matched {
            Some(entry) if entry.is_pending() => {
                entry.status = PaymentStatus::Paid;
                entry.paid_date = record.paid_date;
                entry.payment_method = Some(record.method.clone());
                marked += 1;
            }
            Some(_) => {}
            None => debug!("reconcile: payment {} matches no schedule line", record.id),
        }
    }

    marked
}

/// Snapshot of a schedule as seen from `as_of`, for dashboards and
/// reminders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentOutlook {
    pub as_of: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_payment: Option<PaymentScheduleEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_until_next: Option<i64>,
    pub upcoming: Vec<PaymentScheduleEntry>,
    pub overdue: Vec<PaymentScheduleEntry>,
    pub overdue_amount: Money,
    pub payments_made: usize,
    pub payments_remaining: usize,
}

pub fn payment_outlook(
    schedule: &[PaymentScheduleEntry],
    days_ahead: u32,
    as_of: Timestamp,
) -> PaymentOutlook {
    let next = next_payment(schedule, as_of).cloned();
    let overdue: Vec<PaymentScheduleEntry> =
        overdue_payments(schedule, as_of).into_iter().cloned().collect();
    let monthly = schedule.iter().filter(|e| e.kind == PaymentKind::Monthly);

    PaymentOutlook {
        as_of,
        days_until_next: next.as_ref().map(|e| days_until_payment(e.due_date, as_of)),
        next_payment: next,
        upcoming: upcoming_payments(schedule, days_ahead, as_of)
            .into_iter()
            .cloned()
            .collect(),
        overdue_amount: overdue.iter().map(|e| e.amount).sum(),
        overdue,
        payments_made: monthly.clone().filter(|e| e.is_paid()).count(),
        payments_remaining: monthly.filter(|e| e.is_pending()).count(),
    }
}
