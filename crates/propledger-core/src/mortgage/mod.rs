//! Mortgage amortization, payment-schedule tracking and backend record
//! transformation.

pub mod calculator;
pub mod schedule;
pub mod tracker;
pub mod transform;

pub use schedule::{PaymentKind, PaymentRecord, PaymentScheduleEntry, PaymentStatus};
