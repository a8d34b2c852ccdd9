//! Countdown to the buyer's confirmation deadline, and which role may act
//! on a transaction right now.

use serde::{Deserialize, Serialize};

use crate::escrow::transaction::{EscrowRole, EscrowStatus, EscrowTransaction};
use crate::types::Timestamp;

const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 3_600;
const SECONDS_PER_DAY: i64 = 86_400;

/// Time left before the deadline, broken down for display.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct EscrowTimer {
    pub expired: bool,
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
    pub total_seconds: i64,
}

pub fn escrow_timer(deadline: Timestamp, now: Timestamp) -> EscrowTimer {
    let remaining = (deadline - now).num_seconds();
    if remaining <= 0 {
        return EscrowTimer {
            expired: true,
            days: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
            total_seconds: 0,
        };
    }
    EscrowTimer {
        expired: false,
        days: remaining / SECONDS_PER_DAY,
        hours: (remaining % SECONDS_PER_DAY) / SECONDS_PER_HOUR,
        minutes: (remaining % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE,
        seconds: remaining % SECONDS_PER_MINUTE,
        total_seconds: remaining,
    }
}

/// Timer for a transaction; `None` until it has been funded.
pub fn transaction_timer(tx: &EscrowTransaction, now: Timestamp) -> Option<EscrowTimer> {
    tx.confirmation_deadline.map(|d| escrow_timer(d, now))
}

/// Buyers act while the confirmation window is open, admins act on
/// disputes, sellers only wait.
pub fn can_take_action(tx: &EscrowTransaction, role: EscrowRole) -> bool {
    match role {
        EscrowRole::Buyer => tx.status.awaits_buyer(),
        EscrowRole::Admin => tx.status == EscrowStatus::Disputed,
        EscrowRole::Seller => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escrow::lifecycle;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2025, 2, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_timer_breakdown() {
        let deadline = t0()
            + Duration::days(2)
            + Duration::hours(3)
            + Duration::minutes(4)
            + Duration::seconds(5);
        let timer = escrow_timer(deadline, t0());
        assert!(!timer.expired);
        assert_eq!(
            (timer.days, timer.hours, timer.minutes, timer.seconds),
            (2, 3, 4, 5)
        );
        assert_eq!(timer.total_seconds, 2 * 86_400 + 3 * 3_600 + 4 * 60 + 5);
    }

    #[test]
    fn test_timer_expired() {
        let timer = escrow_timer(t0(), t0() + Duration::seconds(1));
        assert!(timer.expired);
        assert_eq!(timer.total_seconds, 0);
    }

    #[test]
    fn test_can_take_action_by_role() {
        let mut tx =
            EscrowTransaction::new("e", "p", "b", "s", dec!(1_000), t0()).unwrap();
        assert!(transaction_timer(&tx, t0()).is_none());
        assert!(!can_take_action(&tx, EscrowRole::Buyer));

        lifecycle::fund(&mut tx, t0()).unwrap();
        assert!(can_take_action(&tx, EscrowRole::Buyer));
        assert!(!can_take_action(&tx, EscrowRole::Admin));
        assert!(!can_take_action(&tx, EscrowRole::Seller));
        assert_eq!(
            transaction_timer(&tx, t0()).map(|t| t.days),
            Some(lifecycle::CONFIRMATION_WINDOW_DAYS)
        );
    }
}
