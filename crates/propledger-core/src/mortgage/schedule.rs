use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{Money, Timestamp};

/// What a schedule line pays for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentKind {
    /// Up-front line item, tracked separately from the amortized principal.
    DownPayment,
    Monthly,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Paid => write!(f, "paid"),
        }
    }
}

/// One line of a generated payment schedule.
///
/// Entries are created `Pending` and only reconciliation moves them to
/// `Paid`; a paid entry never goes back to pending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentScheduleEntry {
    /// Freshly generated per schedule; never compare ids across schedules.
    pub id: String,
    /// 0 for the down payment, 1..=N for monthly installments.
    pub sequence_number: u32,
    pub kind: PaymentKind,
    pub amount: Money,
    pub due_date: Timestamp,
    pub status: PaymentStatus,
    pub principal_portion: Money,
    pub interest_portion: Money,
    pub remaining_balance_after: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_date: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
}

impl PaymentScheduleEntry {
    pub(crate) fn down_payment(amount: Money, due_date: Timestamp, principal: Money) -> Self {
        PaymentScheduleEntry {
            id: format!("PAY-DP-{}", Uuid::new_v4()),
            sequence_number: 0,
            kind: PaymentKind::DownPayment,
            amount,
            due_date,
            status: PaymentStatus::Pending,
            principal_portion: amount,
            interest_portion: Money::ZERO,
            remaining_balance_after: principal,
            paid_date: None,
            payment_method: None,
        }
    }

    pub(crate) fn monthly(
        sequence_number: u32,
        amount: Money,
        due_date: Timestamp,
        principal_portion: Money,
        interest_portion: Money,
        remaining_balance_after: Money,
    ) -> Self {
        PaymentScheduleEntry {
            id: format!("PAY-{sequence_number}-{}", Uuid::new_v4()),
            sequence_number,
            kind: PaymentKind::Monthly,
            amount,
            due_date,
            status: PaymentStatus::Pending,
            principal_portion,
            interest_portion,
            remaining_balance_after,
            paid_date: None,
            payment_method: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == PaymentStatus::Pending
    }

    pub fn is_paid(&self) -> bool {
        self.status == PaymentStatus::Paid
    }
}

/// A completed (or recorded) payment from the mortgage's history.
/// History is append-only; records are never edited after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: String,
    /// Schedule line this payment settles, when the backend knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_number: Option<u32>,
    pub amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_date: Option<Timestamp>,
    #[serde(default)]
    pub status: PaymentStatus,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

pub(crate) fn default_method() -> String {
    "manual".into()
}
