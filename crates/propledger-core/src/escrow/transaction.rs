use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::PropLedgerError;
use crate::escrow::fees::{fee_breakdown, EscrowFees};
use crate::types::{Money, Timestamp};
use crate::PropLedgerResult;

/// Where an escrow transaction sits in its lifecycle.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EscrowStatus {
    /// Created, buyer has not paid in yet.
    #[default]
    Pending,
    /// Buyer's payment received; the confirmation window is running.
    Funded,
    /// Funds placed with the escrow holder.
    InEscrow,
    /// Buyer confirmed possession; funds may be released.
    BuyerConfirmed,
    /// Buyer raised a dispute; waits for an admin.
    Disputed,
    /// Window closed with no buyer action; funds go to the seller.
    AutoReleased,
    /// Funds released to the seller.
    Completed,
    /// Abandoned before funding, or refunded after a dispute.
    Cancelled,
}

impl EscrowStatus {
    /// Completed and cancelled transactions accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, EscrowStatus::Completed | EscrowStatus::Cancelled)
    }

    /// The buyer's confirmation window is open in these states.
    pub fn awaits_buyer(self) -> bool {
        matches!(self, EscrowStatus::Funded | EscrowStatus::InEscrow)
    }
}

impl std::fmt::Display for EscrowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EscrowStatus::Pending => "pending",
            EscrowStatus::Funded => "funded",
            EscrowStatus::InEscrow => "in_escrow",
            EscrowStatus::BuyerConfirmed => "buyer_confirmed",
            EscrowStatus::Disputed => "disputed",
            EscrowStatus::AutoReleased => "auto_released",
            EscrowStatus::Completed => "completed",
            EscrowStatus::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// Who is acting on a transaction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EscrowRole {
    Buyer,
    Seller,
    Admin,
}

/// Buyer's possession confirmation form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfirmationData {
    pub satisfaction: String,
    pub condition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Buyer's dispute form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DisputeData {
    pub reason: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DisputeDecision {
    /// Release the funds to the seller.
    Release,
    /// Refund the funds to the buyer.
    Refund,
}

/// An admin's ruling on a disputed transaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DisputeResolution {
    pub decision: DisputeDecision,
    #[serde(default)]
    pub notes: String,
    pub resolved_by: EscrowRole,
}

/// Resolution as recorded on the transaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolutionRecord {
    pub decision: DisputeDecision,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
    pub resolved_at: Timestamp,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneStatus {
    #[default]
    Pending,
    Completed,
}

/// A step in the purchase that parties tick off while funds are held.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Milestone {
    pub name: String,
    #[serde(default)]
    pub status: MilestoneStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Timestamp>,
}

impl Milestone {
    pub fn new(name: impl Into<String>) -> Self {
        Milestone {
            name: name.into(),
            status: MilestoneStatus::Pending,
            completed_at: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == MilestoneStatus::Completed
    }
}

/// Milestones every new sale starts with.
pub const DEFAULT_MILESTONES: [&str; 3] =
    ["Initial Payment", "Property Inspection", "Final Payment"];

/// A property-purchase escrow.
///
/// `confirmation_deadline` is written once, when the transaction is funded.
/// `version` increases by one on every successful transition and is the
/// token a backend compares before persisting a write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscrowTransaction {
    pub id: String,
    pub property_id: String,
    pub buyer_id: String,
    pub seller_id: String,
    pub amount: Money,
    #[serde(default)]
    pub fees: EscrowFees,
    #[serde(default)]
    pub status: EscrowStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funded_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation_deadline: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation: Option<ConfirmationData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispute_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispute_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<ResolutionRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    pub created_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
    #[serde(default)]
    pub version: u64,
}

impl EscrowTransaction {
    /// Open a pending escrow with the platform fee and the default
    /// milestones. The amount must be positive.
    pub fn new(
        id: impl Into<String>,
        property_id: impl Into<String>,
        buyer_id: impl Into<String>,
        seller_id: impl Into<String>,
        amount: Money,
        created_at: Timestamp,
    ) -> PropLedgerResult<Self> {
        if amount <= Decimal::ZERO {
            return Err(PropLedgerError::validation(
                "amount",
                "Escrow amount must be positive",
            ));
        }
        Ok(EscrowTransaction {
            id: id.into(),
            property_id: property_id.into(),
            buyer_id: buyer_id.into(),
            seller_id: seller_id.into(),
            amount,
            fees: fee_breakdown(amount, Decimal::ZERO),
            status: EscrowStatus::Pending,
            funded_at: None,
            confirmation_deadline: None,
            confirmation: None,
            dispute_reason: None,
            dispute_description: None,
            resolution: None,
            cancellation_reason: None,
            milestones: DEFAULT_MILESTONES.iter().map(|n| Milestone::new(*n)).collect(),
            created_at,
            updated_at: None,
            version: 0,
        })
    }
}

/// Transactions where `user_id` is the buyer or the seller, in input order.
pub fn transactions_for_user<'a>(
    transactions: &'a [EscrowTransaction],
    user_id: &str,
) -> Vec<&'a EscrowTransaction> {
    transactions
        .iter()
        .filter(|tx| tx.buyer_id == user_id || tx.seller_id == user_id)
        .collect()
}
