//! Property-purchase escrow: transaction data and fees, lifecycle
//! transitions and the confirmation-deadline timer.

pub mod fees;
pub mod lifecycle;
pub mod timer;
pub mod transaction;

pub use fees::EscrowFees;
pub use transaction::{
    transactions_for_user, ConfirmationData, DisputeData, DisputeDecision, DisputeResolution,
    EscrowRole, EscrowStatus, EscrowTransaction, Milestone, MilestoneStatus,
};
