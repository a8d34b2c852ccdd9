//! Escrow transaction state machine.
//!
//! ```text
//! pending ──fund──▶ funded ──hold──▶ in_escrow
//!    │                 │                 │
//!  cancel              ├── confirm ──────┼──▶ buyer_confirmed ──complete──▶ completed
//!    ▼                 ├── dispute ──────┼──▶ disputed ──resolve──▶ completed | cancelled
//! cancelled            └── deadline ─────┴──▶ auto_released ──complete──▶ completed
//! ```
//!
//! Milestones are ticked off without a status change while the funds are
//! held and before payout.
//!
//! Every transition checks the source state and its input before writing
//! anything, so a rejected call leaves the transaction untouched. The
//! auto-release check is the one exception to strictness: it is run from a
//! recurring timer and simply reports whether it did anything.

use chrono::Duration;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::PropLedgerError;
use crate::escrow::transaction::{
    ConfirmationData, DisputeData, DisputeDecision, DisputeResolution, EscrowRole, EscrowStatus,
    EscrowTransaction, MilestoneStatus, ResolutionRecord,
};
use crate::types::Timestamp;
use crate::PropLedgerResult;

/// Days the buyer has, from funding, to confirm possession or dispute.
pub const CONFIRMATION_WINDOW_DAYS: i64 = 7;

fn require_state(
    tx: &EscrowTransaction,
    allowed: &[EscrowStatus],
    transition: &str,
) -> PropLedgerResult<()> {
    if allowed.contains(&tx.status) {
        Ok(())
    } else {
        Err(PropLedgerError::InvalidState {
            transition: transition.into(),
            current: tx.status.to_string(),
        })
    }
}

fn require_text(value: &str, field: &str) -> PropLedgerResult<()> {
    if value.trim().is_empty() {
        return Err(PropLedgerError::validation(field, "Required field is empty"));
    }
    Ok(())
}

fn advance(tx: &mut EscrowTransaction, to: EscrowStatus, now: Timestamp) {
    info!("escrow {}: {} -> {}", tx.id, tx.status, to);
    tx.status = to;
    tx.updated_at = Some(now);
    tx.version += 1;
}

/// Buyer's payment has arrived. Starts the confirmation window.
pub fn fund(tx: &mut EscrowTransaction, now: Timestamp) -> PropLedgerResult<()> {
    require_state(tx, &[EscrowStatus::Pending], "fund")?;
    tx.funded_at = Some(now);
    tx.confirmation_deadline = Some(now + Duration::days(CONFIRMATION_WINDOW_DAYS));
    advance(tx, EscrowStatus::Funded, now);
    Ok(())
}

/// Funds have been placed with the escrow holder. The deadline is
/// unchanged.
pub fn hold_in_escrow(tx: &mut EscrowTransaction, now: Timestamp) -> PropLedgerResult<()> {
    require_state(tx, &[EscrowStatus::Funded], "hold in escrow")?;
    advance(tx, EscrowStatus::InEscrow, now);
    Ok(())
}

pub fn confirm_possession(
    tx: &mut EscrowTransaction,
    data: &ConfirmationData,
    now: Timestamp,
) -> PropLedgerResult<()> {
    require_state(
        tx,
        &[EscrowStatus::Funded, EscrowStatus::InEscrow],
        "confirm possession of",
    )?;
    require_text(&data.satisfaction, "satisfaction")?;
    require_text(&data.condition, "condition")?;

    tx.confirmation = Some(data.clone());
    advance(tx, EscrowStatus::BuyerConfirmed, now);
    Ok(())
}

/// Buyer contests the purchase. While disputed the transaction can no
/// longer auto-release.
pub fn file_dispute(
    tx: &mut EscrowTransaction,
    data: &DisputeData,
    now: Timestamp,
) -> PropLedgerResult<()> {
    require_state(
        tx,
        &[EscrowStatus::Funded, EscrowStatus::InEscrow],
        "file a dispute on",
    )?;
    require_text(&data.reason, "reason")?;
    require_text(&data.description, "description")?;

    tx.dispute_reason = Some(data.reason.clone());
    tx.dispute_description = Some(data.description.clone());
    advance(tx, EscrowStatus::Disputed, now);
    Ok(())
}

/// Release funds to the seller if the buyer let the window lapse.
///
/// Only a funded or in-escrow transaction strictly past its deadline moves;
/// every other state, including disputed and already auto-released, is
/// left alone. Returns whether the transaction changed.
pub fn check_auto_release(tx: &mut EscrowTransaction, now: Timestamp) -> bool {
    if !tx.status.awaits_buyer() {
        return false;
    }
    match tx.confirmation_deadline {
        Some(deadline) if now > deadline => {
            advance(tx, EscrowStatus::AutoReleased, now);
            true
        }
        Some(_) => false,
        None => {
            debug!("escrow {}: {} without a deadline", tx.id, tx.status);
            false
        }
    }
}

/// Timer body: run the auto-release check across a list of transactions,
/// returning the ids that were released.
pub fn sweep_auto_release(txs: &mut [EscrowTransaction], now: Timestamp) -> Vec<String> {
    txs.iter_mut()
        .filter_map(|tx| check_auto_release(tx, now).then(|| tx.id.clone()))
        .collect()
}

/// Admin ruling on a dispute: release to the seller completes the
/// transaction, a refund to the buyer cancels it and must be explained.
pub fn resolve_dispute(
    tx: &mut EscrowTransaction,
    resolution: &DisputeResolution,
    now: Timestamp,
) -> PropLedgerResult<()> {
    require_state(tx, &[EscrowStatus::Disputed], "resolve a dispute on")?;
    if resolution.resolved_by != EscrowRole::Admin {
        return Err(PropLedgerError::validation(
            "resolved_by",
            "Only an admin can resolve a dispute",
        ));
    }
    if resolution.decision == DisputeDecision::Refund {
        require_text(&resolution.notes, "notes")?;
    }

    tx.resolution = Some(ResolutionRecord {
        decision: resolution.decision,
        notes: resolution.notes.clone(),
        resolved_at: now,
    });
    let to = match resolution.decision {
        DisputeDecision::Release => EscrowStatus::Completed,
        DisputeDecision::Refund => EscrowStatus::Cancelled,
    };
    advance(tx, to, now);
    Ok(())
}

/// Pay out to the seller after confirmation or auto-release.
pub fn complete(tx: &mut EscrowTransaction, now: Timestamp) -> PropLedgerResult<()> {
    require_state(
        tx,
        &[EscrowStatus::BuyerConfirmed, EscrowStatus::AutoReleased],
        "complete",
    )?;
    advance(tx, EscrowStatus::Completed, now);
    Ok(())
}

/// Mark the named milestone completed. Allowed while funds are held and
/// the transaction is not under dispute; the status does not change.
pub fn complete_milestone(
    tx: &mut EscrowTransaction,
    name: &str,
    now: Timestamp,
) -> PropLedgerResult<()> {
    require_state(
        tx,
        &[
            EscrowStatus::Funded,
            EscrowStatus::InEscrow,
            EscrowStatus::BuyerConfirmed,
            EscrowStatus::AutoReleased,
        ],
        "complete a milestone on",
    )?;
    require_text(name, "milestone")?;

    let milestone = tx
        .milestones
        .iter_mut()
        .find(|m| m.name == name)
        .ok_or_else(|| PropLedgerError::validation("milestone", "No milestone with that name"))?;
    if milestone.is_completed() {
        return Err(PropLedgerError::validation(
            "milestone",
            "Milestone is already completed",
        ));
    }

    milestone.status = MilestoneStatus::Completed;
    milestone.completed_at = Some(now);
    info!("escrow {}: milestone '{}' completed", tx.id, name);
    tx.updated_at = Some(now);
    tx.version += 1;
    Ok(())
}

/// Abandon a transaction that was never funded.
pub fn cancel(tx: &mut EscrowTransaction, reason: &str, now: Timestamp) -> PropLedgerResult<()> {
    require_state(tx, &[EscrowStatus::Pending], "cancel")?;
    require_text(reason, "reason")?;
    tx.cancellation_reason = Some(reason.to_string());
    advance(tx, EscrowStatus::Cancelled, now);
    Ok(())
}

/// A transition request as sent by the UI or the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum EscrowAction {
    Fund,
    Hold,
    ConfirmPossession(ConfirmationData),
    FileDispute(DisputeData),
    CheckAutoRelease,
    ResolveDispute(DisputeResolution),
    Complete,
    Cancel { reason: String },
    CompleteMilestone { name: String },
}

/// Dispatch an [`EscrowAction`]. Returns whether the transaction changed;
/// only the auto-release check can succeed without changing anything.
pub fn apply(
    tx: &mut EscrowTransaction,
    action: &EscrowAction,
    now: Timestamp,
) -> PropLedgerResult<bool> {
    match action {
        EscrowAction::Fund => fund(tx, now)?,
        EscrowAction::Hold => hold_in_escrow(tx, now)?,
        EscrowAction::ConfirmPossession(data) => confirm_possession(tx, data, now)?,
        EscrowAction::FileDispute(data) => file_dispute(tx, data, now)?,
        EscrowAction::CheckAutoRelease => return Ok(check_auto_release(tx, now)),
        EscrowAction::ResolveDispute(resolution) => resolve_dispute(tx, resolution, now)?,
        EscrowAction::Complete => complete(tx, now)?,
        EscrowAction::Cancel { reason } => cancel(tx, reason, now)?,
        EscrowAction::CompleteMilestone { name } => complete_milestone(tx, name, now)?,
    }
    Ok(true)
}
