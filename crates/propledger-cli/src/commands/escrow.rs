use clap::{Args, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use serde_json::{json, Value};

use propledger_core::escrow::fees;
use propledger_core::escrow::lifecycle::{self, EscrowAction};
use propledger_core::escrow::timer;
use propledger_core::escrow::{
    ConfirmationData, DisputeData, DisputeDecision, DisputeResolution, EscrowRole,
    EscrowTransaction,
};
use propledger_core::Timestamp;

use crate::input;

/// Arguments for the escrow lifecycle
#[derive(Args)]
pub struct EscrowArgs {
    #[command(subcommand)]
    pub action: EscrowCommand,
}

#[derive(Subcommand)]
pub enum EscrowCommand {
    /// Record that the buyer's funds were received; starts the 7-day window
    Fund(TransactionArgs),
    /// Move funded money into escrow custody
    Hold(TransactionArgs),
    /// Buyer confirms possession of the property
    Confirm(ConfirmArgs),
    /// Buyer disputes the transaction
    Dispute(DisputeArgs),
    /// Release to the seller if the confirmation window has lapsed
    AutoRelease(TransactionArgs),
    /// Admin resolves a dispute by releasing or refunding
    Resolve(ResolveArgs),
    /// Pay out a confirmed or auto-released transaction
    Complete(TransactionArgs),
    /// Cancel a transaction that was never funded
    Cancel(CancelArgs),
    /// Tick off a purchase milestone
    Milestone(MilestoneArgs),
    /// Time left on the confirmation window
    Timer(TransactionArgs),
    /// Escrow fee and total payable for a purchase amount
    Fee(FeeArgs),
}

#[derive(Args)]
pub struct TransactionArgs {
    /// Path to the escrow transaction JSON (or pipe it on stdin)
    #[arg(long)]
    pub input: Option<String>,
}

#[derive(Args)]
pub struct ConfirmArgs {
    #[command(flatten)]
    pub tx: TransactionArgs,

    /// Buyer satisfaction (e.g. satisfied)
    #[arg(long)]
    pub satisfaction: String,

    /// Property condition on hand-over (e.g. good)
    #[arg(long)]
    pub condition: String,

    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Args)]
pub struct DisputeArgs {
    #[command(flatten)]
    pub tx: TransactionArgs,

    /// Short dispute category
    #[arg(long)]
    pub reason: String,

    /// What went wrong
    #[arg(long)]
    pub description: String,
}

#[derive(Args)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub tx: TransactionArgs,

    #[arg(long)]
    pub decision: DecisionArg,

    /// Resolution notes; required for refunds
    #[arg(long, default_value = "")]
    pub notes: String,

    /// Role of the person resolving
    #[arg(long, default_value = "admin")]
    pub resolved_by: RoleArg,
}

#[derive(Args)]
pub struct CancelArgs {
    #[command(flatten)]
    pub tx: TransactionArgs,

    #[arg(long)]
    pub reason: String,
}

#[derive(Args)]
pub struct MilestoneArgs {
    #[command(flatten)]
    pub tx: TransactionArgs,

    /// Milestone name (e.g. "Property Inspection")
    #[arg(long)]
    pub name: String,
}

#[derive(Args)]
pub struct FeeArgs {
    /// Purchase amount in whole currency units
    #[arg(long)]
    pub amount: Decimal,

    /// Flat payment-processing fee to add
    #[arg(long, default_value = "0")]
    pub processing_fee: Decimal,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum DecisionArg {
    Release,
    Refund,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum RoleArg {
    Buyer,
    Seller,
    Admin,
}

impl From<DecisionArg> for DisputeDecision {
    fn from(d: DecisionArg) -> Self {
        match d {
            DecisionArg::Release => DisputeDecision::Release,
            DecisionArg::Refund => DisputeDecision::Refund,
        }
    }
}

impl From<RoleArg> for EscrowRole {
    fn from(r: RoleArg) -> Self {
        match r {
            RoleArg::Buyer => EscrowRole::Buyer,
            RoleArg::Seller => EscrowRole::Seller,
            RoleArg::Admin => EscrowRole::Admin,
        }
    }
}

fn read_transaction(args: &TransactionArgs) -> Result<EscrowTransaction, Box<dyn std::error::Error>> {
    if let Some(ref path) = args.input {
        input::file::read_json(path)
    } else if let Some(data) = input::stdin::read_stdin()? {
        Ok(serde_json::from_value(data)?)
    } else {
        Err("--input <transaction.json> or stdin required for escrow actions".into())
    }
}

pub fn run_escrow(args: EscrowArgs, now: Timestamp) -> Result<Value, Box<dyn std::error::Error>> {
    let (tx_args, action) = match args.action {
        EscrowCommand::Timer(tx_args) => return run_timer(&tx_args, now),
        EscrowCommand::Fee(a) => return run_fee(&a),
        EscrowCommand::Fund(tx_args) => (tx_args, EscrowAction::Fund),
        EscrowCommand::Hold(tx_args) => (tx_args, EscrowAction::Hold),
        EscrowCommand::Confirm(a) => (
            a.tx,
            EscrowAction::ConfirmPossession(ConfirmationData {
                satisfaction: a.satisfaction,
                condition: a.condition,
                notes: a.notes,
            }),
        ),
        EscrowCommand::Dispute(a) => (
            a.tx,
            EscrowAction::FileDispute(DisputeData {
                reason: a.reason,
                description: a.description,
            }),
        ),
        EscrowCommand::AutoRelease(tx_args) => (tx_args, EscrowAction::CheckAutoRelease),
        EscrowCommand::Resolve(a) => (
            a.tx,
            EscrowAction::ResolveDispute(DisputeResolution {
                decision: a.decision.into(),
                notes: a.notes,
                resolved_by: a.resolved_by.into(),
            }),
        ),
        EscrowCommand::Complete(tx_args) => (tx_args, EscrowAction::Complete),
        EscrowCommand::Cancel(a) => (a.tx, EscrowAction::Cancel { reason: a.reason }),
        EscrowCommand::Milestone(a) => (a.tx, EscrowAction::CompleteMilestone { name: a.name }),
    };

    let mut tx = read_transaction(&tx_args)?;
    let changed = lifecycle::apply(&mut tx, &action, now)?;
    Ok(json!({
        "result": tx,
        "changed": changed,
    }))
}

fn run_timer(args: &TransactionArgs, now: Timestamp) -> Result<Value, Box<dyn std::error::Error>> {
    let tx = read_transaction(args)?;
    let countdown = timer::transaction_timer(&tx, now)
        .ok_or_else(|| format!("transaction {} has not been funded", tx.id))?;

    Ok(json!({
        "result": {
            "id": tx.id,
            "status": tx.status,
            "confirmation_deadline": tx.confirmation_deadline,
            "expired": countdown.expired,
            "days": countdown.days,
            "hours": countdown.hours,
            "minutes": countdown.minutes,
            "seconds": countdown.seconds,
            "total_seconds": countdown.total_seconds,
            "buyer_can_act": timer::can_take_action(&tx, EscrowRole::Buyer),
            "admin_can_act": timer::can_take_action(&tx, EscrowRole::Admin),
        }
    }))
}

fn run_fee(args: &FeeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let breakdown = fees::fee_breakdown(args.amount, args.processing_fee);
    Ok(json!({
        "result": {
            "amount": args.amount,
            "platform_fee": breakdown.platform_fee,
            "processing_fee": breakdown.processing_fee,
            "total_fees": breakdown.total_fees,
            "total_payable": args.amount + breakdown.total_fees,
        }
    }))
}
