//! Escrow service fees.
//!
//! The platform charges 0.5% of the purchase price on top of it. A flat
//! processing fee from the payment provider may be added.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{round_money, Money};

/// Platform fee as a fraction of the escrowed amount.
pub const ESCROW_FEE_RATE: Decimal = dec!(0.005);

/// Fees recorded on a transaction.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EscrowFees {
    pub platform_fee: Money,
    #[serde(default)]
    pub processing_fee: Money,
    pub total_fees: Money,
}

/// Platform fee on `amount`, rounded to a whole unit. Zero for
/// non-positive amounts.
pub fn escrow_fee(amount: Money) -> Money {
    if amount <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    round_money(amount * ESCROW_FEE_RATE)
}

/// What the buyer pays in: the amount plus the platform fee.
pub fn total_with_fee(amount: Money) -> Money {
    amount.max(Decimal::ZERO) + escrow_fee(amount)
}

pub fn fee_breakdown(amount: Money, processing_fee: Money) -> EscrowFees {
    let platform_fee = escrow_fee(amount);
    let processing_fee = processing_fee.max(Decimal::ZERO);
    EscrowFees {
        platform_fee,
        processing_fee,
        total_fees: platform_fee + processing_fee,
    }
}
