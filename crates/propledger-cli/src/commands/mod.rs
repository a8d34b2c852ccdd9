pub mod escrow;
pub mod mortgage;
