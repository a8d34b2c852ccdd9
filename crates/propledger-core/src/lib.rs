pub mod error;
pub mod types;

#[cfg(feature = "mortgage")]
pub mod mortgage;

#[cfg(feature = "escrow")]
pub mod escrow;

pub use error::PropLedgerError;
pub use types::*;

/// Standard result type for all propledger operations
pub type PropLedgerResult<T> = Result<T, PropLedgerError>;
