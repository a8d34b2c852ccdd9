use thiserror::Error;

#[derive(Debug, Error)]
pub enum PropLedgerError {
    #[error("Validation failed: {field} — {reason}")]
    Validation { field: String, reason: String },

    #[error("Invalid state: cannot {transition} a transaction that is {current}")]
    InvalidState { transition: String, current: String },

    #[error("Date error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl PropLedgerError {
    pub(crate) fn validation(field: &str, reason: &str) -> Self {
        PropLedgerError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for PropLedgerError {
    fn from(e: serde_json::Error) -> Self {
        PropLedgerError::SerializationError(e.to_string())
    }
}
