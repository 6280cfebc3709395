//! Error types for the podgrid state store.

use thiserror::Error;
use uuid::Uuid;

/// Result type alias for state store operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur during state store operations.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to open database: {0}")]
    Open(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("table error: {0}")]
    Table(String),

    #[error("read error: {0}")]
    Read(String),

    #[error("write error: {0}")]
    Write(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),

    #[error("configuration version was never stored: {0}")]
    InvalidVersion(Uuid),

    #[error("no target configuration has been set")]
    NoTargetConfigured,

    #[error("configuration {0} is the current target and cannot be cleared")]
    TargetInUse(Uuid),

    #[error("configuration rejected: {0}")]
    InvalidConfiguration(String),
}

impl StateError {
    /// True for failures of the backing store itself, as opposed to misuse.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            StateError::Open(_)
                | StateError::Transaction(_)
                | StateError::Table(_)
                | StateError::Read(_)
                | StateError::Write(_)
                | StateError::Serialize(_)
                | StateError::Deserialize(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_are_classified() {
        assert!(StateError::Open("locked".to_string()).is_storage());
        assert!(StateError::Write("disk full".to_string()).is_storage());
        assert!(!StateError::NoTargetConfigured.is_storage());
        assert!(!StateError::InvalidVersion(Uuid::nil()).is_storage());
    }
}
