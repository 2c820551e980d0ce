// ❗ Accrual errors
//
// Two kinds of failure reach the caller:
// - Storage: anything rusqlite raises while reading or writing the batch
// - Unexpected: everything else (bad rows, overflow, broken output stream)
//
// Both abort the batch before commit. Nothing is retried here.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AccrualError {
    /// Persistence-layer failure (query, update, insert, commit)
    #[error("{0}")]
    Storage(#[from] rusqlite::Error),

    /// A selected row cannot be accrued
    #[error("investment #{investment_id}: {reason}")]
    InvalidRow { investment_id: i64, reason: String },

    /// Decimal arithmetic left the representable range
    #[error("investment #{investment_id}: accrual arithmetic overflowed")]
    Overflow { investment_id: i64 },

    /// Progress output could not be written
    #[error("failed to write progress: {0}")]
    Output(#[from] std::io::Error),
}

impl AccrualError {
    pub fn invalid_row(investment_id: i64, reason: impl Into<String>) -> Self {
        AccrualError::InvalidRow {
            investment_id,
            reason: reason.into(),
        }
    }

    /// True for failures raised by the storage layer, false for the
    /// generic "unexpected" kind.
    pub fn is_storage(&self) -> bool {
        matches!(self, AccrualError::Storage(_))
    }
}

pub type Result<T> = std::result::Result<T, AccrualError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_kind_is_separated_from_unexpected() {
        let storage = AccrualError::from(rusqlite::Error::QueryReturnedNoRows);
        let row = AccrualError::invalid_row(7, "maturity_date is empty");
        let overflow = AccrualError::Overflow { investment_id: 3 };

        assert!(storage.is_storage());
        assert!(!row.is_storage());
        assert!(!overflow.is_storage());
    }

    #[test]
    fn test_messages_name_the_investment() {
        let err = AccrualError::invalid_row(42, "negative daily accrual -1.5");
        assert_eq!(err.to_string(), "investment #42: negative daily accrual -1.5");

        let err = AccrualError::Overflow { investment_id: 9 };
        assert!(err.to_string().starts_with("investment #9"));
    }
}
