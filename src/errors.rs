use thiserror::Error;

#[derive(Error, Debug)]
pub enum BalanceError {
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("account not found for owner {0}")]
    AccountNotFound(String),

    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: i64, available: i64 },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, BalanceError>;

impl BalanceError {
    /// True for the caller-facing kinds that do not indicate a storage or
    /// transport failure.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            BalanceError::InvalidOperation(_)
                | BalanceError::AccountNotFound(_)
                | BalanceError::InsufficientFunds { .. }
        )
    }
}

/// Postgres error code for foreign key violations. An insert that trips this
/// on balance_operations.account_id means the account vanished mid-flight.
pub const PG_FOREIGN_KEY_VIOLATION: &str = "23503";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        assert!(BalanceError::InvalidOperation("amount".into()).is_client_error());
        assert!(BalanceError::AccountNotFound("u1".into()).is_client_error());
        assert!(BalanceError::InsufficientFunds {
            requested: 60,
            available: 50
        }
        .is_client_error());
        assert!(!BalanceError::Internal("boom".into()).is_client_error());
        assert!(!BalanceError::Database(sqlx::Error::RowNotFound).is_client_error());
    }

    #[test]
    fn test_insufficient_funds_message() {
        let err = BalanceError::InsufficientFunds {
            requested: 60,
            available: 50,
        };
        assert_eq!(
            err.to_string(),
            "insufficient funds: requested 60, available 50"
        );
    }
}
