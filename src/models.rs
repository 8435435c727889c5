use crate::errors::{BalanceError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Direction of a balance operation. The amount itself is always positive;
/// the kind carries the sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Deposit,
    Withdraw,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Deposit => "deposit",
            OperationKind::Withdraw => "withdraw",
        }
    }

    /// Applies an operation of this kind to a balance, using checked
    /// arithmetic. Never produces a negative balance.
    pub fn apply(&self, balance: i64, amount: i64) -> Result<i64> {
        match self {
            OperationKind::Withdraw => {
                if balance < amount {
                    return Err(BalanceError::InsufficientFunds {
                        requested: amount,
                        available: balance,
                    });
                }
                balance
                    .checked_sub(amount)
                    .ok_or_else(|| BalanceError::Internal("balance underflow".to_string()))
            }
            OperationKind::Deposit => balance
                .checked_add(amount)
                .ok_or_else(|| BalanceError::Internal("balance overflow".to_string())),
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Balance-bearing record tied 1:1 to a user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub user_id: String,
    pub balance: i64,
}

/// One immutable recorded balance operation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub account_id: Uuid,
    pub amount: i64,
    pub kind: OperationKind,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Operation as submitted by a caller, before identity and timestamp are
/// assigned.
#[derive(Debug, Clone)]
pub struct NewOperation {
    /// Generated when absent.
    pub id: Option<Uuid>,
    pub amount: i64,
    pub kind: OperationKind,
    pub description: String,
}

/// Named reputation band keyed by a minimum cumulative-deposit threshold.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReputationTier {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub coefficient: f64,
    pub min_deposits: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deposit_adds() {
        assert_eq!(OperationKind::Deposit.apply(100, 50).unwrap(), 150);
        assert_eq!(OperationKind::Deposit.apply(0, 1).unwrap(), 1);
    }

    #[test]
    fn test_withdraw_subtracts() {
        assert_eq!(OperationKind::Withdraw.apply(100, 40).unwrap(), 60);
        assert_eq!(OperationKind::Withdraw.apply(50, 50).unwrap(), 0);
    }

    #[test]
    fn test_withdraw_exceeding_balance_fails() {
        let err = OperationKind::Withdraw.apply(50, 60).unwrap_err();
        match err {
            BalanceError::InsufficientFunds {
                requested,
                available,
            } => {
                assert_eq!(requested, 60);
                assert_eq!(available, 50);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_deposit_overflow_is_internal() {
        let err = OperationKind::Deposit.apply(i64::MAX, 1).unwrap_err();
        assert!(matches!(err, BalanceError::Internal(_)));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(OperationKind::Deposit.to_string(), "deposit");
        assert_eq!(OperationKind::Withdraw.to_string(), "withdraw");
    }
}
