//! Property-based tests for the balance apply step.
//!
//! These verify the money-safety invariants of the pure part of the
//! mutation:
//! - a committed withdrawal never leaves a negative balance
//! - deposits are exact additions, withdrawals exact subtractions
//! - deposit followed by an equal withdrawal restores the balance

use balance_engine::errors::BalanceError;
use balance_engine::models::OperationKind;
use proptest::prelude::*;

/// Strategy for balances: non-negative, away from the overflow boundary.
fn balance_strategy() -> impl Strategy<Value = i64> {
    0i64..=i64::MAX / 2
}

/// Strategy for amounts: strictly positive, away from the overflow boundary.
fn amount_strategy() -> impl Strategy<Value = i64> {
    1i64..=i64::MAX / 2
}

proptest! {
    #[test]
    fn deposit_is_exact_addition(balance in balance_strategy(), amount in amount_strategy()) {
        let result = OperationKind::Deposit.apply(balance, amount).unwrap();
        prop_assert_eq!(result, balance + amount);
        prop_assert!(result > balance);
    }

    #[test]
    fn withdraw_never_goes_negative(balance in 0i64..10_000, amount in 1i64..10_000) {
        match OperationKind::Withdraw.apply(balance, amount) {
            Ok(new_balance) => {
                prop_assert!(amount <= balance);
                prop_assert_eq!(new_balance, balance - amount);
                prop_assert!(new_balance >= 0);
            }
            Err(err) => {
                prop_assert!(amount > balance);
                prop_assert!(
                    matches!(err, BalanceError::InsufficientFunds { .. }),
                    "expected InsufficientFunds, got {:?}",
                    err
                );
            }
        }
    }

    #[test]
    fn deposit_then_equal_withdraw_restores_balance(
        balance in balance_strategy(),
        amount in amount_strategy(),
    ) {
        let after_deposit = OperationKind::Deposit.apply(balance, amount).unwrap();
        let restored = OperationKind::Withdraw.apply(after_deposit, amount).unwrap();
        prop_assert_eq!(restored, balance);
    }

    #[test]
    fn full_withdrawal_empties_the_account(balance in 1i64..=i64::MAX / 2) {
        let result = OperationKind::Withdraw.apply(balance, balance).unwrap();
        prop_assert_eq!(result, 0);
    }
}
