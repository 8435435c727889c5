//! Durable owner -> balance mapping.
//!
//! Every method takes the transaction-scoped connection handle; callers
//! decide whether it comes from a transaction or a plain pool acquire.

use crate::errors::{BalanceError, Result};
use crate::models::Account;
use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default)]
pub struct AccountStore;

impl AccountStore {
    pub fn new() -> Self {
        AccountStore
    }

    /// Plain read of the account for an owner.
    pub async fn get_by_owner(&self, conn: &mut PgConnection, owner_id: &str) -> Result<Account> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, user_id, balance
            FROM accounts
            WHERE user_id = $1
            "#,
        )
        .bind(owner_id)
        .fetch_optional(conn)
        .await?;

        account.ok_or_else(|| BalanceError::AccountNotFound(owner_id.to_string()))
    }

    /// Reads the account for an owner and takes a row-level exclusive lock
    /// that is held until the surrounding transaction ends. Concurrent
    /// mutations of the same account serialize on this lock; without it two
    /// racing withdrawals could both observe a sufficient balance.
    pub async fn get_by_owner_for_update(
        &self,
        conn: &mut PgConnection,
        owner_id: &str,
    ) -> Result<Account> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, user_id, balance
            FROM accounts
            WHERE user_id = $1
            FOR UPDATE
            "#,
        )
        .bind(owner_id)
        .fetch_optional(conn)
        .await?;

        account.ok_or_else(|| BalanceError::AccountNotFound(owner_id.to_string()))
    }

    /// Persists a new balance on an account.
    pub async fn update_balance(
        &self,
        conn: &mut PgConnection,
        account_id: Uuid,
        balance: i64,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET balance = $1, updated_at = $2
            WHERE id = $3
            "#,
        )
        .bind(balance)
        .bind(updated_at)
        .bind(account_id)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(BalanceError::AccountNotFound(account_id.to_string()));
        }

        Ok(())
    }
}
