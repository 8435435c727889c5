//! Append-only ledger of balance operations.
//!
//! Rows are insert-only: nothing here updates or deletes an existing entry.

use crate::errors::{BalanceError, Result, PG_FOREIGN_KEY_VIOLATION};
use crate::models::{LedgerEntry, OperationKind};
use sqlx::PgConnection;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default)]
pub struct LedgerStore;

impl LedgerStore {
    pub fn new() -> Self {
        LedgerStore
    }

    /// Appends a ledger entry. A foreign-key violation on the owning account
    /// means the account vanished between resolve and insert and is reported
    /// as not-found.
    pub async fn insert(&self, conn: &mut PgConnection, entry: &LedgerEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO balance_operations (id, account_id, amount, kind, description, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entry.id)
        .bind(entry.account_id)
        .bind(entry.amount)
        .bind(entry.kind)
        .bind(&entry.description)
        .bind(entry.created_at)
        .execute(conn)
        .await
        .map_err(|e| {
            let is_fk_violation = e
                .as_database_error()
                .and_then(|db| db.code())
                .map(|code| code == PG_FOREIGN_KEY_VIOLATION)
                .unwrap_or(false);
            if is_fk_violation {
                BalanceError::AccountNotFound(entry.account_id.to_string())
            } else {
                BalanceError::Database(e)
            }
        })?;

        Ok(())
    }

    /// Lists an owner's entries newest first. A non-positive limit means no
    /// limit; a non-positive offset means no skip.
    pub async fn list_by_owner(
        &self,
        conn: &mut PgConnection,
        owner_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<LedgerEntry>> {
        let limit = if limit > 0 { Some(limit) } else { None };
        let offset = if offset > 0 { Some(offset) } else { None };

        let entries = sqlx::query_as::<_, LedgerEntry>(
            r#"
            SELECT bo.id, bo.account_id, bo.amount, bo.kind, bo.description, bo.created_at
            FROM balance_operations bo
            JOIN accounts a ON a.id = bo.account_id
            WHERE a.user_id = $1
            ORDER BY bo.created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(owner_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(conn)
        .await?;

        Ok(entries)
    }

    /// Total number of entries for an owner, irrespective of pagination.
    pub async fn count_by_owner(&self, conn: &mut PgConnection, owner_id: &str) -> Result<i64> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM balance_operations bo
            JOIN accounts a ON a.id = bo.account_id
            WHERE a.user_id = $1
            "#,
        )
        .bind(owner_id)
        .fetch_one(conn)
        .await?;

        Ok(total)
    }

    /// Sum of all deposit entries for an account. Source of truth for the
    /// derived reputation tier.
    pub async fn sum_deposits(&self, conn: &mut PgConnection, account_id: Uuid) -> Result<i64> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COALESCE(SUM(amount), 0)::BIGINT
            FROM balance_operations
            WHERE account_id = $1 AND kind = $2
            "#,
        )
        .bind(account_id)
        .bind(OperationKind::Deposit)
        .fetch_one(conn)
        .await?;

        Ok(total)
    }
}
