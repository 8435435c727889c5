//! Balance engine: the orchestrating core.
//!
//! Composes the account store, ledger store and tier store under one
//! transaction per mutation and enforces the money-safety invariants:
//! no negative balance, no lost updates, no orphaned ledger rows.

use crate::errors::{BalanceError, Result};
use crate::metrics;
use crate::models::{Account, LedgerEntry, NewOperation, OperationKind};
use crate::store::{AccountStore, LedgerStore, TierStore};
use crate::tx::TxManager;
use chrono::{DurationRound, Utc};
use futures_util::FutureExt;
use sqlx::{PgConnection, PgPool};
use tracing::{error, info};
use uuid::Uuid;

pub struct BalanceEngine {
    pool: PgPool,
    tx: TxManager,
    accounts: AccountStore,
    ledger: LedgerStore,
    tiers: TierStore,
}

impl BalanceEngine {
    pub fn new(
        pool: PgPool,
        tx: TxManager,
        accounts: AccountStore,
        ledger: LedgerStore,
        tiers: TierStore,
    ) -> Self {
        Self {
            pool,
            tx,
            accounts,
            ledger,
            tiers,
        }
    }

    /// Applies a deposit or withdrawal to the owner's account.
    ///
    /// Validation happens before any I/O. Everything else runs inside a
    /// single transaction that is detached from caller cancellation: the
    /// ledger insert, the balance update and the tier reassignment either
    /// all commit or all roll back. The account row is locked on read, so
    /// concurrent operations on the same account serialize.
    pub async fn create_operation(
        &self,
        owner_id: &str,
        operation: NewOperation,
    ) -> Result<LedgerEntry> {
        if operation.amount <= 0 {
            return Err(BalanceError::InvalidOperation(format!(
                "amount must be positive, got {}",
                operation.amount
            )));
        }

        let kind = operation.kind;
        let amount = operation.amount;
        let owner = owner_id.to_string();
        let owner_for_log = owner.clone();

        let accounts = self.accounts;
        let ledger = self.ledger;
        let tiers = self.tiers;

        let timer = metrics::OPERATION_DURATION_SECONDS.start_timer();
        let result = self
            .tx
            .run_detached(move |conn: &mut PgConnection| {
                async move {
                    let account = accounts.get_by_owner_for_update(&mut *conn, &owner).await?;
                    let new_balance = operation.kind.apply(account.balance, operation.amount)?;

                    // One timestamp for every write in this transaction,
                    // truncated to the microsecond precision Postgres keeps
                    // so the returned entry matches what was persisted.
                    let now = Utc::now();
                    let now = now
                        .duration_trunc(chrono::Duration::microseconds(1))
                        .unwrap_or(now);
                    let entry = LedgerEntry {
                        id: operation.id.unwrap_or_else(Uuid::new_v4),
                        account_id: account.id,
                        amount: operation.amount,
                        kind: operation.kind,
                        description: operation.description,
                        created_at: now,
                    };

                    ledger.insert(&mut *conn, &entry).await?;
                    accounts
                        .update_balance(&mut *conn, account.id, new_balance, entry.created_at)
                        .await?;

                    if entry.kind == OperationKind::Deposit {
                        let total_deposits = ledger.sum_deposits(&mut *conn, account.id).await?;
                        let tier = match tiers.find_for_deposits(&mut *conn, total_deposits).await? {
                            Some(tier) => tier,
                            None => tiers.lowest(&mut *conn).await?,
                        };
                        let current = tiers.current_tier_of(&mut *conn, &account.user_id).await?;
                        if current != tier.id {
                            info!(
                                "reassigning owner {} from tier {} to tier {} ({} cumulative deposits)",
                                account.user_id, current, tier.id, total_deposits
                            );
                            tiers
                                .assign_tier(&mut *conn, &account.user_id, tier.id, entry.created_at)
                                .await?;
                        }
                    }

                    Ok(entry)
                }
                .boxed()
            })
            .await;
        timer.observe_duration();

        match result {
            Ok(entry) => {
                metrics::OPERATIONS_TOTAL
                    .with_label_values(&[kind.as_str(), "ok"])
                    .inc();
                info!(
                    "created {} of {} for owner {} (entry {})",
                    kind, amount, owner_for_log, entry.id
                );
                Ok(entry)
            }
            Err(err) => {
                metrics::OPERATIONS_TOTAL
                    .with_label_values(&[kind.as_str(), "error"])
                    .inc();
                if !err.is_client_error() {
                    error!(
                        "failed to create {} of {} for owner {}: {}",
                        kind, amount, owner_for_log, err
                    );
                }
                Err(err)
            }
        }
    }

    /// Current balance for an owner. Plain consistent read.
    pub async fn get_balance(&self, owner_id: &str) -> Result<Account> {
        let mut conn = self.pool.acquire().await?;
        self.accounts.get_by_owner(&mut conn, owner_id).await
    }

    /// The owner's ledger entries, newest first, plus the total count
    /// irrespective of pagination. Both are computed in one read
    /// transaction; the caller may cancel freely.
    pub async fn list_operations(
        &self,
        owner_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<LedgerEntry>, i64)> {
        let ledger = self.ledger;
        let owner = owner_id.to_string();

        self.tx
            .run(move |conn: &mut PgConnection| {
                async move {
                    let entries = ledger
                        .list_by_owner(&mut *conn, &owner, limit, offset)
                        .await?;
                    let total = ledger.count_by_owner(&mut *conn, &owner).await?;
                    Ok((entries, total))
                }
                .boxed()
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    fn offline_engine() -> BalanceEngine {
        // connect_lazy never opens a connection; any I/O would fail loudly.
        let pool = PgPoolOptions::new()
            .connect_lazy("postgresql://unreachable:5432/none")
            .unwrap();
        BalanceEngine::new(
            pool.clone(),
            TxManager::new(pool),
            AccountStore::new(),
            LedgerStore::new(),
            TierStore::new(),
        )
    }

    #[tokio::test]
    async fn test_zero_amount_rejected_before_any_io() {
        let engine = offline_engine();
        let err = engine
            .create_operation(
                "owner-1",
                NewOperation {
                    id: None,
                    amount: 0,
                    kind: OperationKind::Deposit,
                    description: String::new(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BalanceError::InvalidOperation(_)));
    }

    #[tokio::test]
    async fn test_negative_amount_rejected_before_any_io() {
        let engine = offline_engine();
        let err = engine
            .create_operation(
                "owner-1",
                NewOperation {
                    id: None,
                    amount: -25,
                    kind: OperationKind::Withdraw,
                    description: String::new(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BalanceError::InvalidOperation(_)));
    }
}
