//! Transaction boundary over the Postgres pool.
//!
//! A unit of work receives the transaction-scoped `&mut PgConnection` handle
//! explicitly and passes it to every store call it makes; a unit of work that
//! composes other store functions reuses the same handle instead of opening a
//! nested transaction. On any error from the unit of work the transaction is
//! rolled back; on success it is committed atomically.

use crate::errors::{BalanceError, Result};
use futures_util::future::BoxFuture;
use sqlx::{PgConnection, PgPool};
use std::time::Duration;
use tracing::error;

#[derive(Clone)]
pub struct TxManager {
    pool: PgPool,
}

impl TxManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs the unit of work inside a transaction, honoring caller
    /// cancellation: dropping the returned future rolls the transaction back.
    pub async fn run<T, F>(&self, work: F) -> Result<T>
    where
        F: for<'c> FnOnce(&'c mut PgConnection) -> BoxFuture<'c, Result<T>>,
    {
        let mut tx = self.pool.begin().await?;
        match work(&mut tx).await {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    error!("transaction rollback failed: {}", rollback_err);
                }
                Err(err)
            }
        }
    }

    /// Runs the unit of work on a detached task so it completes even if the
    /// caller goes away. Used for financial mutations: once validation has
    /// passed, the operation either commits fully or rolls back fully,
    /// never half-applies because a client disconnected.
    pub async fn run_detached<T, F>(&self, work: F) -> Result<T>
    where
        T: Send + 'static,
        F: for<'c> FnOnce(&'c mut PgConnection) -> BoxFuture<'c, Result<T>> + Send + 'static,
    {
        let pool = self.pool.clone();
        let task = tokio::spawn(async move {
            let mut tx = pool.begin().await?;
            match work(&mut tx).await {
                Ok(value) => {
                    tx.commit().await?;
                    Ok(value)
                }
                Err(err) => {
                    if let Err(rollback_err) = tx.rollback().await {
                        error!("transaction rollback failed: {}", rollback_err);
                    }
                    Err(err)
                }
            }
        });

        task.await
            .map_err(|e| BalanceError::Internal(format!("transaction task failed: {e}")))?
    }

    /// Runs the unit of work with an explicit deadline. An elapsed timeout
    /// drops the transaction, which rolls back any writes it performed.
    pub async fn run_with_timeout<T, F>(&self, timeout: Duration, work: F) -> Result<T>
    where
        F: for<'c> FnOnce(&'c mut PgConnection) -> BoxFuture<'c, Result<T>>,
    {
        match tokio::time::timeout(timeout, self.run(work)).await {
            Ok(result) => result,
            Err(_) => Err(BalanceError::Internal(format!(
                "transaction timed out after {}ms",
                timeout.as_millis()
            ))),
        }
    }
}
