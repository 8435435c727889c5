//! Reputation tier lookups and the user's current-tier pointer.
//!
//! The tier table itself is managed elsewhere and read-only here. The
//! current-tier pointer on the user row is written by the balance engine
//! only, as a side effect of deposits.

use crate::errors::{BalanceError, Result};
use crate::models::ReputationTier;
use chrono::{DateTime, Utc};
use sqlx::PgConnection;

#[derive(Debug, Clone, Copy, Default)]
pub struct TierStore;

impl TierStore {
    pub fn new() -> Self {
        TierStore
    }

    /// The tier with the greatest threshold not exceeding the cumulative
    /// deposit sum, or None when no tier qualifies.
    pub async fn find_for_deposits(
        &self,
        conn: &mut PgConnection,
        total_deposits: i64,
    ) -> Result<Option<ReputationTier>> {
        let tier = sqlx::query_as::<_, ReputationTier>(
            r#"
            SELECT id, name, description, coefficient, min_deposits
            FROM reputation_tiers
            WHERE min_deposits <= $1
            ORDER BY min_deposits DESC
            LIMIT 1
            "#,
        )
        .bind(total_deposits)
        .fetch_optional(conn)
        .await?;

        Ok(tier)
    }

    /// The lowest-ranked tier, used as the fallback when no threshold
    /// qualifies. The seed migration guarantees at least one tier exists.
    pub async fn lowest(&self, conn: &mut PgConnection) -> Result<ReputationTier> {
        let tier = sqlx::query_as::<_, ReputationTier>(
            r#"
            SELECT id, name, description, coefficient, min_deposits
            FROM reputation_tiers
            ORDER BY min_deposits ASC
            LIMIT 1
            "#,
        )
        .fetch_optional(conn)
        .await?;

        tier.ok_or_else(|| BalanceError::Internal("no reputation tiers configured".to_string()))
    }

    /// Current tier pointer of a user.
    pub async fn current_tier_of(&self, conn: &mut PgConnection, user_id: &str) -> Result<i32> {
        let tier_id = sqlx::query_scalar::<_, i32>(
            r#"
            SELECT reputation_tier_id
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(conn)
        .await?;

        tier_id.ok_or_else(|| {
            BalanceError::Internal(format!("user row missing for account owner {user_id}"))
        })
    }

    /// Reassigns the user's current tier.
    pub async fn assign_tier(
        &self,
        conn: &mut PgConnection,
        user_id: &str,
        tier_id: i32,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET reputation_tier_id = $1, updated_at = $2
            WHERE id = $3
            "#,
        )
        .bind(tier_id)
        .bind(updated_at)
        .bind(user_id)
        .execute(conn)
        .await?;

        Ok(())
    }
}
