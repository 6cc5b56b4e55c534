//! Durable policy store backed by the `policy_rules` table.

use async_trait::async_trait;
use sqlx::PgPool;

use miniblog_core::error::{AppError, ErrorKind};
use miniblog_core::result::AppResult;
use miniblog_core::traits::PolicyAdapter;
use miniblog_core::types::PolicyRule;
use miniblog_entity::policy::PolicyRow;

/// Reads and writes authorization rules for the policy engine.
#[derive(Debug, Clone)]
pub struct PolicyRepository {
    pool: PgPool,
}

impl PolicyRepository {
    /// Create a new policy repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PolicyAdapter for PolicyRepository {
    async fn load_policy(&self) -> AppResult<Vec<PolicyRule>> {
        let rows = sqlx::query_as::<_, PolicyRow>(
            "SELECT id, ptype, v0, v1, v2 FROM policy_rules ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load policy rules", e))?;

        Ok(rows.into_iter().map(PolicyRule::from).collect())
    }

    async fn add_policy(&self, rule: &PolicyRule) -> AppResult<bool> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let result = sqlx::query(
            "INSERT INTO policy_rules (ptype, v0, v1, v2) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (ptype, v0, v1, v2) DO NOTHING",
        )
        .bind(&rule.ptype)
        .bind(&rule.subject)
        .bind(&rule.object)
        .bind(&rule.action)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to add policy rule", e))?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit policy rule", e)
        })?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove_policy(&self, rule: &PolicyRule) -> AppResult<bool> {
        let result = sqlx::query(
            "DELETE FROM policy_rules WHERE ptype = $1 AND v0 = $2 AND v1 = $3 AND v2 = $4",
        )
        .bind(&rule.ptype)
        .bind(&rule.subject)
        .bind(&rule.object)
        .bind(&rule.action)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to remove policy rule", e)
        })?;

        Ok(result.rows_affected() > 0)
    }
}
