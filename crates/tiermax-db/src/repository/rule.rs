//! # Rule Repository
//!
//! Per-(product, rule key) configured maximums.
//!
//! ## Table Layout
//! ```text
//! product_rules
//! ┌────────────┬──────────────────────────────────────────────┬──────────────┐
//! │ product_id │ rule_key                                     │ max_quantity │
//! ├────────────┼──────────────────────────────────────────────┼──────────────┤
//! │ P1         │ maximum_allowed_quantity_membership_vip_tier │ 2            │
//! │ P1         │ maximum_allowed_quantity_membership_gold     │ 0            │
//! └────────────┴──────────────────────────────────────────────┴──────────────┘
//! ```
//!
//! Values are already coerced by the rule editor, so the column is a plain
//! non-negative INTEGER. Rows outlive the plans they were written for until
//! [`RuleRepository::prune_orphans`] is called.

use chrono::Utc;
use sqlx::SqlitePool;
use tiermax_core::{ProductId, RuleKey, RuleUpdate, RULE_KEY_PREFIX};
use tracing::{debug, info, warn};

use crate::error::DbResult;

/// Repository for product rules.
#[derive(Debug, Clone)]
pub struct RuleRepository {
    pool: SqlitePool,
}

impl RuleRepository {
    /// Creates a new RuleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RuleRepository { pool }
    }

    /// Gets the configured maximum for one key on one product.
    pub async fn get(&self, product: &ProductId, key: &RuleKey) -> DbResult<Option<i64>> {
        let value = sqlx::query_scalar::<_, i64>(
            "SELECT max_quantity FROM product_rules WHERE product_id = ?1 AND rule_key = ?2",
        )
        .bind(product.as_str())
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(value)
    }

    /// All rules stored on a product, sorted by key.
    ///
    /// Rows whose key lacks the rule prefix are skipped.
    pub async fn for_product(&self, product: &ProductId) -> DbResult<Vec<(RuleKey, i64)>> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT rule_key, max_quantity
            FROM product_rules
            WHERE product_id = ?1
            ORDER BY rule_key
            "#,
        )
        .bind(product.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(raw, value)| match RuleKey::parse(&raw) {
                Some(key) => Some((key, value)),
                None => {
                    warn!(product_id = %product, rule_key = %raw, "Skipping malformed rule key");
                    None
                }
            })
            .collect())
    }

    /// Writes a batch of editor updates for one product in a transaction.
    ///
    /// ## Returns
    /// Number of rows written.
    pub async fn apply_updates(
        &self,
        product: &ProductId,
        updates: &[RuleUpdate],
    ) -> DbResult<usize> {
        if updates.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        for update in updates {
            sqlx::query(
                r#"
                INSERT INTO product_rules (product_id, rule_key, max_quantity, updated_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(product_id, rule_key) DO UPDATE SET
                    max_quantity = excluded.max_quantity,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(product.as_str())
            .bind(update.key.as_str())
            .bind(update.value)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!(product_id = %product, written = updates.len(), "Applied rule updates");
        Ok(updates.len())
    }

    /// Deletes rule rows whose key is not in `known`, across all products.
    ///
    /// Only keys carrying the rule prefix are considered.
    ///
    /// ## Returns
    /// Number of rows deleted.
    pub async fn prune_orphans(&self, known: &[RuleKey]) -> DbResult<u64> {
        let stored = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT rule_key
            FROM product_rules
            WHERE substr(rule_key, 1, ?1) = ?2
            "#,
        )
        .bind(RULE_KEY_PREFIX.len() as i64)
        .bind(RULE_KEY_PREFIX)
        .fetch_all(&self.pool)
        .await?;

        let orphaned: Vec<String> = stored
            .into_iter()
            .filter(|raw| !known.iter().any(|key| key.as_str() == raw))
            .collect();

        if orphaned.is_empty() {
            return Ok(0);
        }

        let mut deleted = 0;
        let mut tx = self.pool.begin().await?;
        for raw in &orphaned {
            deleted += sqlx::query("DELETE FROM product_rules WHERE rule_key = ?1")
                .bind(raw)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }
        tx.commit().await?;

        info!(keys = orphaned.len(), rows = deleted, "Pruned orphaned rules");
        Ok(deleted)
    }

    /// Counts stored rules (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM product_rules")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
