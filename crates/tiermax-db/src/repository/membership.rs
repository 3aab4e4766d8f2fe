//! # Membership Repository
//!
//! Which users hold which plans.
//!
//! ## Ordering
//! [`MembershipRepository::active_for_user`] returns memberships oldest first
//! (`started_at`, then insertion order; unknown start dates sort first).
//! Under `TieBreak::LastListed` the most recently started membership wins.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tiermax_core::{Membership, MembershipStatus, PlanId, UserId};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;

#[derive(Debug, sqlx::FromRow)]
struct MembershipRow {
    id: String,
    user_id: String,
    plan_id: Option<String>,
    status: MembershipStatus,
    started_at: Option<DateTime<Utc>>,
}

impl From<MembershipRow> for Membership {
    fn from(row: MembershipRow) -> Self {
        Membership {
            id: row.id,
            user_id: UserId::new(row.user_id),
            plan_id: row.plan_id.map(PlanId::new),
            status: row.status,
            started_at: row.started_at,
        }
    }
}

/// Repository for user memberships.
#[derive(Debug, Clone)]
pub struct MembershipRepository {
    pool: SqlitePool,
}

impl MembershipRepository {
    /// Creates a new MembershipRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MembershipRepository { pool }
    }

    /// Records a membership imported from the membership system.
    ///
    /// ## Returns
    /// * `Err(DbError::ForeignKeyViolation)` - plan id not in the catalog
    /// * `Err(DbError::UniqueViolation)` - membership id already recorded
    pub async fn insert(&self, membership: &Membership) -> DbResult<()> {
        debug!(
            membership_id = %membership.id,
            user_id = %membership.user_id,
            "Inserting membership"
        );

        sqlx::query(
            r#"
            INSERT INTO user_memberships (id, user_id, plan_id, status, started_at, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&membership.id)
        .bind(membership.user_id.as_str())
        .bind(membership.plan_id.as_ref().map(PlanId::as_str))
        .bind(membership.status)
        .bind(membership.started_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Active memberships of `user`, oldest first.
    pub async fn active_for_user(&self, user: &UserId) -> DbResult<Vec<Membership>> {
        let rows = sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT id, user_id, plan_id, status, started_at
            FROM user_memberships
            WHERE user_id = ?1 AND status = 'active'
            ORDER BY started_at, rowid
            "#,
        )
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await?;

        debug!(user_id = %user, count = rows.len(), "Loaded active memberships");
        Ok(rows.into_iter().map(Membership::from).collect())
    }
}

/// Generates a new membership record id.
pub fn generate_membership_id() -> String {
    Uuid::new_v4().to_string()
}
