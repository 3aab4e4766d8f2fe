//! # Plan Repository
//!
//! The local mirror of the membership system's plan catalog.
//!
//! Plans are imported (upserted) from the membership system; this crate
//! never edits them on its own.

use chrono::Utc;
use sqlx::SqlitePool;
use tiermax_core::validation::{validate_plan_name, validate_plan_slug};
use tiermax_core::{MembershipPlan, PlanId};
use tracing::debug;

use crate::error::DbResult;

#[derive(Debug, sqlx::FromRow)]
struct PlanRow {
    id: String,
    slug: String,
    name: String,
    priority: i32,
}

impl From<PlanRow> for MembershipPlan {
    fn from(row: PlanRow) -> Self {
        MembershipPlan {
            id: PlanId::new(row.id),
            slug: row.slug,
            name: row.name,
            priority: row.priority,
        }
    }
}

/// Repository for the plan catalog.
#[derive(Debug, Clone)]
pub struct PlanRepository {
    pool: SqlitePool,
}

impl PlanRepository {
    /// Creates a new PlanRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PlanRepository { pool }
    }

    /// Inserts a plan or refreshes an existing one with the same id.
    ///
    /// ## Returns
    /// * `Err(DbError::Validation)` - slug or name unusable
    pub async fn upsert(&self, plan: &MembershipPlan) -> DbResult<()> {
        validate_plan_slug(&plan.slug)?;
        validate_plan_name(&plan.name)?;

        debug!(plan_id = %plan.id, slug = %plan.slug, "Upserting membership plan");

        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO membership_plans (id, slug, name, priority, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            ON CONFLICT(id) DO UPDATE SET
                slug = excluded.slug,
                name = excluded.name,
                priority = excluded.priority,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(plan.id.as_str())
        .bind(&plan.slug)
        .bind(&plan.name)
        .bind(plan.priority)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a plan by id.
    pub async fn get(&self, id: &PlanId) -> DbResult<Option<MembershipPlan>> {
        let row = sqlx::query_as::<_, PlanRow>(
            "SELECT id, slug, name, priority FROM membership_plans WHERE id = ?1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(MembershipPlan::from))
    }

    /// Lists every plan, sorted by display name.
    pub async fn list(&self) -> DbResult<Vec<MembershipPlan>> {
        let rows = sqlx::query_as::<_, PlanRow>(
            r#"
            SELECT id, slug, name, priority
            FROM membership_plans
            ORDER BY name COLLATE NOCASE, name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(MembershipPlan::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::{Database, DbConfig};

    async fn repo() -> PlanRepository {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.plans()
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let repo = repo().await;
        let plan = MembershipPlan::new("41", "vip-tier", "VIP Tier").with_priority(3);
        repo.upsert(&plan).await.unwrap();

        assert_eq!(repo.get(&PlanId::new("41")).await.unwrap(), Some(plan));
        assert_eq!(repo.get(&PlanId::new("42")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_upsert_refreshes_existing() {
        let repo = repo().await;
        repo.upsert(&MembershipPlan::new("1", "gold", "Gold"))
            .await
            .unwrap();
        repo.upsert(&MembershipPlan::new("1", "gold-plus", "Gold Plus"))
            .await
            .unwrap();

        let plans = repo.list().await.unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].slug, "gold-plus");
    }

    #[tokio::test]
    async fn test_list_sorted_by_name() {
        let repo = repo().await;
        let catalog = [
            ("1", "silver", "Silver"),
            ("2", "bronze", "bronze"),
            ("3", "gold", "Gold"),
        ];
        for (id, slug, name) in catalog {
            repo.upsert(&MembershipPlan::new(id, slug, name)).await.unwrap();
        }

        let names: Vec<_> = repo
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["bronze", "Gold", "Silver"]);
    }

    #[tokio::test]
    async fn test_upsert_rejects_bad_slug() {
        let repo = repo().await;
        let err = repo
            .upsert(&MembershipPlan::new("1", "Not A Slug", "Broken"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
    }
}
