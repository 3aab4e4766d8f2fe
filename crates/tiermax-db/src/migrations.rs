//! # Schema Migrations
//!
//! SQL files under the workspace's `migrations/sqlite/` are compiled into the
//! binary. `001_initial_schema.sql` creates `membership_plans`,
//! `user_memberships` and `product_rules`.
//!
//! Applied files are recorded in `_sqlx_migrations`; changing one after it
//! shipped makes every existing database refuse to start. Add a new file
//! instead.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies every migration not yet recorded in `pool`'s database.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    let (total, applied) = migration_status(pool).await?;
    if applied >= total {
        debug!(total, "Schema up to date");
        return Ok(());
    }

    MIGRATOR.run(pool).await?;
    info!(pending = total - applied, "Applied schema migrations");
    Ok(())
}

/// `(embedded, applied)` migration counts.
///
/// A database that was never migrated reports zero applied.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let recorded = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await;

    // The bookkeeping table only exists after the first run
    let applied = recorded.map_or(0, |n| usize::try_from(n).unwrap_or(0));

    Ok((MIGRATOR.migrations.len(), applied))
}
