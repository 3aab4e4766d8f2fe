//! # Database Handle
//!
//! One pooled SQLite handle per host process. Quantity checks never hold a
//! connection while resolving: they borrow one to load a snapshot, release
//! it, then resolve in memory.
//!
//! ```text
//!  host request ──► Database::load_snapshot ──► pooled connection (short)
//!                          │
//!                          ▼
//!                  ResolutionSnapshot ──► resolver (no connection held)
//!
//!  product save ──► Database::save_rule_form ──► one write transaction
//! ```
//!
//! File databases run in WAL mode so snapshot reads don't queue behind a
//! product save. Foreign keys are switched on per connection; the schema
//! relies on them to null out memberships of deleted plans.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::membership::MembershipRepository;
use crate::repository::plan::PlanRepository;
use crate::repository::rule::RuleRepository;

/// Path that selects a private in-memory database.
pub const IN_MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Pool Settings
// =============================================================================

/// Pool settings, usually built from [`crate::TierMaxConfig::db_config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    /// SQLite file, or [`IN_MEMORY_PATH`].
    pub database_path: PathBuf,

    /// Upper bound on pooled connections.
    pub max_connections: u32,

    /// Connections kept open while idle.
    pub min_connections: u32,

    /// How long a snapshot load waits for a free connection.
    pub connect_timeout: Duration,

    /// How long an unused connection may stay open.
    pub idle_timeout: Duration,

    /// Apply pending migrations in [`Database::new`].
    pub run_migrations: bool,
}

impl DbConfig {
    /// Settings for a database file, created on first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            run_migrations: true,
        }
    }

    /// Settings for a throwaway in-memory database.
    ///
    /// The data disappears with the last open connection, so the pool is
    /// pinned to a single one that is never reaped.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            ..DbConfig::new(IN_MEMORY_PATH)
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    fn is_in_memory(&self) -> bool {
        self.database_path == Path::new(IN_MEMORY_PATH)
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        if self.is_in_memory() {
            let options = SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;
            return Ok(options.foreign_keys(true));
        }

        Ok(SqliteConnectOptions::new()
            .filename(&self.database_path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal))
    }
}

// =============================================================================
// Database
// =============================================================================

/// Shared handle to the plan, membership and rule tables.
///
/// Clones share one pool. Snapshot loading and form saving live in
/// [`crate::snapshot`].
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool and, unless disabled, brings the schema up to date.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(config.connect_options()?)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        if config.run_migrations {
            migrations::run_migrations(&pool).await?;
        }

        info!(
            path = %config.database_path.display(),
            max_connections = config.max_connections,
            "Tier max database ready"
        );

        Ok(Database { pool })
    }

    /// Raw pool, for queries the repositories don't cover.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn plans(&self) -> PlanRepository {
        PlanRepository::new(self.pool.clone())
    }

    pub fn memberships(&self) -> MembershipRepository {
        MembershipRepository::new(self.pool.clone())
    }

    pub fn rules(&self) -> RuleRepository {
        RuleRepository::new(self.pool.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_settings() {
        let config = DbConfig::in_memory();
        assert_eq!(config.max_connections, 1);
        assert!(config.is_in_memory());
        assert!(config.run_migrations);
        assert!(!DbConfig::new("/tmp/rules.db").is_in_memory());
    }

    #[test]
    fn test_builder_overrides() {
        let config = DbConfig::new("/tmp/rules.db")
            .max_connections(10)
            .min_connections(2)
            .idle_timeout(Duration::from_secs(5))
            .run_migrations(false);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.idle_timeout, Duration::from_secs(5));
        assert!(!config.run_migrations);
    }

    #[tokio::test]
    async fn test_new_applies_migrations() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let (total, applied) = migrations::migration_status(db.pool()).await.unwrap();

        assert_eq!(total, applied);
        assert_eq!(db.rules().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_new_without_migrations_leaves_schema_empty() {
        let db = Database::new(DbConfig::in_memory().run_migrations(false))
            .await
            .unwrap();

        assert!(db.rules().count().await.is_err());
    }
}
