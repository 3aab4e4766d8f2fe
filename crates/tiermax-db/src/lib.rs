//! # tiermax-db: Database Layer for Tier Max
//!
//! SQLite persistence for the plan catalog, user memberships and per-product
//! tier maximums, using sqlx for async access.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tier Max Data Flow                               │
//! │                                                                         │
//! │  Host quantity check (user, product, default max)                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    tiermax-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ PlanRepo      │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ MembershipRepo│    │ 001_init.sql │  │   │
//! │  │   │ Snapshots     │    │ RuleRepo      │    │              │  │   │
//! │  │   └───────┬───────┘    └───────────────┘    └──────────────┘  │   │
//! │  │           │ ResolutionSnapshot                                  │   │
//! │  └───────────┼─────────────────────────────────────────────────────┘   │
//! │              ▼                                                          │
//! │  tiermax-core MaxQuantityResolver (synchronous, in memory)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`config`] - TOML + environment configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database and config error types
//! - [`repository`] - Plan, membership and rule repositories
//! - [`snapshot`] - Request-scoped snapshots and form helpers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tiermax_db::{Database, TierMaxConfig};
//!
//! let config = TierMaxConfig::load(Some(Path::new("tiermax.toml")))?;
//! let db = Database::new(config.db_config()).await?;
//!
//! let snapshot = db.load_snapshot(&user, &product).await?;
//! let max = snapshot
//!     .resolver(config.tie_break())
//!     .resolve_max_quantity(default_max, &product, &user, &cart);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod snapshot;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{DatabaseSettings, ResolutionSettings, TierMaxConfig};
pub use error::{ConfigError, ConfigResult, DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use snapshot::ResolutionSnapshot;

// Repository re-exports for convenience
pub use repository::membership::MembershipRepository;
pub use repository::plan::PlanRepository;
pub use repository::rule::RuleRepository;
