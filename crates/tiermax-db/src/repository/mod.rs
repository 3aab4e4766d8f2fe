//! # Repository Module
//!
//! Database repository implementations for Tier Max.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Host request (quantity check / product save)                          │
//! │       │                                                                 │
//! │       │  db.load_snapshot(user, product)                               │
//! │       ▼                                                                 │
//! │  PlanRepository        list(), get(), upsert()                         │
//! │  MembershipRepository  active_for_user(), insert()                     │
//! │  RuleRepository        for_product(), apply_updates(), prune_orphans() │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`PlanRepository`](plan::PlanRepository) - Plan catalog mirror
//! - [`MembershipRepository`](membership::MembershipRepository) - User memberships
//! - [`RuleRepository`](rule::RuleRepository) - Per-product tier maximums

pub mod membership;
pub mod plan;
pub mod rule;
