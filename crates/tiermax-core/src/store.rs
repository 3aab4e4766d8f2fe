//! # Collaborator Interfaces
//!
//! The resolver and editor reach their data only through these traits.
//!
//! ```text
//! ┌──────────────────────┐        ┌──────────────────────────┐
//! │ MembershipDirectory  │        │ ProductRuleStore         │
//! │  active_memberships  │        │  configured_maximum      │
//! │  plans / plan        │        ├──────────────────────────┤
//! └──────────┬───────────┘        │ ProductRuleWriter        │
//!            │                    │  store_configured_max    │
//!            │                    └────────────┬─────────────┘
//!            ▼                                 ▼
//!   InMemoryDirectory (memory.rs)     InMemoryRuleStore (memory.rs)
//!   ResolutionSnapshot (tiermax-db)   ResolutionSnapshot (tiermax-db)
//! ```
//!
//! All reads are infallible: a backend that can't answer returns "nothing",
//! and the resolver falls back to the default maximum.

use crate::tier::RuleKey;
use crate::types::{Membership, MembershipPlan, PlanId, ProductId, UserId};

/// Source of users' memberships and of the plan catalog.
pub trait MembershipDirectory {
    /// Active memberships of `user`, in the directory's own order.
    ///
    /// Empty when the user holds none.
    fn active_memberships(&self, user: &UserId) -> Vec<Membership>;

    /// Every plan in the catalog, in no particular order.
    fn plans(&self) -> Vec<MembershipPlan>;

    /// Looks up one plan.
    fn plan(&self, id: &PlanId) -> Option<MembershipPlan> {
        self.plans().into_iter().find(|plan| &plan.id == id)
    }
}

/// Read side of per-(product, tier) maximums.
pub trait ProductRuleStore {
    /// Configured maximum for `key` on `product`, if one was ever saved.
    ///
    /// Stored values are already non-negative; `Some(0)` means "no override".
    fn configured_maximum(&self, product: &ProductId, key: &RuleKey) -> Option<i64>;
}

/// Write side used by the rule editor.
pub trait ProductRuleWriter {
    /// Stores `value` under `key` on `product`, replacing any previous value.
    fn store_configured_maximum(&mut self, product: &ProductId, key: &RuleKey, value: i64);
}
