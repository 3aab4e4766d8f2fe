//! # Resolution Snapshots
//!
//! The resolver is synchronous and borrows its collaborators, while the
//! database is async. Each quantity check therefore loads the rows it can
//! touch into memory first, then resolves against that snapshot.
//!
//! ```text
//! ┌──────────────┐   load_snapshot(user, product)   ┌─────────────────────┐
//! │   Database   │ ───────────────────────────────► │ ResolutionSnapshot  │
//! │  (SqlitePool)│   plans + active memberships     │  InMemoryDirectory  │
//! └──────────────┘   + the product's rules          │  InMemoryRuleStore  │
//!                                                   └──────────┬──────────┘
//!                                                              │ resolver()
//!                                                              ▼
//!                                                   MaxQuantityResolver
//! ```

use std::collections::HashMap;

use tiermax_core::memory::{InMemoryDirectory, InMemoryRuleStore};
use tiermax_core::{
    MaxQuantityResolver, Membership, MembershipDirectory, MembershipPlan, PlanId, ProductId,
    ProductRuleStore, ProductRuleWriter, RuleEditor, RuleKey, SaveReport, TieBreak, UserId,
};
use tracing::{debug, info, warn};

use crate::error::DbResult;
use crate::pool::Database;

// =============================================================================
// Snapshot
// =============================================================================

/// Everything one quantity check needs, held in memory.
#[derive(Debug, Clone, Default)]
pub struct ResolutionSnapshot {
    directory: InMemoryDirectory,
    rules: InMemoryRuleStore,
}

impl ResolutionSnapshot {
    /// Wraps already-loaded collaborators.
    pub fn new(directory: InMemoryDirectory, rules: InMemoryRuleStore) -> Self {
        ResolutionSnapshot { directory, rules }
    }

    /// Builds a resolver borrowing this snapshot.
    pub fn resolver(&self, tie_break: TieBreak) -> MaxQuantityResolver<'_> {
        MaxQuantityResolver::new(&self.directory, &self.rules).with_tie_break(tie_break)
    }

    /// The loaded plan catalog and memberships.
    pub fn directory(&self) -> &InMemoryDirectory {
        &self.directory
    }

    /// The loaded product rules.
    pub fn rules(&self) -> &InMemoryRuleStore {
        &self.rules
    }
}

impl MembershipDirectory for ResolutionSnapshot {
    fn active_memberships(&self, user: &UserId) -> Vec<Membership> {
        self.directory.active_memberships(user)
    }

    fn plans(&self) -> Vec<MembershipPlan> {
        self.directory.plans()
    }

    fn plan(&self, id: &PlanId) -> Option<MembershipPlan> {
        self.directory.plan(id)
    }
}

impl ProductRuleStore for ResolutionSnapshot {
    fn configured_maximum(&self, product: &ProductId, key: &RuleKey) -> Option<i64> {
        self.rules.configured_maximum(product, key)
    }
}

// =============================================================================
// Database Helpers
// =============================================================================

impl Database {
    /// Loads the snapshot for one (user, product) quantity check.
    pub async fn load_snapshot(
        &self,
        user: &UserId,
        product: &ProductId,
    ) -> DbResult<ResolutionSnapshot> {
        let mut directory = self.plan_catalog().await?;
        for membership in self.memberships().active_for_user(user).await? {
            directory.insert_membership(membership);
        }

        let mut rules = InMemoryRuleStore::new();
        for (key, value) in self.rules().for_product(product).await? {
            rules.store_configured_maximum(product, &key, value);
        }

        debug!(
            user_id = %user,
            product_id = %product,
            rules = rules.len(),
            "Loaded resolution snapshot"
        );

        Ok(ResolutionSnapshot::new(directory, rules))
    }

    /// Loads the plan catalog without any memberships.
    pub async fn plan_catalog(&self) -> DbResult<InMemoryDirectory> {
        let mut directory = InMemoryDirectory::new();
        for plan in self.plans().list().await? {
            directory.insert_plan(plan);
        }
        Ok(directory)
    }

    /// Builds the product form editor from the stored plan catalog.
    ///
    /// Slug collisions are logged; the shared key is still written once.
    pub async fn rule_editor(&self) -> DbResult<RuleEditor> {
        let editor = RuleEditor::new(&self.plan_catalog().await?);

        for collision in editor.collisions() {
            warn!(
                tier_id = %collision.tier_id,
                plans = ?collision.plan_ids,
                "Several plans share one tier maximum"
            );
        }

        Ok(editor)
    }

    /// Saves a product form submission.
    pub async fn save_rule_form(
        &self,
        product: &ProductId,
        submitted: &HashMap<String, String>,
    ) -> DbResult<SaveReport> {
        let editor = self.rule_editor().await?;
        let updates = editor.plan_save(submitted);

        self.rules().apply_updates(product, &updates).await?;

        Ok(SaveReport {
            written: updates.into_iter().map(|u| u.key).collect(),
        })
    }

    /// Deletes rules for tiers no longer in the plan catalog.
    pub async fn prune_orphaned_rules(&self) -> DbResult<u64> {
        let known = self.rule_editor().await?.known_rule_keys();
        let deleted = self.rules().prune_orphans(&known).await?;

        if deleted > 0 {
            info!(deleted, "Removed rules of retired tiers");
        }

        Ok(deleted)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DbConfig;
    use tiermax_core::{derive_tier_id, rule_key, CartContext};

    fn key(slug: &str) -> RuleKey {
        rule_key(&derive_tier_id(slug).unwrap())
    }

    async fn seeded() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.plans()
            .upsert(&MembershipPlan::new("7", "vip-tier", "VIP"))
            .await
            .unwrap();
        db.plans()
            .upsert(&MembershipPlan::new("8", "basic", "Basic"))
            .await
            .unwrap();
        db.memberships()
            .insert(&Membership::active("m1", "alice", Some(PlanId::new("7"))))
            .await
            .unwrap();
        db
    }

    #[tokio::test]
    async fn test_snapshot_holds_only_requested_product() {
        let db = seeded().await;
        let p1 = ProductId::new("P1");
        db.rules()
            .apply_updates(&p1, &[tiermax_core::RuleUpdate { key: key("vip-tier"), value: 2 }])
            .await
            .unwrap();
        db.rules()
            .apply_updates(
                &ProductId::new("P2"),
                &[tiermax_core::RuleUpdate { key: key("vip-tier"), value: 9 }],
            )
            .await
            .unwrap();

        let snapshot = db.load_snapshot(&UserId::new("alice"), &p1).await.unwrap();
        assert_eq!(snapshot.rules().len(), 1);
        assert_eq!(snapshot.plans().len(), 2);
        assert_eq!(snapshot.active_memberships(&UserId::new("alice")).len(), 1);
        assert_eq!(snapshot.configured_maximum(&p1, &key("vip-tier")), Some(2));
    }

    #[tokio::test]
    async fn test_snapshot_resolver() {
        let db = seeded().await;
        let p1 = ProductId::new("P1");
        db.rules()
            .apply_updates(&p1, &[tiermax_core::RuleUpdate { key: key("vip-tier"), value: 2 }])
            .await
            .unwrap();

        let alice = UserId::new("alice");
        let snapshot = db.load_snapshot(&alice, &p1).await.unwrap();
        let cart = CartContext::for_line("line-1", "P1", 1);

        let max = snapshot
            .resolver(TieBreak::LastListed)
            .resolve_max_quantity(5, &p1, &alice, &cart);
        assert_eq!(max, 2);
    }

    #[tokio::test]
    async fn test_save_rule_form_writes_listed_tiers_only() {
        let db = seeded().await;
        let p1 = ProductId::new("P1");
        let submitted: HashMap<String, String> = [
            (key("vip-tier").as_str().to_string(), "3".to_string()),
            (key("ghost").as_str().to_string(), "4".to_string()),
        ]
        .into();

        let report = db.save_rule_form(&p1, &submitted).await.unwrap();
        assert_eq!(report.written, vec![key("vip-tier")]);
        assert_eq!(db.rules().get(&p1, &key("vip-tier")).await.unwrap(), Some(3));
        assert_eq!(db.rules().get(&p1, &key("ghost")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_prune_orphaned_rules() {
        let db = seeded().await;
        let p1 = ProductId::new("P1");
        db.rules()
            .apply_updates(
                &p1,
                &[
                    tiermax_core::RuleUpdate { key: key("vip-tier"), value: 2 },
                    tiermax_core::RuleUpdate { key: key("retired"), value: 1 },
                ],
            )
            .await
            .unwrap();

        assert_eq!(db.prune_orphaned_rules().await.unwrap(), 1);
        assert_eq!(db.rules().for_product(&p1).await.unwrap(), vec![(key("vip-tier"), 2)]);
    }
}
