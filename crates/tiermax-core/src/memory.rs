//! # In-Memory Stores
//!
//! Plain-collection implementations of the collaborator traits.
//!
//! Used by tests and as the request-scoped snapshot the persistence layer
//! loads before running the synchronous resolver.

use std::collections::{BTreeMap, HashMap};

use crate::store::{MembershipDirectory, ProductRuleStore, ProductRuleWriter};
use crate::tier::{RuleKey, RULE_KEY_PREFIX};
use crate::types::{Membership, MembershipPlan, PlanId, ProductId, UserId};

// =============================================================================
// Directory
// =============================================================================

/// Membership directory backed by a plan map and per-user membership lists.
///
/// Memberships keep their insertion order, which is the order
/// [`MembershipDirectory::active_memberships`] returns.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    plans: BTreeMap<PlanId, MembershipPlan>,
    memberships: HashMap<UserId, Vec<Membership>>,
}

impl InMemoryDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a plan in the catalog.
    pub fn insert_plan(&mut self, plan: MembershipPlan) -> &mut Self {
        self.plans.insert(plan.id.clone(), plan);
        self
    }

    /// Appends a membership to its user's list.
    pub fn insert_membership(&mut self, membership: Membership) -> &mut Self {
        self.memberships
            .entry(membership.user_id.clone())
            .or_default()
            .push(membership);
        self
    }

    /// Builder-style [`insert_plan`](Self::insert_plan).
    pub fn with_plan(mut self, plan: MembershipPlan) -> Self {
        self.insert_plan(plan);
        self
    }

    /// Builder-style [`insert_membership`](Self::insert_membership).
    pub fn with_membership(mut self, membership: Membership) -> Self {
        self.insert_membership(membership);
        self
    }
}

impl MembershipDirectory for InMemoryDirectory {
    fn active_memberships(&self, user: &UserId) -> Vec<Membership> {
        self.memberships
            .get(user)
            .map(|list| {
                list.iter()
                    .filter(|m| m.status.is_active())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn plans(&self) -> Vec<MembershipPlan> {
        self.plans.values().cloned().collect()
    }

    fn plan(&self, id: &PlanId) -> Option<MembershipPlan> {
        self.plans.get(id).cloned()
    }
}

// =============================================================================
// Rule Store
// =============================================================================

/// Product rule store backed by a map keyed on (product, rule key).
#[derive(Debug, Clone, Default)]
pub struct InMemoryRuleStore {
    rules: HashMap<(ProductId, RuleKey), i64>,
}

impl InMemoryRuleStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with_rule(mut self, product: impl Into<ProductId>, key: RuleKey, value: i64) -> Self {
        self.rules.insert((product.into(), key), value);
        self
    }

    /// Number of stored rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if no rules are stored.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Deletes rules whose key carries the rule prefix but is not in `known`.
    ///
    /// Returns how many were removed.
    pub fn prune_orphans(&mut self, known: &[RuleKey]) -> usize {
        let before = self.rules.len();
        self.rules.retain(|(_, key), _| {
            !key.as_str().starts_with(RULE_KEY_PREFIX) || known.contains(key)
        });
        before - self.rules.len()
    }
}

impl ProductRuleStore for InMemoryRuleStore {
    fn configured_maximum(&self, product: &ProductId, key: &RuleKey) -> Option<i64> {
        self.rules.get(&(product.clone(), key.clone())).copied()
    }
}

impl ProductRuleWriter for InMemoryRuleStore {
    fn store_configured_maximum(&mut self, product: &ProductId, key: &RuleKey, value: i64) {
        self.rules.insert((product.clone(), key.clone()), value);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tier::{derive_tier_id, rule_key};
    use crate::types::MembershipStatus;

    fn key(slug: &str) -> RuleKey {
        rule_key(&derive_tier_id(slug).unwrap())
    }

    #[test]
    fn test_directory_keeps_insertion_order() {
        let dir = InMemoryDirectory::new()
            .with_membership(Membership::active("m1", "u1", Some(PlanId::new("a"))))
            .with_membership(Membership::active("m2", "u1", Some(PlanId::new("b"))));

        let ids: Vec<_> = dir
            .active_memberships(&UserId::new("u1"))
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec!["m1", "m2"]);
        assert!(dir.active_memberships(&UserId::new("u2")).is_empty());
    }

    #[test]
    fn test_directory_skips_inactive() {
        let mut expired = Membership::active("m1", "u1", Some(PlanId::new("a")));
        expired.status = MembershipStatus::Expired;
        let dir = InMemoryDirectory::new().with_membership(expired);

        assert!(dir.active_memberships(&UserId::new("u1")).is_empty());
    }

    #[test]
    fn test_rule_store_roundtrip() {
        let mut store = InMemoryRuleStore::new();
        let product = ProductId::new("P1");
        store.store_configured_maximum(&product, &key("gold"), 3);
        store.store_configured_maximum(&product, &key("gold"), 4);

        assert_eq!(store.configured_maximum(&product, &key("gold")), Some(4));
        assert_eq!(store.configured_maximum(&product, &key("silver")), None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_prune_orphans() {
        let mut store = InMemoryRuleStore::new()
            .with_rule("P1", key("gold"), 2)
            .with_rule("P2", key("gold"), 5)
            .with_rule("P1", key("retired-plan"), 9);

        let removed = store.prune_orphans(&[key("gold")]);
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 2);
        assert_eq!(
            store.configured_maximum(&ProductId::new("P1"), &key("retired-plan")),
            None
        );
    }

    #[test]
    fn test_prune_only_sees_rule_keys() {
        // Foreign product meta can't enter the store as a rule key
        assert!(serde_json::from_str::<RuleKey>("\"_price\"").is_err());

        let retired: RuleKey =
            serde_json::from_str("\"maximum_allowed_quantity_membership_retired\"").unwrap();
        let mut store = InMemoryRuleStore::new()
            .with_rule("P1", key("gold"), 3)
            .with_rule("P1", retired.clone(), 9)
            .with_rule("P2", retired, 1);

        assert_eq!(store.prune_orphans(&[key("gold")]), 2);
        assert_eq!(store.configured_maximum(&ProductId::new("P1"), &key("gold")), Some(3));
        assert_eq!(store.prune_orphans(&[]), 1);
        assert!(store.is_empty());
    }
}
