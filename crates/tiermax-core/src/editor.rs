//! # Rule Editor
//!
//! Form binding for the per-tier maximum fields on the product edit screen.
//!
//! ## Save Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Admin saves product P1                                                 │
//! │                                                                         │
//! │  submitted form data                                                   │
//! │  { "maximum_allowed_quantity_membership_gold": "3",                    │
//! │    "maximum_allowed_quantity_membership_silver": "abc",                │
//! │    "_title": "Widget" }                                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  plan_save()  ← only keys of listed tiers, coerced                     │
//! │       │         [gold = 3, silver = 0]                                  │
//! │       ▼                                                                 │
//! │  ProductRuleWriter (in memory)  /  RuleRepository (tiermax-db)          │
//! │                                                                         │
//! │  Tiers missing from the submission are left untouched.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rendering the form is the host's job; this module only describes the
//! fields and binds submissions back to rule keys.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;
use ts_rs::TS;

use crate::store::{MembershipDirectory, ProductRuleStore, ProductRuleWriter};
use crate::tier::{derive_tier_id, rule_key, RuleKey, TierId};
use crate::types::{PlanId, ProductId};
use crate::validation::coerce_quantity;

/// Help text shown next to every tier field.
pub const FIELD_DESCRIPTION: &str = "Enter a quantity to prevent a member from buying this \
product if they have more than the allowed quantity in their cart. Leave empty or enter 0 \
to use the default maximum.";

// =============================================================================
// Field Descriptors
// =============================================================================

/// One numeric input on the product edit form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TierField {
    /// Input id and form key.
    pub id: RuleKey,

    /// Tier the field configures.
    pub tier_id: TierId,

    /// Plan the tier was derived from.
    pub plan_id: PlanId,

    /// Plan display name.
    pub display_name: String,

    /// `"<plan name> max quantity"`.
    pub label: String,

    /// Help text.
    pub description: String,
}

/// A field together with the value currently stored for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TierFieldValue {
    /// The field.
    pub field: TierField,

    /// Stored maximum, if any.
    pub value: Option<i64>,
}

/// One rule write produced by a form submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleUpdate {
    /// Key to write.
    pub key: RuleKey,

    /// Coerced value (0 clears the override).
    pub value: i64,
}

/// Summary of a save.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveReport {
    /// Rule keys written, in field order.
    pub written: Vec<RuleKey>,
}

/// Two or more plans whose slugs normalize to the same tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCollision {
    /// Shared tier identifier.
    pub tier_id: TierId,

    /// Plans that map onto it, in field order.
    pub plan_ids: Vec<PlanId>,
}

// =============================================================================
// Editor
// =============================================================================

/// Binds the plan catalog to product form fields.
#[derive(Debug, Clone)]
pub struct RuleEditor {
    fields: Vec<TierField>,
}

impl RuleEditor {
    /// Builds the editor from the directory's plan catalog.
    ///
    /// Plans without a derivable tier identifier get no field.
    pub fn new(directory: &dyn MembershipDirectory) -> Self {
        let mut plans = directory.plans();
        plans.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name))
        });

        let fields = plans
            .into_iter()
            .filter_map(|plan| {
                let tier_id = derive_tier_id(&plan.slug)?;
                Some(TierField {
                    id: rule_key(&tier_id),
                    tier_id,
                    label: format!("{} max quantity", plan.name),
                    description: FIELD_DESCRIPTION.to_string(),
                    display_name: plan.name,
                    plan_id: plan.id,
                })
            })
            .collect();

        RuleEditor { fields }
    }

    /// The form's fields, sorted by plan display name.
    pub fn list_tiers(&self) -> &[TierField] {
        &self.fields
    }

    /// Every rule key the editor knows about (deduplicated, sorted).
    pub fn known_rule_keys(&self) -> Vec<RuleKey> {
        let mut keys: Vec<RuleKey> = self.fields.iter().map(|f| f.id.clone()).collect();
        keys.sort();
        keys.dedup();
        keys
    }

    /// Fields with the values currently stored for `product`.
    pub fn fields_for_product(
        &self,
        product: &ProductId,
        store: &dyn ProductRuleStore,
    ) -> Vec<TierFieldValue> {
        self.fields
            .iter()
            .map(|field| TierFieldValue {
                value: store.configured_maximum(product, &field.id),
                field: field.clone(),
            })
            .collect()
    }

    /// Turns a form submission into rule writes.
    ///
    /// Only keys of listed tiers are considered; each key is written once even
    /// if colliding plans share it.
    pub fn plan_save(&self, submitted: &HashMap<String, String>) -> Vec<RuleUpdate> {
        let mut updates: Vec<RuleUpdate> = Vec::new();

        for field in &self.fields {
            if updates.iter().any(|u| u.key == field.id) {
                continue;
            }
            if let Some(raw) = submitted.get(field.id.as_str()) {
                updates.push(RuleUpdate {
                    key: field.id.clone(),
                    value: coerce_quantity(raw),
                });
            }
        }

        updates
    }

    /// Persists a form submission for `product`.
    pub fn save(
        &self,
        product: &ProductId,
        submitted: &HashMap<String, String>,
        writer: &mut dyn ProductRuleWriter,
    ) -> SaveReport {
        let updates = self.plan_save(submitted);

        for update in &updates {
            writer.store_configured_maximum(product, &update.key, update.value);
        }

        debug!(product_id = %product, written = updates.len(), "Saved tier maximums");

        SaveReport {
            written: updates.into_iter().map(|u| u.key).collect(),
        }
    }

    /// Tier identifiers shared by more than one plan.
    pub fn collisions(&self) -> Vec<TierCollision> {
        let mut by_tier: BTreeMap<&TierId, Vec<PlanId>> = BTreeMap::new();
        for field in &self.fields {
            by_tier
                .entry(&field.tier_id)
                .or_default()
                .push(field.plan_id.clone());
        }

        by_tier
            .into_iter()
            .filter(|(_, plans)| plans.len() > 1)
            .map(|(tier_id, plan_ids)| TierCollision {
                tier_id: tier_id.clone(),
                plan_ids,
            })
            .collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryDirectory, InMemoryRuleStore};
    use crate::types::MembershipPlan;

    fn catalog() -> InMemoryDirectory {
        InMemoryDirectory::new()
            .with_plan(MembershipPlan::new("1", "silver", "Silver"))
            .with_plan(MembershipPlan::new("2", "gold-plus", "gold Plus"))
            .with_plan(MembershipPlan::new("3", "", "Broken"))
            .with_plan(MembershipPlan::new("4", "bronze", "Bronze"))
    }

    fn form(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_list_tiers_sorted_by_name_skipping_broken() {
        let editor = RuleEditor::new(&catalog());
        let names: Vec<_> = editor
            .list_tiers()
            .iter()
            .map(|f| f.display_name.as_str())
            .collect();
        assert_eq!(names, vec!["Bronze", "gold Plus", "Silver"]);

        let gold = &editor.list_tiers()[1];
        assert_eq!(gold.id.as_str(), "maximum_allowed_quantity_membership_gold_plus");
        assert_eq!(gold.label, "gold Plus max quantity");
    }

    #[test]
    fn test_save_writes_only_submitted_tiers() {
        let editor = RuleEditor::new(&catalog());
        let product = ProductId::new("P1");
        let mut store = InMemoryRuleStore::new();

        let report = editor.save(
            &product,
            &form(&[
                ("maximum_allowed_quantity_membership_silver", " 3 "),
                ("maximum_allowed_quantity_membership_bronze", "abc"),
                ("maximum_allowed_quantity_membership_", "9"),
                ("_title", "Widget"),
            ]),
            &mut store,
        );

        assert_eq!(report.written.len(), 2);
        assert_eq!(store.len(), 2);

        let values: Vec<_> = editor
            .fields_for_product(&product, &store)
            .into_iter()
            .map(|fv| fv.value)
            .collect();
        assert_eq!(values, vec![Some(0), None, Some(3)]);
    }

    #[test]
    fn test_save_leaves_unsubmitted_untouched() {
        let editor = RuleEditor::new(&catalog());
        let product = ProductId::new("P1");
        let silver = rule_key(&derive_tier_id("silver").unwrap());
        let mut store = InMemoryRuleStore::new().with_rule("P1", silver.clone(), 6);

        editor.save(&product, &form(&[]), &mut store);
        assert_eq!(store.configured_maximum(&product, &silver), Some(6));
    }

    #[test]
    fn test_collisions_reported_and_written_once() {
        let dir = InMemoryDirectory::new()
            .with_plan(MembershipPlan::new("1", "gold-plus", "Gold Plus"))
            .with_plan(MembershipPlan::new("2", "gold_plus", "Gold Plus (legacy)"));
        let editor = RuleEditor::new(&dir);

        let collisions = editor.collisions();
        assert_eq!(collisions.len(), 1);
        assert_eq!(collisions[0].tier_id.as_str(), "gold_plus");
        assert_eq!(collisions[0].plan_ids.len(), 2);

        let updates =
            editor.plan_save(&form(&[("maximum_allowed_quantity_membership_gold_plus", "2")]));
        assert_eq!(updates.len(), 1);
        assert_eq!(editor.known_rule_keys().len(), 1);
    }
}
