//! # Membership Maximum Resolver
//!
//! Decides whether a membership tier's configured maximum replaces the
//! default maximum purchase quantity for a product.
//!
//! ## Resolution Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  resolve_max_quantity(default_max = 5, P1, user, cart)                  │
//! │                                                                         │
//! │  1. directory.active_memberships(user)                                 │
//! │       └── empty? ─────────────────────────► 5  (MissingMembership)     │
//! │  2. pick one membership (TieBreak)                                     │
//! │  3. membership.plan_id                                                 │
//! │       └── missing? ───────────────────────► 5  (MissingPlanIdentifier) │
//! │  4. plan slug → tier id ("vip-tier" → "vip_tier")                      │
//! │       └── unknown plan / empty slug? ─────► 5  (MissingPlanIdentifier) │
//! │  5. rule key                                                           │
//! │  6. rules.configured_maximum(P1, key) → hooks → |value|                │
//! │  7. non-zero? ────────────────────────────► value (absolute override)  │
//! │  8. otherwise ────────────────────────────► 5  (MissingOrZeroOverride) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here fails. Every fallback is defined behavior and only shows up
//! as a `trace` event.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, trace};
use ts_rs::TS;

use crate::error::CoreError;
use crate::hooks::{HookContext, OverrideHooks};
use crate::store::{MembershipDirectory, ProductRuleStore};
use crate::tier::{derive_tier_id, rule_key, RuleKey, TierId};
use crate::types::{CartContext, Membership, ProductId, UserId};
use crate::validation::normalize_quantity;

// =============================================================================
// Tie-Break Policy
// =============================================================================

/// How one membership is chosen when a user holds several.
///
/// Config files and `TIERMAX_TIE_BREAK` accept the same spellings
/// (see the [`FromStr`] impl).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum TieBreak {
    /// The last membership in the directory's ordering wins.
    #[default]
    LastListed,

    /// The membership whose plan has the highest `priority` wins.
    /// Equal priorities go to the one listed last; memberships whose plan
    /// can't be resolved rank below every resolvable one.
    HighestPriority,
}

impl fmt::Display for TieBreak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TieBreak::LastListed => write!(f, "last_listed"),
            TieBreak::HighestPriority => write!(f, "highest_priority"),
        }
    }
}

impl FromStr for TieBreak {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "last_listed" | "last" => Ok(TieBreak::LastListed),
            "highest_priority" | "priority" => Ok(TieBreak::HighestPriority),
            other => Err(CoreError::UnknownTieBreak(other.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for TieBreak {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

// =============================================================================
// Outcome
// =============================================================================

/// Why the default maximum was kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum FallbackReason {
    /// The user holds no active membership.
    MissingMembership,
    /// The chosen membership has no usable plan (missing id, unknown plan,
    /// or empty slug).
    MissingPlanIdentifier,
    /// No configured maximum for the tier, or it resolved to 0.
    MissingOrZeroOverride,
}

/// How a resolution ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// A tier maximum replaced the default.
    Override {
        tier_id: TierId,
        rule_key: RuleKey,
        /// Stored value before hooks ran.
        configured: Option<i64>,
    },
    /// The default maximum was kept.
    Fallback { reason: FallbackReason },
}

/// Result of [`MaxQuantityResolver::resolve`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Maximum quantity to enforce.
    pub quantity: i64,

    /// Where it came from.
    pub outcome: Outcome,
}

impl Resolution {
    fn fallback(default_max: i64, reason: FallbackReason) -> Self {
        Resolution {
            quantity: default_max,
            outcome: Outcome::Fallback { reason },
        }
    }

    /// Returns true if a tier maximum was applied.
    pub fn is_override(&self) -> bool {
        matches!(self.outcome, Outcome::Override { .. })
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// The membership maximum resolver.
///
/// Built per request from borrowed collaborators; holds no state of its own.
///
/// ## Example
/// ```rust
/// use tiermax_core::memory::{InMemoryDirectory, InMemoryRuleStore};
/// use tiermax_core::resolver::MaxQuantityResolver;
/// use tiermax_core::tier::{derive_tier_id, rule_key};
/// use tiermax_core::{CartContext, Membership, MembershipPlan, PlanId, ProductId, UserId};
///
/// let directory = InMemoryDirectory::new()
///     .with_plan(MembershipPlan::new("7", "vip-tier", "VIP"))
///     .with_membership(Membership::active("m1", "alice", Some(PlanId::new("7"))));
/// let rules = InMemoryRuleStore::new()
///     .with_rule("P1", rule_key(&derive_tier_id("vip-tier").unwrap()), 2);
///
/// let resolver = MaxQuantityResolver::new(&directory, &rules);
/// let cart = CartContext::for_line("line-1", "P1", 1);
/// let max = resolver.resolve_max_quantity(5, &ProductId::new("P1"), &UserId::new("alice"), &cart);
/// assert_eq!(max, 2);
/// ```
pub struct MaxQuantityResolver<'a> {
    directory: &'a dyn MembershipDirectory,
    rules: &'a dyn ProductRuleStore,
    hooks: Option<&'a OverrideHooks>,
    tie_break: TieBreak,
}

impl<'a> MaxQuantityResolver<'a> {
    /// Creates a resolver with no hooks and the default tie-break.
    pub fn new(directory: &'a dyn MembershipDirectory, rules: &'a dyn ProductRuleStore) -> Self {
        MaxQuantityResolver {
            directory,
            rules,
            hooks: None,
            tie_break: TieBreak::default(),
        }
    }

    /// Sets the override hook chain.
    pub fn with_hooks(mut self, hooks: &'a OverrideHooks) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// Sets the tie-break policy.
    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    /// Returns the maximum quantity to enforce.
    ///
    /// The host quantity pipeline calls this after computing `default_max`.
    pub fn resolve_max_quantity(
        &self,
        default_max: i64,
        product_id: &ProductId,
        user: &UserId,
        cart: &CartContext,
    ) -> i64 {
        self.resolve(default_max, product_id, user, cart).quantity
    }

    /// Like [`resolve_max_quantity`](Self::resolve_max_quantity), also
    /// reporting how the value was reached.
    pub fn resolve(
        &self,
        default_max: i64,
        product_id: &ProductId,
        user: &UserId,
        cart: &CartContext,
    ) -> Resolution {
        let memberships = self.directory.active_memberships(user);

        let Some(membership) = self.select(&memberships) else {
            trace!(user_id = %user, "No active membership, keeping default maximum");
            return Resolution::fallback(default_max, FallbackReason::MissingMembership);
        };

        let Some(tier_id) = self.tier_of(membership) else {
            trace!(
                user_id = %user,
                membership_id = %membership.id,
                "Membership has no usable plan, keeping default maximum"
            );
            return Resolution::fallback(default_max, FallbackReason::MissingPlanIdentifier);
        };

        let key = rule_key(&tier_id);
        let configured = self.rules.configured_maximum(product_id, &key);

        let hooked = match self.hooks {
            Some(hooks) => {
                let ctx = HookContext {
                    product_id,
                    cart_item_key: &cart.cart_item_key,
                    cart_line: &cart.line,
                    tier_id: &tier_id,
                };
                hooks.apply(configured, &ctx)
            }
            None => configured,
        };

        let maximum = normalize_quantity(hooked.unwrap_or(0));

        if maximum == 0 {
            trace!(
                product_id = %product_id,
                rule_key = %key,
                "No tier maximum configured, keeping default maximum"
            );
            return Resolution::fallback(default_max, FallbackReason::MissingOrZeroOverride);
        }

        debug!(
            product_id = %product_id,
            user_id = %user,
            tier_id = %tier_id,
            default_max,
            maximum,
            "Applying membership maximum"
        );

        Resolution {
            quantity: maximum,
            outcome: Outcome::Override {
                tier_id,
                rule_key: key,
                configured,
            },
        }
    }

    /// Picks one membership according to the tie-break policy.
    fn select<'m>(&self, memberships: &'m [Membership]) -> Option<&'m Membership> {
        match self.tie_break {
            TieBreak::LastListed => memberships.last(),
            TieBreak::HighestPriority => {
                let mut best: Option<(&Membership, i64)> = None;
                for membership in memberships {
                    let rank = self.rank_of(membership);
                    // `>=` hands ties to the later entry
                    if best.map_or(true, |(_, top)| rank >= top) {
                        best = Some((membership, rank));
                    }
                }
                best.map(|(membership, _)| membership)
            }
        }
    }

    /// Plan priority of a membership; unresolvable plans rank lowest.
    fn rank_of(&self, membership: &Membership) -> i64 {
        membership
            .plan_id
            .as_ref()
            .and_then(|id| self.directory.plan(id))
            .filter(|plan| derive_tier_id(&plan.slug).is_some())
            .map_or(i64::MIN, |plan| i64::from(plan.priority))
    }

    /// Tier of a membership's plan, if it has one.
    fn tier_of(&self, membership: &Membership) -> Option<TierId> {
        let plan_id = membership.plan_id.as_ref()?;
        let plan = self.directory.plan(plan_id)?;
        derive_tier_id(&plan.slug)
    }
}

impl fmt::Debug for MaxQuantityResolver<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaxQuantityResolver")
            .field("hooks", &self.hooks)
            .field("tie_break", &self.tie_break)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
