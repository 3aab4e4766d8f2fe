//! # Domain Types
//!
//! Core domain types used throughout Tier Max.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ MembershipPlan  │   │   Membership    │   │    CartLine     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (PlanId)    │◄──│  plan_id?       │   │  product_id     │       │
//! │  │  slug           │   │  user_id        │   │  variation_id?  │       │
//! │  │  name           │   │  status         │   │  quantity       │       │
//! │  │  priority       │   │  started_at?    │   └─────────────────┘       │
//! │  └─────────────────┘   └─────────────────┘                              │
//! │                                                                         │
//! │  Identifiers: ProductId, UserId, PlanId (opaque strings)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Plans and memberships are owned by the external membership directory.
//! This crate only reads them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

// =============================================================================
// Identifiers
// =============================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
        #[serde(transparent)]
        #[ts(export)]
        pub struct $name(String);

        impl $name {
            /// Wraps a raw identifier.
            pub fn new(id: impl Into<String>) -> Self {
                $name(id.into())
            }

            /// Returns the raw identifier.
            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                $name(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                $name(id)
            }
        }
    };
}

string_id!(
    /// Identifier of a product record (the scope rules are attached to).
    ProductId
);

string_id!(
    /// Identifier of a shopper as known to the membership directory.
    UserId
);

string_id!(
    /// Identifier of a membership plan record.
    PlanId
);

// =============================================================================
// Membership Plan
// =============================================================================

/// A membership plan (tier) a user can hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MembershipPlan {
    /// Plan record identifier.
    pub id: PlanId,

    /// Lowercase, hyphen-separated slug produced by the plan storage layer.
    /// Source of the tier identifier.
    pub slug: String,

    /// Human-readable plan name shown in the editor.
    pub name: String,

    /// Explicit ordering used by `TieBreak::HighestPriority`.
    /// Higher wins. Default: 0
    #[serde(default)]
    pub priority: i32,
}

impl MembershipPlan {
    /// Creates a plan with the default priority.
    pub fn new(id: impl Into<PlanId>, slug: impl Into<String>, name: impl Into<String>) -> Self {
        MembershipPlan {
            id: id.into(),
            slug: slug.into(),
            name: name.into(),
            priority: 0,
        }
    }

    /// Sets the tie-break priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

// =============================================================================
// Membership Status
// =============================================================================

/// Lifecycle status of a user membership.
///
/// Only `Active` memberships are handed to the resolver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    /// Membership grants its plan's rules.
    #[default]
    Active,
    /// Temporarily suspended (e.g., failed renewal).
    Paused,
    /// Ran past its end date.
    Expired,
    /// Cancelled by the member or an admin.
    Cancelled,
}

impl MembershipStatus {
    /// Returns true if the membership should be considered during resolution.
    #[inline]
    pub const fn is_active(&self) -> bool {
        matches!(self, MembershipStatus::Active)
    }
}

// =============================================================================
// Membership
// =============================================================================

/// One user's membership in one plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Membership {
    /// Membership record identifier.
    pub id: String,

    /// Owner of the membership.
    pub user_id: UserId,

    /// Plan this membership grants.
    /// `None` on malformed records (e.g., plan deleted underneath it).
    pub plan_id: Option<PlanId>,

    /// Current lifecycle status.
    #[serde(default)]
    pub status: MembershipStatus,

    /// When the membership started, if known.
    #[ts(as = "Option<String>")]
    pub started_at: Option<DateTime<Utc>>,
}

impl Membership {
    /// Creates an active membership in `plan_id` with no start date.
    pub fn active(
        id: impl Into<String>,
        user_id: impl Into<UserId>,
        plan_id: Option<PlanId>,
    ) -> Self {
        Membership {
            id: id.into(),
            user_id: user_id.into(),
            plan_id,
            status: MembershipStatus::Active,
            started_at: None,
        }
    }
}

// =============================================================================
// Cart Context
// =============================================================================

/// The cart line values a quantity check is running for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartLine {
    /// Product in the line.
    pub product_id: ProductId,

    /// Variation of the product, if the line holds one.
    pub variation_id: Option<ProductId>,

    /// Quantity currently in the cart.
    pub quantity: i64,
}

/// Cart context handed through to override hooks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartContext {
    /// Host cart's key for the line being checked.
    pub cart_item_key: String,

    /// Values of that line.
    pub line: CartLine,
}

impl CartContext {
    /// Context for a simple (non-variation) product line.
    pub fn for_line(
        cart_item_key: impl Into<String>,
        product_id: impl Into<ProductId>,
        quantity: i64,
    ) -> Self {
        CartContext {
            cart_item_key: cart_item_key.into(),
            line: CartLine {
                product_id: product_id.into(),
                variation_id: None,
                quantity,
            },
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_serialize_transparently() {
        let id = ProductId::new("P1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"P1\"");
        assert_eq!(id.to_string(), "P1");
    }

    #[test]
    fn test_membership_status_default_is_active() {
        assert!(MembershipStatus::default().is_active());
        assert!(!MembershipStatus::Expired.is_active());
        assert_eq!(
            serde_json::to_string(&MembershipStatus::Cancelled).unwrap(),
            "\"cancelled\""
        );
    }

    #[test]
    fn test_plan_priority_defaults_to_zero() {
        let plan: MembershipPlan =
            serde_json::from_str(r#"{"id":"12","slug":"gold","name":"Gold"}"#).unwrap();
        assert_eq!(plan.priority, 0);
        assert_eq!(plan.id, PlanId::new("12"));
    }
}
