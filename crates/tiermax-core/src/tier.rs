//! # Tier Identifiers & Rule Keys
//!
//! How a membership plan becomes a storage key on a product.
//!
//! ```text
//! plan slug            tier id              rule key
//! ─────────            ───────              ────────
//! "vip-tier"  ──────►  "vip_tier"  ──────►  "maximum_allowed_quantity_membership_vip_tier"
//!             hyphens                prefix
//!             to "_"                 + id
//! ```
//!
//! The derivation is lossy: `gold-plus` and `gold_plus` map to the same tier
//! identifier. Such collisions are reported by the editor, not resolved.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::CoreError;

/// Prefix of every rule key stored on a product.
pub const RULE_KEY_PREFIX: &str = "maximum_allowed_quantity_membership_";

// =============================================================================
// Tier Identifier
// =============================================================================

/// Storage-safe identifier of a membership tier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export)]
pub struct TierId(String);

impl TierId {
    /// Returns the identifier as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives the tier identifier from a plan slug.
///
/// Every `-` becomes `_`. Returns `None` for an empty (or blank) slug, which
/// callers treat as "skip this plan".
///
/// ## Example
/// ```rust
/// use tiermax_core::tier::derive_tier_id;
///
/// assert_eq!(derive_tier_id("gold-plus").unwrap().as_str(), "gold_plus");
/// assert!(derive_tier_id("").is_none());
/// ```
pub fn derive_tier_id(plan_slug: &str) -> Option<TierId> {
    if plan_slug.trim().is_empty() {
        return None;
    }

    Some(TierId(plan_slug.replace('-', "_")))
}

// =============================================================================
// Rule Key
// =============================================================================

/// Namespaced key of one tier's maximum on a product.
///
/// Always carries [`RULE_KEY_PREFIX`] followed by a non-empty tier part;
/// deserialization rejects anything else.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, TS)]
#[serde(transparent)]
#[ts(export)]
pub struct RuleKey(String);

impl RuleKey {
    /// Returns the key as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses a stored key back into a rule key.
    ///
    /// Returns `None` when the key doesn't carry the rule prefix or has
    /// nothing after it.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.strip_prefix(RULE_KEY_PREFIX) {
            Some(rest) if !rest.is_empty() => Some(RuleKey(raw.to_string())),
            _ => None,
        }
    }

    /// Returns the tier identifier part of the key.
    pub fn tier_id(&self) -> TierId {
        TierId(self.0[RULE_KEY_PREFIX.len()..].to_string())
    }
}

impl TryFrom<String> for RuleKey {
    type Error = CoreError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        match RuleKey::parse(&raw) {
            Some(key) => Ok(key),
            None => Err(CoreError::InvalidRuleKey(raw)),
        }
    }
}

impl<'de> Deserialize<'de> for RuleKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        RuleKey::try_from(raw).map_err(de::Error::custom)
    }
}

impl fmt::Display for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds the rule key for a tier.
///
/// ## Example
/// ```rust
/// use tiermax_core::tier::{derive_tier_id, rule_key};
///
/// let tier = derive_tier_id("silver").unwrap();
/// assert_eq!(rule_key(&tier).as_str(), "maximum_allowed_quantity_membership_silver");
/// ```
pub fn rule_key(tier_id: &TierId) -> RuleKey {
    RuleKey(format!("{}{}", RULE_KEY_PREFIX, tier_id.as_str()))
}

// =============================================================================
// Unit Tests
// =============================================================================
