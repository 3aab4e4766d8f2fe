//! # tiermax-core: Pure Rule Logic for Tier Max
//!
//! Per-membership maximum purchase quantities. Given a product, a shopper
//! and the default maximum computed by the host's quantity validation, this
//! crate decides whether the shopper's membership tier overrides it.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tier Max Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Host quantity validation pipeline                  │   │
//! │  │   baseline default max ──► resolve_max_quantity() ──► enforce   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tiermax-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   tier    │  │ resolver  │  │  editor   │  │   hooks   │  │   │
//! │  │   │  TierId   │  │ TieBreak  │  │ TierField │  │ Override  │  │   │
//! │  │   │  RuleKey  │  │ Fallback  │  │ save()    │  │ chain     │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   store traits: MembershipDirectory, ProductRuleStore          │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                tiermax-db (Database Layer)                      │   │
//! │  │        plans, memberships, product rules, snapshots             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (plans, memberships, cart context)
//! - [`tier`] - Tier identifier derivation and rule keys
//! - [`validation`] - Quantity coercion and catalog checks
//! - [`store`] - Collaborator traits
//! - [`memory`] - In-memory collaborator implementations
//! - [`hooks`] - Override hook chain
//! - [`editor`] - Admin form binding
//! - [`resolver`] - The maximum quantity decision
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use tiermax_core::memory::{InMemoryDirectory, InMemoryRuleStore};
//! use tiermax_core::resolver::MaxQuantityResolver;
//! use tiermax_core::{CartContext, ProductId, UserId};
//!
//! // A shopper without memberships keeps the default maximum
//! let directory = InMemoryDirectory::new();
//! let rules = InMemoryRuleStore::new();
//! let resolver = MaxQuantityResolver::new(&directory, &rules);
//!
//! let cart = CartContext::for_line("line-1", "P1", 1);
//! let max = resolver.resolve_max_quantity(5, &ProductId::new("P1"), &UserId::new("bob"), &cart);
//! assert_eq!(max, 5);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod editor;
pub mod error;
pub mod hooks;
pub mod memory;
pub mod resolver;
pub mod store;
pub mod tier;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use editor::{RuleEditor, RuleUpdate, SaveReport, TierCollision, TierField, TierFieldValue};
pub use error::{CoreError, ValidationError};
pub use hooks::{HookContext, OverrideHook, OverrideHooks};
pub use resolver::{FallbackReason, MaxQuantityResolver, Outcome, Resolution, TieBreak};
pub use store::{MembershipDirectory, ProductRuleStore, ProductRuleWriter};
pub use tier::{derive_tier_id, rule_key, RuleKey, TierId, RULE_KEY_PREFIX};
pub use types::*;
