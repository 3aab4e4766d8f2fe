//! # Override Hooks
//!
//! Third-party transforms applied to the looked-up maximum before the
//! resolver decides whether to override.
//!
//! ```text
//! looked-up value ──► hook (prio -10) ──► hook (prio 0) ──► hook (prio 0) ──► normalize
//!   Option<i64>                                           (registered later)
//! ```
//!
//! Hooks run lowest priority first; equal priorities run in registration
//! order. An empty chain passes the value through untouched.
//!
//! Hooks may have side effects and are not assumed to be referentially
//! transparent. The resolver calls the chain at most once per resolution.

use std::fmt;

use crate::tier::TierId;
use crate::types::{CartLine, ProductId};

/// Everything a hook gets to see about the resolution in progress.
#[derive(Debug, Clone, Copy)]
pub struct HookContext<'a> {
    /// Product being checked.
    pub product_id: &'a ProductId,

    /// Host cart's key for the line being checked.
    pub cart_item_key: &'a str,

    /// Values of that cart line.
    pub cart_line: &'a CartLine,

    /// Tier whose rule was looked up.
    pub tier_id: &'a TierId,
}

/// A transform over the looked-up maximum.
pub trait OverrideHook: Send + Sync {
    /// Returns the value to hand to the next hook (or to the resolver).
    ///
    /// `None` means "no configured maximum".
    fn apply(&self, value: Option<i64>, ctx: &HookContext<'_>) -> Option<i64>;
}

/// Adapter so plain closures can be registered.
struct FnHook<F>(F);

impl<F> OverrideHook for FnHook<F>
where
    F: Fn(Option<i64>, &HookContext<'_>) -> Option<i64> + Send + Sync,
{
    fn apply(&self, value: Option<i64>, ctx: &HookContext<'_>) -> Option<i64> {
        (self.0)(value, ctx)
    }
}

struct RegisteredHook {
    priority: i32,
    hook: Box<dyn OverrideHook>,
}

/// Ordered chain of override hooks.
#[derive(Default)]
pub struct OverrideHooks {
    hooks: Vec<RegisteredHook>,
}

impl OverrideHooks {
    /// Creates an empty (identity) chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a hook at `priority`.
    pub fn register(&mut self, priority: i32, hook: impl OverrideHook + 'static) -> &mut Self {
        // Stable insert keeps registration order among equal priorities
        let at = self
            .hooks
            .iter()
            .position(|h| h.priority > priority)
            .unwrap_or(self.hooks.len());
        self.hooks.insert(
            at,
            RegisteredHook {
                priority,
                hook: Box::new(hook),
            },
        );
        self
    }

    /// Registers a closure at `priority`.
    ///
    /// ## Example
    /// ```rust
    /// use tiermax_core::hooks::OverrideHooks;
    ///
    /// let mut hooks = OverrideHooks::new();
    /// hooks.register_fn(10, |value, _ctx| value.map(|v| v * 2));
    /// assert_eq!(hooks.len(), 1);
    /// ```
    pub fn register_fn<F>(&mut self, priority: i32, f: F) -> &mut Self
    where
        F: Fn(Option<i64>, &HookContext<'_>) -> Option<i64> + Send + Sync + 'static,
    {
        self.register(priority, FnHook(f))
    }

    /// Number of registered hooks.
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Returns true if no hooks are registered.
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Runs `value` through every hook in order.
    pub fn apply(&self, value: Option<i64>, ctx: &HookContext<'_>) -> Option<i64> {
        self.hooks
            .iter()
            .fold(value, |acc, registered| registered.hook.apply(acc, ctx))
    }
}

impl fmt::Debug for OverrideHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverrideHooks")
            .field(
                "priorities",
                &self.hooks.iter().map(|h| h.priority).collect::<Vec<_>>(),
            )
            .finish()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tier::derive_tier_id;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn with_ctx<R>(f: impl FnOnce(&HookContext<'_>) -> R) -> R {
        let product = ProductId::new("P1");
        let line = CartLine {
            product_id: product.clone(),
            variation_id: None,
            quantity: 1,
        };
        let tier = derive_tier_id("gold").unwrap();
        let ctx = HookContext {
            product_id: &product,
            cart_item_key: "abc123",
            cart_line: &line,
            tier_id: &tier,
        };
        f(&ctx)
    }

    #[test]
    fn test_empty_chain_is_identity() {
        let hooks = OverrideHooks::new();
        with_ctx(|ctx| {
            assert_eq!(hooks.apply(Some(4), ctx), Some(4));
            assert_eq!(hooks.apply(None, ctx), None);
        });
    }

    #[test]
    fn test_hooks_run_in_priority_order() {
        let mut hooks = OverrideHooks::new();
        hooks
            .register_fn(20, |v, _| v.map(|n| n * 10))
            .register_fn(10, |v, _| Some(v.unwrap_or(0) + 1))
            .register_fn(20, |v, _| v.map(|n| n - 3));

        // (0 + 1) * 10 - 3
        with_ctx(|ctx| assert_eq!(hooks.apply(None, ctx), Some(7)));
        assert_eq!(format!("{:?}", hooks), "OverrideHooks { priorities: [10, 20, 20] }");
    }

    #[test]
    fn test_hook_sees_context() {
        let mut hooks = OverrideHooks::new();
        hooks.register_fn(0, |v, ctx| {
            if ctx.cart_item_key == "abc123" && ctx.tier_id.as_str() == "gold" {
                Some(99)
            } else {
                v
            }
        });

        with_ctx(|ctx| assert_eq!(hooks.apply(Some(1), ctx), Some(99)));
    }

    struct Counting(Arc<AtomicUsize>);

    impl OverrideHook for Counting {
        fn apply(&self, value: Option<i64>, _ctx: &HookContext<'_>) -> Option<i64> {
            self.0.fetch_add(1, Ordering::SeqCst);
            value
        }
    }

    #[test]
    fn test_struct_hook() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut hooks = OverrideHooks::new();
        hooks.register(0, Counting(calls.clone()));

        with_ctx(|ctx| hooks.apply(Some(2), ctx));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
