//! End-to-end quantity checks against an in-memory SQLite database.

use std::collections::HashMap;

use tiermax_core::{
    derive_tier_id, rule_key, CartContext, FallbackReason, Membership, MembershipPlan,
    MembershipStatus, Outcome, OverrideHooks, PlanId, ProductId, RuleKey, TieBreak, UserId,
};
use tiermax_db::{Database, DbConfig, TierMaxConfig};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn key(slug: &str) -> RuleKey {
    rule_key(&derive_tier_id(slug).unwrap())
}

fn form(pairs: &[(RuleKey, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.as_str().to_string(), v.to_string()))
        .collect()
}

async fn store() -> Database {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    db.plans()
        .upsert(&MembershipPlan::new("41", "vip-tier", "VIP Tier").with_priority(10))
        .await
        .unwrap();
    db.plans()
        .upsert(&MembershipPlan::new("42", "gold", "Gold"))
        .await
        .unwrap();
    db
}

#[tokio::test]
async fn test_vip_member_gets_tier_maximum() {
    init_tracing();
    let db = store().await;
    let p1 = ProductId::new("P1");
    let alice = UserId::new("alice");

    db.memberships()
        .insert(&Membership::active("m1", "alice", Some(PlanId::new("41"))))
        .await
        .unwrap();
    db.save_rule_form(&p1, &form(&[(key("vip-tier"), "2")]))
        .await
        .unwrap();

    let snapshot = db.load_snapshot(&alice, &p1).await.unwrap();
    let cart = CartContext::for_line("c0ffee", "P1", 3);
    let resolution = snapshot
        .resolver(TieBreak::LastListed)
        .resolve(5, &p1, &alice, &cart);

    assert_eq!(resolution.quantity, 2);
    assert!(resolution.is_override());
}

#[tokio::test]
async fn test_shopper_without_membership_keeps_default() {
    init_tracing();
    let db = store().await;
    let p1 = ProductId::new("P1");
    let bob = UserId::new("bob");
    db.save_rule_form(&p1, &form(&[(key("vip-tier"), "2")]))
        .await
        .unwrap();

    let snapshot = db.load_snapshot(&bob, &p1).await.unwrap();
    let cart = CartContext::for_line("c0ffee", "P1", 1);
    let resolution = snapshot
        .resolver(TieBreak::LastListed)
        .resolve(5, &p1, &bob, &cart);

    assert_eq!(resolution.quantity, 5);
    assert_eq!(
        resolution.outcome,
        Outcome::Fallback {
            reason: FallbackReason::MissingMembership
        }
    );
}

#[tokio::test]
async fn test_paused_membership_is_ignored() {
    init_tracing();
    let db = store().await;
    let p1 = ProductId::new("P1");
    let alice = UserId::new("alice");

    let mut paused = Membership::active("m1", "alice", Some(PlanId::new("41")));
    paused.status = MembershipStatus::Paused;
    db.memberships().insert(&paused).await.unwrap();
    db.save_rule_form(&p1, &form(&[(key("vip-tier"), "2")]))
        .await
        .unwrap();

    let snapshot = db.load_snapshot(&alice, &p1).await.unwrap();
    let cart = CartContext::for_line("c0ffee", "P1", 1);
    let max = snapshot
        .resolver(TieBreak::LastListed)
        .resolve_max_quantity(7, &p1, &alice, &cart);

    assert_eq!(max, 7);
}

#[tokio::test]
async fn test_zero_clears_override() {
    init_tracing();
    let db = store().await;
    let p1 = ProductId::new("P1");
    let alice = UserId::new("alice");
    db.memberships()
        .insert(&Membership::active("m1", "alice", Some(PlanId::new("41"))))
        .await
        .unwrap();

    db.save_rule_form(&p1, &form(&[(key("vip-tier"), "4")]))
        .await
        .unwrap();
    db.save_rule_form(&p1, &form(&[(key("vip-tier"), "")]))
        .await
        .unwrap();

    assert_eq!(db.rules().get(&p1, &key("vip-tier")).await.unwrap(), Some(0));

    let snapshot = db.load_snapshot(&alice, &p1).await.unwrap();
    let cart = CartContext::for_line("c0ffee", "P1", 1);
    let max = snapshot
        .resolver(TieBreak::LastListed)
        .resolve_max_quantity(5, &p1, &alice, &cart);
    assert_eq!(max, 5);
}

#[tokio::test]
async fn test_tie_break_from_config() {
    init_tracing();
    let db = store().await;
    let p1 = ProductId::new("P1");
    let alice = UserId::new("alice");

    // Gold is the later membership, VIP has the higher priority
    for (id, plan) in [("m1", "41"), ("m2", "42")] {
        db.memberships()
            .insert(&Membership::active(id, "alice", Some(PlanId::new(plan))))
            .await
            .unwrap();
    }
    db.save_rule_form(&p1, &form(&[(key("vip-tier"), "2"), (key("gold"), "6")]))
        .await
        .unwrap();

    let snapshot = db.load_snapshot(&alice, &p1).await.unwrap();
    let cart = CartContext::for_line("c0ffee", "P1", 1);

    let defaults = TierMaxConfig::default();
    let by_priority =
        TierMaxConfig::from_toml_str("[resolution]\ntie_break = \"highest_priority\"\n").unwrap();

    assert_eq!(
        snapshot
            .resolver(defaults.tie_break())
            .resolve_max_quantity(9, &p1, &alice, &cart),
        6
    );
    assert_eq!(
        snapshot
            .resolver(by_priority.tie_break())
            .resolve_max_quantity(9, &p1, &alice, &cart),
        2
    );
}

#[tokio::test]
async fn test_hooks_see_stored_value() {
    init_tracing();
    let db = store().await;
    let p1 = ProductId::new("P1");
    let alice = UserId::new("alice");
    db.memberships()
        .insert(&Membership::active("m1", "alice", Some(PlanId::new("41"))))
        .await
        .unwrap();
    db.save_rule_form(&p1, &form(&[(key("vip-tier"), "2")]))
        .await
        .unwrap();

    let mut hooks = OverrideHooks::new();
    hooks.register_fn(10, |value, ctx| {
        if ctx.cart_line.quantity > 10 {
            value.map(|v| v * 2)
        } else {
            value
        }
    });

    let snapshot = db.load_snapshot(&alice, &p1).await.unwrap();
    let resolver = snapshot.resolver(TieBreak::LastListed).with_hooks(&hooks);

    let small = CartContext::for_line("a", "P1", 1);
    let bulk = CartContext::for_line("b", "P1", 12);
    assert_eq!(resolver.resolve_max_quantity(5, &p1, &alice, &small), 2);
    assert_eq!(resolver.resolve_max_quantity(5, &p1, &alice, &bulk), 4);
}

#[tokio::test]
async fn test_retired_plan_rules_pruned() {
    init_tracing();
    let db = store().await;
    let p1 = ProductId::new("P1");

    db.plans()
        .upsert(&MembershipPlan::new("43", "seasonal", "Seasonal"))
        .await
        .unwrap();
    db.save_rule_form(&p1, &form(&[(key("seasonal"), "1"), (key("gold"), "3")]))
        .await
        .unwrap();

    // Nothing is orphaned while the plan exists
    assert_eq!(db.prune_orphaned_rules().await.unwrap(), 0);

    sqlx::query("DELETE FROM membership_plans WHERE id = '43'")
        .execute(db.pool())
        .await
        .unwrap();

    assert_eq!(db.prune_orphaned_rules().await.unwrap(), 1);
    assert_eq!(
        db.rules().for_product(&p1).await.unwrap(),
        vec![(key("gold"), 3)]
    );
}
