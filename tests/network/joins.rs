//! Join, negation, and existential behavior over live fact mutations.

use antler_foundation::Value;
use antler_network::{CmpOp, FactPattern, PatternDef, RuleDef};

use crate::harness::{inserts, retract_count, Rig};

// =============================================================================
// Joins
// =============================================================================

#[test]
fn three_level_join_matches_across_types() {
    let mut rig = Rig::new(vec![RuleDef::new("order-line-shipment")
        .fact(FactPattern::of("Order").bind("id", "id"))
        .fact(
            FactPattern::of("Line")
                .bound("order", CmpOp::Eq, "id")
                .bind("sku", "sku"),
        )
        .fact(FactPattern::of("Shipment").bound("sku", CmpOp::Eq, "sku"))]);

    let order = rig.insert("Order", &[("id", Value::Int(1))]);
    let line = rig.insert(
        "Line",
        &[("order", Value::Int(1)), ("sku", Value::from("widget"))],
    );
    assert!(inserts(&rig.events()).is_empty());

    let shipment = rig.insert("Shipment", &[("sku", Value::from("widget"))]);
    let matched = inserts(&rig.events());
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].0, vec![order, line, shipment]);
}

#[test]
fn literal_constraints_filter_in_the_alpha_network() {
    let mut rig = Rig::new(vec![RuleDef::new("big-order")
        .fact(FactPattern::of("Order").literal("amount", CmpOp::Gt, 100i64))]);

    rig.insert("Order", &[("amount", Value::Int(50))]);
    assert!(rig.events().is_empty());

    rig.insert("Order", &[("amount", Value::Int(150))]);
    assert_eq!(inserts(&rig.events()).len(), 1);
}

#[test]
fn ordering_constraints_join_numerically() {
    let mut rig = Rig::new(vec![RuleDef::new("outbid")
        .fact(FactPattern::of("Bid").bind("price", "price"))
        .fact(FactPattern::of("Offer").bound("price", CmpOp::Gt, "price"))]);

    rig.insert("Bid", &[("price", Value::Int(10))]);
    rig.insert("Offer", &[("price", Value::Int(10))]);
    assert!(rig.events().is_empty());

    rig.insert("Offer", &[("price", Value::Float(10.5))]);
    assert_eq!(inserts(&rig.events()).len(), 1);
}

#[test]
fn retracting_a_root_fact_removes_all_derived_matches() {
    let mut rig = Rig::new(vec![RuleDef::new("pairs")
        .fact(FactPattern::of("A").bind("k", "k"))
        .fact(FactPattern::of("B").bound("k", CmpOp::Eq, "k"))]);

    let a = rig.insert("A", &[("k", Value::Int(1))]);
    rig.insert("B", &[("k", Value::Int(1))]);
    rig.insert("B", &[("k", Value::Int(1))]);
    assert_eq!(inserts(&rig.events()).len(), 2);

    let baseline = rig.memory.tuple_count();
    rig.retract(a);
    let events = rig.events();
    assert_eq!(retract_count(&events), 2);
    // Both join tuples and the (A) tuple are gone
    assert_eq!(rig.memory.tuple_count(), baseline - 3);
}

#[test]
fn update_rederives_matches_whose_outcome_changed() {
    let mut rig = Rig::new(vec![RuleDef::new("paired")
        .fact(FactPattern::of("A").bind("k", "k"))
        .fact(FactPattern::of("B").bound("k", CmpOp::Eq, "k"))]);

    rig.insert("A", &[("k", Value::Int(1))]);
    let b = rig.insert("B", &[("k", Value::Int(1))]);
    assert_eq!(inserts(&rig.events()).len(), 1);

    // Revision breaks the join: retract only
    rig.update(b, "B", &[("k", Value::Int(2))]);
    let events = rig.events();
    assert_eq!(retract_count(&events), 1);
    assert!(inserts(&events).is_empty());

    // Revision restores it: fresh match
    rig.update(b, "B", &[("k", Value::Int(1))]);
    assert_eq!(inserts(&rig.events()).len(), 1);
}

// =============================================================================
// Negation and existence
// =============================================================================

#[test]
fn negation_only_blocks_matching_facts() {
    let mut rig = Rig::new(vec![RuleDef::new("unblocked")
        .fact(FactPattern::of("Task").bind("id", "id"))
        .pattern(PatternDef::Not(vec![
            FactPattern::of("Blocker").bound("task", CmpOp::Eq, "id")
        ]))]);

    rig.insert("Task", &[("id", Value::Int(1))]);
    assert_eq!(inserts(&rig.events()).len(), 1);

    // A blocker for another task changes nothing
    rig.insert("Blocker", &[("task", Value::Int(2))]);
    assert!(rig.events().is_empty());

    let blocker = rig.insert("Blocker", &[("task", Value::Int(1))]);
    assert_eq!(retract_count(&rig.events()), 1);

    rig.retract(blocker);
    assert_eq!(inserts(&rig.events()).len(), 1);
}

#[test]
fn exists_needs_one_match_and_tolerates_losing_extras() {
    let mut rig = Rig::new(vec![RuleDef::new("active")
        .fact(FactPattern::of("Account").bind("id", "id"))
        .pattern(PatternDef::Exists(vec![
            FactPattern::of("Login").bound("account", CmpOp::Eq, "id")
        ]))]);

    rig.insert("Account", &[("id", Value::Int(7))]);
    let first = rig.insert("Login", &[("account", Value::Int(7))]);
    let second = rig.insert("Login", &[("account", Value::Int(7))]);
    assert_eq!(inserts(&rig.events()).len(), 1);

    rig.retract(first);
    assert!(rig.events().is_empty());
    rig.retract(second);
    assert_eq!(retract_count(&rig.events()), 1);
}
