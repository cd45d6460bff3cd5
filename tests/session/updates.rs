//! Updates driven from inside actions: activation churn keeps aggregates
//! honest, and unlinked siblings of a shared subnetwork stay inert.

use std::cell::RefCell;
use std::rc::Rc;

use antler_foundation::{Result, Value};
use antler_network::{
    AccumulateDef, AggregateDef, CmpOp, FactPattern, NetworkBuilder, PatternDef, RuleDef,
};
use antler_session::{Firing, Session, SessionConfig};
use antler_store::Fact;

fn session_with(rules: Vec<RuleDef>) -> Session {
    let mut builder = NetworkBuilder::new();
    for rule in rules {
        builder.rule(rule).unwrap();
    }
    Session::new(builder.build(), SessionConfig::default())
}

// =============================================================================
// Churn pushes aggregate activations behind their causes
// =============================================================================

#[test]
fn counter_updates_keep_the_tally_waiting_until_they_settle() {
    let mut session = session_with(vec![
        RuleDef::new("tally").pattern(PatternDef::Accumulate(
            AccumulateDef::new(
                vec![FactPattern::of("Counter"), FactPattern::of("Label")],
                AggregateDef::Count,
            )
            .with_result(CmpOp::Gt, 0i64),
        )),
        RuleDef::new("bump").fact(FactPattern::of("Counter").literal("value", CmpOp::Lt, 3i64)),
    ]);

    let tallies = Rc::new(RefCell::new(Vec::new()));
    {
        let tallies = Rc::clone(&tallies);
        session
            .on_rule("tally", move |_: &mut Session, firing: &Firing| -> Result<()> {
                tallies.borrow_mut().push(firing.aggregate.clone());
                Ok(())
            })
            .unwrap();
    }
    let bumps = Rc::new(RefCell::new(0u32));
    {
        let bumps = Rc::clone(&bumps);
        session
            .on_rule("bump", move |session: &mut Session, firing: &Firing| {
                *bumps.borrow_mut() += 1;
                let value = session.intern("value");
                let current = session.fact(firing.facts[0])?.get(value);
                let counter = session.intern("Counter");
                let next = current.as_int().unwrap_or(0) + 1;
                session.update(firing.facts[0], Fact::new(counter).with(value, next))?;
                Ok(())
            })
            .unwrap();
    }

    let counter = session.intern("Counter");
    let label = session.intern("Label");
    let value = session.intern("value");
    let handle = session.insert(Fact::new(counter).with(value, 0i64)).unwrap();
    session.insert(Fact::new(label)).unwrap();

    session.fire_all_rules().unwrap();

    // Each update cancels the queued tally and requeues it behind the next
    // bump, so it fires exactly once, after the counter stops moving
    assert_eq!(*bumps.borrow(), 3);
    assert_eq!(*tallies.borrow(), vec![Some(Value::Int(1))]);
    assert_eq!(
        session.fact(handle).unwrap().get(value),
        Value::Int(3)
    );
}

// =============================================================================
// Shared subnetworks with an unlinked sibling
// =============================================================================

#[test]
fn unlinked_sibling_of_a_shared_subnetwork_never_fires_or_faults() {
    let source = vec![FactPattern::of("Counter"), FactPattern::of("Label")];
    let mut session = session_with(vec![
        RuleDef::new("dormant")
            .fact(FactPattern::of("Counter"))
            .pattern(PatternDef::Guard(false))
            .pattern(PatternDef::Accumulate(AccumulateDef::new(
                source.clone(),
                AggregateDef::Count,
            ))),
        RuleDef::new("active")
            .fact(FactPattern::of("Counter"))
            .pattern(PatternDef::Guard(true))
            .pattern(PatternDef::Accumulate(AccumulateDef::new(
                source,
                AggregateDef::Count,
            ))),
        RuleDef::new("bump").fact(FactPattern::of("Counter").literal("value", CmpOp::Lt, 3i64)),
    ]);

    let dormant_fired = Rc::new(RefCell::new(0u32));
    {
        let dormant_fired = Rc::clone(&dormant_fired);
        session
            .on_rule("dormant", move |_: &mut Session, _: &Firing| -> Result<()> {
                *dormant_fired.borrow_mut() += 1;
                Ok(())
            })
            .unwrap();
    }
    let counts = Rc::new(RefCell::new(Vec::new()));
    {
        let counts = Rc::clone(&counts);
        session
            .on_rule("active", move |_: &mut Session, firing: &Firing| -> Result<()> {
                counts.borrow_mut().push(firing.aggregate.clone());
                Ok(())
            })
            .unwrap();
    }
    session
        .on_rule("bump", |session: &mut Session, firing: &Firing| {
            let label = session.intern("Label");
            session.insert(Fact::new(label))?;
            let value = session.intern("value");
            let current = session.fact(firing.facts[0])?.get(value);
            let counter = session.intern("Counter");
            let next = current.as_int().unwrap_or(0) + 1;
            session.update(firing.facts[0], Fact::new(counter).with(value, next))?;
            Ok(())
        })
        .unwrap();

    let counter = session.intern("Counter");
    let label = session.intern("Label");
    let value = session.intern("value");
    let handle = session.insert(Fact::new(counter).with(value, 0i64)).unwrap();
    session.insert(Fact::new(label)).unwrap();

    session.fire_all_rules().unwrap();

    // Three bumps each add a label, so the surviving tally sees 1 counter
    // against 4 labels; the guarded sibling shares the source subnetwork
    // but stays unlinked throughout
    assert_eq!(*counts.borrow(), vec![Some(Value::Int(4))]);
    assert_eq!(*dormant_fired.borrow(), 0);
    assert_eq!(
        session.fact(handle).unwrap().get(value),
        Value::Int(3)
    );
}
