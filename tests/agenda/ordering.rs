//! Within-group ordering: salience descending, then creation order.

use std::cell::RefCell;
use std::rc::Rc;

use antler_foundation::Result;
use antler_network::{CmpOp, FactPattern, NetworkBuilder, RuleDef};
use antler_session::{Firing, Session, SessionConfig};
use antler_store::Fact;

fn session_with(rules: Vec<RuleDef>) -> Session {
    let mut builder = NetworkBuilder::new();
    for rule in rules {
        builder.rule(rule).unwrap();
    }
    Session::new(builder.build(), SessionConfig::default())
}

fn recorder(
    session: &mut Session,
    rules: &[&str],
) -> Rc<RefCell<Vec<String>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    for rule in rules {
        let log = Rc::clone(&log);
        let name = (*rule).to_string();
        session
            .on_rule(rule, move |_: &mut Session, _: &Firing| -> Result<()> {
                log.borrow_mut().push(name.clone());
                Ok(())
            })
            .unwrap();
    }
    log
}

// =============================================================================
// Salience and FIFO
// =============================================================================

#[test]
fn salience_descends_then_creation_order() {
    let mut session = session_with(vec![
        RuleDef::new("mid").with_salience(5).fact(FactPattern::of("Tick")),
        RuleDef::new("low").fact(FactPattern::of("Tick")),
        RuleDef::new("high").with_salience(9).fact(FactPattern::of("Tick")),
        RuleDef::new("mid-too").with_salience(5).fact(FactPattern::of("Tick")),
    ]);
    let log = recorder(&mut session, &["mid", "low", "high", "mid-too"]);

    let tick = session.intern("Tick");
    session.insert(Fact::new(tick)).unwrap();
    session.fire_all_rules().unwrap();

    // Equal salience resolves by registration order of the terminals
    assert_eq!(*log.borrow(), vec!["high", "mid", "mid-too", "low"]);
}

#[test]
fn facts_fire_in_insertion_order_per_rule() {
    let mut session = session_with(vec![RuleDef::new("echo")
        .fact(FactPattern::of("Msg").bind("n", "n"))]);

    let order = Rc::new(RefCell::new(Vec::new()));
    {
        let order = Rc::clone(&order);
        session
            .on_rule("echo", move |session: &mut Session, firing: &Firing| {
                let n = session.intern("n");
                let value = session.fact(firing.facts[0])?.get(n);
                order.borrow_mut().push(value);
                Ok(())
            })
            .unwrap();
    }

    let msg = session.intern("Msg");
    let n = session.intern("n");
    for i in 0..3i64 {
        session.insert(Fact::new(msg).with(n, i)).unwrap();
    }
    session.fire_all_rules().unwrap();

    let fired: Vec<i64> = order.borrow().iter().map(|v| v.as_int().unwrap()).collect();
    assert_eq!(fired, vec![0, 1, 2]);
}

#[test]
fn update_churn_requeues_behind_newer_activations() {
    let mut session = session_with(vec![
        RuleDef::new("watch")
            .fact(FactPattern::of("Gauge").literal("level", CmpOp::Ge, 0i64)),
        RuleDef::new("other").fact(FactPattern::of("Tick")),
    ]);
    let log = recorder(&mut session, &["watch", "other"]);

    let gauge = session.intern("Gauge");
    let level = session.intern("level");
    let tick = session.intern("Tick");

    let handle = session.insert(Fact::new(gauge).with(level, 0i64)).unwrap();
    session.insert(Fact::new(tick)).unwrap();

    // Revising the gauge cancels and recreates its activation with a later
    // sequence number, so "other" now fires first
    session.update(handle, Fact::new(gauge).with(level, 1i64)).unwrap();
    session.fire_all_rules().unwrap();
    assert_eq!(*log.borrow(), vec!["other", "watch"]);
}
