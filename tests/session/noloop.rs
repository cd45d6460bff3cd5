//! No-loop suppression and its interaction with agenda groups.

use std::cell::RefCell;
use std::rc::Rc;

use antler_foundation::Result;
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

fn recorder(session: &mut Session, rules: &[&str]) -> Rc<RefCell<Vec<String>>> {
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
// Suppression scope
// =============================================================================

#[test]
fn no_loop_suppresses_self_but_not_siblings() {
    let mut session = session_with(vec![
        RuleDef::new("self-mod")
            .with_no_loop(true)
            .with_salience(1)
            .fact(FactPattern::of("Gauge")),
        RuleDef::new("observer").fact(FactPattern::of("Gauge")),
    ]);

    session
        .on_rule("self-mod", |session: &mut Session, firing: &Firing| {
            let fact = session.fact(firing.facts[0])?.clone();
            session.update(firing.facts[0], fact)?;
            Ok(())
        })
        .unwrap();
    let observed = Rc::new(RefCell::new(0u32));
    {
        let observed = Rc::clone(&observed);
        session
            .on_rule("observer", move |_: &mut Session, _: &Firing| -> Result<()> {
                *observed.borrow_mut() += 1;
                Ok(())
            })
            .unwrap();
    }

    let gauge = session.intern("Gauge");
    session.insert(Fact::new(gauge)).unwrap();

    // The update inside "self-mod" requeues "observer" but not "self-mod"
    assert_eq!(session.fire_all_rules().unwrap(), 2);
    assert_eq!(*observed.borrow(), 1);
}

#[test]
fn no_loop_is_scoped_to_the_firing_not_the_rule() {
    let mut session = session_with(vec![RuleDef::new("self-mod")
        .with_no_loop(true)
        .fact(FactPattern::of("Gauge"))]);
    let log = recorder(&mut session, &["self-mod"]);

    let gauge = session.intern("Gauge");
    let first = session.insert(Fact::new(gauge)).unwrap();
    assert_eq!(session.fire_all_rules().unwrap(), 1);

    // A fresh fact activates the rule again
    session.insert(Fact::new(gauge)).unwrap();
    assert_eq!(session.fire_all_rules().unwrap(), 1);

    // An update arriving outside any firing is not suppressed either
    session.update(first, Fact::new(gauge)).unwrap();
    assert_eq!(session.fire_all_rules().unwrap(), 1);
    assert_eq!(log.borrow().len(), 3);
}

// =============================================================================
// Two sinks on a shared aggregate, driven across groups
// =============================================================================

#[test]
fn bumped_keys_drain_the_shared_count_for_both_groups() {
    let source = vec![
        FactPattern::of("Key").bind("id", "id"),
        FactPattern::of("Ref").bound("parent", CmpOp::Eq, "id"),
    ];
    let mut session = session_with(vec![
        RuleDef::new("none-left").in_group("G2").pattern(PatternDef::Accumulate(
            AccumulateDef::new(source.clone(), AggregateDef::Count).with_result(CmpOp::Eq, 0i64),
        )),
        RuleDef::new("below-one").in_group("G1").pattern(PatternDef::Accumulate(
            AccumulateDef::new(source, AggregateDef::Count).with_result(CmpOp::Lt, 1i64),
        )),
        RuleDef::new("bump")
            .in_group("G1")
            .with_no_loop(true)
            .fact(FactPattern::of("Key").bind("id", "id")),
    ]);
    let log = recorder(&mut session, &["none-left", "below-one"]);
    {
        let log = Rc::clone(&log);
        session
            .on_rule("bump", move |session: &mut Session, firing: &Firing| {
                log.borrow_mut().push("bump".to_string());
                let id = session.intern("id");
                let current = session.fact(firing.facts[0])?.get(id);
                let key = session.intern("Key");
                let next = current.as_int().unwrap_or(0) + 1;
                session.update(firing.facts[0], Fact::new(key).with(id, next))?;
                Ok(())
            })
            .unwrap();
    }

    let key = session.intern("Key");
    let reference = session.intern("Ref");
    let id = session.intern("id");
    let parent = session.intern("parent");
    session.insert(Fact::new(key).with(id, 1i64)).unwrap();
    session.insert(Fact::new(reference).with(parent, 1i64)).unwrap();
    session.insert(Fact::new(key).with(id, 3i64)).unwrap();
    session.insert(Fact::new(reference).with(parent, 3i64)).unwrap();

    session.set_focus("G2");
    session.set_focus("G1");
    session.fire_all_rules().unwrap();

    // Both bumps shift their keys off the matching references; the shared
    // count reaches zero, arming both sinks. G1 drains before G2
    assert_eq!(
        *log.borrow(),
        vec!["bump", "bump", "below-one", "none-left"]
    );
}
