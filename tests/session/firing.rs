//! The firing loop end to end: cascades, halting, limits, and the effect
//! log.

use std::cell::RefCell;
use std::rc::Rc;

use antler_foundation::{EngineLimit, Error, ErrorKind, Result, Value};
use antler_network::{CmpOp, FactPattern, NetworkBuilder, PatternDef, RuleDef};
use antler_session::{EffectRecord, Firing, Session, SessionConfig};
use antler_store::Fact;

fn session_with(rules: Vec<RuleDef>, config: SessionConfig) -> Session {
    let mut builder = NetworkBuilder::new();
    for rule in rules {
        builder.rule(rule).unwrap();
    }
    Session::new(builder.build(), config)
}

// =============================================================================
// Cascades
// =============================================================================

#[test]
fn actions_cascade_through_derived_facts() {
    let mut session = session_with(
        vec![
            RuleDef::new("stage-one").fact(FactPattern::of("Input").bind("n", "n")),
            RuleDef::new("stage-two").fact(FactPattern::of("Derived").bind("n", "n")),
        ],
        SessionConfig::default(),
    );

    let seen = Rc::new(RefCell::new(Vec::new()));
    {
        session
            .on_rule("stage-one", |session: &mut Session, firing: &Firing| {
                let n = session.intern("n");
                let value = session.fact(firing.facts[0])?.get(n);
                let derived = session.intern("Derived");
                session.insert(Fact::new(derived).with(n, value))?;
                Ok(())
            })
            .unwrap();
    }
    {
        let seen = Rc::clone(&seen);
        session
            .on_rule("stage-two", move |session: &mut Session, firing: &Firing| {
                let n = session.intern("n");
                seen.borrow_mut().push(session.fact(firing.facts[0])?.get(n));
                Ok(())
            })
            .unwrap();
    }

    let input = session.intern("Input");
    let n = session.intern("n");
    session.insert(Fact::new(input).with(n, 41i64)).unwrap();

    assert_eq!(session.fire_all_rules().unwrap(), 2);
    assert_eq!(*seen.borrow(), vec![Value::Int(41)]);
}

#[test]
fn rules_over_the_empty_store_fire_without_any_insert() {
    let mut session = session_with(
        vec![RuleDef::new("vacuous").pattern(PatternDef::Not(vec![FactPattern::of(
            "Anything",
        )]))],
        SessionConfig::default(),
    );
    let fired = Rc::new(RefCell::new(0u32));
    {
        let fired = Rc::clone(&fired);
        session
            .on_rule("vacuous", move |_: &mut Session, _: &Firing| -> Result<()> {
                *fired.borrow_mut() += 1;
                Ok(())
            })
            .unwrap();
    }

    assert_eq!(session.fire_all_rules().unwrap(), 1);
    assert_eq!(*fired.borrow(), 1);
}

// =============================================================================
// Halting and limits
// =============================================================================

#[test]
fn halt_preserves_the_rest_of_the_agenda() {
    let mut session = session_with(
        vec![
            RuleDef::new("stopper").with_salience(1).fact(FactPattern::of("Tick")),
            RuleDef::new("survivor").fact(FactPattern::of("Tick")),
        ],
        SessionConfig::default(),
    );
    session
        .on_rule("stopper", |session: &mut Session, _: &Firing| {
            session.halt();
            Ok(())
        })
        .unwrap();
    session.on_rule("survivor", |_, _| Ok(())).unwrap();

    let tick = session.intern("Tick");
    session.insert(Fact::new(tick)).unwrap();
    assert_eq!(session.fire_all_rules().unwrap(), 1);
    assert!(session.halted());
    assert_eq!(session.agenda_group("MAIN"), vec!["survivor".to_string()]);

    assert_eq!(session.fire_until_halt().unwrap(), 1);
}

#[test]
fn kill_switch_reports_the_configured_limit() {
    let mut session = session_with(
        vec![RuleDef::new("spin")
            .fact(FactPattern::of("Counter").literal("value", CmpOp::Ge, 0i64))],
        SessionConfig::new().with_max_firings(16),
    );
    session
        .on_rule("spin", |session: &mut Session, firing: &Firing| {
            let fact = session.fact(firing.facts[0])?.clone();
            session.update(firing.facts[0], fact)?;
            Ok(())
        })
        .unwrap();

    let counter = session.intern("Counter");
    let value = session.intern("value");
    session.insert(Fact::new(counter).with(value, 0i64)).unwrap();

    let err = session.fire_all_rules().unwrap_err();
    assert!(matches!(
        err.kind,
        ErrorKind::LimitExceeded(EngineLimit::MaxFirings { limit: 16 })
    ));
}

#[test]
fn action_failures_carry_the_rule_name() {
    let mut session = session_with(
        vec![
            RuleDef::new("healthy").with_salience(1).fact(FactPattern::of("Tick")),
            RuleDef::new("broken").fact(FactPattern::of("Tick")),
        ],
        SessionConfig::default(),
    );
    let fired = Rc::new(RefCell::new(0u32));
    {
        let fired = Rc::clone(&fired);
        session
            .on_rule("healthy", move |_: &mut Session, _: &Firing| -> Result<()> {
                *fired.borrow_mut() += 1;
                Ok(())
            })
            .unwrap();
    }
    session
        .on_rule("broken", |_, _| Err(Error::action_failed("boom")))
        .unwrap();

    let tick = session.intern("Tick");
    session.insert(Fact::new(tick)).unwrap();

    let err = session.fire_all_rules().unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ActionFailed(_)));
    assert_eq!(err.rule.as_deref(), Some("broken"));
    // The healthy rule fired before the failure; its effects stand
    assert_eq!(*fired.borrow(), 1);
}

// =============================================================================
// Effect log
// =============================================================================

#[test]
fn effect_log_tells_the_full_story() {
    let mut session = session_with(
        vec![RuleDef::new("seen").in_group("WORK").fact(FactPattern::of("Tick"))],
        SessionConfig::default(),
    );
    session.on_rule("seen", |_, _| Ok(())).unwrap();

    let tick = session.intern("Tick");
    let handle = session.insert(Fact::new(tick)).unwrap();
    session.set_focus("WORK");
    session.fire_all_rules().unwrap();
    session.update(handle, Fact::new(tick)).unwrap();
    session.retract(handle).unwrap();

    let effects = session.effects();
    assert!(matches!(effects[0], EffectRecord::Inserted { .. }));
    assert!(matches!(effects[1], EffectRecord::FocusChanged { .. }));
    assert!(matches!(effects[2], EffectRecord::Fired { .. }));
    assert!(matches!(
        effects[3],
        EffectRecord::Updated { version: 1, .. }
    ));
    assert!(matches!(effects[4], EffectRecord::Retracted { .. }));
    assert_eq!(effects.len(), 5);
}
