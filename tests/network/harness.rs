//! Shared test harness: a network, a store, and propagation state wired
//! together the way a session holds them.

use antler_foundation::{FactHandle, Value};
use antler_network::{Network, NetworkBuilder, NetworkMemory, RuleDef, TerminalEvent};
use antler_store::{Fact, FactStore};

pub struct Rig {
    pub net: Network,
    pub store: FactStore,
    pub memory: NetworkMemory,
}

impl Rig {
    pub fn new(rules: Vec<RuleDef>) -> Self {
        let mut builder = NetworkBuilder::new();
        for rule in rules {
            builder.rule(rule).unwrap();
        }
        let net = builder.build();
        let store = FactStore::new();
        let memory = NetworkMemory::new(&net, &store);
        Self { net, store, memory }
    }

    pub fn fact(&mut self, type_name: &str, fields: &[(&str, Value)]) -> Fact {
        let fact_type = self.net.interner_mut().intern(type_name);
        let mut fact = Fact::new(fact_type);
        for (name, value) in fields {
            let field = self.net.interner_mut().intern(name);
            fact.set(field, value.clone());
        }
        fact
    }

    pub fn insert(&mut self, type_name: &str, fields: &[(&str, Value)]) -> FactHandle {
        let fact = self.fact(type_name, fields);
        let handle = self.store.insert(fact);
        self.memory.insert_fact(&self.net, &self.store, handle);
        handle
    }

    pub fn update(&mut self, handle: FactHandle, type_name: &str, fields: &[(&str, Value)]) {
        let fact = self.fact(type_name, fields);
        self.memory.retract_fact(&self.net, &self.store, handle);
        self.store.update(handle, fact).unwrap();
        self.memory.insert_fact(&self.net, &self.store, handle);
    }

    pub fn retract(&mut self, handle: FactHandle) {
        self.memory.retract_fact(&self.net, &self.store, handle);
        self.store.retract(handle).unwrap();
    }

    pub fn events(&mut self) -> Vec<TerminalEvent> {
        self.memory.drain_events()
    }
}

pub fn inserts(events: &[TerminalEvent]) -> Vec<(Vec<FactHandle>, Option<Value>)> {
    events
        .iter()
        .filter_map(|event| match event {
            TerminalEvent::Insert {
                facts, aggregate, ..
            } => Some((facts.clone(), aggregate.clone())),
            _ => None,
        })
        .collect()
}

pub fn retract_count(events: &[TerminalEvent]) -> usize {
    events
        .iter()
        .filter(|event| matches!(event, TerminalEvent::Retract { .. }))
        .count()
}

pub fn last_update(events: &[TerminalEvent]) -> Option<Value> {
    events.iter().rev().find_map(|event| match event {
        TerminalEvent::Update { aggregate, .. } => aggregate.clone(),
        _ => None,
    })
}
