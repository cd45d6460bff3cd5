//! The session: working memory, agenda, and the firing driver.
//!
//! A session owns one compiled network, one fact store, and one agenda.
//! `insert`, `update`, and `retract` each run one synchronous propagation
//! pass; the resulting terminal events are folded into activations before
//! the call returns. `fire_all_rules` then drains the agenda, running host
//! actions that may re-enter the same session.

use std::collections::HashMap;
use std::rc::Rc;

use antler_foundation::{EngineLimit, Error, FactHandle, Result, SymbolId, Value};
use antler_network::{Network, NetworkMemory, RuleId, TerminalEvent, TupleId};
use antler_store::{Fact, FactStore};

use crate::activation::{Activation, ActivationId, ActivationState};
use crate::agenda::Agenda;
use crate::effect::EffectRecord;

/// Session tuning knobs.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    main_group: String,
    max_firings: u64,
    auto_fire: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            main_group: "MAIN".to_string(),
            max_firings: 10_000,
            auto_fire: false,
        }
    }
}

impl SessionConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Renames the main agenda group.
    #[must_use]
    pub fn with_main_group(mut self, name: impl Into<String>) -> Self {
        self.main_group = name.into();
        self
    }

    /// Caps the number of firings per `fire_all_rules` call. Exceeding the
    /// cap aborts the loop with [`EngineLimit::MaxFirings`].
    #[must_use]
    pub const fn with_max_firings(mut self, limit: u64) -> Self {
        self.max_firings = limit;
        self
    }

    /// Fires the agenda automatically after every working-memory mutation
    /// made from outside the firing loop.
    #[must_use]
    pub const fn with_auto_fire(mut self, auto_fire: bool) -> Self {
        self.auto_fire = auto_fire;
        self
    }
}

/// One firing handed to a rule's action: the matched facts in declaration
/// order plus the aggregate result, if the rule has one.
#[derive(Clone, Debug)]
pub struct Firing {
    /// Name of the fired rule.
    pub rule: String,
    /// Matched fact handles in pattern declaration order.
    pub facts: Vec<FactHandle>,
    /// Aggregate result snapshot, if the rule ends in an accumulate.
    pub aggregate: Option<Value>,
}

type ActionFn = dyn Fn(&mut Session, &Firing) -> Result<()>;

/// A rule session: one coherent working memory, cooperatively mutated.
pub struct Session {
    network: Network,
    store: FactStore,
    memory: NetworkMemory,
    agenda: Agenda,
    activations: Vec<Activation>,
    /// Queued activation per (rule, tuple); fired and cancelled entries are
    /// removed so updates can distinguish refresh from re-activation.
    pending: HashMap<(RuleId, TupleId), ActivationId>,
    actions: Vec<Option<Rc<ActionFn>>>,
    seq: u64,
    halted: bool,
    /// Firing-loop nesting depth; actions may call `fire_all_rules` again.
    firing_depth: u32,
    /// (rule, fact set) of a no-loop firing in progress.
    in_flight: Option<(RuleId, Vec<FactHandle>)>,
    config: SessionConfig,
    effects: Vec<EffectRecord>,
}

impl Session {
    /// Creates a session over a compiled network. Rules whose conditions
    /// hold over the empty store (negations, zero-count accumulates) are
    /// activated immediately.
    #[must_use]
    pub fn new(network: Network, config: SessionConfig) -> Self {
        let store = FactStore::new();
        let memory = NetworkMemory::new(&network, &store);
        let agenda = Agenda::new(config.main_group.clone());
        let actions = network.rules().iter().map(|_| None).collect();
        let mut session = Self {
            network,
            store,
            memory,
            agenda,
            activations: Vec::new(),
            pending: HashMap::new(),
            actions,
            seq: 0,
            halted: false,
            firing_depth: 0,
            in_flight: None,
            config,
            effects: Vec::new(),
        };
        session.apply_events();
        session
    }

    /// Interns a type or field name.
    pub fn intern(&mut self, name: &str) -> SymbolId {
        self.network.interner_mut().intern(name)
    }

    /// Returns the compiled network.
    #[must_use]
    pub const fn network(&self) -> &Network {
        &self.network
    }

    /// Returns the fact store.
    #[must_use]
    pub const fn store(&self) -> &FactStore {
        &self.store
    }

    /// Returns the fact behind a handle.
    ///
    /// # Errors
    /// Returns an error if the handle is stale or was never allocated.
    pub fn fact(&self, handle: FactHandle) -> Result<&Fact> {
        self.store.get(handle)
    }

    /// Returns the effect log.
    #[must_use]
    pub fn effects(&self) -> &[EffectRecord] {
        &self.effects
    }

    /// Returns true if `halt` was called during the current firing loop.
    #[must_use]
    pub const fn halted(&self) -> bool {
        self.halted
    }

    // ------------------------------------------------------------------- //
    // Working memory
    // ------------------------------------------------------------------- //

    /// Inserts a fact and propagates it.
    ///
    /// # Errors
    /// Only fails when auto-fire is enabled and the triggered firing loop
    /// fails.
    pub fn insert(&mut self, fact: Fact) -> Result<FactHandle> {
        let handle = self.store.insert(fact);
        self.memory.insert_fact(&self.network, &self.store, handle);
        self.effects.push(EffectRecord::Inserted { handle });
        self.apply_events();
        self.auto_fire()?;
        Ok(handle)
    }

    /// Revises a fact in place, preserving its handle and bumping its
    /// version. To the network this is a retract pass followed by an insert
    /// pass; matches whose outcome changes are re-derived.
    ///
    /// # Errors
    /// Returns an error for stale or unallocated handles.
    pub fn update(&mut self, handle: FactHandle, fact: Fact) -> Result<u64> {
        self.store.validate(handle)?;
        self.memory.retract_fact(&self.network, &self.store, handle);
        let version = self.store.update(handle, fact)?;
        self.memory.insert_fact(&self.network, &self.store, handle);
        self.effects.push(EffectRecord::Updated { handle, version });
        self.apply_events();
        self.auto_fire()?;
        Ok(version)
    }

    /// Retracts a fact, returning its last value. Derived matches and their
    /// queued activations are withdrawn before this returns.
    ///
    /// # Errors
    /// Returns an error for stale or unallocated handles.
    pub fn retract(&mut self, handle: FactHandle) -> Result<Fact> {
        self.store.validate(handle)?;
        self.memory.retract_fact(&self.network, &self.store, handle);
        let fact = self.store.retract(handle)?;
        self.effects.push(EffectRecord::Retracted { handle });
        self.apply_events();
        self.auto_fire()?;
        Ok(fact)
    }

    // ------------------------------------------------------------------- //
    // Agenda control
    // ------------------------------------------------------------------- //

    /// Registers the action fired for a rule's activations.
    ///
    /// # Errors
    /// Returns an error if no rule has that name.
    pub fn on_rule(
        &mut self,
        name: &str,
        action: impl Fn(&mut Session, &Firing) -> Result<()> + 'static,
    ) -> Result<()> {
        let rule = self
            .network
            .rule_by_name(name)
            .ok_or_else(|| Error::unknown_rule(name))?;
        let index = rule.id.index();
        self.actions[index] = Some(Rc::new(action));
        Ok(())
    }

    /// Moves a group to the top of the focus stack, creating it if unknown.
    pub fn set_focus(&mut self, group: &str) {
        self.agenda.set_focus(group);
        self.effects.push(EffectRecord::FocusChanged {
            group: group.to_string(),
        });
    }

    /// Returns a group's queued rule names in firing order.
    #[must_use]
    pub fn agenda_group(&self, group: &str) -> Vec<String> {
        let activations = &self.activations;
        self.agenda
            .snapshot(group, |id| {
                activations[id.index()].state == ActivationState::Queued
            })
            .into_iter()
            .map(|id| {
                let rule = self.activations[id.index()].rule;
                self.network.rule(rule).name.clone()
            })
            .collect()
    }

    /// Asks the firing loop to stop after the current action returns.
    pub fn halt(&mut self) {
        self.halted = true;
        self.effects.push(EffectRecord::Halted);
    }

    /// Fires queued activations until every reachable group is exhausted or
    /// `halt` is called. Returns the number of activations fired.
    ///
    /// # Errors
    /// Propagates action failures and the firing kill switch; effects
    /// applied before the failure remain in place.
    pub fn fire_all_rules(&mut self) -> Result<usize> {
        self.halted = false;
        self.firing_depth += 1;
        let outcome = self.fire_loop();
        self.firing_depth -= 1;
        outcome
    }

    /// Fires until halted. Single-threaded rendition: with no other
    /// producer able to queue work, the loop also returns once the agenda
    /// is exhausted.
    ///
    /// # Errors
    /// Same failure modes as [`Session::fire_all_rules`].
    pub fn fire_until_halt(&mut self) -> Result<usize> {
        let mut total = 0;
        loop {
            let fired = self.fire_all_rules()?;
            total += fired;
            if self.halted || fired == 0 {
                return Ok(total);
            }
        }
    }

    // ------------------------------------------------------------------- //
    // Firing internals
    // ------------------------------------------------------------------- //

    fn fire_loop(&mut self) -> Result<usize> {
        self.memory.flush(&self.network, &self.store);
        self.apply_events();

        let mut fired: u64 = 0;
        while !self.halted {
            let next = {
                let activations = &self.activations;
                self.agenda
                    .next(|id| activations[id.index()].state == ActivationState::Queued)
            };
            let Some(id) = next else { break };
            if fired >= self.config.max_firings {
                // Put the popped activation back so the abort does not eat it
                let activation = &self.activations[id.index()];
                self.agenda
                    .add(&activation.group, activation.salience, activation.seq, id);
                return Err(Error::limit_exceeded(EngineLimit::MaxFirings {
                    limit: self.config.max_firings,
                }));
            }
            fired += 1;
            self.fire_one(id)?;
        }
        Ok(usize::try_from(fired).unwrap_or(usize::MAX))
    }

    fn fire_one(&mut self, id: ActivationId) -> Result<()> {
        let (rule_id, tuple, facts, aggregate, seq) = {
            let activation = &mut self.activations[id.index()];
            activation.state = ActivationState::Fired;
            (
                activation.rule,
                activation.tuple,
                activation.facts.clone(),
                activation.aggregate.clone(),
                activation.seq,
            )
        };
        self.pending.remove(&(rule_id, tuple));

        let rule = self.network.rule(rule_id);
        let name = rule.name.clone();
        let no_loop = rule.no_loop;

        // A queued activation always references live facts; retraction
        // cancels it first
        for &handle in &facts {
            if !self.store.contains(handle) {
                return Err(Error::internal("queued activation holds a stale fact").in_rule(name));
            }
        }

        self.effects.push(EffectRecord::Fired {
            rule: name.clone(),
            seq,
        });

        let Some(action) = self.actions[rule_id.index()].clone() else {
            return Ok(());
        };
        let firing = Firing {
            rule: name.clone(),
            facts: facts.clone(),
            aggregate,
        };
        // Each firing scopes its own suppression; a nested `fire_all_rules`
        // from inside the action restores the outer entry on return
        let saved = self.in_flight.take();
        if no_loop {
            self.in_flight = Some((rule_id, facts));
        }
        let outcome = action(self, &firing);
        self.in_flight = saved;
        outcome.map_err(|err| {
            if err.rule.is_some() {
                err
            } else {
                err.in_rule(name)
            }
        })
    }

    fn auto_fire(&mut self) -> Result<()> {
        if self.config.auto_fire && self.firing_depth == 0 {
            self.fire_all_rules()?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------- //
    // Terminal events → activations
    // ------------------------------------------------------------------- //

    fn apply_events(&mut self) {
        for event in self.memory.drain_events() {
            match event {
                TerminalEvent::Insert {
                    rule,
                    tuple,
                    facts,
                    aggregate,
                } => self.enqueue(rule, tuple, facts, aggregate),
                TerminalEvent::Retract { rule, tuple } => {
                    if let Some(id) = self.pending.remove(&(rule, tuple)) {
                        self.activations[id.index()].state = ActivationState::Cancelled;
                    }
                }
                TerminalEvent::Update {
                    rule,
                    tuple,
                    facts,
                    aggregate,
                } => {
                    // Refresh a queued activation in place, keeping its
                    // position; a match without one re-activates
                    if let Some(&id) = self.pending.get(&(rule, tuple)) {
                        let activation = &mut self.activations[id.index()];
                        activation.facts = facts;
                        activation.aggregate = aggregate;
                    } else {
                        self.enqueue(rule, tuple, facts, aggregate);
                    }
                }
            }
        }
    }

    fn enqueue(
        &mut self,
        rule_id: RuleId,
        tuple: TupleId,
        facts: Vec<FactHandle>,
        aggregate: Option<Value>,
    ) {
        if let Some((flight_rule, flight_facts)) = &self.in_flight {
            if *flight_rule == rule_id && *flight_facts == facts {
                return;
            }
        }

        let rule = self.network.rule(rule_id);
        let group = rule
            .agenda_group
            .clone()
            .unwrap_or_else(|| self.agenda.main().to_string());
        let salience = rule.salience;

        self.seq += 1;
        let seq = self.seq;
        let id = ActivationId(u32::try_from(self.activations.len()).expect("activation overflow"));
        self.activations.push(Activation {
            rule: rule_id,
            tuple,
            facts,
            aggregate,
            group: group.clone(),
            salience,
            seq,
            state: ActivationState::Queued,
        });
        self.pending.insert((rule_id, tuple), id);
        self.agenda.add(&group, salience, seq, id);
    }
}
