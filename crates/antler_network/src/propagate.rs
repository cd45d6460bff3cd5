//! Incremental propagation through the compiled network.
//!
//! [`NetworkMemory`] holds all mutable evaluation state for one session:
//! per-node memories, the tuple arena, the dirty queue of accumulate nodes
//! with staged deltas, and the pending terminal events. Fact insertion and
//! retraction push changes through the node graph immediately; accumulate
//! results are the exception and are staged, then folded in by a single
//! flush per propagation pass. A flush on an unlinked node is a no-op: the
//! staged state stays consistent and is materialized once a left input
//! arrives.
//!
//! Deletion is transitive. Freeing a tuple first frees every tuple derived
//! from it, then tells each consumer node to drop its bookkeeping for it,
//! so no node is ever left holding a stale id.

use antler_foundation::{FactHandle, Value};
use antler_store::FactStore;

use crate::build::Network;
use crate::memory::{
    AccumulateMemory, AlphaMemory, BetaMemory, NodeMemory, RightElem,
};
use crate::node::{Aggregate, FilterTest, JoinTest, NodeId, NodeKind, RequiredInputs, RuleId};
use crate::tuple::{Tuple, TupleId, TupleStore};

/// A change at a terminal node, drained by the agenda after each pass.
///
/// Fact chains and aggregate results are snapshotted at emission time
/// because the underlying tuple can be created and freed within a single
/// pass.
#[derive(Clone, Debug)]
pub enum TerminalEvent {
    /// A complete match appeared.
    Insert {
        /// Rule whose terminal emitted the event.
        rule: RuleId,
        /// Identity of the matched tuple.
        tuple: TupleId,
        /// Fact chain at emission time, in pattern declaration order.
        facts: Vec<FactHandle>,
        /// Aggregate result carried by the tuple, if any.
        aggregate: Option<Value>,
    },
    /// A previously emitted match disappeared.
    Retract {
        /// Rule whose terminal emitted the event.
        rule: RuleId,
        /// Identity of the tuple that vanished.
        tuple: TupleId,
    },
    /// A match's aggregate result changed without the match being recreated.
    Update {
        /// Rule whose terminal emitted the event.
        rule: RuleId,
        /// Identity of the still-live tuple.
        tuple: TupleId,
        /// Fact chain at emission time.
        facts: Vec<FactHandle>,
        /// The new aggregate result.
        aggregate: Option<Value>,
    },
}

/// All mutable evaluation state of one network instance.
#[derive(Debug)]
pub struct NetworkMemory {
    memories: Vec<NodeMemory>,
    tuples: TupleStore,
    /// Accumulate nodes with staged deltas, in marking order.
    dirty: Vec<NodeId>,
    events: Vec<TerminalEvent>,
}

impl NetworkMemory {
    /// Creates the evaluation state for a compiled network and runs the
    /// initial propagation of the seed tuple. Rules whose conditions hold
    /// over an empty store (negations, zero-count accumulates) emit their
    /// first events here.
    #[must_use]
    pub fn new(net: &Network, store: &FactStore) -> Self {
        let memories = net
            .nodes()
            .iter()
            .map(|node| match &node.kind {
                NodeKind::Alpha { .. } => NodeMemory::Alpha(AlphaMemory::default()),
                NodeKind::Seed
                | NodeKind::Join { .. }
                | NodeKind::Not { .. }
                | NodeKind::Exists { .. }
                | NodeKind::Filter { .. } => NodeMemory::Beta(BetaMemory::default()),
                NodeKind::Accumulate { aggregate } => {
                    NodeMemory::Accumulate(AccumulateMemory::new(aggregate))
                }
                NodeKind::Adapter | NodeKind::Terminal { .. } => NodeMemory::None,
            })
            .collect();

        let mut memory = Self {
            memories,
            tuples: TupleStore::new(),
            dirty: Vec::new(),
            events: Vec::new(),
        };

        let seed = net.seed();
        let seed_tuple = memory.tuples.alloc(Tuple {
            node: seed,
            parent: None,
            fact: None,
            chain: im::Vector::new(),
            aggregate: None,
            children: Vec::new(),
        });
        memory.beta_mut(seed).outs.push(seed_tuple);
        for child in net.node(seed).children.clone() {
            memory.left_insert(net, store, child, seed_tuple);
        }
        memory.flush_dirty(net, store);
        memory
    }

    /// Propagates a newly inserted fact. The fact must already be in the
    /// store. Staged accumulate deltas are flushed before returning.
    pub fn insert_fact(&mut self, net: &Network, store: &FactStore, handle: FactHandle) {
        let Ok(fact) = store.get(handle) else {
            return;
        };
        for alpha in net.alpha_nodes_for(fact.fact_type()).to_vec() {
            let NodeKind::Alpha { tests, .. } = &net.node(alpha).kind else {
                continue;
            };
            if !tests
                .iter()
                .all(|test| test.op.eval(&fact.get(test.field), &test.value))
            {
                continue;
            }
            self.alpha_mut(alpha).facts.push(handle);
            for consumer in net.node(alpha).right_children.clone() {
                self.right_insert(net, store, consumer, RightElem::Fact(handle));
            }
        }
        self.flush_dirty(net, store);
    }

    /// Propagates the retraction of a fact. The fact must still be in the
    /// store while this runs; the caller removes it afterwards.
    pub fn retract_fact(&mut self, net: &Network, store: &FactStore, handle: FactHandle) {
        let Ok(fact) = store.get(handle) else {
            return;
        };
        for alpha in net.alpha_nodes_for(fact.fact_type()).to_vec() {
            let mem = self.alpha_mut(alpha);
            let Some(pos) = mem.facts.iter().position(|&f| f == handle) else {
                continue;
            };
            mem.facts.remove(pos);
            for consumer in net.node(alpha).right_children.clone() {
                self.right_retract(net, store, consumer, RightElem::Fact(handle));
            }
        }
        self.flush_dirty(net, store);
    }

    /// Flushes any staged accumulate deltas. Normally a no-op since insert
    /// and retract flush before returning.
    pub fn flush(&mut self, net: &Network, store: &FactStore) {
        self.flush_dirty(net, store);
    }

    /// Takes the terminal events emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<TerminalEvent> {
        std::mem::take(&mut self.events)
    }

    /// Returns whether a node's required inputs are populated.
    ///
    /// An unlinked node holds no output and skips its flush; only linked
    /// nodes do work.
    #[must_use]
    pub fn is_linked(&self, net: &Network, id: NodeId) -> bool {
        let node = net.node(id);
        match node.kind.required_inputs() {
            RequiredInputs::None => true,
            RequiredInputs::Left => self.left_outs(net, id).is_some_and(|outs| !outs.is_empty()),
            RequiredInputs::Both => {
                self.left_outs(net, id).is_some_and(|outs| !outs.is_empty())
                    && !self.beta(id).rights.is_empty()
            }
        }
    }

    /// Returns a tuple's fact chain if the tuple is still live.
    #[must_use]
    pub fn tuple_chain(&self, id: TupleId) -> Option<Vec<FactHandle>> {
        self.tuples
            .get(id)
            .map(|tuple| tuple.chain.iter().copied().collect())
    }

    /// Returns a tuple's aggregate result if the tuple is still live.
    #[must_use]
    pub fn tuple_aggregate(&self, id: TupleId) -> Option<Value> {
        self.tuples.get(id).and_then(|tuple| tuple.aggregate.clone())
    }

    /// Returns the number of live tuples.
    #[must_use]
    pub fn tuple_count(&self) -> usize {
        self.tuples.len()
    }

    /// Returns a node's output tuples.
    #[must_use]
    pub fn node_outs(&self, id: NodeId) -> &[TupleId] {
        self.memories[id.index()].outs()
    }

    // ------------------------------------------------------------------- //
    // Memory accessors
    // ------------------------------------------------------------------- //

    fn beta(&self, id: NodeId) -> &BetaMemory {
        match &self.memories[id.index()] {
            NodeMemory::Beta(mem) => mem,
            _ => panic!("node {id:?} has no beta memory"),
        }
    }

    fn beta_mut(&mut self, id: NodeId) -> &mut BetaMemory {
        match &mut self.memories[id.index()] {
            NodeMemory::Beta(mem) => mem,
            _ => panic!("node {id:?} has no beta memory"),
        }
    }

    fn alpha_mut(&mut self, id: NodeId) -> &mut AlphaMemory {
        match &mut self.memories[id.index()] {
            NodeMemory::Alpha(mem) => mem,
            _ => panic!("node {id:?} has no alpha memory"),
        }
    }

    fn acc(&self, id: NodeId) -> &AccumulateMemory {
        match &self.memories[id.index()] {
            NodeMemory::Accumulate(mem) => mem,
            _ => panic!("node {id:?} has no accumulate memory"),
        }
    }

    fn acc_mut(&mut self, id: NodeId) -> &mut AccumulateMemory {
        match &mut self.memories[id.index()] {
            NodeMemory::Accumulate(mem) => mem,
            _ => panic!("node {id:?} has no accumulate memory"),
        }
    }

    /// Output tuples of a node's left parent.
    fn left_outs<'a>(&'a self, net: &Network, id: NodeId) -> Option<&'a [TupleId]> {
        let parent = net.node(id).left_parent?;
        Some(self.memories[parent.index()].outs())
    }

    /// The tuple derived from `parent` at `node`, if one exists.
    fn derived_child(&self, parent: TupleId, node: NodeId) -> Option<TupleId> {
        let tuple = self.tuples.get(parent)?;
        tuple
            .children
            .iter()
            .copied()
            .find(|&child| self.tuples.get(child).is_some_and(|t| t.node == node))
    }

    // ------------------------------------------------------------------- //
    // Right input
    // ------------------------------------------------------------------- //

    fn right_insert(&mut self, net: &Network, store: &FactStore, id: NodeId, elem: RightElem) {
        match &net.node(id).kind {
            NodeKind::Join { tests } => {
                let tests = tests.clone();
                self.beta_mut(id).rights.push(elem);
                let RightElem::Fact(handle) = elem else {
                    return;
                };
                let lefts = self.left_outs(net, id).map_or_else(Vec::new, <[_]>::to_vec);
                for left in lefts {
                    let Some(tuple) = self.tuples.get(left) else {
                        continue;
                    };
                    if join_match(store, &tests, handle, &tuple.chain.clone()) {
                        self.emit_join(net, store, id, left, handle);
                    }
                }
            }
            NodeKind::Not { tests } | NodeKind::Exists { tests } => {
                let exists = matches!(net.node(id).kind, NodeKind::Exists { .. });
                let tests = tests.clone();
                self.beta_mut(id).rights.push(elem);
                let lefts = self.left_outs(net, id).map_or_else(Vec::new, <[_]>::to_vec);
                for left in lefts {
                    let Some(tuple) = self.tuples.get(left) else {
                        continue;
                    };
                    if !elem_match(store, &tests, elem, &tuple.chain.clone()) {
                        continue;
                    }
                    let mem = self.beta_mut(id);
                    let count = mem.counts.entry(left).or_insert(0);
                    *count += 1;
                    let first = *count == 1;
                    if !first {
                        continue;
                    }
                    if exists {
                        self.emit_passthrough(net, store, id, left);
                    } else if let Some(out) = self.derived_child(left, id) {
                        self.delete_subtree(net, store, out);
                    }
                }
            }
            NodeKind::Accumulate { aggregate } => {
                let RightElem::Tuple(source) = elem else {
                    return;
                };
                let input = self
                    .tuples
                    .get(source)
                    .and_then(|tuple| aggregate_input(store, aggregate, &tuple.chain));
                let mem = self.acc_mut(id);
                mem.state.insert(input.as_ref());
                mem.elems.push((source, input));
                mem.staged = true;
                self.mark_dirty(id);
            }
            _ => {}
        }
    }

    fn right_retract(&mut self, net: &Network, store: &FactStore, id: NodeId, elem: RightElem) {
        match &net.node(id).kind {
            NodeKind::Join { .. } => {
                let mem = self.beta_mut(id);
                if let Some(pos) = mem.rights.iter().position(|&e| e == elem) {
                    mem.rights.remove(pos);
                }
                let RightElem::Fact(handle) = elem else {
                    return;
                };
                let outs = self.beta(id).outs.clone();
                for out in outs {
                    if self
                        .tuples
                        .get(out)
                        .is_some_and(|tuple| tuple.fact == Some(handle))
                    {
                        self.delete_subtree(net, store, out);
                    }
                }
            }
            NodeKind::Not { tests } | NodeKind::Exists { tests } => {
                let exists = matches!(net.node(id).kind, NodeKind::Exists { .. });
                let tests = tests.clone();
                let mem = self.beta_mut(id);
                if let Some(pos) = mem.rights.iter().position(|&e| e == elem) {
                    mem.rights.remove(pos);
                }
                let lefts = self.left_outs(net, id).map_or_else(Vec::new, <[_]>::to_vec);
                for left in lefts {
                    let Some(tuple) = self.tuples.get(left) else {
                        continue;
                    };
                    if !elem_match(store, &tests, elem, &tuple.chain.clone()) {
                        continue;
                    }
                    let mem = self.beta_mut(id);
                    let Some(count) = mem.counts.get_mut(&left) else {
                        continue;
                    };
                    *count -= 1;
                    let last = *count == 0;
                    if !last {
                        continue;
                    }
                    if exists {
                        if let Some(out) = self.derived_child(left, id) {
                            self.delete_subtree(net, store, out);
                        }
                    } else {
                        self.emit_passthrough(net, store, id, left);
                    }
                }
            }
            NodeKind::Accumulate { .. } => {
                let RightElem::Tuple(source) = elem else {
                    return;
                };
                let mem = self.acc_mut(id);
                if let Some(pos) = mem.elems.iter().position(|(t, _)| *t == source) {
                    let (_, input) = mem.elems.remove(pos);
                    mem.state.remove(input.as_ref());
                    mem.staged = true;
                    self.mark_dirty(id);
                }
            }
            _ => {}
        }
    }

    // ------------------------------------------------------------------- //
    // Left input
    // ------------------------------------------------------------------- //

    /// Feeds a parent's output tuple into one consumer node.
    fn left_insert(&mut self, net: &Network, store: &FactStore, id: NodeId, left: TupleId) {
        match &net.node(id).kind {
            NodeKind::Join { tests } => {
                let tests = tests.clone();
                let rights = self.beta(id).rights.clone();
                for elem in rights {
                    let RightElem::Fact(handle) = elem else {
                        continue;
                    };
                    let Some(tuple) = self.tuples.get(left) else {
                        return;
                    };
                    if join_match(store, &tests, handle, &tuple.chain.clone()) {
                        self.emit_join(net, store, id, left, handle);
                    }
                }
            }
            NodeKind::Not { tests } | NodeKind::Exists { tests } => {
                let exists = matches!(net.node(id).kind, NodeKind::Exists { .. });
                let tests = tests.clone();
                let Some(tuple) = self.tuples.get(left) else {
                    return;
                };
                let chain = tuple.chain.clone();
                let matches = self
                    .beta(id)
                    .rights
                    .clone()
                    .into_iter()
                    .filter(|&elem| elem_match(store, &tests, elem, &chain))
                    .count();
                let count = u32::try_from(matches).unwrap_or(u32::MAX);
                self.beta_mut(id).counts.insert(left, count);
                if (count > 0) == exists {
                    self.emit_passthrough(net, store, id, left);
                }
            }
            NodeKind::Accumulate { .. } => {
                self.acc_mut(id).lefts.push(left);
                self.mark_dirty(id);
            }
            NodeKind::Filter { tests } => {
                let Some(tuple) = self.tuples.get(left) else {
                    return;
                };
                if filter_pass(tests, tuple.aggregate.as_ref()) {
                    self.emit_passthrough(net, store, id, left);
                }
            }
            NodeKind::Adapter => {
                for consumer in net.node(id).right_children.clone() {
                    self.right_insert(net, store, consumer, RightElem::Tuple(left));
                }
            }
            NodeKind::Terminal { rule } => {
                let rule = *rule;
                let Some(tuple) = self.tuples.get(left) else {
                    return;
                };
                self.events.push(TerminalEvent::Insert {
                    rule,
                    tuple: left,
                    facts: tuple.chain.iter().copied().collect(),
                    aggregate: tuple.aggregate.clone(),
                });
            }
            NodeKind::Alpha { .. } | NodeKind::Seed => {}
        }
    }

    /// Creates a join output tuple extending `left` with `handle` and
    /// propagates it to the node's consumers.
    fn emit_join(
        &mut self,
        net: &Network,
        store: &FactStore,
        id: NodeId,
        left: TupleId,
        handle: FactHandle,
    ) {
        let Some(parent) = self.tuples.get(left) else {
            return;
        };
        let mut chain = parent.chain.clone();
        chain.push_back(handle);
        let tuple = Tuple {
            node: id,
            parent: Some(left),
            fact: Some(handle),
            chain,
            aggregate: parent.aggregate.clone(),
            children: Vec::new(),
        };
        self.emit(net, store, id, tuple);
    }

    /// Creates a pass-through tuple sharing `left`'s chain and aggregate.
    fn emit_passthrough(&mut self, net: &Network, store: &FactStore, id: NodeId, left: TupleId) {
        let Some(parent) = self.tuples.get(left) else {
            return;
        };
        let tuple = Tuple {
            node: id,
            parent: Some(left),
            fact: None,
            chain: parent.chain.clone(),
            aggregate: parent.aggregate.clone(),
            children: Vec::new(),
        };
        self.emit(net, store, id, tuple);
    }

    /// Registers a freshly built output tuple and propagates it downstream.
    fn emit(&mut self, net: &Network, store: &FactStore, id: NodeId, tuple: Tuple) {
        let parent = tuple.parent;
        let out = self.tuples.alloc(tuple);
        if let Some(parent) = parent {
            self.tuples.attach_child(parent, out);
        }
        match &mut self.memories[id.index()] {
            NodeMemory::Beta(mem) => mem.outs.push(out),
            NodeMemory::Accumulate(mem) => mem.outs.push(out),
            NodeMemory::None | NodeMemory::Alpha(_) => {}
        }
        for child in net.node(id).children.clone() {
            self.left_insert(net, store, child, out);
        }
    }

    // ------------------------------------------------------------------- //
    // Deletion
    // ------------------------------------------------------------------- //

    /// Frees a tuple and everything derived from it, cleaning every
    /// consumer's bookkeeping along the way.
    fn delete_subtree(&mut self, net: &Network, store: &FactStore, id: TupleId) {
        let Some(tuple) = self.tuples.get(id) else {
            return;
        };
        let node = tuple.node;
        let parent = tuple.parent;
        let children = tuple.children.clone();

        for child in children {
            self.delete_subtree(net, store, child);
        }

        // Tell each consumer of this node's output that the tuple is gone
        for consumer in net.node(node).children.clone() {
            match &net.node(consumer).kind {
                NodeKind::Not { .. } | NodeKind::Exists { .. } => {
                    self.beta_mut(consumer).counts.remove(&id);
                }
                NodeKind::Accumulate { .. } => {
                    let mem = self.acc_mut(consumer);
                    mem.lefts.retain(|&left| left != id);
                    mem.results.remove(&id);
                }
                NodeKind::Adapter => {
                    for target in net.node(consumer).right_children.clone() {
                        self.right_retract(net, store, target, RightElem::Tuple(id));
                    }
                }
                NodeKind::Terminal { rule } => {
                    self.events.push(TerminalEvent::Retract {
                        rule: *rule,
                        tuple: id,
                    });
                }
                _ => {}
            }
        }

        match &mut self.memories[node.index()] {
            NodeMemory::Beta(mem) => mem.outs.retain(|&out| out != id),
            NodeMemory::Accumulate(mem) => mem.outs.retain(|&out| out != id),
            NodeMemory::None | NodeMemory::Alpha(_) => {}
        }
        if let Some(parent) = parent {
            self.tuples.detach_child(parent, id);
        }
        self.tuples.free(id);
    }

    // ------------------------------------------------------------------- //
    // Accumulate flush
    // ------------------------------------------------------------------- //

    fn mark_dirty(&mut self, id: NodeId) {
        if !self.dirty.contains(&id) {
            self.dirty.push(id);
        }
    }

    /// Folds staged deltas into result rows, one flush per dirty node per
    /// pass. Unlinked nodes are skipped; their staged state is picked up by
    /// the flush that runs once a left input arrives.
    fn flush_dirty(&mut self, net: &Network, store: &FactStore) {
        while !self.dirty.is_empty() {
            for id in std::mem::take(&mut self.dirty) {
                if self.is_linked(net, id) {
                    self.flush_accumulate(net, store, id);
                } else {
                    self.acc_mut(id).staged = false;
                }
            }
        }
    }

    fn flush_accumulate(&mut self, net: &Network, store: &FactStore, id: NodeId) {
        let mem = self.acc_mut(id);
        let value = mem.state.value();
        let staged = mem.staged;
        mem.staged = false;
        let lefts = mem.lefts.clone();

        for left in lefts {
            if let Some(&row) = self.acc(id).results.get(&left) {
                if staged {
                    self.refresh_aggregate(net, store, row, value.clone());
                }
            } else {
                let Some(parent) = self.tuples.get(left) else {
                    continue;
                };
                let tuple = Tuple {
                    node: id,
                    parent: Some(left),
                    fact: None,
                    chain: parent.chain.clone(),
                    aggregate: Some(value.clone()),
                    children: Vec::new(),
                };
                let parent_id = left;
                let row = self.tuples.alloc(tuple);
                self.tuples.attach_child(parent_id, row);
                self.acc_mut(id).outs.push(row);
                self.acc_mut(id).results.insert(left, row);
                for child in net.node(id).children.clone() {
                    self.left_insert(net, store, child, row);
                }
            }
        }
    }

    /// Rewrites a live tuple's aggregate result in place and pushes the
    /// change downstream: descendants inherit the new value, filters
    /// re-evaluate (possibly creating or deleting their output), and
    /// terminals emit update events instead of retract/insert pairs.
    fn refresh_aggregate(&mut self, net: &Network, store: &FactStore, id: TupleId, value: Value) {
        let Some(tuple) = self.tuples.get_mut(id) else {
            return;
        };
        tuple.aggregate = Some(value.clone());
        let node = tuple.node;
        let children = tuple.children.clone();
        let chain: Vec<FactHandle> = tuple.chain.iter().copied().collect();

        for child in children {
            let Some(child_tuple) = self.tuples.get(child) else {
                continue;
            };
            let child_node = child_tuple.node;
            if let NodeKind::Filter { tests } = &net.node(child_node).kind {
                if !filter_pass(tests, Some(&value)) {
                    self.delete_subtree(net, store, child);
                    continue;
                }
            }
            self.refresh_aggregate(net, store, child, value.clone());
        }

        for consumer in net.node(node).children.clone() {
            match &net.node(consumer).kind {
                NodeKind::Terminal { rule } => {
                    self.events.push(TerminalEvent::Update {
                        rule: *rule,
                        tuple: id,
                        facts: chain.clone(),
                        aggregate: Some(value.clone()),
                    });
                }
                NodeKind::Filter { tests } => {
                    // A filter that previously rejected the tuple may pass now
                    if self.derived_child(id, consumer).is_none()
                        && filter_pass(tests, Some(&value))
                    {
                        self.emit_passthrough(net, store, consumer, id);
                    }
                }
                _ => {}
            }
        }
    }
}

// ----------------------------------------------------------------------- //
// Test evaluation
// ----------------------------------------------------------------------- //

fn field_value(store: &FactStore, handle: FactHandle, field: antler_foundation::SymbolId) -> Value {
    store.get(handle).map_or(Value::Nil, |fact| fact.get(field))
}

fn join_match(
    store: &FactStore,
    tests: &[JoinTest],
    handle: FactHandle,
    chain: &im::Vector<FactHandle>,
) -> bool {
    tests.iter().all(|test| {
        let Some(&source) = chain.get(test.level as usize) else {
            return false;
        };
        let left = field_value(store, handle, test.field);
        let right = field_value(store, source, test.source_field);
        test.op.eval(&left, &right)
    })
}

/// Matches a right element against a left chain. Adapted subnetwork tuples
/// carry their constraints inside the subnetwork, so they match
/// unconditionally.
fn elem_match(
    store: &FactStore,
    tests: &[JoinTest],
    elem: RightElem,
    chain: &im::Vector<FactHandle>,
) -> bool {
    match elem {
        RightElem::Fact(handle) => join_match(store, tests, handle, chain),
        RightElem::Tuple(_) => true,
    }
}

fn filter_pass(tests: &[FilterTest], aggregate: Option<&Value>) -> bool {
    tests.iter().all(|test| match test {
        FilterTest::Const(pass) => *pass,
        FilterTest::Result { op, value } => {
            let left = aggregate.cloned().unwrap_or(Value::Nil);
            op.eval(&left, value)
        }
    })
}

fn aggregate_input(
    store: &FactStore,
    aggregate: &Aggregate,
    chain: &im::Vector<FactHandle>,
) -> Option<Value> {
    let (level, field) = aggregate.input()?;
    let handle = *chain.get(level as usize)?;
    Some(field_value(store, handle, field))
}
