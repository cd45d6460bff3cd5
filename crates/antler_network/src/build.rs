//! Network compilation.
//!
//! The builder consumes [`RuleDef`]s and produces the compiled node arena.
//! Structurally identical prefixes are shared: alpha nodes by (type, literal
//! tests), beta nodes by (left parent, right source, tests), and whole
//! accumulate subnetworks by (left parent, adapted source, function), so a
//! subgraph referenced by several rules is built and evaluated once, with
//! per-rule result filters attached downstream of the shared node.
//!
//! All topology errors (duplicate rule names, unknown bindings, empty
//! patterns, empty subnetwork sources) are fatal here, never at evaluation
//! time.

use std::collections::{HashMap, HashSet};

use antler_foundation::{Error, Interner, Result, SymbolId};

use crate::node::{
    Aggregate, FilterTest, JoinTest, LiteralTest, Node, NodeId, NodeKind, RuleId,
};
use crate::topology::{
    AccumulateDef, AggregateDef, ConstraintDef, FactPattern, PatternDef, RuleDef,
};

/// A compiled rule: agenda settings plus its terminal node.
#[derive(Clone, Debug)]
pub struct CompiledRule {
    /// Rule index.
    pub id: RuleId,
    /// Rule name, unique within the network.
    pub name: String,
    /// Agenda group; `None` means the main group.
    pub agenda_group: Option<String>,
    /// Priority (higher fires first).
    pub salience: i32,
    /// Suppress self-reactivation caused by this rule's own action.
    pub no_loop: bool,
    /// The terminal node emitting this rule's activations.
    pub terminal: NodeId,
}

/// The compiled, immutable network topology.
///
/// Runtime state lives in [`NetworkMemory`](crate::NetworkMemory); a
/// `Network` itself is never mutated by propagation.
#[derive(Debug)]
pub struct Network {
    nodes: Vec<Node>,
    rules: Vec<CompiledRule>,
    alpha_index: HashMap<SymbolId, Vec<NodeId>>,
    seed: NodeId,
    interner: Interner,
}

impl Network {
    /// Returns the node with the given id.
    ///
    /// # Panics
    /// Panics if the id is out of range; ids are only produced by the
    /// builder, so this indicates internal misuse.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Returns all nodes in arena order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Returns all compiled rules in registration order.
    #[must_use]
    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    /// Returns the rule with the given id.
    ///
    /// # Panics
    /// Panics if the id is out of range.
    #[must_use]
    pub fn rule(&self, id: RuleId) -> &CompiledRule {
        &self.rules[id.index()]
    }

    /// Looks up a rule by name.
    #[must_use]
    pub fn rule_by_name(&self, name: &str) -> Option<&CompiledRule> {
        self.rules.iter().find(|rule| rule.name == name)
    }

    /// Returns the alpha nodes receiving facts of the given type.
    #[must_use]
    pub fn alpha_nodes_for(&self, fact_type: SymbolId) -> &[NodeId] {
        self.alpha_index
            .get(&fact_type)
            .map_or(&[], Vec::as_slice)
    }

    /// Returns the seed node at the root of every beta chain.
    #[must_use]
    pub const fn seed(&self) -> NodeId {
        self.seed
    }

    /// Returns the interner holding type and field names.
    #[must_use]
    pub const fn interner(&self) -> &Interner {
        &self.interner
    }

    /// Returns the interner mutably, for interning names at runtime.
    pub fn interner_mut(&mut self) -> &mut Interner {
        &mut self.interner
    }
}

/// Structural identity of a node, used for sharing.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum ShareKey {
    Alpha {
        fact_type: SymbolId,
        tests: Vec<LiteralTest>,
    },
    Join {
        left: NodeId,
        right: NodeId,
        tests: Vec<JoinTest>,
    },
    Not {
        left: NodeId,
        right: NodeId,
        tests: Vec<JoinTest>,
    },
    Exists {
        left: NodeId,
        right: NodeId,
        tests: Vec<JoinTest>,
    },
    Accumulate {
        left: NodeId,
        right: NodeId,
        aggregate: Aggregate,
    },
    Adapter {
        left: NodeId,
    },
    Filter {
        left: NodeId,
        tests: Vec<FilterTest>,
    },
}

/// Bindings visible while compiling one chain: name → (chain level, field).
type Scope = HashMap<String, (u32, SymbolId)>;

/// Compiles rule definitions into a shared [`Network`].
#[derive(Debug, Default)]
pub struct NetworkBuilder {
    nodes: Vec<Node>,
    rules: Vec<CompiledRule>,
    alpha_index: HashMap<SymbolId, Vec<NodeId>>,
    share: HashMap<ShareKey, NodeId>,
    names: HashSet<String>,
    interner: Interner,
}

impl NetworkBuilder {
    /// Creates a builder with an empty network.
    #[must_use]
    pub fn new() -> Self {
        let mut builder = Self::default();
        builder.nodes.push(Node::new(NodeId(0), NodeKind::Seed));
        builder
    }

    /// Registers a rule.
    ///
    /// # Errors
    /// Returns a topology error for duplicate names, empty patterns, empty
    /// subnetwork sources, or unknown bindings.
    pub fn rule(&mut self, def: RuleDef) -> Result<RuleId> {
        if !self.names.insert(def.name.clone()) {
            return Err(Error::duplicate_rule(def.name));
        }
        self.compile_rule(&def)
            .map_err(|err| err.in_rule(def.name.clone()))
    }

    /// Finishes the build, producing the network.
    #[must_use]
    pub fn build(self) -> Network {
        Network {
            nodes: self.nodes,
            rules: self.rules,
            alpha_index: self.alpha_index,
            seed: NodeId(0),
            interner: self.interner,
        }
    }

    fn compile_rule(&mut self, def: &RuleDef) -> Result<RuleId> {
        if def.patterns.is_empty() {
            return Err(Error::empty_pattern());
        }

        let mut scope = Scope::new();
        let mut current = NodeId(0);
        let mut level = 0u32;

        for pattern in &def.patterns {
            current = match pattern {
                PatternDef::Fact(fp) => self.join_for(fp, current, &mut scope, &mut level)?,
                PatternDef::Not(source) => self.gate_for(source, current, &scope, false)?,
                PatternDef::Exists(source) => self.gate_for(source, current, &scope, true)?,
                PatternDef::Accumulate(acc) => self.accumulate_for(acc, current)?,
                PatternDef::Guard(pass) => {
                    self.shared_node(ShareKey::Filter {
                        left: current,
                        tests: vec![FilterTest::Const(*pass)],
                    })
                }
            };
        }

        let rule_id = RuleId(u32::try_from(self.rules.len()).expect("rule overflow"));
        let terminal = self.new_node(NodeKind::Terminal { rule: rule_id }, Some(current), None);
        self.rules.push(CompiledRule {
            id: rule_id,
            name: def.name.clone(),
            agenda_group: def.agenda_group.clone(),
            salience: def.salience,
            no_loop: def.no_loop,
            terminal,
        });
        Ok(rule_id)
    }

    /// Compiles one fact pattern into a join on the current chain.
    fn join_for(
        &mut self,
        pattern: &FactPattern,
        left: NodeId,
        scope: &mut Scope,
        level: &mut u32,
    ) -> Result<NodeId> {
        let alpha = self.alpha_node(pattern);
        let tests = self.join_tests(pattern, scope)?;
        let node = self.shared_node(ShareKey::Join {
            left,
            right: alpha,
            tests,
        });

        for (name, field) in &pattern.bindings {
            let field = self.interner.intern(field);
            scope.insert(name.clone(), (*level, field));
        }
        *level += 1;
        Ok(node)
    }

    /// Compiles a not/exists group. A single pattern joins directly against
    /// its alpha memory; a multi-pattern group compiles to a subnetwork
    /// behind a right-input adapter.
    fn gate_for(
        &mut self,
        source: &[FactPattern],
        left: NodeId,
        outer_scope: &Scope,
        exists: bool,
    ) -> Result<NodeId> {
        let (right, tests) = match source {
            [] => return Err(Error::empty_subnetwork()),
            [single] => {
                let alpha = self.alpha_node(single);
                let tests = self.join_tests(single, outer_scope)?;
                (alpha, tests)
            }
            _ => {
                let tail = self.compile_chain(source)?.0;
                let adapter = self.shared_node(ShareKey::Adapter { left: tail });
                (adapter, Vec::new())
            }
        };

        let key = if exists {
            ShareKey::Exists { left, right, tests }
        } else {
            ShareKey::Not { left, right, tests }
        };
        Ok(self.shared_node(key))
    }

    /// Compiles an accumulate pattern; the subnetwork, adapter, and
    /// accumulate node are shared, the result filter is per consumer.
    fn accumulate_for(&mut self, acc: &AccumulateDef, left: NodeId) -> Result<NodeId> {
        if acc.source.is_empty() {
            return Err(Error::empty_subnetwork());
        }

        let (tail, sub_scope) = self.compile_chain(&acc.source)?;
        let aggregate = self.compile_aggregate(&acc.function, &sub_scope)?;
        let adapter = self.shared_node(ShareKey::Adapter { left: tail });
        let mut node = self.shared_node(ShareKey::Accumulate {
            left,
            right: adapter,
            aggregate,
        });

        if !acc.result.is_empty() {
            let tests = acc
                .result
                .iter()
                .map(|(op, value)| FilterTest::Result {
                    op: *op,
                    value: value.clone(),
                })
                .collect();
            node = self.shared_node(ShareKey::Filter { left: node, tests });
        }
        Ok(node)
    }

    /// Compiles a chain of fact patterns rooted at the seed, returning the
    /// tail node and the bindings declared along the chain.
    fn compile_chain(&mut self, patterns: &[FactPattern]) -> Result<(NodeId, Scope)> {
        let mut scope = Scope::new();
        let mut current = NodeId(0);
        let mut level = 0u32;
        for pattern in patterns {
            current = self.join_for(pattern, current, &mut scope, &mut level)?;
        }
        Ok((current, scope))
    }

    fn compile_aggregate(&mut self, function: &AggregateDef, scope: &Scope) -> Result<Aggregate> {
        let resolve = |binding: &String| -> Result<(u32, SymbolId)> {
            scope
                .get(binding)
                .copied()
                .ok_or_else(|| Error::unknown_binding(binding.clone()))
        };
        Ok(match function {
            AggregateDef::Count => Aggregate::Count,
            AggregateDef::Sum { binding } => {
                let (level, field) = resolve(binding)?;
                Aggregate::Sum { level, field }
            }
            AggregateDef::Min { binding } => {
                let (level, field) = resolve(binding)?;
                Aggregate::Min { level, field }
            }
            AggregateDef::Max { binding } => {
                let (level, field) = resolve(binding)?;
                Aggregate::Max { level, field }
            }
        })
    }

    /// Resolves a pattern's bound constraints against the given scope.
    fn join_tests(&mut self, pattern: &FactPattern, scope: &Scope) -> Result<Vec<JoinTest>> {
        let mut tests = Vec::new();
        for constraint in &pattern.constraints {
            if let ConstraintDef::Bound { field, op, binding } = constraint {
                let (level, source_field) = scope
                    .get(binding)
                    .copied()
                    .ok_or_else(|| Error::unknown_binding(binding.clone()))?;
                tests.push(JoinTest {
                    field: self.interner.intern(field),
                    op: *op,
                    level,
                    source_field,
                });
            }
        }
        Ok(tests)
    }

    /// Returns the shared alpha node for a pattern's type and literal tests.
    fn alpha_node(&mut self, pattern: &FactPattern) -> NodeId {
        let fact_type = self.interner.intern(&pattern.object_type);
        let mut tests = Vec::new();
        for constraint in &pattern.constraints {
            if let ConstraintDef::Literal { field, op, value } = constraint {
                tests.push(LiteralTest {
                    field: self.interner.intern(field),
                    op: *op,
                    value: value.clone(),
                });
            }
        }

        let key = ShareKey::Alpha {
            fact_type,
            tests: tests.clone(),
        };
        if let Some(&id) = self.share.get(&key) {
            return id;
        }
        let id = self.push_node(NodeKind::Alpha { fact_type, tests }, None, None);
        self.share.insert(key, id);
        self.alpha_index.entry(fact_type).or_default().push(id);
        id
    }

    /// Returns the existing node for a structural key, or creates it.
    fn shared_node(&mut self, key: ShareKey) -> NodeId {
        if let Some(&id) = self.share.get(&key) {
            return id;
        }
        let (kind, left, right) = match &key {
            ShareKey::Alpha { .. } => unreachable!("alpha nodes go through alpha_node"),
            ShareKey::Join { left, right, tests } => (
                NodeKind::Join {
                    tests: tests.clone(),
                },
                Some(*left),
                Some(*right),
            ),
            ShareKey::Not { left, right, tests } => (
                NodeKind::Not {
                    tests: tests.clone(),
                },
                Some(*left),
                Some(*right),
            ),
            ShareKey::Exists { left, right, tests } => (
                NodeKind::Exists {
                    tests: tests.clone(),
                },
                Some(*left),
                Some(*right),
            ),
            ShareKey::Accumulate {
                left,
                right,
                aggregate,
            } => (
                NodeKind::Accumulate {
                    aggregate: aggregate.clone(),
                },
                Some(*left),
                Some(*right),
            ),
            ShareKey::Adapter { left } => (NodeKind::Adapter, Some(*left), None),
            ShareKey::Filter { left, tests } => (
                NodeKind::Filter {
                    tests: tests.clone(),
                },
                Some(*left),
                None,
            ),
        };
        let id = self.push_node(kind, left, right);
        self.share.insert(key, id);
        id
    }

    /// Allocates a never-shared node (terminals).
    fn new_node(
        &mut self,
        kind: NodeKind,
        left_parent: Option<NodeId>,
        right_source: Option<NodeId>,
    ) -> NodeId {
        self.push_node(kind, left_parent, right_source)
    }

    fn push_node(
        &mut self,
        kind: NodeKind,
        left_parent: Option<NodeId>,
        right_source: Option<NodeId>,
    ) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).expect("node overflow"));
        let mut node = Node::new(id, kind);
        node.left_parent = left_parent;
        node.right_source = right_source;
        self.nodes.push(node);

        if let Some(parent) = left_parent {
            self.nodes[parent.index()].children.push(id);
        }
        if let Some(source) = right_source {
            self.nodes[source.index()].right_children.push(id);
        }
        id
    }
}
