//! Compiled network nodes.
//!
//! The network is an arena of nodes addressed by stable [`NodeId`] indices;
//! edges are index pairs and no node is ever deep-copied. Node kind is a
//! tagged variant so link-state requirements can be expressed uniformly
//! (see [`NodeKind::required_inputs`]).

use std::fmt;

use antler_foundation::{SymbolId, Value};

use crate::topology::CmpOp;

/// Index of a node in the network arena.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Returns the raw arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// Index of a compiled rule in the network.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct RuleId(pub(crate) u32);

impl RuleId {
    /// Returns the raw rule index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RuleId({})", self.0)
    }
}

/// A compiled literal constraint, evaluated in the alpha network.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LiteralTest {
    /// Field on the candidate fact.
    pub field: SymbolId,
    /// Comparison operator.
    pub op: CmpOp,
    /// Literal right-hand side.
    pub value: Value,
}

/// A compiled join test between a right-input fact and the left tuple.
///
/// Evaluates `fact.field op chain[level].source_field`, where `chain` is the
/// left tuple's fact chain in declaration order.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct JoinTest {
    /// Field on the right-input fact.
    pub field: SymbolId,
    /// Comparison operator.
    pub op: CmpOp,
    /// Index into the left tuple's fact chain.
    pub level: u32,
    /// Field on the chain fact supplying the bound value.
    pub source_field: SymbolId,
}

/// A compiled test applied by a filter node.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FilterTest {
    /// Constant guard.
    Const(bool),
    /// Compare the tuple's aggregate result against a literal.
    Result {
        /// Comparison operator.
        op: CmpOp,
        /// Literal right-hand side.
        value: Value,
    },
}

/// A compiled aggregate function.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Aggregate {
    /// Count of source tuples.
    Count,
    /// Sum of `chain[level].field` across source tuples.
    Sum {
        /// Index into the source tuple's fact chain.
        level: u32,
        /// Field supplying the summed value.
        field: SymbolId,
    },
    /// Minimum of `chain[level].field`.
    Min {
        /// Index into the source tuple's fact chain.
        level: u32,
        /// Field supplying the compared value.
        field: SymbolId,
    },
    /// Maximum of `chain[level].field`.
    Max {
        /// Index into the source tuple's fact chain.
        level: u32,
        /// Field supplying the compared value.
        field: SymbolId,
    },
}

impl Aggregate {
    /// Returns the (level, field) of the aggregated input, if any.
    #[must_use]
    pub const fn input(&self) -> Option<(u32, SymbolId)> {
        match self {
            Self::Count => None,
            Self::Sum { level, field }
            | Self::Min { level, field }
            | Self::Max { level, field } => Some((*level, *field)),
        }
    }
}

/// Which input sides a node needs non-empty to be linked.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RequiredInputs {
    /// Always linked (alpha, seed, adapter, terminal).
    None,
    /// Left tuple input must be non-empty (not, exists, accumulate; an
    /// accumulate over an empty source still emits its identity row).
    Left,
    /// Both inputs must be non-empty (join).
    Both,
}

/// Kind of a compiled node.
#[derive(Clone, Debug)]
pub enum NodeKind {
    /// Alpha network entry: facts of one type passing literal tests.
    Alpha {
        /// Fact type routed here.
        fact_type: SymbolId,
        /// Literal tests a fact must pass to enter the memory.
        tests: Vec<LiteralTest>,
    },
    /// Root of every beta chain; holds the single permanent seed tuple.
    Seed,
    /// Join: combines left tuples with right facts passing the join tests.
    Join {
        /// Join tests between right fact and left chain.
        tests: Vec<JoinTest>,
    },
    /// Negation: emits a left tuple while it has zero right matches.
    Not {
        /// Join tests between right element and left chain.
        tests: Vec<JoinTest>,
    },
    /// Existential: emits a left tuple while it has at least one match.
    Exists {
        /// Join tests between right element and left chain.
        tests: Vec<JoinTest>,
    },
    /// Shared aggregation over an adapted source subnetwork.
    Accumulate {
        /// The aggregate function.
        aggregate: Aggregate,
    },
    /// Right-input adapter: forwards a subnetwork's tuples as right
    /// elements to its consumers.
    Adapter,
    /// Filters left tuples by constant guards or aggregate-result tests.
    Filter {
        /// Tests a tuple must pass to propagate.
        tests: Vec<FilterTest>,
    },
    /// Converts complete tuples into activation events for one rule.
    Terminal {
        /// The rule activated by this terminal.
        rule: RuleId,
    },
}

impl NodeKind {
    /// Returns which input sides must be non-empty for the node to be
    /// linked. Flush and finalize operations on an unlinked node are no-ops.
    #[must_use]
    pub const fn required_inputs(&self) -> RequiredInputs {
        match self {
            Self::Alpha { .. } | Self::Seed | Self::Adapter | Self::Terminal { .. } => {
                RequiredInputs::None
            }
            Self::Join { .. } => RequiredInputs::Both,
            Self::Not { .. } | Self::Exists { .. } | Self::Accumulate { .. } => {
                RequiredInputs::Left
            }
            // A filter only transforms its left stream
            Self::Filter { .. } => RequiredInputs::None,
        }
    }
}

/// A vertex of the compiled network.
#[derive(Clone, Debug)]
pub struct Node {
    /// This node's arena index.
    pub id: NodeId,
    /// The node's kind and compiled tests.
    pub kind: NodeKind,
    /// Tuple-stream parent (the node whose output is our left input).
    pub left_parent: Option<NodeId>,
    /// Right-input source (an alpha node or an adapter).
    pub right_source: Option<NodeId>,
    /// Nodes whose left input is this node's output, in rule registration
    /// order, which fixes activation creation order within a pass.
    pub children: Vec<NodeId>,
    /// Nodes whose right input is this node's output.
    pub right_children: Vec<NodeId>,
}

impl Node {
    /// Creates a node with no edges.
    #[must_use]
    pub fn new(id: NodeId, kind: NodeKind) -> Self {
        Self {
            id,
            kind,
            left_parent: None,
            right_source: None,
            children: Vec::new(),
            right_children: Vec::new(),
        }
    }
}
