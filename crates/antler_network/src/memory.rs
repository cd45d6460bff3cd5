//! Per-node runtime memories.
//!
//! Topology (the node arena) is immutable after build; everything here is
//! the mutable evaluation state: alpha memories, beta left/right memories
//! with match counts, and accumulate group state with staged deltas.

use std::collections::HashMap;

use antler_foundation::{FactHandle, Value};

use crate::node::Aggregate;
use crate::tuple::TupleId;

/// A right-input element: an alpha fact or an adapted subnetwork tuple.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RightElem {
    /// A fact routed from an alpha memory.
    Fact(FactHandle),
    /// A subnetwork tuple forwarded by an adapter.
    Tuple(TupleId),
}

/// Alpha memory: facts of one type passing the node's literal tests.
#[derive(Debug, Default)]
pub struct AlphaMemory {
    /// Currently matching facts, in insertion order.
    pub facts: Vec<FactHandle>,
}

/// Beta memory for seed, join, not, exists, and filter nodes.
#[derive(Debug, Default)]
pub struct BetaMemory {
    /// Output tuples this node has emitted, in creation order.
    pub outs: Vec<TupleId>,
    /// Right-input elements currently held.
    pub rights: Vec<RightElem>,
    /// Per-left-tuple match counts (not/exists only).
    pub counts: HashMap<TupleId, u32>,
}

/// Accumulate memory: the shared result state of a subnetwork.
///
/// Owned by the single accumulate node; every downstream consumer reads the
/// same state. Deltas are staged (`staged`) and folded in by one flush per
/// propagation pass.
#[derive(Debug)]
pub struct AccumulateMemory {
    /// Result-row tuples emitted, in creation order.
    pub outs: Vec<TupleId>,
    /// Left tuples awaiting/holding a result row.
    pub lefts: Vec<TupleId>,
    /// Adapted source tuples with their aggregate-input snapshot. The
    /// snapshot makes removal independent of the fact store's current state.
    pub elems: Vec<(TupleId, Option<Value>)>,
    /// Running aggregate state.
    pub state: AggState,
    /// Result row per left tuple.
    pub results: HashMap<TupleId, TupleId>,
    /// True while a delta is staged and a flush is pending.
    pub staged: bool,
}

impl AccumulateMemory {
    /// Creates an empty memory for the given aggregate function.
    #[must_use]
    pub fn new(aggregate: &Aggregate) -> Self {
        Self {
            outs: Vec::new(),
            lefts: Vec::new(),
            elems: Vec::new(),
            state: AggState::new(aggregate),
            results: HashMap::new(),
            staged: false,
        }
    }
}

/// Runtime memory of one node, matching its kind.
#[derive(Debug)]
pub enum NodeMemory {
    /// Adapter and terminal nodes hold no state.
    None,
    /// Alpha node memory.
    Alpha(AlphaMemory),
    /// Seed/join/not/exists/filter memory.
    Beta(BetaMemory),
    /// Accumulate node memory.
    Accumulate(AccumulateMemory),
}

impl NodeMemory {
    /// Returns the output tuples of this node, if it produces any.
    #[must_use]
    pub fn outs(&self) -> &[TupleId] {
        match self {
            Self::Beta(mem) => &mem.outs,
            Self::Accumulate(mem) => &mem.outs,
            Self::None | Self::Alpha(_) => &[],
        }
    }
}

/// Incrementally maintained aggregate state.
///
/// Min/max keep the full multiset of inputs so removing one of several
/// equal extrema does not lose the remaining ones.
#[derive(Debug, Clone)]
pub enum AggState {
    /// Count of elements.
    Count(i64),
    /// Running sum, tracking integer and float contributions separately so
    /// the result stays an integer until a float joins in.
    Sum {
        /// Sum of integer inputs.
        ints: i64,
        /// Sum of float inputs.
        floats: f64,
        /// Number of float inputs currently contributing.
        float_count: usize,
    },
    /// Multiset for minimum.
    Min(Vec<Value>),
    /// Multiset for maximum.
    Max(Vec<Value>),
}

impl AggState {
    /// Creates the identity state for the given function.
    #[must_use]
    pub fn new(aggregate: &Aggregate) -> Self {
        match aggregate {
            Aggregate::Count => Self::Count(0),
            Aggregate::Sum { .. } => Self::Sum {
                ints: 0,
                floats: 0.0,
                float_count: 0,
            },
            Aggregate::Min { .. } => Self::Min(Vec::new()),
            Aggregate::Max { .. } => Self::Max(Vec::new()),
        }
    }

    /// Folds one element in.
    pub fn insert(&mut self, input: Option<&Value>) {
        match self {
            Self::Count(n) => *n += 1,
            Self::Sum {
                ints,
                floats,
                float_count,
            } => match input {
                Some(Value::Int(n)) => *ints += n,
                Some(Value::Float(f)) => {
                    *floats += f;
                    *float_count += 1;
                }
                _ => {}
            },
            Self::Min(values) | Self::Max(values) => {
                if let Some(value) = input {
                    values.push(value.clone());
                }
            }
        }
    }

    /// Folds one element out.
    pub fn remove(&mut self, input: Option<&Value>) {
        match self {
            Self::Count(n) => *n -= 1,
            Self::Sum {
                ints,
                floats,
                float_count,
            } => match input {
                Some(Value::Int(n)) => *ints -= n,
                Some(Value::Float(f)) => {
                    *floats -= f;
                    *float_count -= 1;
                }
                _ => {}
            },
            Self::Min(values) | Self::Max(values) => {
                if let Some(value) = input {
                    if let Some(pos) = values.iter().position(|v| v == value) {
                        values.swap_remove(pos);
                    }
                }
            }
        }
    }

    /// Returns the current aggregate value.
    ///
    /// Count and sum over nothing yield zero; min/max over nothing yield
    /// nil, which fails every ordering comparison downstream.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn value(&self) -> Value {
        match self {
            Self::Count(n) => Value::Int(*n),
            Self::Sum {
                ints,
                floats,
                float_count,
            } => {
                if *float_count == 0 {
                    Value::Int(*ints)
                } else {
                    Value::Float(*ints as f64 + floats)
                }
            }
            Self::Min(values) => fold_extreme(values, |ord| ord.is_lt()),
            Self::Max(values) => fold_extreme(values, |ord| ord.is_gt()),
        }
    }
}

fn fold_extreme(values: &[Value], keep: impl Fn(std::cmp::Ordering) -> bool) -> Value {
    let mut best: Option<&Value> = None;
    for value in values {
        match best {
            None => best = Some(value),
            Some(current) => {
                if let Some(ordering) = value.partial_cmp(current) {
                    if keep(ordering) {
                        best = Some(value);
                    }
                }
            }
        }
    }
    best.cloned().unwrap_or(Value::Nil)
}
