//! Incremental pattern-match network: compiled rule topology and its
//! evaluation state.
//!
//! Rule definitions ([`topology`]) compile into an arena of shared nodes
//! ([`build`]); [`NetworkMemory`] evaluates fact changes against the
//! compiled network incrementally, emitting [`TerminalEvent`]s that an
//! agenda turns into rule activations. This crate knows nothing about
//! firing order; it only maintains matches.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
// Arena indices fit in u32/usize on every supported target
#![allow(clippy::cast_possible_truncation)]

pub mod build;
pub mod memory;
pub mod node;
pub mod propagate;
pub mod topology;
pub mod tuple;

pub use build::{CompiledRule, Network, NetworkBuilder};
pub use memory::{AggState, RightElem};
pub use node::{Aggregate, FilterTest, JoinTest, LiteralTest, Node, NodeId, NodeKind, RuleId};
pub use propagate::{NetworkMemory, TerminalEvent};
pub use topology::{
    AccumulateDef, AggregateDef, CmpOp, ConstraintDef, FactPattern, PatternDef, RuleDef,
};
pub use tuple::{Tuple, TupleId};
