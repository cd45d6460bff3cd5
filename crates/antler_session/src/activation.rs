//! Rule activations: matched tuples queued for firing.

use std::fmt;

use antler_foundation::{FactHandle, Value};
use antler_network::{RuleId, TupleId};

/// Index of an activation in the session's activation log.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct ActivationId(pub(crate) u32);

impl ActivationId {
    /// Returns the raw log index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ActivationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActivationId({})", self.0)
    }
}

/// Lifecycle of an activation. Cancelled entries stay in their agenda heap
/// and are dropped lazily at pop time.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ActivationState {
    /// Waiting in its agenda group.
    Queued,
    /// Selected and executed.
    Fired,
    /// Withdrawn before firing because its tuple was invalidated.
    Cancelled,
}

/// One complete rule match, snapshotted at creation.
///
/// The fact chain and aggregate result are copies taken when the terminal
/// emitted the match, so firing never depends on tuples that may since have
/// been reorganized. An in-place aggregate update refreshes the snapshot
/// while preserving `seq`.
#[derive(Clone, Debug)]
pub struct Activation {
    /// The matched rule.
    pub rule: RuleId,
    /// Identity of the matched tuple.
    pub tuple: TupleId,
    /// Matched facts in pattern declaration order.
    pub facts: Vec<FactHandle>,
    /// Aggregate result carried by the match, if any.
    pub aggregate: Option<Value>,
    /// Resolved agenda group name.
    pub group: String,
    /// Rule salience at creation.
    pub salience: i32,
    /// Global creation sequence number; the FIFO tie-break.
    pub seq: u64,
    /// Current lifecycle state.
    pub state: ActivationState,
}
