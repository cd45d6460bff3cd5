//! Partial-match tuples and their arena.
//!
//! A tuple is an ordered chain of fact handles representing one path
//! through the network. Tuples are owned by the node that created them and
//! deleted transitively when any contributing fact is retracted. The chain
//! is a persistent vector, so extending a parent tuple by one fact shares
//! structure with it.

// Allow u32 to usize casts - arena indices fit comfortably
#![allow(clippy::cast_possible_truncation)]

use std::fmt;

use antler_foundation::{FactHandle, Value};

use crate::node::NodeId;

/// Identity of a tuple in the arena, with a generation counter so freed
/// slots can be reused without aliasing stale references.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct TupleId {
    /// Slot index.
    pub(crate) index: u32,
    /// Generation counter.
    pub(crate) generation: u32,
}

impl fmt::Debug for TupleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TupleId({}v{})", self.index, self.generation)
    }
}

/// A partial match: a chain of fact handles plus bookkeeping links.
#[derive(Clone, Debug)]
pub struct Tuple {
    /// The node that owns this tuple.
    pub node: NodeId,
    /// Parent tuple this one extends, if any.
    pub parent: Option<TupleId>,
    /// The fact this tuple added to its parent's chain, if any. Result
    /// rows and pass-through tuples add none.
    pub fact: Option<FactHandle>,
    /// Full fact chain, root to leaf, in pattern declaration order.
    pub chain: im::Vector<FactHandle>,
    /// Aggregate result carried by this tuple and its descendants.
    pub aggregate: Option<Value>,
    /// Tuples derived from this one.
    pub children: Vec<TupleId>,
}

/// Slab arena of tuples with generational slot reuse.
#[derive(Debug, Default)]
pub struct TupleStore {
    slots: Vec<(u32, Option<Tuple>)>,
    free_list: Vec<u32>,
}

impl TupleStore {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a tuple, returning its id.
    pub fn alloc(&mut self, tuple: Tuple) -> TupleId {
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.0 += 1;
            slot.1 = Some(tuple);
            TupleId {
                index,
                generation: slot.0,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push((1, Some(tuple)));
            TupleId {
                index,
                generation: 1,
            }
        }
    }

    /// Returns a tuple if its id is still live.
    #[must_use]
    pub fn get(&self, id: TupleId) -> Option<&Tuple> {
        let (generation, tuple) = self.slots.get(id.index as usize)?;
        if *generation == id.generation {
            tuple.as_ref()
        } else {
            None
        }
    }

    /// Returns a mutable tuple if its id is still live.
    #[must_use]
    pub fn get_mut(&mut self, id: TupleId) -> Option<&mut Tuple> {
        let (generation, tuple) = self.slots.get_mut(id.index as usize)?;
        if *generation == id.generation {
            tuple.as_mut()
        } else {
            None
        }
    }

    /// Frees a tuple, returning it. The slot becomes reusable.
    pub fn free(&mut self, id: TupleId) -> Option<Tuple> {
        let (generation, tuple) = self.slots.get_mut(id.index as usize)?;
        if *generation != id.generation {
            return None;
        }
        let taken = tuple.take();
        if taken.is_some() {
            *generation += 1;
            self.free_list.push(id.index);
        }
        taken
    }

    /// Returns the number of live tuples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }

    /// Returns true if no tuples are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records `child` as derived from `parent`.
    pub fn attach_child(&mut self, parent: TupleId, child: TupleId) {
        if let Some(tuple) = self.get_mut(parent) {
            tuple.children.push(child);
        }
    }

    /// Removes `child` from `parent`'s derived list.
    pub fn detach_child(&mut self, parent: TupleId, child: TupleId) {
        if let Some(tuple) = self.get_mut(parent) {
            tuple.children.retain(|&c| c != child);
        }
    }
}
