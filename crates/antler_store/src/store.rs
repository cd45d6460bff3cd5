//! Fact lifecycle management with generational indices.
//!
//! The `FactStore` allocates handles from a free list, tracks generations to
//! detect stale references to retracted facts, and bumps a version counter
//! on every update so downstream consumers can tell revisions apart.

// Allow u64 to usize casts - we target 64-bit systems
#![allow(clippy::cast_possible_truncation)]

use antler_foundation::{Error, FactHandle, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::fact::Fact;

/// One storage slot: generation parity encodes liveness.
///
/// Even generations are free, odd generations are alive.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
struct Slot {
    generation: u32,
    fact: Option<Fact>,
    version: u64,
}

/// Working-memory storage of live facts.
///
/// Handles are allocated from a free list when available, otherwise new
/// indices are appended. Retracting a fact increments its slot's generation,
/// invalidating outstanding handles. Updating a fact preserves its handle
/// and increments its version counter.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FactStore {
    /// Slot storage indexed by handle index.
    slots: Vec<Slot>,
    /// Free list of indices available for reuse.
    free_list: Vec<u64>,
    /// Count of live facts.
    live_count: usize,
}

impl FactStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fact, returning its handle.
    ///
    /// Reuses indices from the free list when available.
    pub fn insert(&mut self, fact: Fact) -> FactHandle {
        self.live_count += 1;

        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            // Was even/free, now odd/alive
            slot.generation += 1;
            slot.fact = Some(fact);
            slot.version = 0;
            FactHandle::new(index, slot.generation)
        } else {
            let index = self.slots.len() as u64;
            self.slots.push(Slot {
                generation: 1,
                fact: Some(fact),
                version: 0,
            });
            FactHandle::new(index, 1)
        }
    }

    /// Replaces the fact behind a handle, preserving its identity.
    ///
    /// Returns the new version number.
    ///
    /// # Errors
    /// Returns an error if the handle is stale or was never allocated.
    pub fn update(&mut self, handle: FactHandle, fact: Fact) -> Result<u64> {
        self.validate(handle)?;
        let slot = &mut self.slots[handle.index as usize];
        slot.fact = Some(fact);
        slot.version += 1;
        Ok(slot.version)
    }

    /// Retracts a fact, returning its last value.
    ///
    /// # Errors
    /// Returns an error if the handle is stale or was never allocated.
    pub fn retract(&mut self, handle: FactHandle) -> Result<Fact> {
        self.validate(handle)?;
        let slot = &mut self.slots[handle.index as usize];
        // Was odd/alive, now even/free
        slot.generation += 1;
        let fact = slot.fact.take();
        self.free_list.push(handle.index);
        self.live_count -= 1;
        fact.ok_or_else(|| Error::internal("live slot without fact"))
    }

    /// Returns the fact behind a handle.
    ///
    /// # Errors
    /// Returns an error if the handle is stale or was never allocated.
    pub fn get(&self, handle: FactHandle) -> Result<&Fact> {
        self.validate(handle)?;
        self.slots[handle.index as usize]
            .fact
            .as_ref()
            .ok_or_else(|| Error::internal("live slot without fact"))
    }

    /// Returns the current version of a live fact.
    ///
    /// # Errors
    /// Returns an error if the handle is stale or was never allocated.
    pub fn version(&self, handle: FactHandle) -> Result<u64> {
        self.validate(handle)?;
        Ok(self.slots[handle.index as usize].version)
    }

    /// Checks if a handle refers to a live fact.
    #[must_use]
    pub fn contains(&self, handle: FactHandle) -> bool {
        let idx = handle.index as usize;
        idx < self.slots.len()
            && self.slots[idx].generation == handle.generation
            && handle.generation % 2 == 1
    }

    /// Validates that a handle is live.
    ///
    /// # Errors
    /// Returns `FactNotFound` for unallocated or freed slots and `StaleFact`
    /// for generation mismatches.
    pub fn validate(&self, handle: FactHandle) -> Result<()> {
        let idx = handle.index as usize;

        if idx >= self.slots.len() {
            return Err(Error::fact_not_found(handle));
        }

        let current = self.slots[idx].generation;

        if current != handle.generation {
            // Generation mismatch - fact was retracted and possibly reused
            return Err(Error::stale_fact(handle));
        }

        if current % 2 == 0 {
            // Even generation means the slot is free
            return Err(Error::fact_not_found(handle));
        }

        Ok(())
    }

    /// Returns the number of live facts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live_count
    }

    /// Returns true if no facts are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live_count == 0
    }

    /// Iterates over live (handle, fact) pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (FactHandle, &Fact)> {
        self.slots.iter().enumerate().filter_map(|(idx, slot)| {
            let fact = slot.fact.as_ref()?;
            Some((FactHandle::new(idx as u64, slot.generation), fact))
        })
    }
}
