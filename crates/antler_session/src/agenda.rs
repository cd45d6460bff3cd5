//! Agenda groups and the focus stack.
//!
//! Each group is a priority queue ordered by salience descending, then by
//! creation sequence ascending (FIFO among equals). Cancelled activations
//! are not removed eagerly; the caller passes a liveness check and stale
//! entries are dropped when they surface at the top of a heap.
//!
//! The focus stack holds distinct group names, most recently focused on
//! top. The main group sits below the stack and is never popped; a group
//! whose queue runs dry is popped and selection moves down the stack.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::activation::ActivationId;

/// One queued entry; the heap key is (salience desc, seq asc).
#[derive(Debug, PartialEq, Eq)]
struct QueueEntry {
    salience: i32,
    seq: u64,
    activation: ActivationId,
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.salience
            .cmp(&other.salience)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The session's agenda: named groups plus the focus stack.
#[derive(Debug)]
pub struct Agenda {
    groups: HashMap<String, BinaryHeap<QueueEntry>>,
    /// Focused groups above main, top of stack last.
    focus: Vec<String>,
    main: String,
}

impl Agenda {
    /// Creates an agenda whose bottom group is `main`.
    #[must_use]
    pub fn new(main: impl Into<String>) -> Self {
        let main = main.into();
        let mut groups = HashMap::new();
        groups.insert(main.clone(), BinaryHeap::new());
        Self {
            groups,
            focus: Vec::new(),
            main,
        }
    }

    /// Returns the main group's name.
    #[must_use]
    pub fn main(&self) -> &str {
        &self.main
    }

    /// Returns the group selection currently starts from.
    #[must_use]
    pub fn focus(&self) -> &str {
        self.focus.last().map_or(&self.main, String::as_str)
    }

    /// Queues an activation in a group, creating the group if needed.
    pub fn add(&mut self, group: &str, salience: i32, seq: u64, activation: ActivationId) {
        self.groups
            .entry(group.to_string())
            .or_default()
            .push(QueueEntry {
                salience,
                seq,
                activation,
            });
    }

    /// Moves a group to the top of the focus stack, creating it if unknown.
    /// Focusing the main group is a no-op; it is always reachable.
    pub fn set_focus(&mut self, group: &str) {
        if group == self.main {
            return;
        }
        self.groups.entry(group.to_string()).or_default();
        if let Some(pos) = self.focus.iter().position(|name| name == group) {
            let name = self.focus.remove(pos);
            self.focus.push(name);
        } else {
            self.focus.push(group.to_string());
        }
    }

    /// Pops the next activation to fire, or `None` when every reachable
    /// group is exhausted. Entries failing the liveness check are discarded;
    /// emptied focused groups are popped off the stack.
    pub fn next(&mut self, live: impl Fn(ActivationId) -> bool) -> Option<ActivationId> {
        loop {
            let focused = self.focus.last().cloned();
            let name = focused.clone().unwrap_or_else(|| self.main.clone());
            let heap = self.groups.get_mut(&name)?;
            while let Some(entry) = heap.pop() {
                if live(entry.activation) {
                    return Some(entry.activation);
                }
            }
            if focused.is_some() {
                self.focus.pop();
            } else {
                return None;
            }
        }
    }

    /// Returns a group's live activations in firing order without
    /// disturbing the queue.
    #[must_use]
    pub fn snapshot(&self, group: &str, live: impl Fn(ActivationId) -> bool) -> Vec<ActivationId> {
        let Some(heap) = self.groups.get(group) else {
            return Vec::new();
        };
        let mut entries: Vec<&QueueEntry> = heap.iter().filter(|e| live(e.activation)).collect();
        entries.sort_by(|a, b| b.cmp(a));
        entries.into_iter().map(|entry| entry.activation).collect()
    }
}
