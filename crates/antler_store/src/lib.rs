//! Working-memory fact store for Antler.
//!
//! This crate provides:
//! - [`Fact`] - A typed record of named scalar fields
//! - [`FactStore`] - Generational storage of live facts with version counters
//!
//! The store is the propagation source for the network: facts are inserted,
//! updated (preserving their handle), and retracted through it, and every
//! downstream tuple refers back to facts by handle, never by copy.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod fact;
mod store;

pub use fact::Fact;
pub use store::FactStore;
