//! Antler - Incremental forward-chaining rule-matching engine
//!
//! This crate re-exports all layers of the Antler system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 3: antler_session    - Agenda, focus stack, activations, firing driver
//! Layer 2: antler_network    - Alpha/beta network, shared subnetworks, propagation
//! Layer 1: antler_store      - Fact store: handles, versions, fact values
//! Layer 0: antler_foundation - Core types (Value, FactHandle, SymbolId, Error)
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub use antler_foundation as foundation;
pub use antler_network as network;
pub use antler_session as session;
pub use antler_store as store;
