//! Core types for the Antler rule engine.
//!
//! This crate provides:
//! - [`FactHandle`] - Stable, generational fact identity
//! - [`Value`] - Scalar fact-field values
//! - [`SymbolId`] / [`Interner`] - Interned fact-type and field names
//! - [`Error`] / [`Result`] - Error handling for the whole workspace

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod error;
mod fact;
mod intern;
mod value;

pub use error::{EngineLimit, Error, ErrorKind, Result};
pub use fact::FactHandle;
pub use intern::{Interner, SymbolId};
pub use value::{Type, Value};
