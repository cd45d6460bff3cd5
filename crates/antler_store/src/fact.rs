//! Fact values: typed records of named scalar fields.

use std::fmt;

use antler_foundation::{SymbolId, Value};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A fact: a value of a declared type with named scalar fields.
///
/// Facts are owned by the [`FactStore`](crate::FactStore) and referenced by
/// handle everywhere else. Fields use a persistent map, so cloning a fact
/// into an activation snapshot is O(1).
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Fact {
    /// The fact's declared type (interned name).
    fact_type: SymbolId,
    /// Field values keyed by interned field name.
    fields: im::HashMap<SymbolId, Value>,
}

impl Fact {
    /// Creates a fact of the given type with no fields.
    #[must_use]
    pub fn new(fact_type: SymbolId) -> Self {
        Self {
            fact_type,
            fields: im::HashMap::new(),
        }
    }

    /// Returns a copy of this fact with the field set.
    #[must_use]
    pub fn with(mut self, field: SymbolId, value: impl Into<Value>) -> Self {
        self.fields.insert(field, value.into());
        self
    }

    /// Sets a field in place.
    pub fn set(&mut self, field: SymbolId, value: impl Into<Value>) {
        self.fields.insert(field, value.into());
    }

    /// Returns the fact's type.
    #[must_use]
    pub const fn fact_type(&self) -> SymbolId {
        self.fact_type
    }

    /// Returns a field value, or [`Value::Nil`] if the field is absent.
    #[must_use]
    pub fn get(&self, field: SymbolId) -> Value {
        self.fields.get(&field).cloned().unwrap_or(Value::Nil)
    }

    /// Returns a field value reference if present.
    #[must_use]
    pub fn field(&self, field: SymbolId) -> Option<&Value> {
        self.fields.get(&field)
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the fact has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over (field, value) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&SymbolId, &Value)> {
        self.fields.iter()
    }
}

impl fmt::Debug for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fact({:?}", self.fact_type)?;
        for (field, value) in &self.fields {
            write!(f, " {field:?}={value:?}")?;
        }
        write!(f, ")")
    }
}
