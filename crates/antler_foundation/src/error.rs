//! Error types for the Antler workspace.
//!
//! Uses `thiserror` for ergonomic error definition. Topology errors are
//! fatal at session build time; runtime errors cover stale handles, action
//! failures, and the firing kill switch.

use std::fmt;

use thiserror::Error;

use crate::fact::FactHandle;
use crate::value::Type;

/// Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Antler operations.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional rule name giving context for the error.
    pub rule: Option<String>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, rule: None }
    }

    /// Attaches the name of the rule being built or fired.
    #[must_use]
    pub fn in_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }

    /// Creates a type mismatch error.
    #[must_use]
    pub fn type_mismatch(expected: Type, actual: Type) -> Self {
        Self::new(ErrorKind::TypeMismatch { expected, actual })
    }

    /// Creates a fact-not-found error.
    #[must_use]
    pub fn fact_not_found(handle: FactHandle) -> Self {
        Self::new(ErrorKind::FactNotFound(handle))
    }

    /// Creates a stale fact handle error.
    #[must_use]
    pub fn stale_fact(handle: FactHandle) -> Self {
        Self::new(ErrorKind::StaleFact(handle))
    }

    /// Creates an unknown-binding topology error.
    #[must_use]
    pub fn unknown_binding(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownBinding(name.into()))
    }

    /// Creates a duplicate-rule topology error.
    #[must_use]
    pub fn duplicate_rule(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::DuplicateRule(name.into()))
    }

    /// Creates an unknown-rule error.
    #[must_use]
    pub fn unknown_rule(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownRule(name.into()))
    }

    /// Creates an empty-pattern topology error.
    #[must_use]
    pub fn empty_pattern() -> Self {
        Self::new(ErrorKind::EmptyPattern)
    }

    /// Creates an empty-subnetwork topology error.
    #[must_use]
    pub fn empty_subnetwork() -> Self {
        Self::new(ErrorKind::EmptySubnetwork)
    }

    /// Creates an action-failure error.
    #[must_use]
    pub fn action_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ActionFailed(message.into()))
    }

    /// Creates a limit exceeded (kill switch) error.
    #[must_use]
    pub fn limit_exceeded(limit: EngineLimit) -> Self {
        Self::new(ErrorKind::LimitExceeded(limit))
    }

    /// Creates an internal invariant-violation error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal(message.into()))
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// Type mismatch during constraint evaluation or aggregation.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// The expected type.
        expected: Type,
        /// The actual type encountered.
        actual: Type,
    },

    /// Fact was not found in the store.
    #[error("fact not found: {0:?}")]
    FactNotFound(FactHandle),

    /// Fact handle is stale (generation mismatch after retraction).
    #[error("stale fact handle: {0:?}")]
    StaleFact(FactHandle),

    /// A bound constraint references a binding that was never declared.
    #[error("unknown binding: ${0}")]
    UnknownBinding(String),

    /// Two rules were registered under the same name.
    #[error("duplicate rule name: {0}")]
    DuplicateRule(String),

    /// An action or lookup referenced a rule that does not exist.
    #[error("unknown rule: {0}")]
    UnknownRule(String),

    /// A rule was defined with no patterns.
    #[error("rule has no patterns")]
    EmptyPattern,

    /// A not/exists/accumulate group was defined with no source patterns,
    /// so the subnetwork could never be linked into the network.
    #[error("subnetwork has no source patterns")]
    EmptySubnetwork,

    /// An action callback failed while firing.
    #[error("action failed: {0}")]
    ActionFailed(String),

    /// Engine limit exceeded (kill switch triggered).
    #[error("limit exceeded: {0}")]
    LimitExceeded(EngineLimit),

    /// Internal invariant violation (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Engine limits (kill switches) that can be exceeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineLimit {
    /// Maximum rule firings per `fire_all_rules` call exceeded.
    MaxFirings {
        /// The configured limit.
        limit: u64,
    },
}

impl fmt::Display for EngineLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxFirings { limit } => write!(f, "max firings ({limit}) exceeded"),
        }
    }
}
