//! Rule and pattern definitions consumed at network build time.
//!
//! These types are the interface handed over by an external rule compiler:
//! a declarative description of patterns, constraints, subnetworks, and
//! per-rule agenda settings. The [`NetworkBuilder`](crate::NetworkBuilder)
//! consumes them once and produces the compiled node arena; nothing here is
//! evaluated at runtime.

use antler_foundation::Value;

/// Comparison operator used by literal, bound, and result constraints.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CmpOp {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Ge,
}

impl CmpOp {
    /// Evaluates `left op right`.
    ///
    /// Ordering comparisons between incomparable types are false.
    #[must_use]
    pub fn eval(self, left: &Value, right: &Value) -> bool {
        match self {
            Self::Eq => left == right,
            Self::Ne => left != right,
            Self::Lt | Self::Le | Self::Gt | Self::Ge => {
                let Some(ordering) = left.partial_cmp(right) else {
                    return false;
                };
                match self {
                    Self::Lt => ordering.is_lt(),
                    Self::Le => ordering.is_le(),
                    Self::Gt => ordering.is_gt(),
                    Self::Ge => ordering.is_ge(),
                    Self::Eq | Self::Ne => unreachable!(),
                }
            }
        }
    }
}

/// A single-fact constraint inside a [`FactPattern`].
#[derive(Clone, Debug)]
pub enum ConstraintDef {
    /// Compare a field against a literal value. Evaluated in the alpha
    /// network, so facts failing it never reach the beta network.
    Literal {
        /// Field name on the matched fact.
        field: String,
        /// Comparison operator.
        op: CmpOp,
        /// Literal right-hand side.
        value: Value,
    },
    /// Compare a field against a binding declared by an earlier pattern.
    /// Evaluated as a beta join test.
    Bound {
        /// Field name on the matched fact.
        field: String,
        /// Comparison operator.
        op: CmpOp,
        /// Name of the earlier binding.
        binding: String,
    },
}

/// A pattern matching one fact of a declared type.
#[derive(Clone, Debug, Default)]
pub struct FactPattern {
    /// Fact type name to match.
    pub object_type: String,
    /// Constraints on the matched fact.
    pub constraints: Vec<ConstraintDef>,
    /// Field bindings this pattern declares: (binding name, field name).
    pub bindings: Vec<(String, String)>,
}

impl FactPattern {
    /// Creates a pattern matching any fact of the given type.
    #[must_use]
    pub fn of(object_type: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            constraints: Vec::new(),
            bindings: Vec::new(),
        }
    }

    /// Adds a literal constraint: `field op value`.
    #[must_use]
    pub fn literal(mut self, field: impl Into<String>, op: CmpOp, value: impl Into<Value>) -> Self {
        self.constraints.push(ConstraintDef::Literal {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }

    /// Adds a bound constraint: `field op $binding`.
    #[must_use]
    pub fn bound(
        mut self,
        field: impl Into<String>,
        op: CmpOp,
        binding: impl Into<String>,
    ) -> Self {
        self.constraints.push(ConstraintDef::Bound {
            field: field.into(),
            op,
            binding: binding.into(),
        });
        self
    }

    /// Declares a binding of a field for later patterns: `$name : field`.
    #[must_use]
    pub fn bind(mut self, name: impl Into<String>, field: impl Into<String>) -> Self {
        self.bindings.push((name.into(), field.into()));
        self
    }
}

/// Aggregate function applied by an accumulate pattern.
#[derive(Clone, Debug)]
pub enum AggregateDef {
    /// Count of matched source tuples.
    Count,
    /// Sum of a bound field across matched source tuples.
    Sum {
        /// Binding declared inside the accumulate source.
        binding: String,
    },
    /// Minimum of a bound field.
    Min {
        /// Binding declared inside the accumulate source.
        binding: String,
    },
    /// Maximum of a bound field.
    Max {
        /// Binding declared inside the accumulate source.
        binding: String,
    },
}

/// An accumulate pattern: an aggregation over a source subnetwork.
///
/// When several rules declare the same source and function, the compiled
/// subnetwork and its result memory are shared; each rule keeps its own
/// result constraints downstream of the shared node.
#[derive(Clone, Debug)]
pub struct AccumulateDef {
    /// Patterns forming the source subnetwork (joined left to right).
    pub source: Vec<FactPattern>,
    /// Aggregate function over the source tuples.
    pub function: AggregateDef,
    /// Constraints on the aggregate result, e.g. `count == 0`.
    pub result: Vec<(CmpOp, Value)>,
}

impl AccumulateDef {
    /// Creates an accumulate over the given source patterns.
    #[must_use]
    pub fn new(source: Vec<FactPattern>, function: AggregateDef) -> Self {
        Self {
            source,
            function,
            result: Vec::new(),
        }
    }

    /// Adds a constraint on the aggregate result.
    #[must_use]
    pub fn with_result(mut self, op: CmpOp, value: impl Into<Value>) -> Self {
        self.result.push((op, value.into()));
        self
    }
}

/// One condition in a rule, in declaration order.
#[derive(Clone, Debug)]
pub enum PatternDef {
    /// Match a single fact.
    Fact(FactPattern),
    /// Negation: succeed while the source matches nothing. A multi-pattern
    /// source compiles to a shared subnetwork.
    Not(Vec<FactPattern>),
    /// Existential: succeed while the source matches at least once.
    Exists(Vec<FactPattern>),
    /// Aggregation over a source subnetwork.
    Accumulate(AccumulateDef),
    /// Constant guard, the equivalent of an `eval(true)` / `eval(false)`
    /// condition.
    Guard(bool),
}

/// A declarative rule definition.
#[derive(Clone, Debug)]
pub struct RuleDef {
    /// Rule name, unique within the network.
    pub name: String,
    /// Agenda group; `None` places activations in the main group.
    pub agenda_group: Option<String>,
    /// Priority (higher fires first).
    pub salience: i32,
    /// Suppress self-reactivation caused by this rule's own action.
    pub no_loop: bool,
    /// Conditions in declaration order.
    pub patterns: Vec<PatternDef>,
}

impl RuleDef {
    /// Creates a rule with the given name and no patterns.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            agenda_group: None,
            salience: 0,
            no_loop: false,
            patterns: Vec::new(),
        }
    }

    /// Assigns the rule to an agenda group.
    #[must_use]
    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.agenda_group = Some(group.into());
        self
    }

    /// Sets the salience (priority).
    #[must_use]
    pub fn with_salience(mut self, salience: i32) -> Self {
        self.salience = salience;
        self
    }

    /// Sets the no-loop flag.
    #[must_use]
    pub fn with_no_loop(mut self, no_loop: bool) -> Self {
        self.no_loop = no_loop;
        self
    }

    /// Appends a pattern.
    #[must_use]
    pub fn pattern(mut self, pattern: PatternDef) -> Self {
        self.patterns.push(pattern);
        self
    }

    /// Appends a single-fact pattern.
    #[must_use]
    pub fn fact(self, pattern: FactPattern) -> Self {
        self.pattern(PatternDef::Fact(pattern))
    }
}
