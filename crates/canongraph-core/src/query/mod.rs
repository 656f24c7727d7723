//! # Query Module
//!
//! Structured query types for pattern matching over an artifact.
//!
//! A [`QueryAst`] is the only query surface: MATCH patterns, an optional
//! WHERE filter, RETURN projections, an optional LIMIT, and optional
//! Datalog-lite rules whose derived edges exist for one execution only.
//!
//! ```text
//! MATCH (a:Term)-[ALIGNS_WITH]->(b:Term)
//! WHERE a.props.label contains "Alpha"
//! RETURN a.id AS from, b.id AS to
//! ```

mod engine;
mod index;

pub use engine::{QueryEngine, Row};
pub use index::{EdgeIndex, NodeIndex};

use crate::binding::{Binding, resolve_path, stringify};
use crate::evaluator::Rule;
use crate::{Artifact, CanonError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

// =============================================================================
// PATTERNS
// =============================================================================

/// A pattern variable with optional label constraints.
///
/// With several labels, a node matches when it carries any of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeVar {
    /// Variable name.
    pub name: String,
    /// Accepted labels; any node when empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

impl NodeVar {
    /// An unconstrained variable.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            labels: Vec::new(),
        }
    }

    /// A variable constrained to one label.
    #[must_use]
    pub fn labeled(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name).with_label(label)
    }

    /// Accept one more label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }
}

/// Edge constraint of a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EdgePattern {
    /// Required edge type; any type when absent.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub edge_type: Option<String>,
}

/// One MATCH clause.
///
/// With an edge constraint, the first variable is the source and the second
/// the target; any further variables are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    /// Node variables.
    pub vars: Vec<NodeVar>,
    /// Edge constraint between the first two variables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge: Option<EdgePattern>,
}

impl Pattern {
    /// `(var)`
    #[must_use]
    pub fn node(var: NodeVar) -> Self {
        Self {
            vars: vec![var],
            edge: None,
        }
    }

    /// `(from)-[type]->(to)`
    #[must_use]
    pub fn edge(from: NodeVar, edge_type: Option<&str>, to: NodeVar) -> Self {
        Self {
            vars: vec![from, to],
            edge: Some(EdgePattern {
                edge_type: edge_type.map(str::to_string),
            }),
        }
    }

    /// Unconnected variables, matched as a cartesian product.
    #[must_use]
    pub fn product(vars: Vec<NodeVar>) -> Self {
        Self { vars, edge: None }
    }
}

// =============================================================================
// WHERE
// =============================================================================

/// Operator of a structured WHERE clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WhereOp {
    /// Strict value equality.
    #[serde(rename = "==")]
    Eq,
    /// Membership; see [`WhereClause::matches`].
    #[serde(rename = "in")]
    In,
    /// Case-insensitive substring on strings, exact element on arrays.
    #[serde(rename = "contains")]
    Contains,
}

/// `{var, prop?, op, value}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhereClause {
    /// Variable the clause inspects.
    pub var: String,
    /// Dot-path below the bound value, e.g. `props.label`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prop: Option<String>,
    /// Operator.
    pub op: WhereOp,
    /// Comparison value.
    pub value: Value,
}

impl WhereClause {
    /// Create a clause on the whole bound value.
    #[must_use]
    pub fn new(var: impl Into<String>, op: WhereOp, value: impl Into<Value>) -> Self {
        Self {
            var: var.into(),
            prop: None,
            op,
            value: value.into(),
        }
    }

    /// Inspect a property path instead of the whole bound value.
    #[must_use]
    pub fn on(mut self, prop: impl Into<String>) -> Self {
        self.prop = Some(prop.into());
        self
    }

    /// Evaluate against a binding. An unresolvable field never matches.
    ///
    /// `==` is strict, except that numbers compare by value (`1 == 1.0`).
    /// `in` accepts when the field is an array holding the comparison value,
    /// or both are equal strings; nothing else.
    #[must_use]
    pub fn matches(&self, binding: &Binding<'_>) -> bool {
        let expr = match &self.prop {
            Some(prop) => format!("{}.{}", self.var, prop),
            None => self.var.clone(),
        };
        let Some(field) = resolve_path(binding, &expr) else {
            return false;
        };

        match self.op {
            WhereOp::Eq => strict_eq(&field, &self.value),
            WhereOp::In => match (&field, &self.value) {
                (Value::Array(items), value) => items.iter().any(|item| strict_eq(item, value)),
                (Value::String(a), Value::String(b)) => a == b,
                _ => false,
            },
            WhereOp::Contains => match &field {
                Value::String(haystack) => {
                    let needle = stringify(&self.value).to_lowercase();
                    haystack.to_lowercase().contains(&needle)
                }
                Value::Array(items) => items.contains(&self.value),
                _ => false,
            },
        }
    }
}

/// JSON equality with numbers compared by value rather than representation.
fn strict_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => match (x.as_u64(), y.as_u64()) {
                (Some(x), Some(y)) => x == y,
                _ => x.as_f64().zip(y.as_f64()).is_some_and(|(x, y)| x == y),
            },
        },
        _ => a == b,
    }
}

/// An opaque WHERE predicate. An `Err` counts as no match.
pub type WherePredicate =
    Arc<dyn for<'b> Fn(&Binding<'b>) -> Result<bool, CanonError> + Send + Sync>;

/// WHERE filter: a structured clause or an opaque predicate.
///
/// Only the clause form serializes.
#[derive(Clone)]
pub enum Filter {
    /// Inspectable clause.
    Clause(WhereClause),
    /// Caller-supplied function.
    Predicate(WherePredicate),
}

impl Filter {
    /// Wrap a function as a filter.
    pub fn predicate<F>(f: F) -> Self
    where
        F: for<'b> Fn(&Binding<'b>) -> Result<bool, CanonError> + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(f))
    }

    /// Evaluate against a binding.
    #[must_use]
    pub fn accepts(&self, binding: &Binding<'_>) -> bool {
        match self {
            Self::Clause(clause) => clause.matches(binding),
            Self::Predicate(f) => f(binding).unwrap_or_else(|err| {
                tracing::debug!(error = %err, "WHERE predicate failed; treating as no match");
                false
            }),
        }
    }
}

impl From<WhereClause> for Filter {
    fn from(clause: WhereClause) -> Self {
        Self::Clause(clause)
    }
}

impl std::fmt::Debug for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Clause(clause) => f.debug_tuple("Clause").field(clause).finish(),
            Self::Predicate(_) => f.write_str("Predicate(<fn>)"),
        }
    }
}

impl Serialize for Filter {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Self::Clause(clause) => clause.serialize(serializer),
            Self::Predicate(_) => Err(serde::ser::Error::custom(
                "opaque WHERE predicates cannot be serialized",
            )),
        }
    }
}

impl<'de> Deserialize<'de> for Filter {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        WhereClause::deserialize(deserializer).map(Self::Clause)
    }
}

// =============================================================================
// QUERY AST
// =============================================================================

/// One RETURN projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnItem {
    /// Dot-path expression, e.g. `a.props.label`.
    pub expr: String,
    /// Output column; the expression itself when absent.
    #[serde(rename = "as", default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl ReturnItem {
    /// The output column name.
    #[must_use]
    pub fn column(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.expr)
    }
}

/// A complete query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryAst {
    /// MATCH patterns, joined left to right.
    #[serde(rename = "match")]
    pub patterns: Vec<Pattern>,
    /// Optional WHERE filter.
    #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
    /// RETURN projections.
    #[serde(rename = "return", default)]
    pub returns: Vec<ReturnItem>,
    /// Maximum number of rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Rules evaluated before matching; their edges live for this query only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<Rule>,
}

impl QueryAst {
    /// An empty query.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a MATCH pattern.
    #[must_use]
    pub fn matching(mut self, pattern: Pattern) -> Self {
        self.patterns.push(pattern);
        self
    }

    /// Set the WHERE filter.
    #[must_use]
    pub fn filter(mut self, filter: impl Into<Filter>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Append a RETURN projection.
    #[must_use]
    pub fn returning(mut self, expr: impl Into<String>, alias: Option<&str>) -> Self {
        self.returns.push(ReturnItem {
            expr: expr.into(),
            alias: alias.map(str::to_string),
        });
        self
    }

    /// Set the row limit.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Add a rule evaluated before matching.
    #[must_use]
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Execute against an artifact with default settings.
    pub fn run(&self, artifact: &Artifact) -> Result<Vec<Row>, CanonError> {
        QueryEngine::new(artifact).execute(self)
    }
}

// =============================================================================
// TESTS
// =============================================================================
