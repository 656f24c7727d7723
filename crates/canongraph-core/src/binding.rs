//! # Bindings
//!
//! Variable bindings shared by the rule evaluator and the query engine.
//!
//! A binding maps a variable name to a node, or (under the synthetic key
//! `<from>__edge__<to>`) to the edge matched between two node variables.
//! Bindings borrow from the artifact and from per-execution derived edges;
//! they never outlive one evaluation.

use crate::primitives::EDGE_BINDING_INFIX;
use crate::{Edge, Node};
use serde_json::Value;
use std::collections::BTreeMap;

/// A value bound to a variable.
#[derive(Debug, Clone, Copy)]
pub enum Bound<'a> {
    /// A node variable.
    Node(&'a Node),
    /// A matched edge, under its synthetic key.
    Edge(&'a Edge),
}

impl<'a> Bound<'a> {
    /// The bound node, if this is a node binding.
    #[must_use]
    pub fn as_node(&self) -> Option<&'a Node> {
        match *self {
            Self::Node(node) => Some(node),
            Self::Edge(_) => None,
        }
    }

    /// The bound value as JSON.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Node(node) => node.to_value(),
            Self::Edge(edge) => edge.to_value(),
        }
    }

    /// Resolve a property path below the bound value.
    ///
    /// An empty path yields the whole value. Any missing or null
    /// intermediate segment yields `None`.
    #[must_use]
    pub fn resolve<S: AsRef<str>>(&self, path: &[S]) -> Option<Value> {
        let Some((head, rest)) = path.split_first() else {
            return Some(self.to_value());
        };
        let head = head.as_ref();
        let props = match self {
            Self::Node(node) => {
                if head != "props" {
                    return walk(&node.field(head)?, rest).cloned();
                }
                &node.props
            }
            Self::Edge(edge) => {
                if head != "props" {
                    return walk(&edge.field(head)?, rest).cloned();
                }
                &edge.props
            }
        };
        match rest.split_first() {
            None => Some(Value::Object(props.clone())),
            Some((key, rest)) => walk(props.get(key.as_ref())?, rest).cloned(),
        }
    }
}

impl PartialEq for Bound<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Node(a), Self::Node(b)) => a.id == b.id,
            (Self::Edge(a), Self::Edge(b)) => a.has_key(&b.edge_type, &b.from, &b.to),
            _ => false,
        }
    }
}

/// A mapping from variable name to bound value.
pub type Binding<'a> = BTreeMap<String, Bound<'a>>;

/// The synthetic binding key for the edge matched between two node variables.
#[must_use]
pub fn edge_binding_key(from_var: &str, to_var: &str) -> String {
    format!("{}{}{}", from_var, EDGE_BINDING_INFIX, to_var)
}

/// Two bindings are compatible when every shared variable holds equal values.
#[must_use]
pub fn compatible(left: &Binding<'_>, right: &Binding<'_>) -> bool {
    left.iter()
        .all(|(name, value)| right.get(name).is_none_or(|other| other == value))
}

/// Nested-loop equi-join: keep compatible pairs, merged by key union.
#[must_use]
pub fn join_bindings<'a>(left: &[Binding<'a>], right: &[Binding<'a>]) -> Vec<Binding<'a>> {
    let mut joined = Vec::new();
    for l in left {
        for r in right {
            if compatible(l, r) {
                let mut merged = l.clone();
                merged.extend(r.iter().map(|(k, v)| (k.clone(), *v)));
                joined.push(merged);
            }
        }
    }
    joined
}

/// Resolve a dot-path expression such as `a.props.label` against a binding.
///
/// The first segment names the variable. Returns `None` (undefined) when the
/// variable is unbound or any intermediate segment is missing or null.
#[must_use]
pub fn resolve_path(binding: &Binding<'_>, expr: &str) -> Option<Value> {
    let mut segments = expr.split('.');
    let var = segments.next()?;
    let rest: Vec<&str> = segments.collect();
    binding.get(var)?.resolve(&rest)
}

/// Walk `path` through nested JSON objects and arrays.
#[must_use]
pub fn walk<'v, S: AsRef<str>>(value: &'v Value, path: &[S]) -> Option<&'v Value> {
    let mut current = value;
    for segment in path {
        let segment = segment.as_ref();
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
        if current.is_null() {
            return None;
        }
    }
    Some(current)
}

/// Render a JSON value as plain text: strings verbatim, arrays
/// comma-joined, everything else in JSON notation.
#[must_use]
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(stringify).collect::<Vec<_>>().join(","),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn alpha() -> Node {
        Node::new("t1")
            .with_label("Term")
            .with_prop("label", "Alpha Beta")
            .with_prop("meta", json!({"tags": ["x", "y"], "none": null}))
    }

    #[test]
    fn resolve_walks_node_fields() {
        let node = alpha();
        let bound = Bound::Node(&node);

        assert_eq!(bound.resolve(&["id"]), Some(json!("t1")));
        assert_eq!(bound.resolve(&["props", "label"]), Some(json!("Alpha Beta")));
        assert_eq!(bound.resolve(&["props", "meta", "tags", "1"]), Some(json!("y")));
        assert_eq!(bound.resolve(&["labels", "0"]), Some(json!("Term")));
    }

    #[test]
    fn resolve_short_circuits_on_missing_or_null() {
        let node = alpha();
        let bound = Bound::Node(&node);

        assert_eq!(bound.resolve(&["props", "missing", "deeper"]), None);
        assert_eq!(bound.resolve(&["props", "meta", "none", "x"]), None);
        assert_eq!(bound.resolve(&["nope"]), None);
    }

    #[test]
    fn resolve_path_starts_at_variable() {
        let node = alpha();
        let edge = Edge::new("ALIGNS_WITH", "t1", "t2");
        let mut binding = Binding::new();
        binding.insert("a".into(), Bound::Node(&node));
        binding.insert(edge_binding_key("a", "b"), Bound::Edge(&edge));

        assert_eq!(resolve_path(&binding, "a.id"), Some(json!("t1")));
        assert_eq!(resolve_path(&binding, "a__edge__b.type"), Some(json!("ALIGNS_WITH")));
        assert_eq!(resolve_path(&binding, "b.id"), None);
    }

    #[test]
    fn join_keeps_only_agreeing_pairs() {
        let a = Node::new("a");
        let b = Node::new("b");
        let c = Node::new("c");

        let left = vec![
            Binding::from([("x".to_string(), Bound::Node(&a)), ("y".to_string(), Bound::Node(&b))]),
            Binding::from([("x".to_string(), Bound::Node(&c)), ("y".to_string(), Bound::Node(&c))]),
        ];
        let right = vec![
            Binding::from([("y".to_string(), Bound::Node(&b)), ("z".to_string(), Bound::Node(&c))]),
        ];

        let joined = join_bindings(&left, &right);
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].len(), 3);
        assert_eq!(joined[0]["x"].as_node().map(|n| n.id.as_str()), Some("a"));
    }

    #[test]
    fn disjoint_bindings_form_product() {
        let a = Node::new("a");
        let b = Node::new("b");
        let left = vec![
            Binding::from([("x".to_string(), Bound::Node(&a))]),
            Binding::from([("x".to_string(), Bound::Node(&b))]),
        ];
        let right = vec![
            Binding::from([("y".to_string(), Bound::Node(&a))]),
            Binding::from([("y".to_string(), Bound::Node(&b))]),
        ];
        assert_eq!(join_bindings(&left, &right).len(), 4);
    }

    #[test]
    fn stringify_flattens_arrays() {
        assert_eq!(stringify(&json!("One")), "One");
        assert_eq!(stringify(&json!(["a", 1, true])), "a,1,true");
        assert_eq!(stringify(&json!(42)), "42");
    }
}
