//! Lookup indices over an artifact.
//!
//! [`NodeIndex`] is built once per engine; [`EdgeIndex`] once per execution,
//! over base edges plus the execution's derived edges.

use crate::{Edge, Node};
use std::collections::BTreeMap;

/// Nodes by id and by label, in artifact order.
#[derive(Debug, Clone, Default)]
pub struct NodeIndex<'a> {
    ordered: Vec<&'a Node>,
    by_id: BTreeMap<&'a str, &'a Node>,
    by_label: BTreeMap<&'a str, Vec<&'a Node>>,
}

impl<'a> NodeIndex<'a> {
    /// Index `nodes`. A repeated id keeps its first occurrence.
    #[must_use]
    pub fn build(nodes: &'a [Node]) -> Self {
        let mut index = Self::default();
        for node in nodes {
            if index.by_id.contains_key(node.id.as_str()) {
                continue;
            }
            index.by_id.insert(node.id.as_str(), node);
            index.ordered.push(node);
            for label in &node.labels {
                index.by_label.entry(label.as_str()).or_default().push(node);
            }
        }
        index
    }

    /// Look up a node by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&'a Node> {
        self.by_id.get(id).copied()
    }

    /// Nodes carrying `label`.
    #[must_use]
    pub fn with_label(&self, label: &str) -> &[&'a Node] {
        self.by_label.get(label).map(Vec::as_slice).unwrap_or_default()
    }

    /// All distinct nodes.
    #[must_use]
    pub fn all(&self) -> &[&'a Node] {
        &self.ordered
    }

    /// Nodes carrying any of `labels`, deduplicated by id; all nodes when
    /// `labels` is empty.
    #[must_use]
    pub fn candidates(&self, labels: &[String]) -> Vec<&'a Node> {
        if labels.is_empty() {
            return self.ordered.clone();
        }
        let mut seen = std::collections::BTreeSet::new();
        let mut out = Vec::new();
        for label in labels {
            for node in self.with_label(label) {
                if seen.insert(node.id.as_str()) {
                    out.push(*node);
                }
            }
        }
        out
    }

    /// Number of distinct nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    /// Whether the index holds no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

/// Edges by source, target and type, in encounter order.
#[derive(Debug, Clone, Default)]
pub struct EdgeIndex<'e> {
    by_source: BTreeMap<&'e str, Vec<&'e Edge>>,
    by_target: BTreeMap<&'e str, Vec<&'e Edge>>,
    by_type: BTreeMap<&'e str, Vec<&'e Edge>>,
}

impl<'e> EdgeIndex<'e> {
    /// Index every edge yielded by `edges`.
    #[must_use]
    pub fn build(edges: impl IntoIterator<Item = &'e Edge>) -> Self {
        let mut index = Self::default();
        for edge in edges {
            index.by_source.entry(edge.from.as_str()).or_default().push(edge);
            index.by_target.entry(edge.to.as_str()).or_default().push(edge);
            index.by_type.entry(edge.edge_type.as_str()).or_default().push(edge);
        }
        index
    }

    /// Edges leaving `id`.
    #[must_use]
    pub fn outgoing(&self, id: &str) -> &[&'e Edge] {
        self.by_source.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Edges entering `id`.
    #[must_use]
    pub fn incoming(&self, id: &str) -> &[&'e Edge] {
        self.by_target.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Edges of one type.
    #[must_use]
    pub fn of_type(&self, edge_type: &str) -> &[&'e Edge] {
        self.by_type.get(edge_type).map(Vec::as_slice).unwrap_or_default()
    }
}
