//! Query execution.
//!
//! Per execution: evaluate the query's rules, index base + derived edges,
//! bind every pattern, fold the pattern bindings with an equi-join, filter,
//! project and stop at the limit.

use super::index::{EdgeIndex, NodeIndex};
use super::{Pattern, QueryAst};
use crate::binding::{Binding, Bound, edge_binding_key, join_bindings, resolve_path};
use crate::evaluator::evaluate_rules_report;
use crate::primitives::DEFAULT_MAX_ITERATIONS;
use crate::{Artifact, CanonError, Edge};
use serde_json::{Map, Value};

/// One result row: return column to projected value.
pub type Row = Map<String, Value>;

/// Read-only query engine over one artifact.
///
/// Node indices are built at construction and reused across executions.
#[derive(Debug, Clone)]
pub struct QueryEngine<'a> {
    artifact: &'a Artifact,
    nodes: NodeIndex<'a>,
    max_iterations: usize,
}

impl<'a> QueryEngine<'a> {
    /// Create an engine, indexing the artifact's nodes.
    #[must_use]
    pub fn new(artifact: &'a Artifact) -> Self {
        Self {
            artifact,
            nodes: NodeIndex::build(&artifact.nodes),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Override the rule evaluator's round cap.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Execute a query.
    ///
    /// Fails only on invalid invocation: a rule that does not validate.
    /// Missing nodes, paths or failing predicates degrade to no match or
    /// `null`.
    pub fn execute(&self, ast: &QueryAst) -> Result<Vec<Row>, CanonError> {
        for rule in &ast.rules {
            rule.validate()?;
        }

        let derived: Vec<Edge> = if ast.rules.is_empty() {
            Vec::new()
        } else {
            evaluate_rules_report(self.artifact, &ast.rules, self.max_iterations).edges
        };
        let edges = EdgeIndex::build(self.artifact.edges.iter().chain(derived.iter()));

        let rows = self.collect_rows(ast, &edges);

        tracing::debug!(
            dataset = %self.artifact.dataset,
            patterns = ast.patterns.len(),
            derived = derived.len(),
            rows = rows.len(),
            "query executed"
        );
        Ok(rows)
    }

    fn collect_rows<'e>(&self, ast: &QueryAst, edges: &EdgeIndex<'e>) -> Vec<Row>
    where
        'a: 'e,
    {
        if ast.patterns.is_empty() || ast.limit == Some(0) {
            return Vec::new();
        }

        let mut bindings: Vec<Binding<'e>> = vec![Binding::new()];
        for pattern in &ast.patterns {
            let matched = self.bind_pattern(pattern, edges);
            bindings = join_bindings(&bindings, &matched);
            if bindings.is_empty() {
                return Vec::new();
            }
        }

        let mut rows = Vec::new();
        for binding in &bindings {
            if ast.filter.as_ref().is_some_and(|f| !f.accepts(binding)) {
                continue;
            }
            rows.push(project(ast, binding));
            if ast.limit.is_some_and(|limit| rows.len() >= limit) {
                break;
            }
        }
        rows
    }

    fn bind_pattern<'e>(&self, pattern: &Pattern, edges: &EdgeIndex<'e>) -> Vec<Binding<'e>>
    where
        'a: 'e,
    {
        match (pattern.vars.as_slice(), &pattern.edge) {
            ([var], None) => self
                .nodes
                .candidates(&var.labels)
                .into_iter()
                .map(|node| Binding::from([(var.name.clone(), Bound::Node(node))]))
                .collect(),
            ([source, target, ..], Some(edge_pattern)) => {
                let edge_key = edge_binding_key(&source.name, &target.name);
                let mut out = Vec::new();
                for from in self.nodes.candidates(&source.labels) {
                    for edge in edges.outgoing(&from.id) {
                        if edge_pattern
                            .edge_type
                            .as_deref()
                            .is_some_and(|t| !edge.is_type(t))
                        {
                            continue;
                        }
                        let Some(to) = self.nodes.get(&edge.to) else {
                            continue;
                        };
                        if !target.labels.is_empty()
                            && !to.labels.iter().any(|l| target.labels.contains(l))
                        {
                            continue;
                        }
                        if source.name == target.name && from.id != to.id {
                            continue;
                        }
                        let mut binding = Binding::new();
                        binding.insert(source.name.clone(), Bound::Node(from));
                        binding.insert(target.name.clone(), Bound::Node(to));
                        binding.insert(edge_key.clone(), Bound::Edge(*edge));
                        out.push(binding);
                    }
                }
                out
            }
            (vars, _) => {
                let mut product: Vec<Binding<'e>> = vec![Binding::new()];
                for var in vars {
                    let candidates = self.nodes.candidates(&var.labels);
                    let mut next = Vec::with_capacity(product.len() * candidates.len());
                    for partial in &product {
                        for node in &candidates {
                            let mut binding = partial.clone();
                            binding.insert(var.name.clone(), Bound::Node(*node));
                            next.push(binding);
                        }
                    }
                    product = next;
                }
                product
            }
        }
    }
}

fn project(ast: &QueryAst, binding: &Binding<'_>) -> Row {
    ast.returns
        .iter()
        .map(|item| {
            let value = resolve_path(binding, &item.expr).unwrap_or(Value::Null);
            (item.column().to_string(), value)
        })
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::Rule;
    use crate::query::{Filter, NodeVar, WhereClause, WhereOp};
    use crate::{Edge, Node};
    use serde_json::json;

    fn terms() -> Artifact {
        Artifact::new("terms")
            .with_node(Node::new("t1").with_label("Term").with_prop("label", "Alpha Beta"))
            .with_node(Node::new("t2").with_label("Term").with_prop("label", "Gamma"))
            .with_edge(Edge::new("ALIGNS_WITH", "t1", "t2"))
    }

    fn aligned() -> QueryAst {
        QueryAst::new()
            .matching(Pattern::edge(
                NodeVar::labeled("a", "Term"),
                Some("ALIGNS_WITH"),
                NodeVar::labeled("b", "Term"),
            ))
            .returning("a.id", Some("from"))
            .returning("b.id", Some("to"))
    }

    #[test]
    fn one_hop_match_with_where() {
        let artifact = terms();
        let ast = aligned().filter(WhereClause::new("a", WhereOp::Contains, "Alpha").on("props.label"));

        let rows = QueryEngine::new(&artifact).execute(&ast).expect("execute");
        assert_eq!(rows, vec![json!({"from": "t1", "to": "t2"}).as_object().cloned().expect("row")]);
    }

    #[test]
    fn where_can_exclude_everything() {
        let artifact = terms();
        let ast = aligned().filter(WhereClause::new("b", WhereOp::Contains, "Alpha").on("props.label"));
        assert!(ast.run(&artifact).expect("execute").is_empty());
    }

    #[test]
    fn missing_return_path_is_null() {
        let artifact = terms();
        let ast = aligned().returning("a.props.missing.deeper", None);
        let rows = ast.run(&artifact).expect("execute");
        assert_eq!(rows[0]["a.props.missing.deeper"], Value::Null);
    }

    #[test]
    fn edge_binding_is_projectable() {
        let artifact = terms();
        let ast = aligned().returning("a__edge__b.type", Some("rel"));
        let rows = ast.run(&artifact).expect("execute");
        assert_eq!(rows[0]["rel"], "ALIGNS_WITH");
    }

    #[test]
    fn dangling_edges_are_skipped() {
        let artifact = terms().with_edge(Edge::new("ALIGNS_WITH", "t1", "ghost"));
        let rows = aligned().run(&artifact).expect("execute");
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn limit_returns_prefix() {
        let artifact = terms();
        let all = QueryAst::new()
            .matching(Pattern::node(NodeVar::labeled("n", "Term")))
            .returning("n.id", Some("id"));
        let unlimited = all.run(&artifact).expect("execute");
        let limited = all.clone().limit(1).run(&artifact).expect("execute");

        assert_eq!(unlimited.len(), 2);
        assert_eq!(limited.as_slice(), &unlimited[..1]);
        assert!(all.limit(0).run(&artifact).expect("execute").is_empty());
    }

    #[test]
    fn unconnected_vars_form_product() {
        let artifact = terms();
        let ast = QueryAst::new()
            .matching(Pattern::product(vec![NodeVar::new("x"), NodeVar::new("y")]))
            .returning("x.id", None);
        assert_eq!(ast.run(&artifact).expect("execute").len(), 4);
    }

    #[test]
    fn patterns_join_on_shared_vars() {
        let artifact = terms()
            .with_node(Node::new("t3").with_label("Term"))
            .with_edge(Edge::new("ALIGNS_WITH", "t2", "t3"));
        let ast = QueryAst::new()
            .matching(Pattern::edge(NodeVar::new("a"), Some("ALIGNS_WITH"), NodeVar::new("b")))
            .matching(Pattern::edge(NodeVar::new("b"), Some("ALIGNS_WITH"), NodeVar::new("c")))
            .returning("a.id", Some("a"))
            .returning("c.id", Some("c"));

        let rows = ast.run(&artifact).expect("execute");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["a"], "t1");
        assert_eq!(rows[0]["c"], "t3");
    }

    #[test]
    fn rule_seeded_query() {
        let artifact = Artifact::new("seeded")
            .with_node(Node::new("a1").with_label("A"))
            .with_node(Node::new("b1").with_label("B").with_prop("label", "Beta One"))
            .with_node(Node::new("b2").with_label("B").with_prop("label", "Beta Two"))
            .with_edge(Edge::new("LINK", "a1", "b1"))
            .with_edge(Edge::new("LINK", "a1", "b2"));
        let rule = Rule::new("RELATED", "a", "b")
            .named("related-one")
            .edge(Some("LINK"), "a", "b")
            .label("a", "A")
            .label("b", "B")
            .prop_contains("b", &["props", "label"], "One");
        let ast = QueryAst::new()
            .matching(Pattern::edge(NodeVar::new("a"), Some("RELATED"), NodeVar::new("b")))
            .returning("a.id", Some("from"))
            .returning("b.id", Some("to"))
            .with_rule(rule);

        let rows = QueryEngine::new(&artifact).execute(&ast).expect("execute");
        assert_eq!(rows, vec![json!({"from": "a1", "to": "b1"}).as_object().cloned().expect("row")]);
        assert!(!artifact.has_edge("RELATED", "a1", "b1"));
    }

    #[test]
    fn rules_with_negation_are_rejected() {
        let artifact = terms();
        let rule = Rule::new("X", "a", "b")
            .edge(None, "a", "b")
            .literal(crate::evaluator::Literal::negated(crate::evaluator::Pred::Label {
                v: "a".into(),
                label: "Term".into(),
            }));
        let err = aligned().with_rule(rule).run(&artifact).err().expect("rejected");
        assert!(matches!(err, CanonError::UnsupportedFeature(_)));
    }

    #[test]
    fn predicate_filter_sees_bindings() {
        let artifact = terms();
        let ast = aligned().filter(Filter::predicate(|binding| {
            Ok(binding
                .get("b")
                .and_then(|b| b.as_node())
                .is_some_and(|n| n.id == "t2"))
        }));
        assert_eq!(ast.run(&artifact).expect("execute").len(), 1);
    }
}
