//! Canonical form of a graph description, used as the snapshot dedup key.
//!
//! Two graph texts are equivalent exactly when their canonical outputs are byte-identical.
//! Node statements are sorted by name; edges and subgraphs keep their declaration order.

use super::model::{Edge, Endpoint, GraphBody, GraphDocument, Subgraph};
use super::parser::{MULTI_GRAPH_POLICY, MultiGraphPolicy, parse_document};
use crate::error::ParseError;

/// Canonicalize `raw` using the default [`MULTI_GRAPH_POLICY`]
pub fn canonicalize(raw: &str) -> Result<String, ParseError> {
    canonicalize_with(raw, MULTI_GRAPH_POLICY)
}

/// Canonicalize `raw`, resolving multiple top-level graphs with `policy`
pub fn canonicalize_with(raw: &str, policy: MultiGraphPolicy) -> Result<String, ParseError> {
    let document = parse_document(raw, policy)?;
    Ok(document.canonical().to_dot())
}

impl GraphDocument {
    /// A fresh document with the same metadata and attributes, nodes sorted by name
    pub fn canonical(&self) -> GraphDocument {
        GraphDocument {
            name: self.name.clone(),
            directed: self.directed,
            strict: self.strict,
            body: self.body.canonical(),
        }
    }
}

impl GraphBody {
    fn canonical(&self) -> GraphBody {
        let mut nodes = self.nodes.clone();
        // Full ordering: repeated statements for one node land in the same order whatever
        // their source order
        nodes.sort();

        GraphBody {
            attributes: self.attributes.clone(),
            node_defaults: self.node_defaults.clone(),
            edge_defaults: self.edge_defaults.clone(),
            nodes,
            edges: self.edges.iter().map(Edge::canonical).collect(),
            subgraphs: self.subgraphs.iter().map(Subgraph::canonical).collect(),
        }
    }
}

impl Edge {
    fn canonical(&self) -> Edge {
        Edge {
            source: self.source.canonical(),
            target: self.target.canonical(),
            attributes: self.attributes.clone(),
        }
    }
}

impl Endpoint {
    fn canonical(&self) -> Endpoint {
        match self {
            Endpoint::Node(id) => Endpoint::Node(id.clone()),
            Endpoint::Subgraph(subgraph) => Endpoint::Subgraph(subgraph.canonical()),
        }
    }
}

impl Subgraph {
    fn canonical(&self) -> Subgraph {
        Subgraph {
            name: self.name.clone(),
            body: self.body.canonical(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_is_idempotent() {
        let inputs = [
            "digraph{b;a;a->b}",
            "strict digraph \"deps\" { rankdir=LR; node [shape=box]; z; y [color=red]; y -> z; subgraph cluster_1 { q; p } }",
            "graph { b -- a; a; c [label=\"x y\"]; { d; c } }",
        ];
        for input in inputs {
            let once = canonicalize(input).unwrap();
            let twice = canonicalize(&once).unwrap();
            assert_eq!(once, twice, "not idempotent for {input}");
        }
    }

    #[test]
    fn test_node_order_does_not_matter() {
        let a = canonicalize("digraph { c; a; b; a -> b; b -> c }").unwrap();
        let b = canonicalize("digraph { b; c; a; a -> b; b -> c }").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_repeated_node_statements_do_not_depend_on_order() {
        let a = canonicalize("digraph { a [color=red]; b; a [shape=box] }").unwrap();
        let b = canonicalize("digraph { a [shape=box]; b; a [color=red] }").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, "digraph {\n  a [color=red];\n  a [shape=box];\n  b;\n}\n");

        let c = canonicalize("digraph { a:p2; a; \"a\":p1 }").unwrap();
        let d = canonicalize("digraph { a:p1; a:p2; a }").unwrap();
        assert_eq!(c, d);
    }

    #[test]
    fn test_deep_nesting_is_a_parse_error() {
        let depth = 10_000;
        let raw = format!("digraph {{ {} {} }}", "{".repeat(depth), "}".repeat(depth));
        assert!(matches!(canonicalize(&raw), Err(ParseError::Syntax { .. })));
    }

    #[test]
    fn test_edge_order_matters() {
        let a = canonicalize("digraph { a; b; c; a -> b; b -> c }").unwrap();
        let b = canonicalize("digraph { a; b; c; b -> c; a -> b }").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_whitespace_and_attribute_order_do_not_matter() {
        let a = canonicalize("digraph{b;a;a->b}").unwrap();
        let b = canonicalize("digraph {\n    a ;\n  b\n  a -> b\n}\n").unwrap();
        assert_eq!(a, b);

        let c = canonicalize("digraph { a [color=red, shape=box] }").unwrap();
        let d = canonicalize("digraph { a [shape=box] [color=red] }").unwrap();
        assert_eq!(c, d);
    }

    #[test]
    fn test_quoted_names_sort_without_quotes() {
        let out = canonicalize(r#"digraph { "b"; a; "A c" }"#).unwrap();
        assert_eq!(out, "digraph {\n  \"A c\";\n  a;\n  b;\n}\n");
    }

    #[test]
    fn test_subgraph_order_is_preserved() {
        let out = canonicalize("digraph { subgraph z { y; x } subgraph a { w } }").unwrap();
        let z = out.find("subgraph z").unwrap();
        let a = out.find("subgraph a").unwrap();
        assert!(z < a, "subgraphs must not be sorted by name");
        assert!(out.find("    x;").unwrap() < out.find("    y;").unwrap());
    }

    #[test]
    fn test_metadata_is_kept() {
        let out = canonicalize("strict graph deps { a }").unwrap();
        assert!(out.starts_with("strict graph deps {"));
    }

    #[test]
    fn test_top_level_attributes_are_kept() {
        let a = canonicalize("digraph { rankdir=LR; bgcolor=white; a }").unwrap();
        let b = canonicalize("digraph { graph [bgcolor=white]; a; rankdir=LR }").unwrap();
        assert_eq!(a, b);

        let c = canonicalize("digraph { rankdir=TB; bgcolor=white; a }").unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_reject_policy_is_available() {
        assert!(canonicalize("digraph { a } digraph { b }").is_ok());
        assert_eq!(
            canonicalize_with("digraph { a } digraph { b }", MultiGraphPolicy::Reject),
            Err(ParseError::MultipleGraphs { count: 2 })
        );
    }

    #[test]
    fn test_malformed_input_fails() {
        assert!(canonicalize("digraph { a -> }").is_err());
        assert!(canonicalize("not a graph").is_err());
        assert_eq!(canonicalize(""), Err(ParseError::NoGraph));
    }
}
