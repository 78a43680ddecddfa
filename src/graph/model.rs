//! Structural model of a graph description.
//!
//! The model keeps exactly what equality comparison needs: graph metadata, attributes,
//! explicit node statements, edges in declaration order, and nested subgraphs.

use std::collections::BTreeMap;
use std::fmt;

/// Keywords of the graph description language, matched case-insensitively
const KEYWORDS: [&str; 6] = ["strict", "graph", "digraph", "subgraph", "node", "edge"];

/// An identifier: a bare name, a numeral, a quoted string (stored unquoted), or an HTML string
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id {
    value: String,
    html: bool,
}

impl Id {
    /// Create a regular identifier from its unquoted value
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            html: false,
        }
    }

    /// Create an HTML-like identifier (`<...>`) from the text between the outer brackets
    pub fn html(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            html: true,
        }
    }

    /// The identifier with any enclosing quotes stripped
    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn is_html(&self) -> bool {
        self.html
    }

    fn is_bare_name(value: &str) -> bool {
        let mut chars = value.chars();
        let Some(first) = chars.next() else {
            return false;
        };
        (first.is_ascii_alphabetic() || first == '_' || !first.is_ascii())
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || !c.is_ascii())
            && !KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(value))
    }

    fn is_numeral(value: &str) -> bool {
        let digits = value.strip_prefix('-').unwrap_or(value);
        if digits.is_empty() || digits == "." {
            return false;
        }
        let mut seen_dot = false;
        for c in digits.chars() {
            match c {
                '0'..='9' => {}
                '.' if !seen_dot => seen_dot = true,
                _ => return false,
            }
        }
        true
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.html {
            write!(f, "<{}>", self.value)
        } else if Self::is_bare_name(&self.value) || Self::is_numeral(&self.value) {
            f.write_str(&self.value)
        } else {
            write!(f, "\"{}\"", self.value.replace('"', "\\\""))
        }
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Id::new(value)
    }
}

/// Attribute assignments; keys are unique and the last assignment wins
pub type Attributes = BTreeMap<Id, Id>;

/// A node reference, optionally followed by `:port` / `:compass` parts
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct NodeId {
    pub id: Id,
    pub port: Vec<Id>,
}

impl NodeId {
    pub fn new(id: impl Into<Id>) -> Self {
        Self {
            id: id.into(),
            port: Vec::new(),
        }
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        NodeId::new(value)
    }
}

/// An explicit node statement.
///
/// Ordered by name, then HTML flag, then port, then attributes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Node {
    pub id: NodeId,
    pub attributes: Attributes,
}

/// One side of an edge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Node(NodeId),
    Subgraph(Subgraph),
}

/// An edge statement; `a -> b -> c` is stored as two edges sharing the attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub source: Endpoint,
    pub target: Endpoint,
    pub attributes: Attributes,
}

/// Statements shared by a top-level graph and its subgraphs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphBody {
    /// `key=value` statements and `graph [...]` defaults
    pub attributes: Attributes,
    /// `node [...]` defaults
    pub node_defaults: Attributes,
    /// `edge [...]` defaults
    pub edge_defaults: Attributes,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub subgraphs: Vec<Subgraph>,
}

/// A nested subgraph, named (`subgraph cluster_a { ... }`) or anonymous (`{ ... }`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subgraph {
    pub name: Option<Id>,
    pub body: GraphBody,
}

/// A parsed top-level graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphDocument {
    pub name: Option<Id>,
    pub directed: bool,
    pub strict: bool,
    pub body: GraphBody,
}

impl GraphDocument {
    /// Create an empty document with the given metadata
    pub fn new(name: Option<Id>, directed: bool, strict: bool) -> Self {
        Self {
            name,
            directed,
            strict,
            body: GraphBody::default(),
        }
    }

    /// Number of explicit node statements, including those inside subgraphs
    pub fn node_count(&self) -> usize {
        self.body.node_count()
    }

    /// Number of edges, including those inside subgraphs
    pub fn edge_count(&self) -> usize {
        self.body.edge_count()
    }
}

impl GraphBody {
    fn node_count(&self) -> usize {
        self.nodes.len()
            + self
                .subgraphs
                .iter()
                .map(|s| s.body.node_count())
                .sum::<usize>()
    }

    fn edge_count(&self) -> usize {
        self.edges.len()
            + self
                .subgraphs
                .iter()
                .map(|s| s.body.edge_count())
                .sum::<usize>()
    }
}
