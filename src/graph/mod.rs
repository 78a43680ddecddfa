//! Graph description parsing and canonicalization
//!
//! Parses graph-description text into a [`GraphDocument`] and re-serializes it in a
//! deterministic form so that structurally identical graphs compare equal as strings.

/// Canonical re-serialization used for snapshot deduplication
pub mod canonical;
mod lexer;
/// Structural model of a parsed graph
pub mod model;
/// Parser and multi-graph policy
pub mod parser;
mod writer;

pub use canonical::{canonicalize, canonicalize_with};
pub use model::{Attributes, Edge, Endpoint, GraphBody, GraphDocument, Id, Node, NodeId, Subgraph};
pub use parser::{MAX_NESTING_DEPTH, MULTI_GRAPH_POLICY, MultiGraphPolicy, parse_all, parse_document};
