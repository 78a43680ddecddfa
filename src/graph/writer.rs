//! Serialization of a [`GraphDocument`] with a fixed, whitespace-normalized layout

use super::model::{Attributes, Edge, Endpoint, GraphBody, GraphDocument, NodeId, Subgraph};
use std::fmt::{self, Write};

const INDENT: &str = "  ";

impl GraphDocument {
    /// Render the document as graph description text.
    ///
    /// Every statement sits on its own line, terminated by `;`, in this order: graph
    /// attributes, node defaults, edge defaults, nodes, edges, subgraphs.
    pub fn to_dot(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail
        let _ = self.write_dot(&mut out);
        out
    }

    fn write_dot(&self, out: &mut String) -> fmt::Result {
        if self.strict {
            out.push_str("strict ");
        }
        out.push_str(if self.directed { "digraph" } else { "graph" });
        if let Some(name) = &self.name {
            write!(out, " {name}")?;
        }
        out.push_str(" {\n");
        write_body(out, &self.body, self.edge_op(), 1)?;
        out.push_str("}\n");
        Ok(())
    }

    fn edge_op(&self) -> &'static str {
        if self.directed { "->" } else { "--" }
    }
}

impl fmt::Display for GraphDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_dot())
    }
}

fn write_body(out: &mut String, body: &GraphBody, op: &str, depth: usize) -> fmt::Result {
    let pad = INDENT.repeat(depth);

    for (key, value) in &body.attributes {
        writeln!(out, "{pad}{key}={value};")?;
    }
    if !body.node_defaults.is_empty() {
        writeln!(out, "{pad}node{};", attr_list(&body.node_defaults))?;
    }
    if !body.edge_defaults.is_empty() {
        writeln!(out, "{pad}edge{};", attr_list(&body.edge_defaults))?;
    }
    for node in &body.nodes {
        writeln!(out, "{pad}{}{};", node_id(&node.id), attr_list(&node.attributes))?;
    }
    for edge in &body.edges {
        out.push_str(&pad);
        write_edge(out, edge, op, depth)?;
        out.push_str(";\n");
    }
    for subgraph in &body.subgraphs {
        out.push_str(&pad);
        write_subgraph(out, subgraph, op, depth)?;
        out.push_str(";\n");
    }
    Ok(())
}

fn write_edge(out: &mut String, edge: &Edge, op: &str, depth: usize) -> fmt::Result {
    write_endpoint(out, &edge.source, op, depth)?;
    write!(out, " {op} ")?;
    write_endpoint(out, &edge.target, op, depth)?;
    out.push_str(&attr_list(&edge.attributes));
    Ok(())
}

fn write_endpoint(out: &mut String, endpoint: &Endpoint, op: &str, depth: usize) -> fmt::Result {
    match endpoint {
        Endpoint::Node(id) => {
            out.push_str(&node_id(id));
            Ok(())
        }
        Endpoint::Subgraph(subgraph) => write_subgraph(out, subgraph, op, depth),
    }
}

/// Writes `subgraph name {` ... `}` with the closing brace at `depth`, no trailing newline
fn write_subgraph(out: &mut String, subgraph: &Subgraph, op: &str, depth: usize) -> fmt::Result {
    match &subgraph.name {
        Some(name) => write!(out, "subgraph {name} {{\n")?,
        None => out.push_str("{\n"),
    }
    write_body(out, &subgraph.body, op, depth + 1)?;
    out.push_str(&INDENT.repeat(depth));
    out.push('}');
    Ok(())
}

fn node_id(id: &NodeId) -> String {
    let mut text = id.id.to_string();
    for part in &id.port {
        text.push(':');
        text.push_str(&part.to_string());
    }
    text
}

fn attr_list(attributes: &Attributes) -> String {
    if attributes.is_empty() {
        return String::new();
    }
    let pairs: Vec<String> = attributes
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect();
    format!(" [{}]", pairs.join(", "))
}
