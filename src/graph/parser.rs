//! Recursive-descent parser producing [`GraphDocument`]s

use super::lexer::{Keyword, Spanned, Token, tokenize};
use super::model::{
    Attributes, Edge, Endpoint, GraphBody, GraphDocument, Id, Node, NodeId, Subgraph,
};
use crate::error::ParseError;

/// What to do when one input contains more than one top-level graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiGraphPolicy {
    /// Use the first graph and discard the rest
    TakeFirst,
    /// Fail with [`ParseError::MultipleGraphs`]
    Reject,
}

/// Policy applied by [`parse_document`] callers that do not choose one explicitly.
///
/// Generated documents occasionally carry more than one graph; the walk keeps going with
/// the first one instead of dropping the commit.
pub const MULTI_GRAPH_POLICY: MultiGraphPolicy = MultiGraphPolicy::TakeFirst;

/// Deepest subgraph nesting accepted before the input is rejected as a syntax error
pub const MAX_NESTING_DEPTH: usize = 256;

/// Parse every top-level graph in `input`
pub fn parse_all(input: &str) -> Result<Vec<GraphDocument>, ParseError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let mut graphs = Vec::new();
    while !parser.at_end() {
        graphs.push(parser.graph()?);
    }
    Ok(graphs)
}

/// Parse exactly one graph from `input`, resolving extra graphs with `policy`
pub fn parse_document(input: &str, policy: MultiGraphPolicy) -> Result<GraphDocument, ParseError> {
    let mut graphs = parse_all(input)?;
    match (graphs.len(), policy) {
        (0, _) => Err(ParseError::NoGraph),
        (1, _) => Ok(graphs.remove(0)),
        (count, MultiGraphPolicy::TakeFirst) => {
            tracing::debug!("Input holds {} graphs, keeping the first", count);
            Ok(graphs.remove(0))
        }
        (count, MultiGraphPolicy::Reject) => Err(ParseError::MultipleGraphs { count }),
    }
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|s| s.token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn error(&self, reason: impl Into<String>) -> ParseError {
        let (line, column) = match self.tokens.get(self.pos).or(self.tokens.last()) {
            Some(s) => (s.line, s.column),
            None => (1, 1),
        };
        ParseError::Syntax {
            line,
            column,
            reason: reason.into(),
        }
    }

    fn expect(&mut self, token: &Token, what: &str) -> Result<(), ParseError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(format!("expected {what}")))
        }
    }

    fn id(&mut self) -> Result<Id, ParseError> {
        let Some(Token::Id(first)) = self.peek().cloned() else {
            return Err(self.error("expected identifier"));
        };
        self.pos += 1;

        // "a" + "b" concatenation
        let mut value = first;
        while self.peek() == Some(&Token::Plus) {
            self.pos += 1;
            match self.advance() {
                Some(Token::Id(next)) => {
                    value = Id::new(format!("{}{}", value.as_str(), next.as_str()))
                }
                _ => return Err(self.error("expected string after '+'")),
            }
        }
        Ok(value)
    }

    fn graph(&mut self) -> Result<GraphDocument, ParseError> {
        let strict = self.eat(&Token::Keyword(Keyword::Strict));
        let directed = match self.peek() {
            Some(Token::Keyword(Keyword::Digraph)) => true,
            Some(Token::Keyword(Keyword::Graph)) => false,
            _ => return Err(self.error("expected 'graph' or 'digraph'")),
        };
        self.pos += 1;
        let name = match self.peek() {
            Some(Token::Id(_)) => Some(self.id()?),
            _ => None,
        };
        self.expect(&Token::LBrace, "'{'")?;
        let mut doc = GraphDocument::new(name, directed, strict);
        doc.body = self.body(directed)?;
        self.expect(&Token::RBrace, "'}'")?;
        Ok(doc)
    }

    /// Statements up to (not including) the closing brace
    fn body(&mut self, directed: bool) -> Result<GraphBody, ParseError> {
        let mut body = GraphBody::default();
        loop {
            match self.peek() {
                None => return Err(self.error("unexpected end of input, expected '}'")),
                Some(Token::RBrace) => return Ok(body),
                Some(Token::Semicolon) | Some(Token::Comma) => {
                    self.pos += 1;
                }
                _ => self.statement(&mut body, directed)?,
            }
        }
    }

    fn statement(&mut self, body: &mut GraphBody, directed: bool) -> Result<(), ParseError> {
        match self.peek() {
            Some(Token::Keyword(Keyword::Graph)) => {
                self.pos += 1;
                let attrs = self.attr_lists()?;
                body.attributes.extend(attrs);
            }
            Some(Token::Keyword(Keyword::Node)) => {
                self.pos += 1;
                let attrs = self.attr_lists()?;
                body.node_defaults.extend(attrs);
            }
            Some(Token::Keyword(Keyword::Edge)) => {
                self.pos += 1;
                let attrs = self.attr_lists()?;
                body.edge_defaults.extend(attrs);
            }
            Some(Token::Keyword(Keyword::Subgraph)) | Some(Token::LBrace) => {
                let subgraph = self.subgraph(directed)?;
                if matches!(self.peek(), Some(Token::EdgeOp(_))) {
                    self.edges(Endpoint::Subgraph(subgraph), body, directed)?;
                } else {
                    body.subgraphs.push(subgraph);
                }
            }
            Some(Token::Id(_)) => {
                if self.tokens.get(self.pos + 1).map(|s| &s.token) == Some(&Token::Equals) {
                    let key = self.id()?;
                    self.pos += 1;
                    let value = self.id()?;
                    body.attributes.insert(key, value);
                    return Ok(());
                }

                let node_id = self.node_id()?;
                if matches!(self.peek(), Some(Token::EdgeOp(_))) {
                    self.edges(Endpoint::Node(node_id), body, directed)?;
                } else {
                    let attributes = self.attr_lists()?;
                    body.nodes.push(Node {
                        id: node_id,
                        attributes,
                    });
                }
            }
            _ => return Err(self.error("expected statement")),
        }
        Ok(())
    }

    fn node_id(&mut self) -> Result<NodeId, ParseError> {
        let id = self.id()?;
        let mut port = Vec::new();
        while self.eat(&Token::Colon) {
            port.push(self.id()?);
        }
        Ok(NodeId { id, port })
    }

    fn subgraph(&mut self, directed: bool) -> Result<Subgraph, ParseError> {
        let mut name = None;
        if self.eat(&Token::Keyword(Keyword::Subgraph))
            && let Some(Token::Id(_)) = self.peek()
        {
            name = Some(self.id()?);
        }
        self.expect(&Token::LBrace, "'{'")?;
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(self.error(format!(
                "subgraphs nested deeper than {MAX_NESTING_DEPTH} levels"
            )));
        }
        self.depth += 1;
        let body = self.body(directed);
        self.depth -= 1;
        let body = body?;
        self.expect(&Token::RBrace, "'}'")?;
        Ok(Subgraph { name, body })
    }

    fn endpoint(&mut self, directed: bool) -> Result<Endpoint, ParseError> {
        match self.peek() {
            Some(Token::Keyword(Keyword::Subgraph)) | Some(Token::LBrace) => {
                Ok(Endpoint::Subgraph(self.subgraph(directed)?))
            }
            Some(Token::Id(_)) => Ok(Endpoint::Node(self.node_id()?)),
            _ => Err(self.error("expected node or subgraph after edge operator")),
        }
    }

    /// `first -> x -> y [attrs]`, with the cursor on the first edge operator
    fn edges(
        &mut self,
        first: Endpoint,
        body: &mut GraphBody,
        directed: bool,
    ) -> Result<(), ParseError> {
        let mut chain = vec![first];
        while let Some(Token::EdgeOp(op_directed)) = self.peek() {
            if *op_directed != directed {
                let expected = if directed { "'->'" } else { "'--'" };
                return Err(self.error(format!("expected {expected} in this graph")));
            }
            self.pos += 1;
            chain.push(self.endpoint(directed)?);
        }
        let attributes = self.attr_lists()?;
        for pair in chain.windows(2) {
            body.edges.push(Edge {
                source: pair[0].clone(),
                target: pair[1].clone(),
                attributes: attributes.clone(),
            });
        }
        Ok(())
    }

    /// Zero or more `[a=b, c]` lists, merged in order
    fn attr_lists(&mut self) -> Result<Attributes, ParseError> {
        let mut attributes = Attributes::new();
        while self.eat(&Token::LBracket) {
            loop {
                match self.peek() {
                    Some(Token::RBracket) => {
                        self.pos += 1;
                        break;
                    }
                    Some(Token::Semicolon) | Some(Token::Comma) => {
                        self.pos += 1;
                    }
                    Some(Token::Id(_)) => {
                        let key = self.id()?;
                        let value = if self.eat(&Token::Equals) {
                            self.id()?
                        } else {
                            Id::new("true")
                        };
                        attributes.insert(key, value);
                    }
                    _ => return Err(self.error("expected attribute or ']'")),
                }
            }
        }
        Ok(attributes)
    }
}
