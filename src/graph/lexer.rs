//! Tokenizer for graph descriptions

use super::model::Id;
use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Keyword {
    Strict,
    Graph,
    Digraph,
    Subgraph,
    Node,
    Edge,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Equals,
    Semicolon,
    Comma,
    Colon,
    Plus,
    /// `->` (true) or `--` (false)
    EdgeOp(bool),
    Keyword(Keyword),
    Id(Id),
}

#[derive(Debug, Clone)]
pub(crate) struct Spanned {
    pub token: Token,
    pub line: usize,
    pub column: usize,
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    at_line_start: bool,
}

/// Split `input` into tokens, dropping whitespace and comments
pub(crate) fn tokenize(input: &str) -> Result<Vec<Spanned>, ParseError> {
    let mut lexer = Lexer {
        chars: input.chars().collect(),
        pos: 0,
        line: 1,
        column: 1,
        at_line_start: true,
    };
    let mut tokens = Vec::new();
    while let Some(spanned) = lexer.next_token()? {
        tokens.push(spanned);
    }
    Ok(tokens)
}

impl Lexer {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
            self.at_line_start = true;
        } else {
            self.column += 1;
            if !c.is_whitespace() {
                self.at_line_start = false;
            }
        }
        Some(c)
    }

    fn error(&self, line: usize, column: usize, reason: impl Into<String>) -> ParseError {
        ParseError::Syntax {
            line,
            column,
            reason: reason.into(),
        }
    }

    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(c), _) if c.is_whitespace() => {
                    self.bump();
                }
                // Preprocessor output lines
                (Some('#'), _) if self.at_line_start => self.skip_line(),
                (Some('/'), Some('/')) => self.skip_line(),
                (Some('/'), Some('*')) => {
                    let (line, column) = (self.line, self.column);
                    self.bump();
                    self.bump();
                    loop {
                        match self.bump() {
                            Some('*') if self.peek() == Some('/') => {
                                self.bump();
                                break;
                            }
                            Some(_) => {}
                            None => return Err(self.error(line, column, "unterminated comment")),
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn next_token(&mut self) -> Result<Option<Spanned>, ParseError> {
        self.skip_trivia()?;
        let (line, column) = (self.line, self.column);
        let Some(c) = self.peek() else {
            return Ok(None);
        };

        let token = match c {
            '{' => self.single(Token::LBrace),
            '}' => self.single(Token::RBrace),
            '[' => self.single(Token::LBracket),
            ']' => self.single(Token::RBracket),
            '=' => self.single(Token::Equals),
            ';' => self.single(Token::Semicolon),
            ',' => self.single(Token::Comma),
            ':' => self.single(Token::Colon),
            '+' => self.single(Token::Plus),
            '-' if self.peek_at(1) == Some('>') => {
                self.bump();
                self.bump();
                Token::EdgeOp(true)
            }
            '-' if self.peek_at(1) == Some('-') => {
                self.bump();
                self.bump();
                Token::EdgeOp(false)
            }
            '"' => Token::Id(self.quoted(line, column)?),
            '<' => Token::Id(self.html(line, column)?),
            c if c.is_ascii_digit() || c == '.' || c == '-' => {
                Token::Id(self.numeral(line, column)?)
            }
            c if c.is_ascii_alphabetic() || c == '_' || !c.is_ascii() => self.word(),
            other => {
                return Err(self.error(line, column, format!("unexpected character '{other}'")));
            }
        };

        Ok(Some(Spanned {
            token,
            line,
            column,
        }))
    }

    fn single(&mut self, token: Token) -> Token {
        self.bump();
        token
    }

    fn word(&mut self) -> Token {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' || !c.is_ascii() {
                word.push(c);
                self.bump();
            } else {
                break;
            }
        }
        match word.to_ascii_lowercase().as_str() {
            "strict" => Token::Keyword(Keyword::Strict),
            "graph" => Token::Keyword(Keyword::Graph),
            "digraph" => Token::Keyword(Keyword::Digraph),
            "subgraph" => Token::Keyword(Keyword::Subgraph),
            "node" => Token::Keyword(Keyword::Node),
            "edge" => Token::Keyword(Keyword::Edge),
            _ => Token::Id(Id::new(word)),
        }
    }

    fn numeral(&mut self, line: usize, column: usize) -> Result<Id, ParseError> {
        let mut text = String::new();
        if self.peek() == Some('-') {
            text.push('-');
            self.bump();
        }
        let mut seen_dot = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' => text.push(c),
                '.' if !seen_dot => {
                    seen_dot = true;
                    text.push(c);
                }
                _ => break,
            }
            self.bump();
        }
        if !text.chars().any(|c| c.is_ascii_digit()) {
            return Err(self.error(line, column, format!("invalid numeral '{text}'")));
        }
        Ok(Id::new(text))
    }

    fn quoted(&mut self, line: usize, column: usize) -> Result<Id, ParseError> {
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(Id::new(value)),
                Some('\\') => match self.peek() {
                    Some('"') => {
                        self.bump();
                        value.push('"');
                    }
                    // Line continuation
                    Some('\n') => {
                        self.bump();
                    }
                    Some('\r') if self.peek_at(1) == Some('\n') => {
                        self.bump();
                        self.bump();
                    }
                    _ => value.push('\\'),
                },
                Some(c) => value.push(c),
                None => return Err(self.error(line, column, "unterminated string")),
            }
        }
    }

    fn html(&mut self, line: usize, column: usize) -> Result<Id, ParseError> {
        self.bump();
        let mut depth = 1usize;
        let mut value = String::new();
        loop {
            match self.bump() {
                Some('<') => {
                    depth += 1;
                    value.push('<');
                }
                Some('>') => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(Id::html(value));
                    }
                    value.push('>');
                }
                Some(c) => value.push(c),
                None => return Err(self.error(line, column, "unterminated HTML string")),
            }
        }
    }
}
