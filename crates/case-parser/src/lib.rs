// CASE parser -- recursive descent over the token stream, producing the
// shared Node tree.

pub mod ast;
pub mod error;
mod expr;
mod stmt;

use case_common::token::{Token, TokenKind};

pub use ast::{Node, NodeKind};
pub use error::{ParseError, ParseErrorKind};

/// Parse a full token stream (as produced by `case-lexer`, ending in `End`)
/// into a `Program` tree.
pub fn parse(tokens: &[Token]) -> Result<Node, ParseError> {
    let mut parser = Parser::new(tokens);
    let mut program = Node::new(NodeKind::Program, "", 1);
    while !parser.at_end() {
        if let Some(stmt) = stmt::parse_statement(&mut parser)? {
            program.children.push(stmt);
        }
    }
    Ok(program)
}

/// Parser state: a token slice, a position, and the pending overlay buffer.
///
/// The overlay buffer lives here rather than in any global so the parser is
/// trivially reentrant; `overlay` directives accumulate and the next
/// function or method drains them into its `Overlay` children.
pub(crate) struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    pub(crate) pending_overlays: Vec<Node>,
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        debug_assert!(
            tokens.last().is_some_and(|t| t.kind == TokenKind::End),
            "token stream must end with End"
        );
        Self {
            tokens,
            pos: 0,
            pending_overlays: Vec::new(),
        }
    }

    /// The current token. Clamped to the trailing `End` token.
    pub(crate) fn current(&self) -> &'t Token {
        let idx = self.pos.min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    /// Consume and return the current token.
    pub(crate) fn bump(&mut self) -> Token {
        let tok = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    pub(crate) fn at_end(&self) -> bool {
        self.current().kind == TokenKind::End
    }

    pub(crate) fn at_kind(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    pub(crate) fn at_keyword(&self, kw: &str) -> bool {
        self.current().is_keyword(kw)
    }

    pub(crate) fn at_symbol(&self, sym: &str) -> bool {
        self.current().is_symbol(sym)
    }

    /// Consume the symbol if present, returning whether it was.
    pub(crate) fn eat_symbol(&mut self, sym: &str) -> bool {
        if self.at_symbol(sym) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Consume the current token if it is the given symbol, else fail.
    pub(crate) fn expect_symbol(&mut self, sym: &str) -> Result<Token, ParseError> {
        if self.at_symbol(sym) {
            Ok(self.bump())
        } else {
            Err(self.expected(format!("`{sym}`")))
        }
    }

    /// Consume the current token if it is the given keyword, else fail.
    pub(crate) fn expect_keyword(&mut self, kw: &str) -> Result<Token, ParseError> {
        if self.at_keyword(kw) {
            Ok(self.bump())
        } else {
            Err(self.expected(format!("`{kw}`")))
        }
    }

    /// Consume an identifier token, else fail.
    pub(crate) fn expect_ident(&mut self, what: &str) -> Result<Token, ParseError> {
        if self.at_kind(TokenKind::Ident) {
            Ok(self.bump())
        } else {
            Err(self.expected(what))
        }
    }

    /// Consume a string literal token, else fail.
    pub(crate) fn expect_str(&mut self, what: &str) -> Result<Token, ParseError> {
        if self.at_kind(TokenKind::Str) {
            Ok(self.bump())
        } else {
            Err(self.expected(what))
        }
    }

    /// Consume a number literal token, else fail.
    pub(crate) fn expect_number(&mut self, what: &str) -> Result<Token, ParseError> {
        if self.at_kind(TokenKind::Number) {
            Ok(self.bump())
        } else {
            Err(self.expected(what))
        }
    }

    /// An `Expected` error at the current token.
    pub(crate) fn expected(&self, what: impl Into<String>) -> ParseError {
        let tok = self.current();
        ParseError::expected(what, describe(tok), tok.span, tok.line)
    }

    /// An `UnexpectedToken` error at the current token.
    pub(crate) fn unexpected(&self) -> ParseError {
        let tok = self.current();
        ParseError::unexpected(describe(tok), tok.span, tok.line)
    }

    /// An `InvalidExpression` error at the current token.
    pub(crate) fn invalid_expression(&self) -> ParseError {
        let tok = self.current();
        ParseError::invalid_expression(describe(tok), tok.span, tok.line)
    }

    pub(crate) fn current_line(&self) -> u32 {
        self.current().line
    }
}

/// Render a token for error messages.
pub(crate) fn describe(tok: &Token) -> String {
    match tok.kind {
        TokenKind::End => "end of input".to_string(),
        TokenKind::Str => format!("string {:?}", tok.text),
        _ => format!("`{}`", tok.text),
    }
}
