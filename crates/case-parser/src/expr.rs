//! Expression parsers for CASE.
//!
//! Precedence climbing over the binary operator table, with a ternary at the
//! top and postfix chains (call, index, member) over primaries.

use case_common::token::{Token, TokenKind};

use crate::ast::{Node, NodeKind};
use crate::error::ParseError;
use crate::Parser;

/// Binary operator precedence, lowest (1) to highest (6).
fn binary_precedence(op: &str) -> Option<u8> {
    match op {
        "||" => Some(1),
        "&&" => Some(2),
        "==" | "!=" => Some(3),
        "<" | ">" | "<=" | ">=" => Some(4),
        "+" | "-" => Some(5),
        "*" | "/" | "%" => Some(6),
        _ => None,
    }
}

/// Whether a token can begin an expression.
pub(crate) fn starts_expression(tok: &Token) -> bool {
    match tok.kind {
        TokenKind::Number | TokenKind::Str | TokenKind::Ident => true,
        TokenKind::Keyword => matches!(tok.text.as_str(), "true" | "false"),
        TokenKind::Symbol => matches!(tok.text.as_str(), "(" | "-" | "!"),
        _ => false,
    }
}

/// Full expression: binary chain with an optional top-level ternary.
pub(crate) fn parse_expression(p: &mut Parser) -> Result<Node, ParseError> {
    let cond = parse_binary(p, 1)?;
    if p.at_symbol("?") {
        let line = p.bump().line;
        let then = parse_expression(p)?;
        p.expect_symbol(":")?;
        let alt = parse_expression(p)?;
        return Ok(Node::with_children(
            NodeKind::Ternary,
            "",
            line,
            vec![cond, then, alt],
        ));
    }
    Ok(cond)
}

fn parse_binary(p: &mut Parser, min_prec: u8) -> Result<Node, ParseError> {
    let mut lhs = parse_unary(p)?;
    loop {
        let tok = p.current();
        if tok.kind != TokenKind::Symbol {
            break;
        }
        let Some(prec) = binary_precedence(&tok.text) else {
            break;
        };
        if prec < min_prec {
            break;
        }
        let op = p.bump();
        let rhs = parse_binary(p, prec + 1)?;
        lhs = Node::with_children(NodeKind::Binary, op.text, op.line, vec![lhs, rhs]);
    }
    Ok(lhs)
}

fn parse_unary(p: &mut Parser) -> Result<Node, ParseError> {
    if p.at_symbol("!") || p.at_symbol("-") {
        let op = p.bump();
        let operand = parse_unary(p)?;
        return Ok(Node::with_children(
            NodeKind::Unary,
            op.text,
            op.line,
            vec![operand],
        ));
    }
    parse_postfix(p)
}

fn parse_postfix(p: &mut Parser) -> Result<Node, ParseError> {
    let mut node = parse_primary(p)?;
    loop {
        if p.at_symbol("(") {
            let line = p.bump().line;
            let mut call = Node::new(NodeKind::CallExpr, "", line);
            call.children.push(node);
            while !p.at_symbol(")") {
                call.children.push(parse_expression(p)?);
                if !p.eat_symbol(",") {
                    break;
                }
            }
            p.expect_symbol(")")?;
            node = call;
        } else if p.at_symbol("[") {
            let line = p.bump().line;
            let index = parse_expression(p)?;
            p.expect_symbol("]")?;
            node = Node::with_children(NodeKind::Index, "", line, vec![node, index]);
        } else if p.at_symbol(".") {
            p.bump();
            let name = p.expect_ident("member name")?;
            node = Node::with_children(NodeKind::Member, name.text, name.line, vec![node]);
        } else {
            break;
        }
    }
    Ok(node)
}

fn parse_primary(p: &mut Parser) -> Result<Node, ParseError> {
    let tok = p.current();
    match tok.kind {
        TokenKind::Number => {
            let tok = p.bump();
            Ok(Node::new(NodeKind::Number, tok.text, tok.line))
        }
        TokenKind::Str => {
            let tok = p.bump();
            Ok(Node::new(NodeKind::Str, tok.text, tok.line))
        }
        TokenKind::Ident => {
            let tok = p.bump();
            Ok(Node::new(NodeKind::Ident, tok.text, tok.line))
        }
        TokenKind::Keyword if tok.text == "true" => {
            let tok = p.bump();
            Ok(Node::new(NodeKind::Number, "1", tok.line))
        }
        TokenKind::Keyword if tok.text == "false" => {
            let tok = p.bump();
            Ok(Node::new(NodeKind::Number, "0", tok.line))
        }
        TokenKind::Symbol if tok.text == "(" => {
            p.bump();
            let inner = parse_expression(p)?;
            p.expect_symbol(")")?;
            Ok(inner)
        }
        _ => Err(p.invalid_expression()),
    }
}

/// An assignment target: an identifier with optional `.member` and `[index]`
/// postfix steps. Calls are not valid targets.
pub(crate) fn parse_postfix_target(p: &mut Parser) -> Result<Node, ParseError> {
    let name = p.expect_ident("assignment target")?;
    let mut node = Node::new(NodeKind::Ident, name.text, name.line);
    loop {
        if p.at_symbol("[") {
            let line = p.bump().line;
            let index = parse_expression(p)?;
            p.expect_symbol("]")?;
            node = Node::with_children(NodeKind::Index, "", line, vec![node, index]);
        } else if p.at_symbol(".") {
            p.bump();
            let member = p.expect_ident("member name")?;
            node = Node::with_children(NodeKind::Member, member.text, member.line, vec![node]);
        } else {
            break;
        }
    }
    Ok(node)
}
