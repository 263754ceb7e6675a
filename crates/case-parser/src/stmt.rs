//! Statement parsers for CASE.
//!
//! One function per statement family, dispatched on the leading token.
//! `overlay` directives buffer in the parser and attach to the next
//! function, so they produce no statement node of their own.

use case_common::token::TokenKind;

use crate::ast::{Node, NodeKind};
use crate::error::ParseError;
use crate::expr;
use crate::Parser;

/// Parse one statement. Returns `None` for `overlay` directives, which only
/// mutate parser state.
pub(crate) fn parse_statement(p: &mut Parser) -> Result<Option<Node>, ParseError> {
    if p.at_keyword("overlay") {
        parse_overlay_directive(p)?;
        return Ok(None);
    }
    parse_statement_node(p).map(Some)
}

fn parse_statement_node(p: &mut Parser) -> Result<Node, ParseError> {
    let tok = p.current();
    match tok.kind {
        TokenKind::Keyword => match tok.text.as_str() {
            "let" => parse_let(p),
            "if" => parse_if(p),
            "while" => parse_while(p),
            "loop" => parse_loop(p),
            "switch" => parse_switch(p),
            "match" => parse_match(p),
            "try" => parse_try(p),
            "throw" => {
                let line = p.bump().line;
                let value = expr::parse_expression(p)?;
                Ok(Node::with_children(NodeKind::Throw, "", line, vec![value]))
            }
            "break" => Ok(Node::new(NodeKind::Break, "", p.bump().line)),
            "continue" => Ok(Node::new(NodeKind::Continue, "", p.bump().line)),
            "ret" | "return" => parse_ret(p),
            "Fn" | "routine" => parse_fn(p),
            "class" => parse_class(p, false),
            "struct" => parse_class(p, true),
            "Print" => {
                let line = p.bump().line;
                let value = expr::parse_expression(p)?;
                Ok(Node::with_children(NodeKind::Print, "", line, vec![value]))
            }
            "open" => parse_open(p),
            "write" => parse_stream_write(p, NodeKind::Write),
            "writeln" => parse_stream_write(p, NodeKind::Writeln),
            "read" => {
                let line = p.bump().line;
                let stream = p.expect_ident("stream name")?;
                let var = p.expect_ident("target variable")?;
                Ok(Node::with_children(
                    NodeKind::Read,
                    stream.text,
                    line,
                    vec![Node::new(NodeKind::Ident, var.text, var.line)],
                ))
            }
            "close" => {
                let line = p.bump().line;
                let stream = p.expect_ident("stream name")?;
                Ok(Node::new(NodeKind::Close, stream.text, line))
            }
            "input" => {
                let line = p.bump().line;
                let var = p.expect_ident("input variable")?;
                Ok(Node::new(NodeKind::Input, var.text, line))
            }
            "channel" => {
                let line = p.bump().line;
                let name = p.expect_ident("channel name")?;
                let elem = p.expect_str("channel element type string")?;
                Ok(Node::with_children(
                    NodeKind::Channel,
                    name.text,
                    line,
                    vec![Node::new(NodeKind::Str, elem.text, elem.line)],
                ))
            }
            "send" => {
                let line = p.bump().line;
                let chan = p.expect_ident("channel name")?;
                let value = expr::parse_expression(p)?;
                Ok(Node::with_children(NodeKind::Send, chan.text, line, vec![value]))
            }
            "recv" => {
                let line = p.bump().line;
                let chan = p.expect_ident("channel name")?;
                let var = p.expect_ident("target variable")?;
                Ok(Node::with_children(
                    NodeKind::Recv,
                    chan.text,
                    line,
                    vec![Node::new(NodeKind::Ident, var.text, var.line)],
                ))
            }
            "sync" => Ok(Node::new(NodeKind::Sync, "", p.bump().line)),
            "schedule" => {
                let line = p.bump().line;
                let priority = p.expect_number("priority literal")?;
                let body = parse_block(p)?;
                Ok(Node::with_children(
                    NodeKind::Schedule,
                    priority.text,
                    line,
                    vec![body],
                ))
            }
            "checkpoint" => {
                let line = p.bump().line;
                let name = p.expect_ident("checkpoint name")?;
                Ok(Node::new(NodeKind::Checkpoint, name.text, line))
            }
            "vbreak" => {
                let line = p.bump().line;
                let name = p.expect_ident("checkpoint name")?;
                Ok(Node::new(NodeKind::VBreak, name.text, line))
            }
            "mutate" => {
                let line = p.bump().line;
                let var = p.expect_ident("variable name")?;
                let value = expr::parse_expression(p)?;
                Ok(Node::with_children(NodeKind::Mutate, var.text, line, vec![value]))
            }
            "scale" => {
                let line = p.bump().line;
                let var = p.expect_ident("variable name")?;
                let mut children = Vec::with_capacity(4);
                for _ in 0..4 {
                    children.push(expr::parse_expression(p)?);
                }
                Ok(Node::with_children(NodeKind::Scale, var.text, line, children))
            }
            "bounds" => {
                let line = p.bump().line;
                let var = p.expect_ident("variable name")?;
                let lo = expr::parse_expression(p)?;
                let hi = expr::parse_expression(p)?;
                Ok(Node::with_children(NodeKind::Bounds, var.text, line, vec![lo, hi]))
            }
            "splice" => {
                let line = p.bump().line;
                let raw = p.expect_str("raw splice string")?;
                Ok(Node::new(NodeKind::Splice, raw.text, line))
            }
            "duration" => {
                let line = p.bump().line;
                let value = expr::parse_expression(p)?;
                let unit = p.expect_str("duration unit string")?;
                Ok(Node::with_children(NodeKind::Duration, unit.text, line, vec![value]))
            }
            "derivative" => {
                let line = p.bump().line;
                let value = expr::parse_expression(p)?;
                let mut wrt = String::new();
                if p.at_kind(TokenKind::Ident) && p.current().text == "wrt" {
                    p.bump();
                    wrt = p.expect_ident("differentiation variable")?.text;
                }
                Ok(Node::with_children(NodeKind::Derivative, wrt, line, vec![value]))
            }
            "call" => parse_call(p),
            _ => Err(p.unexpected()),
        },
        TokenKind::Ident => parse_assignment(p),
        _ => Err(p.unexpected()),
    }
}

/// A `{…}` or `(…)` block of statements, returned as a `Body` node.
pub(crate) fn parse_block(p: &mut Parser) -> Result<Node, ParseError> {
    let (close, line) = if p.at_symbol("{") {
        ("}", p.bump().line)
    } else if p.at_symbol("(") {
        (")", p.bump().line)
    } else {
        return Err(p.expected("`{`"));
    };

    let mut body = Node::new(NodeKind::Body, "", line);
    while !p.at_symbol(close) {
        if p.at_end() {
            return Err(p.expected(format!("`{close}`")));
        }
        if let Some(stmt) = parse_statement(p)? {
            body.children.push(stmt);
        }
    }
    p.bump(); // close delimiter
    Ok(body)
}

// ── Declarations ───────────────────────────────────────────────────────────

/// `Fn name ["kind p, kind p"] [-> type] block`; `routine` is an alias.
/// Pending overlays drain into the new node.
fn parse_fn(p: &mut Parser) -> Result<Node, ParseError> {
    let line = p.bump().line; // Fn / routine
    let name = p.expect_ident("function name")?;

    let mut node = Node::new(NodeKind::Fn, name.text, line);
    node.children.append(&mut p.pending_overlays);

    if p.at_kind(TokenKind::Str) {
        let params = p.bump();
        node.children.push(parse_params_string(&params.text, params.line));
    }

    if p.eat_symbol("->") {
        let ty = p.expect_ident("return type")?;
        node.children.push(Node::new(NodeKind::ReturnType, ty.text, ty.line));
    }

    node.children.push(parse_block(p)?);
    Ok(node)
}

/// Split a params declaration string (`"int a, double b"`) into a `Params`
/// subtree. Entries with a single word are untyped parameters.
fn parse_params_string(decl: &str, line: u32) -> Node {
    let mut params = Node::new(NodeKind::Params, "", line);
    for part in decl.split(',') {
        let words: Vec<&str> = part.split_whitespace().collect();
        match words.as_slice() {
            [] => {}
            [name] => params.children.push(Node::new(NodeKind::Param, *name, line)),
            [kind, name, ..] => {
                let mut param = Node::new(NodeKind::Param, *name, line);
                param.children.push(Node::new(NodeKind::Ident, *kind, line));
                params.children.push(param);
            }
        }
    }
    params
}

/// `class Name [extends A, B] { (public:|private:|protected:|let|Fn)* }`
/// or `struct Name { … }`.
fn parse_class(p: &mut Parser, is_struct: bool) -> Result<Node, ParseError> {
    let line = p.bump().line; // class / struct
    let name = p.expect_ident(if is_struct { "struct name" } else { "class name" })?;
    let kind = if is_struct { NodeKind::Struct } else { NodeKind::Class };
    let mut node = Node::new(kind, name.text, line);

    if !is_struct && p.at_keyword("extends") {
        let ext_line = p.bump().line;
        let mut extends = Node::new(NodeKind::Extends, "", ext_line);
        loop {
            let base = p.expect_ident("base class name")?;
            extends.children.push(Node::new(NodeKind::Ident, base.text, base.line));
            if !p.eat_symbol(",") {
                break;
            }
        }
        node.children.push(extends);
    }

    let open = p.expect_symbol("{")?;
    let mut body = Node::new(NodeKind::Body, "", open.line);
    while !p.at_symbol("}") {
        if p.at_end() {
            return Err(p.expected("`}`"));
        }
        if p.at_keyword("public") || p.at_keyword("private") || p.at_keyword("protected") {
            let label = p.bump();
            p.expect_symbol(":")?;
            body.children.push(Node::new(NodeKind::Access, label.text, label.line));
        } else if p.at_keyword("let") {
            body.children.push(parse_let(p)?);
        } else if p.at_keyword("Fn") || p.at_keyword("routine") {
            body.children.push(parse_fn(p)?);
        } else if p.at_keyword("overlay") {
            parse_overlay_directive(p)?;
        } else {
            return Err(p.unexpected());
        }
    }
    p.bump(); // }
    node.children.push(body);
    Ok(node)
}

/// `overlay name[(lit, …)] [, name…]` -- buffers overlays for the next
/// function or method.
fn parse_overlay_directive(p: &mut Parser) -> Result<(), ParseError> {
    p.bump(); // overlay
    loop {
        let name = p.expect_ident("overlay name")?;
        let mut overlay = Node::new(NodeKind::Overlay, name.text, name.line);
        if p.eat_symbol("(") {
            while !p.at_symbol(")") {
                overlay.children.push(parse_overlay_arg(p)?);
                if !p.eat_symbol(",") {
                    break;
                }
            }
            p.expect_symbol(")")?;
        }
        p.pending_overlays.push(overlay);
        if !p.eat_symbol(",") {
            return Ok(());
        }
    }
}

fn parse_overlay_arg(p: &mut Parser) -> Result<Node, ParseError> {
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
        _ => Err(p.expected("literal overlay argument")),
    }
}

// ── Control flow ───────────────────────────────────────────────────────────

fn parse_let(p: &mut Parser) -> Result<Node, ParseError> {
    let line = p.bump().line; // let
    let name = p.expect_ident("binding name")?;
    p.expect_symbol("=")?;
    let value = expr::parse_expression(p)?;
    Ok(Node::with_children(NodeKind::Let, name.text, line, vec![value]))
}

fn parse_if(p: &mut Parser) -> Result<Node, ParseError> {
    let line = p.bump().line; // if
    let cond_line = p.current_line();
    let cond = expr::parse_expression(p)?;
    let mut node = Node::new(NodeKind::If, "", line);
    node.children
        .push(Node::with_children(NodeKind::Cond, "", cond_line, vec![cond]));
    node.children.push(parse_block(p)?);

    if p.at_keyword("else") {
        let else_line = p.bump().line;
        let else_body = if p.at_keyword("if") {
            // else-if chains nest the inner `If` inside the else body.
            let nested = parse_if(p)?;
            Node::with_children(NodeKind::Body, "", else_line, vec![nested])
        } else {
            parse_block(p)?
        };
        node.children
            .push(Node::with_children(NodeKind::Else, "", else_line, vec![else_body]));
    }
    Ok(node)
}

fn parse_while(p: &mut Parser) -> Result<Node, ParseError> {
    let line = p.bump().line; // while
    let cond_line = p.current_line();
    let cond = expr::parse_expression(p)?;
    let body = parse_block(p)?;
    Ok(Node::with_children(
        NodeKind::While,
        "",
        line,
        vec![
            Node::with_children(NodeKind::Cond, "", cond_line, vec![cond]),
            body,
        ],
    ))
}

fn parse_loop(p: &mut Parser) -> Result<Node, ParseError> {
    let line = p.bump().line; // loop
    let header = p.expect_str("loop header string")?;
    let body = parse_block(p)?;
    Ok(Node::with_children(NodeKind::Loop, header.text, line, vec![body]))
}

fn parse_ret(p: &mut Parser) -> Result<Node, ParseError> {
    let kw = p.bump(); // ret / return
    let mut node = Node::new(NodeKind::Ret, "", kw.line);
    if p.current_line() == kw.line && expr::starts_expression(p.current()) {
        node.children.push(expr::parse_expression(p)?);
    }
    Ok(node)
}

fn parse_try(p: &mut Parser) -> Result<Node, ParseError> {
    let line = p.bump().line; // try
    let body = parse_block(p)?;
    let catch_kw = p.expect_keyword("catch")?;
    let binding = if p.at_kind(TokenKind::Ident) {
        p.bump().text
    } else {
        String::new()
    };
    let catch_body = parse_block(p)?;
    let catch = Node::with_children(NodeKind::Catch, binding, catch_kw.line, vec![catch_body]);
    Ok(Node::with_children(NodeKind::Try, "", line, vec![body, catch]))
}

// ── Switch and match ───────────────────────────────────────────────────────

/// `switch e { case <lit>: <block> … [default: <block>] }`. Case values must
/// be number or string literals; anything else is rejected here.
fn parse_switch(p: &mut Parser) -> Result<Node, ParseError> {
    let line = p.bump().line; // switch
    let scrutinee = expr::parse_expression(p)?;
    let mut node = Node::with_children(NodeKind::Switch, "", line, vec![scrutinee]);

    p.expect_symbol("{")?;
    while !p.at_symbol("}") {
        if p.at_keyword("case") {
            let case_line = p.bump().line;
            let pattern = parse_literal_pattern(p)?;
            p.expect_symbol(":")?;
            let body = parse_block(p)?;
            node.children.push(Node::with_children(
                NodeKind::Case,
                "",
                case_line,
                vec![pattern, body],
            ));
        } else if p.at_keyword("default") {
            let def_line = p.bump().line;
            p.expect_symbol(":")?;
            let body = parse_block(p)?;
            node.children
                .push(Node::with_children(NodeKind::Default, "", def_line, vec![body]));
        } else {
            return Err(p.expected("`case` or `default`"));
        }
    }
    p.bump(); // }
    Ok(node)
}

/// `match e { case <pat>[|,<pat>]…: <block> … [default: <block>] }`.
/// Patterns are number literals, string literals, or the wildcard `_`.
fn parse_match(p: &mut Parser) -> Result<Node, ParseError> {
    let line = p.bump().line; // match
    let scrutinee = expr::parse_expression(p)?;
    let mut node = Node::with_children(NodeKind::Match, "", line, vec![scrutinee]);

    p.expect_symbol("{")?;
    while !p.at_symbol("}") {
        if p.at_keyword("case") {
            let case_line = p.bump().line;
            let mut case = Node::new(NodeKind::Case, "", case_line);
            loop {
                case.children.push(parse_match_pattern(p)?);
                if !p.eat_symbol("|") && !p.eat_symbol(",") {
                    break;
                }
            }
            p.expect_symbol(":")?;
            case.children.push(parse_block(p)?);
            node.children.push(case);
        } else if p.at_keyword("default") {
            let def_line = p.bump().line;
            p.expect_symbol(":")?;
            let body = parse_block(p)?;
            node.children
                .push(Node::with_children(NodeKind::Default, "", def_line, vec![body]));
        } else {
            return Err(p.expected("`case` or `default`"));
        }
    }
    p.bump(); // }
    Ok(node)
}

/// A literal-only pattern (for `switch`).
fn parse_literal_pattern(p: &mut Parser) -> Result<Node, ParseError> {
    let tok = p.current();
    match tok.kind {
        TokenKind::Number => {
            let tok = p.bump();
            let line = tok.line;
            Ok(Node::with_children(
                NodeKind::Pattern,
                "",
                line,
                vec![Node::new(NodeKind::Number, tok.text, line)],
            ))
        }
        TokenKind::Str => {
            let tok = p.bump();
            let line = tok.line;
            Ok(Node::with_children(
                NodeKind::Pattern,
                "",
                line,
                vec![Node::new(NodeKind::Str, tok.text, line)],
            ))
        }
        _ => Err(p.expected("literal case value")),
    }
}

/// A `match` pattern: literal or wildcard `_`.
fn parse_match_pattern(p: &mut Parser) -> Result<Node, ParseError> {
    if p.at_kind(TokenKind::Ident) && p.current().text == "_" {
        let tok = p.bump();
        return Ok(Node::new(NodeKind::Pattern, "_", tok.line));
    }
    parse_literal_pattern(p)
}

// ── Effects and calls ──────────────────────────────────────────────────────

fn parse_open(p: &mut Parser) -> Result<Node, ParseError> {
    let line = p.bump().line; // open
    let var = p.expect_ident("stream variable")?;
    let path = p.expect_str("file path string")?;
    let mode = p.expect_str("open mode string")?;
    Ok(Node::with_children(
        NodeKind::Open,
        var.text,
        line,
        vec![
            Node::new(NodeKind::Str, path.text, path.line),
            Node::new(NodeKind::Str, mode.text, mode.line),
        ],
    ))
}

fn parse_stream_write(p: &mut Parser, kind: NodeKind) -> Result<Node, ParseError> {
    let line = p.bump().line; // write / writeln
    let stream = p.expect_ident("stream name")?;
    let value = expr::parse_expression(p)?;
    Ok(Node::with_children(kind, stream.text, line, vec![value]))
}

/// `call name`, `call name [a, b]`, or `call name a b` with bare arguments
/// on the same line as the call.
fn parse_call(p: &mut Parser) -> Result<Node, ParseError> {
    let line = p.bump().line; // call
    let name = p.expect_ident("callee name")?;
    let mut node = Node::new(NodeKind::Call, name.text, line);

    if p.at_symbol("[") {
        p.bump();
        while !p.at_symbol("]") {
            node.children.push(expr::parse_expression(p)?);
            if !p.eat_symbol(",") {
                break;
            }
        }
        p.expect_symbol("]")?;
        return Ok(node);
    }

    // Bare arguments: expressions on the same line as the call keyword.
    while p.current_line() == line && expr::starts_expression(p.current()) {
        node.children.push(expr::parse_expression(p)?);
    }
    Ok(node)
}

/// Identifier-led fast path: assignment, compound assignment, or postfix
/// increment/decrement (lowered to `+= 1` / `-= 1`).
fn parse_assignment(p: &mut Parser) -> Result<Node, ParseError> {
    let line = p.current_line();
    let target = expr::parse_postfix_target(p)?;

    let op_tok = p.current();
    let op = op_tok.text.clone();
    match op.as_str() {
        "=" | "+=" | "-=" | "*=" | "/=" | "%=" if op_tok.kind == TokenKind::Symbol => {
            p.bump();
            let value = expr::parse_expression(p)?;
            Ok(Node::with_children(NodeKind::Assign, op, line, vec![target, value]))
        }
        "++" | "--" if op_tok.kind == TokenKind::Symbol => {
            let lowered = if op == "++" { "+=" } else { "-=" };
            let one_line = p.bump().line;
            Ok(Node::with_children(
                NodeKind::Assign,
                lowered,
                line,
                vec![target, Node::new(NodeKind::Number, "1", one_line)],
            ))
        }
        _ => Err(p.expected("assignment operator")),
    }
}
