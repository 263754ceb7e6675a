//! Expression lowering to C++ source fragments.

use case_parser::{Node, NodeKind};

use crate::error::EmitError;

/// Lower an expression subtree to a C++ fragment.
pub(crate) fn emit_expr(e: &Node) -> Result<String, EmitError> {
    match e.kind {
        NodeKind::Number => Ok(number_text(&e.payload)),
        NodeKind::Str => Ok(string_literal(&e.payload)),
        NodeKind::Ident => Ok(e.payload.clone()),
        NodeKind::Binary => {
            let [lhs, rhs] = e.children.as_slice() else {
                return Err(EmitError::invalid_shape("Binary", "expected 2 children", e.line));
            };
            Ok(format!(
                "({} {} {})",
                emit_expr(lhs)?,
                e.payload,
                emit_expr(rhs)?
            ))
        }
        NodeKind::Unary => {
            let [operand] = e.children.as_slice() else {
                return Err(EmitError::invalid_shape("Unary", "expected 1 child", e.line));
            };
            Ok(format!("({}{})", e.payload, emit_expr(operand)?))
        }
        NodeKind::Ternary => {
            let [cond, then, alt] = e.children.as_slice() else {
                return Err(EmitError::invalid_shape("Ternary", "expected 3 children", e.line));
            };
            Ok(format!(
                "({} ? {} : {})",
                emit_expr(cond)?,
                emit_expr(then)?,
                emit_expr(alt)?
            ))
        }
        NodeKind::CallExpr => {
            let Some((callee, args)) = e.children.split_first() else {
                return Err(EmitError::invalid_shape("CallExpr", "missing callee", e.line));
            };
            let args = args
                .iter()
                .map(emit_expr)
                .collect::<Result<Vec<_>, _>>()?
                .join(", ");
            Ok(format!("{}({args})", emit_expr(callee)?))
        }
        NodeKind::Index => {
            let [object, index] = e.children.as_slice() else {
                return Err(EmitError::invalid_shape("Index", "expected 2 children", e.line));
            };
            Ok(format!("{}[{}]", emit_expr(object)?, emit_expr(index)?))
        }
        NodeKind::Member => {
            let [object] = e.children.as_slice() else {
                return Err(EmitError::invalid_shape("Member", "expected 1 child", e.line));
            };
            Ok(format!("{}.{}", emit_expr(object)?, e.payload))
        }
        other => Err(EmitError::invalid_shape(
            format!("{other:?}"),
            "not an expression",
            e.line,
        )),
    }
}

/// Number literal text, normalized for C++ (digit separators removed).
fn number_text(text: &str) -> String {
    text.chars().filter(|&c| c != '_').collect()
}

/// Render a CASE string value as a quoted C++ literal.
pub(crate) fn string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

/// Flatten a `+` chain into its ordered operands, for stream insertion.
pub(crate) fn flatten_concat(e: &Node) -> Vec<&Node> {
    let mut operands = Vec::new();
    collect_concat(e, &mut operands);
    operands
}

fn collect_concat<'a>(e: &'a Node, out: &mut Vec<&'a Node>) {
    if e.kind == NodeKind::Binary && e.payload == "+" && e.children.len() == 2 {
        collect_concat(&e.children[0], out);
        collect_concat(&e.children[1], out);
    } else {
        out.push(e);
    }
}

/// The first identifier in a pre-order walk of the expression, if any.
pub(crate) fn first_ident(e: &Node) -> Option<&str> {
    if e.kind == NodeKind::Ident {
        return Some(&e.payload);
    }
    e.children.iter().find_map(first_ident)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(text: &str) -> Node {
        Node::new(NodeKind::Number, text, 1)
    }

    fn ident(name: &str) -> Node {
        Node::new(NodeKind::Ident, name, 1)
    }

    #[test]
    fn literals_and_idents() {
        assert_eq!(emit_expr(&num("42")).unwrap(), "42");
        assert_eq!(emit_expr(&num("1_000")).unwrap(), "1000");
        assert_eq!(emit_expr(&ident("x")).unwrap(), "x");
        assert_eq!(
            emit_expr(&Node::new(NodeKind::Str, "a\"b", 1)).unwrap(),
            "\"a\\\"b\""
        );
    }

    #[test]
    fn binary_parenthesizes() {
        let e = Node::with_children(NodeKind::Binary, "+", 1, vec![num("1"), num("2")]);
        assert_eq!(emit_expr(&e).unwrap(), "(1 + 2)");
    }

    #[test]
    fn call_index_member_chain() {
        let member = Node::with_children(NodeKind::Member, "field", 1, vec![ident("obj")]);
        let index = Node::with_children(NodeKind::Index, "", 1, vec![member, num("0")]);
        let call = Node::with_children(NodeKind::CallExpr, "", 1, vec![index, num("1")]);
        assert_eq!(emit_expr(&call).unwrap(), "obj.field[0](1)");
    }

    #[test]
    fn flatten_walks_left_spine() {
        let chain = Node::with_children(
            NodeKind::Binary,
            "+",
            1,
            vec![
                Node::with_children(NodeKind::Binary, "+", 1, vec![ident("a"), ident("b")]),
                ident("c"),
            ],
        );
        let parts: Vec<&str> = flatten_concat(&chain)
            .iter()
            .map(|n| n.payload.as_str())
            .collect();
        assert_eq!(parts, vec!["a", "b", "c"]);
    }

    #[test]
    fn first_ident_finds_leftmost() {
        let e = Node::with_children(
            NodeKind::Binary,
            "*",
            1,
            vec![num("2"), Node::with_children(NodeKind::Binary, "+", 1, vec![ident("y"), ident("z")])],
        );
        assert_eq!(first_ident(&e), Some("y"));
        assert_eq!(first_ident(&num("1")), None);
    }

    #[test]
    fn statement_node_in_expression_position_is_invalid() {
        let bad = Node::new(NodeKind::Print, "", 3);
        let err = emit_expr(&bad).unwrap_err();
        assert_eq!(err.line, 3);
    }
}
