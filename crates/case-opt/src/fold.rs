//! Constant folding and algebraic peephole simplification.
//!
//! Works bottom-up so that folded children become candidates for the parent.
//! These rules are the semantic equivalence surface of the optimizer: folds
//! must produce exactly the value the unfolded expression would compute.

use case_common::token::parse_number;
use case_parser::{Node, NodeKind};

pub(crate) fn run(node: &mut Node) {
    for child in &mut node.children {
        run(child);
    }
    match node.kind {
        NodeKind::Binary => fold_binary(node),
        NodeKind::Ternary => fold_ternary(node),
        _ => {}
    }
}

/// The numeric value of a `Number` literal node, if it is one.
fn literal_value(node: &Node) -> Option<f64> {
    if node.kind == NodeKind::Number {
        parse_number(&node.payload)
    } else {
        None
    }
}

/// Render a folded numeric value: integers print without a decimal point,
/// everything else uses the shortest `f64` form.
fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

fn fold_binary(node: &mut Node) {
    if node.children.len() != 2 {
        return;
    }
    let op = node.payload.clone();
    let line = node.line;

    // Numeric constant folding.
    if let (Some(a), Some(b)) = (literal_value(&node.children[0]), literal_value(&node.children[1])) {
        let folded = match op.as_str() {
            "+" => Some(a + b),
            "-" => Some(a - b),
            "*" => Some(a * b),
            // Division by zero folds to zero rather than poisoning the tree.
            "/" => Some(if b == 0.0 { 0.0 } else { a / b }),
            // Remainder uses integer semantics on the truncated operands.
            "%" => {
                let (ta, tb) = (a.trunc() as i64, b.trunc() as i64);
                Some(if tb == 0 { 0.0 } else { (ta % tb) as f64 })
            }
            "<" => Some(f64::from(a < b)),
            ">" => Some(f64::from(a > b)),
            "<=" => Some(f64::from(a <= b)),
            ">=" => Some(f64::from(a >= b)),
            "==" => Some(f64::from(a == b)),
            "!=" => Some(f64::from(a != b)),
            _ => None,
        };
        if let Some(value) = folded {
            *node = Node::new(NodeKind::Number, format_number(value), line);
            return;
        }
    }

    // String concatenation folding.
    if op == "+"
        && node.children[0].kind == NodeKind::Str
        && node.children[1].kind == NodeKind::Str
    {
        let joined = format!("{}{}", node.children[0].payload, node.children[1].payload);
        *node = Node::new(NodeKind::Str, joined, line);
        return;
    }

    // Algebraic peephole over one literal operand.
    let lhs_value = literal_value(&node.children[0]);
    let rhs_value = literal_value(&node.children[1]);
    match op.as_str() {
        "+" => {
            if lhs_value == Some(0.0) {
                replace_with_child(node, 1);
            } else if rhs_value == Some(0.0) {
                replace_with_child(node, 0);
            }
        }
        "-" => {
            if rhs_value == Some(0.0) {
                replace_with_child(node, 0);
            }
        }
        "*" => {
            if lhs_value == Some(0.0) || rhs_value == Some(0.0) {
                *node = Node::new(NodeKind::Number, "0", line);
            } else if lhs_value == Some(1.0) {
                replace_with_child(node, 1);
            } else if rhs_value == Some(1.0) {
                replace_with_child(node, 0);
            }
        }
        "/" => {
            if rhs_value == Some(1.0) {
                replace_with_child(node, 0);
            }
        }
        _ => {}
    }
}

/// A ternary with a numeric-literal condition folds to the taken branch.
fn fold_ternary(node: &mut Node) {
    if node.children.len() != 3 {
        return;
    }
    if let Some(cond) = literal_value(&node.children[0]) {
        let taken = if cond != 0.0 { 1 } else { 2 };
        replace_with_child(node, taken);
    }
}

/// Replace `node` with its child at `index`.
fn replace_with_child(node: &mut Node, index: usize) {
    let child = node.children.remove(index);
    *node = child;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary(op: &str, lhs: Node, rhs: Node) -> Node {
        Node::with_children(NodeKind::Binary, op, 1, vec![lhs, rhs])
    }

    fn num(text: &str) -> Node {
        Node::new(NodeKind::Number, text, 1)
    }

    fn ident(name: &str) -> Node {
        Node::new(NodeKind::Ident, name, 1)
    }

    #[test]
    fn arithmetic_folds() {
        let mut n = binary("+", num("2"), num("3"));
        run(&mut n);
        assert_eq!(n, num("5"));

        let mut n = binary("*", num("2.5"), num("4"));
        run(&mut n);
        assert_eq!(n, num("10"));

        let mut n = binary("-", num("1"), num("2.5"));
        run(&mut n);
        assert_eq!(n, num("-1.5"));
    }

    #[test]
    fn division_by_zero_folds_to_zero() {
        let mut n = binary("/", num("7"), num("0"));
        run(&mut n);
        assert_eq!(n, num("0"));
    }

    #[test]
    fn remainder_truncates_operands() {
        let mut n = binary("%", num("7.9"), num("2.9"));
        run(&mut n);
        // trunc(7.9) % trunc(2.9) = 7 % 2 = 1
        assert_eq!(n, num("1"));

        let mut n = binary("%", num("5"), num("0"));
        run(&mut n);
        assert_eq!(n, num("0"));
    }

    #[test]
    fn relationals_fold_to_zero_or_one() {
        let mut n = binary("<", num("1"), num("2"));
        run(&mut n);
        assert_eq!(n, num("1"));

        let mut n = binary("==", num("1"), num("2"));
        run(&mut n);
        assert_eq!(n, num("0"));
    }

    #[test]
    fn string_concatenation_folds() {
        let mut n = binary(
            "+",
            Node::new(NodeKind::Str, "ab", 1),
            Node::new(NodeKind::Str, "cd", 1),
        );
        run(&mut n);
        assert_eq!(n, Node::new(NodeKind::Str, "abcd", 1));
    }

    #[test]
    fn peephole_identities() {
        let mut n = binary("+", ident("x"), num("0"));
        run(&mut n);
        assert_eq!(n, ident("x"));

        let mut n = binary("+", num("0"), ident("x"));
        run(&mut n);
        assert_eq!(n, ident("x"));

        let mut n = binary("-", ident("x"), num("0"));
        run(&mut n);
        assert_eq!(n, ident("x"));

        let mut n = binary("*", ident("x"), num("1"));
        run(&mut n);
        assert_eq!(n, ident("x"));

        let mut n = binary("/", ident("x"), num("1"));
        run(&mut n);
        assert_eq!(n, ident("x"));
    }

    #[test]
    fn multiply_by_zero_annihilates() {
        let mut n = binary("*", ident("x"), num("0"));
        run(&mut n);
        assert_eq!(n, num("0"));

        let mut n = binary("*", num("0"), ident("x"));
        run(&mut n);
        assert_eq!(n, num("0"));
    }

    #[test]
    fn ternary_selects_branch() {
        let mut n = Node::with_children(
            NodeKind::Ternary,
            "",
            1,
            vec![num("1"), ident("a"), ident("b")],
        );
        run(&mut n);
        assert_eq!(n, ident("a"));

        let mut n = Node::with_children(
            NodeKind::Ternary,
            "",
            1,
            vec![num("0"), ident("a"), ident("b")],
        );
        run(&mut n);
        assert_eq!(n, ident("b"));
    }

    #[test]
    fn folding_cascades_bottom_up() {
        // (1 + 2) * (2 - 5) => 3 * -3 => -9
        let mut n = binary(
            "*",
            binary("+", num("1"), num("2")),
            binary("-", num("2"), num("5")),
        );
        run(&mut n);
        assert_eq!(n, num("-9"));
    }

    #[test]
    fn non_literal_operands_are_left_alone() {
        let mut n = binary("+", ident("x"), num("2"));
        let before = n.clone();
        run(&mut n);
        assert_eq!(n, before);
    }
}
