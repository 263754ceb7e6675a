//! The CASE syntax tree.
//!
//! The whole pipeline shares one tree shape: a [`Node`] with a closed
//! [`NodeKind`] tag, a payload string, ordered children, and a source line.
//! Each node exclusively owns its children, so dropping the root drops the
//! tree and plugin transforms can rewrite any subtree in place.

use serde::Serialize;

/// The closed set of tree node kinds.
///
/// Expected shapes (children in order):
///
/// - `Program`: any statements/declarations.
/// - `Fn` (payload: name): `[Overlay*, Params?, ReturnType?, Body]`.
/// - `Class` (payload: name): `[Extends?, Body]`; the body interleaves
///   `Access` labels with `Let` fields and `Fn` methods. `Struct` is the
///   same without `Extends`.
/// - `Extends`: `[Ident+]` base class names.
/// - `Access` (payload: `public`/`private`/`protected`): no children.
/// - `Params`: `[Param*]`; `Param` (payload: name): `[Ident]` declared kind.
/// - `ReturnType` (payload: declared type): no children.
/// - `Overlay` (payload: name): literal argument nodes, if any.
/// - `Body`: any statements.
/// - `Let` (payload: name): `[expr]`.
/// - `Assign` (payload: operator): `[target, expr]`.
/// - `If`: `[Cond?, Body, Else?]`; `Cond`: `[expr]`; `Else`: `[Body]`.
/// - `While`: `[Cond, Body]`.
/// - `Loop` (payload: raw C-style header): `[Body]`.
/// - `Switch`/`Match`: `[expr, Case*, Default?]`; `Case`: `[Pattern+, Body]`;
///   `Pattern` (payload `_` for wildcard): `[Number | Str]` otherwise;
///   `Default`: `[Body]`.
/// - `Try`: `[Body, Catch]`; `Catch` (payload: binding or empty): `[Body]`.
/// - `Throw`: `[expr]`. `Ret`: `[expr?]`. `Break`/`Continue`: no children.
/// - `Print`: `[expr]`.
/// - `Open` (payload: stream var): `[Str path, Str mode]`.
/// - `Write`/`Writeln` (payload: stream var): `[expr]`.
/// - `Read` (payload: stream var): `[Ident]`. `Close` (payload: stream var).
/// - `Input` (payload: var). `Channel` (payload: name): `[Str element type]`.
/// - `Send` (payload: channel): `[expr]`. `Recv` (payload: channel): `[Ident]`.
/// - `Sync`: no children. `Schedule` (payload: priority literal): `[Body]`.
/// - `Checkpoint`/`VBreak` (payload: label name): no children.
/// - `Mutate` (payload: var): `[expr]`.
/// - `Scale` (payload: var): `[a, b, c, d]`. `Bounds` (payload: var): `[lo, hi]`.
/// - `Splice` (payload: raw text). `Duration` (payload: unit): `[expr]`.
/// - `Derivative` (payload: wrt var or empty): `[expr]`.
/// - `Call` (payload: callee name): argument expressions.
/// - `Binary` (payload: operator): `[lhs, rhs]`. `Unary` (payload: operator):
///   `[operand]`. `Ternary`: `[cond, then, else]`.
/// - `CallExpr`: `[callee, arg*]`. `Index`: `[object, index]`.
///   `Member` (payload: member name): `[object]`.
/// - `Ident`/`Number`/`Str` (payload: name/literal text/content): leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeKind {
    Program,
    Fn,
    Class,
    Struct,
    Extends,
    Access,
    Params,
    Param,
    ReturnType,
    Overlay,
    Body,
    Cond,
    Else,
    Let,
    Assign,
    If,
    While,
    Loop,
    Switch,
    Match,
    Case,
    Pattern,
    Default,
    Try,
    Catch,
    Throw,
    Break,
    Continue,
    Ret,
    Print,
    Open,
    Write,
    Writeln,
    Read,
    Close,
    Input,
    Channel,
    Send,
    Recv,
    Sync,
    Schedule,
    Checkpoint,
    VBreak,
    Mutate,
    Scale,
    Bounds,
    Splice,
    Duration,
    Derivative,
    Call,
    Binary,
    Unary,
    Ternary,
    CallExpr,
    Index,
    Member,
    Ident,
    Number,
    Str,
}

/// The universal tree element. See [`NodeKind`] for per-kind shapes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub kind: NodeKind,
    pub payload: String,
    pub children: Vec<Node>,
    /// 1-based source line.
    pub line: u32,
}

impl Node {
    /// Create a leaf node.
    pub fn new(kind: NodeKind, payload: impl Into<String>, line: u32) -> Self {
        Self {
            kind,
            payload: payload.into(),
            children: Vec::new(),
            line,
        }
    }

    /// Create a node with children.
    pub fn with_children(
        kind: NodeKind,
        payload: impl Into<String>,
        line: u32,
        children: Vec<Node>,
    ) -> Self {
        Self {
            kind,
            payload: payload.into(),
            children,
            line,
        }
    }

    /// Append a child, returning `self` for builder-style construction.
    pub fn push(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// First child of the given kind, if any.
    pub fn child(&self, kind: NodeKind) -> Option<&Node> {
        self.children.iter().find(|c| c.kind == kind)
    }

    /// Mutable first child of the given kind, if any.
    pub fn child_mut(&mut self, kind: NodeKind) -> Option<&mut Node> {
        self.children.iter_mut().find(|c| c.kind == kind)
    }

    /// All children of the given kind.
    pub fn children_of(&self, kind: NodeKind) -> impl Iterator<Item = &Node> {
        self.children.iter().filter(move |c| c.kind == kind)
    }

    /// Whether this node is a literal leaf (`Number` or `Str`).
    pub fn is_literal(&self) -> bool {
        matches!(self.kind, NodeKind::Number | NodeKind::Str)
    }

    /// Pre-order walk over the whole subtree, including `self`.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Node)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    /// Total node count of the subtree, including `self`.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(Node::size).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Node {
        Node::with_children(
            NodeKind::Binary,
            "+",
            1,
            vec![
                Node::new(NodeKind::Number, "1", 1),
                Node::new(NodeKind::Number, "2", 1),
            ],
        )
    }

    #[test]
    fn child_lookup() {
        let tree = sample();
        assert!(tree.child(NodeKind::Number).is_some());
        assert!(tree.child(NodeKind::Str).is_none());
        assert_eq!(tree.children_of(NodeKind::Number).count(), 2);
    }

    #[test]
    fn walk_visits_preorder() {
        let tree = sample();
        let mut kinds = Vec::new();
        tree.walk(&mut |n| kinds.push(n.kind));
        assert_eq!(kinds, vec![NodeKind::Binary, NodeKind::Number, NodeKind::Number]);
    }

    #[test]
    fn size_counts_all_nodes() {
        assert_eq!(sample().size(), 3);
    }

    #[test]
    fn push_builder() {
        let n = Node::new(NodeKind::Body, "", 1).push(Node::new(NodeKind::Break, "", 2));
        assert_eq!(n.children.len(), 1);
        assert_eq!(n.children[0].kind, NodeKind::Break);
    }
}
