//! Weak typing pass.
//!
//! Tags identifiers with inferred kinds scope by scope and reports
//! unresolved references as warnings. This pass never errors; its job is to
//! surface likely mistakes without blocking compilation.

use case_parser::{Node, NodeKind};

use crate::env::ScopeStack;
use crate::error::{SemaWarning, SemaWarningKind};
use crate::ty::TypeKind;

pub(crate) fn run(tree: &Node) -> Vec<SemaWarning> {
    let mut typer = WeakTyper {
        types: ScopeStack::new(),
        warnings: Vec::new(),
    };
    typer.walk_statements(&tree.children);
    typer.warnings
}

struct WeakTyper {
    types: ScopeStack<TypeKind>,
    warnings: Vec<SemaWarning>,
}

impl WeakTyper {
    fn walk_statements(&mut self, stmts: &[Node]) {
        for stmt in stmts {
            self.walk_statement(stmt);
        }
    }

    fn walk_statement(&mut self, stmt: &Node) {
        match stmt.kind {
            NodeKind::Let => {
                let kind = stmt
                    .children
                    .first()
                    .map(|e| self.infer(e))
                    .unwrap_or(TypeKind::Unknown);
                self.types.insert(&stmt.payload, kind);
            }
            NodeKind::Assign => {
                let kind = stmt
                    .children
                    .get(1)
                    .map(|e| self.infer(e))
                    .unwrap_or(TypeKind::Unknown);
                match stmt.children.first() {
                    // Assignment to a plain name declares it implicitly.
                    Some(target) if target.kind == NodeKind::Ident => {
                        self.types.insert(&target.payload, kind);
                    }
                    Some(target) => {
                        self.infer(target);
                    }
                    None => {}
                }
            }
            NodeKind::Fn => {
                self.types.push_scope();
                if let Some(params) = stmt.child(NodeKind::Params) {
                    for param in params.children_of(NodeKind::Param) {
                        let kind = param
                            .children
                            .first()
                            .map(|k| TypeKind::from_declared(&k.payload))
                            .unwrap_or(TypeKind::Unknown);
                        self.types.insert(&param.payload, kind);
                    }
                }
                if let Some(body) = stmt.child(NodeKind::Body) {
                    self.walk_statements(&body.children);
                }
                self.types.pop_scope();
            }
            NodeKind::Class | NodeKind::Struct => {
                self.types.push_scope();
                if let Some(body) = stmt.child(NodeKind::Body) {
                    self.walk_statements(&body.children);
                }
                self.types.pop_scope();
            }
            NodeKind::If => {
                if let Some(cond) = stmt.child(NodeKind::Cond) {
                    if let Some(e) = cond.children.first() {
                        self.infer(e);
                    }
                }
                if let Some(body) = stmt.child(NodeKind::Body) {
                    self.walk_scoped(body);
                }
                if let Some(else_) = stmt.child(NodeKind::Else) {
                    if let Some(body) = else_.children.first() {
                        self.walk_scoped(body);
                    }
                }
            }
            NodeKind::While => {
                if let Some(cond) = stmt.child(NodeKind::Cond) {
                    if let Some(e) = cond.children.first() {
                        self.infer(e);
                    }
                }
                if let Some(body) = stmt.child(NodeKind::Body) {
                    self.walk_scoped(body);
                }
            }
            NodeKind::Loop | NodeKind::Schedule => {
                if let Some(body) = stmt.child(NodeKind::Body) {
                    self.walk_scoped(body);
                }
            }
            NodeKind::Try => {
                if let Some(body) = stmt.child(NodeKind::Body) {
                    self.walk_scoped(body);
                }
                if let Some(catch) = stmt.child(NodeKind::Catch) {
                    self.types.push_scope();
                    if !catch.payload.is_empty() {
                        self.types.insert(&catch.payload, TypeKind::Unknown);
                    }
                    if let Some(body) = catch.child(NodeKind::Body) {
                        self.walk_statements(&body.children);
                    }
                    self.types.pop_scope();
                }
            }
            NodeKind::Switch | NodeKind::Match => {
                if let Some(scrutinee) = stmt.children.first() {
                    self.infer(scrutinee);
                }
                for case in stmt.children_of(NodeKind::Case) {
                    if let Some(body) = case.child(NodeKind::Body) {
                        self.walk_scoped(body);
                    }
                }
                if let Some(default) = stmt.child(NodeKind::Default) {
                    if let Some(body) = default.child(NodeKind::Body) {
                        self.walk_scoped(body);
                    }
                }
            }
            NodeKind::Print
            | NodeKind::Throw
            | NodeKind::Write
            | NodeKind::Writeln
            | NodeKind::Send
            | NodeKind::Duration
            | NodeKind::Derivative
            | NodeKind::Scale
            | NodeKind::Bounds
            | NodeKind::Call
            | NodeKind::Ret
            | NodeKind::Mutate => {
                for child in &stmt.children {
                    self.infer(child);
                }
            }
            // Statements that introduce a stream/channel/input binding.
            NodeKind::Open | NodeKind::Channel | NodeKind::Input => {
                self.types.insert(&stmt.payload, TypeKind::Unknown);
            }
            NodeKind::Read | NodeKind::Recv => {
                if let Some(var) = stmt.children.iter().find(|c| c.kind == NodeKind::Ident) {
                    self.types.insert(&var.payload, TypeKind::Unknown);
                }
            }
            _ => {}
        }
    }

    fn walk_scoped(&mut self, body: &Node) {
        self.types.push_scope();
        self.walk_statements(&body.children);
        self.types.pop_scope();
    }

    /// Infer the kind of an expression, warning on unresolved references.
    fn infer(&mut self, e: &Node) -> TypeKind {
        match e.kind {
            NodeKind::Number => TypeKind::Number,
            NodeKind::Str => TypeKind::String,
            NodeKind::Ident => match self.types.lookup(&e.payload) {
                Some(kind) => *kind,
                None => {
                    self.warnings.push(SemaWarning {
                        kind: SemaWarningKind::UnresolvedReference {
                            name: e.payload.clone(),
                        },
                        line: e.line,
                    });
                    TypeKind::Unknown
                }
            },
            NodeKind::Unary => {
                for child in &e.children {
                    self.infer(child);
                }
                match e.payload.as_str() {
                    "!" => TypeKind::Boolean,
                    _ => TypeKind::Number,
                }
            }
            NodeKind::Binary => {
                let lhs = e.children.first().map(|c| self.infer(c));
                let rhs = e.children.get(1).map(|c| self.infer(c));
                match e.payload.as_str() {
                    "+" => match (lhs, rhs) {
                        (Some(TypeKind::String), Some(TypeKind::String)) => TypeKind::String,
                        (Some(TypeKind::Number), Some(TypeKind::Number)) => TypeKind::Number,
                        _ => TypeKind::Unknown,
                    },
                    "-" | "*" | "/" | "%" => TypeKind::Number,
                    "==" | "!=" | "<" | ">" | "<=" | ">=" | "&&" | "||" => TypeKind::Boolean,
                    _ => TypeKind::Unknown,
                }
            }
            NodeKind::Ternary => {
                if let Some(cond) = e.children.first() {
                    self.infer(cond);
                }
                let a = e.children.get(1).map(|c| self.infer(c));
                let b = e.children.get(2).map(|c| self.infer(c));
                if a == b {
                    a.unwrap_or(TypeKind::Unknown)
                } else {
                    TypeKind::Unknown
                }
            }
            NodeKind::CallExpr => {
                // The callee position is a function name, not a variable
                // reference; only argument expressions are inferred.
                for arg in e.children.iter().skip(1) {
                    self.infer(arg);
                }
                TypeKind::Unknown
            }
            NodeKind::Index => {
                for child in &e.children {
                    self.infer(child);
                }
                TypeKind::Unknown
            }
            NodeKind::Member => {
                if let Some(object) = e.children.first() {
                    self.infer(object);
                }
                TypeKind::Unknown
            }
            _ => TypeKind::Unknown,
        }
    }
}
