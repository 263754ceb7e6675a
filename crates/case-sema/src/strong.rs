//! Strong typing and overlay contract enforcement.
//!
//! Classifies every expression against the operator typing rules, enforces
//! `pure` function contracts, and runs the non-negativity transfer functions
//! with call-site checks against `nonneg` parameter constraints. Errors
//! accumulate; nothing here aborts early.

use case_common::token::parse_number;
use case_parser::{Node, NodeKind};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::env::ScopeStack;
use crate::error::{SemaError, SemaErrorKind};
use crate::fninfo::FunctionInfo;
use crate::ty::{Nonneg, TypeKind};

/// Statement kinds forbidden inside a `pure` function.
const PURE_FORBIDDEN: &[NodeKind] = &[
    NodeKind::Print,
    NodeKind::Open,
    NodeKind::Write,
    NodeKind::Writeln,
    NodeKind::Read,
    NodeKind::Close,
    NodeKind::Send,
    NodeKind::Recv,
    NodeKind::Schedule,
    NodeKind::Sync,
    NodeKind::Mutate,
    NodeKind::Input,
    NodeKind::Checkpoint,
    NodeKind::VBreak,
];

pub(crate) fn run(tree: &Node, functions: &FxHashMap<String, FunctionInfo>) -> Vec<SemaError> {
    let mut checker = StrongChecker {
        functions,
        types: ScopeStack::new(),
        facts: ScopeStack::new(),
        purity: None,
        errors: Vec::new(),
    };
    for stmt in &tree.children {
        checker.check_top_level(stmt);
    }
    checker.errors
}

/// The active `pure` context: function name plus its parameter names.
struct PurityCtx {
    function: String,
    params: FxHashSet<String>,
}

struct StrongChecker<'a> {
    functions: &'a FxHashMap<String, FunctionInfo>,
    types: ScopeStack<TypeKind>,
    facts: ScopeStack<Nonneg>,
    purity: Option<PurityCtx>,
    errors: Vec<SemaError>,
}

impl<'a> StrongChecker<'a> {
    fn check_top_level(&mut self, stmt: &Node) {
        match stmt.kind {
            NodeKind::Fn => self.check_function(stmt),
            NodeKind::Class | NodeKind::Struct => {
                if let Some(body) = stmt.child(NodeKind::Body) {
                    self.types.push_scope();
                    self.facts.push_scope();
                    for member in &body.children {
                        match member.kind {
                            NodeKind::Fn => self.check_function(member),
                            NodeKind::Access => {}
                            _ => self.check_stmt(member),
                        }
                    }
                    self.types.pop_scope();
                    self.facts.pop_scope();
                }
            }
            _ => self.check_stmt(stmt),
        }
    }

    /// Check one function body under a fresh environment seeded with its
    /// declared parameter kinds and non-negativity contracts.
    fn check_function(&mut self, node: &Node) {
        let Some(info) = self.functions.get(&node.payload) else {
            return;
        };

        self.types.push_scope();
        self.facts.push_scope();
        for (name, kind) in &info.params {
            self.types.insert(name, *kind);
            if info.non_negative.contains(name) {
                self.facts.insert(name, Nonneg::True);
            }
        }

        let saved = self.purity.take();
        if info.pure {
            self.purity = Some(PurityCtx {
                function: info.name.clone(),
                params: info.params.iter().map(|(n, _)| n.clone()).collect(),
            });
        }

        if let Some(body) = node.child(NodeKind::Body) {
            for stmt in &body.children {
                if stmt.kind == NodeKind::Fn {
                    self.check_function(stmt);
                } else {
                    self.check_stmt(stmt);
                }
            }
        }

        self.purity = saved;
        self.types.pop_scope();
        self.facts.pop_scope();
    }

    fn check_stmt(&mut self, stmt: &Node) {
        if let Some(ctx) = &self.purity {
            if PURE_FORBIDDEN.contains(&stmt.kind) {
                self.errors.push(SemaError::new(
                    SemaErrorKind::PureFunctionSideEffect {
                        function: ctx.function.clone(),
                        statement: format!("{:?}", stmt.kind),
                    },
                    stmt.line,
                ));
            }
        }

        match stmt.kind {
            NodeKind::Let => {
                if let Some(value) = stmt.children.first() {
                    self.classify(value);
                    let fact = self.non_neg(value);
                    self.facts.insert(&stmt.payload, fact);
                    let kind = self.type_of(value);
                    self.types.insert(&stmt.payload, kind);
                } else {
                    self.types.insert(&stmt.payload, TypeKind::Unknown);
                }
            }
            NodeKind::Assign => self.check_assign(stmt),
            NodeKind::Bounds => {
                for operand in &stmt.children {
                    self.classify(operand);
                }
                let fact = match stmt.children.first() {
                    Some(lo) if self.non_neg(lo) == Nonneg::True => Nonneg::True,
                    _ => Nonneg::Unknown,
                };
                self.facts.insert(&stmt.payload, fact);
            }
            NodeKind::Scale => {
                for operand in &stmt.children {
                    self.classify(operand);
                }
                self.facts.insert(&stmt.payload, Nonneg::Unknown);
            }
            NodeKind::Mutate => {
                if let Some(value) = stmt.children.first() {
                    self.classify(value);
                    let fact = self.non_neg(value);
                    self.facts.insert(&stmt.payload, fact);
                }
            }
            NodeKind::If => {
                self.check_cond(stmt);
                if let Some(body) = stmt.child(NodeKind::Body) {
                    self.check_scoped(body);
                }
                if let Some(else_) = stmt.child(NodeKind::Else) {
                    if let Some(body) = else_.children.first() {
                        self.check_scoped(body);
                    }
                }
            }
            NodeKind::While => {
                self.check_cond(stmt);
                if let Some(body) = stmt.child(NodeKind::Body) {
                    self.check_scoped(body);
                }
            }
            NodeKind::Loop | NodeKind::Schedule => {
                if let Some(body) = stmt.child(NodeKind::Body) {
                    self.check_scoped(body);
                }
            }
            NodeKind::Try => {
                if let Some(body) = stmt.child(NodeKind::Body) {
                    self.check_scoped(body);
                }
                if let Some(catch) = stmt.child(NodeKind::Catch) {
                    self.types.push_scope();
                    self.facts.push_scope();
                    if !catch.payload.is_empty() {
                        self.types.insert(&catch.payload, TypeKind::Unknown);
                    }
                    if let Some(body) = catch.child(NodeKind::Body) {
                        for s in &body.children {
                            self.check_stmt(s);
                        }
                    }
                    self.types.pop_scope();
                    self.facts.pop_scope();
                }
            }
            NodeKind::Switch | NodeKind::Match => {
                if let Some(scrutinee) = stmt.children.first() {
                    self.classify(scrutinee);
                }
                for case in stmt.children_of(NodeKind::Case) {
                    if let Some(body) = case.child(NodeKind::Body) {
                        self.check_scoped(body);
                    }
                }
                if let Some(default) = stmt.child(NodeKind::Default) {
                    if let Some(body) = default.child(NodeKind::Body) {
                        self.check_scoped(body);
                    }
                }
            }
            NodeKind::Call => {
                for arg in &stmt.children {
                    self.classify(arg);
                }
                self.check_call(&stmt.payload, &stmt.children, stmt.line);
            }
            NodeKind::Read | NodeKind::Recv => {
                if let Some(var) = stmt.children.iter().find(|c| c.kind == NodeKind::Ident) {
                    let name = var.payload.clone();
                    self.facts.insert(&name, Nonneg::Unknown);
                }
            }
            NodeKind::Input => {
                self.facts.insert(&stmt.payload, Nonneg::Unknown);
            }
            NodeKind::Print
            | NodeKind::Throw
            | NodeKind::Write
            | NodeKind::Writeln
            | NodeKind::Send
            | NodeKind::Duration
            | NodeKind::Derivative
            | NodeKind::Ret => {
                for child in &stmt.children {
                    self.classify(child);
                }
            }
            NodeKind::Fn => self.check_function(stmt),
            NodeKind::Class | NodeKind::Struct => self.check_top_level(stmt),
            _ => {}
        }
    }

    fn check_cond(&mut self, stmt: &Node) {
        if let Some(cond) = stmt.child(NodeKind::Cond) {
            if let Some(e) = cond.children.first() {
                self.classify(e);
            }
        }
    }

    fn check_scoped(&mut self, body: &Node) {
        self.types.push_scope();
        self.facts.push_scope();
        for stmt in &body.children {
            self.check_stmt(stmt);
        }
        self.types.pop_scope();
        self.facts.pop_scope();
    }

    fn check_assign(&mut self, stmt: &Node) {
        let Some(value) = stmt.children.get(1) else {
            return;
        };
        self.classify(value);

        let Some(target) = stmt.children.first() else {
            return;
        };
        if target.kind != NodeKind::Ident {
            self.classify(target);
            return;
        }
        let name = target.payload.clone();

        if let Some(ctx) = &self.purity {
            if ctx.params.contains(&name) {
                self.errors.push(SemaError::new(
                    SemaErrorKind::PureParameterAssignment {
                        function: ctx.function.clone(),
                        param: name.clone(),
                    },
                    stmt.line,
                ));
            }
        }

        match stmt.payload.as_str() {
            "=" => {
                let fact = self.non_neg(value);
                self.facts.insert(&name, fact);
                let kind = self.type_of(value);
                self.types.insert(&name, kind);
            }
            "+=" => {
                let current = self.facts.lookup(&name).copied().unwrap_or_default();
                let added = self.non_neg(value);
                let fact = if current == Nonneg::True && added == Nonneg::True {
                    Nonneg::True
                } else {
                    Nonneg::Unknown
                };
                self.facts.insert(&name, fact);
            }
            _ => {
                // -=, *=, /=, %= all lose the fact.
                self.facts.insert(&name, Nonneg::Unknown);
            }
        }
    }

    /// Contract checks for a call to `name` with positional `args`.
    fn check_call(&mut self, name: &str, args: &[Node], line: u32) {
        let Some(info) = self.functions.get(name) else {
            return;
        };

        if let Some(ctx) = &self.purity {
            if !info.pure {
                self.errors.push(SemaError::new(
                    SemaErrorKind::PureCallsImpure {
                        function: ctx.function.clone(),
                        callee: name.to_string(),
                    },
                    line,
                ));
            }
        }

        if info.has_nonneg_contract() {
            for (i, (param, _)) in info.params.iter().enumerate() {
                if !info.non_negative.contains(param) {
                    continue;
                }
                if let Some(arg) = args.get(i) {
                    if self.non_neg(arg) == Nonneg::False {
                        self.errors.push(SemaError::new(
                            SemaErrorKind::NonNegArgumentNegative {
                                callee: name.to_string(),
                                param: param.clone(),
                            },
                            arg.line,
                        ));
                    }
                }
            }
        }
    }

    /// Classify an expression, emitting operator mismatch errors and call
    /// contract violations along the way.
    fn classify(&mut self, e: &Node) -> TypeKind {
        match e.kind {
            NodeKind::Number => TypeKind::Number,
            NodeKind::Str => TypeKind::String,
            NodeKind::Ident => self
                .types
                .lookup(&e.payload)
                .copied()
                .unwrap_or(TypeKind::Unknown),
            NodeKind::Unary => {
                if let Some(inner) = e.children.first() {
                    self.classify(inner);
                }
                match e.payload.as_str() {
                    "!" => TypeKind::Boolean,
                    _ => TypeKind::Number,
                }
            }
            NodeKind::Binary => {
                let lhs = e
                    .children
                    .first()
                    .map(|c| self.classify(c))
                    .unwrap_or(TypeKind::Unknown);
                let rhs = e
                    .children
                    .get(1)
                    .map(|c| self.classify(c))
                    .unwrap_or(TypeKind::Unknown);
                self.classify_binary(&e.payload, lhs, rhs, e.line)
            }
            NodeKind::Ternary => {
                if let Some(cond) = e.children.first() {
                    self.classify(cond);
                }
                let a = e.children.get(1).map(|c| self.classify(c));
                let b = e.children.get(2).map(|c| self.classify(c));
                if a == b {
                    a.unwrap_or(TypeKind::Unknown)
                } else {
                    TypeKind::Unknown
                }
            }
            NodeKind::CallExpr => {
                let args: &[Node] = if e.children.is_empty() {
                    &[]
                } else {
                    &e.children[1..]
                };
                for arg in args {
                    self.classify(arg);
                }
                match e.children.first() {
                    Some(callee) if callee.kind == NodeKind::Ident => {
                        let name = callee.payload.clone();
                        self.check_call(&name, args, e.line);
                    }
                    Some(callee) => {
                        self.classify(callee);
                    }
                    None => {}
                }
                TypeKind::Unknown
            }
            NodeKind::Index => {
                for child in &e.children {
                    self.classify(child);
                }
                TypeKind::Unknown
            }
            NodeKind::Member => {
                if let Some(object) = e.children.first() {
                    self.classify(object);
                }
                TypeKind::Unknown
            }
            _ => TypeKind::Unknown,
        }
    }

    fn classify_binary(&mut self, op: &str, lhs: TypeKind, rhs: TypeKind, line: u32) -> TypeKind {
        use TypeKind::*;
        match op {
            "+" => match (lhs, rhs) {
                (Number, Number) => Number,
                (String, String) => String,
                (Unknown, _) | (_, Unknown) => Unknown,
                _ => {
                    self.mismatch(op, lhs, rhs, line);
                    Unknown
                }
            },
            "-" | "*" | "/" | "%" => {
                if matches!(lhs, String | Boolean) || matches!(rhs, String | Boolean) {
                    self.mismatch(op, lhs, rhs, line);
                }
                Number
            }
            "<" | ">" | "<=" | ">=" | "==" | "!=" => {
                if matches!(lhs, String | Boolean) || matches!(rhs, String | Boolean) {
                    self.mismatch(op, lhs, rhs, line);
                }
                Boolean
            }
            "&&" | "||" => Boolean,
            _ => Unknown,
        }
    }

    fn mismatch(&mut self, op: &str, lhs: TypeKind, rhs: TypeKind, line: u32) {
        self.errors.push(SemaError::new(
            SemaErrorKind::OperatorOperandMismatch {
                op: op.to_string(),
                lhs,
                rhs,
            },
            line,
        ));
    }

    /// Error-free kind lookup for already-classified expressions.
    fn type_of(&self, e: &Node) -> TypeKind {
        match e.kind {
            NodeKind::Number => TypeKind::Number,
            NodeKind::Str => TypeKind::String,
            NodeKind::Ident => self
                .types
                .lookup(&e.payload)
                .copied()
                .unwrap_or(TypeKind::Unknown),
            NodeKind::Unary => match e.payload.as_str() {
                "!" => TypeKind::Boolean,
                _ => TypeKind::Number,
            },
            NodeKind::Binary => match e.payload.as_str() {
                "+" => {
                    let lhs = e.children.first().map(|c| self.type_of(c));
                    let rhs = e.children.get(1).map(|c| self.type_of(c));
                    match (lhs, rhs) {
                        (Some(TypeKind::String), Some(TypeKind::String)) => TypeKind::String,
                        (Some(TypeKind::Number), Some(TypeKind::Number)) => TypeKind::Number,
                        _ => TypeKind::Unknown,
                    }
                }
                "-" | "*" | "/" | "%" => TypeKind::Number,
                "==" | "!=" | "<" | ">" | "<=" | ">=" | "&&" | "||" => TypeKind::Boolean,
                _ => TypeKind::Unknown,
            },
            _ => TypeKind::Unknown,
        }
    }

    /// The non-negativity fact for an expression under the current facts.
    fn non_neg(&self, e: &Node) -> Nonneg {
        match e.kind {
            NodeKind::Number => parse_number(&e.payload)
                .map(Nonneg::of_value)
                .unwrap_or_default(),
            NodeKind::Ident => self.facts.lookup(&e.payload).copied().unwrap_or_default(),
            NodeKind::Unary if e.payload == "-" => match e.children.first() {
                Some(inner) if inner.kind == NodeKind::Number => parse_number(&inner.payload)
                    .map(|v| Nonneg::of_value(-v))
                    .unwrap_or_default(),
                Some(inner) => match self.non_neg(inner) {
                    // Negating a provably negative value yields a positive one.
                    Nonneg::False => Nonneg::True,
                    _ => Nonneg::Unknown,
                },
                None => Nonneg::Unknown,
            },
            NodeKind::Binary if e.payload == "+" || e.payload == "*" => {
                let lhs = e.children.first().map(|c| self.non_neg(c));
                let rhs = e.children.get(1).map(|c| self.non_neg(c));
                match (lhs, rhs) {
                    (Some(Nonneg::True), Some(Nonneg::True)) => Nonneg::True,
                    _ => Nonneg::Unknown,
                }
            }
            NodeKind::Ternary => {
                let a = e
                    .children
                    .get(1)
                    .map(|c| self.non_neg(c))
                    .unwrap_or_default();
                let b = e
                    .children
                    .get(2)
                    .map(|c| self.non_neg(c))
                    .unwrap_or_default();
                a.join(b)
            }
            _ => Nonneg::Unknown,
        }
    }
}
