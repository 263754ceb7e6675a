//! Statement lowering to C++.
//!
//! One method per statement family on [`Emitter`]. Multi-line constructs
//! (match chains, scheduler blocks, duration/derivative scopes) are built
//! from string templates.

use case_parser::{Node, NodeKind};

use crate::error::EmitError;
use crate::expr::{emit_expr, first_ident, flatten_concat, string_literal};
use crate::types::{map_type, return_type};
use crate::Emitter;

/// Compilers whose toolchains accept OpenMP pragmas for `sync`.
const OMP_COMPILERS: &[&str] = &["g++", "gcc", "clang", "clang++", "cc", "c++"];

impl Emitter<'_> {
    // ── Declarations ───────────────────────────────────────────────────

    /// Emit a top-level or member function. Overlays surface as comments.
    pub(crate) fn emit_function(&mut self, node: &Node) -> Result<(), EmitError> {
        for overlay in node.children_of(NodeKind::Overlay) {
            self.line(&format!("// overlay: {}", overlay.payload));
        }

        let params = self.render_params(node);
        self.line(&format!(
            "{} {}({}) {{",
            return_type(node),
            node.payload,
            params
        ));
        let body = node.child(NodeKind::Body).ok_or_else(|| {
            EmitError::invalid_shape("Fn", "missing body", node.line)
        })?;
        self.block_body(body)?;
        self.line("}");
        self.blank();
        Ok(())
    }

    fn render_params(&self, node: &Node) -> String {
        let Some(params) = node.child(NodeKind::Params) else {
            return String::new();
        };
        params
            .children_of(NodeKind::Param)
            .map(|param| {
                let kind = param
                    .children
                    .first()
                    .map(|k| map_type(&k.payload))
                    .unwrap_or("double");
                format!("{kind} {}", param.payload)
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Emit a class or struct declaration.
    pub(crate) fn emit_class(&mut self, node: &Node, is_struct: bool) -> Result<(), EmitError> {
        let heading = if is_struct {
            format!("struct {} {{", node.payload)
        } else {
            let bases: Vec<String> = node
                .child(NodeKind::Extends)
                .map(|ext| {
                    ext.children
                        .iter()
                        .map(|b| format!("public {}", b.payload))
                        .collect()
                })
                .unwrap_or_default();
            if bases.is_empty() {
                format!("class {} {{", node.payload)
            } else {
                format!("class {} : {} {{", node.payload, bases.join(", "))
            }
        };
        self.line(&heading);

        let body = node.child(NodeKind::Body).ok_or_else(|| {
            EmitError::invalid_shape("Class", "missing body", node.line)
        })?;

        // Classes default to private in C++; open a public section unless
        // the source leads with its own access label.
        if !is_struct && !matches!(body.children.first().map(|c| c.kind), Some(NodeKind::Access)) {
            self.line("public:");
        }

        self.indent += 1;
        for member in &body.children {
            match member.kind {
                NodeKind::Access => {
                    self.indent -= 1;
                    self.line(&format!("{}:", member.payload));
                    self.indent += 1;
                }
                NodeKind::Let => self.emit_field(member)?,
                NodeKind::Fn => self.emit_function(member)?,
                _ => {
                    return Err(EmitError::invalid_shape(
                        format!("{:?}", member.kind),
                        "not a class member",
                        member.line,
                    ))
                }
            }
        }
        self.indent -= 1;
        self.line("};");
        self.blank();
        Ok(())
    }

    /// A `let` field: `std::string` when initialized from a string literal,
    /// `double` otherwise.
    fn emit_field(&mut self, node: &Node) -> Result<(), EmitError> {
        let init = node.children.first().ok_or_else(|| {
            EmitError::invalid_shape("Let", "field missing initializer", node.line)
        })?;
        let ty = if init.kind == NodeKind::Str { "std::string" } else { "double" };
        self.line(&format!("{ty} {} = {};", node.payload, emit_expr(init)?));
        Ok(())
    }

    // ── Statements ─────────────────────────────────────────────────────

    pub(crate) fn emit_stmt(&mut self, stmt: &Node) -> Result<(), EmitError> {
        match stmt.kind {
            NodeKind::Let => {
                let value = stmt.children.first().ok_or_else(|| {
                    EmitError::invalid_shape("Let", "missing initializer", stmt.line)
                })?;
                self.line(&format!("auto {} = {};", stmt.payload, emit_expr(value)?));
            }
            NodeKind::Assign => {
                let [target, value] = stmt.children.as_slice() else {
                    return Err(EmitError::invalid_shape(
                        "Assign",
                        "expected target and value",
                        stmt.line,
                    ));
                };
                self.line(&format!(
                    "{} {} {};",
                    emit_expr(target)?,
                    stmt.payload,
                    emit_expr(value)?
                ));
            }
            NodeKind::Print => {
                let value = stmt.children.first().ok_or_else(|| {
                    EmitError::invalid_shape("Print", "missing argument", stmt.line)
                })?;
                let parts = flatten_concat(value)
                    .into_iter()
                    .map(emit_expr)
                    .collect::<Result<Vec<_>, _>>()?
                    .join(" << ");
                self.line(&format!("std::cout << {parts} << std::endl;"));
            }
            NodeKind::If => self.emit_if(stmt)?,
            NodeKind::While => {
                let cond = cond_expr(stmt);
                let cond = match cond {
                    Some(e) => emit_expr(e)?,
                    None => "true".to_string(),
                };
                self.line(&format!("while ({cond}) {{"));
                if let Some(body) = stmt.child(NodeKind::Body) {
                    self.block_body(body)?;
                }
                self.line("}");
            }
            NodeKind::Loop => self.emit_loop(stmt)?,
            NodeKind::Switch | NodeKind::Match => self.emit_match(stmt)?,
            NodeKind::Try => self.emit_try(stmt)?,
            NodeKind::Throw => {
                let value = stmt.children.first().ok_or_else(|| {
                    EmitError::invalid_shape("Throw", "missing operand", stmt.line)
                })?;
                if value.kind == NodeKind::Str {
                    self.line(&format!(
                        "throw std::runtime_error({});",
                        string_literal(&value.payload)
                    ));
                } else {
                    self.line(&format!("throw {};", emit_expr(value)?));
                }
            }
            NodeKind::Ret => match stmt.children.first() {
                Some(value) => self.line(&format!("return {};", emit_expr(value)?)),
                None => self.line("return;"),
            },
            NodeKind::Break => self.line("break;"),
            NodeKind::Continue => self.line("continue;"),
            NodeKind::Call => {
                let args = stmt
                    .children
                    .iter()
                    .map(emit_expr)
                    .collect::<Result<Vec<_>, _>>()?
                    .join(", ");
                self.line(&format!("{}({});", stmt.payload, args));
            }
            NodeKind::Open => self.emit_open(stmt)?,
            NodeKind::Close => {
                self.line(&format!("{}.close();", stmt.payload));
                self.mark_closed(&stmt.payload);
            }
            NodeKind::Write => {
                let value = single_child(stmt, "Write")?;
                self.line(&format!("{} << {};", stmt.payload, emit_expr(value)?));
            }
            NodeKind::Writeln => {
                let value = single_child(stmt, "Writeln")?;
                self.line(&format!(
                    "{} << {} << std::endl;",
                    stmt.payload,
                    emit_expr(value)?
                ));
            }
            NodeKind::Read => {
                let var = single_child(stmt, "Read")?;
                self.line(&format!("{} >> {};", stmt.payload, var.payload));
            }
            NodeKind::Input => {
                self.line(&format!("std::cin >> {};", stmt.payload));
            }
            NodeKind::Channel => {
                let elem = single_child(stmt, "Channel")?;
                self.line(&format!("Channel<{}> {};", elem.payload, stmt.payload));
            }
            NodeKind::Send => {
                let value = single_child(stmt, "Send")?;
                self.line(&format!("{}.send({});", stmt.payload, emit_expr(value)?));
            }
            NodeKind::Recv => {
                let var = single_child(stmt, "Recv")?;
                self.line(&format!("{} = {}.recv();", var.payload, stmt.payload));
            }
            NodeKind::Sync => {
                if OMP_COMPILERS.contains(&self.meta.cc.as_str()) {
                    self.line("#pragma omp barrier");
                } else {
                    self.line("// sync barrier");
                }
            }
            NodeKind::Schedule => self.emit_schedule(stmt)?,
            NodeKind::Checkpoint => {
                self.line(&format!("{}:;", label_name(&stmt.payload)));
            }
            NodeKind::VBreak => {
                self.line(&format!("goto {};", label_name(&stmt.payload)));
            }
            NodeKind::Mutate => {
                let value = single_child(stmt, "Mutate")?;
                self.line(&format!("{} = {}; // mutate", stmt.payload, emit_expr(value)?));
            }
            NodeKind::Scale => self.emit_scale(stmt)?,
            NodeKind::Bounds => {
                let [lo, hi] = stmt.children.as_slice() else {
                    return Err(EmitError::invalid_shape(
                        "Bounds",
                        "expected min and max",
                        stmt.line,
                    ));
                };
                self.line(&format!(
                    "{0} = std::min(std::max({0}, {1}), {2});",
                    stmt.payload,
                    emit_expr(lo)?,
                    emit_expr(hi)?
                ));
            }
            NodeKind::Splice => {
                let raw = stmt.payload.clone();
                self.line(&raw);
            }
            NodeKind::Duration => self.emit_duration(stmt)?,
            NodeKind::Derivative => self.emit_derivative(stmt)?,
            // Nested functions become lambdas.
            NodeKind::Fn => {
                let params = self.render_params(stmt);
                self.line(&format!("auto {} = [&]({}) {{", stmt.payload, params));
                if let Some(body) = stmt.child(NodeKind::Body) {
                    self.block_body(body)?;
                }
                self.line("};");
            }
            other => {
                return Err(EmitError::invalid_shape(
                    format!("{other:?}"),
                    "not a statement",
                    stmt.line,
                ))
            }
        }
        Ok(())
    }

    fn emit_if(&mut self, stmt: &Node) -> Result<(), EmitError> {
        let cond = match cond_expr(stmt) {
            Some(e) => emit_expr(e)?,
            None => "true".to_string(),
        };
        self.line(&format!("if ({cond}) {{"));
        if let Some(body) = stmt.child(NodeKind::Body) {
            self.block_body(body)?;
        }
        if let Some(else_) = stmt.child(NodeKind::Else) {
            self.line("} else {");
            if let Some(body) = else_.children.first() {
                self.block_body(body)?;
            }
        }
        self.line("}");
        Ok(())
    }

    /// `Loop "<header>"`: annotations hoist as pragmas above the loop.
    fn emit_loop(&mut self, stmt: &Node) -> Result<(), EmitError> {
        let (header, pragmas) = strip_loop_annotations(&stmt.payload);
        for pragma in pragmas {
            self.line(&pragma);
        }
        self.line(&format!("for ({header}) {{"));
        if let Some(body) = stmt.child(NodeKind::Body) {
            self.block_body(body)?;
        }
        self.line("}");
        Ok(())
    }

    /// `Match`/`Switch`: a scoped guarded if-chain over a fresh temporary.
    /// Exactly one case body runs; the local flag short-circuits the rest.
    fn emit_match(&mut self, stmt: &Node) -> Result<(), EmitError> {
        let Some((scrutinee, _)) = stmt.children.split_first() else {
            return Err(EmitError::invalid_shape("Match", "missing scrutinee", stmt.line));
        };
        let id = self.temp_counter;
        self.temp_counter += 1;
        let scrut = format!("__case_scrut_{id}");
        let matched = format!("__case_matched_{id}");

        self.line("{");
        self.indent += 1;
        self.line(&format!("auto {scrut} = {};", emit_expr(scrutinee)?));
        self.line(&format!("bool {matched} = false;"));

        for case in stmt.children_of(NodeKind::Case) {
            let body = case.child(NodeKind::Body).ok_or_else(|| {
                EmitError::invalid_shape("Case", "missing body", case.line)
            })?;
            let guards = case
                .children_of(NodeKind::Pattern)
                .map(|p| pattern_guard(p, &scrut))
                .collect::<Result<Vec<_>, _>>()?;
            if guards.is_empty() {
                return Err(EmitError::invalid_shape("Case", "missing pattern", case.line));
            }
            self.line(&format!("if (!{matched} && ({})) {{", guards.join(" || ")));
            self.indent += 1;
            self.line(&format!("{matched} = true;"));
            self.indent -= 1;
            self.block_body(body)?;
            self.line("}");
        }

        if let Some(default) = stmt.child(NodeKind::Default) {
            let body = default.child(NodeKind::Body).ok_or_else(|| {
                EmitError::invalid_shape("Default", "missing body", default.line)
            })?;
            self.line(&format!("if (!{matched}) {{"));
            self.indent += 1;
            self.line(&format!("{matched} = true;"));
            self.indent -= 1;
            self.block_body(body)?;
            self.line("}");
        }

        self.indent -= 1;
        self.line("}");
        Ok(())
    }

    fn emit_try(&mut self, stmt: &Node) -> Result<(), EmitError> {
        let body = stmt.child(NodeKind::Body).ok_or_else(|| {
            EmitError::invalid_shape("Try", "missing body", stmt.line)
        })?;
        let catch = stmt.child(NodeKind::Catch).ok_or_else(|| {
            EmitError::invalid_shape("Try", "missing catch", stmt.line)
        })?;
        let binding = if catch.payload.is_empty() {
            "e"
        } else {
            catch.payload.as_str()
        };

        self.line("try {");
        self.block_body(body)?;
        self.line(&format!("}} catch (const std::exception& {binding}) {{"));
        if let Some(catch_body) = catch.child(NodeKind::Body) {
            self.block_body(catch_body)?;
        }
        self.line("}");
        Ok(())
    }

    /// `Open v "path" "mode"`: translate the pipe-separated mode set and
    /// register the stream for end-of-scope close insertion.
    fn emit_open(&mut self, stmt: &Node) -> Result<(), EmitError> {
        let [path, mode] = stmt.children.as_slice() else {
            return Err(EmitError::invalid_shape(
                "Open",
                "expected path and mode",
                stmt.line,
            ));
        };
        let flags: Vec<&str> = mode
            .payload
            .split('|')
            .filter_map(|m| match m.trim() {
                "in" => Some("std::ios::in"),
                "out" => Some("std::ios::out"),
                "app" => Some("std::ios::app"),
                "binary" => Some("std::ios::binary"),
                _ => None,
            })
            .collect();
        let flags = if flags.is_empty() {
            "std::ios::in | std::ios::out".to_string()
        } else {
            flags.join(" | ")
        };
        self.line(&format!(
            "std::fstream {}({}, {});",
            stmt.payload,
            string_literal(&path.payload),
            flags
        ));
        if let Some(frame) = self.streams.last_mut() {
            frame.push(stmt.payload.clone());
        }
        Ok(())
    }

    /// `Schedule pr { body }`: a one-task scheduler sorted by priority.
    fn emit_schedule(&mut self, stmt: &Node) -> Result<(), EmitError> {
        let body = stmt.child(NodeKind::Body).ok_or_else(|| {
            EmitError::invalid_shape("Schedule", "missing body", stmt.line)
        })?;
        self.line("{");
        self.indent += 1;
        self.line("struct __case_task { double priority; std::function<void()> run; };");
        self.line("std::vector<__case_task> __case_tasks;");
        self.line(&format!(
            "__case_tasks.push_back(__case_task{{ {}, [&]() {{",
            stmt.payload
        ));
        self.block_body(body)?;
        self.line("} });");
        self.line("std::sort(__case_tasks.begin(), __case_tasks.end(),");
        self.line("    [](const __case_task& a, const __case_task& b) { return a.priority > b.priority; });");
        self.line("for (auto& t : __case_tasks) { t.run(); }");
        self.indent -= 1;
        self.line("}");
        Ok(())
    }

    /// `Scale x a b c d`: linear remap from [a, b] to [c, d] in a scope.
    fn emit_scale(&mut self, stmt: &Node) -> Result<(), EmitError> {
        let [a, b, c, d] = stmt.children.as_slice() else {
            return Err(EmitError::invalid_shape(
                "Scale",
                "expected 4 operands",
                stmt.line,
            ));
        };
        let (a, b, c, d) = (emit_expr(a)?, emit_expr(b)?, emit_expr(c)?, emit_expr(d)?);
        let var = &stmt.payload;
        self.line(&format!(
            "{{ {var} = (({var} - ({a})) / (({b}) - ({a}))) * (({d}) - ({c})) + ({c}); }}"
        ));
        Ok(())
    }

    /// `Duration e "unit"`: a chrono duration in a scoped block; unknown
    /// units synthesize a `quantum_epochs` alias.
    fn emit_duration(&mut self, stmt: &Node) -> Result<(), EmitError> {
        let value = single_child(stmt, "Duration")?;
        let value = emit_expr(value)?;
        self.line("{");
        self.indent += 1;
        match unit_ratio(&stmt.payload) {
            Some(ratio) => {
                self.line(&format!(
                    "std::chrono::duration<double, {ratio}> __case_duration({value});"
                ));
            }
            None => {
                self.line("using quantum_epochs = std::chrono::duration<double>;");
                self.line(&format!("quantum_epochs __case_duration({value});"));
            }
        }
        self.line("(void)__case_duration;");
        self.indent -= 1;
        self.line("}");
        Ok(())
    }

    /// `Derivative e wrt x`: numeric forward difference with epsilon 1e-6.
    fn emit_derivative(&mut self, stmt: &Node) -> Result<(), EmitError> {
        let value = single_child(stmt, "Derivative")?;
        let expr = emit_expr(value)?;
        let wrt = if stmt.payload.is_empty() {
            first_ident(value).map(str::to_string)
        } else {
            Some(stmt.payload.clone())
        };

        self.line("{");
        self.indent += 1;
        match wrt {
            Some(var) => {
                self.line("const double __case_eps = 1e-6;");
                self.line(&format!("double __case_f0 = {expr};"));
                self.line(&format!("{var} = {var} + __case_eps;"));
                self.line(&format!("double __case_f1 = {expr};"));
                self.line(&format!("{var} = {var} - __case_eps;"));
                self.line("double __case_derivative = (__case_f1 - __case_f0) / __case_eps;");
            }
            None => {
                // No variable to perturb: the derivative of a constant.
                self.line("double __case_derivative = 0;");
            }
        }
        self.line("(void)__case_derivative;");
        self.indent -= 1;
        self.line("}");
        Ok(())
    }
}

/// The condition expression of an `If`/`While`, when present.
fn cond_expr(stmt: &Node) -> Option<&Node> {
    stmt.child(NodeKind::Cond).and_then(|c| c.children.first())
}

fn single_child<'a>(stmt: &'a Node, name: &str) -> Result<&'a Node, EmitError> {
    stmt.children
        .first()
        .ok_or_else(|| EmitError::invalid_shape(name, "missing operand", stmt.line))
}

/// Derive a label name from a user checkpoint name.
fn label_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("__case_cp_{sanitized}")
}

/// One guard term for a `match`/`switch` pattern against the scrutinee.
fn pattern_guard(pattern: &Node, scrut: &str) -> Result<String, EmitError> {
    if pattern.payload == "_" {
        return Ok("true".to_string());
    }
    match pattern.children.first() {
        Some(lit) if lit.kind == NodeKind::Number => {
            Ok(format!("{scrut} == {}", emit_expr(lit)?))
        }
        Some(lit) if lit.kind == NodeKind::Str => Ok(format!(
            "{scrut} == std::string({})",
            string_literal(&lit.payload)
        )),
        _ => Err(EmitError::invalid_shape(
            "Pattern",
            "expected literal or wildcard",
            pattern.line,
        )),
    }
}

/// Map a duration unit to a `std::ratio` type, or `None` for unknown units.
fn unit_ratio(unit: &str) -> Option<&'static str> {
    match unit {
        "s" | "sec" | "seconds" => Some("std::ratio<1>"),
        "ms" => Some("std::milli"),
        "us" => Some("std::micro"),
        "ns" => Some("std::nano"),
        "min" => Some("std::ratio<60>"),
        "h" => Some("std::ratio<3600>"),
        _ => None,
    }
}

/// Strip `@omp`, `@vectorize`, and `@unroll(N)` from a loop header,
/// returning the cleaned header and the hoisted pragmas.
fn strip_loop_annotations(header: &str) -> (String, Vec<String>) {
    let mut out = header.to_string();
    let mut pragmas = Vec::new();

    if let Some(pos) = out.find("@omp") {
        out.replace_range(pos..pos + "@omp".len(), "");
        pragmas.push("#pragma omp parallel for".to_string());
    }
    if let Some(pos) = out.find("@vectorize") {
        out.replace_range(pos..pos + "@vectorize".len(), "");
        pragmas.push("#pragma omp simd".to_string());
    }
    if let Some(pos) = out.find("@unroll(") {
        let rest = &out[pos + "@unroll(".len()..];
        if let Some(close) = rest.find(')') {
            let count = rest[..close].trim().to_string();
            out.replace_range(pos..pos + "@unroll(".len() + close + 1, "");
            pragmas.push(format!("#pragma unroll {count}"));
        }
    }

    (out.trim().to_string(), pragmas)
}
