// CASE emitter -- lowers the tree to a textual C++ program.
//
// Output layout: metadata banner, fixed includes, the blocking Channel
// template, then class/struct/function declarations in source order, then
// `int main()` holding every other top-level statement.

mod error;
mod expr;
mod prelude;
mod stmt;
mod types;

use case_parser::{Node, NodeKind};

pub use error::{EmitError, EmitErrorKind};

/// Build metadata threaded into the emitted banner and `sync` lowering.
#[derive(Debug, Clone)]
pub struct EmitMeta {
    /// Path of the CASE source file, for the banner.
    pub source: String,
    /// Target C++ standard (`c++14`/`c++17`/`c++20`).
    pub std: String,
    /// External optimization level (`O0`..`O3`).
    pub opt: String,
    /// External compiler command; decides pragma support.
    pub cc: String,
    /// User `--tag key=value` pairs, embedded in the metadata JSON.
    pub tags: Vec<(String, String)>,
}

impl Default for EmitMeta {
    fn default() -> Self {
        Self {
            source: String::from("<memory>"),
            std: String::from("c++14"),
            opt: String::from("O2"),
            cc: String::from("g++"),
            tags: Vec::new(),
        }
    }
}

/// Lower a `Program` tree to C++ source text.
pub fn emit(tree: &Node, meta: &EmitMeta) -> Result<String, EmitError> {
    if tree.kind != NodeKind::Program {
        return Err(EmitError::invalid_shape(
            format!("{:?}", tree.kind),
            "emitter requires a Program root",
            tree.line,
        ));
    }

    let mut emitter = Emitter::new(meta);
    emitter.out.push_str(&prelude::render(meta));

    // Declarations first, in source order.
    for child in &tree.children {
        match child.kind {
            NodeKind::Fn => emitter.emit_function(child)?,
            NodeKind::Class => emitter.emit_class(child, false)?,
            NodeKind::Struct => emitter.emit_class(child, true)?,
            _ => {}
        }
    }

    // Everything else runs in main, in source order.
    emitter.line("int main() {");
    emitter.indent += 1;
    emitter.streams.push(Vec::new());
    for child in &tree.children {
        if matches!(child.kind, NodeKind::Fn | NodeKind::Class | NodeKind::Struct) {
            continue;
        }
        emitter.emit_stmt(child)?;
    }
    emitter.close_frame_streams();
    emitter.line("return 0;");
    emitter.indent -= 1;
    emitter.line("}");

    Ok(emitter.out)
}

/// Emission state: the output buffer, the indent level, a counter for fresh
/// match temporaries, and the per-block stack of open file streams.
pub(crate) struct Emitter<'a> {
    pub(crate) meta: &'a EmitMeta,
    pub(crate) out: String,
    pub(crate) indent: usize,
    pub(crate) temp_counter: u32,
    /// One frame per lexical block; streams opened in a block close at its
    /// end unless an explicit `Close` got there first.
    pub(crate) streams: Vec<Vec<String>>,
}

impl<'a> Emitter<'a> {
    fn new(meta: &'a EmitMeta) -> Self {
        Self {
            meta,
            out: String::new(),
            indent: 0,
            temp_counter: 0,
            streams: Vec::new(),
        }
    }

    /// Write one indented line.
    pub(crate) fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    /// Write an empty separator line.
    pub(crate) fn blank(&mut self) {
        self.out.push('\n');
    }

    /// Emit the statements of a `Body` one indent level deeper, closing any
    /// streams the block opened. The caller writes the surrounding braces.
    pub(crate) fn block_body(&mut self, body: &Node) -> Result<(), EmitError> {
        self.indent += 1;
        self.streams.push(Vec::new());
        for stmt in &body.children {
            self.emit_stmt(stmt)?;
        }
        self.close_frame_streams();
        self.indent -= 1;
        Ok(())
    }

    /// Close every stream still open in the current frame, then pop it.
    pub(crate) fn close_frame_streams(&mut self) {
        if let Some(frame) = self.streams.pop() {
            for stream in frame {
                self.line(&format!("{stream}.close();"));
            }
        }
    }

    /// Forget a stream after an explicit `Close`.
    pub(crate) fn mark_closed(&mut self, name: &str) {
        for frame in self.streams.iter_mut().rev() {
            if let Some(pos) = frame.iter().position(|s| s == name) {
                frame.remove(pos);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use case_lexer::Lexer;

    fn emit_src(src: &str) -> String {
        let tokens = Lexer::tokenize(src).expect("lexing should succeed");
        let tree = case_parser::parse(&tokens).expect("parsing should succeed");
        emit(&tree, &EmitMeta::default()).expect("emission should succeed")
    }

    #[test]
    fn hello_world_prints_with_endl() {
        let out = emit_src("Print \"hello\"");
        assert!(out.contains("std::cout << \"hello\" << std::endl;"));
        // No user function declarations; the only `void` is Channel::send.
        assert_eq!(out.matches("void ").count(), 1);
        assert!(out.contains("int main() {"));
    }

    #[test]
    fn functions_declare_before_main() {
        let out = emit_src("Fn f { Print \"x\" }\nFn g { call f }");
        assert!(out.contains("void f() {"));
        assert!(out.contains("void g() {"));
        assert!(out.contains("f();"));
        let main_pos = out.find("int main()").unwrap();
        assert!(out.find("void f()").unwrap() < main_pos);
        // main holds nothing but the return.
        let main_body = &out[main_pos..];
        assert!(main_body.contains("return 0;"));
        assert!(!main_body.contains("std::cout"));
    }

    #[test]
    fn print_flattens_concat_chains() {
        let out = emit_src("let n = 2\nPrint \"v=\" + n");
        assert!(out.contains("std::cout << \"v=\" << n << std::endl;"));
    }

    #[test]
    fn function_signature_with_params_and_return() {
        let out = emit_src("Fn add \"int a, int b\" -> int { ret a + b }");
        assert!(out.contains("int add(int a, int b) {"));
        assert!(out.contains("return (a + b);"));
    }

    #[test]
    fn valued_ret_without_declared_type_gives_double() {
        let out = emit_src("Fn f { ret 1 }");
        assert!(out.contains("double f() {"));
    }

    #[test]
    fn overlays_surface_as_comments() {
        let out = emit_src("overlay inspect\nFn f { }");
        assert!(out.contains("// overlay: inspect"));
    }

    #[test]
    fn prelude_carries_metadata_and_channel() {
        let meta = EmitMeta {
            source: "x.case".into(),
            tags: vec![("k".into(), "v".into())],
            ..EmitMeta::default()
        };
        let tokens = Lexer::tokenize("Print \"x\"").unwrap();
        let tree = case_parser::parse(&tokens).unwrap();
        let out = emit(&tree, &meta).unwrap();
        assert!(out.contains("CASE_BUILD_METADATA"));
        assert!(out.contains("\\\"k\\\":\\\"v\\\""));
        assert!(out.contains("class Channel"));
    }

    #[test]
    fn scale_and_bounds_templates() {
        let out = emit_src("let x = 5\nscale x 0 10 0 1\nbounds x 0 1");
        assert!(out.contains("{ x = ((x - (0)) / ((10) - (0))) * ((1) - (0)) + (0); }"));
        assert!(out.contains("x = std::min(std::max(x, 0), 1);"));
    }

    #[test]
    fn checkpoint_and_vbreak_share_label() {
        let out = emit_src("checkpoint spot\nvbreak spot");
        assert!(out.contains("__case_cp_spot:;"));
        assert!(out.contains("goto __case_cp_spot;"));
    }

    #[test]
    fn channel_send_recv_lowering() {
        let out = emit_src("channel c \"int\"\nlet v = 0\nsend c 42\nrecv c v");
        assert!(out.contains("Channel<int> c;"));
        assert!(out.contains("c.send(42);"));
        assert!(out.contains("v = c.recv();"));
    }

    #[test]
    fn open_translates_modes_and_closes_at_scope_end() {
        let out = emit_src("open log \"out.txt\" \"out|app\"\nwriteln log \"entry\"");
        assert!(out.contains("std::fstream log(\"out.txt\", std::ios::out | std::ios::app);"));
        assert!(out.contains("log << \"entry\" << std::endl;"));
        // The implicit close lands before return 0.
        let close_pos = out.find("log.close();").unwrap();
        let ret_pos = out.find("return 0;").unwrap();
        assert!(close_pos < ret_pos);
    }

    #[test]
    fn explicit_close_suppresses_the_implicit_one() {
        let out = emit_src("open log \"out.txt\" \"out\"\nclose log");
        assert_eq!(out.matches("log.close();").count(), 1);
    }

    #[test]
    fn loop_header_pragmas_hoist() {
        let out = emit_src("loop \"int i = 0; i < 4; i++ @omp\" { Print i }");
        assert!(out.contains("#pragma omp parallel for\n"));
        assert!(out.contains("for (int i = 0; i < 4; i++) {"));
    }

    #[test]
    fn match_emits_guarded_chain() {
        let out = emit_src(
            "let x = 2\nmatch x { case 1 | 2: { Print \"low\" } default: { Print \"other\" } }",
        );
        assert!(out.contains("auto __case_scrut_0 = x;"));
        assert!(out.contains("bool __case_matched_0 = false;"));
        assert!(out
            .contains("if (!__case_matched_0 && (__case_scrut_0 == 1 || __case_scrut_0 == 2)) {"));
        assert!(out.contains("if (!__case_matched_0) {"));
    }

    #[test]
    fn string_patterns_compare_as_std_string() {
        let out = emit_src("let s = \"a\"\nmatch s { case \"a\": { } }");
        assert!(out.contains("__case_scrut_0 == std::string(\"a\")"));
    }

    #[test]
    fn try_catch_throw_lowering() {
        let out = emit_src("try { throw \"bad\" } catch err { Print \"caught\" }");
        assert!(out.contains("try {"));
        assert!(out.contains("throw std::runtime_error(\"bad\");"));
        assert!(out.contains("} catch (const std::exception& err) {"));
    }

    #[test]
    fn duration_known_and_unknown_units() {
        let known = emit_src("let t = 5\nduration t \"ms\"");
        assert!(known.contains("std::chrono::duration<double, std::milli> __case_duration(t);"));

        let unknown = emit_src("let t = 5\nduration t \"zorps\"");
        assert!(unknown.contains("using quantum_epochs = std::chrono::duration<double>;"));
        assert!(unknown.contains("quantum_epochs __case_duration(t);"));
    }

    #[test]
    fn derivative_forward_difference() {
        let out = emit_src("let y = 2\nderivative y * y wrt y");
        assert!(out.contains("const double __case_eps = 1e-6;"));
        assert!(out.contains("double __case_f0 = (y * y);"));
        assert!(out.contains("y = y + __case_eps;"));
        assert!(out.contains("double __case_derivative = (__case_f1 - __case_f0) / __case_eps;"));
    }

    #[test]
    fn splice_is_verbatim() {
        let out = emit_src("splice \"int raw_counter = 0;\"");
        assert!(out.contains("int raw_counter = 0;"));
    }

    #[test]
    fn class_with_bases_fields_and_methods() {
        let out = emit_src(
            "class Point extends Base {\n  public:\n  let x = 0\n  Fn shift \"double d\" { x += d }\n  private:\n  let tag = \"p\"\n}",
        );
        assert!(out.contains("class Point : public Base {"));
        assert!(out.contains("public:"));
        assert!(out.contains("double x = 0;"));
        assert!(out.contains("void shift(double d) {"));
        assert!(out.contains("private:"));
        assert!(out.contains("std::string tag = \"p\";"));
        assert!(out.contains("};"));
    }

    #[test]
    fn struct_lowering() {
        let out = emit_src("struct Pair {\n  let a = 1\n  let b = 2\n}");
        assert!(out.contains("struct Pair {"));
        assert!(out.contains("double a = 1;"));
    }

    #[test]
    fn schedule_sorts_by_priority() {
        let out = emit_src("schedule 3 { Print \"task\" }");
        assert!(out.contains("std::vector<__case_task> __case_tasks;"));
        assert!(out.contains("__case_tasks.push_back(__case_task{ 3, [&]() {"));
        assert!(out.contains("return a.priority > b.priority;"));
        assert!(out.contains("for (auto& t : __case_tasks) { t.run(); }"));
    }

    #[test]
    fn sync_pragma_depends_on_compiler() {
        let tokens = Lexer::tokenize("sync").unwrap();
        let tree = case_parser::parse(&tokens).unwrap();

        let gcc = emit(&tree, &EmitMeta::default()).unwrap();
        assert!(gcc.contains("#pragma omp barrier"));

        let msvc = emit(
            &tree,
            &EmitMeta {
                cc: "cl".into(),
                ..EmitMeta::default()
            },
        )
        .unwrap();
        assert!(msvc.contains("// sync barrier"));
        assert!(!msvc.contains("#pragma omp barrier"));
    }

    #[test]
    fn input_reads_stdin() {
        let out = emit_src("let v = 0\ninput v");
        assert!(out.contains("std::cin >> v;"));
    }

    #[test]
    fn nested_function_becomes_lambda() {
        let out = emit_src("Fn outer { Fn inner { Print \"x\" }\ncall inner }");
        assert!(out.contains("auto inner = [&]() {"));
        assert!(out.contains("inner();"));
    }

    #[test]
    fn ternary_and_assignment_forms() {
        let out = emit_src("let x = 1\nx = x > 0 ? x : 0 - x\nx += 2\nx++");
        assert!(out.contains("x = ((x > 0) ? x : (0 - x));"));
        assert!(out.contains("x += 2;"));
        assert!(out.contains("x += 1;"));
    }

    #[test]
    fn non_program_root_is_invalid() {
        let bad = Node::new(NodeKind::Body, "", 1);
        assert!(emit(&bad, &EmitMeta::default()).is_err());
    }
}
