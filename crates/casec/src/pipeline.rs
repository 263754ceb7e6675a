//! The compilation pipeline.
//!
//! Runs each phase to completion before the next begins, surfaces the first
//! lexical/syntactic failure immediately, accumulates semantic errors, and
//! drives the plugin registry at the named phase boundaries:
//! `tokens`, `parsed`, `analyzed`, `pre-opt`, `optimized`, `post-opt`,
//! `before-emit`, `emitted-cpp`, `after-emit`.

use std::fmt;

use case_common::error::LexError;
use case_common::token::Token;
use case_emit::{EmitError, EmitMeta};
use case_lexer::Lexer;
use case_parser::ParseError;
use case_plugin::{tree_dump, OverlayFlags, Phase, Registry, ReplayBuffer};
use case_sema::{SemaError, SemaFailure, SemaWarning};

/// Driver-level compile options, filled from the CLI.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub source_path: String,
    pub std: String,
    pub opt: String,
    pub cc: String,
    pub tags: Vec<(String, String)>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            source_path: String::from("<memory>"),
            std: String::from("c++14"),
            opt: String::from("O2"),
            cc: String::from("g++"),
            tags: Vec::new(),
        }
    }
}

/// A successful compilation: the C++ text, weak-typing warnings, and the
/// replay buffer when the `replay` overlay was set.
#[derive(Debug)]
pub struct CompileOutput {
    pub cpp: String,
    pub warnings: Vec<SemaWarning>,
    pub replay: Option<ReplayBuffer>,
}

/// A failed compilation.
#[derive(Debug)]
pub enum CompileError {
    Lex(LexError),
    Parse(ParseError),
    /// Accumulated semantic errors plus the aggregate failure. Warnings ride
    /// along so the driver can render them too.
    Semantic {
        errors: Vec<SemaError>,
        warnings: Vec<SemaWarning>,
        failure: SemaFailure,
    },
    Emit(EmitError),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lex(e) => write!(f, "{e}"),
            Self::Parse(e) => write!(f, "{e}"),
            Self::Semantic { failure, .. } => write!(f, "{failure}"),
            Self::Emit(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CompileError {}

/// Compile preprocessed-or-raw CASE source to C++ text.
///
/// The registry's observers fire when the tree enables `inspect` or
/// `replay`; its transforms fire at the two mutate hooks when the tree
/// enables `mutate`.
pub fn compile(
    source: &str,
    options: &CompileOptions,
    registry: &mut Registry,
) -> Result<CompileOutput, CompileError> {
    // Preprocess. Identity unless the source enables CIAM inline.
    let preprocessed = case_ciam::preprocess(source);

    // Lex.
    let tokens = Lexer::tokenize(&preprocessed).map_err(CompileError::Lex)?;
    let token_text = token_dump(&tokens);

    // Parse.
    let mut tree = case_parser::parse(&tokens).map_err(CompileError::Parse)?;

    // Overlay flags gate every observation below.
    let flags = OverlayFlags::collect(&tree);
    let mut replay = flags.replay.then(ReplayBuffer::new);

    observe_text(registry, &flags, &mut replay, Phase::Tokens, &token_text);
    observe_tree(registry, &flags, &mut replay, Phase::Parsed, &tree);

    // Semantic analysis. Errors accumulate; the emitter never runs on a
    // program that failed validation.
    let sema = case_sema::analyze(&tree);
    if let Some(failure) = sema.failure() {
        return Err(CompileError::Semantic {
            errors: sema.errors,
            warnings: sema.warnings,
            failure,
        });
    }
    observe_tree(registry, &flags, &mut replay, Phase::Analyzed, &tree);

    // Mutate hook one, then the optimizer, then mutate hook two.
    observe_tree(registry, &flags, &mut replay, Phase::PreOpt, &tree);
    if flags.mutate {
        registry.apply_transforms(Phase::PreOpt, &mut tree);
    }

    case_opt::optimize(&mut tree);
    observe_tree(registry, &flags, &mut replay, Phase::Optimized, &tree);

    if flags.mutate {
        registry.apply_transforms(Phase::PostOpt, &mut tree);
    }
    observe_tree(registry, &flags, &mut replay, Phase::PostOpt, &tree);

    // Emit.
    observe_tree(registry, &flags, &mut replay, Phase::BeforeEmit, &tree);
    let meta = EmitMeta {
        source: options.source_path.clone(),
        std: options.std.clone(),
        opt: options.opt.clone(),
        cc: options.cc.clone(),
        tags: options.tags.clone(),
    };
    let cpp = case_emit::emit(&tree, &meta).map_err(CompileError::Emit)?;
    observe_text(registry, &flags, &mut replay, Phase::EmittedCpp, &cpp);
    observe_tree(registry, &flags, &mut replay, Phase::AfterEmit, &tree);

    Ok(CompileOutput {
        cpp,
        warnings: sema.warnings,
        replay,
    })
}

/// One `line kind text` row per token.
fn token_dump(tokens: &[Token]) -> String {
    let mut out = String::new();
    for token in tokens {
        out.push_str(&format!("{} {:?} {}\n", token.line, token.kind, token.text));
    }
    out
}

fn observe_tree(
    registry: &mut Registry,
    flags: &OverlayFlags,
    replay: &mut Option<ReplayBuffer>,
    phase: Phase,
    tree: &case_parser::Node,
) {
    if flags.observing() {
        registry.observe_tree(phase, tree);
    }
    if let Some(buffer) = replay {
        buffer.record(phase, tree_dump(tree));
    }
}

fn observe_text(
    registry: &mut Registry,
    flags: &OverlayFlags,
    replay: &mut Option<ReplayBuffer>,
    phase: Phase,
    text: &str,
) {
    if flags.observing() {
        registry.observe_text(phase, text);
    }
    if let Some(buffer) = replay {
        buffer.record(phase, text);
    }
}
