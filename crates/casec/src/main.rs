//! The CASE compiler CLI.
//!
//! Usage: `casec <input.case> [-o out] [--std=c++14] [--opt=O2] [--cc=g++]
//! [--tag key=value]...`
//!
//! The pipeline always writes the emitted program to `compiler.cpp`, then
//! hands it to the external C++ compiler unless `CASEC_NO_COMPILE=1` is set.
//! Exit code 0 on success; 1 on usage, read, parse, or semantic failure.

mod buildcc;
mod pipeline;

use std::path::{Path, PathBuf};
use std::process;

use ariadne::{Config, Label, Report, ReportKind, Source};
use case_common::span::LineIndex;
use case_plugin::Registry;
use clap::error::ErrorKind;
use clap::Parser;

use buildcc::{BuildOutcome, EMITTED_FILE};
use pipeline::{compile, CompileError, CompileOptions};

#[derive(Parser)]
#[command(name = "casec", version, about = "The CASE compiler")]
struct Cli {
    /// Input CASE source file
    input: PathBuf,

    /// Output executable path
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// C++ standard version to pass to the external compiler
    #[arg(long = "std", default_value = "c++14", value_parser = ["c++14", "c++17", "c++20"])]
    std: String,

    /// Optimization level for the external compiler
    #[arg(long = "opt", default_value = "O2", value_parser = ["O0", "O1", "O2", "O3"])]
    opt: String,

    /// External compiler command
    #[arg(long = "cc", default_value = "g++")]
    cc: String,

    /// Add a key=value pair to the embedded metadata; may be repeated
    #[arg(long = "tag", value_name = "KEY=VALUE")]
    tags: Vec<String>,
}

/// Default output executable name for the host platform.
fn default_output() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from("program.exe")
    } else {
        PathBuf::from("program.out")
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = e.print();
            process::exit(code);
        }
    };

    if let Err(code) = run(&cli) {
        process::exit(code);
    }
}

fn run(cli: &Cli) -> Result<(), i32> {
    let tags = parse_tags(&cli.tags).map_err(|msg| {
        eprintln!("error: {msg}");
        1
    })?;

    let source = std::fs::read_to_string(&cli.input).map_err(|e| {
        eprintln!("error: failed to read '{}': {e}", cli.input.display());
        1
    })?;

    // Diagnostics render against the preprocessed text; that is what the
    // lexer saw and what every span points into.
    let preprocessed = case_ciam::preprocess(&source);

    let options = CompileOptions {
        source_path: cli.input.display().to_string(),
        std: cli.std.clone(),
        opt: cli.opt.clone(),
        cc: cli.cc.clone(),
        tags,
    };

    let mut registry = Registry::new();
    let output = match compile(&source, &options, &mut registry) {
        Ok(output) => output,
        Err(err) => {
            report_failure(&preprocessed, &err);
            return Err(1);
        }
    };

    report_warnings(&preprocessed, &output.warnings);

    std::fs::write(EMITTED_FILE, &output.cpp).map_err(|e| {
        eprintln!("error: failed to write {EMITTED_FILE}: {e}");
        1
    })?;

    if let Some(replay) = &output.replay {
        if let Err(e) = replay.persist(Path::new("replay.txt")) {
            eprintln!("warning: failed to write replay.txt: {e}");
        }
    }

    let out_path = cli.output.clone().unwrap_or_else(default_output);
    match buildcc::compile_native(&cli.cc, &cli.std, &cli.opt, &out_path) {
        Ok(BuildOutcome::Built) => eprintln!("  Compiled: {}", out_path.display()),
        Ok(BuildOutcome::Skipped) => {
            eprintln!("  Emitted: {EMITTED_FILE} (external compile skipped)")
        }
        // External failures are warnings; the emitted C++ is still on disk.
        Err(msg) => eprintln!("warning: external compiler failed: {msg}"),
    }

    Ok(())
}

/// Split repeated `--tag key=value` arguments into pairs.
fn parse_tags(raw: &[String]) -> Result<Vec<(String, String)>, String> {
    raw.iter()
        .map(|tag| {
            tag.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .ok_or_else(|| format!("invalid --tag '{tag}', expected key=value"))
        })
        .collect()
}

/// Render a compile failure as ariadne reports against the preprocessed
/// source.
fn report_failure(source: &str, err: &CompileError) {
    match err {
        CompileError::Lex(e) => {
            report_span(source, "Lexical error", &e.kind.to_string(), e.span.start, e.span.end);
        }
        CompileError::Parse(e) => {
            report_span(source, "Parse error", &e.kind.to_string(), e.span.start, e.span.end);
        }
        CompileError::Semantic {
            errors,
            warnings,
            failure,
        } => {
            report_warnings(source, warnings);
            let index = LineIndex::new(source);
            for error in errors {
                let span = index.line_range(error.line);
                report_span(
                    source,
                    "Semantic error",
                    &error.kind.to_string(),
                    span.start,
                    span.end,
                );
            }
            eprintln!("error: {failure}");
        }
        CompileError::Emit(e) => {
            let index = LineIndex::new(source);
            let span = index.line_range(e.line);
            report_span(source, "Emission error", &e.to_string(), span.start, span.end);
        }
    }
}

fn report_warnings(source: &str, warnings: &[case_sema::SemaWarning]) {
    let index = LineIndex::new(source);
    for warning in warnings {
        let span = index.line_range(warning.line);
        let start = span.start as usize;
        let end = (span.end as usize).max(start + 1);
        let _ = Report::<std::ops::Range<usize>>::build(ReportKind::Warning, start..end)
            .with_config(Config::default().with_color(false))
            .with_message("Warning")
            .with_label(Label::new(start..end).with_message(warning.to_string()))
            .finish()
            .eprint(Source::from(source));
    }
}

fn report_span(source: &str, title: &str, message: &str, start: u32, end: u32) {
    let start = start as usize;
    let end = (end as usize).max(start + 1);
    let _ = Report::<std::ops::Range<usize>>::build(ReportKind::Error, start..end)
        .with_config(Config::default().with_color(false))
        .with_message(title)
        .with_label(Label::new(start..end).with_message(message))
        .finish()
        .eprint(Source::from(source));
}
