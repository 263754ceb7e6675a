//! End-to-end integration tests for the casec CLI.
//!
//! Each test writes a `.case` source file into a temp directory, invokes the
//! built `casec` binary there with `CASEC_NO_COMPILE=1`, and asserts on the
//! generated `compiler.cpp` and on stderr/exit codes.

use std::path::PathBuf;
use std::process::{Command, Output};

use tempfile::TempDir;

/// Find the casec binary in the target directory.
fn find_casec() -> PathBuf {
    let mut path = std::env::current_exe()
        .expect("cannot find current exe")
        .parent()
        .expect("cannot find parent dir")
        .to_path_buf();

    // Navigate from `deps/` to the target directory
    if path.file_name().is_some_and(|n| n == "deps") {
        path = path.parent().unwrap().to_path_buf();
    }

    let casec = path.join(if cfg!(windows) { "casec.exe" } else { "casec" });
    assert!(
        casec.exists(),
        "casec binary not found at {}. Run `cargo build -p casec` first.",
        casec.display()
    );
    casec
}

/// Run casec on a source string inside a fresh temp directory. The external
/// compiler is always skipped.
fn run_casec(source: &str, extra_args: &[&str]) -> (TempDir, Output) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let input = dir.path().join("main.case");
    std::fs::write(&input, source).expect("failed to write main.case");

    let output = Command::new(find_casec())
        .arg("main.case")
        .args(extra_args)
        .current_dir(dir.path())
        .env("CASEC_NO_COMPILE", "1")
        .output()
        .expect("failed to invoke casec");

    (dir, output)
}

/// Compile expecting success; returns the temp dir and the emitted C++.
fn compile_ok(source: &str) -> (TempDir, String) {
    let (dir, output) = run_casec(source, &[]);
    assert!(
        output.status.success(),
        "casec failed:\nstdout: {}\nstderr: {}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    let cpp = std::fs::read_to_string(dir.path().join("compiler.cpp"))
        .expect("compiler.cpp should be written");
    (dir, cpp)
}

/// Compile expecting failure; returns stderr.
fn compile_err(source: &str) -> (TempDir, String) {
    let (dir, output) = run_casec(source, &[]);
    assert_eq!(
        output.status.code(),
        Some(1),
        "expected exit code 1, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (dir, stderr)
}

// ── E2E scenarios ──────────────────────────────────────────────────────────

/// SC1: a bare Print compiles to a cout chain inside main, with no user
/// function declarations.
#[test]
fn e2e_hello_world() {
    let (_dir, cpp) = compile_ok("Print \"hello\"");
    assert!(cpp.contains("std::cout << \"hello\" << std::endl;"));
    assert!(cpp.contains("int main() {"));
    // The only void functions come from the channel template.
    assert_eq!(cpp.matches("void ").count(), 1);
}

/// SC2: functions declare before main and main stays empty.
#[test]
fn e2e_functions_and_empty_main() {
    let (_dir, cpp) = compile_ok("Fn f { Print \"x\" }\nFn g { call f }");
    assert!(cpp.contains("void f() {"));
    assert!(cpp.contains("void g() {"));
    assert!(cpp.contains("f();"));
    let main_body = &cpp[cpp.find("int main()").unwrap()..];
    assert!(!main_body.contains("std::cout"));
}

/// SC3: a pure function containing a Print fails validation.
#[test]
fn e2e_pure_violation_fails() {
    let (dir, stderr) = compile_err("overlay pure\nFn f { Print \"x\" }");
    assert!(stderr.contains("semantic validation failed with 1 error(s)"));
    assert!(stderr.contains("pure function `f`"));
    // The emitter never ran.
    assert!(!dir.path().join("compiler.cpp").exists());
}

/// SC4: a provably negative argument against a nonneg parameter fails, and
/// nothing is emitted.
#[test]
fn e2e_nonneg_violation_fails() {
    let (dir, stderr) = compile_err("overlay nonneg_n Fn f \"int n\" { } call f -1");
    assert!(stderr.contains("semantic validation failed with 1 error(s)"));
    assert!(stderr.contains("non-negative parameter `n`"));
    assert!(!dir.path().join("compiler.cpp").exists());
}

/// SC5: constant folding and peephole simplification reach the output.
#[test]
fn e2e_optimizer_folds() {
    let (_dir, cpp) = compile_ok("let a = 2+3\nlet b = a*0");
    assert!(cpp.contains("auto a = 5;"));
    assert!(cpp.contains("auto b = 0;"));
}

/// SC6: CIAM repairs the bare Print from the nearest literal, removes the
/// directive, and extracts the now-repeated literal into a macro.
#[test]
fn e2e_ciam_print_repair() {
    let (_dir, cpp) = compile_ok("call CIAM[on] Print Print \"hi\"");
    assert!(!cpp.contains("CIAM[on]"));
    assert!(cpp.contains("void _CIAM_Print_1() {"));
    assert!(cpp.contains("std::cout << \"hi\" << std::endl;"));
    assert_eq!(cpp.matches("_CIAM_Print_1();").count(), 2);
}

#[test]
fn e2e_lexical_error_reports_line() {
    let (_dir, stderr) = compile_err("let x = 1\n\"never closed");
    assert!(stderr.contains("unterminated string literal"));
}

#[test]
fn e2e_parse_error_exits_one() {
    let (_dir, stderr) = compile_err("Fn f {");
    assert!(stderr.contains("Parse error"));
}

#[test]
fn e2e_replay_overlay_writes_replay_txt() {
    let (dir, _cpp) = compile_ok("overlay replay\nFn f { }\nPrint \"x\"");
    let replay = std::fs::read_to_string(dir.path().join("replay.txt"))
        .expect("replay.txt should be written");
    assert!(replay.contains("=== tokens ==="));
    assert!(replay.contains("=== parsed ==="));
    assert!(replay.contains("=== emitted-cpp ==="));
    // Phases appear in pipeline order.
    let tokens_pos = replay.find("=== tokens ===").unwrap();
    let emitted_pos = replay.find("=== emitted-cpp ===").unwrap();
    assert!(tokens_pos < emitted_pos);
}

#[test]
fn e2e_no_replay_without_overlay() {
    let (dir, _cpp) = compile_ok("Print \"x\"");
    assert!(!dir.path().join("replay.txt").exists());
}

#[test]
fn e2e_tags_land_in_metadata() {
    let (dir, output) = run_casec("Print \"x\"", &["--tag", "team=sim", "--tag", "rev=7"]);
    assert!(output.status.success());
    let cpp = std::fs::read_to_string(dir.path().join("compiler.cpp")).unwrap();
    assert!(cpp.contains("\\\"team\\\":\\\"sim\\\""));
    assert!(cpp.contains("\\\"rev\\\":\\\"7\\\""));
}

#[test]
fn e2e_std_flag_reaches_metadata() {
    let (dir, output) = run_casec("Print \"x\"", &["--std=c++20"]);
    assert!(output.status.success());
    let cpp = std::fs::read_to_string(dir.path().join("compiler.cpp")).unwrap();
    assert!(cpp.contains("\\\"std\\\":\\\"c++20\\\""));
}

#[test]
fn e2e_invalid_tag_is_usage_error() {
    let (_dir, output) = run_casec("Print \"x\"", &["--tag", "notapair"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn e2e_invalid_opt_level_is_usage_error() {
    let (_dir, output) = run_casec("Print \"x\"", &["--opt=O9"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn e2e_missing_input_is_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = Command::new(find_casec())
        .arg("nope.case")
        .current_dir(dir.path())
        .env("CASEC_NO_COMPILE", "1")
        .output()
        .expect("failed to invoke casec");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to read"));
}

#[test]
fn e2e_warnings_do_not_fail_the_build() {
    let (dir, output) = run_casec("Print ghost", &[]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unresolved reference `ghost`"));
    assert!(dir.path().join("compiler.cpp").exists());
}

#[test]
fn e2e_semantic_errors_accumulate() {
    let (_dir, stderr) = compile_err("let x = 1 + \"s\"\nlet y = \"t\" * 2");
    assert!(stderr.contains("semantic validation failed with 2 error(s)"));
}
