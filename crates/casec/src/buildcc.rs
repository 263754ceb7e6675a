//! External C++ compiler invocation.
//!
//! The emitted program always lands in `compiler.cpp`; the external build
//! step is best-effort and its failure is a warning, not a fatal error.
//! `CASEC_NO_COMPILE=1` skips the external compiler entirely.

use std::path::Path;
use std::process::Command;

/// The well-known output path for the emitted C++ program.
pub const EMITTED_FILE: &str = "compiler.cpp";

/// What happened with the external build step.
#[derive(Debug, PartialEq, Eq)]
pub enum BuildOutcome {
    /// The external compiler produced the executable.
    Built,
    /// `CASEC_NO_COMPILE=1` was set; only `compiler.cpp` was written.
    Skipped,
}

/// Whether the environment disables the external compiler.
pub fn compile_disabled() -> bool {
    std::env::var("CASEC_NO_COMPILE").map(|v| v == "1").unwrap_or(false)
}

/// Invoke `<cc> -std=<std> -<opt> compiler.cpp -o <output>`.
///
/// Returns an error string suitable for a driver warning when the compiler
/// is missing or exits non-zero.
pub fn compile_native(cc: &str, std: &str, opt: &str, output: &Path) -> Result<BuildOutcome, String> {
    if compile_disabled() {
        return Ok(BuildOutcome::Skipped);
    }

    let result = Command::new(cc)
        .arg(format!("-std={std}"))
        .arg(format!("-{opt}"))
        .arg(EMITTED_FILE)
        .arg("-o")
        .arg(output)
        .output();

    match result {
        Ok(out) if out.status.success() => Ok(BuildOutcome::Built),
        Ok(out) => Err(format!(
            "{cc} exited with {}: {}",
            out.status,
            String::from_utf8_lossy(&out.stderr).trim()
        )),
        Err(e) => Err(format!("failed to invoke {cc}: {e}")),
    }
}
