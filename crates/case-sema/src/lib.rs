// CASE semantic analysis -- weak kind inference, strong operator typing,
// and overlay-declared contracts (purity, parameter non-negativity).

pub mod env;
pub mod error;
pub mod fninfo;
pub mod ty;

mod strong;
mod weak;

use case_parser::Node;
use rustc_hash::FxHashMap;

pub use error::{SemaError, SemaErrorKind, SemaFailure, SemaWarning, SemaWarningKind};
pub use fninfo::{collect_functions, FunctionInfo};
pub use ty::{Nonneg, TypeKind};

/// The output of semantic analysis.
///
/// Errors accumulate across the whole program; [`SemaResult::failure`]
/// reports the aggregate verdict. Warnings never fail analysis.
#[derive(Debug)]
pub struct SemaResult {
    pub functions: FxHashMap<String, FunctionInfo>,
    pub warnings: Vec<SemaWarning>,
    pub errors: Vec<SemaError>,
}

impl SemaResult {
    /// `Some(SemanticValidationFailed)` when any error was accumulated.
    pub fn failure(&self) -> Option<SemaFailure> {
        if self.errors.is_empty() {
            None
        } else {
            Some(SemaFailure::SemanticValidationFailed {
                count: self.errors.len(),
            })
        }
    }
}

/// Run both analysis stages over a parsed program.
///
/// The function table is built first, then the weak pass collects
/// unresolved-reference warnings, then the strong pass enforces operator
/// typing and overlay contracts.
pub fn analyze(tree: &Node) -> SemaResult {
    let functions = fninfo::collect_functions(tree);
    let warnings = weak::run(tree);
    let errors = strong::run(tree, &functions);
    SemaResult {
        functions,
        warnings,
        errors,
    }
}
