// CASE optimizer -- a pure in-place tree rewrite.
//
// Constant folding, algebraic peephole simplification, and post-return
// dead-code elimination, run to a two-round fixed point. Malformed subtrees
// pass through unchanged; the optimizer never fails.

mod dce;
mod fold;

use case_parser::Node;

/// Number of full passes. The pass set is idempotent after two rounds.
const ROUNDS: usize = 2;

/// Optimize a tree in place.
pub fn optimize(tree: &mut Node) {
    for _ in 0..ROUNDS {
        fold::run(tree);
        dce::run(tree);
    }
}
