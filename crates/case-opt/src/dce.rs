//! Dead-code elimination.
//!
//! In every `Body`, statements after the first `Ret` can never run; they are
//! dropped so the emitted output stays a prefix of the input statements.

use case_parser::{Node, NodeKind};

pub(crate) fn run(node: &mut Node) {
    if node.kind == NodeKind::Body {
        if let Some(ret_idx) = node.children.iter().position(|c| c.kind == NodeKind::Ret) {
            node.children.truncate(ret_idx + 1);
        }
    }
    for child in &mut node.children {
        run(child);
    }
}
