//! Declared-kind to C++ type mapping.

use case_parser::{Node, NodeKind};

/// Map a declared CASE kind name to a C++ type.
pub(crate) fn map_type(name: &str) -> &'static str {
    match name {
        "int" => "int",
        "double" | "float" => "double",
        "string" => "std::string",
        "bool" => "bool",
        _ => "double",
    }
}

/// The C++ return type of a function node: the declared type when present,
/// otherwise `double` if the body contains a valued `ret`, else `void`.
pub(crate) fn return_type(fn_node: &Node) -> &'static str {
    if let Some(declared) = fn_node.child(NodeKind::ReturnType) {
        return map_type(&declared.payload);
    }
    if let Some(body) = fn_node.child(NodeKind::Body) {
        if has_valued_ret(body) {
            return "double";
        }
    }
    "void"
}

/// Whether a subtree contains a `Ret` with a value, without descending into
/// nested functions.
fn has_valued_ret(node: &Node) -> bool {
    for child in &node.children {
        if child.kind == NodeKind::Fn {
            continue;
        }
        if child.kind == NodeKind::Ret && !child.children.is_empty() {
            return true;
        }
        if has_valued_ret(child) {
            return true;
        }
    }
    false
}
