//! Per-function contract information gathered before the checking passes.

use case_parser::{Node, NodeKind};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::ty::TypeKind;

/// Contracts and signature of one named function or method.
#[derive(Debug, Clone)]
pub struct FunctionInfo {
    pub name: String,
    /// Ordered `(name, declared kind)` pairs.
    pub params: Vec<(String, TypeKind)>,
    /// Whether the function carries the `pure` overlay.
    pub pure: bool,
    /// Parameter names constrained non-negative via `nonneg_<p>` or the
    /// bare `nonnegative` overlay (which covers every numeric parameter).
    pub non_negative: FxHashSet<String>,
    pub line: u32,
}

impl FunctionInfo {
    fn from_node(node: &Node) -> Self {
        let mut params = Vec::new();
        if let Some(params_node) = node.child(NodeKind::Params) {
            for param in params_node.children_of(NodeKind::Param) {
                let kind = param
                    .children
                    .first()
                    .map(|k| TypeKind::from_declared(&k.payload))
                    .unwrap_or(TypeKind::Unknown);
                params.push((param.payload.clone(), kind));
            }
        }

        let mut pure = false;
        let mut non_negative = FxHashSet::default();
        for overlay in node.children_of(NodeKind::Overlay) {
            match overlay.payload.as_str() {
                "pure" => pure = true,
                "nonnegative" => {
                    for (name, kind) in &params {
                        if *kind == TypeKind::Number {
                            non_negative.insert(name.clone());
                        }
                    }
                }
                name => {
                    if let Some(param) = name.strip_prefix("nonneg_") {
                        non_negative.insert(param.to_string());
                    }
                }
            }
        }

        Self {
            name: node.payload.clone(),
            params,
            pure,
            non_negative,
            line: node.line,
        }
    }

    /// Whether the function constrains any parameter non-negative.
    pub fn has_nonneg_contract(&self) -> bool {
        !self.non_negative.is_empty()
    }
}

/// Collect every `Fn` in the tree (top level and class/struct methods) into
/// a name-keyed table. On duplicate names the later definition wins.
pub fn collect_functions(tree: &Node) -> FxHashMap<String, FunctionInfo> {
    let mut table = FxHashMap::default();
    tree.walk(&mut |node| {
        if node.kind == NodeKind::Fn {
            table.insert(node.payload.clone(), FunctionInfo::from_node(node));
        }
    });
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use case_lexer::Lexer;

    fn functions_of(src: &str) -> FxHashMap<String, FunctionInfo> {
        let tokens = Lexer::tokenize(src).unwrap();
        let tree = case_parser::parse(&tokens).unwrap();
        collect_functions(&tree)
    }

    #[test]
    fn collects_params_and_kinds() {
        let fns = functions_of("Fn f \"int a, string s, widget w\" { }");
        let f = &fns["f"];
        assert_eq!(
            f.params,
            vec![
                ("a".to_string(), TypeKind::Number),
                ("s".to_string(), TypeKind::String),
                ("w".to_string(), TypeKind::Unknown),
            ]
        );
        assert!(!f.pure);
        assert!(!f.has_nonneg_contract());
    }

    #[test]
    fn pure_overlay_sets_flag() {
        let fns = functions_of("overlay pure\nFn f { }");
        assert!(fns["f"].pure);
    }

    #[test]
    fn nonneg_overlay_targets_one_param() {
        let fns = functions_of("overlay nonneg_n\nFn f \"int n, int m\" { }");
        let f = &fns["f"];
        assert!(f.non_negative.contains("n"));
        assert!(!f.non_negative.contains("m"));
    }

    #[test]
    fn bare_nonnegative_covers_numeric_params() {
        let fns = functions_of("overlay nonnegative\nFn f \"int n, string s, double d\" { }");
        let f = &fns["f"];
        assert!(f.non_negative.contains("n"));
        assert!(f.non_negative.contains("d"));
        assert!(!f.non_negative.contains("s"));
    }

    #[test]
    fn methods_are_collected() {
        let fns = functions_of("class C {\n  public:\n  Fn m { }\n}");
        assert!(fns.contains_key("m"));
    }
}
