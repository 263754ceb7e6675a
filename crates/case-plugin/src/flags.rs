//! Overlay-driven feature flags.

use case_parser::{Node, NodeKind};

/// Introspection features enabled by overlay declarations anywhere in the
/// tree. Collected once, before analysis, by a pure walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverlayFlags {
    /// AST observers fire at every phase boundary.
    pub inspect: bool,
    /// Phase snapshots are recorded for later persistence (implies
    /// observation).
    pub replay: bool,
    /// Registered AST transforms fire at the mutate hooks.
    pub mutate: bool,
}

impl OverlayFlags {
    /// Collect flags from every `Overlay` node in the tree. `audit` is an
    /// alias for `inspect`.
    pub fn collect(tree: &Node) -> Self {
        let mut flags = OverlayFlags::default();
        tree.walk(&mut |node| {
            if node.kind == NodeKind::Overlay {
                match node.payload.as_str() {
                    "inspect" | "audit" => flags.inspect = true,
                    "replay" => flags.replay = true,
                    "mutate" => flags.mutate = true,
                    _ => {}
                }
            }
        });
        flags
    }

    /// Whether observers should fire at phase boundaries.
    pub fn observing(&self) -> bool {
        self.inspect || self.replay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use case_lexer::Lexer;

    fn flags_of(src: &str) -> OverlayFlags {
        let tokens = Lexer::tokenize(src).unwrap();
        let tree = case_parser::parse(&tokens).unwrap();
        OverlayFlags::collect(&tree)
    }

    #[test]
    fn no_overlays_no_flags() {
        let flags = flags_of("Print \"x\"");
        assert_eq!(flags, OverlayFlags::default());
        assert!(!flags.observing());
    }

    #[test]
    fn inspect_enables_observation() {
        let flags = flags_of("overlay inspect\nFn f { }");
        assert!(flags.inspect);
        assert!(flags.observing());
        assert!(!flags.mutate);
    }

    #[test]
    fn audit_is_inspect() {
        let flags = flags_of("overlay audit\nFn f { }");
        assert!(flags.inspect);
    }

    #[test]
    fn replay_and_mutate() {
        let flags = flags_of("overlay replay, mutate\nFn f { }");
        assert!(flags.replay);
        assert!(flags.mutate);
        assert!(flags.observing());
    }

    #[test]
    fn collection_is_a_pure_function_of_the_tree() {
        let tokens = Lexer::tokenize("overlay inspect\nFn f { }").unwrap();
        let tree = case_parser::parse(&tokens).unwrap();
        assert_eq!(OverlayFlags::collect(&tree), OverlayFlags::collect(&tree));
    }

    #[test]
    fn contract_overlays_do_not_set_flags() {
        let flags = flags_of("overlay pure, nonneg_n\nFn f \"int n\" { }");
        assert_eq!(flags, OverlayFlags::default());
    }
}
