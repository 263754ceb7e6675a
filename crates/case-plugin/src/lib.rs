// CASE plugin surface -- phase names, the observer/transform registry, the
// overlay feature flags, and the replay buffer.
//
// The registry is owned by the driver context and threaded through
// compilation; registration order is invocation order, and transforms
// rewrite the shared tree in place.

mod flags;
mod replay;

use std::fmt;

use case_parser::Node;

pub use flags::OverlayFlags;
pub use replay::ReplayBuffer;

/// The named pipeline phases, in driver order.
///
/// `Tokens` and `EmittedCpp` carry text payloads; every other phase carries
/// the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Tokens,
    Parsed,
    Analyzed,
    PreOpt,
    Optimized,
    PostOpt,
    BeforeEmit,
    EmittedCpp,
    AfterEmit,
}

impl Phase {
    /// All phases in driver order.
    pub const ALL: [Phase; 9] = [
        Phase::Tokens,
        Phase::Parsed,
        Phase::Analyzed,
        Phase::PreOpt,
        Phase::Optimized,
        Phase::PostOpt,
        Phase::BeforeEmit,
        Phase::EmittedCpp,
        Phase::AfterEmit,
    ];

    /// The wire name of the phase, as seen by plugins and the replay file.
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Tokens => "tokens",
            Phase::Parsed => "parsed",
            Phase::Analyzed => "analyzed",
            Phase::PreOpt => "pre-opt",
            Phase::Optimized => "optimized",
            Phase::PostOpt => "post-opt",
            Phase::BeforeEmit => "before-emit",
            Phase::EmittedCpp => "emitted-cpp",
            Phase::AfterEmit => "after-emit",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type AstSink = Box<dyn FnMut(Phase, &Node)>;
type TextSink = Box<dyn FnMut(Phase, &str)>;
type AstTransform = Box<dyn FnMut(&mut Node, Phase)>;

/// The three extension points: AST observers, text observers, and named AST
/// transforms.
#[derive(Default)]
pub struct Registry {
    ast_sinks: Vec<AstSink>,
    text_sinks: Vec<TextSink>,
    transforms: Vec<(String, AstTransform)>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer invoked with the tree at every observed phase.
    pub fn register_ast_sink(&mut self, sink: impl FnMut(Phase, &Node) + 'static) {
        self.ast_sinks.push(Box::new(sink));
    }

    /// Register an observer invoked with textual artifacts (token dumps,
    /// emitted C++).
    pub fn register_text_sink(&mut self, sink: impl FnMut(Phase, &str) + 'static) {
        self.text_sinks.push(Box::new(sink));
    }

    /// Register a named transform, invoked at the mutate hooks in
    /// registration order.
    pub fn register_transform(
        &mut self,
        name: impl Into<String>,
        transform: impl FnMut(&mut Node, Phase) + 'static,
    ) {
        self.transforms.push((name.into(), Box::new(transform)));
    }

    /// Invoke every AST observer for a tree phase.
    pub fn observe_tree(&mut self, phase: Phase, tree: &Node) {
        for sink in &mut self.ast_sinks {
            sink(phase, tree);
        }
    }

    /// Invoke every text observer for a text phase.
    pub fn observe_text(&mut self, phase: Phase, text: &str) {
        for sink in &mut self.text_sinks {
            sink(phase, text);
        }
    }

    /// Run every registered transform over the tree, in registration order.
    /// Each transform observes the tree left by the previous one.
    pub fn apply_transforms(&mut self, phase: Phase, tree: &mut Node) {
        for (_, transform) in &mut self.transforms {
            transform(tree, phase);
        }
    }

    /// Names of the registered transforms, in registration order.
    pub fn transform_names(&self) -> impl Iterator<Item = &str> {
        self.transforms.iter().map(|(name, _)| name.as_str())
    }
}

/// A pretty JSON dump of the tree, used for replay snapshots of tree phases.
pub fn tree_dump(tree: &Node) -> String {
    serde_json::to_string_pretty(tree).unwrap_or_else(|_| String::from("{}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use case_parser::NodeKind;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn phase_names_in_driver_order() {
        let names: Vec<&str> = Phase::ALL.iter().map(|p| p.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "tokens",
                "parsed",
                "analyzed",
                "pre-opt",
                "optimized",
                "post-opt",
                "before-emit",
                "emitted-cpp",
                "after-emit"
            ]
        );
    }

    #[test]
    fn ast_sinks_see_every_observed_phase() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = Rc::clone(&seen);

        let mut registry = Registry::new();
        registry.register_ast_sink(move |phase, _| seen_clone.borrow_mut().push(phase));

        let tree = Node::new(NodeKind::Program, "", 1);
        registry.observe_tree(Phase::Parsed, &tree);
        registry.observe_tree(Phase::Optimized, &tree);

        assert_eq!(*seen.borrow(), vec![Phase::Parsed, Phase::Optimized]);
    }

    #[test]
    fn transforms_run_in_registration_order() {
        let mut registry = Registry::new();
        registry.register_transform("first", |tree, _| {
            tree.payload.push('a');
        });
        registry.register_transform("second", |tree, _| {
            tree.payload.push('b');
        });

        let mut tree = Node::new(NodeKind::Program, "", 1);
        registry.apply_transforms(Phase::PreOpt, &mut tree);
        assert_eq!(tree.payload, "ab");

        let names: Vec<&str> = registry.transform_names().collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn text_sinks_receive_payload() {
        let seen = Rc::new(RefCell::new(String::new()));
        let seen_clone = Rc::clone(&seen);

        let mut registry = Registry::new();
        registry.register_text_sink(move |phase, text| {
            seen_clone
                .borrow_mut()
                .push_str(&format!("{phase}:{text}"));
        });

        registry.observe_text(Phase::Tokens, "1 Keyword let");
        assert_eq!(*seen.borrow(), "tokens:1 Keyword let");
    }

    #[test]
    fn tree_dump_is_json() {
        let tree = Node::new(NodeKind::Program, "", 1);
        let dump = tree_dump(&tree);
        assert!(dump.contains("\"kind\""));
        assert!(dump.contains("\"Program\""));
    }
}
