//! Scoped environment stacks.
//!
//! Both analysis stages stack one map per lexical scope: lookups walk from
//! the innermost scope outward, and popping a scope discards everything it
//! learned.

use rustc_hash::FxHashMap;

/// A stack of name -> value scopes.
#[derive(Debug)]
pub struct ScopeStack<T> {
    scopes: Vec<FxHashMap<String, T>>,
}

impl<T> ScopeStack<T> {
    /// Create a stack with a single root scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![FxHashMap::default()],
        }
    }

    /// Enter a nested scope.
    pub fn push_scope(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    /// Leave the innermost scope, discarding its entries. The root scope is
    /// never popped.
    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Bind a name in the innermost scope, shadowing any outer binding.
    ///
    /// Updates always target the innermost scope so that everything a block
    /// learns disappears when the block's scope pops.
    pub fn insert(&mut self, name: impl Into<String>, value: T) {
        self.scopes
            .last_mut()
            .expect("scope stack is never empty")
            .insert(name.into(), value);
    }

    /// Resolve a name, walking scopes from innermost outward.
    pub fn lookup(&self, name: &str) -> Option<&T> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Whether a name resolves in any scope.
    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }
}

impl<T> Default for ScopeStack<T> {
    fn default() -> Self {
        Self::new()
    }
}
