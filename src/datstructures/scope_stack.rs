use std::{borrow::Borrow, collections::HashMap, hash::Hash};

use thiserror::Error;

#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum ScopeError {
    #[error("The stack is empty")]
    EmptyStack,

    #[error("The key is already bound in the innermost scope")]
    AlreadyBound,
}

///
/// Layered name table. Lookups walk from the innermost scope outwards,
/// insertions always target the innermost scope.
///
#[derive(Clone, Debug)]
pub struct ScopeStack<K, V> {
    scopes: Vec<HashMap<K, V>>,
}

impl<K: Eq + Hash, V> Default for ScopeStack<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash, V> ScopeStack<K, V> {
    pub fn new() -> Self {
        ScopeStack { scopes: Vec::new() }
    }

    pub fn push(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// Opens a scope already holding `bindings`; a repeated key keeps its last value.
    pub fn push_with(&mut self, bindings: impl IntoIterator<Item = (K, V)>) {
        self.scopes.push(bindings.into_iter().collect());
    }

    pub fn lookup<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.scopes.iter().rev().find_map(|scope| scope.get(key))
    }

    /// Binds `k` in the innermost scope, refusing to rebind a key that scope already holds.
    pub fn declare(&mut self, k: K, v: V) -> Result<(), ScopeError> {
        let Some(scope) = self.scopes.last_mut() else {
            return Err(ScopeError::EmptyStack);
        };

        if scope.contains_key(&k) {
            return Err(ScopeError::AlreadyBound);
        }

        scope.insert(k, v);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.scopes.clear();
    }
}
