use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Error, LimoneResult};
use crate::grammars::{Grammar, RawGrammar};

/// Process-wide lookup from grammar scope name to grammar file path,
/// consulted when a rule's `include` references another grammar.
///
/// The registry is the only state shared between parses: pass one instance
/// (behind an `Arc`) to every parser that should see the same scopes.
/// Entries are never evicted. Resolving a scope loads a fresh `Grammar`
/// each time; only the path mapping is cached.
///
/// Include targets that failed to resolve are remembered so they are
/// neither retried nor reported more than once.
#[derive(Debug, Default)]
pub struct Registry {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    scopes: HashMap<String, PathBuf>,
    failed: HashSet<String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps a scope name to the grammar file that defines it
    pub fn register_scope(&self, scope: &str, path: impl Into<PathBuf>) {
        let mut inner = self.lock();
        inner.scopes.insert(scope.to_string(), path.into());
    }

    /// Loads the grammar registered for `scope`
    pub fn resolve(&self, scope: &str) -> LimoneResult<Grammar> {
        let path = self.lock().scopes.get(scope).cloned();
        match path {
            Some(path) => self.load(&path),
            None => Err(Error::ScopeNotRegistered(scope.to_string())),
        }
    }

    /// Loads a grammar file and registers its scope for later resolution
    pub fn resolve_by_path(&self, path: impl AsRef<Path>) -> LimoneResult<Grammar> {
        self.load(path.as_ref())
    }

    /// Resolves `target` as a registered scope first, then as a file path.
    /// This is what `include` references go through.
    pub fn resolve_or_load(&self, target: &str) -> LimoneResult<Grammar> {
        self.resolve(target)
            .or_else(|_| self.resolve_by_path(target))
    }

    fn load(&self, path: &Path) -> LimoneResult<Grammar> {
        let grammar = RawGrammar::load_from_file(path)?.compile();
        self.register_scope(&grammar.scope_name, path);
        Ok(grammar)
    }

    /// Whether `target` is already known to be unresolvable
    pub(crate) fn has_failed(&self, target: &str) -> bool {
        self.lock().failed.contains(target)
    }

    /// Records an unresolvable include target. Returns true the first time
    /// so the caller can emit a single diagnostic.
    pub(crate) fn note_failed(&self, target: &str) -> bool {
        self.lock().failed.insert(target.to_string())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("registry lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregistered_scope_is_an_error() {
        let registry = Registry::new();
        assert!(matches!(
            registry.resolve("source.unknown"),
            Err(Error::ScopeNotRegistered(_))
        ));
    }

    #[test]
    fn loading_by_path_registers_the_scope() {
        let registry = Registry::new();
        let grammar = registry.resolve_by_path("testdata/toy.json").unwrap();
        assert_eq!(grammar.scope_name, "source.toy");
        // now resolvable by scope as well
        let again = registry.resolve("source.toy").unwrap();
        assert_eq!(again.name, grammar.name);
    }

    #[test]
    fn resolve_or_load_falls_back_to_the_path_form() {
        let registry = Registry::new();
        let grammar = registry.resolve_or_load("testdata/tags.json").unwrap();
        assert_eq!(grammar.scope_name, "source.tags");
    }

    #[test]
    fn resolving_twice_loads_independent_grammars() {
        let registry = Registry::new();
        registry.register_scope("source.toy", "testdata/toy.json");
        let a = registry.resolve("source.toy").unwrap();
        let b = registry.resolve("source.toy").unwrap();
        assert_eq!(a.rule_count(), b.rule_count());
    }

    #[test]
    fn failed_targets_are_reported_once() {
        let registry = Registry::new();
        assert!(!registry.has_failed("source.gone"));
        assert!(registry.note_failed("source.gone"));
        assert!(!registry.note_failed("source.gone"));
        assert!(registry.has_failed("source.gone"));
    }
}
