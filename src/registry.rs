//! Fact registry: normalized name → [`Fact`].
//!
//! Names are normalized to lowercase at every boundary. Lookups never create
//! entries. The map lock is released before any fact resolves, so resolvers
//! are free to query the registry themselves.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use crate::fact::{Constant, Fact, ResolutionOptions, Resolver};
use crate::name::FactName;

/// Process-wide catalogue of facts.
pub struct FactRegistry {
    facts: RwLock<HashMap<FactName, Arc<Fact>>>,
}

impl FactRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            facts: RwLock::new(HashMap::new()),
        }
    }

    /// Get or create the fact `name`, without adding a resolution.
    pub fn declare(&self, name: &str) -> Arc<Fact> {
        let key = FactName::new(name);
        if let Some(fact) = self.read().get(&key) {
            return Arc::clone(fact);
        }
        let mut facts = self.facts.write().expect("facts lock poisoned");
        Arc::clone(
            facts
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Fact::new(key))),
        )
    }

    /// Add a resolution for `name`, creating the fact if needed.
    ///
    /// Repeated calls accumulate alternative resolutions on one fact.
    pub fn add(
        &self,
        name: &str,
        options: ResolutionOptions,
        resolver: impl Resolver + 'static,
    ) -> Arc<Fact> {
        let fact = self.declare(name);
        fact.add_resolution(options, resolver);
        fact
    }

    /// Register a fact with a single constant value.
    pub fn add_value(&self, name: &str, value: impl Into<String>) -> Arc<Fact> {
        self.add(name, ResolutionOptions::new(), Constant(value.into()))
    }

    /// Look up a fact by name (case-insensitive). Never creates an entry.
    pub fn lookup(&self, name: &str) -> Option<Arc<Fact>> {
        self.read().get(FactName::new(name).as_str()).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(FactName::new(name).as_str())
    }

    /// Resolve a fact's value. `None` covers both unknown and unresolved facts.
    pub fn value(&self, name: &str) -> Option<String> {
        self.lookup(name)?.resolve()
    }

    /// Lazily resolve every fact, yielding only those with a value.
    ///
    /// The set of facts is snapshotted when called; calling again starts over
    /// and reuses cached values.
    pub fn each(&self) -> impl Iterator<Item = (String, String)> + use<> {
        self.snapshot()
            .into_iter()
            .filter_map(|fact| fact.resolve().map(|value| (fact.name().to_string(), value)))
    }

    /// All resolved facts as a string-keyed map. Unresolved facts are omitted.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.each().collect()
    }

    /// Names of every registered fact, including unresolved ones.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().map(|k| k.to_string()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Remove a single fact, returning it if it was registered.
    pub fn remove(&self, name: &str) -> Option<Arc<Fact>> {
        self.facts
            .write()
            .expect("facts lock poisoned")
            .remove(FactName::new(name).as_str())
    }

    /// Invalidate every cached value. Facts stay registered.
    pub fn flush(&self) {
        let facts = self.facts.write().expect("facts lock poisoned");
        for fact in facts.values() {
            fact.invalidate();
        }
    }

    /// Remove every fact.
    pub fn reset(&self) {
        self.facts.write().expect("facts lock poisoned").clear();
    }

    /// Flush then reset: no cached state or registration survives.
    pub fn clear(&self) {
        self.flush();
        self.reset();
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<FactName, Arc<Fact>>> {
        self.facts.read().expect("facts lock poisoned")
    }

    fn snapshot(&self) -> Vec<Arc<Fact>> {
        self.read().values().cloned().collect()
    }
}

impl Default for FactRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FactRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactRegistry")
            .field("count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn counted(registry: &FactRegistry, name: &str, value: &str) -> Arc<AtomicUsize> {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let value = value.to_string();
        registry.add(name, ResolutionOptions::new(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Some(value.clone())
        });
        calls
    }

    #[test]
    fn case_insensitive_lookup() {
        let reg = FactRegistry::new();
        reg.add_value("Foo", "bar");

        assert_eq!(reg.value("foo").as_deref(), Some("bar"));
        assert_eq!(reg.value("FOO").as_deref(), Some("bar"));
        assert_eq!(reg.value("fOo").as_deref(), Some("bar"));
        assert_eq!(reg.list(), vec!["foo"]);
    }

    #[test]
    fn lookup_does_not_create() {
        let reg = FactRegistry::new();
        assert!(reg.lookup("nonexistent").is_none());
        assert!(reg.value("nonexistent").is_none());
        assert!(reg.list().is_empty());
        assert!(!reg.contains("nonexistent"));
    }

    #[test]
    fn duplicate_add_merges() {
        let reg = FactRegistry::new();
        let a = reg.add("x", ResolutionOptions::new(), || None);
        let b = reg.add("X", ResolutionOptions::new(), Constant("second".into()));

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(reg.len(), 1);
        assert_eq!(b.resolution_count(), 2);
        assert_eq!(reg.value("x").as_deref(), Some("second"));
    }

    #[test]
    fn declare_without_resolution() {
        let reg = FactRegistry::new();
        let fact = reg.declare("placeholder");
        assert_eq!(fact.resolution_count(), 0);
        assert!(reg.contains("PLACEHOLDER"));
        assert_eq!(reg.value("placeholder"), None);
    }

    #[test]
    fn cached_until_flush() {
        let reg = FactRegistry::new();
        let calls = counted(&reg, "x", "v");

        assert_eq!(reg.value("x").as_deref(), Some("v"));
        assert_eq!(reg.value("x").as_deref(), Some("v"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        reg.flush();
        assert_eq!(reg.list(), vec!["x"]);
        assert_eq!(reg.value("x").as_deref(), Some("v"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn reset_and_clear_remove_everything() {
        let reg = FactRegistry::new();
        reg.add_value("a", "1");
        reg.add_value("b", "2");

        reg.reset();
        assert!(reg.is_empty());
        assert!(reg.lookup("a").is_none());

        reg.add_value("c", "3");
        reg.clear();
        assert!(reg.list().is_empty());

        // Idempotent on an empty registry.
        reg.flush();
        reg.reset();
        reg.clear();
        assert!(reg.is_empty());
    }

    #[test]
    fn each_and_to_map_skip_absent() {
        let reg = FactRegistry::new();
        reg.add_value("present", "yes");
        reg.add("absent", ResolutionOptions::new(), || None);

        let map = reg.to_map();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("present").map(String::as_str), Some("yes"));

        let pairs: Vec<_> = reg.each().collect();
        assert_eq!(pairs, vec![("present".to_string(), "yes".to_string())]);
        assert_eq!(reg.list(), vec!["absent", "present"]);
    }

    #[test]
    fn each_is_restartable_from_cache() {
        let reg = FactRegistry::new();
        let calls = counted(&reg, "x", "v");

        assert_eq!(reg.each().count(), 1);
        assert_eq!(reg.each().count(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn resolver_may_query_registry() {
        let reg = Arc::new(FactRegistry::new());
        reg.add_value("kernel", "Linux");
        let inner = Arc::clone(&reg);
        reg.add("kernel_upper", ResolutionOptions::new(), move || {
            inner.value("kernel").map(|k| k.to_uppercase())
        });

        assert_eq!(reg.value("kernel_upper").as_deref(), Some("LINUX"));
    }

    #[test]
    fn remove_normalizes() {
        let reg = FactRegistry::new();
        reg.add_value("Gone", "soon");
        assert!(reg.remove("GONE").is_some());
        assert!(reg.remove("gone").is_none());
        assert!(reg.is_empty());
    }
}
