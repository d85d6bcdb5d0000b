//! Accessor-style dispatch over a [`FactRegistry`].
//!
//! Fact names act as accessors through two fixed entry points:
//!
//! - [`FactAccessor::get`]: the fact's value, `Ok(None)` if it resolves to
//!   nothing, `Err(UnknownFact)` if it was never registered.
//! - [`FactAccessor::is`]: boolean query, `is("osfamily?", ["linux"])`.
//!   A trailing `?` on the name is optional and stripped.

use crate::error::{FactError, FactResult};
use crate::registry::FactRegistry;

/// Suffix marking the boolean query form of an accessor name.
pub const QUERY_MARKER: char = '?';

/// Borrowing front-end that turns fact names into accessors.
#[derive(Debug, Clone, Copy)]
pub struct FactAccessor<'a> {
    registry: &'a FactRegistry,
}

impl<'a> FactAccessor<'a> {
    pub fn new(registry: &'a FactRegistry) -> Self {
        Self { registry }
    }

    /// Value of a fact, distinguishing unknown names from absent values.
    pub fn get(&self, name: &str) -> FactResult<Option<String>> {
        let fact = self
            .registry
            .lookup(name)
            .ok_or_else(|| FactError::UnknownFact { name: name.into() })?;
        Ok(fact.resolve())
    }

    /// Whether the fact's value equals any candidate, ignoring case.
    ///
    /// A fact resolving to nothing matches no candidate.
    pub fn is<I, S>(&self, query: &str, candidates: I) -> FactResult<bool>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let name = base_name(query);
        let Some(value) = self.get(name)? else {
            return Ok(false);
        };
        let value = value.to_lowercase();
        Ok(candidates
            .into_iter()
            .any(|candidate| candidate.as_ref().to_lowercase() == value))
    }
}

/// Strip a single trailing query marker.
pub fn base_name(query: &str) -> &str {
    query.strip_suffix(QUERY_MARKER).unwrap_or(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fact::ResolutionOptions;

    fn registry() -> FactRegistry {
        let reg = FactRegistry::new();
        reg.add_value("osfamily", "Linux");
        reg.add("virtual", ResolutionOptions::new(), || None);
        reg
    }

    #[test]
    fn get_distinguishes_unknown_from_absent() {
        let reg = registry();
        let facts = FactAccessor::new(&reg);

        assert_eq!(facts.get("OSFamily").unwrap().as_deref(), Some("Linux"));
        assert_eq!(facts.get("virtual").unwrap(), None);

        let err = facts.get("nonexistent").unwrap_err();
        assert!(err.is_unknown_fact());
        assert!(format!("{err}").contains("nonexistent"));
        assert!(!reg.contains("nonexistent"));
    }

    #[test]
    fn boolean_query_is_case_insensitive() {
        let reg = registry();
        let facts = FactAccessor::new(&reg);

        assert!(facts.is("osfamily?", ["linux"]).unwrap());
        assert!(facts.is("OSFAMILY?", ["LINUX"]).unwrap());
        assert!(facts.is("osfamily", ["windows", "Linux"]).unwrap());
        assert!(!facts.is("osfamily?", ["windows"]).unwrap());
        assert!(!facts.is("osfamily?", Vec::<String>::new()).unwrap());
    }

    #[test]
    fn boolean_query_on_absent_value_is_false() {
        let reg = registry();
        let facts = FactAccessor::new(&reg);
        assert!(!facts.is("virtual?", ["kvm"]).unwrap());
    }

    #[test]
    fn boolean_query_on_unknown_fact_errors() {
        let reg = registry();
        let facts = FactAccessor::new(&reg);
        assert!(facts.is("bogus?", ["x"]).unwrap_err().is_unknown_fact());
    }

    #[test]
    fn base_name_strips_one_marker() {
        assert_eq!(base_name("kernel?"), "kernel");
        assert_eq!(base_name("kernel"), "kernel");
        assert_eq!(base_name("kernel??"), "kernel?");
    }
}
