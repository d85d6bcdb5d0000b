// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # hostfacts
//!
//! A registry of named facts about the running machine, resolved lazily on
//! first access and cached until flushed.
//!
//! ## Architecture
//!
//! - **Facts** (`fact`): a name plus ordered resolutions; the first one that
//!   yields a value wins, and the result is memoized
//! - **Registry** (`registry`): case-insensitive name → fact map with
//!   create-or-augment registration, flush and reset
//! - **Dispatch** (`dispatch`): `get` / `is` accessors over the registry
//! - **Loader** (`loader`): built-ins, then TOML definition files on the
//!   search path, then `HOSTFACTS_*` environment variables
//!
//! ## Library usage
//!
//! ```no_run
//! use hostfacts::fact::ResolutionOptions;
//!
//! hostfacts::add("role", ResolutionOptions::new(), || Some("web".to_string()));
//! assert_eq!(hostfacts::get("ROLE").unwrap().as_deref(), Some("web"));
//! assert!(hostfacts::is("role?", ["WEB"]).unwrap());
//! ```
//!
//! The process-wide registry loads itself on first use. Embedders that want
//! full control can build their own [`FactRegistry`] and [`Loader`].

pub mod builtins;
pub mod debug;
pub mod definition;
pub mod dispatch;
pub mod error;
pub mod fact;
pub mod loader;
pub mod name;
pub mod paths;
pub mod registry;

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock, Once};

pub use debug::{DebugMode, set_debug};
pub use dispatch::FactAccessor;
pub use error::{FactError, FactResult};
pub use fact::{Fact, ResolutionOptions, Resolver};
pub use loader::{LoadReport, Loader, LoaderConfig};
pub use registry::FactRegistry;

/// Version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn version() -> &'static str {
    VERSION
}

// ---------------------------------------------------------------------------
// Process-wide registry
// ---------------------------------------------------------------------------

static REGISTRY: LazyLock<FactRegistry> = LazyLock::new(FactRegistry::new);
static INITIAL_LOAD: Once = Once::new();

/// The process-wide registry, loaded on first access.
pub fn registry() -> &'static FactRegistry {
    INITIAL_LOAD.call_once(|| {
        load_into(&REGISTRY);
    });
    &REGISTRY
}

/// Run the loader against the process-wide registry. Safe to call again:
/// re-loading replaces resolutions rather than duplicating them.
pub fn load_facts() -> LoadReport {
    let mut initial = None;
    INITIAL_LOAD.call_once(|| initial = Some(load_into(&REGISTRY)));
    initial.unwrap_or_else(|| load_into(&REGISTRY))
}

fn load_into(registry: &FactRegistry) -> LoadReport {
    let config = LoaderConfig::discover().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "ignoring unreadable loader configuration");
        LoaderConfig::default()
    });
    Loader::new(config).load(registry)
}

/// Add a resolution for `name`, creating the fact if needed.
pub fn add(name: &str, options: ResolutionOptions, resolver: impl Resolver + 'static) -> Arc<Fact> {
    registry().add(name, options, resolver)
}

/// Register `name` with no resolutions yet; it stays unresolved until one
/// is added.
pub fn declare(name: &str) -> Arc<Fact> {
    registry().declare(name)
}

/// The registered fact, if any. Never creates an entry.
pub fn lookup(name: &str) -> Option<Arc<Fact>> {
    registry().lookup(name)
}

/// Resolved value; `None` for unknown and unresolved facts alike.
pub fn value(name: &str) -> Option<String> {
    registry().value(name)
}

/// Resolved value; unknown names are [`FactError::UnknownFact`].
pub fn get(name: &str) -> FactResult<Option<String>> {
    FactAccessor::new(registry()).get(name)
}

/// Case-insensitive "does this fact equal any of these" query.
pub fn is<I, S>(query: &str, candidates: I) -> FactResult<bool>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    FactAccessor::new(registry()).is(query, candidates)
}

/// Every fact with a value, resolved lazily.
pub fn each() -> impl Iterator<Item = (String, String)> {
    registry().each()
}

pub fn to_map() -> BTreeMap<String, String> {
    registry().to_map()
}

/// All registered fact names, including unresolved facts.
pub fn list() -> Vec<String> {
    registry().list()
}

pub fn flush() {
    registry().flush();
}

pub fn reset() {
    registry().reset();
}

pub fn clear() {
    registry().clear();
}
