//! Fact name normalization.
//!
//! Every registry boundary (add, lookup, remove) goes through [`FactName`],
//! so `"Foo"`, `"foo"` and `"FOO"` always address the same fact.

use std::borrow::Borrow;
use std::fmt;

/// Canonical (lower-cased) form of a fact name.
pub fn normalize(name: &str) -> String {
    name.to_lowercase()
}

/// A normalized fact name. Only constructible through [`normalize`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FactName(String);

impl FactName {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(normalize(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for FactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FactName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for FactName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FactName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for FactName {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<&String> for FactName {
    fn from(name: &String) -> Self {
        Self::new(name)
    }
}
