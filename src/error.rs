//! Diagnostic error types for hostfacts.
//!
//! Only [`FactError::UnknownFact`] is ever surfaced to callers of the
//! accessor API. The remaining variants describe load-time problems; the
//! loader records them in its report and logs them instead of propagating.

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum FactError {
    #[error("could not find fact '{name}'")]
    #[diagnostic(
        code(hostfacts::unknown_fact),
        help(
            "No fact is registered under this name. List the available facts \
             with `hostfacts --names`, or add a definition file to one of the \
             fact directories (see the `factpath` fact)."
        )
    )]
    UnknownFact { name: String },

    #[error("failed to read {path}")]
    #[diagnostic(code(hostfacts::io), help("Ensure the path exists and is readable."))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse fact definitions in {path}: {message}")]
    #[diagnostic(
        code(hostfacts::definition::parse),
        help("Fact definition files are TOML documents made of `[[fact]]` tables.")
    )]
    Parse { path: String, message: String },

    #[error("invalid fact definition in {path}: {message}")]
    #[diagnostic(
        code(hostfacts::definition::invalid),
        help(
            "Every `[[fact]]` entry needs a non-empty `name` and exactly one of \
             `value`, `command` or `file`."
        )
    )]
    InvalidDefinition { path: String, message: String },

    #[error("failed to parse loader configuration {path}: {message}")]
    #[diagnostic(
        code(hostfacts::config),
        help("Check the TOML syntax of the configuration file.")
    )]
    Config { path: String, message: String },
}

pub type FactResult<T> = std::result::Result<T, FactError>;

impl FactError {
    /// Whether this is the accessor-level "no such fact" failure.
    pub fn is_unknown_fact(&self) -> bool {
        matches!(self, Self::UnknownFact { .. })
    }
}
