//! Fact definition files.
//!
//! A definition file is a TOML document of `[[fact]]` tables. Loading one has
//! exactly one kind of effect: registry `add` calls. The whole file is parsed
//! and validated before anything is registered, so a broken file leaves the
//! registry untouched.
//!
//! ```toml
//! [[fact]]
//! name = "datacenter"
//! value = "eu-west-1"
//!
//! [[fact]]
//! name = "kernelrelease"
//! command = ["uname", "-r"]
//! timeout_secs = 5
//!
//! [[fact]]
//! name = "machineid"
//! file = "/etc/machine-id"
//!
//! [fact.options]
//! owner = "ops"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{FactError, FactResult};
use crate::fact::{CommandResolver, Constant, FileResolver, ResolutionOptions, SOURCE_OPTION};
use crate::registry::FactRegistry;

/// File extension of definition units.
pub const DEFINITION_EXTENSION: &str = "toml";

// ── TOML deserialization helpers ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DefinitionToml {
    #[serde(default)]
    fact: Vec<FactEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FactEntry {
    name: String,
    #[serde(default)]
    value: Option<toml::Value>,
    #[serde(default)]
    command: Option<Vec<String>>,
    #[serde(default)]
    file: Option<PathBuf>,
    #[serde(default)]
    timeout_secs: Option<u64>,
    #[serde(default)]
    options: BTreeMap<String, String>,
}

// ── Validated definitions ───────────────────────────────────────────────

/// How a defined fact resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefinitionKind {
    Value(String),
    Command { argv: Vec<String>, timeout: Duration },
    File(PathBuf),
}

/// One validated `[[fact]]` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactDefinition {
    pub name: String,
    pub kind: DefinitionKind,
    pub options: BTreeMap<String, String>,
}

impl FactDefinition {
    /// Register this definition, tagging it with `source`.
    pub fn register(&self, registry: &FactRegistry, source: &str) {
        let options =
            ResolutionOptions::from(self.options.clone()).with(SOURCE_OPTION, source);
        match &self.kind {
            DefinitionKind::Value(value) => {
                registry.add(&self.name, options, Constant(value.clone()));
            }
            DefinitionKind::Command { argv, timeout } => {
                // Validation guarantees a non-empty argv.
                if let Some(resolver) = CommandResolver::from_argv(argv, *timeout) {
                    registry.add(&self.name, options, resolver);
                }
            }
            DefinitionKind::File(path) => {
                registry.add(&self.name, options, FileResolver { path: path.clone() });
            }
        }
    }
}

/// Parse and validate definitions. `path` is used for diagnostics and to
/// anchor relative `file` entries.
pub fn parse_definitions(
    content: &str,
    path: &Path,
    default_timeout: Duration,
) -> FactResult<Vec<FactDefinition>> {
    let display = path.display().to_string();
    let parsed: DefinitionToml = toml::from_str(content).map_err(|e| FactError::Parse {
        path: display.clone(),
        message: e.to_string(),
    })?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    parsed
        .fact
        .into_iter()
        .enumerate()
        .map(|(index, entry)| validate(entry, index, base, default_timeout, &display))
        .collect()
}

fn validate(
    entry: FactEntry,
    index: usize,
    base: &Path,
    default_timeout: Duration,
    display: &str,
) -> FactResult<FactDefinition> {
    let invalid = |message: String| FactError::InvalidDefinition {
        path: display.to_string(),
        message,
    };

    let name = entry.name.trim().to_string();
    if name.is_empty() {
        return Err(invalid(format!("fact #{index} has an empty name")));
    }

    let kind = match (entry.value, entry.command, entry.file) {
        (Some(value), None, None) => DefinitionKind::Value(
            scalar_to_string(value)
                .ok_or_else(|| invalid(format!("fact '{name}': value must be a scalar")))?,
        ),
        (None, Some(argv), None) => {
            if argv.first().is_none_or(|program| program.is_empty()) {
                return Err(invalid(format!("fact '{name}': command is empty")));
            }
            let timeout = entry
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(default_timeout);
            DefinitionKind::Command { argv, timeout }
        }
        (None, None, Some(file)) => DefinitionKind::File(base.join(file)),
        (None, None, None) => {
            return Err(invalid(format!(
                "fact '{name}' needs one of `value`, `command` or `file`"
            )));
        }
        _ => {
            return Err(invalid(format!(
                "fact '{name}' sets more than one of `value`, `command` and `file`"
            )));
        }
    };

    Ok(FactDefinition {
        name,
        kind,
        options: entry.options,
    })
}

fn scalar_to_string(value: toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Float(f) => Some(f.to_string()),
        toml::Value::Boolean(b) => Some(b.to_string()),
        toml::Value::Datetime(d) => Some(d.to_string()),
        toml::Value::Array(_) | toml::Value::Table(_) => None,
    }
}

/// Read, validate and register one definition file.
///
/// Returns the number of facts registered. On error nothing is registered.
pub fn load_definition_file(
    path: &Path,
    registry: &FactRegistry,
    default_timeout: Duration,
) -> FactResult<usize> {
    let content = std::fs::read_to_string(path).map_err(|e| FactError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let definitions = parse_definitions(&content, path, default_timeout)?;

    for (index, definition) in definitions.iter().enumerate() {
        definition.register(registry, &format!("{}#{index}", path.display()));
    }

    tracing::debug!(
        path = %path.display(),
        facts = definitions.len(),
        "loaded fact definitions"
    );
    Ok(definitions.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(3);

    fn parse(content: &str) -> FactResult<Vec<FactDefinition>> {
        parse_definitions(content, Path::new("/etc/hostfacts/site.toml"), TIMEOUT)
    }

    #[test]
    fn parses_all_kinds() {
        let defs = parse(
            r#"
[[fact]]
name = "Datacenter"
value = "eu-west-1"

[[fact]]
name = "cores"
value = 8

[[fact]]
name = "kernelrelease"
command = ["uname", "-r"]
timeout_secs = 1

[[fact]]
name = "machineid"
file = "machine-id"

[fact.options]
owner = "ops"
"#,
        )
        .unwrap();

        assert_eq!(defs.len(), 4);
        assert_eq!(defs[0].kind, DefinitionKind::Value("eu-west-1".into()));
        assert_eq!(defs[1].kind, DefinitionKind::Value("8".into()));
        assert_eq!(
            defs[2].kind,
            DefinitionKind::Command {
                argv: vec!["uname".into(), "-r".into()],
                timeout: Duration::from_secs(1),
            }
        );
        assert_eq!(
            defs[3].kind,
            DefinitionKind::File(PathBuf::from("/etc/hostfacts/machine-id"))
        );
        assert_eq!(defs[3].options.get("owner").map(String::as_str), Some("ops"));
    }

    #[test]
    fn empty_document_defines_nothing() {
        assert!(parse("").unwrap().is_empty());
    }

    #[test]
    fn rejects_bad_entries() {
        let missing_kind = parse("[[fact]]\nname = \"x\"\n").unwrap_err();
        assert!(matches!(missing_kind, FactError::InvalidDefinition { .. }));

        let two_kinds = parse("[[fact]]\nname = \"x\"\nvalue = \"a\"\nfile = \"b\"\n").unwrap_err();
        assert!(format!("{two_kinds}").contains("more than one"));

        let empty_name = parse("[[fact]]\nname = \" \"\nvalue = \"a\"\n").unwrap_err();
        assert!(format!("{empty_name}").contains("empty name"));

        let empty_command = parse("[[fact]]\nname = \"x\"\ncommand = []\n").unwrap_err();
        assert!(format!("{empty_command}").contains("command is empty"));

        let table_value = parse("[[fact]]\nname = \"x\"\nvalue = { a = 1 }\n").unwrap_err();
        assert!(format!("{table_value}").contains("scalar"));
    }

    #[test]
    fn syntax_errors_are_parse_errors() {
        let err = parse("[[fact]\nname = ").unwrap_err();
        assert!(matches!(err, FactError::Parse { .. }));

        let unknown = parse("[[fact]]\nname = \"x\"\nvalue = \"y\"\nsetcode = 1\n").unwrap_err();
        assert!(matches!(unknown, FactError::Parse { .. }));
    }

    #[test]
    fn invalid_file_registers_nothing() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(
            &path,
            "[[fact]]\nname = \"good\"\nvalue = \"1\"\n\n[[fact]]\nname = \"bad\"\n",
        )
        .unwrap();

        let reg = FactRegistry::new();
        assert!(load_definition_file(&path, &reg, TIMEOUT).is_err());
        assert!(reg.is_empty());
    }

    #[test]
    fn reloading_a_file_does_not_stack_resolutions() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("site.toml");
        std::fs::write(&path, "[[fact]]\nname = \"role\"\nvalue = \"web\"\n").unwrap();

        let reg = FactRegistry::new();
        assert_eq!(load_definition_file(&path, &reg, TIMEOUT).unwrap(), 1);
        assert_eq!(load_definition_file(&path, &reg, TIMEOUT).unwrap(), 1);

        let fact = reg.lookup("role").unwrap();
        assert_eq!(fact.resolution_count(), 1);
        assert_eq!(fact.resolve().as_deref(), Some("web"));
        let source = fact.resolutions()[0].options().source().map(str::to_string);
        assert_eq!(source, Some(format!("{}#0", path.display())));
    }

    #[test]
    fn missing_file_is_io_error() {
        let reg = FactRegistry::new();
        let err = load_definition_file(Path::new("/nonexistent/x.toml"), &reg, TIMEOUT).unwrap_err();
        assert!(matches!(err, FactError::Io { .. }));
    }
}
