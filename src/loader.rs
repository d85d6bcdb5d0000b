//! Fact loader: populates a [`FactRegistry`] from three ordered sources.
//!
//! 1. Built-in facts ([`crate::builtins`]).
//! 2. Definition files found directly inside each candidate directory:
//!    `<root>/hostfacts/` for every search root, then configured extra
//!    directories, then the colon-separated `HOSTFACTS_LIB` entries.
//! 3. Environment variables named `HOSTFACTS_<suffix>` (prefix matched
//!    case-insensitively, underscore optional), each becoming a constant
//!    fact named `<suffix>`.
//!
//! Loading is re-entrant: every resolution carries a `source` tag, so
//! loading again replaces instead of duplicating. A failing definition file
//! is logged and recorded in the [`LoadReport`]; it never aborts the load.

use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::builtins;
use crate::debug::debug;
use crate::definition::{DEFINITION_EXTENSION, load_definition_file};
use crate::error::{FactError, FactResult};
use crate::fact::{Constant, ResolutionOptions};
use crate::paths::{APP_DIR, FactPaths};
use crate::registry::FactRegistry;

/// Loader settings, optionally read from `$XDG_CONFIG_HOME/hostfacts/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderConfig {
    /// Library roots scanned for `subdir`.
    pub search_roots: Vec<PathBuf>,
    /// Conventional subdirectory holding definition files.
    pub subdir: String,
    /// Extra definition directories, scanned after the search roots.
    pub extra_dirs: Vec<PathBuf>,
    /// Colon-separated environment variable of further directories.
    pub lib_var: String,
    /// Prefix of environment variables turned into facts.
    pub env_prefix: String,
    /// Register built-in facts.
    pub builtins: bool,
    /// Register environment-derived facts.
    pub env_facts: bool,
    /// Default timeout for command resolutions.
    pub command_timeout_secs: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            search_roots: FactPaths::resolve().search_roots,
            subdir: APP_DIR.into(),
            extra_dirs: Vec::new(),
            lib_var: "HOSTFACTS_LIB".into(),
            env_prefix: "HOSTFACTS".into(),
            builtins: true,
            env_facts: true,
            command_timeout_secs: 10,
        }
    }
}

impl LoaderConfig {
    /// Parse a TOML configuration file. Unset keys keep their defaults.
    pub fn from_file(path: &Path) -> FactResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| FactError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| FactError::Config {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Read the user's configuration file if there is one, else defaults.
    pub fn discover() -> FactResult<Self> {
        match FactPaths::resolve().config_file() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// A configuration that looks nowhere on disk: no search roots, no lib
    /// variable. Useful for embedding and tests.
    pub fn isolated() -> Self {
        Self {
            search_roots: Vec::new(),
            lib_var: String::new(),
            ..Self::default()
        }
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

/// A definition file (or directory) that could not be loaded.
#[derive(Debug)]
pub struct LoadFailure {
    pub path: PathBuf,
    pub error: FactError,
}

/// Outcome of one [`Loader::load`] run.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Built-in facts registered.
    pub builtins: usize,
    /// Candidate definition directories, in scan order.
    pub fact_dirs: Vec<PathBuf>,
    /// Definition files loaded successfully, in load order.
    pub files_loaded: Vec<PathBuf>,
    /// Facts registered from definition files.
    pub facts_from_files: usize,
    /// Facts registered from environment variables.
    pub env_facts: usize,
    pub failures: Vec<LoadFailure>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Populates a registry according to a [`LoaderConfig`].
#[derive(Debug, Clone)]
pub struct Loader {
    config: LoaderConfig,
    /// Environment snapshot; `None` reads the process environment.
    env: Option<Vec<(String, String)>>,
}

impl Loader {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config, env: None }
    }

    /// Use a fixed set of environment variables instead of the process
    /// environment.
    pub fn with_env<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.env = Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Candidate definition directories, in scan order, without duplicates.
    pub fn fact_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = Vec::new();
        let mut push = |dir: PathBuf| {
            if !dirs.contains(&dir) {
                dirs.push(dir);
            }
        };

        for root in &self.config.search_roots {
            let dir = root.join(&self.config.subdir);
            if dir.is_dir() {
                push(dir);
            }
        }
        for dir in &self.config.extra_dirs {
            push(dir.clone());
        }
        if let Some(lib) = self.var(&self.config.lib_var) {
            for dir in lib.split(':').filter(|d| !d.is_empty()) {
                push(PathBuf::from(dir));
            }
        }
        dirs
    }

    /// Run all three sources against `registry`. Never fails; problems are
    /// logged and collected in the report.
    pub fn load(&self, registry: &FactRegistry) -> LoadReport {
        let mut report = LoadReport {
            fact_dirs: self.fact_dirs(),
            ..LoadReport::default()
        };
        let timeout = self.config.command_timeout();

        if self.config.builtins {
            report.builtins = builtins::register(registry, &report.fact_dirs, timeout);
        }

        for dir in report.fact_dirs.clone() {
            self.load_dir(&dir, registry, &mut report);
        }

        if self.config.env_facts {
            report.env_facts = self.load_env(registry);
        }

        debug(format!(
            "loaded {} builtin, {} file and {} environment facts ({} failures)",
            report.builtins,
            report.facts_from_files,
            report.env_facts,
            report.failures.len()
        ));
        report
    }

    fn load_dir(&self, dir: &Path, registry: &FactRegistry, report: &mut LoadReport) {
        let files = match definition_files(dir) {
            Ok(files) => files,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
            Err(e) => {
                tracing::warn!(path = %dir.display(), error = %e, "could not read fact directory");
                report.failures.push(LoadFailure {
                    path: dir.to_path_buf(),
                    error: FactError::Io {
                        path: dir.display().to_string(),
                        source: e,
                    },
                });
                return;
            }
        };

        debug(format!("loading facts from {}", dir.display()));
        for file in files {
            match load_definition_file(&file, registry, self.config.command_timeout()) {
                Ok(count) => {
                    report.facts_from_files += count;
                    report.files_loaded.push(file);
                }
                Err(error) => {
                    tracing::warn!(
                        path = %file.display(),
                        error = %error,
                        "could not load fact definitions"
                    );
                    report.failures.push(LoadFailure { path: file, error });
                }
            }
        }
    }

    fn load_env(&self, registry: &FactRegistry) -> usize {
        let pattern = match env_fact_pattern(&self.config.env_prefix) {
            Ok(pattern) => pattern,
            Err(e) => {
                tracing::warn!(prefix = self.config.env_prefix.as_str(), error = %e, "invalid environment fact prefix");
                return 0;
            }
        };

        let mut count = 0;
        for (name, value) in self.vars() {
            let Some(suffix) = pattern.captures(&name).and_then(|c| c.get(1)) else {
                continue;
            };
            registry.add(
                suffix.as_str(),
                ResolutionOptions::sourced(format!("env:{name}")),
                Constant(value),
            );
            count += 1;
        }
        count
    }

    fn var(&self, key: &str) -> Option<String> {
        if key.is_empty() {
            return None;
        }
        match &self.env {
            Some(vars) => vars.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone()),
            None => std::env::var(key).ok(),
        }
    }

    /// Environment snapshot sorted by name. Non-UTF-8 entries are skipped.
    fn vars(&self) -> Vec<(String, String)> {
        let mut vars: Vec<(String, String)> = match &self.env {
            Some(vars) => vars.clone(),
            None => std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
        };
        vars.sort();
        vars
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new(LoaderConfig::default())
    }
}

/// `^<prefix>_?(\w+)$`, case-insensitive.
pub fn env_fact_pattern(prefix: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(r"(?i)^{}_?(\w+)$", regex::escape(prefix)))
}

/// Definition files directly inside `dir` (non-recursive), sorted by name.
pub fn definition_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(DEFINITION_EXTENSION))
        })
        .collect();
    files.sort();
    Ok(files)
}
