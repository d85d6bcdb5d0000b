//! XDG-style path resolution for hostfacts.
//!
//! Fact definition files live in a `hostfacts/` subdirectory of each search
//! root. The search roots follow the XDG Base Directory Specification:
//! `$XDG_DATA_HOME`, then every entry of `$XDG_DATA_DIRS`, then
//! `$XDG_CONFIG_HOME`.

use std::path::PathBuf;

/// Application directory name under each XDG root.
pub const APP_DIR: &str = "hostfacts";

const DEFAULT_DATA_DIRS: &str = "/usr/local/share:/usr/share";

/// Resolved directories for hostfacts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FactPaths {
    /// `$XDG_CONFIG_HOME/hostfacts/` (absent without `HOME` or `XDG_CONFIG_HOME`)
    pub config_dir: Option<PathBuf>,
    /// Library roots scanned for the `hostfacts/` subdirectory, in order.
    pub search_roots: Vec<PathBuf>,
}

impl FactPaths {
    /// Resolve directories from the process environment.
    pub fn resolve() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve directories through an arbitrary variable lookup.
    ///
    /// Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let home = var("HOME").map(PathBuf::from);

        let data_home = var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .or_else(|| home.as_ref().map(|h| h.join(".local/share")));
        let config_home = var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| home.as_ref().map(|h| h.join(".config")));
        let data_dirs = var("XDG_DATA_DIRS").unwrap_or_else(|| DEFAULT_DATA_DIRS.into());

        let mut search_roots: Vec<PathBuf> = data_home.into_iter().collect();
        search_roots.extend(
            data_dirs
                .split(':')
                .filter(|d| !d.is_empty())
                .map(PathBuf::from),
        );
        search_roots.extend(config_home.clone());
        search_roots.dedup();

        Self {
            config_dir: config_home.map(|c| c.join(APP_DIR)),
            search_roots,
        }
    }

    /// Path to the loader configuration file.
    pub fn config_file(&self) -> Option<PathBuf> {
        self.config_dir.as_ref().map(|d| d.join("config.toml"))
    }
}
