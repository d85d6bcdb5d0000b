//! Facts and their resolution mechanisms.
//!
//! A [`Fact`] owns an ordered list of [`Resolution`]s and a memoized value.
//! Resolving tries each resolution in insertion order and caches the first
//! value produced (or the absence of one) until [`Fact::invalidate`].

use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::debug::debug;
use crate::name::FactName;

/// Option key identifying where a resolution came from.
pub const SOURCE_OPTION: &str = "source";

// ---------------------------------------------------------------------------
// Resolvers
// ---------------------------------------------------------------------------

/// A single strategy for producing a fact's value.
///
/// Returning `None` means "not applicable on this host"; it is never an error.
pub trait Resolver: Send + Sync {
    fn resolve(&self) -> Option<String>;
}

impl<F> Resolver for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn resolve(&self) -> Option<String> {
        self()
    }
}

/// Always yields the same value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constant(pub String);

impl Resolver for Constant {
    fn resolve(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Runs a program directly (no shell) and yields its trimmed stdout.
#[derive(Debug, Clone)]
pub struct CommandResolver {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl CommandResolver {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// Build from an argv-style list; `None` if the list is empty.
    pub fn from_argv(argv: &[String], timeout: Duration) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone(), args.to_vec(), timeout))
    }
}

impl Resolver for CommandResolver {
    fn resolve(&self) -> Option<String> {
        let mut child = match Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                debug(format!("could not run {}: {e}", self.program));
                return None;
            }
        };

        // Drain stdout concurrently so a chatty child never blocks on a full pipe.
        let mut pipe = child.stdout.take()?;
        let reader = std::thread::spawn(move || {
            let mut buf = Vec::new();
            pipe.read_to_end(&mut buf).map(|_| buf)
        });

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        tracing::warn!(
                            program = self.program.as_str(),
                            timeout_secs = self.timeout.as_secs(),
                            "fact command timed out"
                        );
                        return None;
                    }
                    std::thread::sleep(Duration::from_millis(10));
                }
                Err(e) => {
                    let _ = child.kill();
                    debug(format!("failed to wait on {}: {e}", self.program));
                    return None;
                }
            }
        };

        if !status.success() {
            debug(format!("{} exited with {status}", self.program));
            return None;
        }

        let stdout = match reader.join() {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(e)) => {
                debug(format!("could not read output of {}: {e}", self.program));
                return None;
            }
            Err(_) => return None,
        };
        non_empty(String::from_utf8_lossy(&stdout).into_owned())
    }
}

/// Yields the trimmed contents of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileResolver {
    pub path: PathBuf,
}

impl Resolver for FileResolver {
    fn resolve(&self) -> Option<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => non_empty(content),
            Err(e) => {
                debug(format!("could not read {}: {e}", self.path.display()));
                None
            }
        }
    }
}

fn non_empty(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// ---------------------------------------------------------------------------
// Resolutions
// ---------------------------------------------------------------------------

/// Opaque options attached to a resolution.
///
/// The `source` key is the only one interpreted here: resolutions sharing a
/// source replace each other instead of accumulating.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolutionOptions(BTreeMap<String, String>);

impl ResolutionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Shorthand for `with("source", ..)`.
    pub fn sourced(source: impl Into<String>) -> Self {
        Self::new().with(SOURCE_OPTION, source)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn source(&self) -> Option<&str> {
        self.get(SOURCE_OPTION)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl From<BTreeMap<String, String>> for ResolutionOptions {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

/// One way of resolving a fact: options plus the resolver body.
#[derive(Clone)]
pub struct Resolution {
    options: ResolutionOptions,
    resolver: Arc<dyn Resolver>,
}

impl Resolution {
    pub fn new(options: ResolutionOptions, resolver: impl Resolver + 'static) -> Self {
        Self {
            options,
            resolver: Arc::new(resolver),
        }
    }

    pub fn options(&self) -> &ResolutionOptions {
        &self.options
    }

    pub fn resolve(&self) -> Option<String> {
        self.resolver.resolve()
    }
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolution")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Fact
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct CacheSlot {
    /// Bumped on every invalidation so a resolve racing a flush never
    /// stores a stale value.
    epoch: u64,
    value: Option<Option<String>>,
}

/// A named, lazily resolved, cacheable piece of host information.
pub struct Fact {
    name: FactName,
    resolutions: RwLock<Vec<Resolution>>,
    cache: RwLock<CacheSlot>,
}

impl Fact {
    pub fn new(name: impl Into<FactName>) -> Self {
        Self {
            name: name.into(),
            resolutions: RwLock::new(Vec::new()),
            cache: RwLock::new(CacheSlot::default()),
        }
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Append a resolution, or replace the one sharing its `source` option.
    ///
    /// Either way the cached value is dropped, since the resolution set changed.
    pub fn add_resolution(&self, options: ResolutionOptions, resolver: impl Resolver + 'static) {
        let resolution = Resolution::new(options, resolver);
        {
            let mut resolutions = self.resolutions.write().expect("resolutions lock poisoned");
            let existing = resolution.options().source().and_then(|source| {
                resolutions
                    .iter()
                    .position(|r| r.options().source() == Some(source))
            });
            match existing {
                Some(index) => resolutions[index] = resolution,
                None => resolutions.push(resolution),
            }
        }
        self.invalidate();
    }

    pub fn resolution_count(&self) -> usize {
        self.resolutions.read().expect("resolutions lock poisoned").len()
    }

    /// Snapshot of the resolutions in priority order.
    pub fn resolutions(&self) -> Vec<Resolution> {
        self.resolutions.read().expect("resolutions lock poisoned").clone()
    }

    /// Return the cached value, or run the resolutions and cache the result.
    ///
    /// No lock is held while resolvers run, so a resolver may consult other
    /// facts in the same registry.
    pub fn resolve(&self) -> Option<String> {
        let epoch = {
            let slot = self.cache.read().expect("fact cache lock poisoned");
            if let Some(value) = &slot.value {
                return value.clone();
            }
            slot.epoch
        };

        debug(format!("resolving fact {}", self.name));
        let value = self.resolutions().iter().find_map(Resolution::resolve);

        let mut slot = self.cache.write().expect("fact cache lock poisoned");
        if slot.epoch == epoch && slot.value.is_none() {
            slot.value = Some(value.clone());
        }
        value
    }

    /// Drop the cached value; the next [`resolve`](Self::resolve) runs the
    /// resolutions again.
    pub fn invalidate(&self) {
        let mut slot = self.cache.write().expect("fact cache lock poisoned");
        slot.epoch = slot.epoch.wrapping_add(1);
        slot.value = None;
    }

    pub fn is_cached(&self) -> bool {
        self.cache.read().expect("fact cache lock poisoned").value.is_some()
    }
}

impl fmt::Debug for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fact")
            .field("name", &self.name)
            .field("resolutions", &self.resolution_count())
            .field("cached", &self.is_cached())
            .finish()
    }
}
