//! Built-in facts registered before anything discovered on disk.

use std::path::PathBuf;
use std::time::Duration;

use crate::fact::{CommandResolver, Constant, ResolutionOptions, Resolver};
use crate::registry::FactRegistry;

/// Source tag of every built-in resolution.
pub const BUILTIN_SOURCE: &str = "builtin";

/// Compiler version captured at build time; empty when unknown.
const RUSTC_VERSION: &str = env!("HOSTFACTS_RUSTC_VERSION");

/// Library root of the toolchain that built the crate; empty when unknown.
const RUSTC_SYSROOT: &str = env!("HOSTFACTS_RUSTC_SYSROOT");

/// Register the built-in facts. Returns how many were registered.
///
/// `fact_dirs` are the candidate definition directories, reported through
/// the `factpath` fact.
pub fn register(registry: &FactRegistry, fact_dirs: &[PathBuf], command_timeout: Duration) -> usize {
    let mut count = 0;

    add(registry, &mut count, "hostfactsversion", Constant(crate::VERSION.into()));
    add(registry, &mut count, "rustversion", || {
        (!RUSTC_VERSION.is_empty()).then(|| RUSTC_VERSION.to_string())
    });
    add(registry, &mut count, "rustsysroot", || {
        (!RUSTC_SYSROOT.is_empty()).then(|| RUSTC_SYSROOT.to_string())
    });

    // Companion tool: absent when not installed.
    add(
        registry,
        &mut count,
        "puppetversion",
        CommandResolver::new("puppet", vec!["--version".into()], command_timeout),
    );

    let factpath = std::env::join_paths(fact_dirs)
        .ok()
        .and_then(|joined| joined.into_string().ok())
        .filter(|joined| !joined.is_empty());
    add(registry, &mut count, "factpath", move || factpath.clone());

    add(registry, &mut count, "kernel", Constant(std::env::consts::OS.into()));
    add(registry, &mut count, "hardwaremodel", Constant(std::env::consts::ARCH.into()));
    add(registry, &mut count, "family", Constant(std::env::consts::FAMILY.into()));

    count
}

fn add(registry: &FactRegistry, count: &mut usize, name: &str, resolver: impl Resolver + 'static) {
    registry.add(name, ResolutionOptions::sourced(BUILTIN_SOURCE), resolver);
    *count += 1;
}
