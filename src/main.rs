//! hostfacts CLI: print facts about this machine.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Parser;
use miette::{IntoDiagnostic, Result};

use hostfacts::{FactAccessor, FactRegistry, Loader, LoaderConfig};

#[derive(Parser)]
#[command(name = "hostfacts", version, about = "Print facts about this machine")]
struct Cli {
    /// Facts to print (all facts when omitted).
    names: Vec<String>,

    /// Print a JSON object instead of `name => value` lines.
    #[arg(long)]
    json: bool,

    /// List registered fact names, including facts without a value.
    #[arg(long = "names", conflicts_with = "names")]
    names_only: bool,

    /// Enable debug output.
    #[arg(long)]
    debug: bool,

    /// Ignore HOSTFACTS_* environment variables.
    #[arg(long)]
    no_env: bool,

    /// Additional directory of fact definition files (repeatable).
    #[arg(long = "fact-dir", value_name = "DIR")]
    fact_dirs: Vec<PathBuf>,

    /// Loader configuration file (default: $XDG_CONFIG_HOME/hostfacts/config.toml).
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    let cli = Cli::parse();

    let default_filter = if cli.debug { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();
    hostfacts::set_debug(cli.debug);

    let mut config = match &cli.config {
        Some(path) => LoaderConfig::from_file(path)?,
        None => LoaderConfig::discover()?,
    };
    config.extra_dirs.extend(cli.fact_dirs.iter().cloned());
    if cli.no_env {
        config.env_facts = false;
    }

    let registry = FactRegistry::new();
    Loader::new(config).load(&registry);

    if cli.names_only {
        for name in registry.list() {
            println!("{name}");
        }
        return Ok(());
    }

    let facts = if cli.names.is_empty() {
        registry.to_map()
    } else {
        let accessor = FactAccessor::new(&registry);
        let mut selected = BTreeMap::new();
        for name in &cli.names {
            if let Some(value) = accessor.get(name)? {
                selected.insert(name.to_lowercase(), value);
            }
        }
        selected
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&facts).into_diagnostic()?);
    } else if cli.names.len() == 1 {
        // A single requested fact prints bare, for use in scripts.
        if let Some(value) = facts.values().next() {
            println!("{value}");
        }
    } else {
        for (name, value) in &facts {
            println!("{name} => {value}");
        }
    }

    Ok(())
}
