//! cpuspec CLI — resolve the host microarchitecture and pick compiler flags.

mod commands;
mod config;
mod provider;

use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};
use cpuspec_core::{load_catalog, Catalog, NormalizeOptions};

use config::CpuSpecConfig;

#[derive(Parser)]
#[command(
    name = "cpuspec",
    version,
    about = "Microarchitecture detection and compiler flag selection"
)]
struct Cli {
    /// Catalog file to use instead of the built-in one (.json or .toml)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the microarchitecture of this machine
    Host {
        /// Answer with the platform's root entry when nothing matches
        #[arg(long)]
        fallback: bool,
    },
    /// Print compiler flags for this machine or a named microarchitecture
    Flags {
        /// Microarchitecture to compile for (default: this machine)
        #[arg(long)]
        target: Option<String>,
        /// Compiler name (e.g., gcc, clang, apple-clang, intel)
        #[arg(long)]
        compiler: Option<String>,
        /// Compiler version (e.g., 12.2.0)
        #[arg(long)]
        compiler_version: Option<String>,
    },
    /// Inspect the microarchitecture catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// List all microarchitectures
    List,
    /// Show details of one microarchitecture
    Describe {
        /// Microarchitecture name
        name: String,
    },
    /// Check the catalog for consistency problems
    Validate,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let (config, config_dir) = load_config_optional(&cwd)?;
    let catalog = open_catalog(cli.catalog.as_deref(), config.as_ref(), config_dir.as_deref())?;
    let options = config
        .as_ref()
        .map(|c| c.normalize_options(NormalizeOptions::default()))
        .unwrap_or_default();

    match cli.command {
        Commands::Host { fallback } => commands::host::run(&catalog, &options, fallback),

        Commands::Flags {
            target,
            compiler,
            compiler_version,
        } => commands::flags::run(
            &catalog,
            &options,
            config.as_ref(),
            target.as_deref(),
            compiler.as_deref(),
            compiler_version.as_deref(),
        ),

        Commands::Catalog { action } => match action {
            CatalogAction::List => commands::catalog::list(&catalog),
            CatalogAction::Describe { name } => commands::catalog::describe(&catalog, &name),
            CatalogAction::Validate => commands::catalog::validate(&catalog),
        },
    }
}

/// Load cpuspec.toml if one exists, returning (config, config_dir).
fn load_config_optional(cwd: &Path) -> anyhow::Result<(Option<CpuSpecConfig>, Option<PathBuf>)> {
    match CpuSpecConfig::find_and_load(cwd)? {
        Some((config, dir)) => {
            log::debug!("using {}", dir.join(config::CONFIG_FILE).display());
            Ok((Some(config), Some(dir)))
        }
        None => Ok((None, None)),
    }
}

/// Pick the catalog: `--catalog` wins over `[catalog] path`, else the built-in one.
fn open_catalog(
    cli_path: Option<&Path>,
    config: Option<&CpuSpecConfig>,
    config_dir: Option<&Path>,
) -> anyhow::Result<Catalog> {
    let config_path = match (config, config_dir) {
        (Some(config), Some(dir)) => config.catalog_path(dir),
        _ => None,
    };
    match cli_path.map(Path::to_path_buf).or(config_path) {
        Some(path) => {
            load_catalog(&path).with_context(|| format!("loading catalog {}", path.display()))
        }
        None => Catalog::builtin().context("loading built-in catalog"),
    }
}
