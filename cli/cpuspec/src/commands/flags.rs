//! `cpuspec flags` — compiler flags for the host or a named target.

use anyhow::{Context, Result};
use cpuspec_core::{resolve_host, Catalog, FlagSelection, NormalizeOptions};

use crate::config::CpuSpecConfig;
use crate::provider;

/// Compiler and version to select flags for, after applying configuration defaults.
pub fn compiler_choice<'a>(
    compiler: Option<&'a str>,
    version: Option<&'a str>,
    config: Option<&'a CpuSpecConfig>,
) -> Result<(&'a str, &'a str)> {
    let compiler = compiler
        .or_else(|| config.and_then(CpuSpecConfig::compiler_name))
        .context("no compiler given; pass --compiler or set [compiler] name in cpuspec.toml")?;
    let version = version
        .or_else(|| config.and_then(CpuSpecConfig::compiler_version))
        .context(
            "no compiler version given; pass --compiler-version or set [compiler] version in cpuspec.toml",
        )?;
    Ok((compiler, version))
}

/// Flags for the node `target`.
pub fn flags_for(
    catalog: &Catalog,
    target: &str,
    compiler: &str,
    version: &str,
) -> Result<FlagSelection> {
    catalog
        .select_flags(target, compiler, version)
        .with_context(|| format!("selecting {compiler}@{version} flags for '{target}'"))
}

pub fn run(
    catalog: &Catalog,
    options: &NormalizeOptions,
    config: Option<&CpuSpecConfig>,
    target: Option<&str>,
    compiler: Option<&str>,
    version: Option<&str>,
) -> Result<()> {
    let (compiler, version) = compiler_choice(compiler, version, config)?;

    let target = match target {
        Some(name) => name.to_string(),
        None => {
            let raw = provider::detect()?;
            let resolution = resolve_host(&raw, catalog, options).context("resolving host")?;
            for diagnostic in &resolution.diagnostics {
                eprintln!("warning: {diagnostic}");
            }
            resolution.name().to_string()
        }
    };

    let selection = flags_for(catalog, &target, compiler, version)?;
    for warning in &selection.warnings {
        eprintln!("warning: {warning}");
    }
    println!("{}", selection.flags);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_for_named_target() {
        let catalog = Catalog::builtin().unwrap();
        let selection = flags_for(&catalog, "haswell", "gcc", "9.3.0").unwrap();
        assert_eq!(selection.flags, "-march=haswell -mtune=haswell");
    }

    #[test]
    fn unknown_target_mentions_name() {
        let catalog = Catalog::builtin().unwrap();
        let err = flags_for(&catalog, "pentium9", "gcc", "9").unwrap_err();
        assert!(format!("{err:#}").contains("pentium9"));
    }

    #[test]
    fn arguments_override_config() {
        let config = CpuSpecConfig::parse("[compiler]\nname = \"clang\"\nversion = \"15\"\n").unwrap();
        assert_eq!(
            compiler_choice(None, None, Some(&config)).unwrap(),
            ("clang", "15")
        );
        assert_eq!(
            compiler_choice(Some("gcc"), None, Some(&config)).unwrap(),
            ("gcc", "15")
        );
    }

    #[test]
    fn missing_compiler_is_error() {
        assert!(compiler_choice(None, Some("12"), None).is_err());
        assert!(compiler_choice(Some("gcc"), None, None).is_err());
    }
}
