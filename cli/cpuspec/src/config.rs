//! `cpuspec.toml` configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cpuspec_core::NormalizeOptions;
use serde::{Deserialize, Serialize};

/// Name of the configuration file searched for upward from the working directory.
pub const CONFIG_FILE: &str = "cpuspec.toml";

/// The top-level configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CpuSpecConfig {
    /// Catalog source.
    #[serde(default)]
    pub catalog: Option<CatalogConfig>,
    /// Conversion table selection.
    #[serde(default)]
    pub normalize: Option<NormalizeConfig>,
    /// Default compiler for `cpuspec flags`.
    #[serde(default)]
    pub compiler: Option<CompilerConfig>,
}

/// Catalog section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Catalog file, relative to the directory holding `cpuspec.toml`.
    pub path: PathBuf,
}

/// Normalize section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NormalizeConfig {
    #[serde(default)]
    pub vendor_tables: Option<Vec<String>>,
    #[serde(default)]
    pub feature_tables: Option<Vec<String>>,
}

/// Compiler section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

impl CpuSpecConfig {
    /// Search upward from `start_dir` for `cpuspec.toml`, parse and return it
    /// along with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.is_file() {
                let content = std::fs::read_to_string(&candidate)
                    .with_context(|| format!("reading {}", candidate.display()))?;
                let config: CpuSpecConfig = toml::from_str(&content)
                    .with_context(|| format!("parsing {}", candidate.display()))?;
                return Ok(Some((config, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Parse a configuration from a TOML string.
    #[cfg(test)]
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing cpuspec.toml")
    }

    /// Catalog path resolved against the configuration directory.
    pub fn catalog_path(&self, config_dir: &Path) -> Option<PathBuf> {
        self.catalog.as_ref().map(|c| config_dir.join(&c.path))
    }

    /// Apply the `[normalize]` section on top of `base`.
    pub fn normalize_options(&self, base: NormalizeOptions) -> NormalizeOptions {
        let Some(section) = &self.normalize else {
            return base;
        };
        NormalizeOptions {
            vendor_tables: section
                .vendor_tables
                .clone()
                .unwrap_or(base.vendor_tables),
            feature_tables: section
                .feature_tables
                .clone()
                .unwrap_or(base.feature_tables),
        }
    }

    /// Default compiler name.
    pub fn compiler_name(&self) -> Option<&str> {
        self.compiler.as_ref().and_then(|c| c.name.as_deref())
    }

    /// Default compiler version.
    pub fn compiler_version(&self) -> Option<&str> {
        self.compiler.as_ref().and_then(|c| c.version.as_deref())
    }
}
