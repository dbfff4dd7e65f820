//! `cpuspec host` — resolve the running machine.

use anyhow::{Context, Result};
use cpuspec_core::resolve::resolve_or_fallback;
use cpuspec_core::{normalize, resolve, Catalog, HostProfile, NormalizeOptions};

use crate::provider;

/// Outcome of resolving one host profile.
#[derive(Debug)]
pub struct HostReport {
    pub node: String,
    pub diagnostics: Vec<String>,
}

/// Resolve `raw` against `catalog`, optionally falling back to the platform root.
pub fn report(
    raw: &HostProfile,
    catalog: &Catalog,
    options: &NormalizeOptions,
    fallback: bool,
) -> Result<HostReport> {
    let profile = normalize(raw, catalog, options)?;
    log::debug!(
        "normalized profile: vendor={} platform={} features={}",
        profile.vendor(),
        profile.platform(),
        profile.features().len()
    );
    let resolution = if fallback {
        resolve_or_fallback(&profile, catalog)?
    } else {
        resolve(&profile, catalog)?
    };
    Ok(HostReport {
        node: resolution.name().to_string(),
        diagnostics: resolution
            .diagnostics
            .iter()
            .map(ToString::to_string)
            .collect(),
    })
}

pub fn run(catalog: &Catalog, options: &NormalizeOptions, fallback: bool) -> Result<()> {
    let raw = provider::detect()?;
    let report = report(&raw, catalog, options, fallback).context("resolving host")?;
    for diagnostic in &report.diagnostics {
        eprintln!("warning: {diagnostic}");
    }
    println!("{}", report.node);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{profile_from_cpuinfo, tests::INTEL_CPUINFO};

    #[test]
    fn reports_skylake_fixture() {
        let catalog = Catalog::builtin().unwrap();
        let raw = profile_from_cpuinfo(INTEL_CPUINFO, "x86_64");
        let report = report(&raw, &catalog, &NormalizeOptions::default(), false).unwrap();
        assert_eq!(report.node, "skylake");
        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn fallback_to_platform_root() {
        let catalog = cpuspec_core::parse_catalog_json(
            r#"{
                "microarchitectures": {
                    "isa": { "vendor": "generic", "features": ["base"] },
                    "fast": { "from": ["isa"], "vendor": "Acme", "features": ["base", "fast"] }
                }
            }"#,
        )
        .unwrap();
        let raw = HostProfile::new("Acme", "isa").with_features(["fast"]);
        assert!(report(&raw, &catalog, &NormalizeOptions::default(), false).is_err());

        let report = report(&raw, &catalog, &NormalizeOptions::default(), true).unwrap();
        assert_eq!(report.node, "isa");
        assert_eq!(report.diagnostics.len(), 1);
    }
}
