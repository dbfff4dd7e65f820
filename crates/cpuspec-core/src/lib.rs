//! Microarchitecture resolution and compiler flag selection.
//!
//! Resolves a host's CPU capabilities to the most specific entry of a
//! catalog of named microarchitectures, then derives compiler flags for it.
//!
//! The pipeline is:
//! - **Normalizer:** raw host tokens → canonical, alias-expanded profile
//! - **Resolver:** profile + catalog → most specific compatible node
//! - **Flag selector:** node + compiler + version → flags and warnings
//!
//! The [`Catalog`] is built once (usually [`Catalog::builtin`]) and passed
//! explicitly to every query; it is immutable and can be shared across
//! threads behind an `Arc`.

pub mod cache;
pub mod catalog;
pub mod error;
pub mod flags;
pub mod host;
pub mod normalize;
pub mod parse;
pub mod resolve;
pub mod version;

// Re-exports for convenience.
pub use cache::{CacheStats, ResolutionCache};
pub use catalog::{Catalog, CompilerRule, ConversionTable, FeatureAlias, Microarchitecture};
pub use error::{CpuSpecError, Result};
pub use flags::{select_flags, FlagSelection};
pub use host::{HostProfile, NormalizedProfile};
pub use normalize::{normalize, NormalizeOptions};
pub use parse::{load_catalog, parse_catalog_json, parse_catalog_toml, validate_catalog};
pub use resolve::{resolve, resolve_or_fallback, Diagnostic, Resolution};
pub use version::{parse_range, parse_version, Version, VersionRange};

/// Normalize a raw host profile and resolve it in one step.
pub fn resolve_host<'c>(
    raw: &HostProfile,
    catalog: &'c Catalog,
    options: &NormalizeOptions,
) -> Result<Resolution<'c>> {
    let profile = normalize(raw, catalog, options)?;
    resolve(&profile, catalog)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn end_to_end_haswell() {
        let catalog = Catalog::builtin().unwrap();
        let raw = HostProfile::new("GenuineIntel", "x86_64").with_features(
            catalog.node("haswell").unwrap().features.iter().cloned(),
        );
        let resolution = resolve_host(&raw, &catalog, &NormalizeOptions::default()).unwrap();
        assert_eq!(resolution.name(), "haswell");

        let selection = select_flags(resolution.node, "gcc", "4.8.3", &catalog).unwrap();
        assert_eq!(selection.flags, "-march=core-avx2 -mtune=core-avx2");
    }

    #[test]
    fn shared_catalog_across_threads() {
        let catalog = Arc::new(Catalog::builtin().unwrap());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let catalog = Arc::clone(&catalog);
                std::thread::spawn(move || {
                    let raw = HostProfile::new("AuthenticAMD", "x86_64").with_features(
                        catalog.node("zen2").unwrap().features.iter().cloned(),
                    );
                    resolve_host(&raw, &catalog, &NormalizeOptions::default())
                        .unwrap()
                        .name()
                        .to_string()
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), "zen2");
        }
    }

    #[test]
    fn missing_vendor_fails_before_resolution() {
        let catalog = Catalog::builtin().unwrap();
        let raw = HostProfile {
            platform: "x86_64".into(),
            ..HostProfile::default()
        };
        assert!(matches!(
            resolve_host(&raw, &catalog, &NormalizeOptions::default()),
            Err(CpuSpecError::MalformedProfile { .. })
        ));
    }
}
