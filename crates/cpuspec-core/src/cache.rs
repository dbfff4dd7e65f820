//! Memoization of resolutions and flag selections.
//!
//! Both queries are pure functions of their inputs and the catalog, so
//! results can be reused for as long as the catalog they came from is in
//! use. A cache must only be used with one catalog; call
//! [`ResolutionCache::invalidate_all`] after switching to a new one.

use std::collections::HashMap;

use crate::catalog::Catalog;
use crate::error::Result;
use crate::flags::FlagSelection;
use crate::host::NormalizedProfile;
use crate::resolve::{resolve, Diagnostic, Resolution};

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub resolutions: usize,
    pub flag_selections: usize,
}

#[derive(Debug, Clone)]
struct CachedResolution {
    node: String,
    diagnostics: Vec<Diagnostic>,
}

type FlagKey = (String, String, String);

/// Cache keyed by profile fingerprint and by `(node, compiler, version)`.
#[derive(Debug, Clone, Default)]
pub struct ResolutionCache {
    resolutions: HashMap<String, CachedResolution>,
    flags: HashMap<FlagKey, FlagSelection>,
    hits: usize,
    misses: usize,
}

impl ResolutionCache {
    /// Create a new empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve through the cache. Failures are not cached.
    pub fn resolve<'c>(
        &mut self,
        profile: &NormalizedProfile,
        catalog: &'c Catalog,
    ) -> Result<Resolution<'c>> {
        let key = profile.fingerprint();
        if let Some(cached) = self.resolutions.get(&key) {
            self.hits += 1;
            return Ok(Resolution {
                node: catalog.node(&cached.node)?,
                diagnostics: cached.diagnostics.clone(),
            });
        }

        self.misses += 1;
        let resolution = resolve(profile, catalog)?;
        self.resolutions.insert(
            key,
            CachedResolution {
                node: resolution.node.name.clone(),
                diagnostics: resolution.diagnostics.clone(),
            },
        );
        Ok(resolution)
    }

    /// Select flags through the cache. Failures are not cached.
    pub fn select_flags(
        &mut self,
        catalog: &Catalog,
        node: &str,
        compiler: &str,
        version: &str,
    ) -> Result<FlagSelection> {
        let key = (node.to_string(), compiler.to_string(), version.trim().to_string());
        if let Some(cached) = self.flags.get(&key) {
            self.hits += 1;
            return Ok(cached.clone());
        }

        self.misses += 1;
        let selection = catalog.select_flags(node, compiler, version)?;
        self.flags.insert(key, selection.clone());
        Ok(selection)
    }

    /// Drop every entry, e.g. after the catalog was replaced.
    pub fn invalidate_all(&mut self) {
        self.resolutions.clear();
        self.flags.clear();
    }

    /// Return cache usage statistics.
    pub fn statistics(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            resolutions: self.resolutions.len(),
            flag_selections: self.flags.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostProfile;
    use crate::normalize::{normalize, NormalizeOptions};

    fn haswell_profile(catalog: &Catalog) -> NormalizedProfile {
        let features = catalog.node("haswell").unwrap().features.iter().cloned();
        let raw = HostProfile::new("GenuineIntel", "x86_64").with_features(features);
        normalize(&raw, catalog, &NormalizeOptions::default()).unwrap()
    }

    #[test]
    fn resolution_hit_on_same_profile() {
        let catalog = Catalog::builtin().unwrap();
        let profile = haswell_profile(&catalog);
        let mut cache = ResolutionCache::new();

        let first = cache.resolve(&profile, &catalog).unwrap().name();
        let second = cache.resolve(&profile, &catalog).unwrap().name();
        assert_eq!(first, "haswell");
        assert_eq!(first, second);

        let stats = cache.statistics();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.resolutions, 1);
    }

    #[test]
    fn flag_hit_and_failures_not_cached() {
        let catalog = Catalog::builtin().unwrap();
        let mut cache = ResolutionCache::new();

        let a = cache.select_flags(&catalog, "haswell", "gcc", "4.8.3").unwrap();
        let b = cache.select_flags(&catalog, "haswell", "gcc", " 4.8.3").unwrap();
        assert_eq!(a, b);
        assert!(cache.select_flags(&catalog, "zen", "msvc", "1").is_err());
        assert!(cache.select_flags(&catalog, "zen", "msvc", "1").is_err());

        let stats = cache.statistics();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 3);
        assert_eq!(stats.flag_selections, 1);
    }

    #[test]
    fn invalidation() {
        let catalog = Catalog::builtin().unwrap();
        let profile = haswell_profile(&catalog);
        let mut cache = ResolutionCache::new();
        cache.resolve(&profile, &catalog).unwrap();
        cache.select_flags(&catalog, "haswell", "clang", "12").unwrap();

        cache.invalidate_all();
        let stats = cache.statistics();
        assert_eq!(stats.resolutions, 0);
        assert_eq!(stats.flag_selections, 0);
    }
}
