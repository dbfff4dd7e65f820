//! Feature normalization.
//!
//! Turns a raw [`HostProfile`] into a [`NormalizedProfile`]:
//! vendor and family tokens are canonicalized through the configured
//! conversion tables, raw feature spellings are converted, and feature
//! aliases are expanded. Expansion only ever adds tokens, so normalizing a
//! normalized profile again yields the same profile.

use std::collections::BTreeSet;

use crate::catalog::{Catalog, ConversionTable};
use crate::error::{CpuSpecError, Result};
use crate::host::{HostProfile, NormalizedProfile};

/// Which conversion tables apply to which tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Tables applied, in order, to vendor and family tokens.
    pub vendor_tables: Vec<String>,
    /// Tables applied, in order, to each feature token.
    pub feature_tables: Vec<String>,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            vendor_tables: vec!["arm_vendors".to_string()],
            feature_tables: Vec::new(),
        }
    }
}

impl NormalizeOptions {
    /// Defaults plus the macOS `sysctl` flag spellings.
    pub fn darwin() -> Self {
        Self {
            feature_tables: vec!["darwin_flags".to_string()],
            ..Self::default()
        }
    }
}

/// Normalize a raw profile against the catalog's tables and aliases.
pub fn normalize(
    raw: &HostProfile,
    catalog: &Catalog,
    options: &NormalizeOptions,
) -> Result<NormalizedProfile> {
    let vendor = raw
        .vendor
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| CpuSpecError::MalformedProfile {
            detail: "missing vendor token".into(),
        })?;

    let vendor_tables = tables(catalog, &options.vendor_tables);
    let feature_tables = tables(catalog, &options.feature_tables);

    let vendor = canonical_token(vendor, &vendor_tables);
    let family = raw
        .family
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(|f| canonical_token(f, &vendor_tables));
    let platform = raw.platform.trim().to_string();

    let mut features = BTreeSet::new();
    for raw_feature in &raw.features {
        let mut tokens = vec![raw_feature.trim().to_string()];
        for table in &feature_tables {
            tokens = tokens
                .iter()
                .flat_map(|t| table.convert(t))
                .map(str::to_string)
                .collect();
        }
        features.extend(tokens.into_iter().filter(|t| !t.is_empty()));
    }

    expand_aliases(&mut features, catalog, &platform, family.as_deref());

    Ok(NormalizedProfile::new(vendor, family, features, platform))
}

/// Add every alias that holds, repeating until nothing new fires.
fn expand_aliases(
    features: &mut BTreeSet<String>,
    catalog: &Catalog,
    platform: &str,
    family: Option<&str>,
) {
    let families: Vec<&str> = std::iter::once(platform)
        .chain(family)
        .filter(|f| !f.is_empty())
        .collect();

    loop {
        let fired: Vec<String> = catalog
            .aliases()
            .filter(|(name, _)| !features.contains(*name))
            .filter(|(_, alias)| alias.holds(features, families.iter().copied()))
            .map(|(name, _)| name.to_string())
            .collect();
        if fired.is_empty() {
            break;
        }
        for name in fired {
            log::trace!("alias '{name}' fired");
            features.insert(name);
        }
    }
}

fn tables<'a>(catalog: &'a Catalog, names: &[String]) -> Vec<&'a ConversionTable> {
    names
        .iter()
        .filter_map(|name| {
            let table = catalog.conversion(name);
            if table.is_none() {
                log::debug!("conversion table '{name}' not in catalog, skipping");
            }
            table
        })
        .collect()
}

/// Whole-token replacement; vendor names may legitimately contain spaces.
fn canonical_token(token: &str, tables: &[&ConversionTable]) -> String {
    tables
        .iter()
        .fold(token.to_string(), |current, table| {
            table.get(&current).map(str::to_string).unwrap_or(current)
        })
}
