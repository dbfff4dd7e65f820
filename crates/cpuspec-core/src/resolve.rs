//! Best-match resolution over the specialization graph.
//!
//! A node is a candidate for a profile when its whole feature set is present
//! in the profile, it applies to the profile's vendor, and (when the profile
//! names a platform) it descends from that platform's root. The answer is the
//! candidate that no other candidate specializes. If several such candidates
//! are incomparable the catalog is ambiguous for this host; the highest
//! `generation` wins, then the smallest id, and a diagnostic is reported.

use std::cmp::Reverse;
use std::fmt;

use crate::catalog::{Catalog, Microarchitecture};
use crate::error::{CpuSpecError, Result};
use crate::host::NormalizedProfile;

/// Non-fatal findings produced while resolving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Several incomparable maximal candidates; `chosen` won the tie-break.
    AmbiguousMatch {
        candidates: Vec<String>,
        chosen: String,
    },
    /// Nothing matched; the platform's generic root was used instead.
    FellBack { platform: String, node: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::AmbiguousMatch { candidates, chosen } => write!(
                f,
                "ambiguous match between {}; chose '{}' (highest generation, then name)",
                candidates.join(", "),
                chosen
            ),
            Diagnostic::FellBack { platform, node } => write!(
                f,
                "no microarchitecture matched; fell back to '{node}' for platform '{platform}'"
            ),
        }
    }
}

/// The outcome of a successful resolution.
#[derive(Debug, Clone)]
pub struct Resolution<'c> {
    /// The most specific compatible node.
    pub node: &'c Microarchitecture,
    /// Findings a catalog author may want to act on.
    pub diagnostics: Vec<Diagnostic>,
}

impl<'c> Resolution<'c> {
    pub fn name(&self) -> &'c str {
        &self.node.name
    }

    pub fn is_ambiguous(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::AmbiguousMatch { .. }))
    }
}

/// Every node compatible with the profile, in id order.
pub fn candidates<'c>(profile: &NormalizedProfile, catalog: &'c Catalog) -> Vec<&'c Microarchitecture> {
    let platform = profile.platform();
    catalog
        .nodes()
        .filter(|node| node.accepts_vendor(profile.vendor()))
        .filter(|node| platform.is_empty() || catalog.belongs_to(&node.name, platform))
        .filter(|node| node.features.is_subset(profile.features()))
        .collect()
}

/// Candidates that no other candidate descends from.
pub fn maximal<'c>(
    candidates: &[&'c Microarchitecture],
    catalog: &Catalog,
) -> Vec<&'c Microarchitecture> {
    candidates
        .iter()
        .filter(|c| {
            !candidates
                .iter()
                .any(|other| catalog.is_ancestor(&c.name, &other.name))
        })
        .copied()
        .collect()
}

/// Resolve a normalized profile to the most specific catalog node.
pub fn resolve<'c>(profile: &NormalizedProfile, catalog: &'c Catalog) -> Result<Resolution<'c>> {
    let compatible = candidates(profile, catalog);
    log::debug!(
        "{} candidate(s) for vendor '{}' on '{}'",
        compatible.len(),
        profile.vendor(),
        profile.platform()
    );
    if compatible.is_empty() {
        return Err(CpuSpecError::NoMatch {
            vendor: profile.vendor().to_string(),
            platform: profile.platform().to_string(),
        });
    }

    let mut best = maximal(&compatible, catalog);
    if best.len() == 1 {
        return Ok(Resolution {
            node: best[0],
            diagnostics: Vec::new(),
        });
    }

    best.sort_by(|a, b| {
        Reverse(a.generation)
            .cmp(&Reverse(b.generation))
            .then_with(|| a.name.cmp(&b.name))
    });
    let chosen = best[0];
    let diagnostic = Diagnostic::AmbiguousMatch {
        candidates: best.iter().map(|n| n.name.clone()).collect(),
        chosen: chosen.name.clone(),
    };
    log::warn!("{diagnostic}");
    Ok(Resolution {
        node: chosen,
        diagnostics: vec![diagnostic],
    })
}

/// Like [`resolve`], but answer with the platform's root node when nothing
/// matches. Fails with `NoMatch` only if the platform has no node either.
pub fn resolve_or_fallback<'c>(
    profile: &NormalizedProfile,
    catalog: &'c Catalog,
) -> Result<Resolution<'c>> {
    match resolve(profile, catalog) {
        Err(CpuSpecError::NoMatch { vendor, platform }) => {
            let Some(node) = catalog.get(&platform) else {
                return Err(CpuSpecError::NoMatch { vendor, platform });
            };
            let diagnostic = Diagnostic::FellBack {
                platform: platform.clone(),
                node: node.name.clone(),
            };
            log::warn!("{diagnostic}");
            Ok(Resolution {
                node,
                diagnostics: vec![diagnostic],
            })
        }
        other => other,
    }
}
