//! Host profiles: the engine's input, before and after normalization.

use std::collections::{BTreeMap, BTreeSet};

use sha2::{Digest, Sha256};

/// Raw host information as handed over by a host-info provider.
///
/// Tokens are platform-specific spellings (an ARM implementer byte, a
/// macOS flag name); the normalizer turns them into catalog tokens.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HostProfile {
    /// Vendor token (e.g. "GenuineIntel", "0x41"). Required.
    pub vendor: Option<String>,
    /// Optional family or implementer token.
    pub family: Option<String>,
    /// Raw feature tokens.
    pub features: BTreeSet<String>,
    /// Instruction-set platform (e.g. "x86_64"); empty means unrestricted.
    pub platform: String,
}

impl HostProfile {
    /// Start a profile for a vendor on a platform.
    pub fn new(vendor: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            vendor: Some(vendor.into()),
            family: None,
            features: BTreeSet::new(),
            platform: platform.into(),
        }
    }

    /// Set the family/implementer token.
    pub fn with_family(mut self, family: impl Into<String>) -> Self {
        self.family = Some(family.into());
        self
    }

    /// Add raw feature tokens.
    pub fn with_features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.features.extend(features.into_iter().map(Into::into));
        self
    }

    /// Build a profile from a provider's raw field map.
    ///
    /// Recognized keys are `vendor`, `family`, `platform` and `features`
    /// (whitespace-separated). Empty values count as absent.
    pub fn from_fields(fields: &BTreeMap<String, String>) -> Self {
        let non_empty = |key: &str| {
            fields
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        Self {
            vendor: non_empty("vendor"),
            family: non_empty("family"),
            features: fields
                .get("features")
                .map(|f| f.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
            platform: non_empty("platform").unwrap_or_default(),
        }
    }
}

/// A host profile with canonical tokens and alias-expanded features.
///
/// Only the normalizer constructs these; they are never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedProfile {
    vendor: String,
    family: Option<String>,
    features: BTreeSet<String>,
    platform: String,
}

impl NormalizedProfile {
    pub(crate) fn new(
        vendor: String,
        family: Option<String>,
        features: BTreeSet<String>,
        platform: String,
    ) -> Self {
        Self {
            vendor,
            family,
            features,
            platform,
        }
    }

    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    pub fn family(&self) -> Option<&str> {
        self.family.as_deref()
    }

    pub fn features(&self) -> &BTreeSet<String> {
        &self.features
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    /// Whether the feature (or an alias that fired) is present.
    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.contains(feature)
    }

    /// Content hash of the profile: SHA-256 of vendor, family, platform and
    /// the sorted feature list.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.vendor.as_bytes());
        hasher.update([0]);
        hasher.update(self.family.as_deref().unwrap_or("").as_bytes());
        hasher.update([0]);
        hasher.update(self.platform.as_bytes());
        for feature in &self.features {
            hasher.update([0]);
            hasher.update(feature.as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }
}

impl From<NormalizedProfile> for HostProfile {
    fn from(profile: NormalizedProfile) -> Self {
        Self {
            vendor: Some(profile.vendor),
            family: profile.family,
            features: profile.features,
            platform: profile.platform,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder() {
        let profile = HostProfile::new("GenuineIntel", "x86_64")
            .with_features(["sse", "sse2"])
            .with_family("6");
        assert_eq!(profile.vendor.as_deref(), Some("GenuineIntel"));
        assert_eq!(profile.family.as_deref(), Some("6"));
        assert_eq!(profile.features.len(), 2);
    }

    #[test]
    fn from_fields_map() {
        let fields = BTreeMap::from([
            ("vendor".to_string(), " AuthenticAMD ".to_string()),
            ("features".to_string(), "sse  sse2\tavx".to_string()),
            ("platform".to_string(), "x86_64".to_string()),
            ("family".to_string(), "".to_string()),
        ]);
        let profile = HostProfile::from_fields(&fields);
        assert_eq!(profile.vendor.as_deref(), Some("AuthenticAMD"));
        assert!(profile.family.is_none());
        assert_eq!(profile.features.len(), 3);
        assert_eq!(profile.platform, "x86_64");
    }

    #[test]
    fn from_fields_without_vendor() {
        let profile = HostProfile::from_fields(&BTreeMap::new());
        assert!(profile.vendor.is_none());
        assert!(profile.features.is_empty());
    }

    #[test]
    fn fingerprint_depends_on_content() {
        let features: BTreeSet<String> = ["a".to_string(), "b".to_string()].into();
        let a = NormalizedProfile::new("V".into(), None, features.clone(), "p".into());
        let b = NormalizedProfile::new("V".into(), None, features, "p".into());
        let c = NormalizedProfile::new("V".into(), None, BTreeSet::new(), "p".into());
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn fingerprint_separates_fields() {
        let a = NormalizedProfile::new("ab".into(), None, BTreeSet::new(), "c".into());
        let b = NormalizedProfile::new("a".into(), None, BTreeSet::new(), "bc".into());
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
