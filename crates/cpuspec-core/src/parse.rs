//! Catalog document parsing, loading, and validation.
//!
//! A catalog document has three top-level tables: `microarchitectures`
//! (node id → node record), `feature_aliases` and `conversions`. JSON is the
//! native format; TOML documents with the same shape are accepted too.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, CompilerRule, ConversionTable, FeatureAlias, Microarchitecture};
use crate::error::{CpuSpecError, Result};
use crate::version::VersionRange;

/// The catalog bundled with the crate.
pub const BUILTIN_CATALOG: &str = include_str!("../assets/microarchitectures.json");

/// A field that may be written as a single string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

/// Raw catalog document as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogDocument {
    pub microarchitectures: BTreeMap<String, NodeRecord>,
    #[serde(default)]
    pub feature_aliases: BTreeMap<String, AliasRecord>,
    #[serde(default)]
    pub conversions: BTreeMap<String, BTreeMap<String, String>>,
}

/// Raw microarchitecture record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    #[serde(default)]
    pub from: Vec<String>,
    pub vendor: OneOrMany,
    #[serde(default)]
    pub generation: Option<u32>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub compilers: BTreeMap<String, Vec<RuleRecord>>,
}

/// Raw compiler rule record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleRecord {
    pub versions: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub family: Option<OneOrMany>,
    pub flags: String,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Raw feature alias record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AliasRecord {
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub any_of: Vec<String>,
    #[serde(default)]
    pub families: Vec<String>,
}

impl CatalogDocument {
    /// Assemble the typed, immutable catalog. Rule ranges are parsed here,
    /// so a malformed range fails the load rather than a later query.
    pub fn into_catalog(self) -> Result<Catalog> {
        let mut nodes = Vec::with_capacity(self.microarchitectures.len());
        for (name, record) in self.microarchitectures {
            let mut compilers = BTreeMap::new();
            for (compiler, rules) in record.compilers {
                let mut parsed = Vec::with_capacity(rules.len());
                for rule in rules {
                    parsed.push(CompilerRule {
                        versions: VersionRange::parse(&rule.versions)?,
                        name: rule.name,
                        family: rule.family.map(OneOrMany::into_vec),
                        flags: rule.flags,
                        warnings: rule.warnings,
                    });
                }
                compilers.insert(compiler, parsed);
            }
            nodes.push(Microarchitecture {
                name,
                parents: record.from,
                vendors: record.vendor.into_vec().into_iter().collect(),
                generation: record.generation,
                features: record.features.into_iter().collect(),
                compilers,
            });
        }

        let aliases = self
            .feature_aliases
            .into_iter()
            .map(|(name, a)| {
                let alias = FeatureAlias {
                    reason: a.reason,
                    any_of: a.any_of.into_iter().collect(),
                    families: a.families.into_iter().collect(),
                };
                (name, alias)
            })
            .collect();

        let conversions = self
            .conversions
            .into_iter()
            .map(|(name, entries)| (name, ConversionTable::from_entries(entries)))
            .collect();

        Catalog::new(nodes, aliases, conversions)
    }
}

/// Parse a catalog from a JSON string.
pub fn parse_catalog_json(json_str: &str) -> Result<Catalog> {
    let doc: CatalogDocument = serde_json::from_str(json_str)?;
    doc.into_catalog()
}

/// Parse a catalog from a TOML string.
pub fn parse_catalog_toml(toml_str: &str) -> Result<Catalog> {
    let doc: CatalogDocument = toml::from_str(toml_str)?;
    doc.into_catalog()
}

/// Load a catalog file; `.toml` files are read as TOML, anything else as JSON.
pub fn load_catalog(path: &Path) -> Result<Catalog> {
    if !path.exists() {
        return Err(CpuSpecError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path)?;
    let catalog = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => parse_catalog_toml(&content)?,
        _ => parse_catalog_json(&content)?,
    };
    log::debug!(
        "loaded catalog from {} ({} microarchitectures)",
        path.display(),
        catalog.len()
    );
    Ok(catalog)
}

/// Severity of a catalog validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// A validation issue found in a catalog.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub severity: Severity,
    /// Node the issue was found on.
    pub node: String,
    /// Human-readable description.
    pub message: String,
}

/// Check a loaded catalog for consistency problems the loader tolerates.
///
/// Returns `Ok(())` if no issues were found, or every issue otherwise.
pub fn validate_catalog(catalog: &Catalog) -> std::result::Result<(), Vec<ValidationIssue>> {
    let mut issues = Vec::new();

    for node in catalog.nodes() {
        let mut report = |severity, message: String| {
            issues.push(ValidationIssue {
                severity,
                node: node.name.clone(),
                message,
            })
        };

        // 1. Declared features are cumulative
        for parent_name in &node.parents {
            let Some(parent) = catalog.get(parent_name) else {
                continue;
            };
            let missing: Vec<&str> = parent
                .features
                .difference(&node.features)
                .map(String::as_str)
                .collect();
            if !missing.is_empty() {
                report(
                    Severity::Error,
                    format!(
                        "features of parent '{}' missing from '{}': {}",
                        parent_name,
                        node.name,
                        missing.join(", ")
                    ),
                );
            }

            // 2. Vendor lineage
            if !node.is_generic() && !parent.is_generic() && node.vendors != parent.vendors {
                report(
                    Severity::Warning,
                    format!(
                        "'{}' is vendor-specific but derives from '{}' of a different vendor",
                        node.name, parent_name
                    ),
                );
            }
        }

        // 3. At least one vendor
        if node.vendors.is_empty() {
            report(Severity::Error, format!("'{}' declares no vendor", node.name));
        }

        for (compiler, rules) in &node.compilers {
            // 4. Non-empty rule lists
            if rules.is_empty() {
                report(
                    Severity::Error,
                    format!("'{}' lists compiler '{}' with no rules", node.name, compiler),
                );
            }

            // 5. {family} needs family tokens
            for rule in rules {
                if rule.flags.contains("{family}") && rule.family.is_none() {
                    report(
                        Severity::Warning,
                        format!(
                            "'{}' {} rule '{}' uses {{family}} without family tokens",
                            node.name, compiler, rule.versions
                        ),
                    );
                }
            }
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = r#"{
        "microarchitectures": {
            "core": { "vendor": "generic", "features": [] },
            "fast": {
                "from": ["core"],
                "vendor": ["Acme", "Zeta"],
                "generation": 3,
                "features": ["simd"],
                "compilers": {
                    "cc": [
                        { "versions": "2:", "flags": "-march={name}" },
                        { "versions": "1:1.9", "name": "fast-old", "family": "acme", "flags": "-march={family}",
                          "warnings": ["old compiler"] }
                    ]
                }
            }
        },
        "feature_aliases": {
            "vector": { "reason": "any simd", "any_of": ["simd"] }
        },
        "conversions": { "vendors": { "0x1": "Acme" } }
    }"#;

    #[test]
    fn parse_small_document() {
        let catalog = parse_catalog_json(SMALL).unwrap();
        assert_eq!(catalog.len(), 2);

        let fast = catalog.node("fast").unwrap();
        assert_eq!(fast.generation, Some(3));
        assert!(fast.accepts_vendor("Zeta"));
        let rules = fast.compiler_rules("cc").unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[1].family.as_deref(), Some(&["acme".to_string()][..]));
        assert_eq!(rules[1].warnings, vec!["old compiler".to_string()]);

        assert!(catalog.alias("vector").unwrap().any_of.contains("simd"));
        assert_eq!(catalog.conversion("vendors").unwrap().get("0x1"), Some("Acme"));
    }

    #[test]
    fn parse_toml_document() {
        let toml_str = r#"
[microarchitectures.core]
vendor = "generic"

[microarchitectures.fast]
from = ["core"]
vendor = "Acme"
features = ["simd"]

[[microarchitectures.fast.compilers.cc]]
versions = "1:"
flags = "-mcpu={name}"

[feature_aliases.vector]
reason = "any simd"
any_of = ["simd"]
"#;
        let catalog = parse_catalog_toml(toml_str).unwrap();
        assert!(catalog.is_ancestor("core", "fast"));
        assert_eq!(catalog.node("fast").unwrap().compiler_rules("cc").unwrap().len(), 1);
    }

    #[test]
    fn malformed_range_fails_load() {
        let json = r#"{ "microarchitectures": { "x": { "vendor": "generic",
            "compilers": { "cc": [ { "versions": "4.x:", "flags": "" } ] } } } }"#;
        assert!(matches!(
            parse_catalog_json(json),
            Err(CpuSpecError::MalformedRange { .. })
        ));
    }

    #[test]
    fn invalid_json_is_error() {
        assert!(matches!(
            parse_catalog_json("{ not json"),
            Err(CpuSpecError::Json(_))
        ));
    }

    #[test]
    fn builtin_catalog_loads_and_validates() {
        let catalog = Catalog::builtin().unwrap();
        assert!(catalog.contains("skylake"));
        assert!(catalog.contains("zen3"));
        assert!(catalog.contains("power9le"));
        assert!(catalog.contains("m1"));
        assert!(catalog.conversion("arm_vendors").is_some());
        assert!(catalog.conversion("darwin_flags").is_some());
        if let Err(issues) = validate_catalog(&catalog) {
            panic!("builtin catalog has issues: {issues:#?}");
        }
    }

    #[test]
    fn parent_features_are_subsets_in_builtin() {
        let catalog = Catalog::builtin().unwrap();
        for node in catalog.nodes() {
            for parent in &node.parents {
                let parent = catalog.node(parent).unwrap();
                assert!(
                    parent.features.is_subset(&node.features),
                    "{} is missing features of {}",
                    node.name,
                    parent.name
                );
            }
        }
    }

    #[test]
    fn validate_reports_non_cumulative_features() {
        let json = r#"{ "microarchitectures": {
            "a": { "vendor": "generic", "features": ["x", "y"] },
            "b": { "from": ["a"], "vendor": "generic", "features": ["x"] }
        } }"#;
        let catalog = parse_catalog_json(json).unwrap();
        let issues = validate_catalog(&catalog).unwrap_err();
        assert!(issues
            .iter()
            .any(|i| i.severity == Severity::Error && i.node == "b" && i.message.contains("y")));
    }

    #[test]
    fn validate_reports_vendor_and_template_issues() {
        let json = r#"{ "microarchitectures": {
            "a": { "vendor": "Acme" },
            "b": { "from": ["a"], "vendor": "Zeta",
                   "compilers": { "cc": [ { "versions": ":", "flags": "-march={family}" } ], "dd": [] } },
            "c": { "vendor": [] }
        } }"#;
        let catalog = parse_catalog_json(json).unwrap();
        let issues = validate_catalog(&catalog).unwrap_err();
        assert!(issues.iter().any(|i| i.message.contains("different vendor")));
        assert!(issues.iter().any(|i| i.message.contains("{family}")));
        assert!(issues.iter().any(|i| i.message.contains("no rules")));
        assert!(issues.iter().any(|i| i.node == "c" && i.message.contains("no vendor")));
    }

    #[test]
    fn load_not_found() {
        let result = load_catalog(Path::new("/nonexistent/catalog.json"));
        assert!(matches!(result, Err(CpuSpecError::NotFound { .. })));
    }

    #[test]
    fn load_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("catalog.json");
        std::fs::write(&json_path, SMALL).unwrap();
        assert_eq!(load_catalog(&json_path).unwrap().len(), 2);

        let toml_path = dir.path().join("catalog.toml");
        std::fs::write(
            &toml_path,
            "[microarchitectures.solo]\nvendor = \"generic\"\n",
        )
        .unwrap();
        assert!(load_catalog(&toml_path).unwrap().contains("solo"));
    }
}
