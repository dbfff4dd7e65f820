//! Immutable microarchitecture catalog.
//!
//! The catalog is the specialization graph of named microarchitectures,
//! plus the feature alias rules and named conversion tables that the
//! normalizer needs. It is assembled once from a catalog document and
//! never mutated afterward; every accessor hands out shared references.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{CpuSpecError, Result};
use crate::version::VersionRange;

/// Vendor token that makes a node applicable to every vendor.
pub const GENERIC_VENDOR: &str = "generic";

/// A version-scoped flag template for one node and compiler family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerRule {
    /// Compiler versions this rule applies to.
    pub versions: VersionRange,
    /// Name substituted for `{name}`; the node id when absent.
    pub name: Option<String>,
    /// Tokens substituted (space-joined) for `{family}`.
    pub family: Option<Vec<String>>,
    /// Flag template with `{name}` / `{family}` placeholders.
    pub flags: String,
    /// Advisory messages surfaced with the flags.
    pub warnings: Vec<String>,
}

/// A named, vendor-scoped CPU capability profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Microarchitecture {
    /// Unique id (e.g. "skylake").
    pub name: String,
    /// Direct parents, in declared order.
    pub parents: Vec<String>,
    /// Vendors this node applies to; `generic` matches any vendor.
    pub vendors: BTreeSet<String>,
    /// Optional generation number (POWER7 = 7, ...).
    pub generation: Option<u32>,
    /// Cumulative feature set, inherited features included.
    pub features: BTreeSet<String>,
    /// Compiler family → ordered rule list (first match wins).
    pub compilers: BTreeMap<String, Vec<CompilerRule>>,
}

impl Microarchitecture {
    /// Whether the node applies to any vendor.
    pub fn is_generic(&self) -> bool {
        self.vendors.contains(GENERIC_VENDOR)
    }

    /// Whether the node applies to the given vendor.
    pub fn accepts_vendor(&self, vendor: &str) -> bool {
        self.is_generic() || self.vendors.contains(vendor)
    }

    /// Whether the node declares the feature literally (aliases not applied).
    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.contains(feature)
    }

    /// Rules for a compiler family, in declared order.
    pub fn compiler_rules(&self, compiler: &str) -> Option<&[CompilerRule]> {
        self.compilers.get(compiler).map(Vec::as_slice)
    }

    /// Compiler families with at least one rule.
    pub fn compiler_families(&self) -> impl Iterator<Item = &str> {
        self.compilers.keys().map(String::as_str)
    }
}

/// A feature name considered present when certain concrete features or
/// instruction-set families are present.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FeatureAlias {
    /// Documentation only.
    pub reason: String,
    /// The alias holds if any of these features is present.
    pub any_of: BTreeSet<String>,
    /// The alias holds unconditionally for these families.
    pub families: BTreeSet<String>,
}

impl FeatureAlias {
    /// Evaluate the alias against a feature set and the families in play.
    pub fn holds<'a>(
        &self,
        features: &BTreeSet<String>,
        families: impl IntoIterator<Item = &'a str>,
    ) -> bool {
        self.any_of.iter().any(|f| features.contains(f))
            || families.into_iter().any(|fam| self.families.contains(fam))
    }
}

/// Named mapping from raw platform tokens to canonical catalog tokens.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConversionTable {
    entries: BTreeMap<String, String>,
}

impl ConversionTable {
    /// Build a table from raw → canonical pairs.
    pub fn from_entries(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }

    /// Canonical replacement for a raw token, if the table knows it.
    pub fn get(&self, raw: &str) -> Option<&str> {
        self.entries.get(raw).map(String::as_str)
    }

    /// Canonical tokens for a raw token. A value may list several
    /// space-separated tokens; unknown tokens map to themselves.
    pub fn convert<'a>(&'a self, raw: &'a str) -> Vec<&'a str> {
        match self.get(raw) {
            Some(value) => value.split_whitespace().collect(),
            None => vec![raw],
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// The loaded, immutable catalog.
///
/// Iteration is always in node-id order so that every query over the
/// catalog is deterministic.
#[derive(Debug, Clone)]
pub struct Catalog {
    nodes: BTreeMap<String, Microarchitecture>,
    ancestors: BTreeMap<String, BTreeSet<String>>,
    roots: BTreeMap<String, BTreeSet<String>>,
    family: BTreeMap<String, String>,
    aliases: BTreeMap<String, FeatureAlias>,
    conversions: BTreeMap<String, ConversionTable>,
}

impl Catalog {
    /// Assemble a catalog, checking that the parent graph is a DAG over
    /// declared nodes.
    pub fn new(
        nodes: Vec<Microarchitecture>,
        aliases: BTreeMap<String, FeatureAlias>,
        conversions: BTreeMap<String, ConversionTable>,
    ) -> Result<Self> {
        let mut by_name = BTreeMap::new();
        for node in nodes {
            if by_name.contains_key(&node.name) {
                return Err(invalid(format!("duplicate microarchitecture '{}'", node.name)));
            }
            by_name.insert(node.name.clone(), node);
        }

        for node in by_name.values() {
            for parent in &node.parents {
                if !by_name.contains_key(parent) {
                    return Err(invalid(format!(
                        "'{}' derives from unknown microarchitecture '{}'",
                        node.name, parent
                    )));
                }
                if parent == &node.name {
                    return Err(invalid(format!("'{}' derives from itself", node.name)));
                }
            }
        }

        check_acyclic(&by_name)?;

        let mut ancestors = BTreeMap::new();
        for name in by_name.keys() {
            collect_ancestors(name, &by_name, &mut ancestors);
        }

        let mut roots = BTreeMap::new();
        let mut family = BTreeMap::new();
        for (name, node) in &by_name {
            let own_roots: BTreeSet<String> = if node.parents.is_empty() {
                BTreeSet::from([name.clone()])
            } else {
                ancestors[name]
                    .iter()
                    .filter(|a| by_name[a.as_str()].parents.is_empty())
                    .cloned()
                    .collect()
            };
            roots.insert(name.clone(), own_roots);

            let mut cursor = node;
            while let Some(first) = cursor.parents.first() {
                cursor = &by_name[first];
            }
            family.insert(name.clone(), cursor.name.clone());
        }

        Ok(Self {
            nodes: by_name,
            ancestors,
            roots,
            family,
            aliases,
            conversions,
        })
    }

    /// Parse the catalog bundled with this crate.
    pub fn builtin() -> Result<Self> {
        crate::parse::parse_catalog_json(crate::parse::BUILTIN_CATALOG)
    }

    /// Look up a node by id.
    pub fn get(&self, name: &str) -> Option<&Microarchitecture> {
        self.nodes.get(name)
    }

    /// Look up a node by id, failing with `UnknownNode`.
    pub fn node(&self, name: &str) -> Result<&Microarchitecture> {
        self.get(name).ok_or_else(|| CpuSpecError::UnknownNode {
            name: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Microarchitecture> {
        self.nodes.values()
    }

    /// All node ids in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// Transitive parents of a node (empty for unknown ids).
    pub fn ancestors(&self, name: &str) -> impl Iterator<Item = &str> {
        self.ancestors
            .get(name)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// True if `ancestor` is a transitive parent of `name`.
    pub fn is_ancestor(&self, ancestor: &str, name: &str) -> bool {
        self.ancestors
            .get(name)
            .is_some_and(|set| set.contains(ancestor))
    }

    /// Nodes that have `name` as a transitive parent, in id order.
    pub fn descendants<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.ancestors
            .iter()
            .filter(move |(_, set)| set.contains(name))
            .map(|(n, _)| n.as_str())
    }

    /// Nodes without parents.
    pub fn roots(&self) -> impl Iterator<Item = &Microarchitecture> {
        self.nodes.values().filter(|n| n.parents.is_empty())
    }

    /// Every root reachable from the node, including itself if it is one.
    pub fn roots_of(&self, name: &str) -> impl Iterator<Item = &str> {
        self.roots
            .get(name)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// The instruction-set family: the root reached by following first parents.
    pub fn family(&self, name: &str) -> Option<&str> {
        self.family.get(name).map(String::as_str)
    }

    /// Whether `platform` is one of the node's roots.
    pub fn belongs_to(&self, name: &str, platform: &str) -> bool {
        self.roots
            .get(name)
            .is_some_and(|set| set.contains(platform))
    }

    pub fn alias(&self, name: &str) -> Option<&FeatureAlias> {
        self.aliases.get(name)
    }

    pub fn aliases(&self) -> impl Iterator<Item = (&str, &FeatureAlias)> {
        self.aliases.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn conversion(&self, name: &str) -> Option<&ConversionTable> {
        self.conversions.get(name)
    }

    pub fn conversions(&self) -> impl Iterator<Item = (&str, &ConversionTable)> {
        self.conversions.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Whether a node supports a feature, directly or through an alias.
    pub fn supports(&self, name: &str, feature: &str) -> Result<bool> {
        let node = self.node(name)?;
        if node.has_feature(feature) {
            return Ok(true);
        }
        Ok(self.alias(feature).is_some_and(|alias| {
            alias.holds(&node.features, self.roots_of(name))
        }))
    }
}

fn invalid(detail: String) -> CpuSpecError {
    CpuSpecError::InvalidCatalog { detail }
}

fn check_acyclic(nodes: &BTreeMap<String, Microarchitecture>) -> Result<()> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done,
    }

    fn visit<'a>(
        name: &'a str,
        nodes: &'a BTreeMap<String, Microarchitecture>,
        marks: &mut BTreeMap<&'a str, Mark>,
        path: &mut Vec<&'a str>,
    ) -> Result<()> {
        match marks.get(name) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                let start = path.iter().position(|n| *n == name).unwrap_or(0);
                let mut cycle = path[start..].to_vec();
                cycle.push(name);
                return Err(invalid(format!(
                    "cycle in parent graph: {}",
                    cycle.join(" -> ")
                )));
            }
            None => {}
        }
        marks.insert(name, Mark::Visiting);
        path.push(name);
        for parent in &nodes[name].parents {
            visit(parent, nodes, marks, path)?;
        }
        path.pop();
        marks.insert(name, Mark::Done);
        Ok(())
    }

    let mut marks = BTreeMap::new();
    let mut path = Vec::new();
    for name in nodes.keys() {
        visit(name, nodes, &mut marks, &mut path)?;
    }
    Ok(())
}

fn collect_ancestors(
    name: &str,
    nodes: &BTreeMap<String, Microarchitecture>,
    memo: &mut BTreeMap<String, BTreeSet<String>>,
) -> BTreeSet<String> {
    if let Some(done) = memo.get(name) {
        return done.clone();
    }
    let mut set = BTreeSet::new();
    for parent in &nodes[name].parents {
        set.insert(parent.clone());
        set.extend(collect_ancestors(parent, nodes, memo));
    }
    memo.insert(name.to_string(), set.clone());
    set
}
