//! Compiler flag selection for a resolved microarchitecture.

use crate::catalog::{Catalog, CompilerRule, Microarchitecture};
use crate::error::{CpuSpecError, Result};
use crate::version::{Version, VersionRange};

/// Rendered flags for one node / compiler / version triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagSelection {
    /// Rendered flag string, e.g. `-march=haswell -mtune=haswell`.
    pub flags: String,
    /// Advisory messages from the matching rule.
    pub warnings: Vec<String>,
    /// The range of the rule that matched.
    pub versions: VersionRange,
}

/// First rule, in declared order, whose range contains `version`.
pub fn select_rule<'n>(
    node: &'n Microarchitecture,
    compiler: &str,
    version: &Version,
) -> Result<&'n CompilerRule> {
    let rules = node
        .compiler_rules(compiler)
        .ok_or_else(|| CpuSpecError::UnknownCompiler {
            node: node.name.clone(),
            compiler: compiler.to_string(),
        })?;

    rules
        .iter()
        .find(|rule| rule.versions.contains(version))
        .ok_or_else(|| CpuSpecError::UnsupportedVersion {
            node: node.name.clone(),
            compiler: compiler.to_string(),
            version: version.to_string(),
        })
}

/// Select and render the flags for compiling for `node` with
/// `compiler@version`.
pub fn select_flags(
    node: &Microarchitecture,
    compiler: &str,
    version: &str,
    catalog: &Catalog,
) -> Result<FlagSelection> {
    if node.compiler_rules(compiler).is_none() {
        return Err(CpuSpecError::UnknownCompiler {
            node: node.name.clone(),
            compiler: compiler.to_string(),
        });
    }
    let version = Version::parse(version)?;
    let rule = select_rule(node, compiler, &version)?;
    log::debug!(
        "{}: {}@{} matched rule '{}'",
        node.name,
        compiler,
        version,
        rule.versions
    );

    let name = rule.name.as_deref().unwrap_or(node.name.as_str());
    let family = match &rule.family {
        Some(tokens) => tokens.join(" "),
        None => catalog
            .family(&node.name)
            .unwrap_or(node.name.as_str())
            .to_string(),
    };

    Ok(FlagSelection {
        flags: render(&rule.flags, name, &family),
        warnings: rule.warnings.clone(),
        versions: rule.versions.clone(),
    })
}

/// Substitute `{name}` and `{family}` in a flag template.
pub fn render(template: &str, name: &str, family: &str) -> String {
    template.replace("{name}", name).replace("{family}", family)
}

impl Catalog {
    /// Flags for the node with the given id.
    pub fn select_flags(&self, node: &str, compiler: &str, version: &str) -> Result<FlagSelection> {
        select_flags(self.node(node)?, compiler, version, self)
    }
}
