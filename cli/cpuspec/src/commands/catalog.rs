//! `cpuspec catalog` — inspect and validate the catalog.

use anyhow::{bail, Result};
use cpuspec_core::parse::{Severity, ValidationIssue};
use cpuspec_core::{validate_catalog, Catalog};

/// List every node with its platform and vendors.
pub fn list(catalog: &Catalog) -> Result<()> {
    println!("Microarchitectures ({}):", catalog.len());
    println!();
    for node in catalog.nodes() {
        let platform = catalog.family(&node.name).unwrap_or("-");
        let vendors: Vec<&str> = node.vendors.iter().map(String::as_str).collect();
        println!("  {:<25} {:<10} {}", node.name, platform, vendors.join(", "));
    }
    println!();
    println!("Use 'cpuspec catalog describe <name>' for details.");
    Ok(())
}

/// Describe one node in detail.
pub fn describe(catalog: &Catalog, name: &str) -> Result<()> {
    let Some(node) = catalog.get(name) else {
        bail!("unknown microarchitecture: '{name}'. Use 'cpuspec catalog list' to see available entries.");
    };

    println!("=== Microarchitecture: {} ===", node.name);
    if !node.parents.is_empty() {
        println!("Parents:    {}", node.parents.join(", "));
    }
    let ancestors: Vec<&str> = catalog.ancestors(name).collect();
    if !ancestors.is_empty() {
        println!("Ancestors:  {}", ancestors.join(", "));
    }
    let vendors: Vec<&str> = node.vendors.iter().map(String::as_str).collect();
    println!("Vendors:    {}", vendors.join(", "));
    if let Some(generation) = node.generation {
        println!("Generation: {generation}");
    }
    println!();

    println!("--- Features ({}) ---", node.features.len());
    let features: Vec<&str> = node.features.iter().map(String::as_str).collect();
    for chunk in features.chunks(8) {
        println!("  {}", chunk.join(" "));
    }
    println!();

    println!("--- Compilers ---");
    for (compiler, rules) in &node.compilers {
        println!("  {compiler}:");
        for rule in rules {
            println!("    {:<16} {}", rule.versions.to_string(), rule.flags);
            for warning in &rule.warnings {
                println!("    {:<16} warning: {warning}", "");
            }
        }
    }
    Ok(())
}

/// Format one validation issue as a single line.
pub fn format_issue(issue: &ValidationIssue) -> String {
    let level = match issue.severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
    };
    format!("{level}: {}: {}", issue.node, issue.message)
}

/// Validate the catalog. Fails if any issue is an error.
pub fn validate(catalog: &Catalog) -> Result<()> {
    let issues = match validate_catalog(catalog) {
        Ok(()) => {
            println!("Catalog OK ({} microarchitectures).", catalog.len());
            return Ok(());
        }
        Err(issues) => issues,
    };

    for issue in &issues {
        eprintln!("{}", format_issue(issue));
    }
    let errors = issues
        .iter()
        .filter(|i| i.severity == Severity::Error)
        .count();
    if errors > 0 {
        bail!("catalog has {errors} error(s)");
    }
    println!(
        "Catalog OK with {} warning(s) ({} microarchitectures).",
        issues.len(),
        catalog.len()
    );
    Ok(())
}
