//! Dotted compiler versions and inclusive `min:max` ranges.
//!
//! Compiler rules in the catalog are scoped by ranges such as `"4.8:4.8.5"`,
//! `"11.1:"` or `":"`. Versions are compared component by component; a
//! version that is a strict prefix of another sorts before it, so `4.8`
//! is less than `4.8.5` and `4.9` is greater than `4.8.5`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{CpuSpecError, Result};

/// A parsed dotted version: one or more non-negative integer components.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    // Derived `Ord` on `Vec<u64>` sorts a strict prefix first.
    components: Vec<u64>,
}

impl Version {
    /// Parse a version string like `"4.8.5"` or `"12"`.
    pub fn parse(input: &str) -> Result<Self> {
        let text = input.trim();
        if text.is_empty() {
            return Err(malformed_version(input, "empty version"));
        }

        let mut components = Vec::new();
        for part in text.split('.') {
            if part.is_empty() {
                return Err(malformed_version(input, "empty component between dots"));
            }
            if !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(malformed_version(
                    input,
                    &format!("component '{part}' is not a non-negative integer"),
                ));
            }
            let value = part.parse::<u64>().map_err(|e| {
                malformed_version(input, &format!("component '{part}': {e}"))
            })?;
            components.push(value);
        }
        Ok(Self { components })
    }

    /// The numeric components, most significant first.
    pub fn components(&self) -> &[u64] {
        &self.components
    }
}

impl FromStr for Version {
    type Err = CpuSpecError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self
            .components
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(".");
        f.write_str(&text)
    }
}

/// An inclusive interval over versions; a missing bound is unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct VersionRange {
    min: Option<Version>,
    max: Option<Version>,
}

impl VersionRange {
    /// The range that contains every version (`":"`).
    pub fn any() -> Self {
        Self::default()
    }

    /// Parse a range expression.
    ///
    /// Accepted forms are `"min:max"`, `"min:"`, `":max"`, `":"` and a bare
    /// `"version"`, which denotes the single-version range `"version:version"`.
    pub fn parse(input: &str) -> Result<Self> {
        let text = input.trim();
        let mut parts = text.split(':');
        let (min_text, max_text) = match (parts.next(), parts.next(), parts.next()) {
            (Some(exact), None, None) => (exact, exact),
            (Some(min), Some(max), None) => (min, max),
            _ => return Err(malformed_range(input, "expected at most one ':'")),
        };

        if min_text.trim().is_empty() && max_text.trim().is_empty() && !text.contains(':') {
            return Err(malformed_range(input, "empty range"));
        }

        let min = parse_bound(input, min_text)?;
        let max = parse_bound(input, max_text)?;
        if let (Some(lo), Some(hi)) = (&min, &max) {
            if lo > hi {
                return Err(malformed_range(
                    input,
                    &format!("lower bound {lo} exceeds upper bound {hi}"),
                ));
            }
        }
        Ok(Self { min, max })
    }

    /// Whether `version` lies inside the range (bounds inclusive).
    pub fn contains(&self, version: &Version) -> bool {
        let above_min = self.min.as_ref().map_or(true, |lo| version >= lo);
        let below_max = self.max.as_ref().map_or(true, |hi| version <= hi);
        above_min && below_max
    }

    /// Lower bound, if any.
    pub fn min(&self) -> Option<&Version> {
        self.min.as_ref()
    }

    /// Upper bound, if any.
    pub fn max(&self) -> Option<&Version> {
        self.max.as_ref()
    }

    /// True for `":"`.
    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

impl FromStr for VersionRange {
    type Err = CpuSpecError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(lo) = &self.min {
            write!(f, "{lo}")?;
        }
        f.write_str(":")?;
        if let Some(hi) = &self.max {
            write!(f, "{hi}")?;
        }
        Ok(())
    }
}

fn parse_bound(range_text: &str, bound: &str) -> Result<Option<Version>> {
    if bound.trim().is_empty() {
        return Ok(None);
    }
    match Version::parse(bound) {
        Ok(v) => Ok(Some(v)),
        Err(CpuSpecError::MalformedVersion { detail, .. }) => Err(malformed_range(
            range_text,
            &format!("bound '{}': {detail}", bound.trim()),
        )),
        Err(other) => Err(other),
    }
}

fn malformed_version(input: &str, detail: &str) -> CpuSpecError {
    CpuSpecError::MalformedVersion {
        input: input.to_string(),
        detail: detail.to_string(),
    }
}

fn malformed_range(input: &str, detail: &str) -> CpuSpecError {
    CpuSpecError::MalformedRange {
        input: input.to_string(),
        detail: detail.to_string(),
    }
}

/// Parse a version string like `"4.8.5"`.
pub fn parse_version(s: &str) -> Result<Version> {
    Version::parse(s)
}

/// Parse a range expression like `"4.6:4.8.5"`.
pub fn parse_range(s: &str) -> Result<VersionRange> {
    VersionRange::parse(s)
}

/// Compare two versions.
pub fn compare(a: &Version, b: &Version) -> Ordering {
    a.cmp(b)
}

/// Check if a version lies inside a range.
pub fn contains(range: &VersionRange, version: &Version) -> bool {
    range.contains(version)
}
