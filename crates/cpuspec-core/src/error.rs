//! Error types for catalog loading, resolution, and flag selection.

use std::path::PathBuf;

/// Errors that can occur while loading a catalog or answering a query.
#[derive(Debug, thiserror::Error)]
pub enum CpuSpecError {
    /// The raw host profile is missing a required field.
    #[error("malformed host profile: {detail}")]
    MalformedProfile {
        /// Description of what is missing.
        detail: String,
    },

    /// No catalog node is compatible with the normalized profile.
    #[error("no microarchitecture matches vendor '{vendor}' on platform '{platform}'")]
    NoMatch {
        /// Canonical vendor of the profile.
        vendor: String,
        /// Platform identifier of the profile (may be empty).
        platform: String,
    },

    /// The node has no rules for the requested compiler family.
    #[error("compiler '{compiler}' has no rules for microarchitecture '{node}'")]
    UnknownCompiler { node: String, compiler: String },

    /// The compiler family is known but no rule covers the version.
    #[error("{compiler}@{version} is not supported for microarchitecture '{node}'")]
    UnsupportedVersion {
        node: String,
        compiler: String,
        version: String,
    },

    /// A dotted version string could not be parsed.
    #[error("malformed version '{input}': {detail}")]
    MalformedVersion { input: String, detail: String },

    /// A `min:max` range expression could not be parsed.
    #[error("malformed version range '{input}': {detail}")]
    MalformedRange { input: String, detail: String },

    /// Lookup of a node id that the catalog does not declare.
    #[error("unknown microarchitecture: {name}")]
    UnknownNode { name: String },

    /// The catalog document is structurally invalid.
    #[error("invalid catalog: {detail}")]
    InvalidCatalog { detail: String },

    /// Catalog file not found.
    #[error("catalog file not found: {}", path.display())]
    NotFound {
        /// The path that was not found.
        path: PathBuf,
    },

    /// JSON deserialization error.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML deserialization error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// I/O error reading catalog files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for catalog and engine operations.
pub type Result<T> = std::result::Result<T, CpuSpecError>;
