//! CLI command implementations.

pub mod catalog;
pub mod flags;
pub mod host;
