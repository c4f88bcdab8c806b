//! CLI command implementations.

pub mod common;
pub mod decompose;
pub mod simulate;
pub mod spectrum;
pub mod version;
