//! CLI command implementations.

pub mod common;
pub mod extract;
pub mod probe;
