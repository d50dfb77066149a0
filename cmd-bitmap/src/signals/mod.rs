//! Signal extraction from command documents
//!
//! This module resolves the document shape and normalizes its entries into
//! the canonical signal list.

pub mod document;
pub mod extract;

// Re-export key types for convenience
pub use document::{derive_command_id, CommandDocument};
pub use extract::{extract, DEFAULT_BIT_LENGTH, DEFAULT_BIT_OFFSET};
