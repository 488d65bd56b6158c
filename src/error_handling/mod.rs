//! Error handling.
//!
//! This module provides:
//! - The crate [`Error`] type and [`Result`] alias
//! - Error categorization ([`ErrorKind`])
//! - The [`InitializationError`] returned by setup helpers
//!
//! Errors are categorized into:
//! - **Configuration**: invalid input detected before any network I/O
//! - **Transport**: connect/read failures, passed through unchanged
//! - **Decoding**: corrupt compressed bodies, invalid JSON
//! - **Invariant**: broken internal assumptions (fatal)

mod categorization;
mod types;

// Re-export public API
pub use types::{Error, ErrorKind, InitializationError, Result};
