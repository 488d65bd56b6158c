//! Client configuration and constants.
//!
//! This module provides:
//! - Configuration constants (timeouts, redirect limits, buffer sizes)
//! - The [`ClientConfig`] struct
//! - Logging level and format enums

mod constants;
mod types;

// Re-export all constants
pub use constants::*;
pub use types::{ClientConfig, LogFormat, LogLevel};
