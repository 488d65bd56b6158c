//! Configuration types.
//!
//! This module defines the client configuration and the logging enums used by
//! [`init_logger_with`](crate::initialization::init_logger_with).

use crate::config::constants::{DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT, MAX_REDIRECT_HOPS};

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: One JSON object per line for machine parsing
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Client configuration.
///
/// Holds the defaults a [`Client`](crate::Client) falls back to when a request
/// leaves a setting unset.
///
/// # Examples
///
/// ```
/// use hopline::ClientConfig;
///
/// let config = ClientConfig {
///     max_redirects: 3,
///     ..Default::default()
/// };
/// assert!(config.follow_redirects);
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Connect/read timeout in seconds for requests without their own timeout
    pub timeout_seconds: f64,

    /// Maximum number of redirect hops followed before giving up
    pub max_redirects: usize,

    /// Redirect-follow policy for requests that leave it unset
    pub follow_redirects: bool,

    /// HTTP User-Agent header value for requests that do not set one
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
            max_redirects: MAX_REDIRECT_HOPS,
            follow_redirects: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}
