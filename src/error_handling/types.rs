//! Error type definitions.
//!
//! This module defines the crate error, its category enum and the initialization
//! error used by the setup helpers.

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Convenience alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors produced while resolving requests and reading responses.
///
/// Transport, I/O and JSON errors are transparent: callers see the underlying
/// error unchanged, without an extra message layer.
#[derive(Error, Debug)]
pub enum Error {
    /// The URL scheme is not served by the transport.
    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    /// The request URL or a redirect `Location` could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The request verb is not a valid HTTP method token.
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// A request header name or value is not valid on the wire.
    #[error("Invalid header {name}: {reason}")]
    InvalidHeader {
        /// Header name as given by the caller
        name: String,
        /// What was wrong with it
        reason: String,
    },

    /// The timeout is negative, not finite, or too large.
    #[error("Invalid timeout: {0} seconds")]
    InvalidTimeout(f64),

    /// A charset label does not name a known encoding.
    #[error("Unsupported charset: {0}")]
    UnsupportedCharset(String),

    /// The line delimiter pattern does not compile.
    #[error("Invalid line delimiter: {0}")]
    InvalidDelimiter(#[from] regex::Error),

    /// A raw or streamed body was combined with multipart file attachments.
    #[error("Request body cannot be combined with multipart file attachments")]
    ConflictingBody,

    /// The redirect chain grew past the configured hop limit.
    #[error("Too many redirects (more than {max} hops)")]
    TooManyRedirects {
        /// Configured hop limit
        max: usize,
    },

    /// The transport did not apply the requested verb.
    #[error("Transport verb is {effective}, expected {requested}")]
    MethodMismatch {
        /// Verb carried by the request
        requested: String,
        /// Verb reported by the connection after the override
        effective: String,
    },

    /// The body was already consumed and closed by a streaming iterator.
    #[error("Response body was already consumed")]
    BodyConsumed,

    /// A memoized response field was found in a state it cannot be in.
    #[error("Inconsistent response state: {0}")]
    InconsistentState(&'static str),

    /// Error raised by the HTTP transport.
    #[error(transparent)]
    Transport(#[from] ReqwestError),

    /// I/O error while writing the request body or reading the response body.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Error while serializing a JSON body or decoding JSON content.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Categories of [`Error`].
///
/// Configuration errors are raised before any network I/O and are never retried.
/// Transport errors come from the network. Decoding errors come from turning body
/// bytes into text or JSON. Invariant errors indicate a broken internal assumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum ErrorKind {
    /// Invalid request or response configuration, detected before I/O
    Configuration,
    /// Connect, read or protocol failure from the network
    Transport,
    /// Body bytes could not be decoded
    Decoding,
    /// Internal consistency violation
    Invariant,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ErrorKind {
    /// Returns a human-readable label for the category.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration error",
            ErrorKind::Transport => "transport error",
            ErrorKind::Decoding => "decoding error",
            ErrorKind::Invariant => "invariant violation",
        }
    }
}

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),
}
