//! Configuration constants.
//!
//! This module defines the defaults used throughout the client: timeouts, redirect
//! limits, buffer sizes and header values.

/// Default connect and read timeout in seconds.
///
/// Applied when a request does not carry its own timeout. The same value is used for
/// both the connect phase and every read from the connection.
pub const DEFAULT_TIMEOUT_SECS: f64 = 30.0;

// Redirect handling
/// Maximum number of redirect hops to follow
/// Prevents infinite redirect loops and excessive request chains
pub const MAX_REDIRECT_HOPS: usize = 10;

/// Largest slice read from a file, reader or multipart body at a time while it is
/// sent.
pub const STREAM_CHUNK_SIZE: usize = 4 * 1024;

/// Number of distinct reqwest clients (one per timeout and redirect setting) the
/// transport keeps before starting over.
pub const MAX_CACHED_CLIENTS: usize = 8;

/// Default chunk size for [`Response::iter_content`](crate::Response::iter_content).
pub const DEFAULT_CHUNK_SIZE: usize = 1;

/// Default chunk size for [`Response::iter_lines`](crate::Response::iter_lines).
pub const DEFAULT_LINE_CHUNK_SIZE: usize = 512;

/// Default delimiter pattern for [`Response::iter_lines`](crate::Response::iter_lines).
pub const DEFAULT_LINE_DELIMITER: &str = "\n";

/// Default User-Agent string, sent when a request does not set its own.
pub const DEFAULT_USER_AGENT: &str = concat!("hopline/", env!("CARGO_PKG_VERSION"));

/// Content type written for JSON request bodies.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Content type written for file attachments.
pub const OCTET_STREAM_CONTENT_TYPE: &str = "application/octet-stream";

// HTTP status codes followed as redirects
pub const HTTP_STATUS_MOVED_PERMANENTLY: u16 = 301;
pub const HTTP_STATUS_FOUND: u16 = 302;
pub const HTTP_STATUS_SEE_OTHER: u16 = 303;
pub const HTTP_STATUS_TEMPORARY_REDIRECT: u16 = 307;
pub const HTTP_STATUS_PERMANENT_REDIRECT: u16 = 308;

/// Statuses that trigger automatic redirect following.
pub const REDIRECT_STATUSES: &[u16] = &[
    HTTP_STATUS_MOVED_PERMANENTLY,
    HTTP_STATUS_FOUND,
    HTTP_STATUS_SEE_OTHER,
    HTTP_STATUS_TEMPORARY_REDIRECT,
    HTTP_STATUS_PERMANENT_REDIRECT,
];
