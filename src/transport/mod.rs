//! Transport abstraction.
//!
//! A [`Transport`] opens one [`Connection`] per hop. The connection is configured by
//! the preparation pipeline (verb, headers, timeouts, redirect flag, body), then
//! [`connect`](Connection::connect)ed exactly once. After that it hands out the
//! response body through a success stream or an error stream.
//!
//! # Implementations
//!
//! - [`ReqwestTransport`]: blocking reqwest client with rustls
//! - A recording mock used by the crate's unit tests

mod blocking;
#[cfg(test)]
pub(crate) mod mock;

use std::io::{Read, Write};
use std::time::Duration;

use reqwest::header::HeaderMap;
use url::Url;

use crate::error_handling::Result;

pub use blocking::{ReqwestConnection, ReqwestTransport};

/// Readable body stream handed out by a connection.
pub type BodyReader = Box<dyn Read + Send>;

/// Status line and headers of a connected response.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    /// Numeric HTTP status code
    pub status: u16,
    /// Response headers, case-insensitive
    pub headers: HeaderMap,
}

/// Opens connections for a URL.
pub trait Transport: Send + Sync {
    /// Opens an unconnected connection for `url`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedScheme`](crate::Error::UnsupportedScheme) for URL
    /// schemes the transport does not serve. No network I/O happens here.
    fn open(&self, url: &Url) -> Result<Box<dyn Connection>>;
}

/// One request/response exchange on the wire.
///
/// Setters are only meaningful before [`connect`](Connection::connect).
pub trait Connection: Send {
    /// Sets the request verb. Any valid HTTP token is accepted, including verbs
    /// outside the standard set.
    fn set_method(&mut self, method: &str) -> Result<()>;

    /// Verb the connection will actually send.
    fn method(&self) -> &str;

    /// Sets a request header, replacing a previous value for the same name.
    fn set_header(&mut self, name: &str, value: &str) -> Result<()>;

    /// Whether a header with this case-insensitive name has been set.
    fn has_header(&self, name: &str) -> bool;

    fn set_connect_timeout(&mut self, timeout: Duration);

    fn set_read_timeout(&mut self, timeout: Duration);

    /// Enables or disables the transport's automatic redirect following.
    fn set_follow_redirects(&mut self, follow: bool);

    /// Enables output mode and returns the request body channel.
    ///
    /// Bytes written here are held until [`connect`](Connection::connect). Fails
    /// once a streaming source is set.
    fn output(&mut self) -> Result<&mut dyn Write>;

    /// Enables output mode with a body source read while connecting.
    ///
    /// `len` is the exact body length when known. Fails once bytes were written
    /// to [`output`](Connection::output).
    fn stream_body(&mut self, source: BodyReader, len: Option<u64>) -> Result<()>;

    /// Sends the request and reads the status line and headers.
    fn connect(&mut self) -> Result<ResponseHead>;

    /// Body stream of a successful response.
    ///
    /// Fails for error statuses and when the body was already handed out.
    fn input_stream(&mut self) -> std::io::Result<BodyReader>;

    /// Body stream of an error response, if the body is still available.
    fn error_stream(&mut self) -> Option<BodyReader>;

    /// Drops a body that was not handed out, releasing the underlying socket.
    fn close(&mut self);
}

/// Returns `true` for schemes the built-in transports serve.
pub(crate) fn is_http_scheme(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}
