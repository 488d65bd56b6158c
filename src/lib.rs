//! hopline: a blocking HTTP client core.
//!
//! Given a [`Request`], a [`Client`] opens a transport connection, prepares it with
//! an ordered pipeline of steps, follows redirects itself (the transport's own
//! redirect handling is always off) and carries cookies from hop to hop. The
//! resulting [`Response`] exposes the status, headers, cookies and redirect
//! history, and the body either fully buffered or as a lazily read stream with
//! transparent gzip/deflate decompression, charset-aware text decoding and
//! chunk/line iteration.
//!
//! # Example
//!
//! ```no_run
//! use hopline::{initialization::init_client, ClientConfig, Request};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = init_client(&ClientConfig::default())?;
//! let mut response = client.send(
//!     Request::new("GET", "https://example.com/start")?
//!         .cookie("session", "abc")
//!         .timeout(5.0),
//! )?;
//!
//! println!("{} after {} redirect(s)", response.url(), response.history().len());
//! for line in response.iter_lines(512, r"\r?\n")? {
//!     println!("{}", String::from_utf8_lossy(&line));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Concurrency
//!
//! Calls block for connect and read. [`dispatch`] runs a blocking call as a unit
//! of work on any executor and reports through callbacks.

pub mod config;
pub mod cookies;
pub mod dispatch;
mod error_handling;
mod fetch;
pub mod initialization;
pub mod request;
pub mod transport;

pub use config::{ClientConfig, LogFormat, LogLevel};
pub use cookies::{Cookie, CookieJar};
pub use error_handling::{Error, ErrorKind, InitializationError, Result};
pub use fetch::pipeline::{self, Pipeline, PrepareStep, StepContext};
pub use fetch::{Chunks, Client, Lines, Response};
pub use request::{Auth, Body, FileAttachment, ReaderBody, Request};
pub use transport::{Connection, ReqwestTransport, Transport};
