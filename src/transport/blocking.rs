//! Blocking reqwest transport.
//!
//! reqwest configures timeouts and redirect policy per client, so the transport
//! keeps one `reqwest::blocking::Client` per (connect timeout, read timeout,
//! redirect flag) combination and reuses it across connections. The read timeout
//! bounds each read on the socket and resets after every successful one; there is
//! no whole-request deadline, so a slow but live body is never cut off.

use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::debug;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use url::Url;

use super::{is_http_scheme, BodyReader, Connection, ResponseHead, Transport};
use crate::config::MAX_CACHED_CLIENTS;
use crate::error_handling::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ClientKey {
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    follow_redirects: bool,
}

#[derive(Default)]
struct ClientCache {
    clients: Mutex<HashMap<ClientKey, reqwest::blocking::Client>>,
}

impl ClientCache {
    fn get(&self, key: ClientKey) -> std::result::Result<reqwest::blocking::Client, reqwest::Error> {
        let mut clients = self
            .clients
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(client) = clients.get(&key) {
            return Ok(client.clone());
        }

        // Redirects stay on only when a custom step turns them back on
        let policy = if key.follow_redirects {
            reqwest::redirect::Policy::default()
        } else {
            reqwest::redirect::Policy::none()
        };
        let mut inner = reqwest::ClientBuilder::new().redirect(policy);
        if let Some(timeout) = key.connect_timeout {
            inner = inner.connect_timeout(timeout);
        }
        if let Some(timeout) = key.read_timeout {
            inner = inner.read_timeout(timeout);
        }
        let client = reqwest::blocking::ClientBuilder::from(inner)
            .timeout(None::<Duration>)
            .build()?;
        debug!("Built reqwest client for {key:?}");

        if clients.len() >= MAX_CACHED_CLIENTS {
            debug!("Client cache full ({} entries), clearing", clients.len());
            clients.clear();
        }
        clients.insert(key, client.clone());
        Ok(client)
    }

    fn len(&self) -> usize {
        self.clients
            .lock()
            .map(|clients| clients.len())
            .unwrap_or_else(|poisoned| poisoned.into_inner().len())
    }
}

/// Production transport backed by `reqwest::blocking`.
///
/// Serves `http` and `https` URLs. TLS uses rustls.
#[derive(Clone, Default)]
pub struct ReqwestTransport {
    cache: Arc<ClientCache>,
}

impl ReqwestTransport {
    /// Creates a transport with an empty client cache.
    pub fn new() -> Self {
        ReqwestTransport::default()
    }

    /// Builds the client used for connections with `timeout` as connect and read
    /// timeout and redirects disabled, so TLS backend failures show up at setup
    /// rather than on first use.
    pub fn preload(&self, timeout: Duration) -> std::result::Result<(), reqwest::Error> {
        self.cache
            .get(ClientKey {
                connect_timeout: Some(timeout),
                read_timeout: Some(timeout),
                follow_redirects: false,
            })
            .map(|_| ())
    }
}

impl Transport for ReqwestTransport {
    fn open(&self, url: &Url) -> Result<Box<dyn Connection>> {
        if !is_http_scheme(url) {
            return Err(Error::UnsupportedScheme(url.scheme().to_string()));
        }
        Ok(Box::new(ReqwestConnection {
            cache: Arc::clone(&self.cache),
            url: url.clone(),
            method: Method::GET,
            headers: HeaderMap::new(),
            connect_timeout: None,
            read_timeout: None,
            follow_redirects: true,
            body: None,
            status: None,
            response: None,
        }))
    }
}

enum PendingBody {
    Buffered(Vec<u8>),
    Streamed(BodyReader, Option<u64>),
}

/// A single exchange on a [`ReqwestTransport`].
///
/// Bytes written to [`output`](Connection::output) are buffered and sent when the
/// connection connects. A source set with
/// [`stream_body`](Connection::stream_body) is read by reqwest while sending.
pub struct ReqwestConnection {
    cache: Arc<ClientCache>,
    url: Url,
    method: Method,
    headers: HeaderMap,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    follow_redirects: bool,
    body: Option<PendingBody>,
    status: Option<u16>,
    response: Option<reqwest::blocking::Response>,
}

impl Connection for ReqwestConnection {
    fn set_method(&mut self, method: &str) -> Result<()> {
        self.method = Method::from_bytes(method.as_bytes())
            .map_err(|_| Error::InvalidMethod(method.to_string()))?;
        Ok(())
    }

    fn method(&self) -> &str {
        self.method.as_str()
    }

    fn set_header(&mut self, name: &str, value: &str) -> Result<()> {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| Error::InvalidHeader {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| Error::InvalidHeader {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        self.headers.insert(header_name, header_value);
        Ok(())
    }

    fn has_header(&self, name: &str) -> bool {
        self.headers.contains_key(name.to_ascii_lowercase().as_str())
    }

    fn set_connect_timeout(&mut self, timeout: Duration) {
        self.connect_timeout = Some(timeout);
    }

    fn set_read_timeout(&mut self, timeout: Duration) {
        self.read_timeout = Some(timeout);
    }

    fn set_follow_redirects(&mut self, follow: bool) {
        self.follow_redirects = follow;
    }

    fn output(&mut self) -> Result<&mut dyn Write> {
        match self.body.get_or_insert_with(|| PendingBody::Buffered(Vec::new())) {
            PendingBody::Buffered(buf) => Ok(buf),
            PendingBody::Streamed(..) => Err(Error::ConflictingBody),
        }
    }

    fn stream_body(&mut self, source: BodyReader, len: Option<u64>) -> Result<()> {
        if self.body.is_some() {
            return Err(Error::ConflictingBody);
        }
        self.body = Some(PendingBody::Streamed(source, len));
        Ok(())
    }

    fn connect(&mut self) -> Result<ResponseHead> {
        if self.status.is_some() {
            return Err(Error::Io(std::io::Error::other(format!(
                "connection to {} was already used",
                self.url
            ))));
        }

        let client = self.cache.get(ClientKey {
            connect_timeout: self.connect_timeout,
            read_timeout: self.read_timeout,
            follow_redirects: self.follow_redirects,
        })?;
        let mut builder = client
            .request(self.method.clone(), self.url.clone())
            .headers(self.headers.clone());
        match self.body.take() {
            Some(PendingBody::Buffered(bytes)) => builder = builder.body(bytes),
            Some(PendingBody::Streamed(source, Some(len))) => {
                builder = builder.body(reqwest::blocking::Body::sized(source, len))
            }
            Some(PendingBody::Streamed(source, None)) => {
                builder = builder.body(reqwest::blocking::Body::new(source))
            }
            None => {}
        }

        let response = builder.send()?;
        let head = ResponseHead {
            status: response.status().as_u16(),
            headers: response.headers().clone(),
        };
        self.status = Some(head.status);
        self.response = Some(response);
        Ok(head)
    }

    fn input_stream(&mut self) -> std::io::Result<BodyReader> {
        match self.status {
            None => Err(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                format!("connection to {} is not connected", self.url),
            )),
            Some(status) if status >= 400 => Err(std::io::Error::other(format!(
                "server returned HTTP {status} for {}",
                self.url
            ))),
            Some(_) => self
                .response
                .take()
                .map(|response| Box::new(response) as BodyReader)
                .ok_or_else(|| std::io::Error::other("response body was already taken")),
        }
    }

    fn error_stream(&mut self) -> Option<BodyReader> {
        self.response
            .take()
            .map(|response| Box::new(response) as BodyReader)
    }

    fn close(&mut self) {
        if self.response.take().is_some() {
            debug!("Released unread body of {}", self.url);
        }
    }
}
