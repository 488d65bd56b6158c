// In-memory transport for unit tests.
//
// Serves scripted replies keyed by URL and records every connection the resolver
// prepares, so tests can check what went over the "wire" and how many times.

use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

use super::{BodyReader, Connection, ResponseHead, Transport};
use crate::error_handling::{Error, Result};

#[derive(Debug, Clone)]
pub(crate) struct MockReply {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    // Largest number of bytes a single read returns
    pub read_limit: Option<usize>,
    // Body offset at which one read fails with a timeout
    pub fail_at: Option<usize>,
}

impl MockReply {
    pub fn new(status: u16) -> Self {
        MockReply {
            status,
            headers: Vec::new(),
            body: Vec::new(),
            read_limit: None,
            fail_at: None,
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn read_limit(mut self, limit: usize) -> Self {
        self.read_limit = Some(limit);
        self
    }

    pub fn fail_at(mut self, offset: usize) -> Self {
        self.fail_at = Some(offset);
        self
    }

    pub fn redirect(status: u16, location: &str) -> Self {
        MockReply::new(status).header("Location", location)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Recorded {
    pub url: Url,
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub connect_timeout: Option<Duration>,
    pub read_timeout: Option<Duration>,
    pub follow_redirects: bool,
    pub output_enabled: bool,
    pub body: Vec<u8>,
    // Set when the body came from a streaming source
    pub streamed: bool,
    pub body_length: Option<u64>,
    pub largest_body_read: usize,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Clone, Default)]
pub(crate) struct MockTransport {
    routes: Arc<Mutex<HashMap<String, MockReply>>>,
    recorded: Arc<Mutex<Vec<Recorded>>>,
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
    // When set, set_method is ignored and this verb is reported instead
    pinned_method: Option<String>,
}

impl MockTransport {
    pub fn new() -> Self {
        MockTransport::default()
    }

    pub fn route(self, url: &str, reply: MockReply) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), reply);
        self
    }

    pub fn pin_method(mut self, method: &str) -> Self {
        self.pinned_method = Some(method.to_string());
        self
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Connections released through `Connection::close`.
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.recorded.lock().unwrap().clone()
    }
}

impl Transport for MockTransport {
    fn open(&self, url: &Url) -> Result<Box<dyn Connection>> {
        if !super::is_http_scheme(url) {
            return Err(Error::UnsupportedScheme(url.scheme().to_string()));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        let reply = self
            .routes
            .lock()
            .unwrap()
            .get(url.as_str())
            .cloned()
            .unwrap_or_else(|| MockReply::new(404));
        Ok(Box::new(MockConnection {
            reply,
            pinned_method: self.pinned_method.clone(),
            sink: Arc::clone(&self.recorded),
            closed: Arc::clone(&self.closed),
            recorded: Recorded {
                url: url.clone(),
                method: "GET".to_string(),
                headers: Vec::new(),
                connect_timeout: None,
                read_timeout: None,
                follow_redirects: true,
                output_enabled: false,
                body: Vec::new(),
                streamed: false,
                body_length: None,
                largest_body_read: 0,
            },
            source: None,
            connected: false,
            body_taken: false,
        }))
    }
}

struct MockConnection {
    reply: MockReply,
    pinned_method: Option<String>,
    sink: Arc<Mutex<Vec<Recorded>>>,
    closed: Arc<AtomicUsize>,
    recorded: Recorded,
    source: Option<BodyReader>,
    connected: bool,
    body_taken: bool,
}

impl MockConnection {
    fn take_body(&mut self) -> Option<BodyReader> {
        if self.body_taken {
            return None;
        }
        self.body_taken = true;
        let mut reader: BodyReader = Box::new(Flaky {
            inner: Cursor::new(self.reply.body.clone()),
            served: 0,
            fail_at: self.reply.fail_at,
        });
        if let Some(limit) = self.reply.read_limit {
            reader = Box::new(Trickle { inner: reader, limit });
        }
        Some(reader)
    }

    // Reads the streaming source the way a socket writer would, one buffer at a time
    fn drain_source(&mut self) -> std::io::Result<()> {
        let Some(mut source) = self.source.take() else {
            return Ok(());
        };
        let mut buf = vec![0u8; 64 * 1024];
        loop {
            let n = source.read(&mut buf)?;
            if n == 0 {
                return Ok(());
            }
            self.recorded.largest_body_read = self.recorded.largest_body_read.max(n);
            self.recorded.body.extend_from_slice(&buf[..n]);
        }
    }
}

impl Connection for MockConnection {
    fn set_method(&mut self, method: &str) -> Result<()> {
        if self.pinned_method.is_none() {
            self.recorded.method = method.to_string();
        }
        Ok(())
    }

    fn method(&self) -> &str {
        self.pinned_method
            .as_deref()
            .unwrap_or(&self.recorded.method)
    }

    fn set_header(&mut self, name: &str, value: &str) -> Result<()> {
        self.recorded
            .headers
            .retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
        self.recorded
            .headers
            .push((name.to_string(), value.to_string()));
        Ok(())
    }

    fn has_header(&self, name: &str) -> bool {
        self.recorded.header(name).is_some()
    }

    fn set_connect_timeout(&mut self, timeout: Duration) {
        self.recorded.connect_timeout = Some(timeout);
    }

    fn set_read_timeout(&mut self, timeout: Duration) {
        self.recorded.read_timeout = Some(timeout);
    }

    fn set_follow_redirects(&mut self, follow: bool) {
        self.recorded.follow_redirects = follow;
    }

    fn output(&mut self) -> Result<&mut dyn Write> {
        if self.recorded.streamed {
            return Err(Error::ConflictingBody);
        }
        self.recorded.output_enabled = true;
        Ok(&mut self.recorded.body)
    }

    fn stream_body(&mut self, source: BodyReader, len: Option<u64>) -> Result<()> {
        if self.recorded.output_enabled {
            return Err(Error::ConflictingBody);
        }
        self.recorded.output_enabled = true;
        self.recorded.streamed = true;
        self.recorded.body_length = len;
        self.source = Some(source);
        Ok(())
    }

    fn connect(&mut self) -> Result<ResponseHead> {
        assert!(!self.connected, "mock connection connected twice");
        self.connected = true;
        self.drain_source()?;
        if let Some(method) = &self.pinned_method {
            self.recorded.method = method.clone();
        }
        self.sink.lock().unwrap().push(self.recorded.clone());

        let mut headers = HeaderMap::new();
        for (name, value) in &self.reply.headers {
            headers.append(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        Ok(ResponseHead {
            status: self.reply.status,
            headers,
        })
    }

    fn input_stream(&mut self) -> std::io::Result<BodyReader> {
        if self.reply.status >= 400 {
            return Err(std::io::Error::other(format!(
                "server returned HTTP {}",
                self.reply.status
            )));
        }
        self.take_body()
            .ok_or_else(|| std::io::Error::other("body already taken"))
    }

    fn error_stream(&mut self) -> Option<BodyReader> {
        self.take_body()
    }

    fn close(&mut self) {
        if !self.body_taken {
            self.body_taken = true;
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

// Hands out at most `limit` bytes per read, like a slow socket
struct Trickle<R> {
    inner: R,
    limit: usize,
}

impl<R: Read> Read for Trickle<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = buf.len().min(self.limit);
        self.inner.read(&mut buf[..n])
    }
}

// Fails a single read with a timeout once `fail_at` bytes have been served
struct Flaky<R> {
    inner: R,
    served: usize,
    fail_at: Option<usize>,
}

impl<R: Read> Read for Flaky<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let room = match self.fail_at {
            Some(at) if self.served >= at => {
                self.fail_at = None;
                return Err(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "read timed out",
                ));
            }
            Some(at) => buf.len().min(at - self.served),
            None => buf.len(),
        };
        let n = self.inner.read(&mut buf[..room])?;
        self.served += n;
        Ok(n)
    }
}
