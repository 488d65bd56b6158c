//! One hop of a resolved request.
//!
//! A [`Response`] connects lazily: the first call that needs the status line, the
//! headers or the cookies opens the transport connection, runs the preparation
//! pipeline and connects. That happens at most once per response. The body is read
//! through the content accessors in [`content`] and the iterators in [`iter`].

mod charset;
mod content;
mod iter;

use encoding_rs::Encoding;
use log::{debug, warn};
use reqwest::header::{HeaderMap, LOCATION};
use url::Url;

use super::pipeline::StepContext;
use super::Client;
use crate::config::REDIRECT_STATUSES;
use crate::cookies::CookieJar;
use crate::error_handling::{Error, Result};
use crate::request::Request;
use crate::transport::{BodyReader, Connection, ResponseHead};

pub use iter::{Chunks, Lines};

struct Connected {
    connection: Box<dyn Connection>,
    head: ResponseHead,
}

enum ConnectionState {
    Unconnected,
    Connected(Box<Connected>),
}

enum BodyState {
    Unopened,
    Open(BodyReader),
    Closed,
}

/// Response to one hop of a request.
///
/// Accessors that may touch the network take `&mut self`. A response has a single
/// owner and no internal locking.
pub struct Response {
    client: Client,
    request: Request,
    url: Url,
    state: ConnectionState,
    cookies: CookieJar,
    history: Vec<Response>,
    body: BodyState,
    content: Option<Vec<u8>>,
    charset: Option<String>,
    text: Option<(&'static Encoding, String)>,
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match &self.state {
            ConnectionState::Connected(connected) => Some(connected.head.status),
            ConnectionState::Unconnected => None,
        };
        f.debug_struct("Response")
            .field("method", &self.request.method())
            .field("url", &self.url.as_str())
            .field("status", &status)
            .field("history", &self.history.len())
            .finish_non_exhaustive()
    }
}

impl Response {
    pub(crate) fn new(
        client: Client,
        request: Request,
        cookies: CookieJar,
        history: Vec<Response>,
    ) -> Self {
        let url = request.effective_url();
        Response {
            client,
            request,
            url,
            state: ConnectionState::Unconnected,
            cookies,
            history,
            body: BodyState::Unopened,
            content: None,
            charset: None,
            text: None,
        }
    }

    /// URL of this hop, query parameters included.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Request this hop was made with.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Prior hops of the redirect chain, oldest first.
    pub fn history(&self) -> &[Response] {
        &self.history
    }

    pub(crate) fn take_history(&mut self) -> Vec<Response> {
        std::mem::take(&mut self.history)
    }

    /// Whether the transport connection has been established.
    pub fn is_connected(&self) -> bool {
        matches!(self.state, ConnectionState::Connected(_))
    }

    /// HTTP status code. Connects if needed.
    pub fn status(&mut self) -> Result<u16> {
        Ok(self.connected()?.head.status)
    }

    /// Response headers. Connects if needed.
    pub fn headers(&mut self) -> Result<&HeaderMap> {
        Ok(&self.connected()?.head.headers)
    }

    /// First value of a header, if present and valid UTF-8. Connects if needed.
    pub fn header(&mut self, name: &str) -> Result<Option<&str>> {
        Ok(self
            .headers()?
            .get(name)
            .and_then(|value| value.to_str().ok()))
    }

    /// Cookies of this hop: those carried in from earlier hops plus every
    /// `Set-Cookie` of this response. Connects if needed.
    pub fn cookies(&mut self) -> Result<&CookieJar> {
        self.connected()?;
        Ok(&self.cookies)
    }

    pub(crate) fn cookie_jar(&self) -> &CookieJar {
        &self.cookies
    }

    /// `true` for a redirect status with a `Location` header. Connects if needed.
    pub fn is_redirect(&mut self) -> Result<bool> {
        let head = &self.connected()?.head;
        Ok(REDIRECT_STATUSES.contains(&head.status) && head.headers.contains_key(LOCATION))
    }

    /// Target of a redirect response, resolved against this hop's URL.
    ///
    /// `None` when the status is not a redirect. A redirect status without a usable
    /// `Location` is logged and treated as terminal.
    pub(crate) fn redirect_target(&mut self) -> Result<Option<Url>> {
        let head = &self.connected()?.head;
        if !REDIRECT_STATUSES.contains(&head.status) {
            return Ok(None);
        }
        let status = head.status;
        let location = head
            .headers
            .get(LOCATION)
            .map(|value| value.to_str().map(str::to_string));
        match location {
            Some(Ok(location)) => Ok(Some(self.url.join(&location)?)),
            Some(Err(_)) => {
                warn!("Redirect status {status} for {} with a non-UTF-8 Location header", self.url);
                Ok(None)
            }
            None => {
                warn!("Redirect status {status} for {} but no Location header", self.url);
                Ok(None)
            }
        }
    }

    /// Closes the body and releases the connection behind it. Status, headers and
    /// cookies stay available; unbuffered content does not.
    pub(crate) fn release(&mut self) {
        if let BodyState::Open(_) = self.body {
            debug!("Dropping open body stream of {}", self.url);
        }
        self.body = BodyState::Closed;
        if let ConnectionState::Connected(connected) = &mut self.state {
            connected.connection.close();
        }
    }

    fn connected(&mut self) -> Result<&mut Connected> {
        if let ConnectionState::Unconnected = self.state {
            let connected = self.establish()?;
            self.state = ConnectionState::Connected(Box::new(connected));
        }
        match &mut self.state {
            ConnectionState::Connected(connected) => Ok(&mut **connected),
            ConnectionState::Unconnected => Err(Error::InconsistentState(
                "connection missing after connect",
            )),
        }
    }

    fn establish(&mut self) -> Result<Connected> {
        let mut connection = self.client.transport().open(&self.url)?;
        let mut ctx = StepContext {
            request: &self.request,
            connection: connection.as_mut(),
            cookies: &self.cookies,
            config: self.client.config(),
        };
        self.client.pipeline().run(&mut ctx)?;
        let head = connection.connect()?;
        debug!(
            "Connected {} {} -> {}",
            self.request.method(),
            self.url,
            head.status
        );

        let received = CookieJar::from_headers(&head.headers);
        if !received.is_empty() {
            debug!("Captured {} cookie(s) from {}", received.len(), self.url);
            self.cookies = self.cookies.merge(&received);
        }
        Ok(Connected { connection, head })
    }
}
