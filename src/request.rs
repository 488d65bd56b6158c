//! Immutable description of an HTTP call.
//!
//! A [`Request`] is built once with the consuming builder methods and never mutated
//! afterwards. Redirect hops get their own copy with an updated URL.

use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use url::Url;

use crate::cookies::{Cookie, CookieJar};
use crate::error_handling::Result;

/// Request body payload.
///
/// Mutually exclusive with multipart file attachments.
#[derive(Debug, Clone)]
pub enum Body {
    /// Raw bytes, written in full.
    Bytes(Vec<u8>),
    /// A file, opened and streamed on every hop that sends it.
    File(PathBuf),
    /// A reader, streamed once. A redirected hop finds it already drained.
    Reader(ReaderBody),
}

/// One-shot reader shared between copies of a request.
#[derive(Clone)]
pub struct ReaderBody(Arc<Mutex<Option<Box<dyn Read + Send>>>>);

impl ReaderBody {
    pub fn new(reader: impl Read + Send + 'static) -> Self {
        ReaderBody(Arc::new(Mutex::new(Some(Box::new(reader)))))
    }

    /// Takes the reader out. Returns `None` once any copy has taken it.
    pub(crate) fn take(&self) -> Option<Box<dyn Read + Send>> {
        match self.0.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}

impl fmt::Debug for ReaderBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ReaderBody(..)")
    }
}

/// Authorization descriptor, sent as the `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    /// HTTP Basic authentication
    Basic {
        /// User name
        username: String,
        /// Password
        password: String,
    },
    /// Bearer token
    Bearer(String),
}

impl Auth {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Auth::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Auth::Bearer(token.into())
    }

    /// Value of the `Authorization` header.
    pub fn header_value(&self) -> String {
        match self {
            Auth::Basic { username, password } => {
                format!("Basic {}", BASE64.encode(format!("{username}:{password}")))
            }
            Auth::Bearer(token) => format!("Bearer {token}"),
        }
    }
}

/// A file sent as one part of a `multipart/form-data` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttachment {
    /// Form field name
    pub field: String,
    /// Path of the file to upload
    pub path: PathBuf,
}

impl FileAttachment {
    /// File name reported in the part's `Content-Disposition`.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.field.clone())
    }
}

/// Immutable description of an HTTP call.
///
/// # Examples
///
/// ```
/// use hopline::Request;
///
/// let request = Request::new("PATCH", "https://example.com/items/7")
///     .unwrap()
///     .header("Accept", "application/json")
///     .param("dry_run", "true")
///     .cookie("session", "abc")
///     .timeout(5.0);
///
/// assert_eq!(request.method(), "PATCH");
/// assert_eq!(request.header_value("accept"), Some("application/json"));
/// assert_eq!(
///     request.effective_url().as_str(),
///     "https://example.com/items/7?dry_run=true"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    method: String,
    url: Url,
    headers: Vec<(String, String)>,
    params: Vec<(String, String)>,
    body: Option<Body>,
    json: Option<serde_json::Value>,
    auth: Option<Auth>,
    cookies: CookieJar,
    timeout: Option<f64>,
    allow_redirects: Option<bool>,
    stream: bool,
    files: Vec<FileAttachment>,
}

impl Request {
    /// Creates a request for `method` and `url`.
    ///
    /// The method is kept verbatim; it is validated when a connection is prepared.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`](crate::Error::InvalidUrl) if `url` does not parse.
    pub fn new(method: impl Into<String>, url: &str) -> Result<Self> {
        Ok(Request::from_url(method, Url::parse(url)?))
    }

    /// Creates a request from an already parsed URL.
    pub fn from_url(method: impl Into<String>, url: Url) -> Self {
        Request {
            method: method.into(),
            url,
            headers: Vec::new(),
            params: Vec::new(),
            body: None,
            json: None,
            auth: None,
            cookies: CookieJar::new(),
            timeout: None,
            allow_redirects: None,
            stream: false,
            files: Vec::new(),
        }
    }

    /// Sets a header, replacing any header with the same case-insensitive name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(entry) => entry.1 = value,
            None => self.headers.push((name, value)),
        }
        self
    }

    /// Appends a query parameter.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Sets a raw byte body.
    pub fn body(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.body = Some(Body::Bytes(bytes.into()));
        self
    }

    /// Streams the file at `path` as the body.
    pub fn body_file(mut self, path: impl AsRef<Path>) -> Self {
        self.body = Some(Body::File(path.as_ref().to_path_buf()));
        self
    }

    /// Streams `reader` as the body.
    pub fn body_reader(mut self, reader: impl Read + Send + 'static) -> Self {
        self.body = Some(Body::Reader(ReaderBody::new(reader)));
        self
    }

    /// Sets a JSON body, sent when no raw body is present.
    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.json = Some(value);
        self
    }

    pub fn auth(mut self, auth: Auth) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Adds an explicit cookie. A later cookie with the same name replaces it.
    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let single: CookieJar = std::iter::once(Cookie::new(name, value)).collect();
        self.cookies = self.cookies.merge(&single);
        self
    }

    /// Merges a whole jar into the explicit cookies.
    pub fn cookies(mut self, jar: &CookieJar) -> Self {
        self.cookies = self.cookies.merge(jar);
        self
    }

    /// Connect and read timeout in seconds.
    pub fn timeout(mut self, seconds: f64) -> Self {
        self.timeout = Some(seconds);
        self
    }

    pub fn allow_redirects(mut self, follow: bool) -> Self {
        self.allow_redirects = Some(follow);
        self
    }

    /// Reads the body lazily from the live connection instead of buffering it.
    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Attaches a file for a `multipart/form-data` upload.
    pub fn file(mut self, field: impl Into<String>, path: impl AsRef<Path>) -> Self {
        self.files.push(FileAttachment {
            field: field.into(),
            path: path.as_ref().to_path_buf(),
        });
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// The URL as given, without query parameters applied.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The URL with query parameters appended.
    ///
    /// Pairs already present in the URL's query are not appended again, so a
    /// redirected copy of the request does not duplicate them.
    pub fn effective_url(&self) -> Url {
        let mut url = self.url.clone();
        let existing: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let missing: Vec<&(String, String)> = self
            .params
            .iter()
            .filter(|pair| !existing.contains(pair))
            .collect();
        if !missing.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in missing {
                pairs.append_pair(name, value);
            }
        }
        url
    }

    /// Headers in insertion order.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Looks up a header by case-insensitive name.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn body_payload(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    pub fn json_payload(&self) -> Option<&serde_json::Value> {
        self.json.as_ref()
    }

    pub fn authorization(&self) -> Option<&Auth> {
        self.auth.as_ref()
    }

    /// Explicit cookies carried by the request.
    pub fn explicit_cookies(&self) -> &CookieJar {
        &self.cookies
    }

    pub fn timeout_seconds(&self) -> Option<f64> {
        self.timeout
    }

    /// Redirect-follow policy; `None` defers to the client default.
    pub fn redirect_policy(&self) -> Option<bool> {
        self.allow_redirects
    }

    pub fn is_stream(&self) -> bool {
        self.stream
    }

    pub fn files(&self) -> &[FileAttachment] {
        &self.files
    }

    /// Copy of this request for a redirect hop.
    ///
    /// Every field is kept except the URL, the redirect policy (forced off so the
    /// hop does not redirect on its own) and the cookies, which become `cookies`.
    pub(crate) fn redirected(&self, url: Url, cookies: CookieJar) -> Request {
        Request {
            url,
            allow_redirects: Some(false),
            cookies,
            ..self.clone()
        }
    }
}
