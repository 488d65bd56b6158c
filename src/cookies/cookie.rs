//! A single cookie parsed from a `Set-Cookie` line.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A cookie as received in a `Set-Cookie` header.
///
/// Attributes are stored with lower-cased keys. Flag attributes such as `Secure`
/// or `HttpOnly` carry no value. Attributes are kept for inspection only; nothing
/// in the client enforces domain, path or expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    name: String,
    value: String,
    attributes: BTreeMap<String, Option<String>>,
}

impl Cookie {
    /// Creates a cookie without attributes.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Cookie {
            name: name.into(),
            value: value.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Parses one `Set-Cookie` header value.
    ///
    /// The first `;`-separated segment is `name=value`; every following segment is
    /// either `attr` or `attr=value`. Returns `None` when the name is empty.
    ///
    /// ```
    /// use hopline::Cookie;
    ///
    /// let cookie = Cookie::parse("session=abc123; Path=/; HttpOnly").unwrap();
    /// assert_eq!(cookie.name(), "session");
    /// assert_eq!(cookie.value(), "abc123");
    /// assert_eq!(cookie.path(), Some("/"));
    /// assert!(cookie.is_http_only());
    /// ```
    pub fn parse(line: &str) -> Option<Cookie> {
        let mut segments = line.split(';');
        let pair = segments.next()?.trim();
        let (name, value) = match pair.split_once('=') {
            Some((name, value)) => (name.trim(), value.trim()),
            None => (pair, ""),
        };
        if name.is_empty() {
            return None;
        }

        let mut cookie = Cookie::new(name, value);
        for segment in segments {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            match segment.split_once('=') {
                Some((key, value)) => cookie
                    .attributes
                    .insert(key.trim().to_ascii_lowercase(), Some(value.trim().to_string())),
                None => cookie.attributes.insert(segment.to_ascii_lowercase(), None),
            };
        }
        Some(cookie)
    }

    /// Cookie name (case-sensitive).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw cookie value (not URL-decoded).
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Looks up an attribute by case-insensitive name.
    ///
    /// Returns `Some(None)` for a flag attribute, `Some(Some(v))` for a valued one.
    pub fn attribute(&self, name: &str) -> Option<Option<&str>> {
        self.attributes
            .get(&name.to_ascii_lowercase())
            .map(|value| value.as_deref())
    }

    /// All attributes, keyed by lower-cased name.
    pub fn attributes(&self) -> &BTreeMap<String, Option<String>> {
        &self.attributes
    }

    /// The `Domain` attribute.
    pub fn domain(&self) -> Option<&str> {
        self.attribute("domain").flatten()
    }

    /// The `Path` attribute.
    pub fn path(&self) -> Option<&str> {
        self.attribute("path").flatten()
    }

    /// The `Expires` attribute, unparsed.
    pub fn expires(&self) -> Option<&str> {
        self.attribute("expires").flatten()
    }

    pub fn is_secure(&self) -> bool {
        self.attribute("secure").is_some()
    }

    pub fn is_http_only(&self) -> bool {
        self.attribute("httponly").is_some()
    }
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}
