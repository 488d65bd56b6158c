//! Ordered cookie jar scoped to one exchange.
//!
//! A jar holds at most one cookie per name, in insertion order. The only way to
//! change a jar is to [`merge`](CookieJar::merge) another one into it, which returns
//! a new jar: cookies of the right-hand jar replace same-named cookies in place, new
//! names are appended in the order they appear.

use std::fmt;

use reqwest::header::{HeaderMap, SET_COOKIE};

use super::Cookie;

/// Ordered collection of cookies keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    cookies: Vec<Cookie>,
}

impl CookieJar {
    /// Creates an empty jar.
    pub fn new() -> Self {
        CookieJar::default()
    }

    /// Builds a jar from every `Set-Cookie` header in `headers`.
    ///
    /// Values may carry UTF-8 beyond visible ASCII. Values that are not UTF-8 or have
    /// no cookie name are skipped.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| std::str::from_utf8(value.as_bytes()).ok())
            .filter_map(Cookie::parse)
            .collect()
    }

    /// Returns the union of `self` and `other`, `other` winning on name collisions.
    ///
    /// ```
    /// use hopline::{Cookie, CookieJar};
    ///
    /// let a: CookieJar = [Cookie::new("x", "1"), Cookie::new("y", "2")].into_iter().collect();
    /// let b: CookieJar = [Cookie::new("y", "3"), Cookie::new("z", "4")].into_iter().collect();
    /// assert_eq!(a.merge(&b).to_string(), "x=1; y=3; z=4");
    /// ```
    pub fn merge(&self, other: &CookieJar) -> CookieJar {
        let mut merged = self.clone();
        for cookie in &other.cookies {
            merged.put(cookie.clone());
        }
        merged
    }

    /// Looks up a cookie by exact name.
    pub fn get(&self, name: &str) -> Option<&Cookie> {
        self.cookies.iter().find(|c| c.name() == name)
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Iterates cookies in jar order.
    pub fn iter(&self) -> std::slice::Iter<'_, Cookie> {
        self.cookies.iter()
    }

    /// Serializes the jar as a `Cookie` request header value.
    ///
    /// Returns `None` for an empty jar.
    pub fn header_value(&self) -> Option<String> {
        if self.is_empty() {
            None
        } else {
            Some(self.to_string())
        }
    }

    // Replace existing cookie with same name
    fn put(&mut self, cookie: Cookie) {
        if let Some(existing) = self.cookies.iter_mut().find(|c| c.name() == cookie.name()) {
            *existing = cookie;
        } else {
            self.cookies.push(cookie);
        }
    }
}

impl fmt::Display for CookieJar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, cookie) in self.cookies.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{cookie}")?;
        }
        Ok(())
    }
}

impl FromIterator<Cookie> for CookieJar {
    fn from_iter<I: IntoIterator<Item = Cookie>>(iter: I) -> Self {
        let mut jar = CookieJar::new();
        for cookie in iter {
            jar.put(cookie);
        }
        jar
    }
}

impl<'a> IntoIterator for &'a CookieJar {
    type Item = &'a Cookie;
    type IntoIter = std::slice::Iter<'a, Cookie>;

    fn into_iter(self) -> Self::IntoIter {
        self.cookies.iter()
    }
}
