//! Cookies: [`Cookie`] parsing and the per-exchange [`CookieJar`].

mod cookie;
mod jar;

pub use cookie::Cookie;
pub use jar::CookieJar;
