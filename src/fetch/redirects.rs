//! HTTP redirect chain resolution.
//!
//! The transport never follows redirects itself. Each hop is connected, inspected
//! and, when its status is a redirect and the request allows it, replaced by a new
//! hop for the resolved `Location`. Prior hops move into the new hop's history.

use log::debug;

use super::response::Response;
use super::Client;
use crate::cookies::CookieJar;
use crate::error_handling::{Error, Result};
use crate::request::Request;

/// Resolves the redirect chain starting at `request` and returns the terminal hop.
///
/// Every hop is connected; non-streaming hops are also buffered. Streaming hops
/// that redirect are released before the next hop connects. The request's
/// redirect policy decides whether redirects are followed, deferring to the
/// client default when unset.
///
/// # Errors
///
/// Returns an error if a hop fails to connect or read, a `Location` cannot be
/// resolved, or the chain grows past `max_redirects` hops.
pub(crate) fn resolve_redirect_chain(client: &Client, request: Request) -> Result<Response> {
    let follow = request
        .redirect_policy()
        .unwrap_or(client.config().follow_redirects);
    let max_hops = client.config().max_redirects;
    let stream = request.is_stream();
    let explicit = request.explicit_cookies().clone();
    let original = request.clone();

    let mut current = Response::new(client.clone(), request, CookieJar::new(), Vec::new());
    loop {
        current.status()?;
        if !stream {
            current.content()?;
        }
        if !follow {
            break;
        }
        let Some(target) = current.redirect_target()? else {
            break;
        };
        if current.history().len() >= max_hops {
            return Err(Error::TooManyRedirects { max: max_hops });
        }

        debug!(
            "Following redirect {} -> {} (hop {})",
            current.url(),
            target,
            current.history().len() + 1
        );
        let jar = current.cookie_jar().clone();
        let next = original.redirected(target, jar.merge(&explicit));
        if stream {
            current.release();
        }
        let mut history = current.take_history();
        history.push(current);
        current = Response::new(client.clone(), next, jar, history);
    }
    Ok(current)
}
