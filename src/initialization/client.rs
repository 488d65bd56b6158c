//! HTTP client initialization.

use std::time::Duration;

use log::debug;

use crate::config::ClientConfig;
use crate::error_handling::InitializationError;
use crate::fetch::Client;
use crate::transport::ReqwestTransport;

/// Initializes a [`Client`] backed by the blocking reqwest transport.
///
/// The reqwest client for the configured default timeout is built up front, with
/// redirects disabled and rustls as the TLS backend, so TLS setup problems surface
/// here instead of on the first request.
///
/// # Errors
///
/// Returns `InitializationError::HttpClientError` if the reqwest client cannot be
/// built. A non-finite or negative default timeout skips the up-front build; it is
/// reported when a request uses it.
pub fn init_client(config: &ClientConfig) -> Result<Client, InitializationError> {
    let transport = ReqwestTransport::new();
    if let Ok(timeout) = Duration::try_from_secs_f64(config.timeout_seconds) {
        transport.preload(timeout)?;
        debug!("Preloaded reqwest client with {timeout:?} connect and read timeout");
    }
    Ok(Client::new(transport, config.clone()))
}
