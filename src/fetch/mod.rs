//! Request execution.
//!
//! A [`Client`] owns the transport, the preparation pipeline and the defaults. It
//! turns a [`Request`] into a [`Response`], either lazily ([`Client::prepare`]) or
//! with the redirect chain resolved ([`Client::send`]).

pub mod pipeline;
mod redirects;
mod response;


use std::sync::Arc;

use crate::config::ClientConfig;
use crate::error_handling::Result;
use crate::request::Request;
use crate::transport::{ReqwestTransport, Transport};

use pipeline::{Pipeline, PrepareStep};

pub use response::{Chunks, Lines, Response};

/// Executes requests over a [`Transport`].
///
/// Cloning is cheap: clones share the transport, pipeline and configuration.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    pipeline: Pipeline,
    config: Arc<ClientConfig>,
}

impl Default for Client {
    fn default() -> Self {
        Client::new(ReqwestTransport::new(), ClientConfig::default())
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("steps", &self.pipeline.len())
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a client with the default preparation pipeline.
    pub fn new(transport: impl Transport + 'static, config: ClientConfig) -> Self {
        Client {
            transport: Arc::new(transport),
            pipeline: Pipeline::default(),
            config: Arc::new(config),
        }
    }

    /// Rebuilds the pipeline with `steps` placed after the configuration steps and
    /// before the body-writing steps. Replaces steps set by an earlier call.
    pub fn with_steps(mut self, steps: Vec<Box<dyn PrepareStep>>) -> Self {
        self.pipeline = Pipeline::with_custom(steps);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub(crate) fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Returns an unconnected response for `request`.
    ///
    /// Nothing happens on the network until a connection-derived property is read.
    /// Redirects are not followed: a 3xx status is observable as is.
    pub fn prepare(&self, request: Request) -> Response {
        Response::new(
            self.clone(),
            request,
            crate::cookies::CookieJar::new(),
            Vec::new(),
        )
    }

    /// Sends `request`, following redirects as its policy allows.
    ///
    /// The terminal response is fully buffered, or only connected for streaming
    /// requests.
    pub fn send(&self, request: Request) -> Result<Response> {
        redirects::resolve_redirect_chain(self, request)
    }
}
