//! Connection preparation pipeline.
//!
//! Every connection is prepared by one deterministic pass over an ordered, immutable
//! list of [`PrepareStep`]s before it connects:
//!
//! 1. [`SetMethod`]: force the request verb and check the transport took it
//! 2. [`ApplyHeaders`]: request headers, authorization, default User-Agent
//! 3. [`ApplyCookies`]: explicit cookies merged over the hop's accumulated jar
//! 4. [`ApplyTimeouts`]: connect and read timeout, same value
//! 5. [`DisableRedirects`]: the transport never follows redirects on its own
//!
//! Custom steps run next, then the body steps close the pipeline:
//!
//! 6. [`WriteBody`]: raw bytes, or a file/reader streamed in 4 KiB slices
//! 7. [`WriteJson`]: JSON payload when there is no other body
//! 8. [`WriteMultipart`]: file attachments streamed as `multipart/form-data`
//!
//! Streamed bodies are handed to the connection as a source and read while it
//! connects, so a file or reader is never held in memory as a whole.

use std::fs::File;
use std::io::{self, Cursor, Read, Write};
use std::sync::Arc;
use std::time::Duration;

use log::debug;

use crate::config::{ClientConfig, JSON_CONTENT_TYPE, OCTET_STREAM_CONTENT_TYPE, STREAM_CHUNK_SIZE};
use crate::cookies::CookieJar;
use crate::error_handling::{Error, Result};
use crate::request::{Body, Request};
use crate::transport::Connection;

/// Everything a step can see and touch while preparing one connection.
pub struct StepContext<'a> {
    /// Request of the hop being prepared
    pub request: &'a Request,
    /// Unconnected transport connection
    pub connection: &'a mut dyn Connection,
    /// Cookies accumulated on the hop's response so far
    pub cookies: &'a CookieJar,
    /// Client defaults
    pub config: &'a ClientConfig,
}

/// One preparation step.
///
/// Implemented for closures; [`from_fn`] boxes one so custom steps can be written
/// inline:
///
/// ```
/// use hopline::{pipeline, Client, ClientConfig, ReqwestTransport};
///
/// let client = Client::new(ReqwestTransport::new(), ClientConfig::default())
///     .with_steps(vec![pipeline::from_fn(|ctx| {
///         ctx.connection.set_header("X-Request-Source", "batch")
///     })]);
/// # let _ = client;
/// ```
pub trait PrepareStep: Send + Sync {
    fn apply(&self, ctx: &mut StepContext<'_>) -> Result<()>;
}

impl<F> PrepareStep for F
where
    F: Fn(&mut StepContext<'_>) -> Result<()> + Send + Sync,
{
    fn apply(&self, ctx: &mut StepContext<'_>) -> Result<()> {
        self(ctx)
    }
}

/// Boxes a closure as a [`PrepareStep`].
pub fn from_fn<F>(f: F) -> Box<dyn PrepareStep>
where
    F: Fn(&mut StepContext<'_>) -> Result<()> + Send + Sync + 'static,
{
    Box::new(f)
}

/// Ordered, immutable list of preparation steps.
#[derive(Clone)]
pub struct Pipeline {
    steps: Arc<[Arc<dyn PrepareStep>]>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Pipeline::with_custom(Vec::new())
    }
}

impl Pipeline {
    /// Builds the default pipeline with `custom` steps placed after the
    /// configuration steps and before the body steps.
    pub fn with_custom(custom: Vec<Box<dyn PrepareStep>>) -> Self {
        let mut steps: Vec<Arc<dyn PrepareStep>> = vec![
            Arc::new(SetMethod),
            Arc::new(ApplyHeaders),
            Arc::new(ApplyCookies),
            Arc::new(ApplyTimeouts),
            Arc::new(DisableRedirects),
        ];
        steps.extend(custom.into_iter().map(Arc::from));
        steps.push(Arc::new(WriteBody));
        steps.push(Arc::new(WriteJson));
        steps.push(Arc::new(WriteMultipart));
        Pipeline {
            steps: steps.into(),
        }
    }

    /// Number of steps, built-in ones included.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs every step in order, stopping at the first error.
    pub fn run(&self, ctx: &mut StepContext<'_>) -> Result<()> {
        for step in self.steps.iter() {
            step.apply(ctx)?;
        }
        debug!(
            "Prepared {} {} ({} steps)",
            ctx.request.method(),
            ctx.request.effective_url(),
            self.steps.len()
        );
        Ok(())
    }
}

/// Forces the transport verb to the request's method.
pub struct SetMethod;

impl PrepareStep for SetMethod {
    fn apply(&self, ctx: &mut StepContext<'_>) -> Result<()> {
        let requested = ctx.request.method();
        ctx.connection.set_method(requested)?;
        let effective = ctx.connection.method();
        if effective != requested {
            return Err(Error::MethodMismatch {
                requested: requested.to_string(),
                effective: effective.to_string(),
            });
        }
        Ok(())
    }
}

/// Applies request headers verbatim, then authorization and the default User-Agent
/// when the request does not set them itself.
pub struct ApplyHeaders;

impl PrepareStep for ApplyHeaders {
    fn apply(&self, ctx: &mut StepContext<'_>) -> Result<()> {
        for (name, value) in ctx.request.headers() {
            ctx.connection.set_header(name, value)?;
        }
        if let Some(auth) = ctx.request.authorization() {
            if !ctx.connection.has_header("authorization") {
                ctx.connection
                    .set_header("Authorization", &auth.header_value())?;
            }
        }
        if !ctx.connection.has_header("user-agent") {
            ctx.connection
                .set_header("User-Agent", &ctx.config.user_agent)?;
        }
        Ok(())
    }
}

/// Sends the request's explicit cookies layered over the hop's accumulated jar.
pub struct ApplyCookies;

impl PrepareStep for ApplyCookies {
    fn apply(&self, ctx: &mut StepContext<'_>) -> Result<()> {
        let explicit = ctx.request.explicit_cookies();
        if explicit.is_empty() {
            return Ok(());
        }
        if let Some(value) = ctx.cookies.merge(explicit).header_value() {
            ctx.connection.set_header("Cookie", &value)?;
        }
        Ok(())
    }
}

/// Uses the request timeout (or the client default) for connect and read.
pub struct ApplyTimeouts;

impl PrepareStep for ApplyTimeouts {
    fn apply(&self, ctx: &mut StepContext<'_>) -> Result<()> {
        let seconds = ctx
            .request
            .timeout_seconds()
            .unwrap_or(ctx.config.timeout_seconds);
        let timeout =
            Duration::try_from_secs_f64(seconds).map_err(|_| Error::InvalidTimeout(seconds))?;
        ctx.connection.set_connect_timeout(timeout);
        ctx.connection.set_read_timeout(timeout);
        Ok(())
    }
}

/// Turns off the transport's own redirect following.
pub struct DisableRedirects;

impl PrepareStep for DisableRedirects {
    fn apply(&self, ctx: &mut StepContext<'_>) -> Result<()> {
        ctx.connection.set_follow_redirects(false);
        Ok(())
    }
}

/// Writes a raw body in full, or streams a file/reader body when there are no file
/// attachments.
pub struct WriteBody;

impl PrepareStep for WriteBody {
    fn apply(&self, ctx: &mut StepContext<'_>) -> Result<()> {
        let request = ctx.request;
        if has_body(request) && !request.files().is_empty() {
            return Err(Error::ConflictingBody);
        }

        match request.body_payload() {
            Some(Body::Bytes(bytes)) if !bytes.is_empty() => {
                ctx.connection.output()?.write_all(bytes)?;
            }
            Some(Body::File(path)) => {
                let file = File::open(path)?;
                let len = file.metadata()?.len();
                ctx.connection
                    .stream_body(Box::new(Bounded::new(file)), Some(len))?;
                debug!("Streaming {len} bytes from {}", path.display());
            }
            Some(Body::Reader(reader)) => match reader.take() {
                Some(reader) => {
                    ctx.connection
                        .stream_body(Box::new(Bounded::new(reader)), None)?;
                    debug!("Streaming reader body");
                }
                None => debug!("Reader body already consumed, sending no body"),
            },
            _ => {}
        }
        Ok(())
    }
}

/// Serializes the JSON payload when the request has no other body.
pub struct WriteJson;

impl PrepareStep for WriteJson {
    fn apply(&self, ctx: &mut StepContext<'_>) -> Result<()> {
        let request = ctx.request;
        let Some(json) = request.json_payload() else {
            return Ok(());
        };
        if has_body(request) || !request.files().is_empty() {
            return Ok(());
        }
        let bytes = serde_json::to_vec(json)?;
        if !ctx.connection.has_header("content-type") {
            ctx.connection
                .set_header("Content-Type", JSON_CONTENT_TYPE)?;
        }
        ctx.connection.output()?.write_all(&bytes)?;
        Ok(())
    }
}

/// Streams file attachments as a `multipart/form-data` body.
///
/// Every file is opened up front so a missing one fails before connecting; the
/// contents are read while the connection sends.
pub struct WriteMultipart;

impl PrepareStep for WriteMultipart {
    fn apply(&self, ctx: &mut StepContext<'_>) -> Result<()> {
        let files = ctx.request.files();
        if files.is_empty() {
            return Ok(());
        }

        let boundary = format!("hopline-{:016x}", rand::random::<u64>());
        ctx.connection.set_header(
            "Content-Type",
            &format!("multipart/form-data; boundary={boundary}"),
        )?;

        let mut source: Box<dyn Read + Send> = Box::new(io::empty());
        let mut len = 0u64;
        for attachment in files {
            let head = format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {OCTET_STREAM_CONTENT_TYPE}\r\n\r\n",
                attachment.field,
                attachment.file_name()
            );
            let file = File::open(&attachment.path)?;
            len += head.len() as u64 + file.metadata()?.len() + 2;
            source = Box::new(
                source
                    .chain(Cursor::new(head.into_bytes()))
                    .chain(file)
                    .chain(&b"\r\n"[..]),
            );
        }
        let closing = format!("--{boundary}--\r\n");
        len += closing.len() as u64;
        source = Box::new(source.chain(Cursor::new(closing.into_bytes())));

        ctx.connection
            .stream_body(Box::new(Bounded::new(source)), Some(len))?;
        debug!("Streaming {} multipart attachment(s), {len} bytes", files.len());
        Ok(())
    }
}

/// Non-empty raw bytes, a file, or a reader.
fn has_body(request: &Request) -> bool {
    match request.body_payload() {
        Some(Body::Bytes(bytes)) => !bytes.is_empty(),
        Some(Body::File(_)) | Some(Body::Reader(_)) => true,
        None => false,
    }
}

/// Caps every read at [`STREAM_CHUNK_SIZE`] bytes, however large the caller's
/// buffer.
struct Bounded<R> {
    inner: R,
}

impl<R: Read> Bounded<R> {
    fn new(inner: R) -> Self {
        Bounded { inner }
    }
}

impl<R: Read> Read for Bounded<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(STREAM_CHUNK_SIZE);
        self.inner.read(&mut buf[..n])
    }
}
