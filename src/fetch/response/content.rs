//! Body access: raw stream selection, decompression and buffering.

use std::io::Read;

use flate2::read::{GzDecoder, ZlibDecoder};
use log::debug;
use reqwest::header::CONTENT_ENCODING;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::{BodyState, Response};
use crate::error_handling::{Error, Result};
use crate::transport::BodyReader;

/// Wraps `reader` in the decoder named by a `Content-Encoding` value.
///
/// `gzip` and `deflate` (zlib framing) are decoded; any other value passes through.
pub(crate) fn decoder_for(reader: BodyReader, content_encoding: Option<&str>) -> BodyReader {
    match content_encoding.map(|value| value.trim().to_ascii_lowercase()).as_deref() {
        Some("gzip") => Box::new(GzDecoder::new(reader)),
        Some("deflate") => Box::new(ZlibDecoder::new(reader)),
        _ => reader,
    }
}

impl Response {
    /// Decompressed body stream. Connects if needed.
    ///
    /// Reads from the connection's success stream, falling back to its error stream
    /// when the success stream cannot be opened (error statuses). The stream is
    /// opened once and shared by later calls.
    ///
    /// # Errors
    ///
    /// [`Error::BodyConsumed`] once the body has been drained and closed, by
    /// [`content`](Response::content) or a streaming iterator.
    pub fn raw(&mut self) -> Result<&mut (dyn Read + Send)> {
        if let BodyState::Unopened = self.body {
            let reader = self.open_body()?;
            self.body = BodyState::Open(reader);
        }
        match &mut self.body {
            BodyState::Open(reader) => Ok(reader.as_mut()),
            BodyState::Closed => Err(Error::BodyConsumed),
            BodyState::Unopened => Err(Error::InconsistentState("body stream missing after open")),
        }
    }

    /// Moves the raw stream out of the response, leaving the body closed.
    pub(super) fn take_raw(&mut self) -> Result<BodyReader> {
        self.raw()?;
        match std::mem::replace(&mut self.body, BodyState::Closed) {
            BodyState::Open(reader) => Ok(reader),
            _ => Err(Error::InconsistentState("body stream missing after open")),
        }
    }

    fn open_body(&mut self) -> Result<BodyReader> {
        let url = self.url.clone();
        let connected = self.connected()?;
        let reader = match connected.connection.input_stream() {
            Ok(reader) => reader,
            Err(e) => match connected.connection.error_stream() {
                Some(reader) => {
                    debug!("Reading error stream of {url} ({e})");
                    reader
                }
                None => return Err(e.into()),
            },
        };
        let content_encoding = connected
            .head
            .headers
            .get(CONTENT_ENCODING)
            .and_then(|value| value.to_str().ok());
        Ok(decoder_for(reader, content_encoding))
    }

    /// Whole decompressed body. Drains and closes the raw stream on first call.
    ///
    /// A read error closes the stream as well, so later calls fail with
    /// [`Error::BodyConsumed`] instead of returning the rest of the body.
    pub fn content(&mut self) -> Result<&[u8]> {
        let content = match self.content.take() {
            Some(content) => content,
            None => {
                let mut buf = Vec::new();
                let read = self.raw()?.read_to_end(&mut buf);
                self.body = BodyState::Closed;
                if let Err(e) = read {
                    debug!("Discarding {} bytes of {} after read error: {e}", buf.len(), self.url);
                    return Err(e.into());
                }
                debug!("Buffered {} bytes from {}", buf.len(), self.url);
                buf
            }
        };
        Ok(self.content.insert(content).as_slice())
    }

    pub(crate) fn has_content(&self) -> bool {
        self.content.is_some()
    }

    /// Deserializes the body text as JSON.
    pub fn json<T: DeserializeOwned>(&mut self) -> Result<T> {
        Ok(serde_json::from_str(self.text()?)?)
    }

    /// Body as a JSON object.
    pub fn json_object(&mut self) -> Result<Map<String, Value>> {
        self.json()
    }

    /// Body as a JSON array.
    pub fn json_array(&mut self) -> Result<Vec<Value>> {
        self.json()
    }
}
