//! Charset resolution and text decoding.

use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_8};
use log::warn;
use reqwest::header::CONTENT_TYPE;

use super::Response;
use crate::error_handling::{Error, Result};

/// Extracts the `charset` parameter of a `Content-Type` value.
///
/// The parameter name matches case-insensitively; surrounding quotes are stripped.
pub(crate) fn charset_param(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"'))
    })
}

pub(crate) fn lookup(label: &str) -> Result<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| Error::UnsupportedCharset(label.to_string()))
}

/// Splits `bytes` into the longest prefix that decodes cleanly and the remaining
/// tail of up to three bytes, which may be an incomplete multi-byte sequence.
///
/// Falls back to lossy decoding of everything when no split works.
pub(crate) fn split_decodable<'b>(
    encoding: &'static Encoding,
    bytes: &'b [u8],
) -> (Cow<'b, str>, &'b [u8]) {
    for held_back in 0..=bytes.len().min(3) {
        let end = bytes.len() - held_back;
        if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(&bytes[..end]) {
            return (text, &bytes[end..]);
        }
    }
    (encoding.decode_without_bom_handling(bytes).0, &[])
}

impl Response {
    /// Encoding used to decode text.
    ///
    /// Resolution order: the override from [`set_encoding`](Response::set_encoding),
    /// then the `charset` parameter of `Content-Type`, then UTF-8. An unknown
    /// `Content-Type` charset is logged and falls back to UTF-8. Connects if no
    /// override is set.
    pub fn encoding(&mut self) -> Result<&'static Encoding> {
        if let Some(label) = &self.charset {
            return lookup(label);
        }
        let url = self.url.clone();
        let declared = self
            .header(CONTENT_TYPE.as_str())?
            .and_then(charset_param)
            .map(str::to_string);
        Ok(match declared {
            Some(label) => lookup(&label).unwrap_or_else(|_| {
                warn!("Unknown charset {label:?} declared by {url}, decoding as UTF-8");
                UTF_8
            }),
            None => UTF_8,
        })
    }

    /// Overrides the charset used for text decoding.
    ///
    /// Already buffered bytes are decoded again on the next [`text`](Response::text)
    /// call; nothing is fetched again.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedCharset`] when `label` names no known encoding. The
    /// previous charset stays in effect.
    pub fn set_encoding(&mut self, label: &str) -> Result<()> {
        lookup(label)?;
        self.charset = Some(label.to_string());
        Ok(())
    }

    /// Body decoded as text with the active encoding. Buffers the body if needed.
    ///
    /// The decoded text is cached per encoding.
    pub fn text(&mut self) -> Result<&str> {
        let encoding = self.encoding()?;
        let cached = matches!(&self.text, Some((used, _)) if *used == encoding);
        if !cached {
            let decoded = encoding.decode_with_bom_removal(self.content()?).0.into_owned();
            self.text = Some((encoding, decoded));
        }
        Ok(self
            .text
            .as_ref()
            .map(|(_, text)| text.as_str())
            .unwrap_or_default())
    }
}
