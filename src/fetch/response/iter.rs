//! Chunk and line iterators over a response body.

use std::collections::VecDeque;
use std::io::{self, Cursor, Read};

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE};
use log::{debug, trace};
use regex::Regex;

use super::charset::split_decodable;
use super::Response;
use crate::error_handling::Result;

/// Byte chunks of a response body, one read per step.
///
/// Each chunk holds what a single read returned, at most `chunk_size` bytes. The
/// sequence ends at the first empty read or read error, and the stream is dropped
/// at that point. Not restartable.
pub struct Chunks<'a> {
    reader: Option<Box<dyn Read + Send + 'a>>,
    chunk_size: usize,
}

impl<'a> Chunks<'a> {
    pub(crate) fn new(reader: Box<dyn Read + Send + 'a>, chunk_size: usize) -> Self {
        Chunks {
            reader: Some(reader),
            chunk_size: chunk_size.max(1),
        }
    }
}

impl Iterator for Chunks<'_> {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Vec<u8>> {
        let reader = self.reader.as_mut()?;
        let mut buf = vec![0u8; self.chunk_size];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    trace!("Read chunk of {n} bytes");
                    buf.truncate(n);
                    return Some(buf);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!("Ending chunk iteration on read error: {e}");
                    break;
                }
            }
        }
        self.reader = None;
        None
    }
}

/// Delimiter-separated segments of a response body.
///
/// Chunks are decoded with the response's encoding and split on a regular
/// expression. The unterminated tail of the text read so far (the leftover) is
/// carried into the next step; segments split out beyond the first wait in an
/// overflow queue. Segments are yielded re-encoded in the same encoding. An
/// incomplete multi-byte character at a chunk boundary stays undecoded until the
/// next chunk completes it. A trailing empty segment is not yielded.
pub struct Lines<'a> {
    chunks: Chunks<'a>,
    delimiter: Regex,
    encoding: &'static Encoding,
    leftover: Vec<u8>,
    overflow: VecDeque<Vec<u8>>,
}

impl<'a> Lines<'a> {
    pub(crate) fn new(chunks: Chunks<'a>, delimiter: Regex, encoding: &'static Encoding) -> Self {
        Lines {
            chunks,
            delimiter,
            encoding,
            leftover: Vec::new(),
            overflow: VecDeque::new(),
        }
    }
}

/// Encodes `text` in `encoding`. encoding_rs encodes the UTF-16 family as UTF-8,
/// so those two are written out here.
fn encode(encoding: &'static Encoding, text: &str) -> Vec<u8> {
    if encoding == UTF_16LE {
        text.encode_utf16().flat_map(u16::to_le_bytes).collect()
    } else if encoding == UTF_16BE {
        text.encode_utf16().flat_map(u16::to_be_bytes).collect()
    } else {
        encoding.encode(text).0.into_owned()
    }
}

impl Iterator for Lines<'_> {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Vec<u8>> {
        if let Some(segment) = self.overflow.pop_front() {
            return Some(segment);
        }

        let encoding = self.encoding;
        while let Some(chunk) = self.chunks.next() {
            self.leftover.extend_from_slice(&chunk);
            let (segments, consumed) = {
                let (text, tail) = split_decodable(encoding, &self.leftover);
                let mut parts: Vec<&str> = self.delimiter.split(&text).collect();
                if parts.len() < 2 {
                    continue;
                }
                // The leftover stays as raw bytes: the last part plus the undecoded tail
                let last = parts.pop().unwrap_or_default();
                let kept = encode(encoding, last).len() + tail.len();
                let segments: Vec<Vec<u8>> =
                    parts.into_iter().map(|part| encode(encoding, part)).collect();
                (segments, self.leftover.len().saturating_sub(kept))
            };
            self.leftover.drain(..consumed);

            let mut segments = segments.into_iter();
            let first = segments.next();
            self.overflow.extend(segments);
            return first;
        }

        let rest = std::mem::take(&mut self.leftover);
        (!rest.is_empty()).then_some(rest)
    }
}

impl Response {
    /// Iterates over the body in chunks of at most `chunk_size` bytes.
    ///
    /// Streaming requests read the live decompressed stream, which is closed when
    /// the iterator is done or dropped; buffered content is not available
    /// afterwards. Other requests iterate over a view of the buffered content,
    /// buffering it first if needed.
    pub fn iter_content(&mut self, chunk_size: usize) -> Result<Chunks<'_>> {
        if self.request.is_stream() && !self.has_content() {
            let reader = self.take_raw()?;
            return Ok(Chunks::new(reader, chunk_size));
        }
        let content = self.content()?;
        Ok(Chunks::new(Box::new(Cursor::new(content)), chunk_size))
    }

    /// Iterates over the body split on the regular expression `delimiter`.
    ///
    /// Chunks of `chunk_size` bytes are read as in
    /// [`iter_content`](Response::iter_content) and decoded with
    /// [`encoding`](Response::encoding).
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDelimiter`](crate::Error::InvalidDelimiter) when the pattern
    /// does not compile, before any I/O.
    pub fn iter_lines(&mut self, chunk_size: usize, delimiter: &str) -> Result<Lines<'_>> {
        let delimiter = Regex::new(delimiter)?;
        let encoding = self.encoding()?;
        let chunks = self.iter_content(chunk_size)?;
        Ok(Lines::new(chunks, delimiter, encoding))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::{UTF_8, WINDOWS_1252};

    struct Trickle<'b> {
        data: &'b [u8],
        limit: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = buf.len().min(self.limit).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    struct Failing;

    impl Read for Failing {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
        }
    }

    fn lines(data: &[u8], chunk_size: usize, delimiter: &str) -> Vec<String> {
        let chunks = Chunks::new(Box::new(Cursor::new(data)), chunk_size);
        Lines::new(chunks, Regex::new(delimiter).unwrap(), UTF_8)
            .map(|line| String::from_utf8(line).unwrap())
            .collect()
    }

    #[test]
    fn test_chunks_respect_chunk_size() {
        let chunks: Vec<Vec<u8>> = Chunks::new(Box::new(Cursor::new(b"abcdefg")), 3).collect();
        assert_eq!(chunks, vec![b"abc".to_vec(), b"def".to_vec(), b"g".to_vec()]);
    }

    #[test]
    fn test_chunks_return_short_reads_as_is() {
        let data = b"hello world";
        let reader = Trickle { data, limit: 2 };
        let chunks: Vec<Vec<u8>> = Chunks::new(Box::new(reader), 5).collect();
        assert!(chunks.iter().all(|chunk| chunk.len() <= 2));
        assert_eq!(chunks.concat(), data);
    }

    #[test]
    fn test_chunks_end_on_error() {
        let mut chunks = Chunks::new(Box::new(Failing), 8);
        assert_eq!(chunks.next(), None);
        assert_eq!(chunks.next(), None);
    }

    #[test]
    fn test_zero_chunk_size_reads_single_bytes() {
        let chunks: Vec<Vec<u8>> = Chunks::new(Box::new(Cursor::new(b"ab")), 0).collect();
        assert_eq!(chunks, vec![b"a".to_vec(), b"b".to_vec()]);
    }

    #[test]
    fn test_lines_split_on_newline() {
        assert_eq!(lines(b"a\nb\nc", 512, "\n"), ["a", "b", "c"]);
    }

    #[test]
    fn test_lines_across_small_chunks() {
        for chunk_size in 1..6 {
            assert_eq!(
                lines(b"first\nsecond\nthird", chunk_size, "\n"),
                ["first", "second", "third"],
                "chunk size {chunk_size}"
            );
        }
    }

    #[test]
    fn test_lines_without_delimiter_yield_one_segment() {
        assert_eq!(lines(b"no delimiter here", 4, "\n"), ["no delimiter here"]);
    }

    #[test]
    fn test_lines_drop_trailing_empty_segment() {
        assert_eq!(lines(b"a\nb\n", 512, "\n"), ["a", "b"]);
        assert!(lines(b"", 512, "\n").is_empty());
    }

    #[test]
    fn test_lines_keep_inner_empty_segments() {
        assert_eq!(lines(b"a\n\nb", 512, "\n"), ["a", "", "b"]);
    }

    #[test]
    fn test_lines_regex_delimiter() {
        assert_eq!(lines(b"one\r\ntwo\nthree", 3, r"\r?\n"), ["one", "two", "three"]);
        assert_eq!(lines(b"k1=v1;k2=v2", 512, ";"), ["k1=v1", "k2=v2"]);
    }

    #[test]
    fn test_lines_multibyte_split_across_chunks() {
        let text = "größe\nnaïve\n東京";
        for chunk_size in 1..4 {
            assert_eq!(lines(text.as_bytes(), chunk_size, "\n"), ["größe", "naïve", "東京"]);
        }
    }

    #[test]
    fn test_lines_reencode_in_body_charset() {
        // "café\nbar" in windows-1252
        let data = b"caf\xe9\nbar";
        let chunks = Chunks::new(Box::new(Cursor::new(&data[..])), 2);
        let segments: Vec<Vec<u8>> =
            Lines::new(chunks, Regex::new("\n").unwrap(), WINDOWS_1252).collect();
        assert_eq!(segments, vec![b"caf\xe9".to_vec(), b"bar".to_vec()]);
    }

    #[test]
    fn test_lines_utf16_across_chunk_sizes() {
        let text = "ab\ncd\nef";
        let little: Vec<u8> = text.encode_utf16().flat_map(u16::to_le_bytes).collect();
        let big: Vec<u8> = text.encode_utf16().flat_map(u16::to_be_bytes).collect();
        for (encoding, data) in [(UTF_16LE, little), (UTF_16BE, big)] {
            for chunk_size in 1..6 {
                let chunks = Chunks::new(Box::new(Cursor::new(data.clone())), chunk_size);
                let segments: Vec<String> = Lines::new(chunks, Regex::new("\n").unwrap(), encoding)
                    .map(|line| encoding.decode_without_bom_handling(&line).0.into_owned())
                    .collect();
                assert_eq!(
                    segments,
                    ["ab", "cd", "ef"],
                    "{} chunk size {chunk_size}",
                    encoding.name()
                );
            }
        }
    }

    #[test]
    fn test_lines_utf16_surrogate_pair_split() {
        let text = "x\u{1F600}y\nz";
        let data: Vec<u8> = text.encode_utf16().flat_map(u16::to_le_bytes).collect();
        for chunk_size in 1..4 {
            let chunks = Chunks::new(Box::new(Cursor::new(data.clone())), chunk_size);
            let segments: Vec<String> = Lines::new(chunks, Regex::new("\n").unwrap(), UTF_16LE)
                .map(|line| UTF_16LE.decode_without_bom_handling(&line).0.into_owned())
                .collect();
            assert_eq!(segments, ["x\u{1F600}y", "z"]);
        }
    }
}
