//! Buffered reader over gzip data.

use crate::decoder::GzDecoder;
use crate::header::GzipHeader;
use oxiflate_core::error::{FlateError, Result};
use oxiflate_core::traits::{DecompressStatus, Decompressor};
use std::io::{self, BufRead, Read};
use tracing::debug;

/// Decompressing reader for gzip streams.
///
/// Concatenated members are decoded back to back, as if they were one
/// stream. Once at least one member has been read, bytes that do not start
/// a valid member are treated as trailing garbage and ignored.
///
/// ```
/// use oxiflate_gzip::{GzReader, compress};
/// use std::io::Read;
///
/// let mut joined = compress(b"Hello, ", 6).unwrap();
/// joined.extend(compress(b"World!", 6).unwrap());
///
/// let mut text = String::new();
/// GzReader::new(&joined[..]).read_to_string(&mut text).unwrap();
/// assert_eq!(text, "Hello, World!");
/// ```
#[derive(Debug)]
pub struct GzReader<R> {
    inner: R,
    decoder: GzDecoder,
    first_header: Option<GzipHeader>,
    members: usize,
    multi_member: bool,
    finished: bool,
}

impl<R: BufRead> GzReader<R> {
    /// Wrap `inner`, decoding every member it holds.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            decoder: GzDecoder::default(),
            first_header: None,
            members: 0,
            multi_member: true,
            finished: false,
        }
    }

    /// Stop after the first member, leaving later bytes in `inner`.
    pub fn single_member(mut self) -> Self {
        self.multi_member = false;
        self
    }

    /// Header of the first member, once it has been read.
    pub fn header(&self) -> Option<&GzipHeader> {
        self.first_header.as_ref().or(self.decoder.header())
    }

    /// Number of members fully decoded so far.
    pub fn members(&self) -> usize {
        self.members
    }

    /// Borrow the underlying reader.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Unwrap the underlying reader.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Read decompressed bytes into `buf`, reporting codec errors as-is.
    ///
    /// Returns 0 only at the end of the data.
    pub fn read_data(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() || self.finished {
            return Ok(0);
        }

        loop {
            let input = self.inner.fill_buf()?;
            if input.is_empty() {
                if self.members > 0 && self.decoder.in_header() {
                    self.finished = true;
                    return Ok(0);
                }
                return Err(FlateError::unexpected_eof(1));
            }

            let between_members = self.members > 0 && self.decoder.in_header();
            let (consumed, produced, status) = match self.decoder.decompress(input, buf) {
                Ok(step) => step,
                Err(err) if between_members => {
                    debug!(%err, members = self.members, "ignoring trailing garbage");
                    self.finished = true;
                    return Ok(0);
                }
                Err(err) => return Err(err),
            };
            self.inner.consume(consumed);

            if status == DecompressStatus::Done {
                self.members += 1;
                if self.first_header.is_none() {
                    self.first_header = self.decoder.header().cloned();
                }
                if self.multi_member {
                    self.decoder.reset();
                } else {
                    self.finished = true;
                }
            }
            if produced > 0 || self.finished {
                return Ok(produced);
            }
        }
    }
}

impl<R: BufRead> Read for GzReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_data(buf).map_err(io::Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::GzEncoder;
    use oxiflate_core::traits::Compressor;
    use oxiflate_deflate::DeflateConfig;
    use std::io::BufReader;

    fn gz(data: &[u8]) -> Vec<u8> {
        GzEncoder::with_level(6).compress_all(data).unwrap()
    }

    #[test]
    fn test_concatenated_members() {
        let mut joined = gz(b"one ");
        joined.extend(gz(b"two "));
        joined.extend(gz(b""));
        joined.extend(gz(b"three"));

        let mut reader = GzReader::new(&joined[..]);
        let mut text = String::new();
        reader.read_to_string(&mut text).unwrap();
        assert_eq!(text, "one two three");
        assert_eq!(reader.members(), 4);
    }

    #[test]
    fn test_single_member_leaves_rest() {
        let first = gz(b"first");
        let mut joined = first.clone();
        joined.extend(gz(b"second"));

        let mut reader = GzReader::new(&joined[..]).single_member();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"first");
        assert_eq!(reader.into_inner().len(), joined.len() - first.len());
    }

    #[test]
    fn test_trailing_garbage_ignored() {
        let mut data = gz(b"payload");
        data.extend_from_slice(b"\0\0\0\0garbage");
        let mut out = Vec::new();
        GzReader::new(&data[..]).read_to_end(&mut out).unwrap();
        assert_eq!(out, b"payload");
    }

    #[test]
    fn test_first_member_errors_surface() {
        let mut out = Vec::new();
        let err = GzReader::new(&b"not gzip"[..])
            .read_to_end(&mut out)
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_truncated_second_member() {
        let mut joined = gz(b"complete");
        let second = gz(b"cut short, cut short, cut short");
        joined.extend_from_slice(&second[..second.len() - 3]);

        let mut out = Vec::new();
        let err = GzReader::new(&joined[..]).read_to_end(&mut out).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_small_buffers() {
        let data = b"small BufReader capacity forces many refills".repeat(50);
        let compressed = GzEncoder::new(DeflateConfig::new(9), GzipHeader::new().with_filename("f"))
            .unwrap()
            .compress_all(&data)
            .unwrap();

        let mut reader = GzReader::new(BufReader::with_capacity(7, &compressed[..]));
        let mut out = Vec::new();
        let mut chunk = [0u8; 5];
        loop {
            let n = reader.read_data(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&chunk[..n]);
        }
        assert_eq!(out, data);
        assert_eq!(reader.header().unwrap().filename.as_deref(), Some("f"));
    }
}
