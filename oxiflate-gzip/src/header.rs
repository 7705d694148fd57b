//! GZIP member header parsing and writing.
//!
//! ```text
//! +---+---+---+---+---+---+---+---+---+---+
//! |ID1|ID2|CM |FLG|     MTIME     |XFL|OS |
//! +---+---+---+---+---+---+---+---+---+---+
//! [XLEN + extra] [name\0] [comment\0] [CRC16]
//! ```
//!
//! Names and comments are ISO-8859-1 on the wire; each byte maps to the
//! char with the same code point, so they survive a parse/write cycle.

use oxiflate_core::checksum::{Crc32, crc32};
use oxiflate_core::error::{FlateError, Result};
use oxiflate_core::traits::Strategy;
use std::time::{SystemTime, UNIX_EPOCH};

/// GZIP magic bytes.
pub const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// GZIP compression method: DEFLATE.
pub const CM_DEFLATE: u8 = 8;

/// GZIP header flags.
pub mod flags {
    /// Text file.
    pub const FTEXT: u8 = 0x01;
    /// Header CRC present.
    pub const FHCRC: u8 = 0x02;
    /// Extra field present.
    pub const FEXTRA: u8 = 0x04;
    /// Original filename present.
    pub const FNAME: u8 = 0x08;
    /// Comment present.
    pub const FCOMMENT: u8 = 0x10;
    /// Bits that must be zero.
    pub const RESERVED: u8 = 0xE0;
}

/// Operating system codes for the OS byte.
pub mod os {
    /// FAT filesystem (MS-DOS, OS/2, NT/Win32).
    pub const FAT: u8 = 0;
    /// Unix.
    pub const UNIX: u8 = 3;
    /// Macintosh.
    pub const MACINTOSH: u8 = 7;
    /// NTFS filesystem (NT).
    pub const NTFS: u8 = 11;
    /// Unknown.
    pub const UNKNOWN: u8 = 255;

    /// Code for the platform this crate was built for.
    pub const CURRENT: u8 = if cfg!(unix) {
        UNIX
    } else if cfg!(windows) {
        NTFS
    } else {
        UNKNOWN
    };
}

/// XFL value describing how a member was compressed.
///
/// 2 marks maximum compression, 4 the fastest settings, 0 anything else.
pub fn xfl_for(level: u8, strategy: Strategy) -> u8 {
    if level == 9 {
        2
    } else if level < 2
        || matches!(
            strategy,
            Strategy::HuffmanOnly | Strategy::Rle | Strategy::Fixed
        )
    {
        4
    } else {
        0
    }
}

/// GZIP member header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GzipHeader {
    /// FTEXT: the data is probably text.
    pub text: bool,
    /// Modification time (Unix timestamp, 0 if unknown).
    pub mtime: u32,
    /// Extra flags.
    pub xfl: u8,
    /// Operating system.
    pub os: u8,
    /// Extra field (FEXTRA).
    pub extra: Option<Vec<u8>>,
    /// Original filename (FNAME).
    pub filename: Option<String>,
    /// Comment (FCOMMENT).
    pub comment: Option<String>,
    /// Whether a CRC-16 of the header follows (FHCRC).
    pub header_crc: bool,
}

impl Default for GzipHeader {
    fn default() -> Self {
        Self {
            text: false,
            mtime: 0,
            xfl: 0,
            os: os::CURRENT,
            extra: None,
            filename: None,
            comment: None,
            header_crc: false,
        }
    }
}

impl GzipHeader {
    /// Create a new GZIP header with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the original filename.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Set the comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Set the extra field. It must fit in the 16-bit XLEN.
    pub fn with_extra(mut self, extra: impl Into<Vec<u8>>) -> Result<Self> {
        let extra = extra.into();
        if extra.len() > usize::from(u16::MAX) {
            return Err(FlateError::invalid_parameter(
                "extra",
                format!("{} bytes exceeds the 65535-byte limit", extra.len()),
            ));
        }
        self.extra = Some(extra);
        Ok(self)
    }

    /// Set the modification time.
    pub fn with_mtime(mut self, mtime: u32) -> Self {
        self.mtime = mtime;
        self
    }

    /// Set the modification time to now.
    pub fn with_mtime_now(self) -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .ok()
            .and_then(|d| u32::try_from(d.as_secs()).ok())
            .unwrap_or(0);
        self.with_mtime(now)
    }

    /// Mark the data as text.
    pub fn with_text(mut self, text: bool) -> Self {
        self.text = text;
        self
    }

    /// Set the operating system byte.
    pub fn with_os(mut self, os: u8) -> Self {
        self.os = os;
        self
    }

    /// Protect the header with a CRC-16.
    pub fn with_header_crc(mut self, header_crc: bool) -> Self {
        self.header_crc = header_crc;
        self
    }

    /// The FLG byte these fields produce.
    pub fn flags(&self) -> u8 {
        let mut flg = 0;
        if self.text {
            flg |= flags::FTEXT;
        }
        if self.header_crc {
            flg |= flags::FHCRC;
        }
        if self.extra.is_some() {
            flg |= flags::FEXTRA;
        }
        if self.filename.is_some() {
            flg |= flags::FNAME;
        }
        if self.comment.is_some() {
            flg |= flags::FCOMMENT;
        }
        flg
    }

    /// Serialize the header.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(10);
        out.extend_from_slice(&GZIP_MAGIC);
        out.push(CM_DEFLATE);
        out.push(self.flags());
        out.extend_from_slice(&self.mtime.to_le_bytes());
        out.push(self.xfl);
        out.push(self.os);

        if let Some(extra) = &self.extra {
            let extra = &extra[..extra.len().min(usize::from(u16::MAX))];
            out.extend_from_slice(&(extra.len() as u16).to_le_bytes());
            out.extend_from_slice(extra);
        }
        if let Some(name) = &self.filename {
            write_latin1(&mut out, name);
        }
        if let Some(comment) = &self.comment {
            write_latin1(&mut out, comment);
        }
        if self.header_crc {
            let crc = crc32(0, &out) as u16;
            out.extend_from_slice(&crc.to_le_bytes());
        }
        out
    }

    /// Parse a header from the start of `data`.
    ///
    /// Returns the header and its length in bytes, or `None` if `data` ends
    /// before the header does. Errors are reported as soon as the offending
    /// byte is visible.
    pub fn parse(data: &[u8]) -> Result<Option<(Self, usize)>> {
        let mut parser = HeaderParser::new();
        let len = parser.feed(data)?;
        Ok(parser.take().map(|header| (header, len)))
    }
}

/// Longest name or comment accepted, terminator included.
pub const MAX_STRING_LEN: usize = 64 * 1024;

/// Header field a [`HeaderParser`] is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Fixed,
    ExtraLen,
    Extra(usize),
    Name,
    Comment,
    Crc,
    Done,
}

/// Incremental header parser.
///
/// Bytes may arrive in pieces of any size; each byte is examined once and
/// only the field in progress is buffered.
#[derive(Debug, Clone)]
pub struct HeaderParser {
    field: Field,
    flg: u8,
    scratch: Vec<u8>,
    crc: Crc32,
    len: usize,
    header: GzipHeader,
}

impl Default for HeaderParser {
    fn default() -> Self {
        Self::new()
    }
}

impl HeaderParser {
    /// Create a parser expecting the magic bytes.
    pub fn new() -> Self {
        Self {
            field: Field::Fixed,
            flg: 0,
            scratch: Vec::with_capacity(10),
            crc: Crc32::new(),
            len: 0,
            header: GzipHeader::default(),
        }
    }

    /// Forget everything parsed so far.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// True once the whole header has been read.
    pub fn is_done(&self) -> bool {
        self.field == Field::Done
    }

    /// Header bytes consumed so far.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True before any byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Consume header bytes from `input`.
    ///
    /// Returns how many were taken. Nothing past the end of the header is
    /// consumed.
    pub fn feed(&mut self, input: &[u8]) -> Result<usize> {
        let mut pos = 0;
        while self.field != Field::Done && pos < input.len() {
            let rest = &input[pos..];
            pos += match self.field {
                Field::Fixed => {
                    let n = self.fill(rest, 10);
                    self.check_magic()?;
                    if self.scratch.len() == 10 {
                        self.finish_fixed()?;
                    }
                    n
                }
                Field::ExtraLen => {
                    let n = self.fill(rest, 2);
                    if let &[lo, hi] = self.scratch.as_slice() {
                        let xlen = usize::from(u16::from_le_bytes([lo, hi]));
                        self.scratch.clear();
                        if xlen == 0 {
                            self.header.extra = Some(Vec::new());
                            self.field = self.after_extra();
                        } else {
                            self.field = Field::Extra(xlen);
                        }
                    }
                    n
                }
                Field::Extra(xlen) => {
                    let n = self.fill(rest, xlen);
                    if self.scratch.len() == xlen {
                        self.header.extra = Some(std::mem::take(&mut self.scratch));
                        self.field = self.after_extra();
                    }
                    n
                }
                Field::Name | Field::Comment => self.fill_string(rest)?,
                Field::Crc => {
                    let computed = self.crc.value() as u16;
                    let n = self.fill(rest, 2);
                    if let &[lo, hi] = self.scratch.as_slice() {
                        let expected = u16::from_le_bytes([lo, hi]);
                        if expected != computed {
                            return Err(FlateError::checksum_mismatch(
                                u32::from(expected),
                                u32::from(computed),
                            ));
                        }
                        self.scratch.clear();
                        self.field = Field::Done;
                    }
                    n
                }
                Field::Done => 0,
            };
        }
        Ok(pos)
    }

    /// Hand over the parsed header and start over, if the header is complete.
    pub fn take(&mut self) -> Option<GzipHeader> {
        if !self.is_done() {
            return None;
        }
        let header = std::mem::take(&mut self.header);
        self.reset();
        Some(header)
    }

    /// Move bytes of `rest` into the current field until it holds `len`.
    fn fill(&mut self, rest: &[u8], len: usize) -> usize {
        let n = (len - self.scratch.len()).min(rest.len());
        self.consume(&rest[..n]);
        n
    }

    fn consume(&mut self, bytes: &[u8]) {
        self.scratch.extend_from_slice(bytes);
        if self.field != Field::Crc {
            self.crc.update(bytes);
        }
        self.len += bytes.len();
    }

    fn check_magic(&self) -> Result<()> {
        let magic = &self.scratch[..self.scratch.len().min(2)];
        if magic != &GZIP_MAGIC[..magic.len()] {
            return Err(FlateError::invalid_magic(GZIP_MAGIC, magic));
        }
        Ok(())
    }

    fn finish_fixed(&mut self) -> Result<()> {
        let fixed = std::mem::take(&mut self.scratch);
        let method = fixed[2];
        if method != CM_DEFLATE {
            return Err(FlateError::unsupported_method(format!(
                "gzip compression method {method}"
            )));
        }
        let flg = fixed[3];
        if flg & flags::RESERVED != 0 {
            return Err(FlateError::corrupted(
                3,
                format!("reserved flag bits set in {flg:#04x}"),
            ));
        }

        self.flg = flg;
        self.header = GzipHeader {
            text: flg & flags::FTEXT != 0,
            mtime: u32::from_le_bytes([fixed[4], fixed[5], fixed[6], fixed[7]]),
            xfl: fixed[8],
            os: fixed[9],
            extra: None,
            filename: None,
            comment: None,
            header_crc: flg & flags::FHCRC != 0,
        };
        self.field = if flg & flags::FEXTRA != 0 {
            Field::ExtraLen
        } else {
            self.after_extra()
        };
        Ok(())
    }

    /// Read a NUL-terminated string field, returning the bytes taken.
    fn fill_string(&mut self, rest: &[u8]) -> Result<usize> {
        let (n, terminated) = match rest.iter().position(|&b| b == 0) {
            Some(end) => (end + 1, true),
            None => (rest.len(), false),
        };
        if self.scratch.len() + n > MAX_STRING_LEN {
            return Err(FlateError::invalid_header(format!(
                "gzip header string longer than {MAX_STRING_LEN} bytes"
            )));
        }
        self.consume(&rest[..n]);
        if terminated {
            self.scratch.pop();
            let text: String = self.scratch.drain(..).map(char::from).collect();
            if self.field == Field::Name {
                self.header.filename = Some(text);
                self.field = self.after_name();
            } else {
                self.header.comment = Some(text);
                self.field = self.after_comment();
            }
        }
        Ok(n)
    }

    fn after_extra(&self) -> Field {
        if self.flg & flags::FNAME != 0 {
            Field::Name
        } else {
            self.after_name()
        }
    }

    fn after_name(&self) -> Field {
        if self.flg & flags::FCOMMENT != 0 {
            Field::Comment
        } else {
            self.after_comment()
        }
    }

    fn after_comment(&self) -> Field {
        if self.flg & flags::FHCRC != 0 {
            Field::Crc
        } else {
            Field::Done
        }
    }
}

/// Write `text` as a NUL-terminated ISO-8859-1 string.
///
/// Stops at an embedded NUL; chars outside Latin-1 become `?`.
fn write_latin1(out: &mut Vec<u8>, text: &str) {
    out.extend(
        text.chars()
            .take_while(|&c| c != '\0')
            .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?')),
    );
    out.push(0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_header_bytes() {
        let bytes = GzipHeader::new().with_os(os::UNKNOWN).to_bytes();
        assert_eq!(bytes, [0x1F, 0x8B, 8, 0, 0, 0, 0, 0, 0, 0xFF]);
    }

    #[test]
    fn test_header_roundtrip() {
        let header = GzipHeader::new()
            .with_filename("notes.txt")
            .with_comment("daily notes")
            .with_extra(b"AB\x02\x00hi".to_vec())
            .unwrap()
            .with_mtime(1_700_000_000)
            .with_text(true)
            .with_header_crc(true);
        let bytes = header.to_bytes();
        assert_eq!(
            bytes[3],
            flags::FTEXT | flags::FHCRC | flags::FEXTRA | flags::FNAME | flags::FCOMMENT
        );

        let (parsed, len) = GzipHeader::parse(&bytes).unwrap().unwrap();
        assert_eq!(len, bytes.len());
        assert_eq!(parsed, header);
    }

    #[test]
    fn test_latin1_names_survive() {
        let header = GzipHeader::new().with_filename("caf\u{e9}.txt");
        let bytes = header.to_bytes();
        assert!(bytes.windows(2).any(|w| w == [b'f', 0xE9]));
        let (parsed, _) = GzipHeader::parse(&bytes).unwrap().unwrap();
        assert_eq!(parsed.filename.as_deref(), Some("caf\u{e9}.txt"));
    }

    #[test]
    fn test_incomplete_header() {
        let bytes = GzipHeader::new()
            .with_filename("a-long-file-name.bin")
            .with_header_crc(true)
            .to_bytes();
        for cut in 0..bytes.len() {
            assert_eq!(GzipHeader::parse(&bytes[..cut]).unwrap(), None, "cut {cut}");
        }
        assert!(GzipHeader::parse(&bytes).unwrap().is_some());
    }

    #[test]
    fn test_bad_magic_reported_early() {
        let err = GzipHeader::parse(&[0x1F, 0x8C]).unwrap_err();
        assert!(matches!(err, FlateError::InvalidMagic { .. }));
        assert!(GzipHeader::parse(&[b'P']).is_err());
        assert_eq!(GzipHeader::parse(&[0x1F]).unwrap(), None);
    }

    #[test]
    fn test_bad_method() {
        let mut bytes = GzipHeader::new().to_bytes();
        bytes[2] = 7;
        let err = GzipHeader::parse(&bytes).unwrap_err();
        assert!(matches!(err, FlateError::UnsupportedMethod { .. }));
    }

    #[test]
    fn test_reserved_flags() {
        let mut bytes = GzipHeader::new().to_bytes();
        bytes[3] = 0x20;
        let err = GzipHeader::parse(&bytes).unwrap_err();
        assert!(err.is_data_error());
    }

    #[test]
    fn test_header_crc_mismatch() {
        let mut bytes = GzipHeader::new().with_header_crc(true).to_bytes();
        bytes[4] ^= 1;
        let err = GzipHeader::parse(&bytes).unwrap_err();
        assert!(matches!(err, FlateError::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_extra_too_long() {
        assert!(GzipHeader::new().with_extra(vec![0u8; 70_000]).is_err());
    }

    #[test]
    fn test_xfl() {
        assert_eq!(xfl_for(9, Strategy::Default), 2);
        assert_eq!(xfl_for(1, Strategy::Default), 4);
        assert_eq!(xfl_for(6, Strategy::HuffmanOnly), 4);
        assert_eq!(xfl_for(6, Strategy::Default), 0);
    }

    #[test]
    fn test_parser_piecewise() {
        let header = GzipHeader::new()
            .with_filename("pieces.txt")
            .with_comment("fed one byte at a time")
            .with_extra(b"XY\x01\x00z".to_vec())
            .unwrap()
            .with_header_crc(true);
        let mut bytes = header.to_bytes();
        let header_len = bytes.len();
        bytes.extend_from_slice(b"body");

        let mut parser = HeaderParser::new();
        let mut pos = 0;
        while !parser.is_done() {
            pos += parser.feed(&bytes[pos..pos + 1]).unwrap();
        }
        assert_eq!(pos, header_len);
        assert_eq!(parser.feed(b"more").unwrap(), 0);
        assert_eq!(parser.take(), Some(header));
        assert!(parser.is_empty());
    }

    #[test]
    fn test_empty_extra_field() {
        let header = GzipHeader::new().with_extra(Vec::new()).unwrap();
        let (parsed, len) = GzipHeader::parse(&header.to_bytes()).unwrap().unwrap();
        assert_eq!(len, 12);
        assert_eq!(parsed.extra, Some(Vec::new()));
    }

    #[test]
    fn test_unterminated_name_rejected() {
        let mut bytes = vec![0x1F, 0x8B, 8, flags::FNAME, 0, 0, 0, 0, 0, 3];
        let mut parser = HeaderParser::new();
        assert_eq!(parser.feed(&bytes).unwrap(), 10);

        let chunk = vec![b'a'; 4096];
        let mut fed = 0;
        let err = loop {
            match parser.feed(&chunk) {
                Ok(n) => fed += n,
                Err(err) => break err,
            }
        };
        assert!(fed <= MAX_STRING_LEN);
        assert!(matches!(err, FlateError::InvalidHeader { .. }));

        bytes.extend(std::iter::repeat_n(b'a', MAX_STRING_LEN + 1));
        assert!(GzipHeader::parse(&bytes).is_err());
    }
}
