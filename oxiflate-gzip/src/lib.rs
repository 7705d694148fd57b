//! # OxiFlate Gzip
//!
//! The gzip container (RFC 1952) around the OxiFlate DEFLATE codec.
//!
//! - [`GzipHeader`]: member header with incremental parsing
//! - [`GzEncoder`] / [`GzDecoder`]: streaming codecs for one member
//! - [`GzReader`] / [`GzWriter`]: `io::Read` and `io::Write` adapters
//! - [`GzFile`]: gzip file handles with byte, line and formatted I/O
//!
//! ## Example
//!
//! ```rust
//! use oxiflate_gzip::{GzipHeader, compress_with_header, decompress};
//!
//! let header = GzipHeader::new().with_filename("greeting.txt");
//! let compressed = compress_with_header(b"Hello, World!", 9, header).unwrap();
//! assert_eq!(&compressed[..2], &[0x1F, 0x8B]);
//! assert_eq!(decompress(&compressed).unwrap(), b"Hello, World!");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod decoder;
pub mod encoder;
pub mod file;
pub mod header;
pub mod read;
pub mod write;

pub use decoder::GzDecoder;
pub use encoder::GzEncoder;
pub use file::{Access, GzFile, OpenMode};
pub use header::{CM_DEFLATE, GZIP_MAGIC, GzipHeader, HeaderParser, flags, os, xfl_for};
pub use read::GzReader;
pub use write::GzWriter;

use oxiflate_core::error::Result;
use oxiflate_core::traits::{CompressionLevel, Compressor};
use oxiflate_deflate::DeflateConfig;

/// Compress `data` into a single gzip member with a default header.
pub fn compress(data: &[u8], level: u8) -> Result<Vec<u8>> {
    GzEncoder::new(DeflateConfig::new(level), GzipHeader::new())?.compress_all(data)
}

/// Compress `data` into a single gzip member with a custom header.
pub fn compress_with_header(
    data: &[u8],
    level: impl Into<CompressionLevel>,
    header: GzipHeader,
) -> Result<Vec<u8>> {
    let config = DeflateConfig::new(level.into().level());
    GzEncoder::new(config, header)?.compress_all(data)
}

/// Decompress gzip data, concatenating every member.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut reader = GzReader::new(data);
    let mut output = Vec::new();
    let mut buffer = vec![0u8; 32 * 1024];
    loop {
        let n = reader.read_data(&mut buffer)?;
        if n == 0 {
            return Ok(output);
        }
        output.extend_from_slice(&buffer[..n]);
    }
}
