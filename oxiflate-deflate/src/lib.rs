//! # OxiFlate Deflate
//!
//! Pure Rust streaming implementation of DEFLATE (RFC 1951) and the zlib
//! container (RFC 1950).
//!
//! ## Features
//!
//! - **Decompression**: a resumable state machine over all block types
//!   - Stored (uncompressed) blocks
//!   - Fixed Huffman codes
//!   - Dynamic Huffman codes
//! - **Compression**: hash-chain LZ77 + Huffman encoding
//!   - Levels 0-9 with greedy and lazy parsing
//!   - Strategies: filtered, Huffman-only, RLE, fixed
//!   - Sync/full flush points and preset dictionaries
//! - **zlib**: streaming [`ZlibEncoder`]/[`ZlibDecoder`] and one-shot
//!   [`compress`]/[`uncompress`] into caller buffers
//!
//! ## Example
//!
//! ```rust
//! use oxiflate_deflate::{deflate, inflate};
//!
//! // Compress data
//! let original = b"Hello, World! Hello, World!";
//! let compressed = deflate(original, 6).unwrap();
//!
//! // Decompress data
//! let decompressed = inflate(&compressed).unwrap();
//! assert_eq!(&decompressed, original);
//! ```
//!
//! ## Streaming
//!
//! ```rust
//! use oxiflate_deflate::{Deflater, Inflater};
//! use oxiflate_core::traits::{Compressor, DecompressStatus, Decompressor, FlushMode};
//!
//! let mut deflater = Deflater::default();
//! let mut packed = vec![0u8; 256];
//! let (_, n, _) = deflater.compress(b"part one, ", &mut packed, FlushMode::Sync).unwrap();
//! assert_eq!(packed[n - 4..n], [0x00, 0x00, 0xFF, 0xFF]);
//!
//! let mut inflater = Inflater::default();
//! let mut text = [0u8; 64];
//! let (_, m, status) = inflater.decompress(&packed[..n], &mut text).unwrap();
//! assert_eq!(&text[..m], b"part one, ");
//! assert_eq!(status, DecompressStatus::NeedsInput);
//! ```
//!
//! ## Compression Levels
//!
//! - Level 0: No compression (stored blocks)
//! - Level 1-3: Fast compression, greedy parsing
//! - Level 4-6: Balanced, lazy parsing (default is 6)
//! - Level 7-9: Best compression (slower)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod buffer;
pub mod config;
pub mod deflate;
pub mod huffman;
pub mod inflate;
pub mod lz77;
pub mod tables;
pub mod zlib;

// Re-exports
pub use buffer::{compress, compress_bound, compress_with_level, uncompress};
pub use config::{DeflateConfig, InflateConfig};
pub use deflate::{Deflater, deflate, deflate_bound};
pub use huffman::{EncodeTable, HuffmanBuilder, HuffmanTable};
pub use inflate::{InflatePhase, Inflater, inflate};
pub use lz77::Lz77Token;
pub use zlib::{
    ZlibDecoder, ZlibEncoder, zlib_compress, zlib_compress_with_dict, zlib_decompress,
    zlib_decompress_with_dict, zlib_requires_dictionary,
};
