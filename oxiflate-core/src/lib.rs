//! # OxiFlate Core
//!
//! Core components for the OxiFlate DEFLATE codec.
//!
//! - [`bitstream`]: Resumable LSB-first bit reader and drainable bit writer
//! - [`window`]: Circular history window for back-reference copies
//! - [`checksum`]: CRC-32 and Adler-32 with `combine`
//! - [`traits`]: Streaming compressor/decompressor traits, flush modes, levels
//! - [`error`]: Error types
//!
//! ## Architecture
//!
//! OxiFlate is designed as a layered protocol stack:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ L4: Tools                                               │
//! │     oxiflate CLI, gzip file handles                     │
//! ├─────────────────────────────────────────────────────────┤
//! │ L3: Container                                           │
//! │     zlib (RFC 1950), gzip (RFC 1952)                    │
//! ├─────────────────────────────────────────────────────────┤
//! │ L2: Codec                                               │
//! │     Deflater / Inflater (LZ77 + Huffman, RFC 1951)      │
//! ├─────────────────────────────────────────────────────────┤
//! │ L1: Primitives (this crate)                             │
//! │     BitReader/BitWriter, Window, CRC-32, Adler-32       │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use oxiflate_core::bitstream::{BitReader, BitWriter};
//! use oxiflate_core::checksum::{crc32, crc32_combine};
//!
//! let mut writer = BitWriter::new();
//! writer.write_bits(0b101, 3);
//! writer.align_to_byte();
//! let bytes = writer.take_pending();
//!
//! let mut reader = BitReader::new();
//! assert_eq!(reader.read_bits(&bytes, 3), Some(0b101));
//!
//! let whole = crc32(0, b"Hello, World!");
//! let merged = crc32_combine(crc32(0, b"Hello, "), crc32(0, b"World!"), 6);
//! assert_eq!(whole, merged);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

#[cfg(feature = "async-io")]
pub mod async_io;
pub mod bitstream;
pub mod checksum;
pub mod error;
pub mod traits;
pub mod window;

// Re-exports for convenience
pub use bitstream::{BitReader, BitWriter};
pub use checksum::{Adler32, Crc32, adler32, adler32_combine, crc32, crc32_combine};
pub use error::{ErrorKind, FlateError, Result};
pub use traits::{
    CompressStatus, CompressionLevel, Compressor, DecompressStatus, Decompressor, FlushMode,
    Strategy,
};
pub use window::Window;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::checksum::{Adler32, Crc32};
    pub use crate::error::{FlateError, Result};
    pub use crate::traits::{
        CompressStatus, CompressionLevel, Compressor, DecompressStatus, Decompressor, FlushMode,
        Strategy,
    };
}
