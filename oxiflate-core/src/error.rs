//! Error types for OxiFlate operations.
//!
//! Every failure surfaced by the codec, the containers, and the file layer is
//! a [`FlateError`]. Variants are grouped into a small set of [`ErrorKind`]s
//! that mirror the classic status codes of zlib-style libraries: bad
//! parameters, too-small buffers, corrupt data, API misuse, and "no progress
//! possible".
//!
//! `NeedsInput`/`NeedsOutput` are not errors; they are reported through
//! [`crate::traits::CompressStatus`] and [`crate::traits::DecompressStatus`].

use std::io;
use thiserror::Error;

/// The main error type for OxiFlate operations.
#[derive(Debug, Error)]
pub enum FlateError {
    /// I/O error from underlying reader/writer.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A configuration value is out of range.
    #[error("Invalid parameter `{name}`: {message}")]
    InvalidParameter {
        /// Name of the offending parameter.
        name: &'static str,
        /// Description of the accepted range.
        message: String,
    },

    /// Destination buffer too small for a one-shot operation.
    #[error("Insufficient buffer: need {needed} bytes, have {available}")]
    InsufficientBuffer {
        /// Number of bytes needed.
        needed: usize,
        /// Number of bytes available.
        available: usize,
    },

    /// Code lengths describe more codes than the bit space allows.
    #[error("Invalid Huffman tree: code lengths are over-subscribed")]
    InvalidHuffmanTree,

    /// Code lengths leave part of the bit space unused.
    #[error("Incomplete Huffman tree: code lengths are under-subscribed")]
    IncompleteHuffmanTree,

    /// A bit pattern that maps to no symbol.
    #[error("Invalid Huffman code at bit position {bit_position}")]
    InvalidHuffmanCode {
        /// Bit position where the invalid code was found.
        bit_position: u64,
    },

    /// Back-reference reaching before the start of the available history.
    #[error("Invalid back-reference distance: {distance} exceeds history size {history_size}")]
    InvalidDistance {
        /// The invalid distance value.
        distance: usize,
        /// Amount of valid history at the time of the copy.
        history_size: usize,
    },

    /// Corrupted compressed data.
    #[error("Corrupted data at offset {offset}: {message}")]
    CorruptedData {
        /// Byte offset where corruption was detected.
        offset: u64,
        /// Description of the corruption.
        message: String,
    },

    /// Invalid container header.
    #[error("Invalid header: {message}")]
    InvalidHeader {
        /// Description of the header error.
        message: String,
    },

    /// Invalid magic number in a container header.
    #[error("Invalid magic number: expected {expected:02x?}, found {found:02x?}")]
    InvalidMagic {
        /// Expected magic bytes.
        expected: Vec<u8>,
        /// Actual magic bytes found.
        found: Vec<u8>,
    },

    /// Unsupported compression method.
    #[error("Unsupported compression method: {method}")]
    UnsupportedMethod {
        /// The compression method identifier.
        method: String,
    },

    /// Trailer checksum or length does not match the decoded data.
    #[error("Checksum mismatch: expected {expected:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// Value stored in the stream.
        expected: u32,
        /// Value computed from the decoded data.
        computed: u32,
    },

    /// Input ended before the stream was complete.
    #[error("Unexpected end of stream: expected at least {expected} more bytes")]
    UnexpectedEof {
        /// Minimum number of bytes still expected.
        expected: usize,
    },

    /// A zlib stream was compressed with a preset dictionary that was not supplied.
    #[error("Preset dictionary required (Adler-32 {dict_id:#010x})")]
    NeedDictionary {
        /// Adler-32 of the dictionary the stream expects.
        dict_id: u32,
    },

    /// API misuse, such as feeding a finished stream.
    #[error("Stream error: {message}")]
    StreamError {
        /// Description of the misuse.
        message: String,
    },

    /// Neither progress nor termination is possible with the given buffers.
    ///
    /// The stream state is left intact; supply more input or output and retry.
    #[error("No progress possible: supply more input or output space")]
    BufError,
}

/// Result type alias for OxiFlate operations.
pub type Result<T> = std::result::Result<T, FlateError>;

/// Coarse classification of a [`FlateError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Underlying I/O failure.
    Io,
    /// Bad level, strategy, window size or similar.
    InvalidParameter,
    /// Destination too small; retry with a larger buffer or stream.
    InsufficientBuffer,
    /// Corrupt input; unrecoverable for this stream.
    Data,
    /// API misuse.
    Stream,
    /// No progress possible; recoverable.
    Buf,
}

impl FlateError {
    /// Create an invalid parameter error.
    pub fn invalid_parameter(name: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            message: message.into(),
        }
    }

    /// Create an insufficient buffer error.
    pub fn insufficient_buffer(needed: usize, available: usize) -> Self {
        Self::InsufficientBuffer { needed, available }
    }

    /// Create an invalid Huffman code error.
    pub fn invalid_huffman(bit_position: u64) -> Self {
        Self::InvalidHuffmanCode { bit_position }
    }

    /// Create an invalid distance error.
    pub fn invalid_distance(distance: usize, history_size: usize) -> Self {
        Self::InvalidDistance {
            distance,
            history_size,
        }
    }

    /// Create a corrupted data error.
    pub fn corrupted(offset: u64, message: impl Into<String>) -> Self {
        Self::CorruptedData {
            offset,
            message: message.into(),
        }
    }

    /// Create an invalid header error.
    pub fn invalid_header(message: impl Into<String>) -> Self {
        Self::InvalidHeader {
            message: message.into(),
        }
    }

    /// Create an invalid magic error.
    pub fn invalid_magic(expected: impl Into<Vec<u8>>, found: impl Into<Vec<u8>>) -> Self {
        Self::InvalidMagic {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create an unsupported method error.
    pub fn unsupported_method(method: impl Into<String>) -> Self {
        Self::UnsupportedMethod {
            method: method.into(),
        }
    }

    /// Create a checksum mismatch error.
    pub fn checksum_mismatch(expected: u32, computed: u32) -> Self {
        Self::ChecksumMismatch { expected, computed }
    }

    /// Create an unexpected EOF error.
    pub fn unexpected_eof(expected: usize) -> Self {
        Self::UnexpectedEof { expected }
    }

    /// Create a stream (API misuse) error.
    pub fn stream(message: impl Into<String>) -> Self {
        Self::StreamError {
            message: message.into(),
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Io,
            Self::InvalidParameter { .. } => ErrorKind::InvalidParameter,
            Self::InsufficientBuffer { .. } => ErrorKind::InsufficientBuffer,
            Self::StreamError { .. } => ErrorKind::Stream,
            Self::BufError => ErrorKind::Buf,
            Self::InvalidHuffmanTree
            | Self::IncompleteHuffmanTree
            | Self::InvalidHuffmanCode { .. }
            | Self::InvalidDistance { .. }
            | Self::CorruptedData { .. }
            | Self::InvalidHeader { .. }
            | Self::InvalidMagic { .. }
            | Self::UnsupportedMethod { .. }
            | Self::ChecksumMismatch { .. }
            | Self::UnexpectedEof { .. }
            | Self::NeedDictionary { .. } => ErrorKind::Data,
        }
    }

    /// Whether this error means the compressed data itself is bad.
    pub fn is_data_error(&self) -> bool {
        self.kind() == ErrorKind::Data
    }

    /// Whether the stream that produced this error may be driven further.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Buf | ErrorKind::InsufficientBuffer
        ) || matches!(self, Self::NeedDictionary { .. })
    }
}

impl From<FlateError> for io::Error {
    fn from(err: FlateError) -> Self {
        match err {
            FlateError::Io(inner) => inner,
            FlateError::UnexpectedEof { .. } => io::Error::new(io::ErrorKind::UnexpectedEof, err),
            FlateError::InvalidParameter { .. } | FlateError::StreamError { .. } => {
                io::Error::new(io::ErrorKind::InvalidInput, err)
            }
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
