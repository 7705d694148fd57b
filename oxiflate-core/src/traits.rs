//! Core traits for streaming compression.
//!
//! Every codec and container in OxiFlate is driven through the same
//! return-and-resume contract: each call takes whatever input and output
//! space it is given, reports how much of each it used, and says why it
//! stopped. No call blocks or buffers unboundedly; the caller decides when to
//! supply more input or drain more output.

use crate::error::{FlateError, Result};

/// Status of a streaming decompression operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecompressStatus {
    /// All supplied input was used; more is needed to continue.
    NeedsInput,
    /// The output buffer filled up; call again with more space.
    NeedsOutput,
    /// The end of the stream was reached.
    Done,
}

/// Status of a streaming compression operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressStatus {
    /// All input was accepted and every requested flush is complete.
    NeedsInput,
    /// Pending output remains; call again with more space.
    NeedsOutput,
    /// The stream is finished and fully emitted.
    Done,
}

/// Flush mode for compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushMode {
    /// Buffer data for best compression.
    #[default]
    None,
    /// Emit everything so far and align to a byte boundary.
    Sync,
    /// As `Sync`, and forget the match history.
    Full,
    /// Complete the stream.
    Finish,
}

/// Matching heuristics for the compressor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Normal LZ77 matching with dynamic or fixed Huffman blocks.
    #[default]
    Default,
    /// Favor literals over short matches, for data produced by a filter.
    Filtered,
    /// No LZ77 matching; Huffman-code literals only.
    HuffmanOnly,
    /// Only distance-1 matches (run-length encoding).
    Rle,
    /// Never use dynamic Huffman blocks.
    Fixed,
}

impl Strategy {
    /// Parse a strategy name as used on the command line.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "default" => Ok(Self::Default),
            "filtered" => Ok(Self::Filtered),
            "huffman" | "huffman-only" => Ok(Self::HuffmanOnly),
            "rle" => Ok(Self::Rle),
            "fixed" => Ok(Self::Fixed),
            other => Err(FlateError::invalid_parameter(
                "strategy",
                format!("unknown strategy '{other}'"),
            )),
        }
    }

    /// Canonical name of the strategy.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Filtered => "filtered",
            Self::HuffmanOnly => "huffman-only",
            Self::Rle => "rle",
            Self::Fixed => "fixed",
        }
    }
}

/// A streaming decompressor (decoder).
pub trait Decompressor {
    /// Decompress data from input to output.
    ///
    /// # Returns
    ///
    /// A tuple of (bytes consumed from input, bytes written to output, status)
    fn decompress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<(usize, usize, DecompressStatus)>;

    /// Reset the decompressor to its initial state.
    fn reset(&mut self);

    /// Check if the decompressor has finished.
    fn is_finished(&self) -> bool;

    /// Decompress a complete stream held in memory.
    ///
    /// Fails with [`FlateError::UnexpectedEof`] if `input` ends before the
    /// stream does.
    fn decompress_all(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut input_pos = 0;
        let mut buffer = vec![0u8; 32768];

        loop {
            let (consumed, produced, status) =
                match self.decompress(&input[input_pos..], &mut buffer) {
                    Err(FlateError::BufError) => return Err(FlateError::unexpected_eof(1)),
                    other => other?,
                };

            input_pos += consumed;
            output.extend_from_slice(&buffer[..produced]);

            match status {
                DecompressStatus::Done => break,
                DecompressStatus::NeedsInput if input_pos >= input.len() => {
                    return Err(FlateError::unexpected_eof(1));
                }
                DecompressStatus::NeedsOutput | DecompressStatus::NeedsInput => continue,
            }
        }

        Ok(output)
    }
}

/// A streaming compressor (encoder).
pub trait Compressor {
    /// Compress data from input to output.
    ///
    /// # Returns
    ///
    /// A tuple of (bytes consumed from input, bytes written to output, status)
    fn compress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, CompressStatus)>;

    /// Reset the compressor to its initial state.
    fn reset(&mut self);

    /// Check if the compressor has finished.
    fn is_finished(&self) -> bool;

    /// Compress a complete buffer and finish the stream.
    fn compress_all(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut input_pos = 0;
        let mut buffer = vec![0u8; 32768];

        loop {
            let (consumed, produced, status) =
                self.compress(&input[input_pos..], &mut buffer, FlushMode::Finish)?;

            input_pos += consumed;
            output.extend_from_slice(&buffer[..produced]);

            if status == CompressStatus::Done {
                break;
            }
        }

        Ok(output)
    }
}

/// Compression level for algorithms that support it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompressionLevel(u8);

impl CompressionLevel {
    /// No compression (store only).
    pub const NONE: Self = Self(0);
    /// Fastest compression.
    pub const FAST: Self = Self(1);
    /// Default compression (balanced).
    pub const DEFAULT: Self = Self(6);
    /// Best compression (slowest).
    pub const BEST: Self = Self(9);

    /// Create a compression level, clamping to 0-9.
    pub fn new(level: u8) -> Self {
        Self(level.min(9))
    }

    /// Create a compression level, rejecting values above 9.
    pub fn try_new(level: u8) -> Result<Self> {
        if level > 9 {
            return Err(FlateError::invalid_parameter(
                "level",
                format!("must be in 0..=9, got {level}"),
            ));
        }
        Ok(Self(level))
    }

    /// Get the level value.
    pub fn level(&self) -> u8 {
        self.0
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<u8> for CompressionLevel {
    fn from(level: u8) -> Self {
        Self::new(level)
    }
}
