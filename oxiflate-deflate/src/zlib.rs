//! Zlib format wrapper for DEFLATE compression.
//!
//! The zlib format (RFC 1950) wraps raw DEFLATE data with a header and
//! an Adler-32 checksum.
//!
//! # Format
//!
//! ```text
//! +---+---+=======+============+---+---+---+---+
//! |CMF|FLG|DICTID?| compressed |    ADLER32    |
//! +---+---+=======+============+---+---+---+---+
//! ```
//!
//! - CMF: bits 0-3 CM (8 = DEFLATE), bits 4-7 CINFO (log2(window size) - 8)
//! - FLG: bits 0-4 FCHECK so that `(CMF*256 + FLG) % 31 == 0`, bit 5 FDICT,
//!   bits 6-7 FLEVEL
//! - DICTID: Adler-32 of the preset dictionary, present when FDICT is set
//! - ADLER32: Adler-32 of the uncompressed data (big-endian)

use crate::config::{DeflateConfig, InflateConfig};
use crate::deflate::Deflater;
use crate::inflate::Inflater;
use oxiflate_core::checksum::{Adler32, adler32};
use oxiflate_core::error::{FlateError, Result};
use oxiflate_core::traits::{
    CompressStatus, CompressionLevel, Compressor, DecompressStatus, Decompressor, FlushMode,
    Strategy,
};
use tracing::debug;

/// Compression method for DEFLATE.
const METHOD_DEFLATE: u8 = 8;

/// FDICT bit of the FLG byte.
const FLAG_DICT: u8 = 0x20;

/// Compress data into a zlib stream.
///
/// # Example
///
/// ```
/// use oxiflate_deflate::zlib::{zlib_compress, zlib_decompress};
///
/// let data = b"Hello, World! Hello, World!";
/// let compressed = zlib_compress(data, 6).unwrap();
/// let decompressed = zlib_decompress(&compressed).unwrap();
/// assert_eq!(decompressed, data);
/// ```
pub fn zlib_compress(input: &[u8], level: u8) -> Result<Vec<u8>> {
    ZlibEncoder::with_level(level).compress_all(input)
}

/// Compress data into a zlib stream primed with a preset dictionary.
///
/// The header records the dictionary's Adler-32 so the decoder can check it
/// was handed the same one.
///
/// ```
/// use oxiflate_deflate::zlib::{zlib_compress_with_dict, zlib_decompress_with_dict};
///
/// let dict = b"common patterns and shared content";
/// let data = b"This text has common patterns that match the dictionary";
/// let compressed = zlib_compress_with_dict(data, 6, dict).unwrap();
/// let decompressed = zlib_decompress_with_dict(&compressed, dict).unwrap();
/// assert_eq!(decompressed, data);
/// ```
pub fn zlib_compress_with_dict(input: &[u8], level: u8, dictionary: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::with_level(level);
    encoder.set_dictionary(dictionary)?;
    encoder.compress_all(input)
}

/// Decompress a zlib stream.
///
/// Fails with [`FlateError::NeedDictionary`] if the stream was made with a
/// preset dictionary.
pub fn zlib_decompress(input: &[u8]) -> Result<Vec<u8>> {
    ZlibDecoder::default().decompress_all(input)
}

/// Decompress a zlib stream that may need `dictionary`.
pub fn zlib_decompress_with_dict(input: &[u8], dictionary: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::default();
    decoder.set_dictionary(dictionary)?;
    decoder.decompress_all(input)
}

/// The DICTID of a zlib stream, if it asks for a preset dictionary.
///
/// ```
/// use oxiflate_deflate::zlib::{zlib_compress_with_dict, zlib_requires_dictionary};
///
/// let compressed = zlib_compress_with_dict(b"test data", 6, b"test dictionary").unwrap();
/// assert!(zlib_requires_dictionary(&compressed).is_some());
/// ```
pub fn zlib_requires_dictionary(input: &[u8]) -> Option<u32> {
    let [cmf, flg, a, b, c, d, ..] = *input else {
        return None;
    };
    if (u16::from(cmf) << 8 | u16::from(flg)) % 31 != 0 || flg & FLAG_DICT == 0 {
        return None;
    }
    Some(u32::from_be_bytes([a, b, c, d]))
}

/// FLEVEL field for a compression level and strategy.
fn flevel(level: u8, strategy: Strategy) -> u8 {
    if level < 2 || matches!(strategy, Strategy::HuffmanOnly | Strategy::Rle) {
        0
    } else if level < 6 {
        1
    } else if level == 6 {
        2
    } else {
        3
    }
}

/// Build the CMF/FLG pair, followed by DICTID when one is given.
fn zlib_header(config: &DeflateConfig, dict_id: Option<u32>) -> Vec<u8> {
    let cmf = ((config.window_bits - 8) << 4) | METHOD_DEFLATE;
    let mut flg = flevel(config.level, config.strategy) << 6;
    if dict_id.is_some() {
        flg |= FLAG_DICT;
    }
    let check = (u16::from(cmf) << 8 | u16::from(flg)) % 31;
    if check != 0 {
        flg += (31 - check) as u8;
    }

    let mut header = vec![cmf, flg];
    if let Some(id) = dict_id {
        header.extend_from_slice(&id.to_be_bytes());
    }
    header
}

/// Copy as much of `pending[*pos..]` into `output` as fits.
fn copy_pending(pending: &[u8], pos: &mut usize, output: &mut [u8]) -> usize {
    let n = (pending.len() - *pos).min(output.len());
    output[..n].copy_from_slice(&pending[*pos..*pos + n]);
    *pos += n;
    n
}

/// Streaming zlib compressor.
#[derive(Debug)]
pub struct ZlibEncoder {
    deflater: Deflater,
    adler: Adler32,
    dict_id: Option<u32>,
    /// Header bytes, built on the first call.
    header: Vec<u8>,
    header_pos: usize,
    started: bool,
    trailer: Option<[u8; 4]>,
    trailer_pos: usize,
    total_out: u64,
}

impl Default for ZlibEncoder {
    fn default() -> Self {
        Self::from_deflater(Deflater::default())
    }
}

impl ZlibEncoder {
    /// Create an encoder, validating `config`.
    pub fn new(config: DeflateConfig) -> Result<Self> {
        Ok(Self::from_deflater(Deflater::new(config)?))
    }

    /// Create an encoder with default settings at `level`.
    pub fn with_level(level: impl Into<CompressionLevel>) -> Self {
        Self::from_deflater(Deflater::with_level(level))
    }

    fn from_deflater(deflater: Deflater) -> Self {
        Self {
            deflater,
            adler: Adler32::new(),
            dict_id: None,
            header: Vec::new(),
            header_pos: 0,
            started: false,
            trailer: None,
            trailer_pos: 0,
            total_out: 0,
        }
    }

    /// Preload the match history and record its DICTID in the header.
    ///
    /// Only allowed before the first call to `compress`.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<u32> {
        if self.started {
            return Err(FlateError::stream(
                "dictionary must be set before compression starts",
            ));
        }
        let id = self.deflater.set_dictionary(dictionary)?;
        self.dict_id = Some(id);
        Ok(id)
    }

    /// Change level and strategy mid-stream.
    pub fn set_params(&mut self, level: u8, strategy: Strategy) -> Result<()> {
        self.deflater.set_params(level, strategy)
    }

    /// Total uncompressed bytes accepted.
    pub fn total_in(&self) -> u64 {
        self.deflater.total_in()
    }

    /// Total zlib bytes handed out, framing included.
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Adler-32 of the input accepted so far.
    pub fn checksum(&self) -> u32 {
        self.adler.value()
    }

    fn body(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, CompressStatus)> {
        if !self.started {
            self.header = zlib_header(self.deflater.config(), self.dict_id);
            self.started = true;
        }

        let mut produced = copy_pending(&self.header, &mut self.header_pos, output);
        if self.header_pos < self.header.len() {
            return Ok((0, produced, CompressStatus::NeedsOutput));
        }

        let mut consumed = 0;
        if self.trailer.is_none() {
            let (c, p, status) = self.deflater.compress(input, &mut output[produced..], flush)?;
            self.adler.update(&input[..c]);
            consumed = c;
            produced += p;
            if status != CompressStatus::Done {
                return Ok((consumed, produced, status));
            }
            self.trailer = Some(self.adler.value().to_be_bytes());
        } else if !input.is_empty() || flush != FlushMode::Finish {
            return Err(FlateError::stream("zlib stream already finished"));
        }

        let trailer = self.trailer.unwrap_or_default();
        produced += copy_pending(&trailer, &mut self.trailer_pos, &mut output[produced..]);
        let status = if self.trailer_pos == trailer.len() {
            CompressStatus::Done
        } else {
            CompressStatus::NeedsOutput
        };
        Ok((consumed, produced, status))
    }
}

impl Compressor for ZlibEncoder {
    fn compress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, CompressStatus)> {
        let (consumed, produced, status) = self.body(input, output, flush)?;
        self.total_out += produced as u64;
        Ok((consumed, produced, status))
    }

    fn reset(&mut self) {
        self.deflater.reset();
        *self = Self::from_deflater(std::mem::take(&mut self.deflater));
    }

    fn is_finished(&self) -> bool {
        self.trailer.is_some() && self.trailer_pos == 4
    }
}

/// Where a [`ZlibDecoder`] currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ZlibState {
    Header,
    DictId,
    NeedDictionary(u32),
    Body,
    Trailer,
    Done,
    Failed,
}

/// Streaming zlib decompressor.
///
/// Bytes after the Adler-32 trailer are left unconsumed.
#[derive(Debug)]
pub struct ZlibDecoder {
    config: InflateConfig,
    inflater: Inflater,
    state: ZlibState,
    /// Partially read header, DICTID or trailer field.
    field: [u8; 4],
    filled: usize,
    adler: Adler32,
    dictionary: Option<Vec<u8>>,
    total_in: u64,
    total_out: u64,
}

impl Default for ZlibDecoder {
    fn default() -> Self {
        Self::from_inflater(InflateConfig::default(), Inflater::default())
    }
}

impl ZlibDecoder {
    /// Create a decoder, validating `config`.
    pub fn new(config: InflateConfig) -> Result<Self> {
        Ok(Self::from_inflater(config, Inflater::new(config)?))
    }

    fn from_inflater(config: InflateConfig, inflater: Inflater) -> Self {
        Self {
            config,
            inflater,
            state: ZlibState::Header,
            field: [0; 4],
            filled: 0,
            adler: Adler32::new(),
            dictionary: None,
            total_in: 0,
            total_out: 0,
        }
    }

    /// Supply the preset dictionary.
    ///
    /// May be called up front, or after a call failed with
    /// [`FlateError::NeedDictionary`]. A dictionary whose Adler-32 differs
    /// from the stream's DICTID is rejected as corrupt data.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<()> {
        match self.state {
            ZlibState::Header | ZlibState::DictId => {
                self.dictionary = Some(dictionary.to_vec());
                Ok(())
            }
            ZlibState::NeedDictionary(dict_id) => self.apply_dictionary(dict_id, dictionary),
            _ => Err(FlateError::stream(
                "dictionary can only be set before the compressed data",
            )),
        }
    }

    /// DICTID the stream is waiting for, if any.
    pub fn needs_dictionary(&self) -> Option<u32> {
        match self.state {
            ZlibState::NeedDictionary(dict_id) => Some(dict_id),
            _ => None,
        }
    }

    /// Total zlib bytes consumed.
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    /// Total decompressed bytes produced.
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    fn apply_dictionary(&mut self, dict_id: u32, dictionary: &[u8]) -> Result<()> {
        let computed = adler32(0, dictionary);
        if computed != dict_id {
            return Err(FlateError::checksum_mismatch(dict_id, computed));
        }
        self.inflater.set_dictionary(dictionary)?;
        self.state = ZlibState::Body;
        Ok(())
    }

    /// Fill `self.field` up to `len` bytes; true once complete.
    fn fill_field(&mut self, input: &[u8], consumed: &mut usize, len: usize) -> bool {
        let n = (len - self.filled).min(input.len() - *consumed);
        self.field[self.filled..self.filled + n].copy_from_slice(&input[*consumed..*consumed + n]);
        self.filled += n;
        *consumed += n;
        if self.filled == len {
            self.filled = 0;
            true
        } else {
            false
        }
    }

    fn check_header(&self, cmf: u8, flg: u8) -> Result<()> {
        if (u16::from(cmf) << 8 | u16::from(flg)) % 31 != 0 {
            return Err(FlateError::invalid_header("zlib header check failed"));
        }
        if cmf & 0x0F != METHOD_DEFLATE {
            return Err(FlateError::unsupported_method(format!(
                "zlib compression method {}",
                cmf & 0x0F
            )));
        }
        let window_bits = (cmf >> 4) + 8;
        if window_bits > self.config.window_bits {
            return Err(FlateError::invalid_header(format!(
                "window size 2^{window_bits} exceeds the configured 2^{}",
                self.config.window_bits
            )));
        }
        Ok(())
    }

    fn run(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        consumed: &mut usize,
        produced: &mut usize,
    ) -> Result<DecompressStatus> {
        loop {
            match self.state {
                ZlibState::Header => {
                    if !self.fill_field(input, consumed, 2) {
                        return Ok(DecompressStatus::NeedsInput);
                    }
                    let [cmf, flg, ..] = self.field;
                    self.check_header(cmf, flg)?;
                    debug!(cmf, flg, "zlib header parsed");
                    self.state = if flg & FLAG_DICT != 0 {
                        ZlibState::DictId
                    } else {
                        ZlibState::Body
                    };
                }

                ZlibState::DictId => {
                    if !self.fill_field(input, consumed, 4) {
                        return Ok(DecompressStatus::NeedsInput);
                    }
                    let dict_id = u32::from_be_bytes(self.field);
                    match self.dictionary.take() {
                        Some(dictionary) => self.apply_dictionary(dict_id, &dictionary)?,
                        None => self.state = ZlibState::NeedDictionary(dict_id),
                    }
                }

                ZlibState::NeedDictionary(dict_id) => {
                    // Report the header bytes first; the next call fails.
                    if *consumed > 0 {
                        return Ok(DecompressStatus::NeedsInput);
                    }
                    return Err(FlateError::NeedDictionary { dict_id });
                }

                ZlibState::Body => {
                    let result = self
                        .inflater
                        .decompress(&input[*consumed..], &mut output[*produced..]);
                    let (c, p, status) = match result {
                        Err(FlateError::BufError) if *consumed == input.len() => {
                            return Ok(DecompressStatus::NeedsInput);
                        }
                        Err(FlateError::BufError) => return Ok(DecompressStatus::NeedsOutput),
                        other => other?,
                    };
                    self.adler.update(&output[*produced..*produced + p]);
                    *consumed += c;
                    *produced += p;
                    if status != DecompressStatus::Done {
                        return Ok(status);
                    }
                    self.state = ZlibState::Trailer;
                }

                ZlibState::Trailer => {
                    if !self.fill_field(input, consumed, 4) {
                        return Ok(DecompressStatus::NeedsInput);
                    }
                    let expected = u32::from_be_bytes(self.field);
                    let computed = self.adler.value();
                    if expected != computed {
                        return Err(FlateError::checksum_mismatch(expected, computed));
                    }
                    self.state = ZlibState::Done;
                }

                ZlibState::Done => return Ok(DecompressStatus::Done),

                ZlibState::Failed => {
                    return Err(FlateError::stream("zlib stream is in an error state"));
                }
            }
        }
    }
}

impl Decompressor for ZlibDecoder {
    fn decompress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<(usize, usize, DecompressStatus)> {
        if self.state == ZlibState::Done {
            return Ok((0, 0, DecompressStatus::Done));
        }

        let mut consumed = 0;
        let mut produced = 0;
        let result = self.run(input, output, &mut consumed, &mut produced);
        self.total_in += consumed as u64;
        self.total_out += produced as u64;

        match result {
            Ok(status) => {
                if consumed == 0 && produced == 0 && status != DecompressStatus::Done {
                    return Err(FlateError::BufError);
                }
                Ok((consumed, produced, status))
            }
            Err(err) => {
                if !err.is_recoverable() {
                    self.state = ZlibState::Failed;
                }
                Err(err)
            }
        }
    }

    fn reset(&mut self) {
        self.inflater.reset();
        self.state = ZlibState::Header;
        self.field = [0; 4];
        self.filled = 0;
        self.adler.reset();
        self.dictionary = None;
        self.total_in = 0;
        self.total_out = 0;
    }

    fn is_finished(&self) -> bool {
        self.state == ZlibState::Done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stream_bytes() {
        let compressed = zlib_compress(b"", 6).expect("compress");
        assert_eq!(compressed, [0x78, 0x9C, 0x03, 0x00, 0x00, 0x00, 0x00, 0x01]);
        assert_eq!(zlib_decompress(&compressed).expect("decompress"), b"");
    }

    #[test]
    fn test_single_byte_stream() {
        let compressed = zlib_compress(b"a", 6).expect("compress");
        assert_eq!(
            compressed,
            [0x78, 0x9C, 0x4B, 0x04, 0x00, 0x00, 0x62, 0x00, 0x62]
        );
    }

    #[test]
    fn test_header_levels() {
        for (level, flg) in [(0, 0x01), (1, 0x01), (2, 0x5E), (5, 0x5E), (6, 0x9C), (9, 0xDA)] {
            let compressed = zlib_compress(b"x", level).expect("compress");
            assert_eq!(compressed[..2], [0x78, flg], "level {level}");
        }
    }

    #[test]
    fn test_header_small_window() {
        let config = DeflateConfig::default().with_window_bits(10);
        let compressed = ZlibEncoder::new(config)
            .expect("config")
            .compress_all(b"small window")
            .expect("compress");
        assert_eq!(compressed[0], 0x28);
        assert_eq!((u16::from(compressed[0]) << 8 | u16::from(compressed[1])) % 31, 0);
        assert_eq!(zlib_decompress(&compressed).expect("decompress"), b"small window");

        let mut decoder = ZlibDecoder::new(InflateConfig::default().with_window_bits(9))
            .expect("config");
        assert!(matches!(
            decoder.decompress_all(&compressed),
            Err(FlateError::InvalidHeader { .. })
        ));
    }

    #[test]
    fn test_roundtrip_levels() {
        let data = b"The quick brown fox jumps over the lazy dog. ".repeat(50);
        for level in 0..=9 {
            let compressed = zlib_compress(&data, level).expect("compress");
            assert_eq!(zlib_decompress(&compressed).expect("decompress"), data);
        }
    }

    #[test]
    fn test_bad_check_bits() {
        let mut compressed = zlib_compress(b"hello", 6).expect("compress");
        compressed[1] ^= 0x01;
        assert!(matches!(
            zlib_decompress(&compressed),
            Err(FlateError::InvalidHeader { .. })
        ));
    }

    #[test]
    fn test_bad_method() {
        // CM = 7 with valid check bits.
        let cmf = 0x77u8;
        let flg = (31 - (u16::from(cmf) << 8) % 31) as u8;
        assert!(matches!(
            zlib_decompress(&[cmf, flg, 0x03, 0x00, 0, 0, 0, 1]),
            Err(FlateError::UnsupportedMethod { .. })
        ));
    }

    #[test]
    fn test_trailer_mismatch() {
        let mut compressed = zlib_compress(b"checksummed", 6).expect("compress");
        let last = compressed.len() - 1;
        compressed[last] ^= 0xFF;
        let err = zlib_decompress(&compressed).unwrap_err();
        assert!(matches!(err, FlateError::ChecksumMismatch { .. }));
        assert!(err.is_data_error());
    }

    #[test]
    fn test_truncated_trailer() {
        let compressed = zlib_compress(b"truncated", 6).expect("compress");
        assert!(matches!(
            zlib_decompress(&compressed[..compressed.len() - 2]),
            Err(FlateError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_dictionary_flow() {
        let dictionary = b"a dictionary of frequently used words";
        let data = b"frequently used words, a dictionary of them";
        let compressed = zlib_compress_with_dict(data, 9, dictionary).expect("compress");
        let dict_id = adler32(0, dictionary);

        assert_eq!(compressed[1] & FLAG_DICT, FLAG_DICT);
        assert_eq!(zlib_requires_dictionary(&compressed), Some(dict_id));
        assert!(matches!(
            zlib_decompress(&compressed),
            Err(FlateError::NeedDictionary { dict_id: id }) if id == dict_id
        ));

        // Supply the dictionary once the decoder asks for it.
        let mut decoder = ZlibDecoder::default();
        let mut out = vec![0u8; 256];
        let (consumed, produced, status) = decoder.decompress(&compressed, &mut out).expect("header");
        assert_eq!((consumed, produced, status), (6, 0, DecompressStatus::NeedsInput));
        assert_eq!(decoder.needs_dictionary(), Some(dict_id));
        let err = decoder.decompress(&compressed[6..], &mut out).unwrap_err();
        assert!(err.is_recoverable());

        decoder.set_dictionary(dictionary).expect("dictionary");
        let (_, produced, status) = decoder.decompress(&compressed[6..], &mut out).expect("body");
        assert_eq!(status, DecompressStatus::Done);
        assert_eq!(&out[..produced], data);

        assert_eq!(
            zlib_decompress_with_dict(&compressed, dictionary).expect("decompress"),
            data
        );
    }

    #[test]
    fn test_wrong_dictionary() {
        let compressed = zlib_compress_with_dict(b"payload", 6, b"right").expect("compress");
        let err = zlib_decompress_with_dict(&compressed, b"wrong").unwrap_err();
        assert!(err.is_data_error());
        assert!(zlib_requires_dictionary(&zlib_compress(b"payload", 6).expect("compress")).is_none());
    }

    #[test]
    fn test_byte_at_a_time() {
        let data = b"streamed through one-byte buffers ".repeat(20);
        let mut encoder = ZlibEncoder::with_level(6);
        let mut compressed = Vec::new();
        let mut out = [0u8; 1];
        let mut pos = 0;
        loop {
            let end = (pos + 1).min(data.len());
            let flush = if end == data.len() {
                FlushMode::Finish
            } else {
                FlushMode::None
            };
            let (consumed, produced, status) = encoder
                .compress(&data[pos..end], &mut out, flush)
                .expect("compress");
            pos += consumed;
            compressed.extend_from_slice(&out[..produced]);
            if status == CompressStatus::Done {
                break;
            }
        }
        assert!(encoder.is_finished());
        assert_eq!(compressed, zlib_compress(&data, 6).expect("compress"));

        let mut decoder = ZlibDecoder::default();
        let mut decoded = Vec::new();
        let mut pos = 0;
        loop {
            let end = (pos + 1).min(compressed.len());
            let (consumed, produced, status) = decoder
                .decompress(&compressed[pos..end], &mut out)
                .expect("decompress");
            pos += consumed;
            decoded.extend_from_slice(&out[..produced]);
            if status == DecompressStatus::Done {
                break;
            }
        }
        assert_eq!(decoded, data);
        assert_eq!(decoder.total_in(), compressed.len() as u64);
    }

    #[test]
    fn test_trailing_data_left() {
        let mut stream = zlib_compress(b"member", 6).expect("compress");
        let len = stream.len();
        stream.extend_from_slice(b"garbage");

        let mut decoder = ZlibDecoder::default();
        let mut out = [0u8; 32];
        let (consumed, produced, status) = decoder.decompress(&stream, &mut out).expect("decompress");
        assert_eq!(status, DecompressStatus::Done);
        assert_eq!(consumed, len);
        assert_eq!(&out[..produced], b"member");
    }

    #[test]
    fn test_encoder_after_finish() {
        let mut encoder = ZlibEncoder::default();
        encoder.compress_all(b"done").expect("compress");
        let mut out = [0u8; 16];
        assert_eq!(
            encoder.compress(&[], &mut out, FlushMode::Finish).expect("idle"),
            (0, 0, CompressStatus::Done)
        );
        assert!(encoder.compress(b"more", &mut out, FlushMode::None).is_err());
        assert!(encoder.set_dictionary(b"late").is_err());

        encoder.reset();
        let again = encoder.compress_all(b"done").expect("compress");
        assert_eq!(zlib_decompress(&again).expect("decompress"), b"done");
    }

    #[test]
    fn test_exact_output_reaches_trailer() {
        let data = b"abcabcabcabc";
        let compressed = zlib_compress(data, 6).expect("compress");
        let mut decoder = ZlibDecoder::default();
        let mut out = [0u8; 12];
        let (consumed, produced, status) = decoder.decompress(&compressed, &mut out).expect("decompress");
        assert_eq!(status, DecompressStatus::Done);
        assert_eq!(consumed, compressed.len());
        assert_eq!(&out[..produced], data);

        let empty = zlib_compress(b"", 6).expect("compress");
        let mut decoder = ZlibDecoder::default();
        assert_eq!(
            decoder.decompress(&empty, &mut []).expect("decompress"),
            (empty.len(), 0, DecompressStatus::Done)
        );
    }
}
