//! Streaming gzip member encoder.

use crate::header::{GzipHeader, xfl_for};
use oxiflate_core::checksum::Crc32;
use oxiflate_core::error::{FlateError, Result};
use oxiflate_core::traits::{CompressStatus, CompressionLevel, Compressor, FlushMode, Strategy};
use oxiflate_deflate::{DeflateConfig, Deflater};
use tracing::debug;

/// Copy as much of `pending[*pos..]` into `output` as fits.
pub(crate) fn copy_pending(pending: &[u8], pos: &mut usize, output: &mut [u8]) -> usize {
    let n = (pending.len() - *pos).min(output.len());
    output[..n].copy_from_slice(&pending[*pos..*pos + n]);
    *pos += n;
    n
}

/// Streaming gzip compressor producing a single member.
///
/// The header is emitted with the first output, the CRC-32/ISIZE trailer
/// after [`FlushMode::Finish`] completes the DEFLATE stream. XFL is derived
/// from the compression level when the header is written.
#[derive(Debug)]
pub struct GzEncoder {
    deflater: Deflater,
    header: GzipHeader,
    crc: Crc32,
    /// Input length modulo 2^32.
    size: u32,
    header_bytes: Vec<u8>,
    header_pos: usize,
    started: bool,
    trailer: Option<[u8; 8]>,
    trailer_pos: usize,
    total_out: u64,
}

impl Default for GzEncoder {
    fn default() -> Self {
        Self::from_parts(Deflater::default(), GzipHeader::default())
    }
}

impl GzEncoder {
    /// Create an encoder, validating `config`.
    pub fn new(config: DeflateConfig, header: GzipHeader) -> Result<Self> {
        Ok(Self::from_parts(Deflater::new(config)?, header))
    }

    /// Create an encoder with a default header at `level`.
    pub fn with_level(level: impl Into<CompressionLevel>) -> Self {
        Self::from_parts(Deflater::with_level(level), GzipHeader::default())
    }

    /// Create an encoder writing `header` at `level`.
    pub fn with_header(level: impl Into<CompressionLevel>, header: GzipHeader) -> Self {
        Self::from_parts(Deflater::with_level(level), header)
    }

    fn from_parts(deflater: Deflater, header: GzipHeader) -> Self {
        Self {
            deflater,
            header,
            crc: Crc32::new(),
            size: 0,
            header_bytes: Vec::new(),
            header_pos: 0,
            started: false,
            trailer: None,
            trailer_pos: 0,
            total_out: 0,
        }
    }

    /// The header this encoder writes.
    pub fn header(&self) -> &GzipHeader {
        &self.header
    }

    /// Replace the header. Only allowed before the first call to `compress`.
    pub fn set_header(&mut self, header: GzipHeader) -> Result<()> {
        if self.started {
            return Err(FlateError::stream(
                "gzip header must be set before compression starts",
            ));
        }
        self.header = header;
        Ok(())
    }

    /// Change level and strategy mid-stream.
    pub fn set_params(&mut self, level: u8, strategy: Strategy) -> Result<()> {
        self.deflater.set_params(level, strategy)
    }

    /// Current level and strategy.
    pub fn params(&self) -> (u8, Strategy) {
        let config = self.deflater.config();
        (config.level, config.strategy)
    }

    /// Total uncompressed bytes accepted.
    pub fn total_in(&self) -> u64 {
        self.deflater.total_in()
    }

    /// Total gzip bytes handed out, framing included.
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// CRC-32 of the input accepted so far.
    pub fn checksum(&self) -> u32 {
        self.crc.value()
    }

    fn body(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, CompressStatus)> {
        if !self.started {
            let config = self.deflater.config();
            self.header.xfl = xfl_for(config.level, config.strategy);
            self.header_bytes = self.header.to_bytes();
            self.started = true;
            debug!(len = self.header_bytes.len(), "gzip header built");
        }

        let mut produced = copy_pending(&self.header_bytes, &mut self.header_pos, output);
        if self.header_pos < self.header_bytes.len() {
            return Ok((0, produced, CompressStatus::NeedsOutput));
        }

        let mut consumed = 0;
        if self.trailer.is_none() {
            let (c, p, status) = self.deflater.compress(input, &mut output[produced..], flush)?;
            self.crc.update(&input[..c]);
            self.size = self.size.wrapping_add(c as u32);
            consumed = c;
            produced += p;
            if status != CompressStatus::Done {
                return Ok((consumed, produced, status));
            }
            let mut trailer = [0u8; 8];
            trailer[..4].copy_from_slice(&self.crc.value().to_le_bytes());
            trailer[4..].copy_from_slice(&self.size.to_le_bytes());
            self.trailer = Some(trailer);
        } else if !input.is_empty() || flush != FlushMode::Finish {
            return Err(FlateError::stream("gzip member already finished"));
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

impl Compressor for GzEncoder {
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

    /// Start a new member with the same header and parameters.
    fn reset(&mut self) {
        self.deflater.reset();
        let header = std::mem::take(&mut self.header);
        *self = Self::from_parts(std::mem::take(&mut self.deflater), header);
    }

    fn is_finished(&self) -> bool {
        self.trailer.is_some() && self.trailer_pos == 8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxiflate_core::checksum::crc32;
    use oxiflate_deflate::inflate;

    #[test]
    fn test_member_layout() {
        let data = b"Hello, gzip!";
        let member = GzEncoder::with_level(6).compress_all(data).unwrap();

        assert_eq!(&member[..2], &[0x1F, 0x8B]);
        assert_eq!(member[2], 8);
        let n = member.len();
        assert_eq!(&member[n - 8..n - 4], &crc32(0, data).to_le_bytes());
        assert_eq!(&member[n - 4..], &(data.len() as u32).to_le_bytes());
        assert_eq!(inflate(&member[10..n - 8]).unwrap(), data);
    }

    #[test]
    fn test_xfl_follows_level() {
        let best = GzEncoder::with_level(9).compress_all(b"x").unwrap();
        let fast = GzEncoder::with_level(1).compress_all(b"x").unwrap();
        assert_eq!(best[8], 2);
        assert_eq!(fast[8], 4);
    }

    #[test]
    fn test_tiny_output_slices() {
        let header = GzipHeader::new().with_filename("tiny.txt").with_header_crc(true);
        let data = b"one byte of output at a time, one byte at a time".repeat(4);
        let whole = GzEncoder::new(DeflateConfig::default(), header.clone())
            .unwrap()
            .compress_all(&data)
            .unwrap();

        let mut encoder = GzEncoder::new(DeflateConfig::default(), header).unwrap();
        let mut out = Vec::new();
        let mut byte = [0u8; 1];
        let mut pos = 0;
        loop {
            let (c, p, status) = encoder
                .compress(&data[pos..], &mut byte, FlushMode::Finish)
                .unwrap();
            pos += c;
            out.extend_from_slice(&byte[..p]);
            if status == CompressStatus::Done {
                break;
            }
        }
        assert_eq!(out, whole);
        assert_eq!(encoder.total_out(), whole.len() as u64);
    }

    #[test]
    fn test_finished_then_reset() {
        let mut encoder = GzEncoder::with_level(6);
        let first = encoder.compress_all(b"first").unwrap();
        assert!(encoder.is_finished());

        let mut out = [0u8; 64];
        assert!(encoder.compress(b"more", &mut out, FlushMode::Finish).is_err());
        assert_eq!(
            encoder.compress(b"", &mut out, FlushMode::Finish).unwrap(),
            (0, 0, CompressStatus::Done)
        );

        encoder.reset();
        let second = encoder.compress_all(b"first").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_set_header_after_start() {
        let mut encoder = GzEncoder::default();
        let mut out = [0u8; 64];
        encoder.compress(b"x", &mut out, FlushMode::None).unwrap();
        assert!(encoder.set_header(GzipHeader::new()).is_err());
    }
}
