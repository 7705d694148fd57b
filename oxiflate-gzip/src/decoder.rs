//! Streaming gzip member decoder.

use crate::header::{GzipHeader, HeaderParser};
use oxiflate_core::checksum::Crc32;
use oxiflate_core::error::{FlateError, Result};
use oxiflate_core::traits::{DecompressStatus, Decompressor};
use oxiflate_deflate::{InflateConfig, Inflater};
use tracing::{debug, trace};

/// Where a [`GzDecoder`] currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GzState {
    Header,
    Body,
    Trailer,
    Done,
    Failed,
}

/// Streaming gzip decompressor for a single member.
///
/// The header is parsed incrementally, so it may arrive in pieces of any
/// size. Bytes after the 8-byte trailer are left
/// unconsumed; [`crate::GzReader`] uses that to walk concatenated members.
#[derive(Debug)]
pub struct GzDecoder {
    inflater: Inflater,
    state: GzState,
    header: Option<GzipHeader>,
    parser: HeaderParser,
    trailer: [u8; 8],
    filled: usize,
    crc: Crc32,
    size: u32,
    total_in: u64,
    total_out: u64,
}

impl Default for GzDecoder {
    fn default() -> Self {
        Self::from_inflater(Inflater::default())
    }
}

impl GzDecoder {
    /// Create a decoder, validating `config`.
    pub fn new(config: InflateConfig) -> Result<Self> {
        Ok(Self::from_inflater(Inflater::new(config)?))
    }

    fn from_inflater(inflater: Inflater) -> Self {
        Self {
            inflater,
            state: GzState::Header,
            header: None,
            parser: HeaderParser::new(),
            trailer: [0; 8],
            filled: 0,
            crc: Crc32::new(),
            size: 0,
            total_in: 0,
            total_out: 0,
        }
    }

    /// The member header, once it has been parsed.
    pub fn header(&self) -> Option<&GzipHeader> {
        self.header.as_ref()
    }

    /// Total gzip bytes consumed.
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    /// Total decompressed bytes produced.
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// True before any byte of a member has been consumed.
    pub fn is_idle(&self) -> bool {
        self.state == GzState::Header && self.total_in == 0
    }

    /// True while the member header is still being read.
    pub fn in_header(&self) -> bool {
        self.state == GzState::Header
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
                GzState::Header => {
                    *consumed += self.parser.feed(&input[*consumed..])?;
                    match self.parser.take() {
                        Some(header) => {
                            debug!(
                                filename = header.filename.as_deref(),
                                mtime = header.mtime,
                                os = header.os,
                                "gzip header parsed"
                            );
                            self.header = Some(header);
                            self.state = GzState::Body;
                        }
                        None => return Ok(DecompressStatus::NeedsInput),
                    }
                }

                GzState::Body => {
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
                    self.crc.update(&output[*produced..*produced + p]);
                    self.size = self.size.wrapping_add(p as u32);
                    *consumed += c;
                    *produced += p;
                    if status != DecompressStatus::Done {
                        return Ok(status);
                    }
                    self.state = GzState::Trailer;
                }

                GzState::Trailer => {
                    let n = (8 - self.filled).min(input.len() - *consumed);
                    self.trailer[self.filled..self.filled + n]
                        .copy_from_slice(&input[*consumed..*consumed + n]);
                    self.filled += n;
                    *consumed += n;
                    if self.filled < 8 {
                        return Ok(DecompressStatus::NeedsInput);
                    }
                    self.check_trailer()?;
                    trace!(size = self.size, "gzip member complete");
                    self.state = GzState::Done;
                }

                GzState::Done => return Ok(DecompressStatus::Done),

                GzState::Failed => {
                    return Err(FlateError::stream("gzip stream is in an error state"));
                }
            }
        }
    }

    fn check_trailer(&self) -> Result<()> {
        let [a, b, c, d, e, f, g, h] = self.trailer;
        let expected = u32::from_le_bytes([a, b, c, d]);
        let computed = self.crc.value();
        if expected != computed {
            return Err(FlateError::checksum_mismatch(expected, computed));
        }
        let isize = u32::from_le_bytes([e, f, g, h]);
        if isize != self.size {
            return Err(FlateError::corrupted(
                self.total_in,
                format!("ISIZE {isize} does not match {} decoded bytes", self.size),
            ));
        }
        Ok(())
    }
}

impl Decompressor for GzDecoder {
    fn decompress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<(usize, usize, DecompressStatus)> {
        if self.state == GzState::Done {
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
                    self.state = GzState::Failed;
                }
                Err(err)
            }
        }
    }

    fn reset(&mut self) {
        self.inflater.reset();
        self.state = GzState::Header;
        self.header = None;
        self.parser.reset();
        self.trailer = [0; 8];
        self.filled = 0;
        self.crc.reset();
        self.size = 0;
        self.total_in = 0;
        self.total_out = 0;
    }

    fn is_finished(&self) -> bool {
        self.state == GzState::Done
    }
}
