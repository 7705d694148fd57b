//! Resumable DEFLATE decompression (inflate).
//!
//! This module implements the DEFLATE decompression algorithm as specified
//! in RFC 1951. It supports all three block types:
//! - Type 0: Stored (uncompressed)
//! - Type 1: Fixed Huffman codes
//! - Type 2: Dynamic Huffman codes
//!
//! [`Inflater`] is an explicit state machine. Each call runs until the input
//! or the output runs out, records where it stopped in its current mode, and
//! picks up from there on the next call. Input is consumed bit-exactly: bytes
//! after the end of the stream are never taken, so a container trailer can be
//! read from `input[consumed..]`.

use crate::config::InflateConfig;
use crate::huffman::HuffmanTable;
use crate::tables::{
    CODE_LENGTH_ORDER, END_OF_BLOCK, NUM_CODELEN_SYMBOLS, NUM_DISTANCE_SYMBOLS,
    NUM_LITLEN_SYMBOLS, distance_base, fixed_tables, length_base,
};
use oxiflate_core::bitstream::BitReader;
use oxiflate_core::error::{FlateError, Result};
use oxiflate_core::traits::{DecompressStatus, Decompressor};
use oxiflate_core::window::Window;
use tracing::{debug, trace};

/// Decompress a complete raw DEFLATE stream.
pub fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    Inflater::default().decompress_all(data)
}

/// Where a decompressor currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InflatePhase {
    /// Expecting a 3-bit block header.
    BlockHeader,
    /// Reading LEN and NLEN of a stored block.
    StoredHeader,
    /// Copying stored bytes.
    StoredCopy,
    /// Reading HLIT, HDIST and HCLEN.
    DynamicHeader,
    /// Reading code-length code lengths.
    CodeLengthCodes,
    /// Reading literal/length and distance code lengths.
    CodeLengths,
    /// Decoding literal/length symbols.
    DecodeSymbols,
    /// Reading extra bits of a length.
    LengthExtra,
    /// Decoding a distance symbol.
    Distance,
    /// Reading extra bits of a distance.
    DistanceExtra,
    /// Copying a back-reference.
    MatchCopy,
    /// The final block has ended.
    Done,
    /// A data error occurred.
    Failed,
}

/// Decoder state, carrying whatever a suspended step still needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    BlockHeader,
    StoredHeader,
    StoredCopy { remaining: usize },
    DynamicHeader,
    CodeLengthCodes { index: usize },
    CodeLengths { index: usize, repeat: Option<u16> },
    DecodeSymbols,
    LengthExtra { symbol: u16 },
    Distance { length: usize },
    DistanceExtra { length: usize, code: u16 },
    MatchCopy { length: usize, distance: usize },
    Done,
    Failed,
}

/// Which Huffman tables the current block uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tables {
    Fixed,
    Dynamic,
}

/// Streaming DEFLATE decompressor.
#[derive(Debug)]
pub struct Inflater {
    config: InflateConfig,
    reader: BitReader,
    window: Window,
    mode: Mode,
    last_block: bool,
    tables: Tables,
    litlen: HuffmanTable,
    distance: HuffmanTable,
    codelen: HuffmanTable,
    hlit: usize,
    hdist: usize,
    hclen: usize,
    codelen_lengths: [u8; NUM_CODELEN_SYMBOLS],
    lengths: [u8; NUM_LITLEN_SYMBOLS + NUM_DISTANCE_SYMBOLS],
    total_in: u64,
    total_out: u64,
}

impl Default for Inflater {
    fn default() -> Self {
        Self::with_window(InflateConfig::default(), Window::default())
    }
}

impl Inflater {
    /// Create a decompressor, validating `config`.
    pub fn new(config: InflateConfig) -> Result<Self> {
        config.validate()?;
        let window = Window::new(config.window_bits)?;
        Ok(Self::with_window(config, window))
    }

    fn with_window(config: InflateConfig, window: Window) -> Self {
        Self {
            config,
            reader: BitReader::new(),
            window,
            mode: Mode::BlockHeader,
            last_block: false,
            tables: Tables::Fixed,
            litlen: HuffmanTable::assemble(&[]),
            distance: HuffmanTable::assemble(&[]),
            codelen: HuffmanTable::assemble(&[]),
            hlit: 0,
            hdist: 0,
            hclen: 0,
            codelen_lengths: [0; NUM_CODELEN_SYMBOLS],
            lengths: [0; NUM_LITLEN_SYMBOLS + NUM_DISTANCE_SYMBOLS],
            total_in: 0,
            total_out: 0,
        }
    }

    /// Current settings.
    pub fn config(&self) -> &InflateConfig {
        &self.config
    }

    /// Current phase of the state machine.
    pub fn phase(&self) -> InflatePhase {
        match self.mode {
            Mode::BlockHeader => InflatePhase::BlockHeader,
            Mode::StoredHeader => InflatePhase::StoredHeader,
            Mode::StoredCopy { .. } => InflatePhase::StoredCopy,
            Mode::DynamicHeader => InflatePhase::DynamicHeader,
            Mode::CodeLengthCodes { .. } => InflatePhase::CodeLengthCodes,
            Mode::CodeLengths { .. } => InflatePhase::CodeLengths,
            Mode::DecodeSymbols => InflatePhase::DecodeSymbols,
            Mode::LengthExtra { .. } => InflatePhase::LengthExtra,
            Mode::Distance { .. } => InflatePhase::Distance,
            Mode::DistanceExtra { .. } => InflatePhase::DistanceExtra,
            Mode::MatchCopy { .. } => InflatePhase::MatchCopy,
            Mode::Done => InflatePhase::Done,
            Mode::Failed => InflatePhase::Failed,
        }
    }

    /// Total compressed bytes consumed.
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    /// Total decompressed bytes produced.
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Preload the history with a dictionary.
    ///
    /// Only allowed before any output has been produced.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<()> {
        if self.total_out > 0 || matches!(self.mode, Mode::Done | Mode::Failed) {
            return Err(FlateError::stream(
                "dictionary must be set before any output",
            ));
        }
        self.window.set_dictionary(dictionary);
        debug!(len = dictionary.len(), "inflate dictionary set");
        Ok(())
    }

    /// The current history, oldest byte first.
    pub fn get_dictionary(&self) -> Vec<u8> {
        self.window.contents()
    }

    fn offset(&self) -> u64 {
        self.reader.total_bits() / 8
    }

    fn corrupted(&self, message: &str) -> FlateError {
        FlateError::corrupted(self.offset(), message)
    }

    /// Mode after an end-of-block.
    fn next_block(&self) -> Mode {
        if self.last_block {
            debug!(total_out = self.total_out, "inflate reached final block end");
            Mode::Done
        } else {
            Mode::BlockHeader
        }
    }

    /// Run the state machine until input or output runs out.
    fn run(&mut self, input: &[u8], output: &mut [u8], out_pos: &mut usize) -> Result<DecompressStatus> {
        loop {
            match self.mode {
                Mode::BlockHeader => {
                    let Some(header) = self.reader.read_bits(input, 3) else {
                        return Ok(DecompressStatus::NeedsInput);
                    };
                    self.last_block = header & 1 == 1;
                    self.mode = match header >> 1 {
                        0 => {
                            self.reader.align_to_byte();
                            Mode::StoredHeader
                        }
                        1 => {
                            self.tables = Tables::Fixed;
                            Mode::DecodeSymbols
                        }
                        2 => Mode::DynamicHeader,
                        _ => return Err(self.corrupted("invalid block type")),
                    };
                    trace!(block_type = header >> 1, last = self.last_block, "inflate block");
                }

                Mode::StoredHeader => {
                    let Some(lengths) = self.reader.read_bits(input, 32) else {
                        return Ok(DecompressStatus::NeedsInput);
                    };
                    let len = lengths & 0xFFFF;
                    let nlen = lengths >> 16;
                    if len != !nlen & 0xFFFF {
                        return Err(self.corrupted("stored block length check failed"));
                    }
                    self.mode = Mode::StoredCopy {
                        remaining: len as usize,
                    };
                }

                Mode::StoredCopy { remaining } => {
                    if remaining == 0 {
                        self.mode = self.next_block();
                        continue;
                    }
                    if *out_pos == output.len() {
                        return Ok(DecompressStatus::NeedsOutput);
                    }

                    // Whole bytes may still sit in the bit buffer.
                    if let Some(byte) = self.reader.take_buffered_byte() {
                        output[*out_pos] = byte;
                        self.window.push(byte);
                        *out_pos += 1;
                        self.mode = Mode::StoredCopy {
                            remaining: remaining - 1,
                        };
                        continue;
                    }

                    let start = self.reader.bytes_consumed();
                    let available = input.len() - start;
                    if available == 0 {
                        return Ok(DecompressStatus::NeedsInput);
                    }
                    let n = remaining.min(available).min(output.len() - *out_pos);
                    let dest = &mut output[*out_pos..*out_pos + n];
                    dest.copy_from_slice(&input[start..start + n]);
                    self.window.append(dest);
                    self.reader.advance_bytes(n);
                    *out_pos += n;
                    self.mode = Mode::StoredCopy {
                        remaining: remaining - n,
                    };
                }

                Mode::DynamicHeader => {
                    let Some(bits) = self.reader.read_bits(input, 14) else {
                        return Ok(DecompressStatus::NeedsInput);
                    };
                    self.hlit = (bits & 0x1F) as usize + 257;
                    self.hdist = ((bits >> 5) & 0x1F) as usize + 1;
                    self.hclen = (bits >> 10) as usize + 4;
                    if self.hlit > NUM_LITLEN_SYMBOLS || self.hdist > NUM_DISTANCE_SYMBOLS {
                        return Err(self.corrupted("too many length or distance symbols"));
                    }
                    self.codelen_lengths = [0; NUM_CODELEN_SYMBOLS];
                    self.mode = Mode::CodeLengthCodes { index: 0 };
                }

                Mode::CodeLengthCodes { index } => {
                    if index == self.hclen {
                        self.codelen = HuffmanTable::build(&self.codelen_lengths)?;
                        self.mode = Mode::CodeLengths {
                            index: 0,
                            repeat: None,
                        };
                        continue;
                    }
                    let Some(len) = self.reader.read_bits(input, 3) else {
                        return Ok(DecompressStatus::NeedsInput);
                    };
                    self.codelen_lengths[CODE_LENGTH_ORDER[index]] = len as u8;
                    self.mode = Mode::CodeLengthCodes { index: index + 1 };
                }

                Mode::CodeLengths { index, repeat } => {
                    let total = self.hlit + self.hdist;
                    if index == total {
                        if self.lengths[END_OF_BLOCK as usize] == 0 {
                            return Err(self.corrupted("missing end-of-block code"));
                        }
                        self.litlen = HuffmanTable::build(&self.lengths[..self.hlit])?;
                        self.distance = HuffmanTable::build(&self.lengths[self.hlit..total])?;
                        self.tables = Tables::Dynamic;
                        self.mode = Mode::DecodeSymbols;
                        continue;
                    }

                    let symbol = match repeat {
                        Some(symbol) => symbol,
                        None => match self.codelen.decode(&mut self.reader, input)? {
                            Some(symbol) => symbol,
                            None => return Ok(DecompressStatus::NeedsInput),
                        },
                    };

                    if symbol < 16 {
                        self.lengths[index] = symbol as u8;
                        self.mode = Mode::CodeLengths {
                            index: index + 1,
                            repeat: None,
                        };
                        continue;
                    }

                    let (extra_bits, base) = match symbol {
                        16 => (2, 3),
                        17 => (3, 3),
                        _ => (7, 11),
                    };
                    let Some(extra) = self.reader.read_bits(input, extra_bits) else {
                        self.mode = Mode::CodeLengths {
                            index,
                            repeat: Some(symbol),
                        };
                        return Ok(DecompressStatus::NeedsInput);
                    };
                    let count = base + extra as usize;
                    let value = if symbol == 16 {
                        if index == 0 {
                            return Err(self.corrupted("repeat with no previous length"));
                        }
                        self.lengths[index - 1]
                    } else {
                        0
                    };
                    if index + count > total {
                        return Err(self.corrupted("code length repeat overflows"));
                    }
                    self.lengths[index..index + count].fill(value);
                    self.mode = Mode::CodeLengths {
                        index: index + count,
                        repeat: None,
                    };
                }

                Mode::DecodeSymbols => {
                    // With no room left only an end-of-block or a length may go through.
                    let checkpoint = self.reader.save_state();
                    let table = match self.tables {
                        Tables::Fixed => &fixed_tables().litlen,
                        Tables::Dynamic => &self.litlen,
                    };
                    let Some(symbol) = table.decode(&mut self.reader, input)? else {
                        return Ok(DecompressStatus::NeedsInput);
                    };
                    match symbol {
                        0..=255 if *out_pos == output.len() => {
                            self.reader.restore_state(checkpoint);
                            return Ok(DecompressStatus::NeedsOutput);
                        }
                        0..=255 => {
                            output[*out_pos] = symbol as u8;
                            self.window.push(symbol as u8);
                            *out_pos += 1;
                        }
                        END_OF_BLOCK => self.mode = self.next_block(),
                        _ => self.mode = Mode::LengthExtra { symbol },
                    }
                }

                Mode::LengthExtra { symbol } => {
                    let Some((base, extra_bits)) = length_base(symbol) else {
                        return Err(self.corrupted("invalid literal/length symbol"));
                    };
                    let Some(extra) = self.reader.read_bits(input, extra_bits) else {
                        return Ok(DecompressStatus::NeedsInput);
                    };
                    self.mode = Mode::Distance {
                        length: base as usize + extra as usize,
                    };
                }

                Mode::Distance { length } => {
                    let table = match self.tables {
                        Tables::Fixed => &fixed_tables().distance,
                        Tables::Dynamic => &self.distance,
                    };
                    let Some(code) = table.decode(&mut self.reader, input)? else {
                        return Ok(DecompressStatus::NeedsInput);
                    };
                    if code as usize >= NUM_DISTANCE_SYMBOLS {
                        return Err(self.corrupted("invalid distance code"));
                    }
                    self.mode = Mode::DistanceExtra { length, code };
                }

                Mode::DistanceExtra { length, code } => {
                    let Some((base, extra_bits)) = distance_base(code) else {
                        return Err(self.corrupted("invalid distance code"));
                    };
                    let Some(extra) = self.reader.read_bits(input, extra_bits) else {
                        return Ok(DecompressStatus::NeedsInput);
                    };
                    let distance = base as usize + extra as usize;
                    if distance > self.window.len() {
                        return Err(FlateError::invalid_distance(distance, self.window.len()));
                    }
                    self.mode = Mode::MatchCopy { length, distance };
                }

                Mode::MatchCopy { length, distance } => {
                    if *out_pos == output.len() {
                        return Ok(DecompressStatus::NeedsOutput);
                    }
                    let copied = self
                        .window
                        .copy_match(distance, length, &mut output[*out_pos..])?;
                    *out_pos += copied;
                    self.mode = if copied == length {
                        Mode::DecodeSymbols
                    } else {
                        Mode::MatchCopy {
                            length: length - copied,
                            distance,
                        }
                    };
                }

                Mode::Done => return Ok(DecompressStatus::Done),

                Mode::Failed => {
                    return Err(FlateError::stream("inflate stream is in an error state"));
                }
            }
        }
    }
}

impl Decompressor for Inflater {
    fn decompress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<(usize, usize, DecompressStatus)> {
        match self.mode {
            Mode::Done => return Ok((0, 0, DecompressStatus::Done)),
            Mode::Failed => return Err(FlateError::stream("inflate stream is in an error state")),
            _ => {}
        }

        self.reader.begin();
        let mut produced = 0;
        let result = self.run(input, output, &mut produced);
        let consumed = self.reader.bytes_consumed();
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
                debug!(error = %err, offset = self.offset(), "inflate failed");
                self.mode = Mode::Failed;
                Err(err)
            }
        }
    }

    fn reset(&mut self) {
        let mut window = std::mem::take(&mut self.window);
        window.clear();
        *self = Self::with_window(self.config, window);
    }

    fn is_finished(&self) -> bool {
        self.mode == Mode::Done
    }
}
