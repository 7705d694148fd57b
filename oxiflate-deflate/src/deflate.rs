//! Streaming DEFLATE compression.
//!
//! This module implements DEFLATE compression as specified in RFC 1951.
//! Input is parsed into LZ77 tokens by a [`MatchFinder`]; once a block's
//! token buffer fills up (or a flush asks for it) the block is written with
//! whichever of the three encodings is smallest:
//! - Stored blocks (no compression)
//! - Fixed Huffman codes
//! - Dynamic Huffman codes
//!
//! [`Deflater`] never blocks: it accepts what input it can, parks encoded
//! bytes in its bit writer and hands them out as output space is offered.

use crate::config::DeflateConfig;
use crate::huffman::{EncodeTable, HuffmanBuilder};
use crate::lz77::{LevelParams, Lz77Token, MIN_LOOKAHEAD, MatchFinder, ParseKind, TOO_FAR};
use crate::tables::{
    CODE_LENGTH_ORDER, DISTANCE_EXTRA_BITS, END_OF_BLOCK, LENGTH_EXTRA_BITS, MAX_CODE_BITS,
    MAX_CODELEN_BITS, MAX_STORED_BLOCK, MIN_MATCH, NUM_CODELEN_SYMBOLS, NUM_DISTANCE_SYMBOLS,
    NUM_LITLEN_SYMBOLS, block_type, distance_to_code, fixed_tables, length_to_code,
};
use oxiflate_core::bitstream::BitWriter;
use oxiflate_core::checksum::adler32;
use oxiflate_core::error::{FlateError, Result};
use oxiflate_core::traits::{CompressStatus, CompressionLevel, Compressor, FlushMode, Strategy};
use tracing::{debug, trace};

/// Worst-case compressed size of `len` bytes with default settings, for a
/// single [`FlushMode::Finish`] call sequence without intermediate flushes.
pub fn deflate_bound(len: usize) -> usize {
    bound_for(len, DeflateConfig::default().token_limit())
}

fn bound_for(len: usize, token_limit: usize) -> usize {
    len + 6 * (len / token_limit + len / MAX_STORED_BLOCK + 2) + 1
}

/// Compress `data` into a raw DEFLATE stream at `level` (0-9).
pub fn deflate(data: &[u8], level: u8) -> Result<Vec<u8>> {
    let mut deflater = Deflater::new(DeflateConfig::new(level))?;
    deflater.compress_all(data)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Running,
    Finished,
}

/// Encoding picked for a block.
#[derive(Debug)]
enum BlockChoice {
    Stored,
    Fixed,
    Dynamic(Box<DynamicHeader>),
}

/// Streaming DEFLATE compressor.
#[derive(Debug)]
pub struct Deflater {
    config: DeflateConfig,
    params: LevelParams,
    finder: MatchFinder,
    writer: BitWriter,
    /// Tokens of the current block.
    tokens: Vec<Lz77Token>,
    token_limit: usize,
    /// Raw bytes covered by `tokens`, kept for the stored encoding.
    block_bytes: Vec<u8>,
    litlen_freq: [u32; NUM_LITLEN_SYMBOLS],
    dist_freq: [u32; NUM_DISTANCE_SYMBOLS],
    /// The byte before the cursor has not been emitted yet.
    match_available: bool,
    /// Match starting at the byte before the cursor, as (length, distance).
    prev_match: Option<(usize, usize)>,
    state: State,
    total_in: u64,
    total_out: u64,
    /// Input total and mode of the last Sync or Full flush.
    last_flush: Option<(u64, FlushMode)>,
}

impl Default for Deflater {
    fn default() -> Self {
        Self::with_level(CompressionLevel::DEFAULT)
    }
}

impl Deflater {
    /// Create a compressor, validating `config`.
    pub fn new(config: DeflateConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid(config))
    }

    /// Create a compressor with default settings at `level`.
    pub fn with_level(level: impl Into<CompressionLevel>) -> Self {
        Self::from_valid(DeflateConfig::from(level.into()))
    }

    fn from_valid(config: DeflateConfig) -> Self {
        Self {
            config,
            params: LevelParams::for_level(config.level),
            finder: MatchFinder::new(config.window_bits, config.mem_level),
            writer: BitWriter::new(),
            tokens: Vec::with_capacity(config.token_limit()),
            token_limit: config.token_limit(),
            block_bytes: Vec::new(),
            litlen_freq: [0; NUM_LITLEN_SYMBOLS],
            dist_freq: [0; NUM_DISTANCE_SYMBOLS],
            match_available: false,
            prev_match: None,
            state: State::Running,
            total_in: 0,
            total_out: 0,
            last_flush: None,
        }
    }

    /// Current settings.
    pub fn config(&self) -> &DeflateConfig {
        &self.config
    }

    /// Total input bytes accepted.
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    /// Total compressed bytes handed out.
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Compressed bytes waiting for output space.
    pub fn pending_output(&self) -> usize {
        self.writer.pending_len()
    }

    /// Worst-case compressed size of `len` bytes with these settings.
    pub fn bound(&self, len: usize) -> usize {
        bound_for(len, self.token_limit)
    }

    /// Preload the match history.
    ///
    /// Only allowed before any input. Returns the Adler-32 of `dictionary`,
    /// which zlib streams record as DICTID.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<u32> {
        if self.total_in > 0 || self.state == State::Finished {
            return Err(FlateError::stream(
                "dictionary must be set before any input",
            ));
        }
        self.finder.set_dictionary(dictionary);
        debug!(len = dictionary.len(), "deflate dictionary set");
        Ok(adler32(0, dictionary))
    }

    /// Change level and strategy mid-stream.
    ///
    /// Data already accepted is compressed with the old settings and closed
    /// off in its own block first.
    pub fn set_params(&mut self, level: u8, strategy: Strategy) -> Result<()> {
        CompressionLevel::try_new(level)?;
        if self.state == State::Finished {
            return Err(FlateError::stream("stream already finished"));
        }

        let params = LevelParams::for_level(level);
        if params == self.params && strategy == self.config.strategy {
            return Ok(());
        }
        if self.has_buffered_input() {
            self.drain_parser();
            self.emit_block(false);
        }
        if params.kind == ParseKind::Stored {
            // Stored input bypasses the window, so older history goes stale.
            self.finder.forget_history();
        }

        self.config.level = level;
        self.config.strategy = strategy;
        self.params = params;
        debug!(level, strategy = strategy.name(), "deflate parameters changed");
        Ok(())
    }

    /// Finish the compressor's lifetime.
    ///
    /// Fails if input or output is still pending.
    pub fn end(self) -> Result<()> {
        if self.writer.has_pending() || (self.state != State::Finished && self.has_buffered_input())
        {
            return Err(FlateError::stream("deflate stream ended with pending data"));
        }
        Ok(())
    }

    /// Drop the compressor whatever its state.
    pub fn discard(self) {}

    fn has_buffered_input(&self) -> bool {
        self.finder.lookahead() > 0
            || self.match_available
            || !self.tokens.is_empty()
            || !self.block_bytes.is_empty()
    }

    // ------------------------------------------------------------------------
    // Input and parsing
    // ------------------------------------------------------------------------

    fn take_input(&mut self, input: &[u8]) -> usize {
        let taken = if self.params.kind == ParseKind::Stored {
            let n = (MAX_STORED_BLOCK - self.block_bytes.len()).min(input.len());
            self.block_bytes.extend_from_slice(&input[..n]);
            if self.block_bytes.len() == MAX_STORED_BLOCK {
                self.emit_block(false);
            }
            n
        } else {
            self.finder.fill(input)
        };
        self.total_in += taken as u64;
        taken
    }

    /// Parse buffered input until the lookahead runs low or a block fills.
    ///
    /// When `flushing`, the lookahead is parsed to the end.
    fn parse(&mut self, flushing: bool) {
        if self.params.kind == ParseKind::Stored {
            return;
        }
        loop {
            let lookahead = self.finder.lookahead();
            if lookahead == 0 || (lookahead < MIN_LOOKAHEAD && !flushing) {
                return;
            }

            match (self.config.strategy, self.params.kind) {
                (Strategy::HuffmanOnly, _) => {
                    self.tally_literal(self.finder.strstart());
                    self.finder.advance(1);
                }
                (Strategy::Rle, _) => self.rle_step(),
                (_, ParseKind::Lazy) => self.lazy_step(),
                _ => self.greedy_step(),
            }

            if self.tokens.len() >= self.token_limit {
                self.emit_block(false);
                return;
            }
        }
    }

    /// Parse everything buffered, emitting full blocks as they fill.
    fn drain_parser(&mut self) {
        while self.finder.lookahead() > 0 {
            self.parse(true);
        }
        self.flush_pending_match();
    }

    /// Drop matches the strategy considers not worth a back-reference.
    fn filter(&self, found: Option<(usize, usize)>) -> Option<(usize, usize)> {
        found.filter(|&(length, distance)| {
            let filtered = self.config.strategy == Strategy::Filtered && length <= 5;
            let too_far = length == MIN_MATCH && distance > TOO_FAR;
            !(filtered || too_far)
        })
    }

    /// Take the longest match at the cursor right away.
    fn greedy_step(&mut self) {
        let strstart = self.finder.strstart();
        let max_dist = self.finder.max_dist();
        let found = self
            .finder
            .insert(strstart)
            .filter(|&head| head < strstart && strstart - head <= max_dist)
            .and_then(|head| self.finder.longest_match(head, 0, &self.params));

        match self.filter(found) {
            Some((length, distance)) => {
                self.tally_match(strstart, length, distance);
                if length <= self.params.max_lazy {
                    for _ in 1..length {
                        self.finder.advance(1);
                        self.finder.insert(self.finder.strstart());
                    }
                    self.finder.advance(1);
                } else {
                    self.finder.advance(length);
                }
            }
            None => {
                self.tally_literal(strstart);
                self.finder.advance(1);
            }
        }
    }

    /// Hold each match back one byte in case the next position does better.
    fn lazy_step(&mut self) {
        let strstart = self.finder.strstart();
        let max_dist = self.finder.max_dist();
        let head = self.finder.insert(strstart);
        let prev_length = self.prev_match.map_or(MIN_MATCH - 1, |(length, _)| length);

        let current = match head {
            Some(head)
                if prev_length < self.params.max_lazy
                    && head < strstart
                    && strstart - head <= max_dist =>
            {
                let found = self.finder.longest_match(head, prev_length, &self.params);
                self.filter(found)
            }
            _ => None,
        };

        match self.prev_match {
            Some((length, distance)) if current.is_none() => {
                self.tally_match(strstart - 1, length, distance);
                // The cursor is hashed already; hash the rest of the match
                // except its final byte, which the next step hashes.
                for _ in 0..length - 2 {
                    self.finder.advance(1);
                    self.finder.insert(self.finder.strstart());
                }
                self.finder.advance(1);
                self.match_available = false;
                self.prev_match = None;
            }
            _ => {
                if self.match_available {
                    self.tally_literal(strstart - 1);
                }
                self.match_available = true;
                self.prev_match = current;
                self.finder.advance(1);
            }
        }
    }

    /// Distance-1 runs only.
    fn rle_step(&mut self) {
        let strstart = self.finder.strstart();
        match self.finder.run_length() {
            Some(length) => {
                self.tally_match(strstart, length, 1);
                self.finder.advance(length);
            }
            None => {
                self.tally_literal(strstart);
                self.finder.advance(1);
            }
        }
    }

    /// Emit whatever the lazy parser is still holding back.
    fn flush_pending_match(&mut self) {
        if !self.match_available {
            return;
        }
        // A held match is always emitted while lookahead remains.
        debug_assert!(self.prev_match.is_none());
        self.tally_literal(self.finder.strstart() - 1);
        self.match_available = false;
    }

    fn tally_literal(&mut self, pos: usize) {
        let byte = self.finder.byte_at(pos);
        self.tokens.push(Lz77Token::Literal(byte));
        self.litlen_freq[byte as usize] += 1;
        self.block_bytes.push(byte);
    }

    fn tally_match(&mut self, pos: usize, length: usize, distance: usize) {
        let (length, distance) = (length as u16, distance as u16);
        self.tokens.push(Lz77Token::Match { length, distance });
        self.litlen_freq[length_to_code(length).0 as usize] += 1;
        self.dist_freq[distance_to_code(distance).0 as usize] += 1;
        self.block_bytes
            .extend_from_slice(self.finder.bytes(pos, length as usize));
    }

    // ------------------------------------------------------------------------
    // Block output
    // ------------------------------------------------------------------------

    /// Write the current block, choosing the cheapest encoding.
    fn emit_block(&mut self, last: bool) {
        if self.tokens.is_empty() && self.block_bytes.is_empty() {
            if last {
                if self.params.kind == ParseKind::Stored {
                    self.write_stored(&[], true);
                } else {
                    // An empty fixed block: `03 00` on its own.
                    self.writer.write_bits(1, 1);
                    self.writer.write_bits(block_type::FIXED, 2);
                    let (code, len) = fixed_tables().litlen_codes.code(END_OF_BLOCK as usize);
                    self.writer.write_bits(code as u32, len);
                }
            }
            return;
        }

        let mut litlen_freq = self.litlen_freq;
        litlen_freq[END_OF_BLOCK as usize] += 1;
        let choice = self.choose_block(&litlen_freq);

        let before = self.writer.total_bits();
        match &choice {
            BlockChoice::Stored => {
                let bytes = std::mem::take(&mut self.block_bytes);
                self.write_stored(&bytes, last);
                self.block_bytes = bytes;
            }
            BlockChoice::Fixed => {
                let fixed = fixed_tables();
                self.writer.write_bits(last as u32, 1);
                self.writer.write_bits(block_type::FIXED, 2);
                write_tokens(
                    &mut self.writer,
                    &self.tokens,
                    &fixed.litlen_codes,
                    &fixed.distance_codes,
                );
            }
            BlockChoice::Dynamic(header) => {
                self.writer.write_bits(last as u32, 1);
                self.writer.write_bits(block_type::DYNAMIC, 2);
                header.write(&mut self.writer);
                write_tokens(
                    &mut self.writer,
                    &self.tokens,
                    &header.litlen,
                    &header.distance,
                );
            }
        }
        debug!(
            kind = choice.name(),
            tokens = self.tokens.len(),
            bytes = self.block_bytes.len(),
            bits = self.writer.total_bits() - before,
            last,
            "emitted deflate block"
        );

        self.tokens.clear();
        self.block_bytes.clear();
        self.litlen_freq = [0; NUM_LITLEN_SYMBOLS];
        self.dist_freq = [0; NUM_DISTANCE_SYMBOLS];
    }

    fn choose_block(&self, litlen_freq: &[u32]) -> BlockChoice {
        if self.params.kind == ParseKind::Stored {
            return BlockChoice::Stored;
        }

        let extra_bits: u64 = litlen_freq[257..]
            .iter()
            .zip(LENGTH_EXTRA_BITS)
            .chain(self.dist_freq.iter().zip(DISTANCE_EXTRA_BITS))
            .map(|(&freq, bits)| freq as u64 * bits as u64)
            .sum();

        let fixed = fixed_tables();
        let fixed_bits = 3
            + fixed.litlen_codes.cost(litlen_freq)
            + fixed.distance_codes.cost(&self.dist_freq)
            + extra_bits;

        let chunks = self.block_bytes.len().div_ceil(MAX_STORED_BLOCK).max(1) as u64;
        let stored_bits = chunks * (3 + 7 + 32) + 8 * self.block_bytes.len() as u64;

        let dynamic = (self.config.strategy != Strategy::Fixed).then(|| {
            let header = DynamicHeader::build(litlen_freq, &self.dist_freq);
            let bits = 3
                + header.bits
                + header.litlen.cost(litlen_freq)
                + header.distance.cost(&self.dist_freq)
                + extra_bits;
            (header, bits)
        });

        match dynamic {
            Some((header, bits)) if bits < fixed_bits && bits < stored_bits => {
                BlockChoice::Dynamic(Box::new(header))
            }
            _ if stored_bits <= fixed_bits => BlockChoice::Stored,
            _ => BlockChoice::Fixed,
        }
    }

    /// Write `data` as one or more stored blocks.
    fn write_stored(&mut self, data: &[u8], last: bool) {
        let mut chunks = data.chunks(MAX_STORED_BLOCK).peekable();
        if data.is_empty() {
            self.write_stored_chunk(&[], last);
            return;
        }
        while let Some(chunk) = chunks.next() {
            let final_chunk = last && chunks.peek().is_none();
            self.write_stored_chunk(chunk, final_chunk);
        }
    }

    fn write_stored_chunk(&mut self, chunk: &[u8], last: bool) {
        let len = chunk.len() as u16;
        self.writer.write_bits(last as u32, 1);
        self.writer.write_bits(block_type::STORED, 2);
        self.writer.align_to_byte();
        self.writer.write_bits(len as u32, 16);
        self.writer.write_bits(!len as u32, 16);
        self.writer.write_bytes(chunk);
    }

    /// Close the current block and append an empty stored block, leaving the
    /// output byte aligned.
    fn sync_flush(&mut self, mode: FlushMode) {
        self.drain_parser();
        self.emit_block(false);
        self.write_stored_chunk(&[], false);
        if mode == FlushMode::Full {
            self.finder.forget_history();
        }
        trace!(?mode, total_in = self.total_in, "deflate flush point");
    }

    fn finish(&mut self) {
        self.drain_parser();
        self.emit_block(true);
        self.writer.align_to_byte();
        self.state = State::Finished;
        debug!(
            total_in = self.total_in,
            total_out = self.total_out + self.writer.pending_len() as u64,
            "deflate stream finished"
        );
    }

    fn drain(&mut self, output: &mut [u8]) -> usize {
        let n = self.writer.drain_into(output);
        self.total_out += n as u64;
        n
    }
}

impl Compressor for Deflater {
    fn compress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, CompressStatus)> {
        if self.state == State::Finished {
            if !input.is_empty() || flush != FlushMode::Finish {
                return Err(FlateError::stream("deflate stream already finished"));
            }
            let produced = self.drain(output);
            let status = if self.writer.has_pending() {
                CompressStatus::NeedsOutput
            } else {
                CompressStatus::Done
            };
            return Ok((0, produced, status));
        }

        let mut consumed = 0;
        let mut produced = 0;
        loop {
            produced += self.drain(&mut output[produced..]);
            if self.writer.has_pending() {
                return Ok((consumed, produced, CompressStatus::NeedsOutput));
            }

            if consumed < input.len() {
                consumed += self.take_input(&input[consumed..]);
            }
            let input_done = consumed == input.len();
            self.parse(input_done && flush != FlushMode::None);
            if self.writer.has_pending() || !input_done {
                continue;
            }

            match flush {
                FlushMode::None => return Ok((consumed, produced, CompressStatus::NeedsInput)),
                FlushMode::Sync | FlushMode::Full => {
                    let repeated = matches!(
                        self.last_flush,
                        Some((total, mode)) if total == self.total_in
                            && (mode == flush || mode == FlushMode::Full)
                    );
                    if repeated {
                        return Ok((consumed, produced, CompressStatus::NeedsInput));
                    }
                    self.sync_flush(flush);
                    self.last_flush = Some((self.total_in, flush));
                }
                FlushMode::Finish => {
                    self.finish();
                    produced += self.drain(&mut output[produced..]);
                    let status = if self.writer.has_pending() {
                        CompressStatus::NeedsOutput
                    } else {
                        CompressStatus::Done
                    };
                    return Ok((consumed, produced, status));
                }
            }
        }
    }

    fn reset(&mut self) {
        *self = Self::from_valid(self.config);
    }

    fn is_finished(&self) -> bool {
        self.state == State::Finished && !self.writer.has_pending()
    }
}

impl BlockChoice {
    fn name(&self) -> &'static str {
        match self {
            Self::Stored => "stored",
            Self::Fixed => "fixed",
            Self::Dynamic(_) => "dynamic",
        }
    }
}

/// Write block tokens followed by end-of-block.
fn write_tokens(
    writer: &mut BitWriter,
    tokens: &[Lz77Token],
    litlen: &EncodeTable,
    distance: &EncodeTable,
) {
    for token in tokens {
        match *token {
            Lz77Token::Literal(byte) => {
                let (code, len) = litlen.code(byte as usize);
                writer.write_bits(code as u32, len);
            }
            Lz77Token::Match {
                length,
                distance: dist,
            } => {
                let (symbol, extra_bits, extra) = length_to_code(length);
                let (code, len) = litlen.code(symbol as usize);
                writer.write_bits(code as u32, len);
                writer.write_bits(extra as u32, extra_bits);

                let (symbol, extra_bits, extra) = distance_to_code(dist);
                let (code, len) = distance.code(symbol as usize);
                writer.write_bits(code as u32, len);
                writer.write_bits(extra as u32, extra_bits);
            }
        }
    }
    let (code, len) = litlen.code(END_OF_BLOCK as usize);
    writer.write_bits(code as u32, len);
}

// ============================================================================
// Dynamic block header
// ============================================================================

/// Codes and header encoding of a dynamic block.
#[derive(Debug)]
struct DynamicHeader {
    litlen: EncodeTable,
    distance: EncodeTable,
    codelen: EncodeTable,
    hlit: usize,
    hdist: usize,
    hclen: usize,
    /// Run-length coded code lengths as (symbol, extra value).
    items: Vec<(u8, u8)>,
    /// Header size after the 3 block-type bits.
    bits: u64,
}

impl DynamicHeader {
    fn build(litlen_freq: &[u32], dist_freq: &[u32]) -> Self {
        let litlen_lengths = HuffmanBuilder::build_lengths(litlen_freq, MAX_CODE_BITS);
        let dist_lengths = HuffmanBuilder::build_lengths(dist_freq, MAX_CODE_BITS);

        let hlit = used_prefix(&litlen_lengths).max(257);
        let hdist = used_prefix(&dist_lengths).max(1);
        let mut combined = litlen_lengths[..hlit].to_vec();
        combined.extend_from_slice(&dist_lengths[..hdist]);
        let items = run_length_encode(&combined);

        let mut codelen_freq = [0u32; NUM_CODELEN_SYMBOLS];
        for &(symbol, _) in &items {
            codelen_freq[symbol as usize] += 1;
        }
        let codelen_lengths = HuffmanBuilder::build_lengths(&codelen_freq, MAX_CODELEN_BITS);
        let hclen = CODE_LENGTH_ORDER
            .iter()
            .rposition(|&symbol| codelen_lengths[symbol] != 0)
            .map_or(0, |i| i + 1)
            .max(4);
        let codelen = EncodeTable::from_lengths(&codelen_lengths);

        let item_bits: u64 = items
            .iter()
            .map(|&(symbol, _)| (codelen.length(symbol as usize) + repeat_bits(symbol)) as u64)
            .sum();

        Self {
            litlen: EncodeTable::from_lengths(&litlen_lengths),
            distance: EncodeTable::from_lengths(&dist_lengths),
            codelen,
            hlit,
            hdist,
            hclen,
            items,
            bits: 5 + 5 + 4 + 3 * hclen as u64 + item_bits,
        }
    }

    fn write(&self, writer: &mut BitWriter) {
        writer.write_bits((self.hlit - 257) as u32, 5);
        writer.write_bits((self.hdist - 1) as u32, 5);
        writer.write_bits((self.hclen - 4) as u32, 4);
        for &symbol in &CODE_LENGTH_ORDER[..self.hclen] {
            writer.write_bits(self.codelen.length(symbol) as u32, 3);
        }
        for &(symbol, extra) in &self.items {
            let (code, len) = self.codelen.code(symbol as usize);
            writer.write_bits(code as u32, len);
            writer.write_bits(extra as u32, repeat_bits(symbol));
        }
    }
}

/// Number of leading entries up to the last nonzero length.
fn used_prefix(lengths: &[u8]) -> usize {
    lengths.iter().rposition(|&len| len != 0).map_or(0, |i| i + 1)
}

/// Extra bits carried by a code-length symbol.
fn repeat_bits(symbol: u8) -> u8 {
    match symbol {
        16 => 2,
        17 => 3,
        18 => 7,
        _ => 0,
    }
}

/// Run-length code a sequence of code lengths with symbols 16, 17 and 18.
fn run_length_encode(lengths: &[u8]) -> Vec<(u8, u8)> {
    let mut items = Vec::new();
    let mut i = 0;
    while i < lengths.len() {
        let len = lengths[i];
        let run = lengths[i..].iter().take_while(|&&l| l == len).count();
        i += run;

        if len == 0 {
            let mut left = run;
            while left >= 11 {
                let n = left.min(138);
                items.push((18, (n - 11) as u8));
                left -= n;
            }
            if left >= 3 {
                items.push((17, (left - 3) as u8));
                left = 0;
            }
            items.extend(std::iter::repeat_n((0, 0), left));
        } else {
            items.push((len, 0));
            let mut left = run - 1;
            while left >= 3 {
                let n = left.min(6);
                items.push((16, (n - 3) as u8));
                left -= n;
            }
            items.extend(std::iter::repeat_n((len, 0), left));
        }
    }
    items
}
