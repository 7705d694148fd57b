//! Canonical Huffman coding for DEFLATE.
//!
//! DEFLATE transmits only the code length of each symbol; the codes
//! themselves follow from the canonical assignment of RFC 1951 §3.2.2, where
//! shorter codes come first and codes of equal length are ordered by symbol.
//!
//! # Alphabets
//!
//! - **Literal/Length**: 0-285 (0-255 literals, 256 EOB, 257-285 lengths)
//! - **Distance**: 0-29
//! - **Code Length**: 0-18 (for transmitting dynamic tables)
//!
//! [`HuffmanTable`] decodes, [`EncodeTable`] encodes, and [`HuffmanBuilder`]
//! derives length-limited code lengths from symbol frequencies.

use oxiflate_core::bitstream::BitReader;
use oxiflate_core::error::{FlateError, Result};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Longest code DEFLATE allows.
pub const MAX_CODE_LENGTH: usize = 15;

/// Bits resolved by the direct lookup table.
const FAST_BITS: u8 = 9;

// ============================================================================
// Decoding
// ============================================================================

/// A canonical Huffman decoding table.
///
/// Codes up to [`FAST_BITS`] long resolve through a direct lookup indexed by
/// the next input bits. Longer codes, and lookups with too few buffered bits,
/// fall back to a walk over the per-length counts and the symbols sorted in
/// canonical order.
#[derive(Debug, Clone)]
pub struct HuffmanTable {
    /// Number of codes of each length.
    counts: [u16; MAX_CODE_LENGTH + 1],
    /// Symbols ordered by (length, symbol).
    symbols: Vec<u16>,
    /// Fast lookup: `symbol << 4 | length`, or 0 when the slow path applies.
    fast: Vec<u16>,
    /// Longest code in the table.
    max_len: u8,
}

impl HuffmanTable {
    /// Build a decoding table from per-symbol code lengths.
    ///
    /// A length of 0 means the symbol is unused. Fails with
    /// [`FlateError::InvalidHuffmanTree`] if the lengths over-subscribe the
    /// code space and with [`FlateError::IncompleteHuffmanTree`] if they leave
    /// part of it unused, unless the table is a single code of length 1. All
    /// zero lengths give an empty table that rejects every input.
    pub fn build(lengths: &[u8]) -> Result<Self> {
        let counts = count_lengths(lengths)?;
        let total: u32 = counts[1..].iter().map(|&c| c as u32).sum();
        if total == 0 {
            return Ok(Self::assemble(lengths));
        }

        let mut left: i32 = 1;
        for &count in &counts[1..] {
            left <<= 1;
            left -= count as i32;
            if left < 0 {
                return Err(FlateError::InvalidHuffmanTree);
            }
        }

        let single_bit = total == 1 && counts[1] == 1;
        if left > 0 && !single_bit {
            return Err(FlateError::IncompleteHuffmanTree);
        }

        Ok(Self::assemble(lengths))
    }

    /// Build a table from lengths known to be valid.
    ///
    /// Used for the fixed codes. Lengths above 15 are ignored.
    pub fn assemble(lengths: &[u8]) -> Self {
        let mut counts = [0u16; MAX_CODE_LENGTH + 1];
        for &len in lengths {
            if (1..=MAX_CODE_LENGTH as u8).contains(&len) {
                counts[len as usize] += 1;
            }
        }
        let max_len = (1..=MAX_CODE_LENGTH)
            .rev()
            .find(|&len| counts[len] > 0)
            .unwrap_or(0) as u8;

        // Offset of the first symbol of each length in the sorted array.
        let mut offsets = [0usize; MAX_CODE_LENGTH + 2];
        for len in 1..=MAX_CODE_LENGTH {
            offsets[len + 1] = offsets[len] + counts[len] as usize;
        }
        let mut symbols = vec![0u16; offsets[MAX_CODE_LENGTH + 1]];
        let mut cursor = offsets;
        for (symbol, &len) in lengths.iter().enumerate() {
            if (1..=MAX_CODE_LENGTH as u8).contains(&len) {
                symbols[cursor[len as usize]] = symbol as u16;
                cursor[len as usize] += 1;
            }
        }

        let mut fast = vec![0u16; 1 << FAST_BITS];
        let mut code = 0u32;
        let mut index = 0usize;
        for len in 1..=FAST_BITS as usize {
            for &symbol in &symbols[index..index + counts[len] as usize] {
                let reversed = reverse_bits(code, len as u8) as usize;
                let entry = (symbol << 4) | len as u16;
                let mut slot = reversed;
                while slot < fast.len() {
                    fast[slot] = entry;
                    slot += 1 << len;
                }
                code += 1;
            }
            index += counts[len] as usize;
            code <<= 1;
        }

        Self {
            counts,
            symbols,
            fast,
            max_len,
        }
    }

    /// Whether the table holds no codes at all.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Longest code length in the table.
    pub fn max_len(&self) -> u8 {
        self.max_len
    }

    /// Decode one symbol.
    ///
    /// Returns `Ok(None)` when `input` runs out before a whole code is
    /// available; no bits are consumed then and the call can be repeated
    /// with more input. Input bytes are pulled only as the code needs them.
    #[inline]
    pub fn decode(&self, reader: &mut BitReader, input: &[u8]) -> Result<Option<u16>> {
        if self.symbols.is_empty() {
            return Err(FlateError::invalid_huffman(reader.total_bits()));
        }

        loop {
            let available = reader.bits_available();
            let bits = reader.buffered();

            let entry = self.fast[(bits & ((1 << FAST_BITS) - 1)) as usize];
            let len = (entry & 0xF) as u8;
            if entry != 0 && len <= available {
                reader.skip_bits(len);
                return Ok(Some(entry >> 4));
            }

            match self.walk(bits, available) {
                Walk::Found(symbol, len) => {
                    reader.skip_bits(len);
                    return Ok(Some(symbol));
                }
                Walk::Invalid => return Err(FlateError::invalid_huffman(reader.total_bits())),
                Walk::NeedMore => {
                    if !reader.pull_byte(input) {
                        return Ok(None);
                    }
                }
            }
        }
    }

    /// Canonical decode over the buffered bits, one bit at a time.
    fn walk(&self, bits: u64, available: u8) -> Walk {
        let mut code: i32 = 0;
        let mut first: i32 = 0;
        let mut index: i32 = 0;

        for len in 1..=self.max_len {
            if len > available {
                return Walk::NeedMore;
            }
            code |= ((bits >> (len - 1)) & 1) as i32;
            let count = self.counts[len as usize] as i32;
            if code - first < count {
                return Walk::Found(self.symbols[(index + code - first) as usize], len);
            }
            index += count;
            first = (first + count) << 1;
            code <<= 1;
        }
        Walk::Invalid
    }
}

/// Outcome of a slow-path decode attempt.
enum Walk {
    Found(u16, u8),
    NeedMore,
    Invalid,
}

/// Count codes per length, rejecting lengths above 15.
fn count_lengths(lengths: &[u8]) -> Result<[u16; MAX_CODE_LENGTH + 1]> {
    let mut counts = [0u16; MAX_CODE_LENGTH + 1];
    for &len in lengths {
        if len as usize > MAX_CODE_LENGTH {
            return Err(FlateError::InvalidHuffmanTree);
        }
        if len > 0 {
            counts[len as usize] += 1;
        }
    }
    Ok(counts)
}

/// Reverse the low `len` bits of `code`.
#[inline]
fn reverse_bits(code: u32, len: u8) -> u32 {
    if len == 0 {
        return 0;
    }
    code.reverse_bits() >> (32 - len as u32)
}

// ============================================================================
// Encoding
// ============================================================================

/// Canonical codes ready for LSB-first emission.
#[derive(Debug, Clone, Default)]
pub struct EncodeTable {
    /// Bit-reversed codes.
    codes: Vec<u16>,
    lengths: Vec<u8>,
}

impl EncodeTable {
    /// Assign canonical codes to the given lengths.
    pub fn from_lengths(lengths: &[u8]) -> Self {
        let mut counts = [0u16; MAX_CODE_LENGTH + 1];
        for &len in lengths {
            if len > 0 {
                counts[len as usize] += 1;
            }
        }

        let mut next_code = [0u16; MAX_CODE_LENGTH + 1];
        let mut code = 0u16;
        for len in 1..=MAX_CODE_LENGTH {
            code = (code + counts[len - 1]) << 1;
            next_code[len] = code;
        }

        let codes = lengths
            .iter()
            .map(|&len| {
                if len == 0 {
                    return 0;
                }
                let code = next_code[len as usize];
                next_code[len as usize] += 1;
                reverse_bits(code as u32, len) as u16
            })
            .collect();

        Self {
            codes,
            lengths: lengths.to_vec(),
        }
    }

    /// Bit-reversed code and its length for `symbol`.
    #[inline]
    pub fn code(&self, symbol: usize) -> (u16, u8) {
        (self.codes[symbol], self.lengths[symbol])
    }

    /// Code length for `symbol` (0 if unused).
    #[inline]
    pub fn length(&self, symbol: usize) -> u8 {
        self.lengths.get(symbol).copied().unwrap_or(0)
    }

    /// All code lengths.
    pub fn lengths(&self) -> &[u8] {
        &self.lengths
    }

    /// Bits needed to code `freqs` with this table, extra bits excluded.
    pub fn cost(&self, freqs: &[u32]) -> u64 {
        freqs
            .iter()
            .zip(&self.lengths)
            .map(|(&f, &len)| f as u64 * len as u64)
            .sum()
    }
}

// ============================================================================
// Code length construction
// ============================================================================

/// Builds length-limited Huffman code lengths from symbol frequencies.
pub struct HuffmanBuilder;

impl HuffmanBuilder {
    /// Optimal code lengths for `freqs`, none longer than `max_bits`.
    ///
    /// The result always describes a complete code. When fewer than two
    /// symbols occur, unused low symbols are given codes so that at least two
    /// exist.
    pub fn build_lengths(freqs: &[u32], max_bits: u8) -> Vec<u8> {
        let mut lengths = vec![0u8; freqs.len()];

        let mut used: Vec<usize> = (0..freqs.len()).filter(|&i| freqs[i] > 0).collect();
        if used.len() < 2 {
            for symbol in 0..freqs.len() {
                if used.len() >= 2 {
                    break;
                }
                if !used.contains(&symbol) {
                    used.push(symbol);
                }
            }
            used.sort_unstable();
        }
        match used.len() {
            0 => return lengths,
            1 => {
                lengths[used[0]] = 1;
                return lengths;
            }
            _ => {}
        }

        let weight = |symbol: usize| freqs[symbol].max(1) as u64;
        let depths = tree_depths(&used.iter().map(|&s| weight(s)).collect::<Vec<_>>());

        let max = max_bits as usize;
        let mut num_codes = [0u32; MAX_CODE_LENGTH + 1];
        for &depth in &depths {
            num_codes[depth.min(max)] += 1;
        }

        // Clamping overfills the code space; move leaves down until the Kraft
        // sum is exactly one again.
        let mut total: u64 = (1..=max).map(|i| (num_codes[i] as u64) << (max - i)).sum();
        while total > 1 << max {
            num_codes[max] -= 1;
            for i in (1..max).rev() {
                if num_codes[i] != 0 {
                    num_codes[i] -= 1;
                    num_codes[i + 1] += 2;
                    break;
                }
            }
            total -= 1;
        }

        // Most frequent symbols take the shortest codes.
        let mut order = used;
        order.sort_by_key(|&s| (Reverse(weight(s)), s));
        let mut next = order.into_iter();
        for (len, &count) in num_codes.iter().enumerate().take(max + 1).skip(1) {
            for _ in 0..count {
                if let Some(symbol) = next.next() {
                    lengths[symbol] = len as u8;
                }
            }
        }

        lengths
    }
}

/// Leaf depths of a Huffman tree over `weights` (at least two).
fn tree_depths(weights: &[u64]) -> Vec<usize> {
    let leaves = weights.len();
    let mut parent = vec![0usize; 2 * leaves - 1];

    let mut heap: BinaryHeap<Reverse<(u64, usize)>> = weights
        .iter()
        .enumerate()
        .map(|(i, &w)| Reverse((w, i)))
        .collect();

    let mut next = leaves;
    while heap.len() > 1 {
        let (Some(Reverse((w1, a))), Some(Reverse((w2, b)))) = (heap.pop(), heap.pop()) else {
            break;
        };
        parent[a] = next;
        parent[b] = next;
        heap.push(Reverse((w1 + w2, next)));
        next += 1;
    }

    // Parents always have larger indices than their children.
    let root = next - 1;
    let mut depth = vec![0usize; root + 1];
    for node in (0..root).rev() {
        depth[node] = depth[parent[node]] + 1;
    }
    depth.truncate(leaves);
    depth
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::{fixed_distance_lengths, fixed_litlen_lengths};
    use oxiflate_core::bitstream::BitWriter;

    fn kraft_sum(lengths: &[u8], max: u8) -> u64 {
        lengths
            .iter()
            .filter(|&&l| l > 0)
            .map(|&l| 1u64 << (max - l))
            .sum()
    }

    fn encode(table: &EncodeTable, symbols: &[usize]) -> Vec<u8> {
        let mut writer = BitWriter::new();
        for &s in symbols {
            let (code, len) = table.code(s);
            writer.write_bits(code as u32, len);
        }
        writer.align_to_byte();
        writer.take_pending()
    }

    #[test]
    fn test_fixed_tables_are_complete() {
        assert!(HuffmanTable::build(&fixed_litlen_lengths()).is_ok());
        assert!(HuffmanTable::build(&fixed_distance_lengths()).is_ok());
    }

    #[test]
    fn test_rfc_example_codes() {
        // RFC 1951 §3.2.2: lengths (3, 3, 3, 3, 3, 2, 4, 4) for A-H.
        let lengths = [3, 3, 3, 3, 3, 2, 4, 4];
        let table = EncodeTable::from_lengths(&lengths);
        let expected = [0b010, 0b011, 0b100, 0b101, 0b110, 0b00, 0b1110, 0b1111];
        for (symbol, &code) in expected.iter().enumerate() {
            let (reversed, len) = table.code(symbol);
            assert_eq!(reverse_bits(reversed as u32, len), code, "symbol {symbol}");
        }
    }

    #[test]
    fn test_encode_decode_fixed() {
        let lengths = fixed_litlen_lengths();
        let encoder = EncodeTable::from_lengths(&lengths);
        let decoder = HuffmanTable::build(&lengths).expect("fixed table");

        let symbols: Vec<usize> = vec![0, 65, 143, 144, 200, 255, 256, 279, 280, 287];
        let bytes = encode(&encoder, &symbols);

        let mut reader = BitReader::new();
        for &expected in &symbols {
            let got = decoder.decode(&mut reader, &bytes).expect("decode");
            assert_eq!(got, Some(expected as u16));
        }
    }

    #[test]
    fn test_decode_long_codes() {
        // Codes up to 15 bits take the slow path.
        let mut lengths = vec![0u8; 16];
        for (i, len) in lengths.iter_mut().enumerate().take(15) {
            *len = (i + 1) as u8;
        }
        lengths[15] = 15;
        let decoder = HuffmanTable::build(&lengths).expect("complete");
        let encoder = EncodeTable::from_lengths(&lengths);

        let symbols: Vec<usize> = (0..16).rev().collect();
        let bytes = encode(&encoder, &symbols);
        let mut reader = BitReader::new();
        for &expected in &symbols {
            assert_eq!(
                decoder.decode(&mut reader, &bytes).expect("decode"),
                Some(expected as u16)
            );
        }
    }

    #[test]
    fn test_decode_resumes_across_slices() {
        let lengths = fixed_litlen_lengths();
        let encoder = EncodeTable::from_lengths(&lengths);
        let decoder = HuffmanTable::build(&lengths).expect("fixed table");
        let bytes = encode(&encoder, &[200, 7, 256]);

        let mut reader = BitReader::new();
        let mut decoded = Vec::new();
        let mut pos = 0;
        while decoded.len() < 3 {
            reader.begin();
            let slice = &bytes[pos..(pos + 1).min(bytes.len())];
            let result = decoder.decode(&mut reader, slice).expect("decode");
            pos += reader.bytes_consumed();
            match result {
                Some(symbol) => decoded.push(symbol),
                None => assert!(!slice.is_empty(), "ran out of input"),
            }
        }
        assert_eq!(decoded, vec![200, 7, 256]);
    }

    #[test]
    fn test_decode_does_not_pull_extra_bytes() {
        // A 7-bit code fits in one byte; the trailing byte must stay unread.
        let encoder = EncodeTable::from_lengths(&fixed_litlen_lengths());
        let mut bytes = encode(&encoder, &[256]);
        bytes.push(0xAA);

        let decoder = HuffmanTable::assemble(&fixed_litlen_lengths());
        let mut reader = BitReader::new();
        assert_eq!(decoder.decode(&mut reader, &bytes).expect("decode"), Some(256));
        assert_eq!(reader.bytes_consumed(), 1);
    }

    #[test]
    fn test_over_subscribed() {
        let result = HuffmanTable::build(&[1, 1, 1]);
        assert!(matches!(result, Err(FlateError::InvalidHuffmanTree)));
    }

    #[test]
    fn test_incomplete() {
        let result = HuffmanTable::build(&[2, 2, 2]);
        assert!(matches!(result, Err(FlateError::IncompleteHuffmanTree)));
    }

    #[test]
    fn test_single_code() {
        let table = HuffmanTable::build(&[0, 1]).expect("single code allowed");
        let mut reader = BitReader::new();
        assert_eq!(table.decode(&mut reader, &[0b0]).expect("decode"), Some(1));

        let mut reader = BitReader::new();
        assert!(table.decode(&mut reader, &[0b1]).is_err());
    }

    #[test]
    fn test_empty_table_rejects() {
        let table = HuffmanTable::build(&[0; 30]).expect("all zeros allowed");
        assert!(table.is_empty());
        let mut reader = BitReader::new();
        let err = table.decode(&mut reader, &[0xFF]).unwrap_err();
        assert!(err.is_data_error());
    }

    #[test]
    fn test_length_over_15_rejected() {
        assert!(matches!(
            HuffmanTable::build(&[16, 1]),
            Err(FlateError::InvalidHuffmanTree)
        ));
    }

    #[test]
    fn test_build_lengths_basic() {
        let freqs = [10, 1, 1, 5, 0, 3];
        let lengths = HuffmanBuilder::build_lengths(&freqs, 15);
        assert_eq!(lengths[4], 0);
        assert!(lengths[0] <= lengths[3]);
        assert!(lengths[3] <= lengths[1]);
        assert_eq!(kraft_sum(&lengths, 15), 1 << 15);
    }

    #[test]
    fn test_build_lengths_limited() {
        // Fibonacci weights force a deep tree.
        let mut freqs = vec![0u32; 30];
        let (mut a, mut b) = (1u32, 1u32);
        for f in freqs.iter_mut() {
            *f = a;
            let next = a.saturating_add(b);
            a = b;
            b = next;
        }
        let lengths = HuffmanBuilder::build_lengths(&freqs, 7);
        assert!(lengths.iter().all(|&l| (1..=7).contains(&l)));
        assert_eq!(kraft_sum(&lengths, 7), 1 << 7);
        assert!(HuffmanTable::build(&lengths).is_ok());
    }

    #[test]
    fn test_build_lengths_forces_two_codes() {
        let mut freqs = [0u32; 30];
        freqs[5] = 9;
        let lengths = HuffmanBuilder::build_lengths(&freqs, 15);
        assert_eq!(lengths[5], 1);
        assert_eq!(lengths.iter().filter(|&&l| l > 0).count(), 2);
        assert!(HuffmanTable::build(&lengths).is_ok());

        let lengths = HuffmanBuilder::build_lengths(&[0u32; 19], 7);
        assert_eq!(lengths.iter().filter(|&&l| l == 1).count(), 2);
    }

    #[test]
    fn test_cost() {
        let table = EncodeTable::from_lengths(&[1, 2, 2]);
        assert_eq!(table.cost(&[4, 1, 1]), 8);
    }
}
