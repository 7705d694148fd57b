//! Static tables of the DEFLATE format (RFC 1951).
//!
//! Holds the length/distance base and extra-bit tables, the transmission
//! order of code-length codes, and the fixed Huffman codes of §3.2.6. The
//! fixed codes are built once per process and shared read-only.

use crate::huffman::{EncodeTable, HuffmanTable};
use std::sync::OnceLock;

/// Minimum match length.
pub const MIN_MATCH: usize = 3;
/// Maximum match length.
pub const MAX_MATCH: usize = 258;
/// Largest distance the format can express.
pub const MAX_DISTANCE: usize = 32768;

/// End-of-block symbol.
pub const END_OF_BLOCK: u16 = 256;
/// Literal/length alphabet size (symbols 286 and 287 never occur).
pub const NUM_LITLEN_SYMBOLS: usize = 286;
/// Distance alphabet size (symbols 30 and 31 never occur).
pub const NUM_DISTANCE_SYMBOLS: usize = 30;
/// Code-length alphabet size.
pub const NUM_CODELEN_SYMBOLS: usize = 19;

/// Code length limit for literal/length and distance codes.
pub const MAX_CODE_BITS: u8 = 15;
/// Code length limit for the code-length code.
pub const MAX_CODELEN_BITS: u8 = 7;

/// Largest payload of a single stored block.
pub const MAX_STORED_BLOCK: usize = 65535;

/// Block type field values.
pub mod block_type {
    /// Uncompressed block.
    pub const STORED: u32 = 0;
    /// Block using the fixed Huffman codes.
    pub const FIXED: u32 = 1;
    /// Block carrying its own Huffman codes.
    pub const DYNAMIC: u32 = 2;
}

/// Length code base values for symbols 257-285.
pub const LENGTH_BASE: [u16; 29] = [
    3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 15, 17, 19, 23, 27, 31, 35, 43, 51, 59, 67, 83, 99, 115,
    131, 163, 195, 227, 258,
];

/// Extra bits for length symbols 257-285.
pub const LENGTH_EXTRA_BITS: [u8; 29] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 0,
];

/// Distance code base values for codes 0-29.
pub const DISTANCE_BASE: [u16; 30] = [
    1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537,
    2049, 3073, 4097, 6145, 8193, 12289, 16385, 24577,
];

/// Extra bits for distance codes 0-29.
pub const DISTANCE_EXTRA_BITS: [u8; 30] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13,
    13,
];

/// Order in which code-length code lengths are transmitted (§3.2.7).
pub const CODE_LENGTH_ORDER: [usize; 19] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

/// Length symbol offset (0-28) for every match length minus 3.
const LENGTH_SYMBOL: [u8; 256] = {
    let mut table = [0u8; 256];
    let mut code = 0;
    while code < 29 {
        let base = LENGTH_BASE[code] as usize - MIN_MATCH;
        let span = 1usize << LENGTH_EXTRA_BITS[code];
        let mut i = 0;
        while i < span && base + i < 256 {
            table[base + i] = code as u8;
            i += 1;
        }
        code += 1;
    }
    table
};

/// Distance code lookup: entries 0..256 map `distance - 1` directly, entries
/// 256..512 map `(distance - 1) >> 7` for longer distances.
const DISTANCE_SYMBOL: [u8; 512] = {
    let mut table = [0u8; 512];
    let mut code = 0;
    while code < 30 {
        let base = DISTANCE_BASE[code] as usize - 1;
        let span = 1usize << DISTANCE_EXTRA_BITS[code];
        let mut i = 0;
        while i < span {
            let d = base + i;
            if d < 256 {
                table[d] = code as u8;
            } else {
                table[256 + (d >> 7)] = code as u8;
            }
            i += 1;
        }
        code += 1;
    }
    table
};

/// Fixed literal/length code lengths: 8, 9, 7, 8 bits over the four ranges.
pub fn fixed_litlen_lengths() -> [u8; 288] {
    let mut lengths = [8u8; 288];
    lengths[144..256].fill(9);
    lengths[256..280].fill(7);
    lengths
}

/// Fixed distance code lengths: 5 bits for all 32 slots, 30 and 31 unused.
pub fn fixed_distance_lengths() -> [u8; 32] {
    [5u8; 32]
}

/// The fixed Huffman codes in decode and encode form.
#[derive(Debug)]
pub struct FixedTables {
    /// Literal/length decode table.
    pub litlen: HuffmanTable,
    /// Distance decode table.
    pub distance: HuffmanTable,
    /// Literal/length codes for the encoder.
    pub litlen_codes: EncodeTable,
    /// Distance codes for the encoder.
    pub distance_codes: EncodeTable,
}

/// Process-wide fixed Huffman tables, built on first use.
pub fn fixed_tables() -> &'static FixedTables {
    static TABLES: OnceLock<FixedTables> = OnceLock::new();

    TABLES.get_or_init(|| {
        let litlen = fixed_litlen_lengths();
        let distance = fixed_distance_lengths();
        FixedTables {
            litlen: HuffmanTable::assemble(&litlen),
            distance: HuffmanTable::assemble(&distance),
            litlen_codes: EncodeTable::from_lengths(&litlen),
            distance_codes: EncodeTable::from_lengths(&distance),
        }
    })
}

/// Map a match length (3-258) to (symbol, extra bits, extra value).
#[inline]
pub fn length_to_code(length: u16) -> (u16, u8, u16) {
    debug_assert!((3..=258).contains(&length), "Length out of range: {length}");

    let index = LENGTH_SYMBOL[(length as usize - MIN_MATCH) & 0xFF] as usize;
    (
        257 + index as u16,
        LENGTH_EXTRA_BITS[index],
        length - LENGTH_BASE[index],
    )
}

/// Map a distance (1-32768) to (code, extra bits, extra value).
#[inline]
pub fn distance_to_code(distance: u16) -> (u16, u8, u16) {
    debug_assert!(distance >= 1, "Distance out of range: {distance}");

    let d = distance as usize - 1;
    let code = if d < 256 {
        DISTANCE_SYMBOL[d]
    } else {
        DISTANCE_SYMBOL[256 + (d >> 7)]
    } as usize;
    (
        code as u16,
        DISTANCE_EXTRA_BITS[code],
        distance - DISTANCE_BASE[code],
    )
}

/// Base length and extra-bit count for a length symbol (257-285).
#[inline]
pub fn length_base(symbol: u16) -> Option<(u16, u8)> {
    let index = symbol.checked_sub(257)? as usize;
    Some((*LENGTH_BASE.get(index)?, LENGTH_EXTRA_BITS[index]))
}

/// Base distance and extra-bit count for a distance code (0-29).
#[inline]
pub fn distance_base(code: u16) -> Option<(u16, u8)> {
    let index = code as usize;
    Some((*DISTANCE_BASE.get(index)?, DISTANCE_EXTRA_BITS[index]))
}
