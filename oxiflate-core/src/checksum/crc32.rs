//! CRC-32 (ISO 3309 / ITU-T V.42), the checksum of the gzip trailer.
//!
//! - Polynomial: 0x04C11DB7 (reflected: 0xEDB88320)
//! - Initial value: 0xFFFFFFFF
//! - Final XOR: 0xFFFFFFFF
//!
//! Data of 16 bytes or more goes through slicing-by-8: eight pre-computed
//! tables let the loop fold eight input bytes per step.
//!
//! Two CRCs computed independently can be merged with [`crc32_combine`] in
//! O(log n) time without touching the data again. The merge multiplies the
//! first CRC by `x^(8·len2)` modulo the CRC polynomial in GF(2).

/// Reflected CRC-32 polynomial.
const POLY: u32 = 0xEDB88320;

/// CRC-32 slicing-by-8 lookup tables; table 0 is the classic byte table.
const CRC32_TABLE_SLICE: [[u32; 256]; 8] = {
    let mut tables = [[0u32; 256]; 8];

    let mut i = 0usize;
    while i < 256 {
        let mut crc = i as u32;
        let mut j = 0;
        while j < 8 {
            crc = if crc & 1 != 0 { (crc >> 1) ^ POLY } else { crc >> 1 };
            j += 1;
        }
        tables[0][i] = crc;
        i += 1;
    }

    let mut t = 1;
    while t < 8 {
        let mut i = 0usize;
        while i < 256 {
            let prev = tables[t - 1][i];
            tables[t][i] = tables[0][(prev & 0xFF) as usize] ^ (prev >> 8);
            i += 1;
        }
        t += 1;
    }

    tables
};

/// `x^(2^n) mod P` for n in 0..32, used to build `x^(8·len)` by squaring.
const X2N_TABLE: [u32; 32] = {
    let mut table = [0u32; 32];
    // x^1
    let mut p = 1u32 << 30;
    table[0] = p;
    let mut n = 1;
    while n < 32 {
        p = multmodp(p, p);
        table[n] = p;
        n += 1;
    }
    table
};

/// Multiply `a` by `b` modulo the CRC polynomial (reflected bit order).
///
/// `a` must be non-zero.
const fn multmodp(a: u32, mut b: u32) -> u32 {
    let mut m = 1u32 << 31;
    let mut p = 0u32;
    loop {
        if a & m != 0 {
            p ^= b;
            if a & (m - 1) == 0 {
                break;
            }
        }
        m >>= 1;
        b = if b & 1 != 0 { (b >> 1) ^ POLY } else { b >> 1 };
    }
    p
}

/// `x^(n·2^k) mod P`.
fn x2nmodp(mut n: u64, mut k: usize) -> u32 {
    // x^0
    let mut p = 1u32 << 31;
    while n != 0 {
        if n & 1 != 0 {
            p = multmodp(X2N_TABLE[k & 31], p);
        }
        n >>= 1;
        k += 1;
    }
    p
}

/// Incremental CRC-32 calculator.
///
/// # Example
///
/// ```
/// use oxiflate_core::checksum::Crc32;
///
/// let mut crc = Crc32::new();
/// crc.update(b"Hello, ");
/// crc.update(b"World!");
/// assert_eq!(crc.value(), 0xEC4AC3D0);
/// ```
#[derive(Debug, Clone)]
pub struct Crc32 {
    /// Pre-inversion register.
    crc: u32,
}

impl Crc32 {
    /// Create a calculator for an empty message.
    pub fn new() -> Self {
        Self { crc: 0xFFFFFFFF }
    }

    /// Continue from a previously finalized CRC value.
    pub fn from_value(value: u32) -> Self {
        Self { crc: !value }
    }

    /// Reset to the empty message.
    pub fn reset(&mut self) {
        self.crc = 0xFFFFFFFF;
    }

    /// Fold more data into the CRC.
    #[inline]
    pub fn update(&mut self, data: &[u8]) {
        if data.len() >= 16 {
            crc32_slice8(&mut self.crc, data);
        } else {
            crc32_bytewise(&mut self.crc, data);
        }
    }

    /// The CRC of everything seen so far.
    #[inline(always)]
    pub fn value(&self) -> u32 {
        !self.crc
    }

    /// Compute CRC-32 for a slice in one call.
    pub fn compute(data: &[u8]) -> u32 {
        let mut crc = Self::new();
        crc.update(data);
        crc.value()
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn crc32_bytewise(crc: &mut u32, data: &[u8]) {
    let table = &CRC32_TABLE_SLICE[0];
    for &byte in data {
        *crc = table[((*crc ^ byte as u32) & 0xFF) as usize] ^ (*crc >> 8);
    }
}

#[inline]
fn crc32_slice8(crc: &mut u32, data: &[u8]) {
    let mut c = *crc;
    let mut chunks = data.chunks_exact(8);

    for bytes in &mut chunks {
        let low = c ^ u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        c = CRC32_TABLE_SLICE[7][(low & 0xFF) as usize]
            ^ CRC32_TABLE_SLICE[6][((low >> 8) & 0xFF) as usize]
            ^ CRC32_TABLE_SLICE[5][((low >> 16) & 0xFF) as usize]
            ^ CRC32_TABLE_SLICE[4][(low >> 24) as usize]
            ^ CRC32_TABLE_SLICE[3][bytes[4] as usize]
            ^ CRC32_TABLE_SLICE[2][bytes[5] as usize]
            ^ CRC32_TABLE_SLICE[1][bytes[6] as usize]
            ^ CRC32_TABLE_SLICE[0][bytes[7] as usize];
    }

    crc32_bytewise(&mut c, chunks.remainder());
    *crc = c;
}

/// Extend a finalized CRC-32 value with `data`.
///
/// `crc32(0, data)` is the CRC of `data` alone, and `crc32(0, b"") == 0`.
pub fn crc32(initial: u32, data: &[u8]) -> u32 {
    let mut crc = Crc32::from_value(initial);
    crc.update(data);
    crc.value()
}

/// CRC-32 of `A ++ B` from `crc32(0, A)`, `crc32(0, B)` and `B.len()`.
pub fn crc32_combine(crc1: u32, crc2: u32, len2: u64) -> u32 {
    multmodp(x2nmodp(len2, 3), crc1) ^ crc2
}
