//! Adler-32 (RFC 1950), the checksum of the zlib trailer.
//!
//! Two 16-bit sums modulo 65521: `a` is one plus the sum of all bytes, `b` is
//! the sum of the successive `a` values. The checksum is `b << 16 | a`.

/// Largest prime smaller than 65536.
const ADLER_MOD: u32 = 65521;

/// Largest n such that 255n(n+1)/2 + (n+1)(MOD-1) fits in 32 bits.
const NMAX: usize = 5552;

/// Incremental Adler-32 calculator.
///
/// # Example
///
/// ```
/// use oxiflate_core::checksum::Adler32;
///
/// let mut adler = Adler32::new();
/// adler.update(b"Wiki");
/// adler.update(b"pedia");
/// assert_eq!(adler.value(), 0x11E60398);
/// ```
#[derive(Debug, Clone)]
pub struct Adler32 {
    a: u32,
    b: u32,
}

impl Adler32 {
    /// Create a calculator for an empty message.
    pub fn new() -> Self {
        Self { a: 1, b: 0 }
    }

    /// Continue from a previous checksum value.
    ///
    /// A value of 0 is read as "no prior data", the same as [`Adler32::new`].
    pub fn from_value(value: u32) -> Self {
        if value == 0 {
            return Self::new();
        }
        Self {
            a: value & 0xFFFF,
            b: value >> 16,
        }
    }

    /// Reset to the empty message.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Fold more data into the checksum.
    pub fn update(&mut self, data: &[u8]) {
        let mut a = self.a;
        let mut b = self.b;

        for chunk in data.chunks(NMAX) {
            for &byte in chunk {
                a += byte as u32;
                b += a;
            }
            a %= ADLER_MOD;
            b %= ADLER_MOD;
        }

        self.a = a;
        self.b = b;
    }

    /// The checksum of everything seen so far.
    pub fn value(&self) -> u32 {
        (self.b << 16) | self.a
    }

    /// Compute Adler-32 of data in one shot.
    pub fn checksum(data: &[u8]) -> u32 {
        let mut adler = Self::new();
        adler.update(data);
        adler.value()
    }
}

impl Default for Adler32 {
    fn default() -> Self {
        Self::new()
    }
}

/// Extend an Adler-32 value with `data`.
///
/// An `initial` of 0 stands for "no prior data", so `adler32(0, b"") == 1`,
/// the Adler-32 of the empty message.
pub fn adler32(initial: u32, data: &[u8]) -> u32 {
    let mut adler = Adler32::from_value(initial);
    adler.update(data);
    adler.value()
}

/// Adler-32 of `A ++ B` from `adler32(1, A)`, `adler32(1, B)` and `B.len()`.
pub fn adler32_combine(adler1: u32, adler2: u32, len2: u64) -> u32 {
    let modulus = ADLER_MOD as u64;
    let rem = len2 % modulus;

    let a1 = (adler1 & 0xFFFF) as u64;
    let b1 = (adler1 >> 16) as u64;
    let a2 = (adler2 & 0xFFFF) as u64;
    let b2 = (adler2 >> 16) as u64;

    // a = a1 + a2 - 1, b = b1 + b2 + rem*a1 - rem, all mod 65521.
    let a = (a1 + a2 + modulus - 1) % modulus;
    let b = (rem * a1 % modulus + b1 + b2 + modulus - rem) % modulus;
    ((b << 16) | a) as u32
}
