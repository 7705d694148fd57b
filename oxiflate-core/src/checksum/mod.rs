//! Rolling checksums used by the DEFLATE containers.
//!
//! - [`crc32`]: CRC-32, carried in the gzip trailer
//! - [`adler32`]: Adler-32, carried in the zlib trailer
//!
//! Both support a `combine` operation that merges the checksums of two
//! independently processed pieces into the checksum of their concatenation.
//! With the `parallel` feature enabled, [`crc32_parallel`] and
//! [`adler32_parallel`] use it to checksum large buffers on the rayon pool.

mod adler32;
mod crc32;

pub use adler32::{Adler32, adler32, adler32_combine};
pub use crc32::{Crc32, crc32, crc32_combine};

/// Size of the pieces handed to worker threads.
#[cfg(feature = "parallel")]
const PARALLEL_CHUNK: usize = 1 << 20;

/// CRC-32 of `data`, computed piecewise on the rayon pool.
#[cfg(feature = "parallel")]
pub fn crc32_parallel(data: &[u8]) -> u32 {
    use rayon::prelude::*;

    data.par_chunks(PARALLEL_CHUNK)
        .map(|chunk| (Crc32::compute(chunk), chunk.len() as u64))
        .collect::<Vec<_>>()
        .into_iter()
        .fold(0, |acc, (crc, len)| crc32_combine(acc, crc, len))
}

/// Adler-32 of `data`, computed piecewise on the rayon pool.
#[cfg(feature = "parallel")]
pub fn adler32_parallel(data: &[u8]) -> u32 {
    use rayon::prelude::*;

    data.par_chunks(PARALLEL_CHUNK)
        .map(|chunk| (Adler32::checksum(chunk), chunk.len() as u64))
        .collect::<Vec<_>>()
        .into_iter()
        .fold(1, |acc, (adler, len)| adler32_combine(acc, adler, len))
}
