//! One-shot zlib compression into caller-provided buffers.
//!
//! These mirror the classic `compress`/`uncompress` pair: the whole input is
//! in memory, the output goes into a fixed slice, and the return value is the
//! number of bytes written. For growable output use
//! [`zlib_compress`](crate::zlib::zlib_compress) and
//! [`zlib_decompress`](crate::zlib::zlib_decompress).
//!
//! ```
//! use oxiflate_deflate::buffer::{compress, compress_bound, uncompress};
//!
//! let text = b"The quick brown fox jumps over the lazy dog.";
//! let mut packed = vec![0u8; compress_bound(text.len())];
//! let packed_len = compress(&mut packed, text).unwrap();
//!
//! let mut unpacked = [0u8; 64];
//! let len = uncompress(&mut unpacked, &packed[..packed_len]).unwrap();
//! assert_eq!(&unpacked[..len], text);
//! ```

use crate::config::DeflateConfig;
use crate::deflate::deflate_bound;
use crate::zlib::{ZlibDecoder, ZlibEncoder};
use oxiflate_core::error::{FlateError, Result};
use oxiflate_core::traits::{
    CompressStatus, CompressionLevel, Compressor, DecompressStatus, Decompressor, FlushMode,
};

/// zlib header plus Adler-32 trailer.
const ZLIB_OVERHEAD: usize = 6;

/// Upper bound on the output of [`compress`] for `source_len` input bytes.
pub fn compress_bound(source_len: usize) -> usize {
    deflate_bound(source_len) + ZLIB_OVERHEAD
}

/// Compress `source` into `dest` as a zlib stream at the default level.
///
/// Returns the compressed length.
pub fn compress(dest: &mut [u8], source: &[u8]) -> Result<usize> {
    compress_with_level(dest, source, CompressionLevel::DEFAULT.level())
}

/// Compress `source` into `dest` as a zlib stream at `level` (0-9).
///
/// Fails with [`FlateError::InsufficientBuffer`] reporting
/// [`compress_bound`] when `dest` is too small.
pub fn compress_with_level(dest: &mut [u8], source: &[u8], level: u8) -> Result<usize> {
    let mut encoder = ZlibEncoder::new(DeflateConfig::new(level))?;
    let (_, produced, status) = encoder.compress(source, dest, FlushMode::Finish)?;
    match status {
        CompressStatus::Done => Ok(produced),
        _ => Err(FlateError::insufficient_buffer(
            compress_bound(source.len()),
            dest.len(),
        )),
    }
}

/// Decompress the zlib stream in `source` into `dest`.
///
/// Returns the decompressed length. When `dest` is too small the rest of the
/// stream is still decoded, so the error reports the exact size needed.
pub fn uncompress(dest: &mut [u8], source: &[u8]) -> Result<usize> {
    let mut decoder = ZlibDecoder::default();
    let (consumed, produced, status) = step(&mut decoder, source, dest)?;
    match status {
        DecompressStatus::Done => return Ok(produced),
        DecompressStatus::NeedsInput => return Err(FlateError::unexpected_eof(1)),
        DecompressStatus::NeedsOutput => {}
    }

    let mut scratch = vec![0u8; 32 * 1024];
    let mut pos = consumed;
    let mut overflow = 0;
    loop {
        let (consumed, extra, status) = step(&mut decoder, &source[pos..], &mut scratch)?;
        pos += consumed;
        overflow += extra;
        match status {
            DecompressStatus::Done => break,
            DecompressStatus::NeedsInput => return Err(FlateError::unexpected_eof(1)),
            DecompressStatus::NeedsOutput => {}
        }
    }

    if overflow == 0 {
        Ok(produced)
    } else {
        Err(FlateError::insufficient_buffer(produced + overflow, dest.len()))
    }
}

/// One decode call, with "no progress" treated as running out of input.
fn step(
    decoder: &mut ZlibDecoder,
    input: &[u8],
    output: &mut [u8],
) -> Result<(usize, usize, DecompressStatus)> {
    match decoder.decompress(input, output) {
        Err(FlateError::BufError) => Ok((0, 0, DecompressStatus::NeedsInput)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The classic sample string, NUL terminator included.
    const FOX: &[u8] = b"The quick brown fox jumps over the lazy dog.\0";

    #[test]
    fn test_fox_roundtrip() {
        assert_eq!(FOX.len(), 45);
        let mut packed = vec![0u8; compress_bound(FOX.len())];
        let packed_len = compress(&mut packed, FOX).expect("compress");

        let mut unpacked = vec![0u8; 100];
        let len = uncompress(&mut unpacked, &packed[..packed_len]).expect("uncompress");
        assert_eq!(&unpacked[..len], FOX);
    }

    #[test]
    fn test_empty_source() {
        let mut packed = vec![0u8; compress_bound(0)];
        let packed_len = compress(&mut packed, b"").expect("compress");
        assert_eq!(packed_len, 8);
        let mut unpacked = [0u8; 0];
        assert_eq!(uncompress(&mut unpacked, &packed[..packed_len]).expect("uncompress"), 0);
    }

    #[test]
    fn test_compress_dest_too_small() {
        let mut packed = [0u8; 4];
        let err = compress(&mut packed, FOX).unwrap_err();
        assert!(matches!(
            err,
            FlateError::InsufficientBuffer { needed, available: 4 } if needed == compress_bound(FOX.len())
        ));
    }

    #[test]
    fn test_uncompress_reports_exact_size() {
        let data = b"0123456789".repeat(10_000);
        let mut packed = vec![0u8; compress_bound(data.len())];
        let packed_len = compress_with_level(&mut packed, &data, 9).expect("compress");

        let mut small = vec![0u8; 1000];
        let err = uncompress(&mut small, &packed[..packed_len]).unwrap_err();
        assert!(matches!(
            err,
            FlateError::InsufficientBuffer { needed: 100_000, available: 1000 }
        ));
        assert_eq!(&small[..], &data[..1000]);
    }

    #[test]
    fn test_uncompress_exact_fit() {
        let mut packed = vec![0u8; compress_bound(FOX.len())];
        let packed_len = compress(&mut packed, FOX).expect("compress");
        let mut exact = vec![0u8; FOX.len()];
        assert_eq!(
            uncompress(&mut exact, &packed[..packed_len]).expect("uncompress"),
            FOX.len()
        );
        assert_eq!(exact, FOX);
    }

    #[test]
    fn test_uncompress_truncated() {
        let mut packed = vec![0u8; compress_bound(FOX.len())];
        let packed_len = compress(&mut packed, FOX).expect("compress");
        let mut unpacked = [0u8; 100];
        for cut in [0, 1, 2, packed_len / 2, packed_len - 1] {
            let err = uncompress(&mut unpacked, &packed[..cut]).unwrap_err();
            assert!(matches!(err, FlateError::UnexpectedEof { .. }), "cut {cut}: {err}");
        }
    }

    #[test]
    fn test_invalid_level() {
        let mut packed = [0u8; 64];
        assert!(matches!(
            compress_with_level(&mut packed, FOX, 10),
            Err(FlateError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_bound_holds_for_incompressible() {
        let data: Vec<u8> = (0..70_000u32)
            .map(|i| (i.wrapping_mul(2_654_435_761) >> 24) as u8)
            .collect();
        let mut packed = vec![0u8; compress_bound(data.len())];
        for level in [0, 1, 6, 9] {
            let len = compress_with_level(&mut packed, &data, level).expect("compress");
            assert!(len <= compress_bound(data.len()));
        }
    }
}
