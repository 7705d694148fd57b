//! Property-based tests for the DEFLATE and zlib codecs.
//!
//! These tests verify that codec properties hold across a wide range of inputs:
//! - compress/decompress round-trips at every level and strategy
//! - chunked streaming produces the same bytes as one-shot calls
//! - the worst-case bound is never exceeded
//! - damaged streams fail cleanly instead of panicking

use oxiflate_core::traits::{
    CompressStatus, Compressor, DecompressStatus, Decompressor, FlushMode,
    Strategy as CodecStrategy,
};
use oxiflate_deflate::{
    DeflateConfig, Deflater, Inflater, ZlibDecoder, deflate, deflate_bound, inflate,
    zlib_compress, zlib_decompress,
};
use proptest::prelude::*;

/// Inputs that compress: short alphabets with runs and repeats.
fn compressible_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(
        prop_oneof![
            prop::collection::vec(b'a'..=b'f', 1..40),
            (any::<u8>(), 1usize..300).prop_map(|(b, n)| vec![b; n]),
            Just(b"the quick brown fox ".to_vec()),
        ],
        0..40,
    )
    .prop_map(|parts| parts.concat())
}

fn data_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        prop::collection::vec(any::<u8>(), 0..4096),
        compressible_strategy(),
    ]
}

fn codec_strategy() -> impl Strategy<Value = CodecStrategy> {
    prop_oneof![
        Just(CodecStrategy::Default),
        Just(CodecStrategy::Filtered),
        Just(CodecStrategy::HuffmanOnly),
        Just(CodecStrategy::Rle),
        Just(CodecStrategy::Fixed),
    ]
}

/// Compress with fixed-size input and output slices.
fn deflate_chunked(data: &[u8], config: DeflateConfig, in_chunk: usize, out_chunk: usize) -> Vec<u8> {
    let mut deflater = Deflater::new(config).unwrap();
    let mut compressed = Vec::new();
    let mut out = vec![0u8; out_chunk];
    let mut pos = 0;
    loop {
        let end = (pos + in_chunk).min(data.len());
        let flush = if end == data.len() { FlushMode::Finish } else { FlushMode::None };
        let (consumed, produced, status) = deflater.compress(&data[pos..end], &mut out, flush).unwrap();
        pos += consumed;
        compressed.extend_from_slice(&out[..produced]);
        if status == CompressStatus::Done {
            return compressed;
        }
    }
}

/// Decompress with fixed-size input and output slices.
fn inflate_chunked(data: &[u8], in_chunk: usize, out_chunk: usize) -> Vec<u8> {
    let mut inflater = Inflater::default();
    let mut output = Vec::new();
    let mut out = vec![0u8; out_chunk];
    let mut pos = 0;
    loop {
        let end = (pos + in_chunk).min(data.len());
        let (consumed, produced, status) = inflater.decompress(&data[pos..end], &mut out).unwrap();
        pos += consumed;
        output.extend_from_slice(&out[..produced]);
        if status == DecompressStatus::Done {
            return output;
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 48,
        max_shrink_iters: 100,
        ..ProptestConfig::default()
    })]

    /// Property: every level and strategy round-trips.
    #[test]
    fn prop_roundtrip(
        data in data_strategy(),
        level in 0u8..=9,
        strategy in codec_strategy(),
    ) {
        let config = DeflateConfig::new(level).with_strategy(strategy);
        let compressed = Deflater::new(config).unwrap().compress_all(&data).unwrap();
        prop_assert!(compressed.len() <= deflate_bound(data.len()));
        prop_assert_eq!(inflate(&compressed).unwrap(), data);
    }

    /// Property: small windows and memory levels still round-trip.
    #[test]
    fn prop_roundtrip_small_sizes(
        data in compressible_strategy(),
        window_bits in 9u8..=15,
        mem_level in 1u8..=9,
    ) {
        let config = DeflateConfig::new(9)
            .with_window_bits(window_bits)
            .with_mem_level(mem_level);
        let mut deflater = Deflater::new(config).unwrap();
        let bound = deflater.bound(data.len());
        let compressed = deflater.compress_all(&data).unwrap();
        prop_assert!(compressed.len() <= bound);
        prop_assert_eq!(inflate(&compressed).unwrap(), data);
    }

    /// Property: chunk sizes do not change the compressed bytes.
    #[test]
    fn prop_chunked_compress_matches(
        data in compressible_strategy(),
        level in 1u8..=9,
        in_chunk in 1usize..64,
        out_chunk in 1usize..64,
    ) {
        let config = DeflateConfig::new(level);
        let whole = deflate(&data, level).unwrap();
        prop_assert_eq!(deflate_chunked(&data, config, in_chunk, out_chunk), whole);
    }

    /// Property: chunk sizes do not change the decompressed bytes.
    #[test]
    fn prop_chunked_inflate_matches(
        data in data_strategy(),
        level in 0u8..=9,
        in_chunk in 1usize..32,
        out_chunk in 1usize..32,
    ) {
        let compressed = deflate(&data, level).unwrap();
        prop_assert_eq!(inflate_chunked(&compressed, in_chunk, out_chunk), data);
    }

    /// Property: truncated or bit-flipped streams never panic and never
    /// overrun the output slice.
    #[test]
    fn prop_damaged_streams_fail_cleanly(
        data in compressible_strategy(),
        cut in any::<prop::sample::Index>(),
        flip in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let compressed = deflate(&data, 6).unwrap();

        let truncated = &compressed[..cut.index(compressed.len())];
        prop_assert!(inflate(truncated).is_err());

        let mut flipped = compressed.clone();
        let at = flip.index(flipped.len());
        flipped[at] ^= 1 << bit;
        let mut inflater = Inflater::default();
        let mut out = vec![0u8; 512];
        let mut pos = 0;
        for _ in 0..10_000 {
            match inflater.decompress(&flipped[pos..], &mut out) {
                Ok((consumed, produced, status)) => {
                    prop_assert!(produced <= out.len());
                    pos += consumed;
                    if status == DecompressStatus::Done {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    }

    /// Property: zlib framing round-trips and the decoder stops at the trailer.
    #[test]
    fn prop_zlib_roundtrip(data in data_strategy(), level in 0u8..=9) {
        let compressed = zlib_compress(&data, level).unwrap();
        prop_assert_eq!(zlib_decompress(&compressed).unwrap(), data.clone());

        let mut decoder = ZlibDecoder::default();
        let mut out = vec![0u8; data.len()];
        let (consumed, produced, status) = decoder.decompress(&compressed, &mut out).unwrap();
        prop_assert_eq!(status, DecompressStatus::Done);
        prop_assert_eq!(consumed, compressed.len());
        prop_assert_eq!(&out[..produced], &data[..]);
    }
}
