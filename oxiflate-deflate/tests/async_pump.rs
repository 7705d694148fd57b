//! The async pumps driving the real codecs over tokio I/O.

use oxiflate_core::async_io::{AsyncCompressorWrapper, AsyncDecompressorWrapper};
use oxiflate_core::error::FlateError;
use oxiflate_deflate::{
    Deflater, Inflater, ZlibDecoder, ZlibEncoder, inflate, zlib_compress, zlib_decompress,
};

fn sample() -> Vec<u8> {
    (0..200_000u32)
        .map(|i| b"async pumps move bytes; "[(i % 24) as usize] ^ (i / 4096) as u8)
        .collect()
}

#[tokio::test]
async fn test_raw_roundtrip_small_buffers() {
    let data = sample();

    let mut compressed = Vec::new();
    let mut pump = AsyncCompressorWrapper::with_buffer_size(Deflater::default(), 777);
    let written = pump
        .compress_stream(&mut data.as_slice(), &mut compressed)
        .await
        .unwrap();
    assert_eq!(written, compressed.len() as u64);
    assert_eq!(pump.inner().total_in(), data.len() as u64);
    assert_eq!(inflate(&compressed).unwrap(), data);

    let mut restored = Vec::new();
    let mut pump = AsyncDecompressorWrapper::with_buffer_size(Inflater::default(), 100);
    let produced = pump
        .decompress_stream(&mut compressed.as_slice(), &mut restored)
        .await
        .unwrap();
    assert_eq!(produced, data.len() as u64);
    assert_eq!(restored, data);
}

#[tokio::test]
async fn test_zlib_through_pumps() {
    let data = sample();

    let mut compressed = Vec::new();
    AsyncCompressorWrapper::new(ZlibEncoder::with_level(9))
        .compress_stream(&mut data.as_slice(), &mut compressed)
        .await
        .unwrap();
    assert_eq!(zlib_decompress(&compressed).unwrap(), data);

    let mut restored = Vec::new();
    AsyncDecompressorWrapper::new(ZlibDecoder::default())
        .decompress_stream(&mut compressed.as_slice(), &mut restored)
        .await
        .unwrap();
    assert_eq!(restored, data);
}

#[tokio::test]
async fn test_truncated_input() {
    let compressed = zlib_compress(&sample(), 6).unwrap();
    let truncated = &compressed[..compressed.len() / 2];

    let mut restored = Vec::new();
    let err = AsyncDecompressorWrapper::new(ZlibDecoder::default())
        .decompress_stream(&mut &truncated[..], &mut restored)
        .await
        .unwrap_err();
    assert!(matches!(err, FlateError::UnexpectedEof { .. }));
}
