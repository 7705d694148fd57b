//! Gzip framing tests: headers, trailers and member boundaries.

use oxiflate_core::checksum::crc32;
use oxiflate_core::error::FlateError;
use oxiflate_core::traits::{Compressor, DecompressStatus, Decompressor, FlushMode};
use oxiflate_deflate::{DeflateConfig, inflate};
use oxiflate_gzip::{
    GzDecoder, GzEncoder, GzReader, GzipHeader, compress, compress_with_header, decompress, flags,
    os,
};
use std::io::Read;

#[test]
fn test_known_empty_member() {
    // Fixed empty block, zero CRC, zero size.
    let member = [
        0x1F, 0x8B, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x03, 0x03, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00,
    ];
    assert_eq!(decompress(&member).unwrap(), b"");
}

#[test]
fn test_all_header_fields() {
    let header = GzipHeader::new()
        .with_text(true)
        .with_mtime(0x5F5E_1000)
        .with_os(os::UNIX)
        .with_extra(b"OX\x03\x00abc".to_vec())
        .unwrap()
        .with_filename("report.csv")
        .with_comment("quarterly")
        .with_header_crc(true);
    let compressed = compress_with_header(b"a,b,c\n1,2,3\n", 6, header.clone()).unwrap();

    assert_eq!(
        compressed[3],
        flags::FTEXT | flags::FHCRC | flags::FEXTRA | flags::FNAME | flags::FCOMMENT
    );
    assert_eq!(compressed[9], os::UNIX);

    let mut decoder = GzDecoder::default();
    assert_eq!(decoder.decompress_all(&compressed).unwrap(), b"a,b,c\n1,2,3\n");
    let parsed = decoder.header().unwrap();
    assert_eq!(parsed.text, header.text);
    assert_eq!(parsed.mtime, header.mtime);
    assert_eq!(parsed.extra, header.extra);
    assert_eq!(parsed.filename, header.filename);
    assert_eq!(parsed.comment, header.comment);
    assert!(parsed.header_crc);
}

#[test]
fn test_damaged_header_crc() {
    let header = GzipHeader::new().with_filename("x").with_header_crc(true);
    let mut compressed = compress_with_header(b"payload", 6, header).unwrap();
    compressed[10] = b'y';
    let err = decompress(&compressed).unwrap_err();
    assert!(matches!(err, FlateError::ChecksumMismatch { .. }));
}

#[test]
fn test_trailer_fields() {
    let data = vec![0xA5u8; 70_000];
    let compressed = compress(&data, 9).unwrap();
    let n = compressed.len();
    assert_eq!(&compressed[n - 8..n - 4], &crc32(0, &data).to_le_bytes());
    assert_eq!(&compressed[n - 4..], &70_000u32.to_le_bytes());
    assert_eq!(inflate(&compressed[10..n - 8]).unwrap(), data);
}

#[test]
fn test_members_decoded_one_by_one() {
    let parts: [&[u8]; 3] = [b"alpha", b"", b"gamma"];
    let mut joined = Vec::new();
    for part in parts {
        joined.extend(compress(part, 6).unwrap());
    }

    let mut decoder = GzDecoder::default();
    let mut pos = 0;
    let mut out = [0u8; 16];
    for part in parts {
        let (consumed, produced, status) = decoder.decompress(&joined[pos..], &mut out).unwrap();
        assert_eq!(status, DecompressStatus::Done);
        assert_eq!(&out[..produced], part);
        pos += consumed;
        decoder.reset();
    }
    assert_eq!(pos, joined.len());
    assert_eq!(decompress(&joined).unwrap(), b"alphagamma");
}

#[test]
fn test_sync_flush_inside_member() {
    let mut encoder = GzEncoder::new(DeflateConfig::new(6), GzipHeader::new()).unwrap();
    let mut out = vec![0u8; 1024];
    let (_, produced, _) = encoder
        .compress(b"flushed part", &mut out, FlushMode::Sync)
        .unwrap();
    assert_eq!(&out[produced - 4..produced], &[0x00, 0x00, 0xFF, 0xFF]);

    let mut reader = GzReader::new(&out[..produced]);
    let mut text = [0u8; 32];
    let n = reader.read(&mut text).unwrap();
    assert_eq!(&text[..n], b"flushed part");
}

#[test]
fn test_truncation_everywhere() {
    let compressed = compress_with_header(
        b"every prefix of this member is an error",
        6,
        GzipHeader::new().with_filename("prefix"),
    )
    .unwrap();
    for cut in 0..compressed.len() {
        let err = decompress(&compressed[..cut]).unwrap_err();
        assert!(
            matches!(err, FlateError::UnexpectedEof { .. }),
            "cut {cut}: {err}"
        );
    }
}

#[test]
fn test_bad_deflate_body() {
    let mut compressed = compress(b"body", 6).unwrap();
    compressed[10] = 0x07; // BTYPE 3
    let err = decompress(&compressed).unwrap_err();
    assert!(err.is_data_error());
}
