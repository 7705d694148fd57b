//! Decompress command implementation.

use crate::utils::{
    CHUNK_SIZE, Format, create_output, create_progress_bar, decompress_stream, decompressed_path,
    set_mtime,
};
use filetime::FileTime;
use oxiflate_core::error::Result;
use oxiflate_deflate::{Inflater, ZlibDecoder};
use oxiflate_gzip::{GzReader, GzipHeader};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Options for decompressing files.
pub struct DecompressOptions {
    pub format: Option<Format>,
    pub keep: bool,
    pub stdout: bool,
    pub force: bool,
    pub progress: bool,
}

/// What decoding a file found.
#[derive(Debug, Default)]
pub struct DecodeSummary {
    /// Decompressed bytes.
    pub size: u64,
    /// Header of the first gzip member.
    pub header: Option<GzipHeader>,
    /// Gzip members decoded (1 for zlib and raw).
    pub members: usize,
}

/// Pick the format: explicit, then sniffed from the data, then the suffix.
pub fn resolve_format(
    explicit: Option<Format>,
    path: Option<&Path>,
    prefix: &[u8],
) -> std::result::Result<Format, String> {
    explicit
        .or_else(|| Format::detect(prefix))
        .or_else(|| path.and_then(Format::from_path))
        .ok_or_else(|| match path {
            Some(path) => format!("{}: not in a recognized format", path.display()),
            None => "stdin: not in a recognized format".to_string(),
        })
}

/// Decode everything in `reader` as `format` into `writer`.
pub fn decode<R: BufRead, W: Write + ?Sized>(
    format: Format,
    mut reader: R,
    writer: &mut W,
) -> Result<DecodeSummary> {
    match format {
        Format::Gzip => {
            let mut gz = GzReader::new(reader);
            let mut buffer = vec![0u8; CHUNK_SIZE];
            let mut size = 0u64;
            loop {
                let n = gz.read_data(&mut buffer)?;
                if n == 0 {
                    break;
                }
                writer.write_all(&buffer[..n])?;
                size += n as u64;
            }
            Ok(DecodeSummary {
                size,
                header: gz.header().cloned(),
                members: gz.members(),
            })
        }
        Format::Zlib | Format::Raw => {
            let size = if format == Format::Zlib {
                decompress_stream(&mut ZlibDecoder::default(), &mut reader, writer)?
            } else {
                decompress_stream(&mut Inflater::default(), &mut reader, writer)?
            };
            if !reader.fill_buf()?.is_empty() {
                warn!("ignoring trailing data after the {} stream", format.name());
            }
            Ok(DecodeSummary {
                size,
                header: None,
                members: 1,
            })
        }
    }
}

pub fn cmd_decompress(
    files: &[PathBuf],
    options: &DecompressOptions,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    if files.is_empty() {
        let mut reader = BufReader::with_capacity(CHUNK_SIZE, io::stdin().lock());
        let format = resolve_format(options.format, None, reader.fill_buf()?)?;
        let mut stdout = io::stdout().lock();
        decode(format, reader, &mut stdout)?;
        stdout.flush()?;
        return Ok(());
    }

    for file in files {
        decompress_file(file, options)?;
    }
    Ok(())
}

fn decompress_file(
    path: &Path,
    options: &DecompressOptions,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let metadata = fs::metadata(path)?;
    let pb = create_progress_bar(metadata.len(), options.progress && !options.stdout);
    pb.set_message(path.display().to_string());
    let mut reader = BufReader::with_capacity(CHUNK_SIZE, pb.wrap_read(File::open(path)?));
    let format = resolve_format(options.format, Some(path), reader.fill_buf()?)?;
    debug!(path = %path.display(), format = format.name(), "decompressing");

    if options.stdout {
        let mut stdout = io::stdout().lock();
        decode(format, reader, &mut stdout)?;
        stdout.flush()?;
        return Ok(());
    }

    let output = decompressed_path(path).ok_or_else(|| {
        format!(
            "{}: unknown suffix, cannot name the output (use --stdout)",
            path.display()
        )
    })?;
    let mut writer = BufWriter::new(create_output(&output, options.force)?);
    let summary = match decode(format, reader, &mut writer) {
        Ok(summary) => summary,
        Err(e) => {
            drop(writer);
            let _ = fs::remove_file(&output);
            return Err(e.into());
        }
    };
    writer.flush()?;
    drop(writer);
    pb.finish_and_clear();

    // Prefer the time recorded in the gzip header; fall back to the input's.
    let mtime = match summary.header.as_ref().map(|h| h.mtime) {
        Some(mtime) if mtime > 0 => FileTime::from_unix_time(i64::from(mtime), 0),
        _ => FileTime::from_last_modification_time(&metadata),
    };
    set_mtime(&output, mtime)?;

    info!(
        input = %path.display(),
        output = %output.display(),
        size = summary.size,
        members = summary.members,
        "decompressed"
    );

    if !options.keep {
        fs::remove_file(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxiflate_deflate::{deflate, zlib_compress};

    #[test]
    fn test_resolve_format() {
        assert_eq!(
            resolve_format(Some(Format::Raw), None, &[0x1F, 0x8B]),
            Ok(Format::Raw)
        );
        assert_eq!(resolve_format(None, None, &[0x78, 0x9C]), Ok(Format::Zlib));
        assert_eq!(
            resolve_format(None, Some(Path::new("a.deflate")), &[0x4B]),
            Ok(Format::Raw)
        );
        assert!(resolve_format(None, Some(Path::new("a.bin")), b"??").is_err());
    }

    #[test]
    fn test_decode_each_format() {
        let data = b"decoded by the command-line front end ".repeat(100);

        let gz = oxiflate_gzip::compress(&data, 6).unwrap();
        let mut out = Vec::new();
        let summary = decode(Format::Gzip, &gz[..], &mut out).unwrap();
        assert_eq!(out, data);
        assert_eq!(summary.members, 1);
        assert!(summary.header.is_some());

        let zz = zlib_compress(&data, 6).unwrap();
        let mut out = Vec::new();
        assert_eq!(decode(Format::Zlib, &zz[..], &mut out).unwrap().size, data.len() as u64);
        assert_eq!(out, data);

        let raw = deflate(&data, 6).unwrap();
        let mut out = Vec::new();
        decode(Format::Raw, &raw[..], &mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_decode_damaged() {
        let mut zz = zlib_compress(b"damaged", 6).unwrap();
        let n = zz.len();
        zz[n - 1] ^= 0xFF;
        assert!(decode(Format::Zlib, &zz[..], &mut io::sink()).is_err());
    }
}
