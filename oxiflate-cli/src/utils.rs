//! Utility functions for the CLI.

use clap::ValueEnum;
use filetime::FileTime;
use indicatif::{ProgressBar, ProgressStyle};
use oxiflate_core::error::{FlateError, Result};
use oxiflate_core::traits::{
    CompressStatus, Compressor, DecompressStatus, Decompressor, FlushMode, Strategy,
};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};

/// I/O chunk size for the streaming pumps.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Container format of a compressed stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// gzip member(s) (RFC 1952)
    Gzip,
    /// zlib stream (RFC 1950)
    Zlib,
    /// Raw DEFLATE stream (RFC 1951)
    Raw,
}

impl Format {
    /// File suffix added on compression.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Gzip => "gz",
            Self::Zlib => "zz",
            Self::Raw => "deflate",
        }
    }

    /// Format implied by a file suffix.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "gz" | "gzip" | "z" => Some(Self::Gzip),
            "zz" | "zlib" => Some(Self::Zlib),
            "deflate" => Some(Self::Raw),
            _ => None,
        }
    }

    /// Format implied by the first bytes of a stream.
    ///
    /// Raw DEFLATE has no signature and is never detected.
    pub fn detect(prefix: &[u8]) -> Option<Self> {
        match *prefix {
            [0x1F, 0x8B, ..] => Some(Self::Gzip),
            [cmf, flg, ..]
                if cmf & 0x0F == 8
                    && cmf >> 4 <= 7
                    && (u16::from(cmf) << 8 | u16::from(flg)) % 31 == 0 =>
            {
                Some(Self::Zlib)
            }
            _ => None,
        }
    }

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Zlib => "zlib",
            Self::Raw => "raw deflate",
        }
    }
}

/// Compression strategy as given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    /// Normal matching
    Default,
    /// Favor literals, for filtered data
    Filtered,
    /// Huffman coding only, no matching
    HuffmanOnly,
    /// Run-length matches only
    Rle,
    /// Fixed Huffman codes only
    Fixed,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Default => Strategy::Default,
            StrategyArg::Filtered => Strategy::Filtered,
            StrategyArg::HuffmanOnly => Strategy::HuffmanOnly,
            StrategyArg::Rle => Strategy::Rle,
            StrategyArg::Fixed => Strategy::Fixed,
        }
    }
}

/// Create a progress bar with standard styling.
pub fn create_progress_bar(len: u64, enable: bool) -> ProgressBar {
    if !enable {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len);
    let style = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░ ");
    pb.set_style(style);
    pb
}

/// Output path for compressing `input`: the format's suffix appended.
pub fn compressed_path(input: &Path, format: Format) -> PathBuf {
    let mut name = input.as_os_str().to_owned();
    name.push(".");
    name.push(format.extension());
    PathBuf::from(name)
}

/// Output path for decompressing `input`: a known suffix removed.
pub fn decompressed_path(input: &Path) -> Option<PathBuf> {
    Format::from_path(input)?;
    let stem = input.file_stem()?;
    Some(input.with_file_name(stem))
}

/// Create an output file, refusing to replace one unless `force` is set.
pub fn create_output(path: &Path, force: bool) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true);
    if force {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    options.open(path).map_err(|e| {
        if e.kind() == io::ErrorKind::AlreadyExists {
            io::Error::new(
                e.kind(),
                format!("{} already exists (use --force to overwrite)", path.display()),
            )
        } else {
            e
        }
    })
}

/// Set the modification time of `path`.
pub fn set_mtime(path: &Path, mtime: FileTime) -> io::Result<()> {
    filetime::set_file_mtime(path, mtime)
}

/// Compress everything `reader` yields into `writer`.
///
/// Returns the number of compressed bytes written.
pub fn compress_stream<C, R, W>(codec: &mut C, reader: &mut R, writer: &mut W) -> Result<u64>
where
    C: Compressor + ?Sized,
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut input = vec![0u8; CHUNK_SIZE];
    let mut output = vec![0u8; CHUNK_SIZE];
    let mut written = 0u64;

    loop {
        let n = reader.read(&mut input)?;
        let flush = if n == 0 {
            FlushMode::Finish
        } else {
            FlushMode::None
        };

        let mut pos = 0;
        loop {
            let (consumed, produced, status) =
                codec.compress(&input[pos..n], &mut output, flush)?;
            pos += consumed;
            writer.write_all(&output[..produced])?;
            written += produced as u64;
            match status {
                CompressStatus::Done => return Ok(written),
                CompressStatus::NeedsInput if pos == n => break,
                _ => {}
            }
        }
    }
}

/// Decompress one stream from `reader` into `writer`.
///
/// Bytes after the end of the stream stay in `reader`. Returns the number of
/// decompressed bytes written.
pub fn decompress_stream<D, R, W>(codec: &mut D, reader: &mut R, writer: &mut W) -> Result<u64>
where
    D: Decompressor + ?Sized,
    R: BufRead + ?Sized,
    W: Write + ?Sized,
{
    let mut output = vec![0u8; CHUNK_SIZE];
    let mut written = 0u64;

    loop {
        let input = reader.fill_buf()?;
        let eof = input.is_empty();
        let (consumed, produced, status) = match codec.decompress(input, &mut output) {
            Err(FlateError::BufError) if eof => return Err(FlateError::unexpected_eof(1)),
            other => other?,
        };
        reader.consume(consumed);
        writer.write_all(&output[..produced])?;
        written += produced as u64;

        match status {
            DecompressStatus::Done => return Ok(written),
            DecompressStatus::NeedsInput if eof => return Err(FlateError::unexpected_eof(1)),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxiflate_deflate::{Deflater, Inflater, ZlibDecoder, ZlibEncoder};

    #[test]
    fn test_detect() {
        assert_eq!(Format::detect(&[0x1F, 0x8B, 8]), Some(Format::Gzip));
        assert_eq!(Format::detect(&[0x78, 0x9C]), Some(Format::Zlib));
        assert_eq!(Format::detect(&[0x78, 0x01]), Some(Format::Zlib));
        assert_eq!(Format::detect(b"plain"), None);
        assert_eq!(Format::detect(&[]), None);
    }

    #[test]
    fn test_paths() {
        let input = Path::new("dir/notes.txt");
        assert_eq!(compressed_path(input, Format::Gzip), Path::new("dir/notes.txt.gz"));
        assert_eq!(compressed_path(input, Format::Raw), Path::new("dir/notes.txt.deflate"));
        assert_eq!(
            decompressed_path(Path::new("dir/notes.txt.zz")).as_deref(),
            Some(Path::new("dir/notes.txt"))
        );
        assert_eq!(decompressed_path(Path::new("notes.txt")), None);
    }

    #[test]
    fn test_stream_pumps() {
        let data = b"streamed through the command-line pumps ".repeat(5000);

        let mut compressed = Vec::new();
        compress_stream(&mut ZlibEncoder::with_level(6), &mut &data[..], &mut compressed).unwrap();
        let mut restored = Vec::new();
        let mut reader = &compressed[..];
        decompress_stream(&mut ZlibDecoder::default(), &mut reader, &mut restored).unwrap();
        assert_eq!(restored, data);

        let mut raw = Vec::new();
        compress_stream(&mut Deflater::default(), &mut &data[..], &mut raw).unwrap();
        let mut truncated = &raw[..raw.len() / 2];
        let err = decompress_stream(&mut Inflater::default(), &mut truncated, &mut Vec::new())
            .unwrap_err();
        assert!(matches!(err, FlateError::UnexpectedEof { .. }));
    }
}
