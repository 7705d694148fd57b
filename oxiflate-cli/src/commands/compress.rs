//! Compress command implementation.

use crate::utils::{
    Format, compress_stream, compressed_path, create_output, create_progress_bar, set_mtime,
};
use filetime::FileTime;
use oxiflate_core::traits::{Compressor, Strategy};
use oxiflate_deflate::{DeflateConfig, Deflater, ZlibEncoder};
use oxiflate_gzip::{GzEncoder, GzipHeader};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::{debug, info};

/// Options for compressing files.
pub struct CompressOptions {
    pub format: Format,
    pub level: u8,
    pub strategy: Strategy,
    pub keep: bool,
    pub stdout: bool,
    pub force: bool,
    pub progress: bool,
}

/// Build the encoder for `format`. Gzip members record `name` and `mtime`.
fn encoder_for(
    options: &CompressOptions,
    name: Option<&str>,
    mtime: u32,
) -> oxiflate_core::Result<Box<dyn Compressor>> {
    let config = DeflateConfig::new(options.level).with_strategy(options.strategy);
    Ok(match options.format {
        Format::Gzip => {
            let mut header = GzipHeader::new().with_mtime(mtime);
            if let Some(name) = name {
                header = header.with_filename(name);
            }
            Box::new(GzEncoder::new(config, header)?)
        }
        Format::Zlib => Box::new(ZlibEncoder::new(config)?),
        Format::Raw => Box::new(Deflater::new(config)?),
    })
}

pub fn cmd_compress(
    files: &[PathBuf],
    options: &CompressOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    if files.is_empty() {
        let mut encoder = encoder_for(options, None, 0)?;
        let mut stdout = io::stdout().lock();
        compress_stream(encoder.as_mut(), &mut io::stdin().lock(), &mut stdout)?;
        stdout.flush()?;
        return Ok(());
    }

    for file in files {
        compress_file(file, options)?;
    }
    Ok(())
}

fn compress_file(
    path: &Path,
    options: &CompressOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let metadata = fs::metadata(path)?;
    if !metadata.is_file() {
        return Err(format!("{} is not a regular file", path.display()).into());
    }
    if !options.stdout && Format::from_path(path) == Some(options.format) && !options.force {
        return Err(format!(
            "{} already has the .{} suffix (use --force to compress it again)",
            path.display(),
            options.format.extension()
        )
        .into());
    }

    let mtime = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .and_then(|d| u32::try_from(d.as_secs()).ok())
        .unwrap_or(0);
    let name = path.file_name().and_then(|n| n.to_str());
    let mut encoder = encoder_for(options, name, mtime)?;

    let pb = create_progress_bar(metadata.len(), options.progress && !options.stdout);
    pb.set_message(path.display().to_string());
    let mut reader = pb.wrap_read(File::open(path)?);

    if options.stdout {
        let mut stdout = io::stdout().lock();
        compress_stream(encoder.as_mut(), &mut reader, &mut stdout)?;
        stdout.flush()?;
        return Ok(());
    }

    let output = compressed_path(path, options.format);
    let mut writer = BufWriter::new(create_output(&output, options.force)?);
    let written = compress_stream(encoder.as_mut(), &mut reader, &mut writer)?;
    writer.flush()?;
    drop(writer);
    pb.finish_and_clear();

    set_mtime(&output, FileTime::from_last_modification_time(&metadata))?;
    debug!(input = %path.display(), output = %output.display(), "mtime copied");

    let ratio = if metadata.len() > 0 {
        (1.0 - written as f64 / metadata.len() as f64) * 100.0
    } else {
        0.0
    };
    info!(
        input = %path.display(),
        size = metadata.len(),
        compressed = written,
        "compressed ({ratio:.1}% saved)"
    );

    if !options.keep {
        fs::remove_file(path)?;
    }
    Ok(())
}
