//! Info command implementation.

use super::decompress::{decode, resolve_format};
use crate::utils::{CHUNK_SIZE, Format};
use oxiflate_deflate::zlib_requires_dictionary;
use oxiflate_gzip::GzipHeader;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Gzip header fields.
#[derive(Debug, Serialize)]
struct GzipInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
    mtime: u32,
    os: u8,
    os_name: &'static str,
    xfl: u8,
    text: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    extra_len: Option<usize>,
    header_crc: bool,
}

impl GzipInfo {
    fn from_header(header: &GzipHeader) -> Self {
        Self {
            filename: header.filename.clone(),
            comment: header.comment.clone(),
            mtime: header.mtime,
            os: header.os,
            os_name: os_name(header.os),
            xfl: header.xfl,
            text: header.text,
            extra_len: header.extra.as_ref().map(Vec::len),
            header_crc: header.header_crc,
        }
    }
}

/// Zlib header fields.
#[derive(Debug, Serialize)]
struct ZlibInfo {
    window_size: u32,
    level_hint: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dict_id: Option<u32>,
}

impl ZlibInfo {
    fn from_prefix(prefix: &[u8]) -> Option<Self> {
        let [cmf, flg, ..] = *prefix else {
            return None;
        };
        let level_hint = match flg >> 6 {
            0 => "fastest",
            1 => "fast",
            2 => "default",
            _ => "maximum",
        };
        Some(Self {
            window_size: 1 << ((cmf >> 4) + 8),
            level_hint,
            dict_id: zlib_requires_dictionary(prefix),
        })
    }
}

/// JSON output for one file.
#[derive(Debug, Serialize)]
struct FileInfo {
    file: String,
    format: Format,
    compressed_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    uncompressed_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    members: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gzip: Option<GzipInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    zlib: Option<ZlibInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn os_name(os: u8) -> &'static str {
    match os {
        0 => "FAT",
        1 => "Amiga",
        2 => "VMS",
        3 => "Unix",
        4 => "VM/CMS",
        5 => "Atari TOS",
        6 => "HPFS",
        7 => "Macintosh",
        8 => "Z-System",
        9 => "CP/M",
        10 => "TOPS-20",
        11 => "NTFS",
        12 => "QDOS",
        13 => "Acorn RISCOS",
        _ => "unknown",
    }
}

fn inspect(path: &Path) -> Result<FileInfo, Box<dyn std::error::Error>> {
    let compressed_size = fs::metadata(path)?.len();
    let mut reader = BufReader::with_capacity(CHUNK_SIZE, File::open(path)?);
    let prefix = reader.fill_buf()?;
    let format = resolve_format(None, Some(path), prefix)?;
    let zlib = (format == Format::Zlib)
        .then(|| ZlibInfo::from_prefix(prefix))
        .flatten();

    let mut info = FileInfo {
        file: path.display().to_string(),
        format,
        compressed_size,
        uncompressed_size: None,
        ratio: None,
        members: None,
        gzip: None,
        zlib,
        error: None,
    };

    if let Some(dict_id) = info.zlib.as_ref().and_then(|z| z.dict_id) {
        info.error = Some(format!("needs a preset dictionary (Adler-32 {dict_id:#010x})"));
        return Ok(info);
    }

    match decode(format, reader, &mut io::sink()) {
        Ok(summary) => {
            info.uncompressed_size = Some(summary.size);
            if summary.size > 0 {
                info.ratio = Some((1.0 - compressed_size as f64 / summary.size as f64) * 100.0);
            }
            info.members = Some(summary.members);
            info.gzip = summary.header.as_ref().map(GzipInfo::from_header);
        }
        Err(e) => info.error = Some(e.to_string()),
    }
    Ok(info)
}

fn print_info(info: &FileInfo) {
    println!("File Information");
    println!("================");
    println!("File: {}", info.file);
    println!("Format: {}", info.format.name());
    println!("Compressed size: {} bytes", info.compressed_size);
    if let Some(size) = info.uncompressed_size {
        println!("Uncompressed size: {} bytes", size);
    }
    if let Some(ratio) = info.ratio {
        println!("Space savings: {:.1}%", ratio);
    }
    if let Some(members) = info.members.filter(|&m| m > 1) {
        println!("Members: {}", members);
    }

    if let Some(gzip) = &info.gzip {
        println!();
        println!("GZIP Header:");
        if let Some(name) = &gzip.filename {
            println!("  Original filename: {}", name);
        }
        if let Some(comment) = &gzip.comment {
            println!("  Comment: {}", comment);
        }
        if gzip.mtime > 0 {
            println!("  Modification time: {} (Unix timestamp)", gzip.mtime);
        }
        println!("  Operating system: {} ({})", gzip.os_name, gzip.os);
        println!("  Extra flags: {}", gzip.xfl);
        if gzip.text {
            println!("  Text: yes");
        }
        if let Some(len) = gzip.extra_len {
            println!("  Extra field: {} bytes", len);
        }
        if gzip.header_crc {
            println!("  Header CRC: present");
        }
    }

    if let Some(zlib) = &info.zlib {
        println!();
        println!("ZLIB Header:");
        println!("  Window size: {} bytes", zlib.window_size);
        println!("  Compression: {}", zlib.level_hint);
        if let Some(dict_id) = zlib.dict_id {
            println!("  Dictionary ID: {:#010x}", dict_id);
        }
    }

    if let Some(error) = &info.error {
        println!();
        println!("Error: {}", error);
    }
}

pub fn cmd_info(files: &[PathBuf], json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let infos = files
        .iter()
        .map(|path| inspect(path))
        .collect::<Result<Vec<_>, _>>()?;

    if json {
        let output = match infos.as_slice() {
            [single] => serde_json::to_string_pretty(single)?,
            all => serde_json::to_string_pretty(all)?,
        };
        println!("{}", output);
        return Ok(());
    }

    for (i, info) in infos.iter().enumerate() {
        if i > 0 {
            println!();
        }
        print_info(info);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zlib_info() {
        let info = ZlibInfo::from_prefix(&[0x78, 0xDA]).unwrap();
        assert_eq!(info.window_size, 32768);
        assert_eq!(info.level_hint, "maximum");
        assert_eq!(info.dict_id, None);
        assert!(ZlibInfo::from_prefix(&[0x78]).is_none());
    }

    #[test]
    fn test_gzip_info_json() {
        let header = GzipHeader::new()
            .with_filename("a.txt")
            .with_os(3)
            .with_mtime(5);
        let json = serde_json::to_value(GzipInfo::from_header(&header)).unwrap();
        assert_eq!(json["filename"], "a.txt");
        assert_eq!(json["os_name"], "Unix");
        assert_eq!(json["mtime"], 5);
        assert!(json.get("comment").is_none());
    }
}
