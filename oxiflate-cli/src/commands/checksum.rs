//! Checksum command implementation.

use clap::ValueEnum;
use oxiflate_core::checksum::{Adler32, Crc32};
use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;

/// Checksum algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Algorithm {
    /// CRC-32 (gzip, zip)
    Crc32,
    /// Adler-32 (zlib)
    Adler32,
}

/// Running checksum over either algorithm.
enum Hasher {
    Crc32(Crc32),
    Adler32(Adler32),
}

impl Hasher {
    fn new(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Crc32 => Self::Crc32(Crc32::new()),
            Algorithm::Adler32 => Self::Adler32(Adler32::new()),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Crc32(h) => h.update(data),
            Self::Adler32(h) => h.update(data),
        }
    }

    fn value(&self) -> u32 {
        match self {
            Self::Crc32(h) => h.value(),
            Self::Adler32(h) => h.value(),
        }
    }
}

/// Checksum everything `reader` yields; returns (checksum, length).
pub fn checksum_reader<R: Read>(algorithm: Algorithm, mut reader: R) -> io::Result<(u32, u64)> {
    let mut hasher = Hasher::new(algorithm);
    let mut buffer = vec![0u8; 64 * 1024];
    let mut len = 0u64;
    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            return Ok((hasher.value(), len));
        }
        hasher.update(&buffer[..n]);
        len += n as u64;
    }
}

pub fn cmd_checksum(
    files: &[PathBuf],
    algorithm: Algorithm,
) -> Result<(), Box<dyn std::error::Error>> {
    if files.is_empty() {
        let (value, len) = checksum_reader(algorithm, io::stdin().lock())?;
        println!("{:08x} {:>12} -", value, len);
        return Ok(());
    }

    for path in files {
        let (value, len) = checksum_reader(algorithm, File::open(path)?)?;
        println!("{:08x} {:>12} {}", value, len, path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_values() {
        let data = &b"The quick brown fox jumps over the lazy dog"[..];
        assert_eq!(checksum_reader(Algorithm::Crc32, data).unwrap(), (0x414F_A339, 43));
        assert_eq!(
            checksum_reader(Algorithm::Adler32, data).unwrap(),
            (0x5BDC_0FDA, 43)
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(checksum_reader(Algorithm::Crc32, &b""[..]).unwrap(), (0, 0));
        assert_eq!(checksum_reader(Algorithm::Adler32, &b""[..]).unwrap(), (1, 0));
    }
}
