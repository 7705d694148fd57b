//! Gzip file handles.
//!
//! [`GzFile`] reads and writes `.gz` files through a small, stdio-like
//! interface: byte and line reads with push-back, string writes, explicit
//! flush points and parameter changes between writes.
//!
//! The inherent `read`, `write` and `flush` methods report [`FlateError`]s.
//! Through the `io::Read` and `io::Write` impls the same operations report
//! `io::Error`s, which is what `write!` and `read_to_end` go through.

use crate::encoder::GzEncoder;
use crate::header::{GZIP_MAGIC, GzipHeader};
use crate::read::GzReader;
use crate::write::pump;
use oxiflate_core::error::{FlateError, Result};
use oxiflate_core::traits::{Compressor, FlushMode, Strategy};
use oxiflate_deflate::DeflateConfig;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Size of the decoded staging buffer and the compressed output buffer.
const BUFFER_SIZE: usize = 32 * 1024;

/// Most bytes `ungetc` may hold at once.
const PUSHBACK_LIMIT: usize = BUFFER_SIZE;

/// How a [`GzFile`] is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Read, decompressing gzip data or passing other data through.
    Read,
    /// Truncate or create, then write.
    Write,
    /// Append new members to the end of the file.
    Append,
}

/// A parsed mode string such as `"rb"`, `"wb9"` or `"ab1h"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenMode {
    /// Read, write or append.
    pub access: Access,
    /// Compression level, if a digit was given.
    pub level: Option<u8>,
    /// Compression strategy.
    pub strategy: Strategy,
    /// Write data as-is, without gzip framing (`T`).
    pub transparent: bool,
    /// Fail if the file already exists (`x`).
    pub exclusive: bool,
}

impl OpenMode {
    /// Parse a mode string.
    ///
    /// `r`, `w` or `a` picks the access; a digit sets the level; `f`, `h`,
    /// `R` and `F` pick the filtered, huffman-only, rle and fixed strategies;
    /// `T` requests transparent writing and `x` exclusive creation. `b` is
    /// accepted and ignored. `+` is rejected: a handle is never both.
    pub fn parse(mode: &str) -> Result<Self> {
        let mut access = None;
        let mut parsed = Self {
            access: Access::Read,
            level: None,
            strategy: Strategy::Default,
            transparent: false,
            exclusive: false,
        };

        for c in mode.chars() {
            match c {
                'r' => access = Some(Access::Read),
                'w' => access = Some(Access::Write),
                'a' => access = Some(Access::Append),
                '0'..='9' => parsed.level = Some(c as u8 - b'0'),
                'f' => parsed.strategy = Strategy::Filtered,
                'h' => parsed.strategy = Strategy::HuffmanOnly,
                'R' => parsed.strategy = Strategy::Rle,
                'F' => parsed.strategy = Strategy::Fixed,
                'T' => parsed.transparent = true,
                'x' => parsed.exclusive = true,
                '+' => {
                    return Err(FlateError::invalid_parameter(
                        "mode",
                        "read/write handles are not supported",
                    ));
                }
                _ => {}
            }
        }

        parsed.access = access.ok_or_else(|| {
            FlateError::invalid_parameter("mode", format!("'{mode}' has no r, w or a"))
        })?;
        Ok(parsed)
    }
}

/// Where decoded bytes come from.
#[derive(Debug)]
enum Source {
    Gzip(GzReader<BufReader<File>>),
    Direct(BufReader<File>),
}

#[derive(Debug)]
struct ReadState {
    source: Source,
    staged: Vec<u8>,
    pos: usize,
    len: usize,
    /// Bytes handed back by `ungetc`, last one on top.
    pushback: Vec<u8>,
    at_end: bool,
    /// Error held back so the bytes read before it are delivered first.
    deferred: Option<FlateError>,
}

impl ReadState {
    /// Refill the staging buffer once it is drained.
    fn fill(&mut self) -> Result<()> {
        if self.pos < self.len || self.at_end {
            return Ok(());
        }
        let n = match &mut self.source {
            Source::Gzip(reader) => reader.read_data(&mut self.staged)?,
            Source::Direct(reader) => reader.read(&mut self.staged)?,
        };
        self.pos = 0;
        self.len = n;
        self.at_end = n == 0;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut n = 0;
        while n < buf.len() {
            let Some(byte) = self.pushback.pop() else {
                break;
            };
            buf[n] = byte;
            n += 1;
        }
        if let Some(err) = self.deferred.take() {
            return if n > 0 {
                self.deferred = Some(err);
                Ok(n)
            } else {
                Err(err)
            };
        }
        while n < buf.len() {
            if let Err(err) = self.fill() {
                if n == 0 {
                    return Err(err);
                }
                self.deferred = Some(err);
                break;
            }
            if self.pos == self.len {
                break;
            }
            let take = (self.len - self.pos).min(buf.len() - n);
            buf[n..n + take].copy_from_slice(&self.staged[self.pos..self.pos + take]);
            self.pos += take;
            n += take;
        }
        Ok(n)
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        Ok((self.read(&mut byte)? == 1).then_some(byte[0]))
    }
}

#[derive(Debug)]
struct WriteState {
    file: BufWriter<File>,
    /// `None` for transparent output.
    encoder: Option<GzEncoder>,
    buffer: Vec<u8>,
    member_open: bool,
    members: usize,
}

impl WriteState {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        let Some(encoder) = self.encoder.as_mut() else {
            self.file.write_all(data)?;
            return Ok(());
        };
        if !self.member_open {
            if encoder.is_finished() {
                encoder.reset();
            }
            self.member_open = true;
        }
        pump(encoder, &mut self.file, &mut self.buffer, data, FlushMode::None)
    }

    fn flush(&mut self, mode: FlushMode) -> Result<()> {
        if let Some(encoder) = self.encoder.as_mut() {
            if self.member_open && mode != FlushMode::None {
                pump(encoder, &mut self.file, &mut self.buffer, &[], mode)?;
                if mode == FlushMode::Finish {
                    self.member_open = false;
                    self.members += 1;
                    debug!(members = self.members, "gzip member finished");
                }
            }
        }
        self.file.flush()?;
        Ok(())
    }

    /// Finish the open member. A file that never had one gets an empty member.
    fn close(&mut self) -> Result<()> {
        if self.encoder.is_some() && !self.member_open && self.members == 0 {
            self.write(&[])?;
        }
        self.flush(FlushMode::Finish)
    }
}

#[derive(Debug)]
enum Handle {
    Read(ReadState),
    Write(WriteState),
}

/// A gzip file opened for reading or writing.
///
/// ```no_run
/// use oxiflate_gzip::GzFile;
/// use std::io::Write;
///
/// let mut out = GzFile::open("log.gz", "wb9")?;
/// writeln!(out, "{} events", 12)?;
/// out.close()?;
///
/// let mut input = GzFile::open("log.gz", "rb")?;
/// let line = input.gets(128)?;
/// assert_eq!(line.as_deref(), Some(&b"12 events\n"[..]));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct GzFile {
    path: PathBuf,
    handle: Option<Handle>,
}

impl GzFile {
    /// Open `path` with a mode string; see [`OpenMode::parse`].
    ///
    /// Files opened for reading that do not start with the gzip magic are
    /// read as-is.
    pub fn open(path: impl AsRef<Path>, mode: &str) -> Result<Self> {
        let path = path.as_ref();
        let mode = OpenMode::parse(mode)?;

        let handle = match mode.access {
            Access::Read => {
                let mut reader = BufReader::new(File::open(path)?);
                let gzip = reader.fill_buf()?.starts_with(&GZIP_MAGIC);
                debug!(path = %path.display(), gzip, "opened for reading");
                let source = if gzip {
                    Source::Gzip(GzReader::new(reader))
                } else {
                    Source::Direct(reader)
                };
                Handle::Read(ReadState {
                    source,
                    staged: vec![0; BUFFER_SIZE],
                    pos: 0,
                    len: 0,
                    pushback: Vec::new(),
                    at_end: false,
                    deferred: None,
                })
            }
            Access::Write | Access::Append => {
                let mut options = OpenOptions::new();
                if mode.access == Access::Append {
                    options.append(true);
                } else {
                    options.write(true).truncate(true);
                }
                if mode.exclusive {
                    options.create_new(true);
                } else {
                    options.create(true);
                }
                let file = options.open(path)?;

                let encoder = if mode.transparent {
                    None
                } else {
                    let config = DeflateConfig::new(mode.level.unwrap_or(6))
                        .with_strategy(mode.strategy);
                    Some(GzEncoder::new(config, GzipHeader::new())?)
                };
                debug!(path = %path.display(), ?mode, "opened for writing");
                Handle::Write(WriteState {
                    file: BufWriter::new(file),
                    encoder,
                    buffer: vec![0; BUFFER_SIZE],
                    member_open: false,
                    members: 0,
                })
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            handle: Some(handle),
        })
    }

    /// Path the file was opened with.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn reader(&mut self) -> Result<&mut ReadState> {
        match self.handle.as_mut() {
            Some(Handle::Read(state)) => Ok(state),
            Some(Handle::Write(_)) => Err(FlateError::stream("file is not open for reading")),
            None => Err(FlateError::stream("file is closed")),
        }
    }

    fn writer(&mut self) -> Result<&mut WriteState> {
        match self.handle.as_mut() {
            Some(Handle::Write(state)) => Ok(state),
            Some(Handle::Read(_)) => Err(FlateError::stream("file is not open for writing")),
            None => Err(FlateError::stream("file is closed")),
        }
    }

    /// Read up to `buf.len()` decompressed bytes; fewer only at the end.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.reader()?.read(buf)
    }

    /// Read one byte, or `None` at the end.
    pub fn getc(&mut self) -> Result<Option<u8>> {
        self.reader()?.read_byte()
    }

    /// Push `byte` back so the next read returns it first.
    pub fn ungetc(&mut self, byte: u8) -> Result<()> {
        let state = self.reader()?;
        if state.pushback.len() >= PUSHBACK_LIMIT {
            return Err(FlateError::stream("no room to push back another byte"));
        }
        state.pushback.push(byte);
        Ok(())
    }

    /// Read a line of at most `max_len` bytes, keeping the newline.
    ///
    /// Returns `None` at the end of the data.
    pub fn gets(&mut self, max_len: usize) -> Result<Option<Vec<u8>>> {
        if max_len == 0 {
            return Err(FlateError::invalid_parameter("max_len", "must be at least 1"));
        }
        let state = self.reader()?;
        let mut line = Vec::new();
        while line.len() < max_len {
            let Some(byte) = state.read_byte()? else {
                break;
            };
            line.push(byte);
            if byte == b'\n' {
                break;
            }
        }
        Ok((!line.is_empty()).then_some(line))
    }

    /// True once a read has hit the end of the data and nothing was pushed back.
    pub fn eof(&self) -> bool {
        match &self.handle {
            Some(Handle::Read(state)) => {
                state.at_end && state.pos == state.len && state.pushback.is_empty()
            }
            _ => false,
        }
    }

    /// True when data passes through without gzip framing: a plain file
    /// being read, or a handle opened for transparent writing.
    pub fn is_direct(&self) -> bool {
        match &self.handle {
            Some(Handle::Read(state)) => matches!(state.source, Source::Direct(_)),
            Some(Handle::Write(state)) => state.encoder.is_none(),
            None => false,
        }
    }

    /// Compress and write all of `data`.
    ///
    /// Writing after a [`FlushMode::Finish`] flush starts a new member.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        if data.is_empty() {
            self.writer()?;
            return Ok(0);
        }
        self.writer()?.write(data)?;
        Ok(data.len())
    }

    /// Write a string.
    pub fn puts(&mut self, text: &str) -> Result<usize> {
        self.write(text.as_bytes())
    }

    /// Flush compressed data to the file.
    ///
    /// `Sync` and `Full` make everything written so far decodable;
    /// `Finish` completes the current member.
    pub fn flush(&mut self, mode: FlushMode) -> Result<()> {
        self.writer()?.flush(mode)
    }

    /// Change level and strategy; applies to data written afterwards.
    pub fn set_params(&mut self, level: u8, strategy: Strategy) -> Result<()> {
        let state = self.writer()?;
        let Some(encoder) = state.encoder.as_mut() else {
            return Ok(());
        };
        if !state.member_open && encoder.is_finished() {
            encoder.reset();
        }
        encoder.set_params(level, strategy)
    }

    /// Finish any open member and close the file.
    pub fn close(mut self) -> Result<()> {
        match self.handle.take() {
            Some(Handle::Write(mut state)) => state.close(),
            _ => Ok(()),
        }
    }
}

impl Read for GzFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        GzFile::read(self, buf).map_err(io::Error::from)
    }
}

impl Write for GzFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        GzFile::write(self, buf).map_err(io::Error::from)
    }

    /// Sync-flush the compressor and the file.
    fn flush(&mut self) -> io::Result<()> {
        GzFile::flush(self, FlushMode::Sync).map_err(io::Error::from)
    }
}

impl Drop for GzFile {
    fn drop(&mut self) {
        if let Some(Handle::Write(mut state)) = self.handle.take() {
            let _ = state.close();
        }
    }
}
