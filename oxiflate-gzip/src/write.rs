//! Compressing writer producing gzip data.

use crate::encoder::GzEncoder;
use crate::header::GzipHeader;
use oxiflate_core::error::{FlateError, Result};
use oxiflate_core::traits::{CompressStatus, CompressionLevel, Compressor, FlushMode};
use std::io::{self, Write};

/// Output staging size.
const BUFFER_SIZE: usize = 32 * 1024;

/// Drive `encoder` over all of `data` with `flush`, writing every produced
/// byte to `sink`.
pub(crate) fn pump<W: Write>(
    encoder: &mut GzEncoder,
    sink: &mut W,
    buffer: &mut [u8],
    data: &[u8],
    flush: FlushMode,
) -> Result<()> {
    let mut pos = 0;
    loop {
        let (consumed, produced, status) = encoder.compress(&data[pos..], buffer, flush)?;
        pos += consumed;
        sink.write_all(&buffer[..produced])?;
        match status {
            CompressStatus::Done => return Ok(()),
            CompressStatus::NeedsInput if pos == data.len() => return Ok(()),
            _ => {}
        }
    }
}

/// Compressing writer that emits one gzip member.
///
/// The member is completed by [`GzWriter::finish`], or on drop, where any
/// error is lost.
///
/// ```
/// use oxiflate_gzip::{GzWriter, decompress};
/// use std::io::Write;
///
/// let mut writer = GzWriter::new(Vec::new(), 6);
/// write!(writer, "{} bottles", 99).unwrap();
/// let compressed = writer.finish().unwrap();
/// assert_eq!(decompress(&compressed).unwrap(), b"99 bottles");
/// ```
#[derive(Debug)]
pub struct GzWriter<W: Write> {
    inner: Option<W>,
    encoder: GzEncoder,
    buffer: Vec<u8>,
}

impl<W: Write> GzWriter<W> {
    /// Wrap `inner` with a default header at `level`.
    pub fn new(inner: W, level: impl Into<CompressionLevel>) -> Self {
        Self::with_encoder(inner, GzEncoder::with_level(level))
    }

    /// Wrap `inner` with a custom header at `level`.
    pub fn with_header(inner: W, level: impl Into<CompressionLevel>, header: GzipHeader) -> Self {
        Self::with_encoder(inner, GzEncoder::with_header(level, header))
    }

    /// Wrap `inner` around a configured encoder.
    pub fn with_encoder(inner: W, encoder: GzEncoder) -> Self {
        Self {
            inner: Some(inner),
            encoder,
            buffer: vec![0; BUFFER_SIZE],
        }
    }

    /// Borrow the underlying writer.
    pub fn get_ref(&self) -> Option<&W> {
        self.inner.as_ref()
    }

    /// Total uncompressed bytes written.
    pub fn total_in(&self) -> u64 {
        self.encoder.total_in()
    }

    /// Total gzip bytes emitted.
    pub fn total_out(&self) -> u64 {
        self.encoder.total_out()
    }

    fn drive(&mut self, data: &[u8], flush: FlushMode) -> Result<()> {
        let Some(inner) = self.inner.as_mut() else {
            return Err(FlateError::stream("gzip writer already finished"));
        };
        pump(&mut self.encoder, inner, &mut self.buffer, data, flush)
    }

    /// Complete the member without giving up the writer.
    pub fn try_finish(&mut self) -> Result<()> {
        if self.encoder.is_finished() {
            return Ok(());
        }
        self.drive(&[], FlushMode::Finish)?;
        if let Some(inner) = self.inner.as_mut() {
            inner.flush()?;
        }
        Ok(())
    }

    /// Complete the member and return the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.try_finish()?;
        self.inner
            .take()
            .ok_or_else(|| FlateError::stream("gzip writer already finished"))
    }
}

impl<W: Write> Write for GzWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.drive(buf, FlushMode::None)?;
        Ok(buf.len())
    }

    /// Sync-flush the compressor and the underlying writer.
    fn flush(&mut self) -> io::Result<()> {
        if !self.encoder.is_finished() {
            self.drive(&[], FlushMode::Sync)?;
        }
        if let Some(inner) = self.inner.as_mut() {
            inner.flush()?;
        }
        Ok(())
    }
}

impl<W: Write> Drop for GzWriter<W> {
    fn drop(&mut self) {
        if self.inner.is_some() {
            let _ = self.try_finish();
        }
    }
}
