//! Async pumps for the streaming codecs.
//!
//! The codecs themselves never block: they are plain state machines driven by
//! [`Compressor::compress`] and [`Decompressor::decompress`]. These wrappers
//! run that loop between `AsyncRead` and `AsyncWrite` endpoints, awaiting I/O
//! whenever the codec asks for more input or has output to hand over.
//!
//! # Feature Flag
//!
//! Only available with the `async-io` feature:
//!
//! ```toml
//! [dependencies]
//! oxiflate-core = { version = "0.2", features = ["async-io"] }
//! ```

use crate::error::{FlateError, Result};
use crate::traits::{CompressStatus, Compressor, DecompressStatus, Decompressor, FlushMode};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Default buffer size for async operations (32KB).
const DEFAULT_BUFFER_SIZE: usize = 32 * 1024;

/// Refillable input staging area.
struct InputBuffer {
    data: Vec<u8>,
    start: usize,
    end: usize,
    eof: bool,
}

impl InputBuffer {
    fn new(size: usize) -> Self {
        Self {
            data: vec![0; size.max(1)],
            start: 0,
            end: 0,
            eof: false,
        }
    }

    fn pending(&self) -> &[u8] {
        &self.data[self.start..self.end]
    }

    fn consume(&mut self, count: usize) {
        self.start += count;
    }

    async fn refill<R: AsyncRead + Unpin>(&mut self, reader: &mut R) -> Result<()> {
        if self.eof || self.start < self.end {
            return Ok(());
        }
        self.start = 0;
        self.end = reader.read(&mut self.data).await?;
        self.eof = self.end == 0;
        Ok(())
    }
}

/// Drives a synchronous [`Compressor`] over tokio I/O.
///
/// # Example
///
/// ```rust,ignore
/// use oxiflate_core::async_io::AsyncCompressorWrapper;
/// use oxiflate_deflate::Deflater;
///
/// let mut pump = AsyncCompressorWrapper::new(Deflater::default());
/// let written = pump.compress_stream(&mut reader, &mut writer).await?;
/// ```
pub struct AsyncCompressorWrapper<C> {
    inner: C,
    buffer_size: usize,
}

impl<C: Compressor + Send> AsyncCompressorWrapper<C> {
    /// Wrap a compressor with the default buffer size.
    pub fn new(compressor: C) -> Self {
        Self::with_buffer_size(compressor, DEFAULT_BUFFER_SIZE)
    }

    /// Wrap a compressor with a custom buffer size.
    pub fn with_buffer_size(compressor: C, buffer_size: usize) -> Self {
        Self {
            inner: compressor,
            buffer_size: buffer_size.max(1),
        }
    }

    /// Get a reference to the inner compressor.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Consume the wrapper and return the inner compressor.
    pub fn into_inner(self) -> C {
        self.inner
    }

    /// Compress everything `input` yields into `output` and finish the stream.
    ///
    /// Returns the number of compressed bytes written.
    pub async fn compress_stream<R, W>(&mut self, input: &mut R, output: &mut W) -> Result<u64>
    where
        R: AsyncRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send,
    {
        let mut staged = InputBuffer::new(self.buffer_size);
        let mut out = vec![0u8; self.buffer_size];
        let mut total_written = 0u64;

        loop {
            staged.refill(input).await?;
            let flush = if staged.eof {
                FlushMode::Finish
            } else {
                FlushMode::None
            };

            let (consumed, produced, status) =
                self.inner.compress(staged.pending(), &mut out, flush)?;
            staged.consume(consumed);

            if produced > 0 {
                output.write_all(&out[..produced]).await?;
                total_written += produced as u64;
            }
            if status == CompressStatus::Done {
                output.flush().await?;
                return Ok(total_written);
            }
        }
    }
}

/// Drives a synchronous [`Decompressor`] over tokio I/O.
pub struct AsyncDecompressorWrapper<D> {
    inner: D,
    buffer_size: usize,
}

impl<D: Decompressor + Send> AsyncDecompressorWrapper<D> {
    /// Wrap a decompressor with the default buffer size.
    pub fn new(decompressor: D) -> Self {
        Self::with_buffer_size(decompressor, DEFAULT_BUFFER_SIZE)
    }

    /// Wrap a decompressor with a custom buffer size.
    pub fn with_buffer_size(decompressor: D, buffer_size: usize) -> Self {
        Self {
            inner: decompressor,
            buffer_size: buffer_size.max(1),
        }
    }

    /// Get a reference to the inner decompressor.
    pub fn inner(&self) -> &D {
        &self.inner
    }

    /// Consume the wrapper and return the inner decompressor.
    pub fn into_inner(self) -> D {
        self.inner
    }

    /// Decompress one stream from `input` into `output`.
    ///
    /// Returns the number of decompressed bytes written. Fails with
    /// [`FlateError::UnexpectedEof`] if `input` ends mid-stream.
    pub async fn decompress_stream<R, W>(&mut self, input: &mut R, output: &mut W) -> Result<u64>
    where
        R: AsyncRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send,
    {
        let mut staged = InputBuffer::new(self.buffer_size);
        let mut out = vec![0u8; self.buffer_size];
        let mut total_written = 0u64;

        loop {
            staged.refill(input).await?;
            let result = self.inner.decompress(staged.pending(), &mut out);
            let (consumed, produced, status) = match result {
                Err(FlateError::BufError) if staged.eof => {
                    return Err(FlateError::unexpected_eof(1));
                }
                other => other?,
            };
            staged.consume(consumed);

            if produced > 0 {
                output.write_all(&out[..produced]).await?;
                total_written += produced as u64;
            }
            match status {
                DecompressStatus::Done => {
                    output.flush().await?;
                    return Ok(total_written);
                }
                DecompressStatus::NeedsInput if staged.eof => {
                    return Err(FlateError::unexpected_eof(1));
                }
                DecompressStatus::NeedsInput | DecompressStatus::NeedsOutput => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Length-prefixed framing: a stand-in codec for exercising the pumps.
    #[derive(Default)]
    struct Framed {
        header_sent: bool,
        body: Vec<u8>,
        done: bool,
    }

    impl Compressor for Framed {
        fn compress(
            &mut self,
            input: &[u8],
            output: &mut [u8],
            flush: FlushMode,
        ) -> Result<(usize, usize, CompressStatus)> {
            self.body.extend_from_slice(input);
            if flush != FlushMode::Finish {
                return Ok((input.len(), 0, CompressStatus::NeedsInput));
            }
            let mut frame = Vec::new();
            if !self.header_sent {
                frame.extend_from_slice(&(self.body.len() as u32).to_le_bytes());
            }
            frame.extend_from_slice(&self.body);
            if frame.len() > output.len() {
                return Ok((input.len(), 0, CompressStatus::NeedsOutput));
            }
            output[..frame.len()].copy_from_slice(&frame);
            self.done = true;
            Ok((input.len(), frame.len(), CompressStatus::Done))
        }

        fn reset(&mut self) {
            *self = Self::default();
        }

        fn is_finished(&self) -> bool {
            self.done
        }
    }

    #[tokio::test]
    async fn test_compress_stream_finishes() {
        let data = b"abcdefghij".repeat(10);
        let mut reader: &[u8] = &data;
        let mut sink = Vec::new();

        let mut pump = AsyncCompressorWrapper::with_buffer_size(Framed::default(), 4096);
        let written = pump
            .compress_stream(&mut reader, &mut sink)
            .await
            .expect("compress");
        assert_eq!(written as usize, data.len() + 4);
        assert_eq!(&sink[..4], &(data.len() as u32).to_le_bytes());
        assert!(pump.inner().is_finished());
    }
}
