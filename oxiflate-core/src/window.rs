//! History window for LZ77 back-reference copies during decompression.
//!
//! The window is a power-of-two circular buffer holding the most recently
//! produced bytes. DEFLATE allows distances up to 32768, so the default window
//! is 32 KiB; zlib streams may declare a smaller one in their header.

use crate::error::{FlateError, Result};

/// Smallest supported window, in bits.
pub const MIN_WINDOW_BITS: u8 = 8;
/// Largest supported window, in bits (32 KiB).
pub const MAX_WINDOW_BITS: u8 = 15;
/// Default window size in bytes.
pub const DEFAULT_WINDOW_SIZE: usize = 1 << MAX_WINDOW_BITS;

/// A fixed-capacity circular history buffer.
#[derive(Debug, Clone)]
pub struct Window {
    buffer: Vec<u8>,
    /// Next write index.
    position: usize,
    /// Valid history, saturating at capacity.
    size: usize,
    mask: usize,
}

impl Default for Window {
    fn default() -> Self {
        Self {
            buffer: vec![0; DEFAULT_WINDOW_SIZE],
            position: 0,
            size: 0,
            mask: DEFAULT_WINDOW_SIZE - 1,
        }
    }
}

impl Window {
    /// Create a window of `1 << window_bits` bytes.
    pub fn new(window_bits: u8) -> Result<Self> {
        if !(MIN_WINDOW_BITS..=MAX_WINDOW_BITS).contains(&window_bits) {
            return Err(FlateError::invalid_parameter(
                "window_bits",
                format!(
                    "must be in {MIN_WINDOW_BITS}..={MAX_WINDOW_BITS}, got {window_bits}"
                ),
            ));
        }
        let capacity = 1usize << window_bits;
        Ok(Self {
            buffer: vec![0; capacity],
            position: 0,
            size: 0,
            mask: capacity - 1,
        })
    }

    /// Total capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Amount of valid history.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Whether no byte has been written yet.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Forget all history.
    pub fn clear(&mut self) {
        self.position = 0;
        self.size = 0;
        self.buffer.fill(0);
    }

    /// Append one byte, overwriting the oldest once full.
    #[inline]
    pub fn push(&mut self, byte: u8) {
        self.buffer[self.position] = byte;
        self.position = (self.position + 1) & self.mask;
        if self.size < self.buffer.len() {
            self.size += 1;
        }
    }

    /// Append a run of bytes, overwriting the oldest once full.
    pub fn append(&mut self, bytes: &[u8]) {
        let capacity = self.buffer.len();
        // Only the tail can survive.
        let bytes = if bytes.len() > capacity {
            &bytes[bytes.len() - capacity..]
        } else {
            bytes
        };

        let first = (capacity - self.position).min(bytes.len());
        self.buffer[self.position..self.position + first].copy_from_slice(&bytes[..first]);
        let rest = bytes.len() - first;
        self.buffer[..rest].copy_from_slice(&bytes[first..]);

        self.position = (self.position + bytes.len()) & self.mask;
        self.size = (self.size + bytes.len()).min(capacity);
    }

    /// Read the byte `distance` positions back (1 = most recent).
    pub fn read_at_distance(&self, distance: usize) -> Result<u8> {
        if distance == 0 || distance > self.size {
            return Err(FlateError::invalid_distance(distance, self.size));
        }
        Ok(self.buffer[self.position.wrapping_sub(distance) & self.mask])
    }

    /// Copy a back-reference into `output` and into the history.
    ///
    /// Writes `min(length, output.len())` bytes and returns that count. The
    /// copy runs byte by byte so that `length > distance` replicates the
    /// pattern. A partial copy can be resumed by calling again with the same
    /// distance and the remaining length.
    pub fn copy_match(&mut self, distance: usize, length: usize, output: &mut [u8]) -> Result<usize> {
        if distance == 0 || distance > self.size {
            return Err(FlateError::invalid_distance(distance, self.size));
        }

        let count = length.min(output.len());
        let mut src = self.position.wrapping_sub(distance) & self.mask;
        for slot in output.iter_mut().take(count) {
            let byte = self.buffer[src];
            *slot = byte;
            self.buffer[self.position] = byte;
            self.position = (self.position + 1) & self.mask;
            src = (src + 1) & self.mask;
        }
        self.size = (self.size + count).min(self.buffer.len());
        Ok(count)
    }

    /// Replace the history with a preset dictionary.
    ///
    /// Only the last `capacity` bytes of a longer dictionary are kept.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) {
        self.position = 0;
        self.size = 0;
        self.append(dictionary);
    }

    /// The most recent `count` bytes of history, oldest first.
    pub fn recent(&self, count: usize) -> Vec<u8> {
        let count = count.min(self.size);
        let start = self.position.wrapping_sub(count) & self.mask;
        (0..count)
            .map(|i| self.buffer[(start + i) & self.mask])
            .collect()
    }

    /// The whole valid history, oldest first.
    pub fn contents(&self) -> Vec<u8> {
        self.recent(self.size)
    }
}
