//! Bit-level I/O for DEFLATE streams.
//!
//! DEFLATE packs data LSB-first: the first bit of the stream is the least
//! significant bit of the first byte. Huffman codes are stored bit-reversed so
//! that they can be emitted with the same LSB-first writer.
//!
//! Both types here are built for resumable streaming:
//!
//! - [`BitReader`] works on caller-supplied input slices. It pulls input
//!   bytes into its bit buffer one at a time and only when a read needs them,
//!   so it never consumes bytes past the end of a compressed stream. A read
//!   that cannot be satisfied returns `None` and leaves every buffered bit in
//!   place, to be completed on the next call.
//! - [`BitWriter`] accumulates whole bytes in a pending buffer that the caller
//!   drains into output slices of any size.

// ============================================================================
// Streaming Bit Reader
// ============================================================================

/// A resumable LSB-first bit reader over successive input slices.
///
/// The caller passes the current input slice to every read. Call
/// [`BitReader::begin`] when switching to a new slice and
/// [`BitReader::bytes_consumed`] to learn how much of it was taken.
#[derive(Debug, Clone, Default)]
pub struct BitReader {
    /// Bit buffer (LSB-first).
    buffer: u64,
    /// Number of valid bits in buffer.
    bits_in_buffer: u8,
    /// Current position in input slice.
    input_pos: usize,
    /// Total bits consumed.
    total_bits_consumed: u64,
}

impl BitReader {
    /// Create an empty bit reader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start reading from a new input slice.
    ///
    /// Bits already buffered from earlier slices are kept.
    pub fn begin(&mut self) {
        self.input_pos = 0;
    }

    /// Number of bytes taken from the current input slice.
    pub fn bytes_consumed(&self) -> usize {
        self.input_pos
    }

    /// Total number of bits consumed since creation or [`BitReader::reset`].
    pub fn total_bits(&self) -> u64 {
        self.total_bits_consumed
    }

    /// Number of bits buffered but not yet consumed.
    pub fn bits_available(&self) -> u8 {
        self.bits_in_buffer
    }

    /// Raw buffered bits, LSB-first. Only the low [`BitReader::bits_available`]
    /// bits are meaningful.
    pub fn buffered(&self) -> u64 {
        self.buffer
    }

    /// Move one byte from `input` into the bit buffer.
    ///
    /// Returns `false` if the input slice is exhausted.
    pub fn pull_byte(&mut self, input: &[u8]) -> bool {
        match input.get(self.input_pos) {
            Some(&byte) if self.bits_in_buffer <= 56 => {
                self.buffer |= (byte as u64) << self.bits_in_buffer;
                self.bits_in_buffer += 8;
                self.input_pos += 1;
                true
            }
            _ => false,
        }
    }

    /// Make sure at least `count` bits are buffered, pulling only as many
    /// bytes as needed.
    pub fn ensure(&mut self, input: &[u8], count: u8) -> bool {
        while self.bits_in_buffer < count {
            if !self.pull_byte(input) {
                return false;
            }
        }
        true
    }

    /// Read up to 32 bits.
    ///
    /// Returns `None` if the input runs out first. Nothing is consumed in that
    /// case: bytes pulled from `input` stay buffered for the next attempt.
    pub fn read_bits(&mut self, input: &[u8], count: u8) -> Option<u32> {
        debug_assert!(count <= 32, "Cannot read more than 32 bits at once");

        if count == 0 {
            return Some(0);
        }
        if !self.ensure(input, count) {
            return None;
        }

        let mask = (1u64 << count) - 1;
        let result = (self.buffer & mask) as u32;
        self.consume(count);
        Some(result)
    }

    /// Peek at up to 32 bits without consuming them.
    pub fn peek_bits(&mut self, input: &[u8], count: u8) -> Option<u32> {
        debug_assert!(count <= 32, "Cannot peek more than 32 bits at once");

        if !self.ensure(input, count) {
            return None;
        }
        let mask = (1u64 << count) - 1;
        Some((self.buffer & mask) as u32)
    }

    /// Skip bits that are already buffered.
    pub fn skip_bits(&mut self, count: u8) {
        if count == 0 || self.bits_in_buffer < count {
            return;
        }
        self.consume(count);
    }

    /// Read a single bit.
    pub fn read_bit(&mut self, input: &[u8]) -> Option<bool> {
        self.read_bits(input, 1).map(|b| b != 0)
    }

    /// Discard bits up to the next byte boundary.
    pub fn align_to_byte(&mut self) {
        let partial = self.bits_in_buffer % 8;
        self.consume(partial);
    }

    /// Take one whole byte still sitting in the bit buffer after alignment.
    pub fn take_buffered_byte(&mut self) -> Option<u8> {
        if self.bits_in_buffer < 8 {
            return None;
        }
        let byte = (self.buffer & 0xFF) as u8;
        self.consume(8);
        Some(byte)
    }

    /// Mark `count` raw bytes of the current input as consumed.
    ///
    /// Used for stored blocks once the bit buffer is empty.
    pub fn advance_bytes(&mut self, count: usize) {
        debug_assert_eq!(self.bits_in_buffer, 0);
        self.input_pos += count;
        self.total_bits_consumed += (count as u64) * 8;
    }

    /// Forget all buffered bits and counters.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Save the current state for potential rollback.
    pub fn save_state(&self) -> BitReaderState {
        BitReaderState {
            buffer: self.buffer,
            bits_in_buffer: self.bits_in_buffer,
            input_pos: self.input_pos,
            total_bits_consumed: self.total_bits_consumed,
        }
    }

    /// Restore a previously saved state.
    pub fn restore_state(&mut self, state: BitReaderState) {
        self.buffer = state.buffer;
        self.bits_in_buffer = state.bits_in_buffer;
        self.input_pos = state.input_pos;
        self.total_bits_consumed = state.total_bits_consumed;
    }

    #[inline]
    fn consume(&mut self, count: u8) {
        if count == 0 {
            return;
        }
        self.buffer = if count >= 64 { 0 } else { self.buffer >> count };
        self.bits_in_buffer -= count;
        self.total_bits_consumed += count as u64;
    }
}

/// Saved state of a [`BitReader`] for rollback.
#[derive(Debug, Clone, Copy)]
pub struct BitReaderState {
    buffer: u64,
    bits_in_buffer: u8,
    input_pos: usize,
    total_bits_consumed: u64,
}

// ============================================================================
// Bit Writer
// ============================================================================

/// An LSB-first bit writer with a drainable pending byte buffer.
#[derive(Debug, Clone, Default)]
pub struct BitWriter {
    /// Completed bytes not yet handed to the caller.
    pending: Vec<u8>,
    /// Read cursor into `pending`.
    drained: usize,
    /// Bit accumulator (LSB-first).
    buffer: u64,
    /// Number of valid bits in the accumulator.
    bits_in_buffer: u8,
    /// Total bits written.
    total_bits: u64,
}

impl BitWriter {
    /// Create an empty bit writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the `count` low bits of `value` (up to 32).
    #[inline]
    pub fn write_bits(&mut self, value: u32, count: u8) {
        debug_assert!(count <= 32, "Cannot write more than 32 bits at once");

        if count == 0 {
            return;
        }
        let mask = (1u64 << count) - 1;
        self.buffer |= ((value as u64) & mask) << self.bits_in_buffer;
        self.bits_in_buffer += count;
        self.total_bits += count as u64;

        while self.bits_in_buffer >= 8 {
            self.pending.push(self.buffer as u8);
            self.buffer >>= 8;
            self.bits_in_buffer -= 8;
        }
    }

    /// Append a single bit.
    pub fn write_bit(&mut self, bit: bool) {
        self.write_bits(bit as u32, 1);
    }

    /// Pad the current byte with zero bits.
    pub fn align_to_byte(&mut self) {
        if self.bits_in_buffer > 0 {
            let padding = 8 - self.bits_in_buffer;
            self.write_bits(0, padding);
        }
    }

    /// Append raw bytes. The writer must be byte aligned.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        debug_assert_eq!(self.bits_in_buffer, 0, "write_bytes requires alignment");
        self.pending.extend_from_slice(bytes);
        self.total_bits += (bytes.len() as u64) * 8;
    }

    /// Number of bits held in the accumulator (less than 8).
    pub fn partial_bits(&self) -> u8 {
        self.bits_in_buffer
    }

    /// Whether the writer sits on a byte boundary.
    pub fn is_aligned(&self) -> bool {
        self.bits_in_buffer == 0
    }

    /// Total number of bits written.
    pub fn total_bits(&self) -> u64 {
        self.total_bits
    }

    /// Number of completed bytes waiting to be drained.
    pub fn pending_len(&self) -> usize {
        self.pending.len() - self.drained
    }

    /// Whether completed bytes are waiting to be drained.
    pub fn has_pending(&self) -> bool {
        self.pending_len() > 0
    }

    /// Copy as many pending bytes as fit into `output`.
    pub fn drain_into(&mut self, output: &mut [u8]) -> usize {
        let available = &self.pending[self.drained..];
        let n = available.len().min(output.len());
        output[..n].copy_from_slice(&available[..n]);
        self.drained += n;

        if self.drained == self.pending.len() {
            self.pending.clear();
            self.drained = 0;
        }
        n
    }

    /// Take every completed byte, leaving the partial byte in place.
    pub fn take_pending(&mut self) -> Vec<u8> {
        let rest = self.pending.split_off(self.drained);
        self.pending.clear();
        self.drained = 0;
        rest
    }

    /// Drop all state.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.drained = 0;
        self.buffer = 0;
        self.bits_in_buffer = 0;
        self.total_bits = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitreader_basic() {
        let data = [0b10110101u8];
        let mut reader = BitReader::new();

        // LSB first: 1, 0, 1, 0, 1, 1, 0, 1
        assert_eq!(reader.read_bit(&data), Some(true));
        assert_eq!(reader.read_bit(&data), Some(false));
        assert_eq!(reader.read_bits(&data, 3), Some(0b101));
        assert_eq!(reader.read_bits(&data, 3), Some(0b101));
        assert_eq!(reader.bytes_consumed(), 1);
    }

    #[test]
    fn test_bitreader_needs_more_input_keeps_bits() {
        let mut reader = BitReader::new();
        let first = [0xABu8];
        assert_eq!(reader.read_bits(&first, 12), None);
        assert_eq!(reader.bytes_consumed(), 1);
        assert_eq!(reader.bits_available(), 8);

        reader.begin();
        let second = [0xCDu8];
        assert_eq!(reader.read_bits(&second, 12), Some(0xDAB));
        assert_eq!(reader.bits_available(), 4);
        assert_eq!(reader.total_bits(), 12);
    }

    #[test]
    fn test_bitreader_pulls_minimally() {
        let data = [0xFF, 0x00, 0x11];
        let mut reader = BitReader::new();
        assert_eq!(reader.read_bits(&data, 3), Some(0b111));
        assert_eq!(reader.bytes_consumed(), 1);
        assert_eq!(reader.read_bits(&data, 5), Some(0b11111));
        assert_eq!(reader.bytes_consumed(), 1);
    }

    #[test]
    fn test_align_and_buffered_bytes() {
        let data = [0xFF, 0x12, 0x34];
        let mut reader = BitReader::new();
        reader.read_bits(&data, 4);
        reader.align_to_byte();
        assert_eq!(reader.bits_available(), 0);
        assert_eq!(reader.read_bits(&data, 16), Some(0x3412));
    }

    #[test]
    fn test_save_restore() {
        let data = [0x5A, 0xA5];
        let mut reader = BitReader::new();
        let state = reader.save_state();
        assert_eq!(reader.read_bits(&data, 10), Some(0x15A));
        reader.restore_state(state);
        assert_eq!(reader.read_bits(&data, 8), Some(0x5A));
    }

    #[test]
    fn test_bitwriter_multi_bits() {
        let mut writer = BitWriter::new();
        writer.write_bits(0b101, 3);
        writer.write_bits(0b11001, 5);

        let mut out = [0u8; 4];
        let n = writer.drain_into(&mut out);
        assert_eq!(&out[..n], &[0xCD]);
        assert!(writer.is_aligned());
    }

    #[test]
    fn test_bitwriter_align_pads_with_zeros() {
        let mut writer = BitWriter::new();
        writer.write_bits(0b1, 1);
        assert_eq!(writer.pending_len(), 0);
        writer.align_to_byte();
        writer.write_bytes(&[0xAA]);
        assert_eq!(writer.take_pending(), vec![0x01, 0xAA]);
    }

    #[test]
    fn test_bitwriter_partial_drain() {
        let mut writer = BitWriter::new();
        writer.write_bits(0x04030201, 32);

        let mut out = [0u8; 3];
        assert_eq!(writer.drain_into(&mut out), 3);
        assert_eq!(out, [0x01, 0x02, 0x03]);
        assert_eq!(writer.pending_len(), 1);

        let mut rest = [0u8; 3];
        assert_eq!(writer.drain_into(&mut rest), 1);
        assert_eq!(rest[0], 0x04);
        assert!(!writer.has_pending());
    }

    #[test]
    fn test_roundtrip_through_reader() {
        let mut writer = BitWriter::new();
        let fields: [(u32, u8); 5] = [(1, 1), (2, 2), (0x1F, 5), (0x1234, 13), (0, 7)];
        for &(value, bits) in &fields {
            writer.write_bits(value, bits);
        }
        writer.align_to_byte();
        let bytes = writer.take_pending();

        let mut reader = BitReader::new();
        for &(value, bits) in &fields {
            assert_eq!(reader.read_bits(&bytes, bits), Some(value));
        }
    }
}
