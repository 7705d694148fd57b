//! Codec configuration.

use oxiflate_core::error::{FlateError, Result};
use oxiflate_core::traits::{CompressionLevel, Strategy};

/// Compressor settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeflateConfig {
    /// Compression level, 0 (stored) to 9 (best).
    pub level: u8,
    /// Matching strategy.
    pub strategy: Strategy,
    /// Base-2 logarithm of the history size, 9 to 15.
    pub window_bits: u8,
    /// Memory for the hash table and token buffer, 1 to 9.
    pub mem_level: u8,
}

impl Default for DeflateConfig {
    fn default() -> Self {
        Self {
            level: CompressionLevel::DEFAULT.level(),
            strategy: Strategy::Default,
            window_bits: 15,
            mem_level: 8,
        }
    }
}

impl DeflateConfig {
    /// Default settings at the given level.
    pub fn new(level: u8) -> Self {
        Self::default().with_level(level)
    }

    /// Set the compression level.
    pub fn with_level(mut self, level: u8) -> Self {
        self.level = level;
        self
    }

    /// Set the strategy.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the window size.
    pub fn with_window_bits(mut self, window_bits: u8) -> Self {
        self.window_bits = window_bits;
        self
    }

    /// Set the memory level.
    pub fn with_mem_level(mut self, mem_level: u8) -> Self {
        self.mem_level = mem_level;
        self
    }

    /// Check every field against its allowed range.
    pub fn validate(&self) -> Result<()> {
        CompressionLevel::try_new(self.level)?;
        if !(9..=15).contains(&self.window_bits) {
            return Err(FlateError::invalid_parameter(
                "window_bits",
                format!("must be in 9..=15, got {}", self.window_bits),
            ));
        }
        if !(1..=9).contains(&self.mem_level) {
            return Err(FlateError::invalid_parameter(
                "mem_level",
                format!("must be in 1..=9, got {}", self.mem_level),
            ));
        }
        Ok(())
    }

    /// Tokens buffered per block before it is emitted.
    pub fn token_limit(&self) -> usize {
        1 << (self.mem_level.clamp(1, 9) + 6)
    }
}

impl From<CompressionLevel> for DeflateConfig {
    fn from(level: CompressionLevel) -> Self {
        Self::new(level.level())
    }
}

/// Decompressor settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InflateConfig {
    /// Base-2 logarithm of the history size, 8 to 15. Streams referring
    /// further back fail with an invalid distance.
    pub window_bits: u8,
}

impl Default for InflateConfig {
    fn default() -> Self {
        Self { window_bits: 15 }
    }
}

impl InflateConfig {
    /// Set the window size.
    pub fn with_window_bits(mut self, window_bits: u8) -> Self {
        self.window_bits = window_bits;
        self
    }

    /// Check the window size.
    pub fn validate(&self) -> Result<()> {
        if !(8..=15).contains(&self.window_bits) {
            return Err(FlateError::invalid_parameter(
                "window_bits",
                format!("must be in 8..=15, got {}", self.window_bits),
            ));
        }
        Ok(())
    }
}
