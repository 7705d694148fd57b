//! Command implementations for OxiFlate CLI.

pub mod checksum;
pub mod compress;
pub mod decompress;
pub mod info;

pub use checksum::{Algorithm, cmd_checksum};
pub use compress::{CompressOptions, cmd_compress};
pub use decompress::{DecompressOptions, cmd_decompress};
pub use info::cmd_info;
pub use test::cmd_test;
