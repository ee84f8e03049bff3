//! The raw LZ4 block format.
//!
//! A block is a plain sequence of tokens, literals and back-references without any header,
//! checksum or length field. Whoever hands you a block therefore also has to tell you either how
//! long the compressed data is or how large the decompressed data will be (ideally both).
//! See [`Bound`] for the two ways of ending a block.

mod decompress;

pub use decompress::*;

/// The shortest match the format can express. Match lengths are stored minus this value.
pub const MINMATCH: usize = 4;
/// The LZ4 raw format maintains a lookback window of exactly 64KiB.
/// (Strictly speaking 64KiB - 1, the largest offset a `u16` can hold.)
pub const WINDOW_SIZE: usize = 64 * 1024;
