//! A pure Rust decoder for the raw LZ4 block format.
//!
//! Everything here works on buffers you own: the decoder borrows the compressed input, an output
//! slice that is never grown, and optionally a dictionary. Corrupt input is reported as
//! [`DecodeError`], never as a panic or an out-of-bounds access.
//!
//! ```
//! let block = [0x14, b'a', 1, 0, 0x50, b'b', b'c', b'd', b'e', b'f'];
//! let mut out = [0u8; 64];
//! let len = lz4_block_decode::decompress_safe(&block, &mut out).unwrap();
//! assert_eq!(&out[..len], b"aaaaaaaaabcdef");
//! ```

#![forbid(unsafe_code)]

pub mod raw;
mod stream;

pub use raw::{
    decompress, decompress_bounded, decompress_fast, decompress_fast_using_dict, decompress_fast_with_prefix,
    decompress_safe, decompress_safe_partial, decompress_safe_using_dict, decompress_safe_with_prefix,
    Bound, Corruption, DecodeError, Decoded, DecompressionSettings, Dictionary, Partial,
};
pub use stream::StreamDecoder;

/// Major version of the block format this crate speaks (interface/format changes).
pub const VERSION_MAJOR: u32 = 1;
/// Minor version (minor interface/format changes).
pub const VERSION_MINOR: u32 = 3;
/// Release (tweaks and bug fixes).
pub const VERSION_RELEASE: u32 = 0;

/// Largest input size a single compression call accepts.
pub const MAX_INPUT_SIZE: usize = 0x7E00_0000;

/// The version as a single number: `major * 10000 + minor * 100 + release`.
pub fn format_version() -> u32 {
    VERSION_MAJOR * 100 * 100 + VERSION_MINOR * 100 + VERSION_RELEASE
}

/// The largest size a block compressed from `input_size` bytes can have.
///
/// Returns `0` for inputs larger than [`MAX_INPUT_SIZE`], which cannot be compressed in one go.
pub fn max_compressed_size(input_size: usize) -> usize {
    if input_size > MAX_INPUT_SIZE {
        0
    } else {
        input_size + input_size / 255 + 16
    }
}
