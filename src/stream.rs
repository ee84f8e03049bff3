//! Decoding a chain of dependent blocks.

use fehler::{throw, throws};
use log::trace;

use crate::raw::{DecodeError, DecompressionSettings, WINDOW_SIZE};

/// Decodes blocks that may reference the data of the blocks before them.
///
/// The decoder keeps the trailing 64 KiB of everything it has produced and hands it to the next block
/// as an external dictionary. It knows nothing about framing: you feed it one raw block at a time
/// together with the largest size that block may decode to.
#[derive(Clone, Debug, Default)]
pub struct StreamDecoder {
    window: Vec<u8>,
}

impl StreamDecoder {
    pub fn new() -> Self {
        StreamDecoder { window: Vec::with_capacity(WINDOW_SIZE) }
    }

    /// Start a stream whose first block was compressed against `dict`.
    ///
    /// Dictionary content before the trailing 64 KiB can never be referenced and is dropped.
    pub fn with_dictionary(dict: &[u8]) -> Self {
        let mut decoder = Self::new();
        decoder.remember(dict);
        decoder
    }

    /// Forget all history, e.g. to start over with an unrelated stream.
    pub fn reset(&mut self) {
        self.window.clear();
    }

    /// The data that the next block may reference.
    pub fn window(&self) -> &[u8] {
        &self.window
    }

    /// Decode one block and append it to the history.
    ///
    /// On error `output` is left empty and the history stays untouched.
    #[throws(DecodeError)]
    pub fn decode_block(&mut self, block: &[u8], max_size: usize, output: &mut Vec<u8>) {
        assert!(output.is_empty(), "You must pass an empty buffer to this interface.");

        output.resize(max_size, 0);
        let decoded = DecompressionSettings::default()
            .external_dictionary(&self.window)
            .decompress(block, output);
        match decoded {
            Ok(decoded) => output.truncate(decoded.written),
            Err(e) => {
                output.clear();
                throw!(e);
            }
        }

        trace!("stream block: {} -> {} bytes, {} bytes of history", block.len(), output.len(), self.window.len());
        self.remember(output);
    }

    fn remember(&mut self, data: &[u8]) {
        let len = data.len();
        if len < WINDOW_SIZE {
            let available_bytes = self.window.len() + len;
            if let Some(surplus_bytes) = available_bytes.checked_sub(WINDOW_SIZE) {
                // remove as many bytes from front as we are replacing
                self.window.drain(..surplus_bytes);
            }
            self.window.extend_from_slice(data);
        } else {
            self.window.clear();
            self.window.extend_from_slice(&data[len - WINDOW_SIZE..]);
        }

        assert!(self.window.len() <= WINDOW_SIZE);
    }
}
