//! The knobs of a decode call and what it reports back.

use fehler::{throw, throws};
use log::{debug, trace};

use super::{DecodeError, Decoder};

/// What ends a block.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Bound {
    /// The compressed size is known and the output size is only an upper limit.
    /// Every read and write is checked and the last literal run has to end exactly at the end of the input.
    ByInput,
    /// The decompressed size is known exactly and the stream is trusted to produce exactly that many bytes.
    /// The input may contain trailing bytes; you learn how many bytes were used from [`Decoded::read`].
    ByOutput,
}

/// Whether to decode the whole block or just its beginning.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Partial {
    Full,
    /// Stop as soon as this many bytes have been produced.
    /// Targets beyond the output capacity are clamped to the capacity.
    To(usize),
}

/// Where back-references that point before the start of the output go.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Dictionary<'a> {
    None,
    /// The first `n` bytes of the output buffer are not part of the output but the data
    /// that immediately preceded it (e.g. the previous block). Decoding starts after them.
    Prefix(usize),
    /// A separate buffer that is treated as if it came right before the output.
    External(&'a [u8]),
}

impl<'a> Dictionary<'a> {
    /// How many bytes before the output start a match may reach into.
    pub fn len(&self) -> usize {
        match *self {
            Dictionary::None => 0,
            Dictionary::Prefix(n) => n,
            Dictionary::External(dict) => dict.len(),
        }
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

/// How much a decode call consumed and produced.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct Decoded {
    /// Bytes consumed from the compressed input.
    pub read: usize,
    /// Bytes written to the output (not counting a prefix dictionary).
    pub written: usize,
}

/// A builder-style struct that configures a raw block decode.
///
/// Create it using `Default::default()`: by default every access is bounds checked against the
/// input, the whole block is decoded and no dictionary is used.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DecompressionSettings<'a> {
    bound: Bound,
    partial: Partial,
    dictionary: Dictionary<'a>,
}

impl<'a> Default for DecompressionSettings<'a> {
    fn default() -> Self {
        Self {
            bound: Bound::ByInput,
            partial: Partial::Full,
            dictionary: Dictionary::None,
        }
    }
}

impl<'a> DecompressionSettings<'a> {
    /// Choose the termination policy. See [`Bound`].
    pub fn bound(&mut self, v: Bound) -> &mut Self {
        self.bound = v;
        self
    }

    /// Shorthand for `bound(Bound::ByOutput)` (trusted) or `bound(Bound::ByInput)` (untrusted).
    ///
    /// Corrupt data is still detected in trusted mode, it just ends the block by output size
    /// instead of by input size.
    pub fn trust_input(&mut self, v: bool) -> &mut Self {
        self.bound = if v { Bound::ByOutput } else { Bound::ByInput };
        self
    }

    /// Stop after `target` bytes. Returning early this way is a success, not an error.
    pub fn partial(&mut self, target: usize) -> &mut Self {
        self.partial = Partial::To(target);
        self
    }

    /// Decode the entire block (the default).
    pub fn full(&mut self) -> &mut Self {
        self.partial = Partial::Full;
        self
    }

    /// The first `len` bytes of the output buffer already hold the data preceding this block.
    ///
    /// Replaces any external dictionary.
    pub fn prefix(&mut self, len: usize) -> &mut Self {
        self.dictionary = Dictionary::Prefix(len);
        self
    }

    /// Resolve references before the start of the output into `dict`.
    ///
    /// Only the trailing 64 KiB of a dictionary can ever be referenced.
    /// Replaces any prefix.
    pub fn external_dictionary(&mut self, dict: &'a [u8]) -> &mut Self {
        self.dictionary = Dictionary::External(dict);
        self
    }

    pub fn dictionary(&mut self, v: Dictionary<'a>) -> &mut Self {
        self.dictionary = v;
        self
    }

    pub fn get_bound(&self) -> Bound { self.bound }
    pub fn get_partial(&self) -> Partial { self.partial }
    pub fn get_dictionary(&self) -> Dictionary<'a> { self.dictionary }

    /// Decode one raw LZ4 block from `input` into `output`.
    ///
    /// With a prefix dictionary the first bytes of `output` are the prefix and decoding starts behind them;
    /// the output capacity is whatever is left. Nothing beyond the capacity is ever written, and on error
    /// the contents of `output` are unspecified.
    ///
    /// # Panics
    /// If the prefix is longer than `output`.
    #[throws(DecodeError)]
    pub fn decompress(&self, input: &[u8], output: &mut [u8]) -> Decoded {
        if let Dictionary::Prefix(len) = self.dictionary {
            assert!(len <= output.len(), "The prefix must be part of the output buffer.");
        }
        trace!(
            "decoding {} byte block into {} bytes ({:?}, {:?}, {} byte dictionary)",
            input.len(), output.len() - self.prefix_len(), self.bound, self.partial, self.dictionary.len()
        );

        match Decoder::new(self, input, output).run() {
            Ok(decoded) => {
                trace!("decoded {:?}", decoded);
                decoded
            }
            Err(e) => {
                debug!("rejected LZ4 block: {}", e);
                throw!(e);
            }
        }
    }

    pub(super) fn prefix_len(&self) -> usize {
        match self.dictionary {
            Dictionary::Prefix(n) => n,
            _ => 0,
        }
    }
}
