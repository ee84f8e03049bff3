//! LZ4 block decompression.
//!
//! The decoder works on caller-owned buffers and never grows them. Every cursor movement is
//! checked, so corrupt or malicious input ends in a [`DecodeError`] rather than a panic or
//! an out-of-bounds access.

mod copy;
mod settings;
mod token;

pub use settings::*;

use std::cmp;
use std::io;
use fehler::{throw, throws};
use thiserror::Error;

use super::{MINMATCH, WINDOW_SIZE};
use copy::copy_overlapping;
use token::{read_lsic, Input, Token};

/// A literal run always leaves room for a full 8-byte copy in front of the block end.
const COPYLENGTH: usize = 8;
/// The last five bytes of a block are always literals.
const LASTLITERALS: usize = 5;
/// The last match must start at least this many bytes before the end of the block.
const MFLIMIT: usize = COPYLENGTH + MINMATCH;
/// Offset, next token and the trailing literals that must still follow a non-final literal run.
const MIN_INPUT_AFTER_LITERALS: usize = 2 + 1 + LASTLITERALS;

/// The specific way in which a block turned out to be malformed.
#[derive(Error, Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Corruption {
    #[error("the input ended in the middle of a sequence")]
    UnexpectedEnd,
    #[error("a length field does not fit into memory")]
    LengthOverflow,
    #[error("the last literal run does not end exactly at the end of the input")]
    TrailingInput,
    #[error("the block does not decode to exactly the expected size")]
    OutputSizeMismatch,
    #[error("the block decodes to more data than the output can hold")]
    OutputOverrun,
    #[error("a match has offset zero")]
    ZeroOffset,
    #[error("a match reaches before the start of the output and dictionary")]
    OffsetOutOfWindow,
    #[error("a match runs into the last five bytes of the block, which must be literals")]
    MatchInTail,
}

/// Errors when decompressing a raw LZ4 block.
#[derive(Error, Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum DecodeError {
    #[error("corrupt LZ4 block at input offset {position}: {reason}")]
    CorruptStream {
        /// How far into the compressed input the problem was noticed.
        position: usize,
        reason: Corruption,
    },
}

impl DecodeError {
    pub fn reason(&self) -> Corruption {
        match *self {
            DecodeError::CorruptStream { reason, .. } => reason,
        }
    }
}

impl From<DecodeError> for io::Error {
    fn from(e: DecodeError) -> io::Error {
        io::Error::new(io::ErrorKind::InvalidData, e)
    }
}

/// Whether the decode loop keeps going after a step.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Flow {
    Continue,
    Stop,
}

/// Where the bytes of a match come from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Source {
    /// Inside the output buffer (prefix included), `offset` bytes behind the cursor.
    Window,
    /// The match starts this many bytes before the end of the external dictionary.
    Dictionary(usize),
}

/// State of one decode call. Nothing survives the call.
struct Decoder<'a> {
    input: Input<'a>,
    /// Prefix followed by the output area.
    buf: &'a mut [u8],
    /// Index in `buf` where the decoded data begins.
    start: usize,
    /// Output cursor, as an index into `buf`.
    op: usize,
    /// Output cursor position at which partial decoding stops.
    stop: Option<usize>,
    bound: Bound,
    ext_dict: &'a [u8],
}

impl<'a> Decoder<'a> {
    fn new(settings: &DecompressionSettings<'a>, input: &'a [u8], buf: &'a mut [u8]) -> Self {
        let start = settings.prefix_len();
        let capacity = buf.len() - start;
        let stop = match settings.get_partial() {
            Partial::Full => None,
            Partial::To(target) => Some(start + cmp::min(target, capacity)),
        };
        let ext_dict = match settings.get_dictionary() {
            Dictionary::External(dict) => dict,
            _ => &[],
        };

        Decoder {
            input: Input::new(input),
            buf,
            start,
            op: start,
            stop,
            bound: settings.get_bound(),
            ext_dict,
        }
    }

    #[throws(DecodeError)]
    fn run(mut self) -> Decoded {
        if let Err(reason) = self.decode() {
            throw!(DecodeError::CorruptStream { position: self.input.position(), reason });
        }
        Decoded {
            read: self.input.position(),
            written: self.op - self.start,
        }
    }

    #[throws(Corruption)]
    fn decode(&mut self) {
        if self.stop == Some(self.op) {
            // nothing was asked for, so nothing is read
            return;
        }
        if self.buf.len() == self.start {
            // an empty output buffer only accepts an empty block
            self.decode_empty()?;
            return;
        }

        loop {
            let token = Token(self.input.read_u8()?);

            let literal_len = read_lsic(token.literals(), &mut self.input, 0)?;
            if self.copy_literals(literal_len)? == Flow::Stop {
                return;
            }

            let offset = self.input.read_u16_le()? as usize;
            let source = self.resolve(offset)?;

            let reserve = match self.bound {
                Bound::ByInput => LASTLITERALS,
                Bound::ByOutput => 0,
            };
            let match_len = read_lsic(token.match_code(), &mut self.input, reserve)?
                .checked_add(MINMATCH)
                .ok_or(Corruption::LengthOverflow)?;
            if self.copy_match(source, offset, match_len)? == Flow::Stop {
                return;
            }
        }
    }

    /// A zero-capacity output accepts no input at all, or a single token announcing zero literals.
    #[throws(Corruption)]
    fn decode_empty(&mut self) {
        if self.input.is_exhausted() {
            return;
        }
        if self.input.read_u8()? != 0 {
            throw!(Corruption::OutputOverrun);
        }
        if self.bound == Bound::ByInput && !self.input.is_exhausted() {
            throw!(Corruption::TrailingInput);
        }
    }

    #[throws(Corruption)]
    fn copy_literals(&mut self, len: usize) -> Flow {
        let end = self.buf.len();
        let lit_end = self.op.checked_add(len).ok_or(Corruption::LengthOverflow)?;
        let in_end = self.input.position().checked_add(len).ok_or(Corruption::LengthOverflow)?;

        if let Some(stop) = self.stop {
            let n = cmp::min(len, stop - self.op);
            self.literals(n)?;
            if self.op == stop || self.input.is_exhausted() {
                return Flow::Stop;
            }
            return Flow::Continue;
        }

        let last_sequence = match self.bound {
            Bound::ByInput => {
                lit_end.saturating_add(MFLIMIT) > end
                    || in_end.saturating_add(MIN_INPUT_AFTER_LITERALS) > self.input.len()
            }
            Bound::ByOutput => lit_end.saturating_add(COPYLENGTH) > end,
        };

        if last_sequence {
            // necessarily the end of the block, due to the parsing restrictions
            match self.bound {
                Bound::ByInput => {
                    if in_end > self.input.len() {
                        throw!(Corruption::UnexpectedEnd);
                    }
                    if in_end != self.input.len() {
                        throw!(Corruption::TrailingInput);
                    }
                    if lit_end > end {
                        throw!(Corruption::OutputOverrun);
                    }
                }
                Bound::ByOutput => {
                    if lit_end != end {
                        throw!(Corruption::OutputSizeMismatch);
                    }
                }
            }
            self.literals(len)?;
            return Flow::Stop;
        }

        self.literals(len)?;
        Flow::Continue
    }

    /// Move `n` literal bytes from the input to the output cursor.
    #[throws(Corruption)]
    fn literals(&mut self, n: usize) {
        if n > self.buf.len() - self.op {
            throw!(Corruption::OutputOverrun);
        }
        let bytes = self.input.take(n)?;
        self.buf[self.op..][..n].copy_from_slice(bytes);
        self.op += n;
    }

    /// Figure out where a match at `offset` reads from.
    #[throws(Corruption)]
    fn resolve(&self, offset: usize) -> Source {
        if offset == 0 {
            throw!(Corruption::ZeroOffset);
        }
        if offset <= self.op {
            // inside the output, or inside the prefix that precedes it
            return Source::Window;
        }

        let back = offset - (self.op - self.start);
        if back > self.ext_dict.len() {
            throw!(Corruption::OffsetOutOfWindow);
        }
        debug_assert!(back <= WINDOW_SIZE);
        Source::Dictionary(back)
    }

    #[throws(Corruption)]
    fn copy_match(&mut self, source: Source, offset: usize, len: usize) -> Flow {
        let match_end = self.op.checked_add(len).ok_or(Corruption::LengthOverflow)?;

        if let Some(stop) = self.stop {
            // no tail rule here: the block may go on beyond what we decode
            let n = cmp::min(len, stop - self.op);
            self.duplicate(source, offset, n);
            return if match_end >= stop { Flow::Stop } else { Flow::Continue };
        }

        if match_end.saturating_add(LASTLITERALS) > self.buf.len() {
            throw!(Corruption::MatchInTail);
        }
        self.duplicate(source, offset, len);
        Flow::Continue
    }

    /// Append `len` bytes of a match. The caller has checked that they fit.
    fn duplicate(&mut self, source: Source, offset: usize, len: usize) {
        match source {
            Source::Window => copy_overlapping(self.buf, self.op, offset, len),
            Source::Dictionary(back) => {
                let from_dict = cmp::min(back, len);
                let dict_start = self.ext_dict.len() - back;
                self.buf[self.op..][..from_dict].copy_from_slice(&self.ext_dict[dict_start..][..from_dict]);

                let remaining = len - from_dict;
                if remaining != 0 {
                    // the match straddles the dictionary end and continues at the start of the output;
                    // the distance stays `offset` because our cursor moved forward by what we took from the dictionary
                    copy_overlapping(self.buf, self.op + from_dict, offset, remaining);
                }
            }
        }
        self.op += len;
    }
}

/// Decompress a full block, checking every access against the input.
///
/// `output.len()` is an upper bound for the decompressed size. Returns the number of bytes written.
#[throws(DecodeError)]
pub fn decompress_safe(input: &[u8], output: &mut [u8]) -> usize {
    DecompressionSettings::default().decompress(input, output)?.written
}

/// Decompress only the first `target` bytes of a block (or less if the block is shorter).
///
/// Returns the number of bytes written, which is `min(target, output.len(), decompressed size)`.
#[throws(DecodeError)]
pub fn decompress_safe_partial(input: &[u8], output: &mut [u8], target: usize) -> usize {
    DecompressionSettings::default().partial(target).decompress(input, output)?.written
}

/// Decompress a full block whose matches may reach into `dict`, a separate buffer that
/// logically precedes `output`.
#[throws(DecodeError)]
pub fn decompress_safe_using_dict(input: &[u8], output: &mut [u8], dict: &[u8]) -> usize {
    DecompressionSettings::default().external_dictionary(dict).decompress(input, output)?.written
}

/// Decompress a full block into `buffer[prefix_len..]`, using `buffer[..prefix_len]` as the data
/// that came right before the block.
#[throws(DecodeError)]
pub fn decompress_safe_with_prefix(input: &[u8], buffer: &mut [u8], prefix_len: usize) -> usize {
    DecompressionSettings::default().prefix(prefix_len).decompress(input, buffer)?.written
}

/// Decompress a block that is known to decode to exactly `output.len()` bytes.
///
/// The end of the compressed data is found while decoding; returns how many input bytes made up the block.
#[throws(DecodeError)]
pub fn decompress_fast(input: &[u8], output: &mut [u8]) -> usize {
    DecompressionSettings::default().trust_input(true).decompress(input, output)?.read
}

/// Like [`decompress_fast`], with `buffer[..prefix_len]` holding the preceding data.
#[throws(DecodeError)]
pub fn decompress_fast_with_prefix(input: &[u8], buffer: &mut [u8], prefix_len: usize) -> usize {
    DecompressionSettings::default().trust_input(true).prefix(prefix_len).decompress(input, buffer)?.read
}

/// Like [`decompress_fast`], with an external dictionary.
#[throws(DecodeError)]
pub fn decompress_fast_using_dict(input: &[u8], output: &mut [u8], dict: &[u8]) -> usize {
    DecompressionSettings::default().trust_input(true).external_dictionary(dict).decompress(input, output)?.read
}

/// Decompress all bytes of `input`, which must decode to exactly `uncompressed_size` bytes.
#[throws(DecodeError)]
pub fn decompress(input: &[u8], uncompressed_size: usize) -> Vec<u8> {
    let mut vec = vec![0; uncompressed_size];
    let read = decompress_fast(input, &mut vec)?;
    if read != input.len() {
        throw!(DecodeError::CorruptStream { position: read, reason: Corruption::TrailingInput });
    }
    vec
}

/// Decompress all bytes of `input` into a vector of at most `max_size` bytes.
#[throws(DecodeError)]
pub fn decompress_bounded(input: &[u8], max_size: usize) -> Vec<u8> {
    let mut vec = vec![0; max_size];
    let written = decompress_safe(input, &mut vec)?;
    vec.truncate(written);
    vec
}

#[cfg(test)]
mod test {
    use super::*;

    /// "a", then eight more "a" at offset 1, then five literals.
    const RUN: &[u8] = &[0x14, b'a', 1, 0, 0x50, b'b', b'c', b'd', b'e', b'f'];
    const RUN_DECODED: &[u8] = b"aaaaaaaaabcdef";

    fn corruption<T: std::fmt::Debug>(r: Result<T, DecodeError>) -> Corruption {
        r.unwrap_err().reason()
    }

    #[test]
    fn aaaaaaaaaaa_lots_of_aaaaaaaaa() {
        assert_eq!(decompress(RUN, RUN_DECODED.len()).unwrap(), RUN_DECODED);
        assert_eq!(decompress_bounded(RUN, 100).unwrap(), RUN_DECODED);
    }

    #[test]
    fn multiple_repeated_blocks() {
        let input = [
            0x11, b'a', 1, 0,
            0x22, b'b', b'c', 2, 0,
            0x60, b'0', b'1', b'2', b'3', b'4', b'5',
        ];
        let expected = b"aaaaaabcbcbcbc012345";
        assert_eq!(decompress(&input, expected.len()).unwrap(), expected);
        assert_eq!(decompress_bounded(&input, 64).unwrap(), expected);
    }

    #[test]
    fn all_literal() {
        assert_eq!(decompress(&[0x30, b'a', b'4', b'9'], 3).unwrap(), b"a49");
        assert_eq!(decompress_bounded(&[0x30, b'a', b'4', b'9'], 3).unwrap(), b"a49");
    }

    #[test]
    fn long_literal_run() {
        let mut input = vec![0xF0, 0xFF, 0x02];
        input.extend((0..15 + 255 + 2).map(|i| i as u8));
        let out = decompress_bounded(&input, 1000).unwrap();
        assert_eq!(out.len(), 272);
        assert_eq!(out[271], 15);
    }

    #[test]
    fn offset_oob() {
        let mut input = vec![0x10, b'a', 2, 0, 0x50];
        input.extend_from_slice(b"vwxyz");
        assert_eq!(corruption(decompress_bounded(&input, 100)), Corruption::OffsetOutOfWindow);
        input[2] = 0;
        assert_eq!(corruption(decompress_bounded(&input, 100)), Corruption::ZeroOffset);
    }

    #[test]
    fn match_at_the_very_end() {
        // perfectly decodable, but the block may not end with a match
        let input = [0x14, b'a', 1, 0];
        assert!(decompress_bounded(&input, 100).is_err());
        assert!(decompress(&input, 9).is_err());
    }

    #[test]
    fn truncated() {
        let cut = &RUN[..RUN.len() - 1];
        // without room for another sequence the first literal run has to be the last, but the input goes on
        assert_eq!(corruption(decompress_bounded(cut, 100)), Corruption::TrailingInput);
        assert_eq!(corruption(decompress(cut, RUN_DECODED.len())), Corruption::UnexpectedEnd);

        for len in 1..RUN.len() {
            assert!(decompress(&RUN[..len], RUN_DECODED.len()).is_err(), "len {}", len);
            // a token plus its literals is a complete block of its own
            if len != 2 {
                assert!(decompress_bounded(&RUN[..len], 100).is_err(), "len {}", len);
            }
        }
    }

    #[test]
    fn error_reports_position() {
        let e = decompress_bounded(&[0x50, b'a', b'b'], 100).unwrap_err();
        assert_eq!(e, DecodeError::CorruptStream { position: 1, reason: Corruption::UnexpectedEnd });
        assert!(e.to_string().contains("input offset 1"));
    }

    #[test]
    fn overrun_is_reported_before_the_literals() {
        let settings = DecompressionSettings::default();
        let mut out = [0u8; 2];
        let mut decoder = Decoder::new(&settings, b"abc", &mut out);
        assert_eq!(decoder.literals(3), Err(Corruption::OutputOverrun));
        assert_eq!(decoder.input.position(), 0);
        assert_eq!(decoder.op, 0);
    }

    #[test]
    fn match_extension_needs_the_last_literals_behind_it() {
        // literal "a", offset 1, one match length extension byte, then the start of the final literals
        let mut input = vec![0x1F, b'a', 1, 0, 0x00, b'x', b'x', b'x', b'x'];
        let mut out = [0u8; 64];
        assert_eq!(corruption(decompress_safe_partial(&input, &mut out, 5)), Corruption::UnexpectedEnd);

        input.push(b'x');
        assert_eq!(decompress_safe_partial(&input, &mut out, 5).unwrap(), 5);
        assert_eq!(&out[..5], b"aaaaa");
    }

    #[test]
    fn output_too_small() {
        let mut out = [0u8; 2];
        assert_eq!(corruption(decompress_safe(&[0x30, b'a', b'4', b'9'], &mut out)), Corruption::OutputOverrun);
        assert_eq!(corruption(decompress_fast(&[0x30, b'a', b'4', b'9'], &mut out)), Corruption::OutputSizeMismatch);

        let mut out = [0u8; 13];
        assert_eq!(corruption(decompress_safe(RUN, &mut out)), Corruption::MatchInTail);
    }

    #[test]
    fn fast_reports_bytes_read() {
        let mut input = RUN.to_vec();
        input.extend_from_slice(b"garbage");
        let mut out = [0u8; 14];
        assert_eq!(decompress_fast(&input, &mut out).unwrap(), RUN.len());
        assert_eq!(&out, RUN_DECODED);
        assert_eq!(corruption(decompress(&input, 14)), Corruption::TrailingInput);
        assert_eq!(corruption(decompress_safe(&input, &mut out)), Corruption::TrailingInput);
    }

    #[test]
    fn empty_output() {
        let mut out = [0u8; 0];
        assert_eq!(decompress_safe(&[], &mut out).unwrap(), 0);
        assert_eq!(decompress_safe(&[0x00], &mut out).unwrap(), 0);
        assert_eq!(corruption(decompress_safe(&[0x10, b'a'], &mut out)), Corruption::OutputOverrun);
        assert_eq!(corruption(decompress_safe(&[0x00, 0x00], &mut out)), Corruption::TrailingInput);
        assert_eq!(decompress_fast(&[0x00, 0x42], &mut out).unwrap(), 1);
    }

    #[test]
    fn empty_input_needs_empty_output() {
        let mut out = [0u8; 4];
        assert_eq!(corruption(decompress_safe(&[], &mut out)), Corruption::UnexpectedEnd);
    }

    #[test]
    fn partial_stops_inside_match() {
        let mut out = [0u8; 14];
        for target in 0..=14 {
            let n = decompress_safe_partial(RUN, &mut out, target).unwrap();
            assert_eq!(n, target);
            assert_eq!(&out[..n], &RUN_DECODED[..n]);
        }
        assert_eq!(decompress_safe_partial(RUN, &mut out, 1000).unwrap(), 14);

        // the match ends closer than five bytes to the end of a short buffer, which is fine when decoding partially
        let mut short = [0u8; 13];
        assert_eq!(decompress_safe_partial(RUN, &mut short, 13).unwrap(), 13);
        assert_eq!(&short[..], &RUN_DECODED[..13]);
    }

    #[test]
    fn partial_reads_only_what_it_needs() {
        // a single literal is enough, the garbage behind it is never looked at
        let input = [0x14, b'a', 0, 0];
        let mut out = [0u8; 14];
        assert_eq!(decompress_safe_partial(&input, &mut out, 1).unwrap(), 1);
        assert_eq!(out[0], b'a');
    }

    #[test]
    fn external_dictionary_straddle() {
        // offset 3 reaches two bytes into "xy", then runs on into the output it produces itself
        let dict = b"wxy";
        let input = [0x1F, b'z', 3, 0, 0x02, 0x50, b'1', b'2', b'3', b'4', b'5'];
        let mut out = [0u8; 1 + 21 + 5];
        let n = decompress_safe_using_dict(&input, &mut out, dict).unwrap();
        assert_eq!(n, out.len());
        assert_eq!(&out[..], &b"zxyzxyzxyzxyzxyzxyzxyz12345"[..]);
    }

    #[test]
    fn prefix_dictionary() {
        let mut buffer = [0u8; 7 + 14 + 5];
        buffer[..7].copy_from_slice(b"hello, ");
        let input = [0x0A, 7, 0, 0x50, b'w', b'o', b'r', b'l', b'd'];
        let n = decompress_safe_with_prefix(&input, &mut buffer, 7).unwrap();
        assert_eq!(n, 19);
        assert_eq!(&buffer[..], &b"hello, hello, hello, world"[..]);
    }
}
