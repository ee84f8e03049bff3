//! Reading tokens and the length fields that hang off them.

use byteorder::{ByteOrder, LE};
use fehler::{throw, throws};

use super::Corruption;

/// A nibble with this value announces extension bytes.
const NIBBLE_MAX: u8 = 0xF;

/// The control byte at the start of every sequence.
///
/// The high nibble encodes the number of literals, the low nibble the match length
/// (minus the four byte minimum).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(super) struct Token(pub u8);

impl Token {
    pub fn literals(self) -> u8 { self.0 >> 4 }
    pub fn match_code(self) -> u8 { self.0 & NIBBLE_MAX }
}

/// Bounds-checked read cursor over a compressed block.
#[derive(Debug)]
pub(super) struct Input<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Input<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Input { buf, pos: 0 }
    }

    pub fn position(&self) -> usize { self.pos }
    pub fn len(&self) -> usize { self.buf.len() }
    pub fn remaining(&self) -> usize { self.buf.len() - self.pos }
    pub fn is_exhausted(&self) -> bool { self.pos == self.buf.len() }

    #[throws(Corruption)]
    pub fn read_u8(&mut self) -> u8 {
        match self.buf.get(self.pos) {
            Some(&b) => {
                self.pos += 1;
                b
            }
            None => throw!(Corruption::UnexpectedEnd),
        }
    }

    #[throws(Corruption)]
    pub fn read_u16_le(&mut self) -> u16 {
        LE::read_u16(self.take(2)?)
    }

    /// Hands out the next `n` bytes and moves past them.
    #[throws(Corruption)]
    pub fn take(&mut self, n: usize) -> &'a [u8] {
        if n > self.remaining() {
            throw!(Corruption::UnexpectedEnd);
        }
        let bytes = &self.buf[self.pos..][..n];
        self.pos += n;
        bytes
    }
}

/// This is how LZ4 encodes varints.
/// Just keep reading and adding while it's all F.
///
/// After reading an extension byte, at least `reserve` bytes must still be left in the input.
#[throws(Corruption)]
pub(super) fn read_lsic(initial: u8, input: &mut Input<'_>, reserve: usize) -> usize {
    let mut value = initial as usize;
    if initial == NIBBLE_MAX {
        loop {
            if input.remaining() <= reserve {
                throw!(Corruption::UnexpectedEnd);
            }
            let more = input.read_u8()?;
            value = value.checked_add(more as usize).ok_or(Corruption::LengthOverflow)?;
            if more != 0xff {
                break;
            }
        }
    }
    value
}
