//! Forward copies of back-references inside the output buffer.

use std::cmp;

/// Offsets below the machine word size are expanded through a small pattern buffer.
const WORD_SIZE: usize = 8;
const PATTERN_SIZE: usize = 16;

/// For an offset `o < WORD_SIZE`, the largest multiple of `o` that fits into the pattern buffer.
static PATTERN_STEP: [usize; WORD_SIZE] = [0, 16, 16, 15, 16, 15, 12, 14];

/// Copy `len` bytes starting `offset` bytes before `dst` to `dst`.
///
/// The result is always the same as copying one byte at a time from front to back,
/// so a match may read bytes that the very same match has just written.
/// The caller has to make sure that `offset` is non-zero and that both ranges lie inside `buf`.
pub(super) fn copy_overlapping(buf: &mut [u8], dst: usize, offset: usize, len: usize) {
    debug_assert!(offset != 0 && offset <= dst && dst + len <= buf.len());
    let src = dst - offset;

    match offset {
        // fastpath: nonoverlapping
        o if len <= o => buf.copy_within(src..src + len, dst),

        // fastpath: memset if we repeat the same byte forever
        1 => {
            let b = buf[src];
            for x in &mut buf[dst..dst + len] {
                *x = b;
            }
        }

        o if o < WORD_SIZE => {
            // fastpath: overlapping but small
            // build a pattern of whole periods so each iteration handles up to 16 bytes instead of one
            let step = PATTERN_STEP[o];
            let mut pattern = [0u8; PATTERN_SIZE];
            for chunk in pattern[..step].chunks_mut(o) {
                chunk.copy_from_slice(&buf[src..src + o]);
            }
            for target in buf[dst..dst + len].chunks_mut(step) {
                target.copy_from_slice(&pattern[..target.len()]);
            }
        }

        _ => {
            // chunks of at most `offset` bytes never overlap their own source
            let mut copied = 0;
            while copied < len {
                let n = cmp::min(offset, len - copied);
                buf.copy_within(src + copied..src + copied + n, dst + copied);
                copied += n;
            }
        }
    }
}
