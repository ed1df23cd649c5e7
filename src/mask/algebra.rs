// src/mask/algebra.rs

//! Slicing, concatenation and lane-pair folds over `BitMask`.
//!
//! The width arithmetic (`OFFSET + LEN <= N`, `R == N + M`, ...) cannot be
//! written in a stable const-generic signature, so each operation names the
//! output width explicitly and a bounds type rejects mismatches when the
//! call is monomorphized.

use super::{BitMask, MAX_WORDS};
use crate::bits::{self, low_bits, words_for, Word, WORD_BITS};

struct ExtractBounds<const N: usize, const OFFSET: usize, const LEN: usize>;

impl<const N: usize, const OFFSET: usize, const LEN: usize> ExtractBounds<N, OFFSET, LEN> {
    const OK: () = assert!(LEN >= 1 && OFFSET + LEN <= N, "extract range exceeds the source mask");

    /// The slice tail needs no masking: it ends on a word boundary, or it
    /// ends at `N` of a source whose padding is already zero.
    const fn ends_clean(source_sanitized: bool) -> bool {
        (OFFSET + LEN) % WORD_BITS == 0 || (source_sanitized && OFFSET + LEN == N)
    }
}

struct ConcatBounds<const HIGH: usize, const LOW: usize, const OUT: usize>;

impl<const HIGH: usize, const LOW: usize, const OUT: usize> ConcatBounds<HIGH, LOW, OUT> {
    const OK: () = assert!(HIGH + LOW == OUT, "prepend output width must be N + M");
}

struct HalveBounds<const N: usize, const HALF: usize>;

impl<const N: usize, const HALF: usize> HalveBounds<N, HALF> {
    const OK: () = assert!(HALF * 2 == N, "neighbor folds produce exactly N / 2 lanes");
}

/// Copies `len` bits starting at bit `offset` of `src` into the low end of
/// a fresh word array. Source words past the one holding bit
/// `offset + len - 1` are never read; bits above `len` in the final output
/// word come only from that last source word.
fn slice_words(src: &[Word; MAX_WORDS], offset: usize, len: usize) -> [Word; MAX_WORDS] {
    let mut out = [0; MAX_WORDS];
    let last_src = (offset + len - 1) / WORD_BITS;
    let shift = offset % WORD_BITS;
    for (j, dst) in out.iter_mut().enumerate().take(words_for(len)) {
        let k = offset / WORD_BITS + j;
        let mut w = src[k] >> shift;
        if shift != 0 && k + 1 <= last_src {
            w |= src[k + 1] << (WORD_BITS - shift);
        }
        *dst = w;
    }
    out
}

/// ORs the low `len` bits region of `src` into `dst` starting at bit `at`.
fn or_words_at(dst: &mut [Word; MAX_WORDS], src: &[Word; MAX_WORDS], at: usize, len: usize) {
    let shift = at % WORD_BITS;
    for (i, w) in src.iter().enumerate().take(words_for(len)) {
        let k = at / WORD_BITS + i;
        if k >= MAX_WORDS {
            break;
        }
        dst[k] |= w << shift;
        if shift != 0 && k + 1 < MAX_WORDS {
            dst[k + 1] |= w >> (WORD_BITS - shift);
        }
    }
}

impl<const N: usize, const SANITIZED: bool> BitMask<N, SANITIZED> {
    /// Zeroes backing words past `WORDS`.
    #[inline(always)]
    fn clear_unused_words(words: &mut [Word; MAX_WORDS]) {
        for w in words.iter_mut().skip(Self::WORDS) {
            *w = 0;
        }
    }

    /// Lanes `OFFSET..OFFSET + LEN` as a new mask.
    ///
    /// The result may carry source bits above `LEN` in its final word; use
    /// `extract_sanitized` when the caller needs them zero.
    pub fn extract<const OFFSET: usize, const LEN: usize>(&self) -> BitMask<LEN, false> {
        let () = ExtractBounds::<N, OFFSET, LEN>::OK;
        BitMask::from_raw(slice_words(&self.words, OFFSET, LEN))
    }

    /// Lanes `OFFSET..OFFSET + LEN`, padding cleared.
    ///
    /// Skips the masking step when the slice statically ends clean.
    pub fn extract_sanitized<const OFFSET: usize, const LEN: usize>(&self) -> BitMask<LEN, true> {
        let raw = self.extract::<OFFSET, LEN>();
        if ExtractBounds::<N, OFFSET, LEN>::ends_clean(SANITIZED) {
            BitMask::from_raw(*raw.raw())
        } else {
            raw.sanitize()
        }
    }

    /// Concatenates `lsb` below `self`: lanes `0..M` come from `lsb`,
    /// lanes `M..M + N` from `self`. `R` must equal `N + M`.
    pub fn prepend<const M: usize, const R: usize>(&self, lsb: BitMask<M, true>) -> BitMask<R, SANITIZED> {
        let () = ConcatBounds::<N, M, R>::OK;
        let mut words = *lsb.raw();
        or_words_at(&mut words, &self.words, M, N);
        BitMask::<R, SANITIZED>::clear_unused_words(&mut words);
        BitMask::from_raw(words)
    }

    /// Lane `i` of the result is `self[2i] & self[2i + 1]`.
    pub fn and_neighbors<const HALF: usize>(&self) -> BitMask<HALF, true> {
        let () = HalveBounds::<N, HALF>::OK;
        self.fold_neighbors(|w| w & (w >> 1))
    }

    /// Lane `i` of the result is `self[2i] | self[2i + 1]`.
    pub fn or_neighbors<const HALF: usize>(&self) -> BitMask<HALF, true> {
        let () = HalveBounds::<N, HALF>::OK;
        self.fold_neighbors(|w| w | (w >> 1))
    }

    fn fold_neighbors<const HALF: usize>(&self, pair: impl Fn(Word) -> Word) -> BitMask<HALF, true> {
        let clean = self.sanitize();
        let src = clean.raw();
        let mut out = [0; MAX_WORDS];
        for (j, dst) in out.iter_mut().enumerate().take(words_for(HALF)) {
            let lo = bits::compress_even(pair(src[2 * j])) as Word;
            let hi = if 2 * j + 1 < MAX_WORDS {
                bits::compress_even(pair(src[2 * j + 1])) as Word
            } else {
                0
            };
            *dst = lo | (hi << 32);
        }
        BitMask::from_raw(out)
    }

    /// Each lane `i` becomes lanes `2i` and `2i + 1` of the result.
    /// `DOUBLE` must equal `2 * N`.
    pub fn dup_every_element<const DOUBLE: usize>(&self) -> BitMask<DOUBLE, SANITIZED> {
        let () = HalveBounds::<DOUBLE, N>::OK;
        let mut out = [0; MAX_WORDS];
        for (j, dst) in out.iter_mut().enumerate().take(words_for(DOUBLE)) {
            let half = (self.words[j / 2] >> (32 * (j % 2))) as u32;
            *dst = bits::spread_dup(half);
        }
        BitMask::from_raw(out)
    }

    /// Moves every lane `k` places toward lane 0; the top `k` lanes become false.
    pub fn shift_down(&self, k: usize) -> Self {
        crate::precondition!(k < N, "shift of {} lanes on BitMask<{}>", k, N);
        let clean = self.sanitize();
        let mut words = [0; MAX_WORDS];
        if k < N {
            words = slice_words(clean.raw(), k, N - k);
        }
        Self::clear_unused_words(&mut words);
        Self::from_raw(words)
    }

    /// Moves every lane `k` places away from lane 0; the low `k` lanes become false.
    pub fn shift_up(&self, k: usize) -> Self {
        crate::precondition!(k < N, "shift of {} lanes on BitMask<{}>", k, N);
        let mut words = [0; MAX_WORDS];
        if k < N {
            or_words_at(&mut words, &self.words, k, N - k);
        }
        Self::clear_unused_words(&mut words);
        let mut shifted = Self::from_raw(words);
        if SANITIZED {
            shifted.clear_padding();
        }
        shifted
    }

    /// Overwrites lanes `offset..offset + len` with the low `len` bits of
    /// `value`. Used to splice a chunk's native mask into a wide mask.
    pub fn insert_bits(&mut self, offset: usize, len: usize, value: Word) {
        crate::precondition!(
            len <= WORD_BITS && offset + len <= N,
            "insert of {} lanes at {} into BitMask<{}>",
            len,
            offset,
            N
        );
        let value = value & low_bits(len);
        let k = offset / WORD_BITS;
        let shift = offset % WORD_BITS;
        self.words[k] = (self.words[k] & !(low_bits(len) << shift)) | (value << shift);
        if shift != 0 && shift + len > WORD_BITS && k + 1 < MAX_WORDS {
            let spill = shift + len - WORD_BITS;
            self.words[k + 1] =
                (self.words[k + 1] & !low_bits(spill)) | (value >> (WORD_BITS - shift));
        }
    }

    /// Reads lanes `offset..offset + len` (`len <= 64`) as one word.
    pub fn bits_at(&self, offset: usize, len: usize) -> Word {
        crate::precondition!(
            len >= 1 && len <= WORD_BITS && offset + len <= N,
            "read of {} lanes at {} from BitMask<{}>",
            len,
            offset,
            N
        );
        slice_words(&self.words, offset, len)[0] & low_bits(len)
    }
}
