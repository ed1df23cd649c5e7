// src/mask/mod.rs

//! # Fixed-width lane masks
//!
//! `BitMask<N, SANITIZED>` holds one validity bit per logical lane, packed
//! into `u64` words. Only the first `ceil(N / 64)` words carry lanes; the
//! rest of the backing array is always zero.
//!
//! ## Sanitized vs. unsanitized
//!
//! Bits at index `>= N` in the final word are padding. A sanitized mask
//! (`SANITIZED = true`, the default) guarantees they are zero. Operations
//! such as `!` or `from_bits` on an unsanitized mask may leave garbage
//! there; `sanitize()` clears it and every counting query sanitizes first.
//!
//! ```ignore
//! let m = BitMask::<8>::from_bits(0b1011_0101);
//! assert_eq!(m.count(), 5);
//! let inv = !m;              // BitMask<8, false>: bits 8..64 are now set
//! assert_eq!(inv.count(), 3); // counting ignores padding
//! ```
//!
//! Widths outside `1..=MAX_LANES` fail when the mask type is instantiated.

mod algebra;
mod iter;


pub use iter::SetBits;

use core::fmt;
use core::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Not};

use crate::bits::{self, low_bits, words_for, Word, WORD_BITS};

/// Widest mask (and widest value) the crate supports.
pub const MAX_LANES: usize = 256;

/// Backing words for the widest mask.
pub const MAX_WORDS: usize = words_for(MAX_LANES);

/// Widest native chunk in lanes, so one chunk's mask bits fit a word.
pub const MAX_CHUNK_LANES: usize = WORD_BITS;

/// A chunk-level hardware mask that can be converted to lane bits.
///
/// Implemented by the leaf per-chunk providers; a chunk has at most
/// [`MAX_CHUNK_LANES`] lanes so its bits always fit one word.
pub trait NativeMask {
    /// Lanes covered by this native mask.
    fn lanes(&self) -> usize;

    /// Lane `i` maps to bit `i`. Bits at or above `lanes()` must be zero.
    fn to_bits(&self) -> Word;
}

/// Per-lane validity bits for `N` lanes.
#[derive(Clone, Copy)]
pub struct BitMask<const N: usize, const SANITIZED: bool = true> {
    words: [Word; MAX_WORDS],
}

impl<const N: usize, const SANITIZED: bool> BitMask<N, SANITIZED> {
    /// Number of logical lanes.
    pub const LANES: usize = N;

    /// Number of words carrying lanes.
    pub const WORDS: usize = words_for(N);

    const VALID_WIDTH: () = assert!(
        N >= 1 && N <= MAX_LANES,
        "BitMask width must be between 1 and MAX_LANES"
    );

    /// Lanes held by the final word.
    const TAIL_BITS: usize = N - (Self::WORDS - 1) * WORD_BITS;

    #[inline(always)]
    pub(crate) const fn from_raw(words: [Word; MAX_WORDS]) -> Self {
        let () = Self::VALID_WIDTH;
        Self { words }
    }

    #[inline(always)]
    pub(crate) fn raw(&self) -> &[Word; MAX_WORDS] {
        &self.words
    }

    /// All lanes false.
    #[inline(always)]
    pub const fn new() -> Self {
        Self::from_raw([0; MAX_WORDS])
    }

    /// All lanes set to `value`.
    pub fn splat(value: bool) -> Self {
        let mut words = [0; MAX_WORDS];
        if value {
            for w in words.iter_mut().take(Self::WORDS) {
                *w = !0;
            }
            words[Self::WORDS - 1] = low_bits(Self::TAIL_BITS);
        }
        Self::from_raw(words)
    }

    /// Lane `i` takes bit `i` of `bits`.
    ///
    /// A sanitized mask drops bits at or above `N`; an unsanitized one keeps
    /// them as padding garbage.
    pub fn from_bits(bits: Word) -> Self {
        let mut words = [0; MAX_WORDS];
        words[0] = if SANITIZED && N < WORD_BITS {
            bits & low_bits(N)
        } else {
            bits
        };
        Self::from_raw(words)
    }

    /// Lane `i` takes bit `i` of `bits`; bits at or above `N` are dropped
    /// whatever the sanitized tag.
    pub fn from_bits_masked(bits: Word) -> Self {
        let mut words = [0; MAX_WORDS];
        words[0] = bits & low_bits(N);
        Self::from_raw(words)
    }

    /// Builds from raw words, lowest lanes first. Missing words are zero,
    /// extra words are ignored.
    pub fn from_words(src: &[Word]) -> Self {
        let mut words = [0; MAX_WORDS];
        for (dst, w) in words.iter_mut().zip(src.iter()).take(Self::WORDS) {
            *dst = *w;
        }
        let mut mask = Self::from_raw(words);
        if SANITIZED {
            mask.clear_padding();
        }
        mask
    }

    /// Lane `i` takes `lanes[i]`; lanes past the slice are false.
    pub fn from_bools(lanes: &[bool]) -> Self {
        crate::precondition!(lanes.len() <= N, "{} bools for a {}-lane mask", lanes.len(), N);
        Self::from_fn(|i| lanes.get(i).copied().unwrap_or(false))
    }

    /// Lane `i` takes `f(i)`.
    pub fn from_fn(mut f: impl FnMut(usize) -> bool) -> Self {
        let mut words = [0; MAX_WORDS];
        for i in 0..N {
            if f(i) {
                words[i / WORD_BITS] |= 1 << (i % WORD_BITS);
            }
        }
        Self::from_raw(words)
    }

    /// Converts one native chunk mask covering exactly `N` lanes.
    pub fn from_native(native: &impl NativeMask) -> Self {
        crate::precondition!(
            native.lanes() == N,
            "native mask has {} lanes, expected {}",
            native.lanes(),
            N
        );
        Self::from_bits(native.to_bits())
    }

    // ========================================================================
    // Sanitization
    // ========================================================================

    #[inline(always)]
    fn clear_padding(&mut self) {
        self.words[Self::WORDS - 1] &= low_bits(Self::TAIL_BITS);
    }

    /// Zeroes all padding bits. Free when the mask is already sanitized.
    #[inline(always)]
    pub fn sanitize(self) -> BitMask<N, true> {
        let mut words = self.words;
        if !SANITIZED {
            words[Self::WORDS - 1] &= low_bits(Self::TAIL_BITS);
        }
        BitMask::from_raw(words)
    }

    /// Drops the sanitized guarantee without touching any bit.
    #[inline(always)]
    pub fn to_unsanitized(self) -> BitMask<N, false> {
        BitMask::from_raw(self.words)
    }

    /// True when the padding bits are actually zero right now.
    pub fn is_sanitized(&self) -> bool {
        SANITIZED || self.words[Self::WORDS - 1] & !low_bits(Self::TAIL_BITS) == 0
    }

    // ========================================================================
    // Lane access
    // ========================================================================

    #[inline(always)]
    pub fn get(&self, lane: usize) -> bool {
        crate::precondition!(lane < N, "lane {} out of range for BitMask<{}>", lane, N);
        (self.words[lane / WORD_BITS] >> (lane % WORD_BITS)) & 1 != 0
    }

    #[inline(always)]
    pub fn set(&mut self, lane: usize, value: bool) {
        crate::precondition!(lane < N, "lane {} out of range for BitMask<{}>", lane, N);
        let bit = 1 << (lane % WORD_BITS);
        if value {
            self.words[lane / WORD_BITS] |= bit;
        } else {
            self.words[lane / WORD_BITS] &= !bit;
        }
    }

    /// The words carrying lanes, lowest first. Padding bits are included
    /// as stored.
    #[inline(always)]
    pub fn words(&self) -> &[Word] {
        &self.words[..Self::WORDS]
    }

    /// The sanitized lane bits as one integer. Requires `N <= 64`.
    pub fn to_bits(&self) -> Word {
        crate::precondition!(N <= WORD_BITS, "BitMask<{}> does not fit one word", N);
        self.sanitize().words[0]
    }

    // ========================================================================
    // Reductions (sanitize first)
    // ========================================================================

    pub fn count(&self) -> usize {
        let clean = self.sanitize();
        clean
            .words()
            .iter()
            .map(|w| bits::popcount(*w) as usize)
            .sum()
    }

    pub fn all(&self) -> bool {
        let clean = self.sanitize();
        let full = clean.words[..Self::WORDS - 1].iter().all(|w| *w == !0);
        full && clean.words[Self::WORDS - 1] == low_bits(Self::TAIL_BITS)
    }

    pub fn any(&self) -> bool {
        self.sanitize().words().iter().any(|w| *w != 0)
    }

    pub fn none(&self) -> bool {
        !self.any()
    }

    /// Lowest set lane, if any.
    pub fn first_set(&self) -> Option<usize> {
        let clean = self.sanitize();
        clean
            .words()
            .iter()
            .enumerate()
            .find(|(_, w)| **w != 0)
            .map(|(i, w)| i * WORD_BITS + bits::trailing_zeros(*w) as usize)
    }

    /// Highest set lane, if any.
    pub fn last_set(&self) -> Option<usize> {
        let clean = self.sanitize();
        clean
            .words()
            .iter()
            .enumerate()
            .rev()
            .find(|(_, w)| **w != 0)
            .map(|(i, w)| i * WORD_BITS + (WORD_BITS - 1 - bits::leading_zeros(*w) as usize))
    }

    /// Lowest set lane. At least one lane must be set.
    pub fn reduce_min_index(&self) -> usize {
        let first = self.first_set();
        crate::precondition!(first.is_some(), "reduce_min_index on an empty mask");
        first.unwrap_or(N)
    }

    /// Highest set lane. At least one lane must be set.
    pub fn reduce_max_index(&self) -> usize {
        let last = self.last_set();
        crate::precondition!(last.is_some(), "reduce_max_index on an empty mask");
        last.unwrap_or(N)
    }

    /// Ascending iterator over set lanes.
    pub fn iter_set(&self) -> SetBits {
        SetBits::new(self.sanitize().words, Self::WORDS)
    }

    /// Calls `f` with each set lane, lowest first.
    pub fn for_each_set_bit(&self, mut f: impl FnMut(usize)) {
        for lane in self.iter_set() {
            f(lane);
        }
    }
}

impl<const N: usize, const SANITIZED: bool> Default for BitMask<N, SANITIZED> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize, const A: bool, const B: bool> PartialEq<BitMask<N, B>> for BitMask<N, A> {
    fn eq(&self, other: &BitMask<N, B>) -> bool {
        self.sanitize().words == other.sanitize().words
    }
}

impl<const N: usize> Eq for BitMask<N, true> {}

impl<const N: usize, const SANITIZED: bool> fmt::Debug for BitMask<N, SANITIZED> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitMask<{}>(", N)?;
        for lane in (0..N).rev() {
            let set = (self.words[lane / WORD_BITS] >> (lane % WORD_BITS)) & 1 != 0;
            f.write_str(if set { "1" } else { "0" })?;
        }
        f.write_str(")")
    }
}

// ============================================================================
// Boolean Operations
// ============================================================================

macro_rules! impl_mask_binop {
    ($trait:ident, $method:ident, $assign_trait:ident, $assign:ident, $op:tt) => {
        impl<const N: usize, const SANITIZED: bool> $trait for BitMask<N, SANITIZED> {
            type Output = Self;
            #[inline(always)]
            fn $method(mut self, rhs: Self) -> Self {
                for (a, b) in self.words.iter_mut().zip(rhs.words.iter()) {
                    *a = *a $op *b;
                }
                self
            }
        }

        impl<const N: usize, const SANITIZED: bool> $assign_trait for BitMask<N, SANITIZED> {
            #[inline(always)]
            fn $assign(&mut self, rhs: Self) {
                *self = *self $op rhs;
            }
        }
    };
}

impl_mask_binop!(BitAnd, bitand, BitAndAssign, bitand_assign, &);
impl_mask_binop!(BitOr, bitor, BitOrAssign, bitor_assign, |);
impl_mask_binop!(BitXor, bitxor, BitXorAssign, bitxor_assign, ^);

impl<const N: usize, const SANITIZED: bool> Not for BitMask<N, SANITIZED> {
    type Output = BitMask<N, false>;

    /// Flips every lane. Padding bits flip too, so the result is unsanitized.
    #[inline(always)]
    fn not(self) -> BitMask<N, false> {
        let mut words = [0; MAX_WORDS];
        for (dst, w) in words.iter_mut().zip(self.words.iter()).take(Self::WORDS) {
            *dst = !*w;
        }
        BitMask::from_raw(words)
    }
}
