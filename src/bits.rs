// src/bits.rs

//! Word-level bit primitives used by the mask engine.
//!
//! Every primitive has a portable bit-trick implementation that is always
//! compiled, and a hardware path. Which one the free functions use is
//! decided by the `HARDWARE_*` capability constants, not by the caller.

/// Machine word backing `BitMask`.
pub type Word = u64;

/// Number of bits per `Word`.
pub const WORD_BITS: usize = Word::BITS as usize;

/// Words needed to hold `bits` bits.
#[inline(always)]
pub const fn words_for(bits: usize) -> usize {
    (bits + WORD_BITS - 1) / WORD_BITS
}

/// Mask with the low `bits` bits set (`bits` may be 0..=64).
#[inline(always)]
pub const fn low_bits(bits: usize) -> Word {
    if bits >= WORD_BITS {
        !0
    } else {
        (1 << bits) - 1
    }
}

const EVEN_BITS: Word = 0x5555_5555_5555_5555;

/// Target has a population-count instruction.
pub const HARDWARE_POPCNT: bool = cfg!(any(
    all(target_arch = "x86_64", target_feature = "popcnt"),
    target_arch = "aarch64"
));

/// Target has native leading/trailing zero counts.
pub const HARDWARE_ZERO_COUNT: bool = cfg!(any(
    all(target_arch = "x86_64", target_feature = "bmi1", target_feature = "lzcnt"),
    target_arch = "aarch64"
));

/// Target has BMI2 parallel bit extract/deposit.
pub const HARDWARE_PEXT: bool = cfg!(all(target_arch = "x86_64", target_feature = "bmi2"));

/// The bit primitives, implemented once per strategy.
pub trait BitOps {
    fn popcount(w: Word) -> u32;
    fn trailing_zeros(w: Word) -> u32;
    fn leading_zeros(w: Word) -> u32;
    /// Gathers bits 0, 2, 4, ... of `w` into the low 32 bits.
    fn compress_even(w: Word) -> u32;
    /// Duplicates every bit of `w`: bit i lands on bits 2i and 2i+1.
    fn spread_dup(w: u32) -> Word;
}

// ============================================================================
// Portable
// ============================================================================

/// Pure bit-trick implementations; correct on every target.
#[derive(Debug, Clone, Copy, Default)]
pub struct Portable;

impl BitOps for Portable {
    #[inline(always)]
    fn popcount(w: Word) -> u32 {
        let mut x = w;
        x -= (x >> 1) & EVEN_BITS;
        x = (x & 0x3333_3333_3333_3333) + ((x >> 2) & 0x3333_3333_3333_3333);
        x = (x + (x >> 4)) & 0x0F0F_0F0F_0F0F_0F0F;
        (x.wrapping_mul(0x0101_0101_0101_0101) >> 56) as u32
    }

    #[inline(always)]
    fn trailing_zeros(w: Word) -> u32 {
        if w == 0 {
            return WORD_BITS as u32;
        }
        Self::popcount((w & w.wrapping_neg()) - 1)
    }

    #[inline(always)]
    fn leading_zeros(w: Word) -> u32 {
        let mut x = w;
        x |= x >> 1;
        x |= x >> 2;
        x |= x >> 4;
        x |= x >> 8;
        x |= x >> 16;
        x |= x >> 32;
        WORD_BITS as u32 - Self::popcount(x)
    }

    #[inline(always)]
    fn compress_even(w: Word) -> u32 {
        let mut x = w & EVEN_BITS;
        x = (x | (x >> 1)) & 0x3333_3333_3333_3333;
        x = (x | (x >> 2)) & 0x0F0F_0F0F_0F0F_0F0F;
        x = (x | (x >> 4)) & 0x00FF_00FF_00FF_00FF;
        x = (x | (x >> 8)) & 0x0000_FFFF_0000_FFFF;
        x = (x | (x >> 16)) & 0x0000_0000_FFFF_FFFF;
        x as u32
    }

    #[inline(always)]
    fn spread_dup(w: u32) -> Word {
        let mut x = w as Word;
        x = (x | (x << 16)) & 0x0000_FFFF_0000_FFFF;
        x = (x | (x << 8)) & 0x00FF_00FF_00FF_00FF;
        x = (x | (x << 4)) & 0x0F0F_0F0F_0F0F_0F0F;
        x = (x | (x << 2)) & 0x3333_3333_3333_3333;
        x = (x | (x << 1)) & EVEN_BITS;
        x | (x << 1)
    }
}

// ============================================================================
// Hardware
// ============================================================================

/// Instruction-backed implementations.
///
/// Where the target lacks the instruction these still produce correct
/// results (the compiler lowers the std methods to a software sequence, and
/// the BMI2 paths defer to `Portable`).
#[derive(Debug, Clone, Copy, Default)]
pub struct Hardware;

impl BitOps for Hardware {
    #[inline(always)]
    fn popcount(w: Word) -> u32 {
        w.count_ones()
    }

    #[inline(always)]
    fn trailing_zeros(w: Word) -> u32 {
        w.trailing_zeros()
    }

    #[inline(always)]
    fn leading_zeros(w: Word) -> u32 {
        w.leading_zeros()
    }

    #[inline(always)]
    fn compress_even(w: Word) -> u32 {
        #[cfg(all(target_arch = "x86_64", target_feature = "bmi2"))]
        {
            // SAFETY: the enclosing cfg guarantees BMI2 is enabled for this build.
            unsafe { core::arch::x86_64::_pext_u64(w, EVEN_BITS) as u32 }
        }
        #[cfg(not(all(target_arch = "x86_64", target_feature = "bmi2")))]
        {
            Portable::compress_even(w)
        }
    }

    #[inline(always)]
    fn spread_dup(w: u32) -> Word {
        #[cfg(all(target_arch = "x86_64", target_feature = "bmi2"))]
        {
            // SAFETY: the enclosing cfg guarantees BMI2 is enabled for this build.
            let x = unsafe { core::arch::x86_64::_pdep_u64(w as u64, EVEN_BITS) };
            x | (x << 1)
        }
        #[cfg(not(all(target_arch = "x86_64", target_feature = "bmi2")))]
        {
            Portable::spread_dup(w)
        }
    }
}

// ============================================================================
// Dispatching entry points
// ============================================================================

#[inline(always)]
pub fn popcount(w: Word) -> u32 {
    if HARDWARE_POPCNT {
        Hardware::popcount(w)
    } else {
        Portable::popcount(w)
    }
}

/// Index of the lowest set bit; 64 for zero.
#[inline(always)]
pub fn trailing_zeros(w: Word) -> u32 {
    if HARDWARE_ZERO_COUNT {
        Hardware::trailing_zeros(w)
    } else {
        Portable::trailing_zeros(w)
    }
}

#[inline(always)]
pub fn leading_zeros(w: Word) -> u32 {
    if HARDWARE_ZERO_COUNT {
        Hardware::leading_zeros(w)
    } else {
        Portable::leading_zeros(w)
    }
}

#[inline(always)]
pub fn compress_even(w: Word) -> u32 {
    if HARDWARE_PEXT {
        Hardware::compress_even(w)
    } else {
        Portable::compress_even(w)
    }
}

#[inline(always)]
pub fn spread_dup(w: u32) -> Word {
    if HARDWARE_PEXT {
        Hardware::spread_dup(w)
    } else {
        Portable::spread_dup(w)
    }
}
