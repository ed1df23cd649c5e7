// src/compose/native.rs

//! Leaf per-chunk operations.
//!
//! The composition layer only needs a handful of things from a single
//! native chunk: broadcast, elementwise ops, predicates that yield a native
//! mask, and an in-chunk reduction. `ChunkKernel` names that surface;
//! `PortableKernel` implements it lane by lane and produces the mask
//! representation the chunk's shape declares.

use core::fmt;

use crate::bits::{low_bits, Word};
use crate::catalog::{MaskRepr, NativeShape};
use crate::element::Element;
pub use crate::mask::MAX_CHUNK_LANES;
use crate::mask::NativeMask;

// ============================================================================
// Native masks
// ============================================================================

/// Vector-register style mask: one all-ones or all-zeros byte per lane.
/// Conversion to bits gathers the top bit of each lane (movemask).
#[derive(Clone, Copy)]
pub struct LaneMask {
    lanes: usize,
    bytes: [u8; MAX_CHUNK_LANES],
}

impl LaneMask {
    pub fn from_fn(lanes: usize, mut f: impl FnMut(usize) -> bool) -> Self {
        crate::precondition!(lanes <= MAX_CHUNK_LANES, "{} lanes exceed one chunk", lanes);
        let mut bytes = [0u8; MAX_CHUNK_LANES];
        for (i, b) in bytes.iter_mut().enumerate().take(lanes) {
            *b = if f(i) { 0xFF } else { 0x00 };
        }
        Self { lanes, bytes }
    }

    pub fn lane(&self, i: usize) -> bool {
        self.bytes[i] & 0x80 != 0
    }
}

impl NativeMask for LaneMask {
    fn lanes(&self) -> usize {
        self.lanes
    }

    fn to_bits(&self) -> Word {
        self.bytes[..self.lanes]
            .iter()
            .enumerate()
            .fold(0, |acc, (i, b)| acc | (((*b >> 7) as Word) << i))
    }
}

impl fmt::Debug for LaneMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LaneMask({:0width$b})", self.to_bits(), width = self.lanes)
    }
}

/// Mask-register style mask: one bit per lane already.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct KMask {
    lanes: usize,
    bits: Word,
}

impl KMask {
    pub fn new(lanes: usize, bits: Word) -> Self {
        crate::precondition!(lanes <= MAX_CHUNK_LANES, "{} lanes exceed one chunk", lanes);
        // Lanes above `lanes` read as garbage on hardware; the conversion
        // below is what clears them.
        Self { lanes, bits }
    }
}

impl NativeMask for KMask {
    fn lanes(&self) -> usize {
        self.lanes
    }

    fn to_bits(&self) -> Word {
        self.bits & low_bits(self.lanes)
    }
}

impl fmt::Debug for KMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KMask({:0width$b})", self.to_bits(), width = self.lanes)
    }
}

/// The native mask a chunk produces, in the representation its shape uses.
#[derive(Debug, Clone, Copy)]
pub enum ChunkMask {
    Vector(LaneMask),
    Bitmask(KMask),
}

impl ChunkMask {
    /// Evaluates `pred` per lane and packs the result the way `shape` would.
    pub fn for_shape(shape: &NativeShape, mut pred: impl FnMut(usize) -> bool) -> Self {
        match shape.mask {
            MaskRepr::Vector => ChunkMask::Vector(LaneMask::from_fn(shape.lanes, pred)),
            MaskRepr::Bitmask => {
                let bits = (0..shape.lanes).fold(0, |acc, i| acc | ((pred(i) as Word) << i));
                ChunkMask::Bitmask(KMask::new(shape.lanes, bits))
            }
        }
    }
}

impl NativeMask for ChunkMask {
    fn lanes(&self) -> usize {
        match self {
            ChunkMask::Vector(m) => m.lanes(),
            ChunkMask::Bitmask(m) => m.lanes(),
        }
    }

    fn to_bits(&self) -> Word {
        match self {
            ChunkMask::Vector(m) => m.to_bits(),
            ChunkMask::Bitmask(m) => m.to_bits(),
        }
    }
}

// ============================================================================
// Kernels
// ============================================================================

/// Operations on one native chunk. Slices hold exactly the chunk's
/// logical lanes.
pub trait ChunkKernel {
    fn broadcast<T: Element>(shape: &NativeShape, value: T, out: &mut [T]);

    fn map<T: Element>(shape: &NativeShape, a: &[T], out: &mut [T], op: impl Fn(T) -> T);

    fn zip<T: Element>(shape: &NativeShape, a: &[T], b: &[T], out: &mut [T], op: impl Fn(T, T) -> T);

    fn compare<T: Element>(shape: &NativeShape, a: &[T], b: &[T], pred: impl Fn(T, T) -> bool) -> ChunkMask;

    fn classify<T: Element>(shape: &NativeShape, a: &[T], pred: impl Fn(T) -> bool) -> ChunkMask;

    /// Horizontal reduction inside one chunk.
    fn reduce<T: Element>(shape: &NativeShape, a: &[T], op: impl Fn(T, T) -> T) -> T;
}

/// Lane-by-lane kernel usable with every shape.
#[derive(Debug, Clone, Copy, Default)]
pub struct PortableKernel;

impl ChunkKernel for PortableKernel {
    #[inline(always)]
    fn broadcast<T: Element>(_shape: &NativeShape, value: T, out: &mut [T]) {
        out.fill(value);
    }

    #[inline(always)]
    fn map<T: Element>(_shape: &NativeShape, a: &[T], out: &mut [T], op: impl Fn(T) -> T) {
        for (o, x) in out.iter_mut().zip(a) {
            *o = op(*x);
        }
    }

    #[inline(always)]
    fn zip<T: Element>(_shape: &NativeShape, a: &[T], b: &[T], out: &mut [T], op: impl Fn(T, T) -> T) {
        for ((o, x), y) in out.iter_mut().zip(a).zip(b) {
            *o = op(*x, *y);
        }
    }

    #[inline(always)]
    fn compare<T: Element>(shape: &NativeShape, a: &[T], b: &[T], pred: impl Fn(T, T) -> bool) -> ChunkMask {
        ChunkMask::for_shape(shape, |i| pred(a[i], b[i]))
    }

    #[inline(always)]
    fn classify<T: Element>(shape: &NativeShape, a: &[T], pred: impl Fn(T) -> bool) -> ChunkMask {
        ChunkMask::for_shape(shape, |i| pred(a[i]))
    }

    /// Pairwise halving, like a shuffle-and-combine sequence on hardware.
    fn reduce<T: Element>(_shape: &NativeShape, a: &[T], op: impl Fn(T, T) -> T) -> T {
        crate::precondition!(
            !a.is_empty() && a.len() <= MAX_CHUNK_LANES,
            "reduce over {} lanes",
            a.len()
        );
        let mut buf = [T::default(); MAX_CHUNK_LANES];
        let mut len = a.len().min(MAX_CHUNK_LANES);
        buf[..len].copy_from_slice(&a[..len]);
        while len > 1 {
            let half = len / 2;
            for i in 0..half {
                buf[i] = op(buf[i], buf[len - half + i]);
            }
            len -= half;
        }
        buf[0]
    }
}
