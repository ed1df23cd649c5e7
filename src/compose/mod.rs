// src/compose/mod.rs

//! # Recipe-driven values
//!
//! `SimdValue<T, N>` stores `N` logical lanes of `T` and runs every
//! operation chunk by chunk, in ascending lane offset, over the recipe the
//! decomposer picked for `(T, N)` on the build target. The value type never
//! inspects register classes itself: it hands each chunk's lanes and shape
//! to a [`ChunkKernel`] and stitches per-chunk results back together.
//!
//! - [`SimdValue::for_each`] / [`SimdValue::for_each_mut`] visit chunks.
//! - [`SimdValue::test`] turns per-chunk native masks into one `BitMask<N>`,
//!   lowest chunk in the lowest bits.
//! - [`SimdValue::reduce`] pairs chunks of equal size in a binary tree
//!   before the final in-chunk reduction.
//!
//! Lanes are stored as one flat `[T; N]`; chunks are views into it at
//! their lane offsets. The per-chunk padding and alignment reported by
//! [`Recipe::layout`] describe native register storage and are not
//! applied to this array.

pub mod native;
mod reduce;

#[cfg(test)]
mod tests;

pub use native::{ChunkKernel, ChunkMask, KMask, LaneMask, PortableKernel};
pub use reduce::tree_reduce;

use core::fmt;
use core::ops::{Add, Div, Index, Mul, Sub};

use log::error;

use crate::decompose::{recipe_for, ChunkDescriptor, Recipe};
use crate::element::{Element, FloatElement};
use crate::error::AbiError;
use crate::mask::{BitMask, NativeMask, MAX_LANES};

type Kernel = PortableKernel;

/// One chunk of a value, read-only.
#[derive(Debug, Clone, Copy)]
pub struct Chunk<'a, T> {
    pub descriptor: ChunkDescriptor,
    pub lanes: &'a [T],
}

/// One chunk of a value, writable.
#[derive(Debug)]
pub struct ChunkMut<'a, T> {
    pub descriptor: ChunkDescriptor,
    pub lanes: &'a mut [T],
}

/// `N` lanes of `T` processed per the native recipe for `(T, N)`.
#[derive(Clone, Copy)]
pub struct SimdValue<T: Element, const N: usize> {
    lanes: [T; N],
}

#[cold]
#[inline(never)]
fn no_native_recipe(err: &AbiError) -> ! {
    // Every native catalog ends in a scalar class holding all element
    // kinds, so only an out-of-range width can get here.
    error!("no native recipe: {}", err);
    panic!("no native recipe: {}", err)
}

impl<T: Element, const N: usize> SimdValue<T, N> {
    const VALID_WIDTH: () = assert!(
        N >= 1 && N <= MAX_LANES,
        "SimdValue width must be between 1 and MAX_LANES"
    );

    /// The recipe every `SimdValue<T, N>` uses. Derived on first use,
    /// then a lock-free lookup.
    pub fn recipe() -> &'static Recipe {
        let () = Self::VALID_WIDTH;
        match recipe_for(T::TYPE, N) {
            Ok(recipe) => recipe,
            Err(err) => no_native_recipe(&err),
        }
    }

    #[inline(always)]
    fn from_lanes(lanes: [T; N]) -> Self {
        let () = Self::VALID_WIDTH;
        Self { lanes }
    }

    pub fn chunk_count(&self) -> usize {
        Self::recipe().chunk_count()
    }

    pub fn to_array(&self) -> [T; N] {
        self.lanes
    }

    pub fn as_slice(&self) -> &[T] {
        &self.lanes
    }

    #[inline(always)]
    pub fn get(&self, lane: usize) -> T {
        crate::precondition!(lane < N, "lane {} out of range for {} lanes", lane, N);
        self.lanes[lane]
    }

    // ========================================================================
    // Chunk traversal
    // ========================================================================

    /// Calls `op` once per chunk, lowest lane offset first.
    pub fn for_each(&self, mut op: impl FnMut(Chunk<'_, T>)) {
        for descriptor in Self::recipe().chunks() {
            op(Chunk {
                descriptor,
                lanes: &self.lanes[descriptor.range()],
            });
        }
    }

    /// Like [`for_each`](Self::for_each) with writable chunk lanes.
    pub fn for_each_mut(&mut self, mut op: impl FnMut(ChunkMut<'_, T>)) {
        let mut rest: &mut [T] = &mut self.lanes;
        for descriptor in Self::recipe().chunks() {
            let (head, tail) = core::mem::take(&mut rest).split_at_mut(descriptor.lanes());
            rest = tail;
            op(ChunkMut {
                descriptor,
                lanes: head,
            });
        }
    }

    /// Evaluates a per-chunk predicate and assembles the native chunk masks
    /// into one lane mask.
    pub fn test<M: NativeMask>(&self, mut op: impl FnMut(Chunk<'_, T>) -> M) -> BitMask<N> {
        let mut out = BitMask::<N>::new();
        self.for_each(|chunk| {
            let native = op(chunk);
            crate::precondition!(
                native.lanes() == chunk.descriptor.lanes(),
                "chunk {} produced a {}-lane mask for {} lanes",
                chunk.descriptor.index,
                native.lanes(),
                chunk.descriptor.lanes()
            );
            out.insert_bits(chunk.descriptor.offset, chunk.descriptor.lanes(), native.to_bits());
        });
        out
    }

    // ========================================================================
    // Construction and memory
    // ========================================================================

    pub fn splat(value: T) -> Self {
        let mut v = Self::from_lanes([T::default(); N]);
        v.for_each_mut(|c| Kernel::broadcast(&c.descriptor.shape, value, c.lanes));
        v
    }

    /// Lane `i` takes `f(i)`.
    pub fn from_fn(mut f: impl FnMut(usize) -> T) -> Self {
        let mut v = Self::from_lanes([T::default(); N]);
        v.for_each_mut(|c| {
            for (i, lane) in c.lanes.iter_mut().enumerate() {
                *lane = f(c.descriptor.offset + i);
            }
        });
        v
    }

    pub fn from_array(lanes: [T; N]) -> Self {
        Self::from_lanes(lanes)
    }

    /// Loads the first `N` elements of `src`.
    pub fn from_slice(src: &[T]) -> Self {
        crate::precondition!(src.len() >= N, "load of {} lanes from {} elements", N, src.len());
        let mut v = Self::from_lanes([T::default(); N]);
        v.for_each_mut(|c| c.lanes.copy_from_slice(&src[c.descriptor.range()]));
        v
    }

    /// Stores all lanes to the start of `dst`.
    pub fn write_to_slice(&self, dst: &mut [T]) {
        crate::precondition!(dst.len() >= N, "store of {} lanes into {} elements", N, dst.len());
        self.for_each(|c| dst[c.descriptor.range()].copy_from_slice(c.lanes));
    }

    /// Loads the lanes set in `mask` from `src`; the others come from
    /// `fallback`. Only masked lanes are read.
    pub fn load_masked(src: &[T], mask: &BitMask<N>, fallback: Self) -> Self {
        let mut v = fallback;
        for lane in mask.iter_set() {
            crate::precondition!(lane < src.len(), "masked load of lane {} past {} elements", lane, src.len());
            v.lanes[lane] = src[lane];
        }
        v
    }

    /// Stores the lanes set in `mask`; other elements of `dst` are untouched.
    pub fn store_masked(&self, dst: &mut [T], mask: &BitMask<N>) {
        for lane in mask.iter_set() {
            crate::precondition!(lane < dst.len(), "masked store of lane {} past {} elements", lane, dst.len());
            dst[lane] = self.lanes[lane];
        }
    }

    // ========================================================================
    // Lane-wise operations
    // ========================================================================

    pub fn map(self, op: impl Fn(T) -> T) -> Self {
        let mut out = self;
        out.for_each_mut(|c| {
            let src = &self.lanes[c.descriptor.range()];
            Kernel::map(&c.descriptor.shape, src, c.lanes, &op);
        });
        out
    }

    pub fn zip_map(self, other: Self, op: impl Fn(T, T) -> T) -> Self {
        let mut out = self;
        out.for_each_mut(|c| {
            let range = c.descriptor.range();
            Kernel::zip(&c.descriptor.shape, &self.lanes[range.clone()], &other.lanes[range], c.lanes, &op);
        });
        out
    }

    /// Per-lane comparison of `self` against `other`.
    pub fn compare(&self, other: &Self, pred: impl Fn(T, T) -> bool) -> BitMask<N> {
        self.test(|c| {
            let rhs = &other.lanes[c.descriptor.range()];
            Kernel::compare(&c.descriptor.shape, c.lanes, rhs, &pred)
        })
    }

    /// Per-lane predicate.
    pub fn classify(&self, pred: impl Fn(T) -> bool) -> BitMask<N> {
        self.test(|c| Kernel::classify(&c.descriptor.shape, c.lanes, &pred))
    }

    /// Lane `i` is `a[i]` where `mask` is set, `b[i]` elsewhere.
    pub fn select(mask: &BitMask<N>, a: Self, b: Self) -> Self {
        let mut out = b;
        out.for_each_mut(|c| {
            for (i, lane) in c.lanes.iter_mut().enumerate() {
                let idx = c.descriptor.offset + i;
                if mask.get(idx) {
                    *lane = a.lanes[idx];
                }
            }
        });
        out
    }

    pub fn simd_eq(&self, other: &Self) -> BitMask<N> {
        self.compare(other, |a, b| a == b)
    }

    pub fn simd_ne(&self, other: &Self) -> BitMask<N> {
        self.compare(other, |a, b| a != b)
    }

    // ========================================================================
    // Reductions
    // ========================================================================

    /// Reduces all lanes with an associative, commutative `op`.
    pub fn reduce(&self, op: impl Fn(T, T) -> T + Copy) -> T {
        let mut scratch = self.lanes;
        tree_reduce::<T, Kernel>(Self::recipe(), &mut scratch, op)
    }
}

impl<T: Element + PartialOrd, const N: usize> SimdValue<T, N> {
    pub fn simd_lt(&self, other: &Self) -> BitMask<N> {
        self.compare(other, |a, b| a < b)
    }

    pub fn simd_le(&self, other: &Self) -> BitMask<N> {
        self.compare(other, |a, b| a <= b)
    }

    pub fn simd_gt(&self, other: &Self) -> BitMask<N> {
        self.compare(other, |a, b| a > b)
    }

    pub fn simd_ge(&self, other: &Self) -> BitMask<N> {
        self.compare(other, |a, b| a >= b)
    }

    /// Smallest lane. NaN lanes lose every comparison and so are skipped
    /// unless all lanes are NaN.
    #[allow(clippy::eq_op)] // NaN
    pub fn reduce_min(&self) -> T {
        self.reduce(|a, b| if b < a || a != a { b } else { a })
    }

    /// Largest lane, NaN handled as in [`reduce_min`](Self::reduce_min).
    #[allow(clippy::eq_op)] // NaN
    pub fn reduce_max(&self) -> T {
        self.reduce(|a, b| if b > a || a != a { b } else { a })
    }
}

impl<T: Element + Add<Output = T>, const N: usize> SimdValue<T, N> {
    pub fn reduce_sum(&self) -> T {
        self.reduce(|a, b| a + b)
    }
}

impl<T: FloatElement, const N: usize> SimdValue<T, N> {
    pub fn is_nan(&self) -> BitMask<N> {
        self.classify(T::is_nan)
    }

    pub fn is_infinite(&self) -> BitMask<N> {
        self.classify(T::is_infinite)
    }

    pub fn is_finite(&self) -> BitMask<N> {
        self.classify(T::is_finite)
    }
}

// ============================================================================
// Operators
// ============================================================================

macro_rules! impl_value_binop {
    ($($trait:ident :: $method:ident),* $(,)?) => {
        $(
            impl<T: Element + $trait<Output = T>, const N: usize> $trait for SimdValue<T, N> {
                type Output = Self;
                #[inline(always)]
                fn $method(self, rhs: Self) -> Self {
                    self.zip_map(rhs, |a, b| a.$method(b))
                }
            }
        )*
    };
}

impl_value_binop!(Add::add, Sub::sub, Mul::mul, Div::div);

impl<T: Element, const N: usize> Index<usize> for SimdValue<T, N> {
    type Output = T;

    fn index(&self, lane: usize) -> &T {
        &self.lanes[lane]
    }
}

impl<T: Element, const N: usize> Default for SimdValue<T, N> {
    fn default() -> Self {
        Self::splat(T::default())
    }
}

impl<T: Element, const N: usize> From<[T; N]> for SimdValue<T, N> {
    fn from(lanes: [T; N]) -> Self {
        Self::from_array(lanes)
    }
}

impl<T: Element, const N: usize> PartialEq for SimdValue<T, N> {
    fn eq(&self, other: &Self) -> bool {
        self.lanes == other.lanes
    }
}

impl<T: Element, const N: usize> fmt::Debug for SimdValue<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SimdValue<{}, {}> as {} ", T::TYPE, N, Self::recipe())?;
        f.debug_list().entries(self.lanes.iter()).finish()
    }
}
