// src/compose/reduce.rs

//! Tree reduction across a recipe's chunks.
//!
//! Neighbouring chunks are combined pairwise, round by round, until one
//! chunk remains; that chunk is then reduced natively. Two chunks combine
//! lane by lane only when their lane counts match. When they don't, the
//! larger one is first folded onto itself in halves, and a chunk with an
//! odd lane count collapses natively to a single lane.

use super::native::ChunkKernel;
use crate::catalog::NativeShape;
use crate::decompose::Recipe;
use crate::element::Element;
use crate::mask::MAX_LANES;

/// A run of lanes inside the scratch buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Segment {
    offset: usize,
    len: usize,
    shape: NativeShape,
}

impl Segment {
    fn shrink(mut self, len: usize) -> Self {
        self.len = len;
        self.shape.lanes = len;
        self
    }
}

/// Reduces every logical lane of `lanes` (laid out per `recipe`) with
/// `op`. `op` is treated as associative and commutative. `lanes` is used
/// as scratch space.
pub fn tree_reduce<T: Element, K: ChunkKernel>(
    recipe: &Recipe,
    lanes: &mut [T],
    op: impl Fn(T, T) -> T + Copy,
) -> T {
    crate::precondition!(
        lanes.len() == recipe.lanes(),
        "{} lanes for a {}-lane recipe",
        lanes.len(),
        recipe.lanes()
    );

    let mut chunks = recipe.chunks().map(|c| Segment {
        offset: c.offset,
        len: c.lanes(),
        shape: c.shape,
    });
    let Some(first) = chunks.next() else {
        return T::default();
    };

    // A chunk holds at least one lane, so MAX_LANES slots always suffice.
    let mut segments = [first; MAX_LANES];
    let mut count = 1;
    for seg in chunks.take(MAX_LANES - 1) {
        segments[count] = seg;
        count += 1;
    }

    // Round results go back into the front of the same array; slot `i` is
    // written only after slots `2i` and `2i + 1` were read.
    while count > 1 {
        for i in 0..count / 2 {
            segments[i] = pair_up::<T, K>(lanes, segments[2 * i], segments[2 * i + 1], op);
        }
        if count % 2 == 1 {
            segments[count / 2] = segments[count - 1];
        }
        count = (count + 1) / 2;
    }

    let seg = segments[0];
    K::reduce(&seg.shape, &lanes[seg.offset..seg.offset + seg.len], op)
}

/// Combines two segments into one, leaving the result in `a`'s lanes.
fn pair_up<T: Element, K: ChunkKernel>(
    lanes: &mut [T],
    mut a: Segment,
    mut b: Segment,
    op: impl Fn(T, T) -> T + Copy,
) -> Segment {
    while a.len != b.len {
        let big = if a.len > b.len { &mut a } else { &mut b };
        *big = if big.len % 2 == 0 {
            fold_halves(lanes, *big, op)
        } else {
            collapse::<T, K>(lanes, *big, op)
        };
    }

    for i in 0..a.len {
        lanes[a.offset + i] = op(lanes[a.offset + i], lanes[b.offset + i]);
    }
    a
}

/// Folds the upper half of an even segment onto its lower half.
fn fold_halves<T: Element>(lanes: &mut [T], seg: Segment, op: impl Fn(T, T) -> T) -> Segment {
    let half = seg.len / 2;
    for i in 0..half {
        let (lo, hi) = (lanes[seg.offset + i], lanes[seg.offset + half + i]);
        lanes[seg.offset + i] = op(lo, hi);
    }
    seg.shrink(half)
}

/// Reduces a segment natively to one lane.
fn collapse<T: Element, K: ChunkKernel>(
    lanes: &mut [T],
    seg: Segment,
    op: impl Fn(T, T) -> T,
) -> Segment {
    let range = seg.offset..seg.offset + seg.len;
    let folded = K::reduce(&seg.shape, &lanes[range], op);
    lanes[seg.offset] = folded;
    seg.shrink(1)
}
