// src/decompose/recipe.rs

use core::fmt;

use serde::Serialize;

use crate::catalog::NativeShape;

/// How `N` logical lanes are realized as native chunks.
///
/// Chunk lane counts always sum to `N`. Tuple chunks are in
/// non-increasing lane order, lowest lane offset first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Recipe {
    /// One native chunk holds all lanes.
    Direct(NativeShape),
    /// `count` identical chunks of `shape`.
    HomogeneousArray { shape: NativeShape, count: usize },
    /// Chunks of different native shapes.
    Tuple(Vec<NativeShape>),
}

/// Variant tag of a [`Recipe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipeKind {
    Direct,
    HomogeneousArray,
    Tuple,
}

/// One chunk slot of a recipe: its position and its native shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ChunkDescriptor {
    pub index: usize,
    /// First logical lane held by this chunk.
    pub offset: usize,
    pub shape: NativeShape,
}

impl ChunkDescriptor {
    #[inline(always)]
    pub fn lanes(&self) -> usize {
        self.shape.lanes
    }

    /// Lane range `offset..offset + lanes`.
    #[inline(always)]
    pub fn range(&self) -> core::ops::Range<usize> {
        self.offset..self.offset + self.shape.lanes
    }
}

impl Recipe {
    pub fn kind(&self) -> RecipeKind {
        match self {
            Recipe::Direct(_) => RecipeKind::Direct,
            Recipe::HomogeneousArray { .. } => RecipeKind::HomogeneousArray,
            Recipe::Tuple(_) => RecipeKind::Tuple,
        }
    }

    /// Total logical lanes.
    pub fn lanes(&self) -> usize {
        match self {
            Recipe::Direct(shape) => shape.lanes,
            Recipe::HomogeneousArray { shape, count } => shape.lanes * count,
            Recipe::Tuple(chunks) => chunks.iter().map(|c| c.lanes).sum(),
        }
    }

    pub fn chunk_count(&self) -> usize {
        match self {
            Recipe::Direct(_) => 1,
            Recipe::HomogeneousArray { count, .. } => *count,
            Recipe::Tuple(chunks) => chunks.len(),
        }
    }

    /// Shape of chunk `index`.
    pub fn chunk_shape(&self, index: usize) -> Option<&NativeShape> {
        match self {
            Recipe::Direct(shape) => (index == 0).then_some(shape),
            Recipe::HomogeneousArray { shape, count } => (index < *count).then_some(shape),
            Recipe::Tuple(chunks) => chunks.get(index),
        }
    }

    /// Chunk slots in ascending lane offset.
    pub fn chunks(&self) -> Chunks<'_> {
        Chunks {
            recipe: self,
            index: 0,
            offset: 0,
        }
    }

    /// The chunk holding logical lane `lane`.
    pub fn chunk_at_lane(&self, lane: usize) -> Option<ChunkDescriptor> {
        self.chunks().find(|c| c.range().contains(&lane))
    }

    /// Byte placement of every chunk in a value's storage.
    pub fn layout(&self) -> StorageLayout {
        let mut cursor = 0;
        let mut alignment = 1;
        let mut chunks = Vec::with_capacity(self.chunk_count());
        for chunk in self.chunks() {
            let align = chunk.shape.alignment.max(1);
            let byte_offset = align_up(cursor, align);
            cursor = byte_offset + chunk.shape.storage_bytes();
            alignment = alignment.max(align);
            chunks.push(ChunkPlacement { chunk, byte_offset });
        }
        StorageLayout {
            size_bytes: align_up(cursor, alignment),
            alignment,
            chunks,
        }
    }
}

#[inline(always)]
fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) / align * align
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recipe::Direct(shape) => write!(f, "direct[{}]", shape),
            Recipe::HomogeneousArray { shape, count } => write!(f, "array[{} x {}]", count, shape),
            Recipe::Tuple(chunks) => {
                f.write_str("tuple[")?;
                for (i, chunk) in chunks.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" + ")?;
                    }
                    write!(f, "{}", chunk)?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Iterator over a recipe's chunk slots, threading the lane offset.
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    recipe: &'a Recipe,
    index: usize,
    offset: usize,
}

impl Iterator for Chunks<'_> {
    type Item = ChunkDescriptor;

    fn next(&mut self) -> Option<ChunkDescriptor> {
        let shape = *self.recipe.chunk_shape(self.index)?;
        let chunk = ChunkDescriptor {
            index: self.index,
            offset: self.offset,
            shape,
        };
        self.index += 1;
        self.offset += shape.lanes;
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.recipe.chunk_count() - self.index;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Chunks<'_> {}

// ============================================================================
// Storage layout
// ============================================================================

/// Where a chunk lives inside a value's storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChunkPlacement {
    #[serde(flatten)]
    pub chunk: ChunkDescriptor,
    pub byte_offset: usize,
}

/// Storage footprint of a recipe-backed value, padding included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageLayout {
    pub size_bytes: usize,
    pub alignment: usize,
    pub chunks: Vec<ChunkPlacement>,
}
