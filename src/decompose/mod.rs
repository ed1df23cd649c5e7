// src/decompose/mod.rs

//! # ABI deduction
//!
//! Turns `(ElementType, N)` into a [`Recipe`] by searching the catalog in
//! three tiers; the first that succeeds wins.
//!
//! 1. **Exact**: a shape holding exactly `N` lanes (a fully used register,
//!    or a partially used one the padding policy accepts).
//! 2. **Homogeneous array**: `N` is a multiple `K >= 2` of the preferred
//!    shape's lane count.
//! 3. **Tuple**: repeatedly take the largest power-of-two chunk not above
//!    the remaining lanes that some shape holds within the padding policy.
//!    One remaining lane always resolves to the scalar shape.
//!
//! The search is pure and deterministic: the same catalog, policy and
//! request always give the same recipe. It recurses at most
//! `log2(max_lanes)` times per chunk size.

mod cache;
mod recipe;

#[cfg(test)]
mod tests;

pub use cache::{recipe_for, RecipeCache};
pub use recipe::{ChunkDescriptor, ChunkPlacement, Chunks, Recipe, RecipeKind, StorageLayout};

use log::{debug, trace};

use crate::catalog::{NativeChunkCatalog, NativeShape};
use crate::config::DecomposePolicy;
use crate::element::ElementType;
use crate::error::{AbiError, Result};

/// Largest power of two not above `n` (`n > 0`).
#[inline(always)]
fn bit_floor(n: usize) -> usize {
    1 << (usize::BITS - 1 - n.leading_zeros())
}

/// Decomposition planner bound to one catalog and policy.
#[derive(Debug, Clone)]
pub struct Decomposer<'a> {
    catalog: &'a NativeChunkCatalog,
    policy: DecomposePolicy,
}

impl<'a> Decomposer<'a> {
    pub fn new(catalog: &'a NativeChunkCatalog, policy: DecomposePolicy) -> Result<Self> {
        policy.validate()?;
        Ok(Self { catalog, policy })
    }

    pub fn with_default_policy(catalog: &'a NativeChunkCatalog) -> Self {
        Self {
            catalog,
            policy: DecomposePolicy::default(),
        }
    }

    pub fn catalog(&self) -> &'a NativeChunkCatalog {
        self.catalog
    }

    pub fn policy(&self) -> &DecomposePolicy {
        &self.policy
    }

    /// Plans `lanes` lanes of `ty`.
    pub fn decompose(&self, ty: ElementType, lanes: usize) -> Result<Recipe> {
        if lanes == 0 {
            return Err(AbiError::ZeroLanes);
        }
        if lanes > self.policy.max_lanes {
            return Err(AbiError::TooManyLanes {
                lanes,
                max: self.policy.max_lanes,
            });
        }
        if !self.catalog.supports(ty) {
            return Err(AbiError::UnsupportedElement(ty));
        }

        if let Some(shape) = self.exact(ty, lanes) {
            debug!("{} x {}: exact match {}", ty, lanes, shape);
            return Ok(Recipe::Direct(shape));
        }
        if let Some((shape, count)) = self.homogeneous(ty, lanes) {
            debug!("{} x {}: {} chunks of {}", ty, lanes, count, shape);
            return Ok(Recipe::HomogeneousArray { shape, count });
        }
        let recipe = self.heterogeneous(ty, lanes)?;
        debug!("{} x {}: fallback {}", ty, lanes, recipe);
        Ok(recipe)
    }

    fn exact(&self, ty: ElementType, lanes: usize) -> Option<NativeShape> {
        self.catalog.best_shape(ty, lanes, self.policy.padding_ratio)
    }

    fn homogeneous(&self, ty: ElementType, lanes: usize) -> Option<(NativeShape, usize)> {
        let shape = self.catalog.preferred_shape(ty)?;
        let count = lanes / shape.lanes;
        if lanes % shape.lanes == 0 && count >= self.policy.min_array_chunks {
            Some((shape, count))
        } else {
            trace!(
                "{} x {}: not a multiple of preferred {} ({} lanes)",
                ty,
                lanes,
                shape,
                shape.lanes
            );
            None
        }
    }

    fn heterogeneous(&self, ty: ElementType, lanes: usize) -> Result<Recipe> {
        let widest = self
            .catalog
            .widest_lanes(ty)
            .ok_or(AbiError::UnsupportedElement(ty))?;

        let mut chunks = Vec::new();
        let mut remaining = lanes;
        while remaining > 0 {
            let shape = self.next_chunk(ty, remaining.min(widest))?;
            trace!("{} x {}: chunk {} leaves {}", ty, lanes, shape, remaining - shape.lanes);
            remaining -= shape.lanes;
            chunks.push(shape);
        }

        Ok(match chunks.as_slice() {
            [single] => Recipe::Direct(*single),
            _ => Recipe::Tuple(chunks),
        })
    }

    /// Largest power-of-two chunk `<= limit` that a shape holds.
    fn next_chunk(&self, ty: ElementType, limit: usize) -> Result<NativeShape> {
        let mut size = bit_floor(limit);
        loop {
            if let Some(shape) = self.catalog.best_shape(ty, size, self.policy.padding_ratio) {
                return Ok(shape);
            }
            if size == 1 {
                return Err(AbiError::NoShape {
                    element: ty,
                    lanes: 1,
                });
            }
            size /= 2;
        }
    }
}

/// Plans against the build target's catalog with the default policy.
pub fn decompose(ty: ElementType, lanes: usize) -> Result<Recipe> {
    Decomposer::with_default_policy(crate::catalog::native()).decompose(ty, lanes)
}
