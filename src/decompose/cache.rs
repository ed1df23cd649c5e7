// src/decompose/cache.rs

//! Memoized decompositions keyed by `(ElementType, N)`.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use log::trace;
use once_cell::sync::OnceCell;

use super::{Decomposer, Recipe};
use crate::element::ElementType;
use crate::error::{AbiError, Result};
use crate::mask::MAX_LANES;

type Key = (ElementType, usize);

/// Memoizing wrapper around a [`Decomposer`].
///
/// Lookups of known keys take only a read lock, so concurrent readers never
/// wait on each other. Two threads missing on the same key may both run the
/// (pure) search; the first insert wins and both get the same recipe.
#[derive(Debug)]
pub struct RecipeCache<'a> {
    decomposer: Decomposer<'a>,
    entries: RwLock<HashMap<Key, Arc<Recipe>>>,
}

impl<'a> RecipeCache<'a> {
    pub fn new(decomposer: Decomposer<'a>) -> Self {
        Self {
            decomposer,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn decomposer(&self) -> &Decomposer<'a> {
        &self.decomposer
    }

    pub fn get(&self, ty: ElementType, lanes: usize) -> Result<Arc<Recipe>> {
        let key = (ty, lanes);
        if let Some(hit) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(Arc::clone(hit));
        }

        let recipe = Arc::new(self.decomposer.decompose(ty, lanes)?);
        trace!("caching recipe for {} x {}", ty, lanes);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(entries.entry(key).or_insert(recipe)))
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Process-wide native recipes
// ============================================================================

type RecipeRow = [OnceCell<Recipe>; MAX_LANES];

#[allow(clippy::declare_interior_mutable_const)] // array repeat seed
const EMPTY_RECIPE: OnceCell<Recipe> = OnceCell::new();
#[allow(clippy::declare_interior_mutable_const)] // array repeat seed
const EMPTY_ROW: RecipeRow = [EMPTY_RECIPE; MAX_LANES];

/// Native-catalog recipes, one slot per `(ElementType, N)`. A slot is
/// filled once and only read afterwards, so lookups never lock.
static NATIVE_RECIPES: [RecipeRow; ElementType::ALL.len()] = [EMPTY_ROW; ElementType::ALL.len()];

/// Recipe for `lanes` lanes of `ty` on the build target, derived on first
/// use and shared afterwards.
pub fn recipe_for(ty: ElementType, lanes: usize) -> Result<&'static Recipe> {
    let Some(slot) = lanes
        .checked_sub(1)
        .and_then(|i| NATIVE_RECIPES[ty.index()].get(i))
    else {
        return Err(if lanes == 0 {
            AbiError::ZeroLanes
        } else {
            AbiError::TooManyLanes {
                lanes,
                max: MAX_LANES,
            }
        });
    };
    slot.get_or_try_init(|| {
        trace!("deriving native recipe for {} x {}", ty, lanes);
        super::decompose(ty, lanes)
    })
}
