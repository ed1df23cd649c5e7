//! # simd-abi
//!
//! Realizes a data-parallel value of `N` lanes of some element kind as a
//! composition of hardware-native vector chunks.
//!
//! ## Layers
//!
//! - [`catalog`]: the ordered, immutable list of native register shapes
//!   for the build target (or a named preset).
//! - [`decompose`]: `(ElementType, N) -> Recipe`, a three-tier search over
//!   the catalog (exact shape, homogeneous array, heterogeneous tuple).
//! - [`mask`]: `BitMask<N>`, fixed-width lane validity bits and their algebra.
//! - [`compose`]: `SimdValue<T, N>`, which walks a recipe's chunks
//!   (`for_each`, `test`, tree reduction) so arithmetic code never needs to
//!   know which recipe backs a value.
//!
//! ```ignore
//! use simd_abi::{decompose, ElementType, SimdValue};
//!
//! let recipe = decompose::recipe_for(ElementType::F32, 7)?;
//! println!("{recipe}"); // e.g. tuple[sse[128]:4 + sse[64]:2 + scalar:1]
//!
//! let v = SimdValue::<f32, 7>::from_fn(|i| i as f32);
//! let big = v.simd_gt(&SimdValue::splat(3.0));
//! assert_eq!(big.count(), 3);
//! ```

#![deny(unsafe_op_in_unsafe_fn)]

/// Checks a value-dependent precondition (lane index, shift amount,
/// memory range).
///
/// Active in debug builds and with the `hardened` feature; compiled out
/// otherwise. A violation logs and panics naming the failing expression
/// and its source location.
macro_rules! precondition {
    ($cond:expr, $($arg:tt)+) => {
        if cfg!(any(debug_assertions, feature = "hardened")) && !($cond) {
            $crate::precondition_failed(stringify!($cond), file!(), line!(), format_args!($($arg)+));
        }
    };
}

pub(crate) use precondition;

pub mod bits;
pub mod catalog;
pub mod compose;
pub mod config;
pub mod decompose;
pub mod element;
pub mod error;
pub mod mask;

pub use catalog::{NativeChunkCatalog, NativeShape, RegisterClass, TargetFeatures};
pub use compose::SimdValue;
pub use config::{Config, DecomposePolicy};
pub use decompose::{Decomposer, Recipe};
pub use element::{Complex, Element, ElementType};
pub use error::AbiError;
pub use mask::{BitMask, MAX_LANES};

#[cold]
#[inline(never)]
#[doc(hidden)]
pub fn precondition_failed(expr: &str, file: &str, line: u32, detail: core::fmt::Arguments<'_>) -> ! {
    log::error!("precondition `{}` violated at {}:{}: {}", expr, file, line, detail);
    panic!("precondition `{}` violated at {}:{}: {}", expr, file, line, detail);
}
