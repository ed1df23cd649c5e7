// src/error.rs

//! Error types for ABI deduction and configuration.
//!
//! These are the runtime face of the "static capability" failures: a
//! request that names an element kind or lane count the catalog cannot
//! realize. The typed value layer (`SimdValue`, `BitMask`) rejects the
//! same requests at monomorphization time instead.

use thiserror::Error;

use crate::element::ElementType;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AbiError {
    /// No register class in the catalog (not even the scalar one) accepts this element kind.
    #[error("element type {0} is not vectorizable on this target")]
    UnsupportedElement(ElementType),

    #[error("lane count must be positive")]
    ZeroLanes,

    #[error("lane count {lanes} exceeds the maximum of {max}")]
    TooManyLanes { lanes: usize, max: usize },

    /// The catalog has no shape for `lanes` lanes of `element`, which only
    /// happens for hand-built catalogs without a scalar register class.
    #[error("no native shape holds {lanes} lane(s) of {element}")]
    NoShape { element: ElementType, lanes: usize },

    #[error("invalid register class: {0}")]
    InvalidRegister(String),

    #[error("invalid decomposition policy: {0}")]
    InvalidPolicy(String),

    #[error("unknown target preset '{0}'")]
    UnknownPreset(String),

    #[error("unknown element type '{0}'")]
    UnknownElement(String),
}

pub type Result<T> = core::result::Result<T, AbiError>;
