// src/catalog/scalar.rs

//! The one-lane fallback present in every catalog.

use super::{Capabilities, ElementSupport, Isa, RegisterClass};

pub(super) fn registers() -> Vec<RegisterClass> {
    vec![RegisterClass {
        alignment: 1,
        ..RegisterClass::new(
            "scalar",
            Isa::Scalar,
            0,
            ElementSupport::all(),
            Capabilities::FULL,
        )
    }]
}
