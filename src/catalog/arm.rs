// src/catalog/arm.rs

//! NEON register classes.

use super::{Capabilities, ElementSupport, Isa, RegisterClass, TargetFeatures};

pub(super) fn registers(features: &TargetFeatures) -> Vec<RegisterClass> {
    if !features.neon {
        return Vec::new();
    }
    let caps = Capabilities::FULL | Capabilities::PARTIAL;

    let mut quad = ElementSupport::F32 | ElementSupport::NARROW_INTS | ElementSupport::WIDE_INTS;
    if features.neon_f64 {
        quad |= ElementSupport::F64;
    }
    // D registers: 64-bit lanes would be a single element.
    let double = ElementSupport::F32 | ElementSupport::NARROW_INTS | ElementSupport::INT32;

    vec![
        RegisterClass::new("neon-q", Isa::Neon, 16, quad, caps),
        RegisterClass::new("neon-d", Isa::Neon, 8, double, caps),
    ]
}
