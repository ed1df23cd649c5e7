// src/catalog/x86.rs

//! x86 register classes, widest first.

use super::{Capabilities, ElementSupport, Isa, RegisterClass, TargetFeatures};

// ============================================================================
// AVX-512
// ============================================================================

fn avx512(features: &TargetFeatures) -> Vec<RegisterClass> {
    if !features.avx512f {
        return Vec::new();
    }
    let mut elements = ElementSupport::FLOATS | ElementSupport::WIDE_INTS;
    if features.avx512bw {
        elements |= ElementSupport::NARROW_INTS;
    }
    let caps = Capabilities::FULL | Capabilities::PARTIAL | Capabilities::BITMASK_REGISTER;

    let mut regs = vec![RegisterClass::new("avx512-zmm", Isa::Avx512, 64, elements, caps)];
    // VL gives the narrower registers k-mask compares; they outrank plain
    // AVX/SSE classes of the same width.
    if features.avx512vl {
        regs.push(RegisterClass::new("avx512vl-ymm", Isa::Avx512, 32, elements, caps));
        regs.push(RegisterClass::new("avx512vl-xmm", Isa::Avx512, 16, elements, caps));
    }
    regs
}

// ============================================================================
// AVX / AVX2
// ============================================================================

fn avx(features: &TargetFeatures) -> Option<RegisterClass> {
    if !features.avx {
        return None;
    }
    // Integer arithmetic on ymm needs AVX2.
    let mut elements = ElementSupport::FLOATS;
    if features.avx2 {
        elements |= ElementSupport::NARROW_INTS | ElementSupport::WIDE_INTS;
    }
    Some(RegisterClass::new(
        "avx-ymm",
        Isa::Avx,
        32,
        elements,
        Capabilities::FULL | Capabilities::PARTIAL,
    ))
}

// ============================================================================
// SSE / SSE2
// ============================================================================

fn sse(features: &TargetFeatures) -> Vec<RegisterClass> {
    if !features.sse {
        return Vec::new();
    }
    let caps = Capabilities::FULL | Capabilities::PARTIAL;
    let mut xmm = ElementSupport::F32;
    if features.sse2 {
        xmm |= ElementSupport::F64 | ElementSupport::NARROW_INTS | ElementSupport::WIDE_INTS;
    }
    let mut regs = vec![RegisterClass::new("sse-xmm", Isa::Sse, 16, xmm, caps)];

    // The low half of an xmm register (movq/movsd loads). 64-bit elements
    // would fit only one lane there, which the scalar class already covers.
    if features.sse2 {
        let half = ElementSupport::F32 | ElementSupport::NARROW_INTS | ElementSupport::INT32;
        regs.push(RegisterClass::new("sse-xmm-low64", Isa::Sse, 8, half, caps));
    }
    regs
}

pub(super) fn registers(features: &TargetFeatures) -> Vec<RegisterClass> {
    let mut regs = avx512(features);
    regs.extend(avx(features));
    regs.extend(sse(features));
    regs
}
