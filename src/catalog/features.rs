// src/catalog/features.rs

//! Target capability flags the catalog is built from.

use serde::{Deserialize, Serialize};

use crate::error::{AbiError, Result};

/// Instruction-set extensions relevant to register selection.
///
/// `detect()` reads the flags the crate was compiled with; presets describe
/// other targets so their decompositions can be planned from any host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetFeatures {
    pub sse: bool,
    pub sse2: bool,
    pub avx: bool,
    pub avx2: bool,
    pub avx512f: bool,
    pub avx512bw: bool,
    pub avx512vl: bool,
    pub neon: bool,
    /// NEON quad registers hold `f64` (AArch64 only).
    pub neon_f64: bool,
}

impl TargetFeatures {
    /// Names accepted by [`TargetFeatures::preset`].
    pub const PRESETS: [&'static str; 7] = [
        "scalar",
        "x86-64",
        "x86-64-v2",
        "x86-64-v3",
        "x86-64-v4",
        "aarch64",
        "armv7-neon",
    ];

    /// Flags of the build target.
    pub fn detect() -> Self {
        Self {
            sse: cfg!(all(
                any(target_arch = "x86", target_arch = "x86_64"),
                target_feature = "sse"
            )),
            sse2: cfg!(all(
                any(target_arch = "x86", target_arch = "x86_64"),
                target_feature = "sse2"
            )),
            avx: cfg!(all(
                any(target_arch = "x86", target_arch = "x86_64"),
                target_feature = "avx"
            )),
            avx2: cfg!(all(
                any(target_arch = "x86", target_arch = "x86_64"),
                target_feature = "avx2"
            )),
            avx512f: cfg!(all(target_arch = "x86_64", target_feature = "avx512f")),
            avx512bw: cfg!(all(target_arch = "x86_64", target_feature = "avx512bw")),
            avx512vl: cfg!(all(target_arch = "x86_64", target_feature = "avx512vl")),
            neon: cfg!(any(
                target_arch = "aarch64",
                all(target_arch = "arm", target_feature = "neon")
            )),
            neon_f64: cfg!(target_arch = "aarch64"),
        }
    }

    /// Flags of a named target level.
    pub fn preset(name: &str) -> Result<Self> {
        let base = Self::default();
        let v1 = Self {
            sse: true,
            sse2: true,
            ..base
        };
        let v3 = Self {
            avx: true,
            avx2: true,
            ..v1
        };
        let features = match name {
            "scalar" => base,
            "x86-64" | "x86-64-v2" => v1,
            "x86-64-v3" => v3,
            "x86-64-v4" => Self {
                avx512f: true,
                avx512bw: true,
                avx512vl: true,
                ..v3
            },
            "aarch64" => Self {
                neon: true,
                neon_f64: true,
                ..base
            },
            "armv7-neon" => Self { neon: true, ..base },
            other => return Err(AbiError::UnknownPreset(other.to_string())),
        };
        Ok(features)
    }
}
