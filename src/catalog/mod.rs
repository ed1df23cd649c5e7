// src/catalog/mod.rs

//! # Native chunk catalog
//!
//! The ordered list of hardware vector register classes available on a
//! target. Each class knows which element kinds it can hold and which
//! operations it supports; specialized to one element kind it yields a
//! [`NativeShape`].
//!
//! The catalog is built once, widest register first, and never mutated.
//! Classes of equal width keep their declared order, which is the
//! tie-break priority (newest instruction-set extension first).
//!
//! Register lists come from the per-ISA providers:
//! - `x86`: AVX-512 (with and without VL), AVX/AVX2, SSE/SSE2
//! - `arm`: NEON quad and double registers
//! - `scalar`: the one-lane fallback every catalog ends with

mod arm;
mod features;
mod scalar;
mod x86;


pub use features::TargetFeatures;

use core::fmt;

use bitflags::bitflags;
use log::{debug, info};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::element::ElementType;
use crate::error::{AbiError, Result};
use crate::mask::MAX_CHUNK_LANES;

bitflags! {
    /// Operations a register class provides for the element kinds it supports.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Capabilities: u16 {
        const BROADCAST = 1 << 0;
        const LOAD = 1 << 1;
        const STORE = 1 << 2;
        const COMPARE = 1 << 3;
        const ARITHMETIC = 1 << 4;
        /// Native compare results convert to lane bits (movemask / k-register read).
        const MASK_TO_BITS = 1 << 5;
        /// The register may be used with fewer lanes than it holds.
        const PARTIAL = 1 << 6;
        /// Compare results live in a dedicated bitmask register.
        const BITMASK_REGISTER = 1 << 7;

        /// What a value type needs from a chunk to be fully usable.
        const FULL = Self::BROADCAST.bits()
            | Self::LOAD.bits()
            | Self::STORE.bits()
            | Self::COMPARE.bits()
            | Self::ARITHMETIC.bits()
            | Self::MASK_TO_BITS.bits();
    }
}

bitflags! {
    /// Element kinds a register class can hold.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ElementSupport: u16 {
        const I8 = 1 << 0;
        const I16 = 1 << 1;
        const I32 = 1 << 2;
        const I64 = 1 << 3;
        const U8 = 1 << 4;
        const U16 = 1 << 5;
        const U32 = 1 << 6;
        const U64 = 1 << 7;
        const F32 = 1 << 8;
        const F64 = 1 << 9;

        const INT8 = Self::I8.bits() | Self::U8.bits();
        const INT16 = Self::I16.bits() | Self::U16.bits();
        const INT32 = Self::I32.bits() | Self::U32.bits();
        const INT64 = Self::I64.bits() | Self::U64.bits();
        const NARROW_INTS = Self::INT8.bits() | Self::INT16.bits();
        const WIDE_INTS = Self::INT32.bits() | Self::INT64.bits();
        const FLOATS = Self::F32.bits() | Self::F64.bits();
    }
}

impl ElementSupport {
    /// The flag a register must carry to hold `ty`. Complex pairs need
    /// their component float.
    pub const fn of(ty: ElementType) -> Self {
        match ty.component() {
            ElementType::I8 => Self::I8,
            ElementType::I16 => Self::I16,
            ElementType::I32 => Self::I32,
            ElementType::I64 => Self::I64,
            ElementType::U8 => Self::U8,
            ElementType::U16 => Self::U16,
            ElementType::U32 => Self::U32,
            ElementType::U64 => Self::U64,
            ElementType::F32 | ElementType::Complex32 => Self::F32,
            ElementType::F64 | ElementType::Complex64 => Self::F64,
        }
    }
}

/// Instruction-set family a register class belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Isa {
    Scalar,
    Sse,
    Avx,
    Avx512,
    Neon,
    /// Hand-described registers (custom catalogs, planning experiments).
    Generic,
}

impl Isa {
    pub const fn name(self) -> &'static str {
        match self {
            Isa::Scalar => "scalar",
            Isa::Sse => "sse",
            Isa::Avx => "avx",
            Isa::Avx512 => "avx512",
            Isa::Neon => "neon",
            Isa::Generic => "generic",
        }
    }
}

impl fmt::Display for Isa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a chunk reports compare results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaskRepr {
    /// One all-ones/all-zeros lane per element, same width as the data.
    Vector,
    /// One bit per element in a mask register.
    Bitmask,
}

// ============================================================================
// Register classes
// ============================================================================

/// One hardware vector register width, as the catalog sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterClass {
    pub name: String,
    pub isa: Isa,
    /// Register width in bytes. Ignored for `Isa::Scalar`, which always
    /// holds exactly one element.
    pub bytes: usize,
    pub alignment: usize,
    pub elements: ElementSupport,
    pub capabilities: Capabilities,
}

impl RegisterClass {
    pub fn new(
        name: impl Into<String>,
        isa: Isa,
        bytes: usize,
        elements: ElementSupport,
        capabilities: Capabilities,
    ) -> Self {
        Self {
            name: name.into(),
            isa,
            bytes,
            alignment: bytes,
            elements,
            capabilities,
        }
    }

    pub fn is_scalar(&self) -> bool {
        self.isa == Isa::Scalar
    }

    pub fn supports(&self, ty: ElementType) -> bool {
        self.elements.contains(ElementSupport::of(ty))
    }

    /// Lanes of `ty` the register holds when fully used.
    pub fn lanes_for(&self, ty: ElementType) -> Option<usize> {
        if !self.supports(ty) {
            return None;
        }
        if self.is_scalar() {
            return Some(1);
        }
        match self.bytes / ty.size_bytes() {
            0 => None,
            lanes => Some(lanes),
        }
    }

    /// Ordering key: scalar classes sort after every vector class.
    fn width_rank(&self) -> usize {
        if self.is_scalar() {
            0
        } else {
            self.bytes
        }
    }

    fn validate(&self) -> Result<()> {
        let pow2 = |v: usize| v != 0 && v.is_power_of_two();
        if !self.is_scalar() && !pow2(self.bytes) {
            return Err(AbiError::InvalidRegister(format!(
                "{}: width {} is not a power of two",
                self.name, self.bytes
            )));
        }
        if !pow2(self.alignment) {
            return Err(AbiError::InvalidRegister(format!(
                "{}: alignment {} is not a power of two",
                self.name, self.alignment
            )));
        }
        for ty in ElementType::ALL {
            if let Some(lanes) = self.lanes_for(ty).filter(|l| *l > MAX_CHUNK_LANES) {
                return Err(AbiError::InvalidRegister(format!(
                    "{}: {} lanes of {} exceed the {}-lane chunk limit",
                    self.name, lanes, ty, MAX_CHUNK_LANES
                )));
            }
        }
        Ok(())
    }

    fn shape(&self, index: usize, ty: ElementType, lanes: usize, full_lanes: usize) -> NativeShape {
        let bits = if self.is_scalar() {
            ty.size_bytes() * 8
        } else {
            self.bytes * 8
        };
        let alignment = if self.is_scalar() {
            ty.size_bytes()
        } else {
            self.alignment
        };
        NativeShape {
            register: index,
            isa: self.isa,
            bits,
            element: ty,
            lanes,
            full_lanes,
            alignment,
            capabilities: self.capabilities,
            mask: if self.capabilities.contains(Capabilities::BITMASK_REGISTER) {
                MaskRepr::Bitmask
            } else {
                MaskRepr::Vector
            },
        }
    }
}

// ============================================================================
// Native shapes
// ============================================================================

/// A register class specialized to one element kind and a used lane count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct NativeShape {
    /// Index of the register class in its catalog.
    pub register: usize,
    pub isa: Isa,
    /// Register width in bits.
    pub bits: usize,
    pub element: ElementType,
    /// Logical lanes in use.
    pub lanes: usize,
    /// Lanes the register holds; padding is `full_lanes - lanes`.
    pub full_lanes: usize,
    pub alignment: usize,
    pub capabilities: Capabilities,
    pub mask: MaskRepr,
}

impl NativeShape {
    pub fn is_partial(&self) -> bool {
        self.lanes < self.full_lanes
    }

    pub fn padding_lanes(&self) -> usize {
        self.full_lanes - self.lanes
    }

    /// Bytes the chunk occupies in storage, padding included.
    pub fn storage_bytes(&self) -> usize {
        self.full_lanes * self.element.size_bytes()
    }
}

impl fmt::Display for NativeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.isa == Isa::Scalar {
            write!(f, "scalar:{}", self.lanes)
        } else {
            write!(f, "{}[{}]:{}", self.isa, self.bits, self.lanes)?;
            if self.is_partial() {
                write!(f, "/{}", self.full_lanes)?;
            }
            Ok(())
        }
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Immutable, priority-ordered register classes for one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NativeChunkCatalog {
    registers: Vec<RegisterClass>,
}

impl NativeChunkCatalog {
    /// Catalog for a feature set, assembled from the per-ISA providers.
    pub fn for_target(features: &TargetFeatures) -> Self {
        let mut registers = x86::registers(features);
        registers.extend(arm::registers(features));
        registers.extend(scalar::registers());
        debug!(
            "catalog for {:?}: {}",
            features,
            registers
                .iter()
                .map(|r| r.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        // Providers emit valid, ordered lists; sorting keeps the invariant
        // if one ever doesn't.
        Self::sorted(registers)
    }

    /// Catalog from hand-described register classes.
    ///
    /// Classes are ordered widest-first (stable, so declared order breaks
    /// ties) and a scalar class is appended when none is given.
    pub fn from_registers(registers: Vec<RegisterClass>) -> Result<Self> {
        for reg in &registers {
            reg.validate()?;
        }
        let mut registers = registers;
        if !registers.iter().any(RegisterClass::is_scalar) {
            registers.extend(scalar::registers());
        }
        Ok(Self::sorted(registers))
    }

    fn sorted(mut registers: Vec<RegisterClass>) -> Self {
        registers.sort_by(|a, b| b.width_rank().cmp(&a.width_rank()));
        Self { registers }
    }

    pub fn registers(&self) -> &[RegisterClass] {
        &self.registers
    }

    pub fn supports(&self, ty: ElementType) -> bool {
        self.registers.iter().any(|r| r.supports(ty))
    }

    /// Fully used shapes for `ty`, in priority order.
    pub fn shapes_for(&self, ty: ElementType) -> Vec<NativeShape> {
        self.registers
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.lanes_for(ty).map(|full| r.shape(i, ty, full, full)))
            .collect()
    }

    /// Lane count of the widest register holding `ty`.
    pub fn widest_lanes(&self, ty: ElementType) -> Option<usize> {
        self.registers.iter().filter_map(|r| r.lanes_for(ty)).max()
    }

    /// The widest shape for `ty` with every capability a value type needs.
    pub fn preferred_shape(&self, ty: ElementType) -> Option<NativeShape> {
        self.registers
            .iter()
            .enumerate()
            .filter(|(_, r)| r.capabilities.contains(Capabilities::FULL))
            .find_map(|(i, r)| r.lanes_for(ty).map(|full| r.shape(i, ty, full, full)))
    }

    /// The tightest shape that holds exactly `lanes` lanes of `ty`.
    ///
    /// A register qualifies when it holds `lanes` exactly, or when it
    /// allows partial use and its padded size stays below
    /// `padding_ratio * lanes`. The smallest padded size wins; equal sizes
    /// go to the higher-priority register.
    pub fn best_shape(&self, ty: ElementType, lanes: usize, padding_ratio: usize) -> Option<NativeShape> {
        let mut best: Option<(usize, usize)> = None;
        for (i, reg) in self.registers.iter().enumerate() {
            let Some(full) = reg.lanes_for(ty) else {
                continue;
            };
            let fits = full == lanes
                || (full > lanes
                    && reg.capabilities.contains(Capabilities::PARTIAL)
                    && full < padding_ratio.saturating_mul(lanes));
            if !fits {
                continue;
            }
            match best {
                Some((best_full, _)) if best_full <= full => {}
                _ => best = Some((full, i)),
            }
        }
        best.map(|(full, i)| self.registers[i].shape(i, ty, lanes, full))
    }

    /// The one-lane shape for `ty`.
    pub fn scalar_shape(&self, ty: ElementType) -> Option<NativeShape> {
        self.best_shape(ty, 1, 1)
    }
}

impl fmt::Display for NativeChunkCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, reg) in self.registers.iter().enumerate() {
            writeln!(
                f,
                "{:>2}  {:<16} {:<7} {:>4} bytes  align {:>3}  elements {:?}  caps {:?}",
                i, reg.name, reg.isa, reg.bytes, reg.alignment, reg.elements, reg.capabilities
            )?;
        }
        Ok(())
    }
}

static NATIVE_CATALOG: Lazy<NativeChunkCatalog> = Lazy::new(|| {
    let features = TargetFeatures::detect();
    let catalog = NativeChunkCatalog::for_target(&features);
    info!(
        "native chunk catalog built with {} register classes",
        catalog.registers().len()
    );
    catalog
});

/// The build target's catalog, built on first use.
pub fn native() -> &'static NativeChunkCatalog {
    &NATIVE_CATALOG
}
