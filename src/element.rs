// src/element.rs

//! Element kinds that a data-parallel value can hold.
//!
//! `ElementType` is the runtime description used by the catalog and the
//! decomposer. The `Element` trait binds a Rust scalar to its
//! `ElementType`; only vectorizable types implement it, so a value type
//! over anything else does not compile.

use core::fmt;
use core::ops::{Add, Div, Mul, Neg, Sub};
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AbiError;

/// Semantic numeric kind of one lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    /// A pair of `f32` (real, imaginary) occupying one logical lane.
    Complex32,
    /// A pair of `f64` (real, imaginary) occupying one logical lane.
    Complex64,
}

impl ElementType {
    /// Every element kind, in declaration order.
    pub const ALL: [ElementType; 12] = [
        ElementType::I8,
        ElementType::I16,
        ElementType::I32,
        ElementType::I64,
        ElementType::U8,
        ElementType::U16,
        ElementType::U32,
        ElementType::U64,
        ElementType::F32,
        ElementType::F64,
        ElementType::Complex32,
        ElementType::Complex64,
    ];

    /// Position in [`ElementType::ALL`].
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Size of one logical lane in bytes.
    pub const fn size_bytes(self) -> usize {
        match self {
            ElementType::I8 | ElementType::U8 => 1,
            ElementType::I16 | ElementType::U16 => 2,
            ElementType::I32 | ElementType::U32 | ElementType::F32 => 4,
            ElementType::I64 | ElementType::U64 | ElementType::F64 | ElementType::Complex32 => 8,
            ElementType::Complex64 => 16,
        }
    }

    pub const fn is_float(self) -> bool {
        matches!(self, ElementType::F32 | ElementType::F64)
    }

    pub const fn is_complex(self) -> bool {
        matches!(self, ElementType::Complex32 | ElementType::Complex64)
    }

    pub const fn is_signed(self) -> bool {
        !matches!(
            self,
            ElementType::U8 | ElementType::U16 | ElementType::U32 | ElementType::U64
        )
    }

    /// The scalar kind a register must support to hold this element.
    ///
    /// For complex pairs this is the component float; for everything else
    /// it is the element itself.
    pub const fn component(self) -> ElementType {
        match self {
            ElementType::Complex32 => ElementType::F32,
            ElementType::Complex64 => ElementType::F64,
            other => other,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ElementType::I8 => "i8",
            ElementType::I16 => "i16",
            ElementType::I32 => "i32",
            ElementType::I64 => "i64",
            ElementType::U8 => "u8",
            ElementType::U16 => "u16",
            ElementType::U32 => "u32",
            ElementType::U64 => "u64",
            ElementType::F32 => "f32",
            ElementType::F64 => "f64",
            ElementType::Complex32 => "complex<f32>",
            ElementType::Complex64 => "complex<f64>",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ElementType {
    type Err = AbiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let ty = match normalized.as_str() {
            "i8" => ElementType::I8,
            "i16" => ElementType::I16,
            "i32" => ElementType::I32,
            "i64" => ElementType::I64,
            "u8" => ElementType::U8,
            "u16" => ElementType::U16,
            "u32" => ElementType::U32,
            "u64" => ElementType::U64,
            "f32" => ElementType::F32,
            "f64" => ElementType::F64,
            "c32" | "complex32" | "complex<f32>" => ElementType::Complex32,
            "c64" | "complex64" | "complex<f64>" => ElementType::Complex64,
            _ => return Err(AbiError::UnknownElement(s.to_string())),
        };
        Ok(ty)
    }
}

// ============================================================================
// Compile-time binding
// ============================================================================

/// A Rust scalar that can occupy one lane of a data-parallel value.
pub trait Element: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// The runtime kind used for ABI deduction.
    const TYPE: ElementType;
}

/// Float lanes: classification queries.
pub trait FloatElement: Element + PartialOrd {
    fn is_nan(self) -> bool;
    fn is_infinite(self) -> bool;
    fn is_finite(self) -> bool;
}

macro_rules! impl_element {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl Element for $ty {
                const TYPE: ElementType = ElementType::$kind;
            }
        )*
    };
}

impl_element! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    Complex<f32> => Complex32,
    Complex<f64> => Complex64,
}

macro_rules! impl_float_element {
    ($($ty:ty),*) => {
        $(
            impl FloatElement for $ty {
                #[inline(always)]
                fn is_nan(self) -> bool {
                    <$ty>::is_nan(self)
                }
                #[inline(always)]
                fn is_infinite(self) -> bool {
                    <$ty>::is_infinite(self)
                }
                #[inline(always)]
                fn is_finite(self) -> bool {
                    <$ty>::is_finite(self)
                }
            }
        )*
    };
}

impl_float_element!(f32, f64);

// ============================================================================
// Complex pair
// ============================================================================

/// Interleaved (real, imaginary) pair stored in one logical lane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[repr(C)]
pub struct Complex<F> {
    pub re: F,
    pub im: F,
}

impl<F> Complex<F> {
    #[inline(always)]
    pub const fn new(re: F, im: F) -> Self {
        Self { re, im }
    }
}

macro_rules! impl_complex_ops {
    ($($f:ty),*) => {
        $(
            impl Complex<$f> {
                #[inline(always)]
                pub fn is_nan(self) -> bool {
                    self.re.is_nan() || self.im.is_nan()
                }
                #[inline(always)]
                pub fn is_infinite(self) -> bool {
                    self.re.is_infinite() || self.im.is_infinite()
                }
                #[inline(always)]
                pub fn norm_sqr(self) -> $f {
                    self.re * self.re + self.im * self.im
                }
            }

            impl Add for Complex<$f> {
                type Output = Self;
                #[inline(always)]
                fn add(self, rhs: Self) -> Self {
                    Self::new(self.re + rhs.re, self.im + rhs.im)
                }
            }

            impl Sub for Complex<$f> {
                type Output = Self;
                #[inline(always)]
                fn sub(self, rhs: Self) -> Self {
                    Self::new(self.re - rhs.re, self.im - rhs.im)
                }
            }

            impl Mul for Complex<$f> {
                type Output = Self;
                #[inline(always)]
                fn mul(self, rhs: Self) -> Self {
                    Self::new(
                        self.re * rhs.re - self.im * rhs.im,
                        self.re * rhs.im + self.im * rhs.re,
                    )
                }
            }

            impl Div for Complex<$f> {
                type Output = Self;
                #[inline(always)]
                fn div(self, rhs: Self) -> Self {
                    let d = rhs.norm_sqr();
                    Self::new(
                        (self.re * rhs.re + self.im * rhs.im) / d,
                        (self.im * rhs.re - self.re * rhs.im) / d,
                    )
                }
            }

            impl Neg for Complex<$f> {
                type Output = Self;
                #[inline(always)]
                fn neg(self) -> Self {
                    Self::new(-self.re, -self.im)
                }
            }
        )*
    };
}

impl_complex_ops!(f32, f64);
