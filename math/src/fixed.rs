//! Fixed-point numeric types.
//!
//! Rates, square roots and random variates are carried as [Accum] (signed
//! 16.15 in a 32-bit word). Probabilities and the tick length in seconds are
//! carried as [UFract] (unsigned 0.32). Both types are plain words so that a
//! persisted parameter block reloads to exactly the same values.
//!
//! # Rounding
//!
//! Conversions from [Accum] to integers round half up: half of the weight of
//! the least significant integer bit is added before flooring.

use core::{
    fmt,
    ops::{Add, Mul, Neg, Sub},
};

/// Signed fixed-point value with 15 fractional bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Accum(i32);

impl Accum {
    /// Number of fractional bits.
    pub const FRACTIONAL_BITS: u32 = 15;

    /// The value `0.0`.
    pub const ZERO: Self = Self(0);

    /// The value `0.5`.
    pub const HALF: Self = Self(1 << (Self::FRACTIONAL_BITS - 1));

    /// The value `1.0`.
    pub const ONE: Self = Self(1 << Self::FRACTIONAL_BITS);

    /// The largest representable value (just under `65536.0`).
    pub const MAX: Self = Self(i32::MAX);

    /// The smallest representable value (`-65536.0`).
    pub const MIN: Self = Self(i32::MIN);

    /// Creates a value from its raw bit pattern.
    #[inline]
    pub const fn from_bits(bits: i32) -> Self {
        Self(bits)
    }

    /// Returns the raw bit pattern.
    #[inline]
    pub const fn to_bits(self) -> i32 {
        self.0
    }

    /// Creates a value from an integer.
    #[inline]
    pub const fn from_int(value: i16) -> Self {
        Self((value as i32) << Self::FRACTIONAL_BITS)
    }

    /// Converts from a float, rounding to the nearest representable value and
    /// saturating at the bounds.
    pub fn from_f64(value: f64) -> Self {
        let scaled = (value * f64::from(1u32 << Self::FRACTIONAL_BITS)).round();
        Self(scaled.clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32)
    }

    /// Converts to a float (exact).
    pub fn to_f64(self) -> f64 {
        f64::from(self.0) / f64::from(1u32 << Self::FRACTIONAL_BITS)
    }

    #[inline]
    fn saturate(wide: i64) -> Self {
        Self(wide.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32)
    }

    /// Multiplies by an unsigned fraction (the result never grows in magnitude).
    #[inline]
    pub fn mul_fract(self, fract: UFract) -> Self {
        Self(((i64::from(self.0) * i64::from(fract.0)) >> UFract::FRACTIONAL_BITS) as i32)
    }

    /// Square root, rounded down to the nearest representable value.
    ///
    /// Negative inputs yield zero.
    pub fn sqrt(self) -> Self {
        if self.0 <= 0 {
            return Self::ZERO;
        }
        // sqrt(b / 2^15) * 2^15 == sqrt(b * 2^15)
        let root = isqrt((self.0 as u64) << Self::FRACTIONAL_BITS);
        Self(root as i32)
    }

    /// Returns `floor(1 / self)` as an integer, or `0` if `self` is not positive.
    pub fn recip_floor(self) -> u32 {
        if self.0 <= 0 {
            return 0;
        }
        // 1 / (b / 2^15) == 2^15 / b
        (1u32 << Self::FRACTIONAL_BITS) / self.0 as u32
    }

    /// Returns `round(self * scale)` for non-negative values, saturating at
    /// `u32::MAX`. Negative values yield zero.
    pub fn scale_round(self, scale: u32) -> u32 {
        if self.0 <= 0 {
            return 0;
        }
        let wide = (i64::from(self.0) * i64::from(scale) + i64::from(Self::HALF.0))
            >> Self::FRACTIONAL_BITS;
        u32::try_from(wide).unwrap_or(u32::MAX)
    }

    /// Returns `round(self * self)`, saturating at `u32::MAX`.
    pub fn square_round(self) -> u32 {
        let bits = i64::from(self.0).unsigned_abs();
        // (b / 2^15)^2 == b^2 / 2^30
        let shift = 2 * Self::FRACTIONAL_BITS;
        let wide = (u128::from(bits) * u128::from(bits) + (1u128 << (shift - 1))) >> shift;
        u32::try_from(wide).unwrap_or(u32::MAX)
    }
}

impl Add for Accum {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Accum {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Mul for Accum {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self::saturate((i64::from(self.0) * i64::from(rhs.0)) >> Self::FRACTIONAL_BITS)
    }
}

impl Neg for Accum {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self(self.0.saturating_neg())
    }
}

impl fmt::Display for Accum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5}", self.to_f64())
    }
}

/// Unsigned fixed-point fraction with 32 fractional bits (`[0, 1)`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UFract(u32);

impl UFract {
    /// Number of fractional bits.
    pub const FRACTIONAL_BITS: u32 = 32;

    /// The value `0.0`.
    pub const ZERO: Self = Self(0);

    /// The largest representable value, the closest the type gets to `1.0`.
    pub const MAX: Self = Self(u32::MAX);

    /// Creates a value from its raw bit pattern.
    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the raw bit pattern.
    #[inline]
    pub const fn to_bits(self) -> u32 {
        self.0
    }

    /// Converts from a float, rounding to nearest and clamping to `[0, MAX]`.
    pub fn from_f64(value: f64) -> Self {
        let scaled = (value * 2f64.powi(Self::FRACTIONAL_BITS as i32)).round();
        Self(scaled.clamp(0.0, f64::from(u32::MAX)) as u32)
    }

    /// Converts to a float (exact).
    pub fn to_f64(self) -> f64 {
        f64::from(self.0) / 2f64.powi(Self::FRACTIONAL_BITS as i32)
    }

    /// Returns `exp(-x)` for a non-negative `x` (negative inputs clamp to `MAX`).
    ///
    /// Values too small to represent underflow to exactly [UFract::ZERO].
    pub fn exp_neg(x: Accum) -> Self {
        Self::from_f64((-x.to_f64()).exp())
    }

    /// Returns `true` if the value is exactly zero.
    #[inline]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Multiplies two fractions, truncating.
    #[inline]
    pub fn product(self, rhs: Self) -> Self {
        Self(((u64::from(self.0) * u64::from(rhs.0)) >> Self::FRACTIONAL_BITS) as u32)
    }
}

impl fmt::Display for UFract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.9}", self.to_f64())
    }
}

/// Integer square root (floor) by Newton's method.
fn isqrt(n: u64) -> u64 {
    if n < 2 {
        return n;
    }
    let mut x = n;
    let mut y = (x + 1) / 2;
    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }
    x
}
