//! `IntVect`: a point on the integer lattice
//!
//! An `IntVect` is an ordered tuple of `SPACE_DIM` signed integers with
//! componentwise arithmetic. It is the coordinate type for cells, box
//! corners, neighbour offsets, and shifts. All operations are total and
//! none allocate.
//!
//! The spatial dimension is fixed at build time: 3 by default, or 1/2 via
//! the `dim-1`/`dim-2` cargo features. The element scalar for field data,
//! [`Real`], is `f64` by default and `f32` under `real-f32`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Index, IndexMut, Mul, Neg, Sub, SubAssign};

#[cfg(all(feature = "dim-1", feature = "dim-2"))]
compile_error!("features `dim-1` and `dim-2` are mutually exclusive");

/// Number of spatial dimensions, fixed at build time.
#[cfg(feature = "dim-1")]
pub const SPACE_DIM: usize = 1;
/// Number of spatial dimensions, fixed at build time.
#[cfg(all(feature = "dim-2", not(feature = "dim-1")))]
pub const SPACE_DIM: usize = 2;
/// Number of spatial dimensions, fixed at build time.
#[cfg(not(any(feature = "dim-1", feature = "dim-2")))]
pub const SPACE_DIM: usize = 3;

/// Element scalar for field data.
#[cfg(feature = "real-f32")]
pub type Real = f32;
/// Element scalar for field data.
#[cfg(not(feature = "real-f32"))]
pub type Real = f64;

/// A point on the `SPACE_DIM`-dimensional integer lattice.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct IntVect([i32; SPACE_DIM]);

impl IntVect {
    /// All components 0.
    pub const ZERO: IntVect = IntVect([0; SPACE_DIM]);
    /// All components 1.
    pub const UNIT: IntVect = IntVect([1; SPACE_DIM]);

    #[inline]
    pub const fn new(components: [i32; SPACE_DIM]) -> Self {
        IntVect(components)
    }

    /// All components equal to `v`.
    #[inline]
    pub const fn splat(v: i32) -> Self {
        IntVect([v; SPACE_DIM])
    }

    /// Componentwise minimum.
    #[inline]
    pub fn min(self, other: IntVect) -> IntVect {
        self.zip_with(other, i32::min)
    }

    /// Componentwise maximum.
    #[inline]
    pub fn max(self, other: IntVect) -> IntVect {
        self.zip_with(other, i32::max)
    }

    /// L1 norm: sum of absolute component values.
    #[inline]
    pub fn norm1(self) -> u32 {
        self.0.iter().map(|c| c.unsigned_abs()).sum()
    }

    /// Sum of components.
    #[inline]
    pub fn sum(self) -> i32 {
        self.0.iter().sum()
    }

    /// Product of components.
    #[inline]
    pub fn product(self) -> i32 {
        self.0.iter().product()
    }

    /// `self[d] <= other[d]` in every dimension.
    #[inline]
    pub fn all_le(self, other: IntVect) -> bool {
        self.0.iter().zip(other.0.iter()).all(|(a, b)| a <= b)
    }

    /// `self[d] < other[d]` in every dimension.
    #[inline]
    pub fn all_lt(self, other: IntVect) -> bool {
        self.0.iter().zip(other.0.iter()).all(|(a, b)| a < b)
    }

    /// `self[d] >= other[d]` in every dimension.
    #[inline]
    pub fn all_ge(self, other: IntVect) -> bool {
        other.all_le(self)
    }

    /// `self[d] > other[d]` in every dimension.
    #[inline]
    pub fn all_gt(self, other: IntVect) -> bool {
        other.all_lt(self)
    }

    #[inline]
    fn zip_with(self, other: IntVect, f: impl Fn(i32, i32) -> i32) -> IntVect {
        let mut out = self;
        for d in 0..SPACE_DIM {
            out.0[d] = f(self.0[d], other.0[d]);
        }
        out
    }
}

impl From<[i32; SPACE_DIM]> for IntVect {
    #[inline]
    fn from(components: [i32; SPACE_DIM]) -> Self {
        IntVect(components)
    }
}

impl Index<usize> for IntVect {
    type Output = i32;
    #[inline]
    fn index(&self, d: usize) -> &i32 {
        &self.0[d]
    }
}

impl IndexMut<usize> for IntVect {
    #[inline]
    fn index_mut(&mut self, d: usize) -> &mut i32 {
        &mut self.0[d]
    }
}

impl Add for IntVect {
    type Output = IntVect;
    #[inline]
    fn add(self, rhs: IntVect) -> IntVect {
        self.zip_with(rhs, |a, b| a + b)
    }
}

impl Sub for IntVect {
    type Output = IntVect;
    #[inline]
    fn sub(self, rhs: IntVect) -> IntVect {
        self.zip_with(rhs, |a, b| a - b)
    }
}

impl Add<i32> for IntVect {
    type Output = IntVect;
    #[inline]
    fn add(self, rhs: i32) -> IntVect {
        self.zip_with(IntVect::splat(rhs), |a, b| a + b)
    }
}

impl Sub<i32> for IntVect {
    type Output = IntVect;
    #[inline]
    fn sub(self, rhs: i32) -> IntVect {
        self.zip_with(IntVect::splat(rhs), |a, b| a - b)
    }
}

impl AddAssign for IntVect {
    #[inline]
    fn add_assign(&mut self, rhs: IntVect) {
        *self = *self + rhs;
    }
}

impl SubAssign for IntVect {
    #[inline]
    fn sub_assign(&mut self, rhs: IntVect) {
        *self = *self - rhs;
    }
}

impl AddAssign<i32> for IntVect {
    #[inline]
    fn add_assign(&mut self, rhs: i32) {
        *self = *self + rhs;
    }
}

impl SubAssign<i32> for IntVect {
    #[inline]
    fn sub_assign(&mut self, rhs: i32) {
        *self = *self - rhs;
    }
}

impl Neg for IntVect {
    type Output = IntVect;
    #[inline]
    fn neg(self) -> IntVect {
        self.zip_with(IntVect::ZERO, |a, _| -a)
    }
}

/// Componentwise product.
impl Mul for IntVect {
    type Output = IntVect;
    #[inline]
    fn mul(self, rhs: IntVect) -> IntVect {
        self.zip_with(rhs, |a, b| a * b)
    }
}

impl Mul<i32> for IntVect {
    type Output = IntVect;
    #[inline]
    fn mul(self, rhs: i32) -> IntVect {
        self.zip_with(IntVect::splat(rhs), |a, b| a * b)
    }
}

impl Mul<IntVect> for i32 {
    type Output = IntVect;
    #[inline]
    fn mul(self, rhs: IntVect) -> IntVect {
        rhs * self
    }
}

impl fmt::Debug for IntVect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for IntVect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for d in 0..SPACE_DIM {
            if d > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", self.0[d])?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod layout_tests {
    //! Compile-time assertion that `IntVect` stays a bare coordinate array.
    use super::*;
    use static_assertions::assert_eq_size;

    assert_eq_size!(IntVect, [i32; SPACE_DIM]);
}
