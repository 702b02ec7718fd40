//! `CellBox`: a closed, axis-aligned interval of lattice cells
//!
//! A `CellBox` is the pair `(lo, hi)` denoting `{x : lo <= x <= hi}`
//! componentwise, cell-centred. A box with `hi[d] < lo[d]` in any
//! dimension is empty; operations on empty regions are no-ops throughout
//! the crate. The algebra here (grow, shift, adjacency, intersection)
//! never allocates.

use crate::geometry::box_iter::CellBoxIter;
use crate::geometry::intvect::{IntVect, SPACE_DIM};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitAndAssign};

/// Closed interval of integer cell indices.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellBox {
    lo: IntVect,
    hi: IntVect,
}

impl Default for CellBox {
    /// The default box is empty.
    #[inline]
    fn default() -> Self {
        CellBox::EMPTY
    }
}

impl CellBox {
    /// A canonical empty box.
    pub const EMPTY: CellBox = CellBox {
        lo: IntVect::ZERO,
        hi: IntVect::splat(-1),
    };

    #[inline]
    pub const fn new(lo: IntVect, hi: IntVect) -> Self {
        CellBox { lo, hi }
    }

    #[inline]
    pub const fn lo(&self) -> IntVect {
        self.lo
    }

    #[inline]
    pub const fn hi(&self) -> IntVect {
        self.hi
    }

    /// True when `hi[d] < lo[d]` in some dimension.
    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.lo.all_le(self.hi)
    }

    /// Number of cells; 0 for an empty box.
    #[inline]
    pub fn size(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        (0..SPACE_DIM)
            .map(|d| (self.hi[d] - self.lo[d] + 1) as usize)
            .product()
    }

    /// Extent `hi - lo + 1` per dimension (may be non-positive when empty).
    #[inline]
    pub fn dimensions(&self) -> IntVect {
        self.hi - self.lo + 1
    }

    /// Translate by `v`.
    #[inline]
    #[must_use]
    pub fn shift(self, v: IntVect) -> CellBox {
        CellBox {
            lo: self.lo + v,
            hi: self.hi + v,
        }
    }

    /// Translate by `amount` cells along dimension `dir`.
    #[inline]
    #[must_use]
    pub fn shift_dir(mut self, amount: i32, dir: usize) -> CellBox {
        self.lo[dir] += amount;
        self.hi[dir] += amount;
        self
    }

    /// Widen symmetrically by `r` cells on every side; negative `r` shrinks.
    #[inline]
    #[must_use]
    pub fn grow(self, r: i32) -> CellBox {
        CellBox {
            lo: self.lo - r,
            hi: self.hi + r,
        }
    }

    /// Widen symmetrically by `r` cells along dimension `dir` only.
    #[inline]
    #[must_use]
    pub fn grow_dir(mut self, r: i32, dir: usize) -> CellBox {
        self.lo[dir] -= r;
        self.hi[dir] += r;
        self
    }

    /// Move the low side out by `r` cells in every dimension; negative
    /// `r` shrinks.
    #[inline]
    #[must_use]
    pub fn grow_lo(self, r: i32) -> CellBox {
        CellBox {
            lo: self.lo - r,
            hi: self.hi,
        }
    }

    /// Move the high side out by `r` cells in every dimension; negative
    /// `r` shrinks. `grow_hi(1)` turns a cell-centred box into the box of
    /// its vertices.
    #[inline]
    #[must_use]
    pub fn grow_hi(self, r: i32) -> CellBox {
        CellBox {
            lo: self.lo,
            hi: self.hi + r,
        }
    }

    /// Move the low side out by `r` cells along `dir`; negative `r` shrinks.
    #[inline]
    #[must_use]
    pub fn grow_lo_dir(mut self, r: i32, dir: usize) -> CellBox {
        self.lo[dir] -= r;
        self
    }

    /// Move the high side out by `r` cells along `dir`; negative `r` shrinks.
    #[inline]
    #[must_use]
    pub fn grow_hi_dir(mut self, r: i32, dir: usize) -> CellBox {
        self.hi[dir] += r;
        self
    }

    /// The slab of width `|w|` adjacent to the face of `self` selected by
    /// `dir` and `side` (`-1` = low face, `+1` = high face).
    ///
    /// For `w > 0` the slab lies outside the box (sharing the face); for
    /// `w < 0` it is the innermost `|w|`-cell edge slab of the box itself.
    /// The distinction selects between the "incoming" ghost slab and the
    /// "outgoing" boundary slab of a box.
    #[must_use]
    pub fn adj_box(self, w: i32, dir: usize, side: i32) -> CellBox {
        debug_assert!(side == -1 || side == 1, "side must be -1 or +1");
        let width = w.abs();
        let mut lo = self.lo;
        let mut hi = self.hi;
        if side < 0 {
            if w > 0 {
                lo[dir] = self.lo[dir] - width;
                hi[dir] = self.lo[dir] - 1;
            } else {
                lo[dir] = self.lo[dir];
                hi[dir] = self.lo[dir] + width - 1;
            }
        } else if w > 0 {
            lo[dir] = self.hi[dir] + 1;
            hi[dir] = self.hi[dir] + width;
        } else {
            lo[dir] = self.hi[dir] - width + 1;
            hi[dir] = self.hi[dir];
        }
        CellBox { lo, hi }
    }

    /// The box flattened to a single cell along `dir` (its low face slab).
    #[inline]
    #[must_use]
    pub fn collapsed(mut self, dir: usize) -> CellBox {
        self.hi[dir] = self.lo[dir];
        self
    }

    /// Inclusive containment of a cell.
    #[inline]
    pub fn contains(&self, iv: IntVect) -> bool {
        self.lo.all_le(iv) && iv.all_le(self.hi)
    }

    /// Inclusive containment of a box; empty boxes are contained trivially.
    #[inline]
    pub fn contains_box(&self, other: &CellBox) -> bool {
        other.is_empty() || (self.lo.all_le(other.lo) && other.hi.all_le(self.hi))
    }

    /// Iterate the cells of the box in Fortran order (first index fastest).
    #[inline]
    pub fn cells(&self) -> CellBoxIter {
        CellBoxIter::new(*self)
    }
}

/// Intersection: `lo = max(lo, lo)`, `hi = min(hi, hi)`; may be empty.
impl BitAnd for CellBox {
    type Output = CellBox;
    #[inline]
    fn bitand(self, rhs: CellBox) -> CellBox {
        CellBox {
            lo: self.lo.max(rhs.lo),
            hi: self.hi.min(rhs.hi),
        }
    }
}

impl BitAndAssign for CellBox {
    #[inline]
    fn bitand_assign(&mut self, rhs: CellBox) {
        *self = *self & rhs;
    }
}

impl fmt::Debug for CellBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for CellBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} .. {}]", self.lo, self.hi)
    }
}
