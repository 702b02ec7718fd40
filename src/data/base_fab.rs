//! `BaseFab<T>`: a contiguous multi-component buffer over one box
//!
//! A fab owns `size(box) × ncomp` elements. Component `c` occupies the
//! contiguous stride `[c·size(box), (c+1)·size(box))`; within a component
//! the cells are laid out in Fortran order (first index fastest). That
//! layout makes rows along dimension 0 contiguous, so region copies and
//! linearisation move whole rows with slice copies.
//!
//! # Invariants
//!
//! - `data.len() == bounds.size() * ncomp` at all times.
//! - For any cell `v` and component `c`, the linear distance between
//!   `(v, c)` and `(v, c+1)` is exactly `bounds.size()`.
//!
//! Region arguments must be contained in the fab's box; violations are
//! reported as [`OutOfBounds`](crate::error::BoxHaloError::OutOfBounds).
//! Operations on empty regions are no-ops.

use crate::error::BoxHaloError;
use crate::exchange::wire::{cast_bytes, cast_bytes_mut};
use crate::geometry::cell_box::CellBox;
use crate::geometry::intvect::{IntVect, SPACE_DIM};
use std::ops::{Index, IndexMut};

/// Component selection mask accepting every component of a copy.
pub const ALL_COMPS: u32 = u32::MAX;

/// Contiguous per-box storage of `ncomp` parallel scalar fields.
#[derive(Clone, Debug, Default)]
pub struct BaseFab<T> {
    bounds: CellBox,
    ncomp: usize,
    data: Vec<T>,
}

impl<T: Clone + Default> BaseFab<T> {
    /// Allocate over `bounds` with `ncomp` components, default-filled.
    pub fn new(bounds: CellBox, ncomp: usize) -> Self {
        Self::with_val(bounds, ncomp, T::default())
    }

    /// Allocate over `bounds` with `ncomp` components, filled with `val`.
    pub fn with_val(bounds: CellBox, ncomp: usize, val: T) -> Self {
        let mut fab = BaseFab::default();
        fab.define_with(bounds, ncomp, val);
        fab
    }

    /// (Re)allocate; previous contents are released.
    pub fn define(&mut self, bounds: CellBox, ncomp: usize) {
        self.define_with(bounds, ncomp, T::default());
    }

    /// (Re)allocate filled with `val`; previous contents are released.
    pub fn define_with(&mut self, bounds: CellBox, ncomp: usize, val: T) {
        self.bounds = bounds;
        self.ncomp = ncomp;
        self.data = vec![val; bounds.size() * ncomp];
    }

    /// Assign `val` to every cell of every component.
    pub fn set_val(&mut self, val: T) {
        self.data.fill(val);
    }

    /// Assign `val` to every cell of component `comp`.
    pub fn set_val_comp(&mut self, comp: usize, val: T) {
        let n = self.bounds.size();
        self.data[comp * n..(comp + 1) * n].fill(val);
    }

    /// Copy `n_comp` components of `src` over `region_src` into this fab
    /// over `region_dst`.
    ///
    /// The regions must have identical shape; the per-cell correspondence
    /// is positional after aligning their lower corners. Component `k` of
    /// the range participates only when bit `k` of `flags` is set
    /// ([`ALL_COMPS`] selects everything).
    pub fn copy(
        &mut self,
        region_dst: CellBox,
        comp_dst: usize,
        src: &BaseFab<T>,
        region_src: CellBox,
        comp_src: usize,
        n_comp: usize,
        flags: u32,
    ) -> Result<(), BoxHaloError> {
        check_congruent(region_dst, region_src)?;
        if region_dst.is_empty() {
            return Ok(());
        }
        self.check_region(region_dst)?;
        src.check_region(region_src)?;
        self.check_comps(comp_dst, n_comp)?;
        src.check_comps(comp_src, n_comp)?;

        let row_len = region_dst.dimensions()[0] as usize;
        let offset = region_src.lo() - region_dst.lo();
        for k in 0..n_comp {
            if flags & (1 << k) == 0 {
                continue;
            }
            for row in region_dst.collapsed(0).cells() {
                let d = self.cell_offset(row, comp_dst + k);
                let s = src.cell_offset(row + offset, comp_src + k);
                self.data[d..d + row_len].clone_from_slice(&src.data[s..s + row_len]);
            }
        }
        Ok(())
    }

    /// Copy the overlapping components of `src` over `region`, regions
    /// aligned (same cells on both sides).
    pub fn copy_region(&mut self, region: CellBox, src: &BaseFab<T>) -> Result<(), BoxHaloError> {
        let n = self.ncomp.min(src.ncomp);
        self.copy(region, 0, src, region, 0, n, ALL_COMPS)
    }

    /// As [`copy`](Self::copy) with `self` as both endpoints, behaving as
    /// if staged through a temporary when the regions overlap.
    pub fn copy_within(
        &mut self,
        region_dst: CellBox,
        comp_dst: usize,
        region_src: CellBox,
        comp_src: usize,
        n_comp: usize,
        flags: u32,
    ) -> Result<(), BoxHaloError> {
        check_congruent(region_dst, region_src)?;
        if region_dst.is_empty() {
            return Ok(());
        }
        self.check_region(region_dst)?;
        self.check_region(region_src)?;
        self.check_comps(comp_dst, n_comp)?;
        self.check_comps(comp_src, n_comp)?;

        let row_len = region_dst.dimensions()[0] as usize;
        let offset = region_src.lo() - region_dst.lo();
        let mut staged: Vec<T> = Vec::with_capacity(region_src.size());
        for k in 0..n_comp {
            if flags & (1 << k) == 0 {
                continue;
            }
            staged.clear();
            for row in region_dst.collapsed(0).cells() {
                let s = self.cell_offset(row + offset, comp_src + k);
                staged.extend_from_slice(&self.data[s..s + row_len]);
            }
            let mut pos = 0;
            for row in region_dst.collapsed(0).cells() {
                let d = self.cell_offset(row, comp_dst + k);
                self.data[d..d + row_len].clone_from_slice(&staged[pos..pos + row_len]);
                pos += row_len;
            }
        }
        Ok(())
    }
}

impl<T> BaseFab<T> {
    /// The box this fab is allocated over.
    #[inline]
    pub fn bounds(&self) -> CellBox {
        self.bounds
    }

    /// Number of components.
    #[inline]
    pub fn ncomp(&self) -> usize {
        self.ncomp
    }

    /// Total element count over all components.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Total storage in bytes.
    #[inline]
    pub fn size_bytes(&self) -> usize {
        self.data.len() * std::mem::size_of::<T>()
    }

    /// Linear offset of `iv` within one component (Fortran order).
    #[inline]
    pub fn index(&self, iv: IntVect) -> usize {
        debug_assert!(self.bounds.contains(iv), "{iv} outside {}", self.bounds);
        let dims = self.bounds.dimensions();
        let mut idx = 0usize;
        let mut stride = 1usize;
        for d in 0..SPACE_DIM {
            idx += (iv[d] - self.bounds.lo()[d]) as usize * stride;
            stride *= dims[d] as usize;
        }
        idx
    }

    /// Flat view of the data, component-major.
    #[inline]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Mutable flat view of the data, component-major.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// The contiguous slice backing component `comp`.
    #[inline]
    pub fn comp_slice(&self, comp: usize) -> &[T] {
        let n = self.bounds.size();
        &self.data[comp * n..(comp + 1) * n]
    }

    /// Element at linear position `lin` of component `comp`.
    #[inline]
    pub fn linear(&self, lin: usize, comp: usize) -> &T {
        &self.data[comp * self.bounds.size() + lin]
    }

    #[inline]
    fn cell_offset(&self, iv: IntVect, comp: usize) -> usize {
        debug_assert!(comp < self.ncomp);
        comp * self.bounds.size() + self.index(iv)
    }

    fn check_region(&self, region: CellBox) -> Result<(), BoxHaloError> {
        if self.bounds.contains_box(&region) {
            Ok(())
        } else {
            Err(BoxHaloError::OutOfBounds {
                region,
                bounds: self.bounds,
            })
        }
    }

    fn check_comps(&self, start: usize, num: usize) -> Result<(), BoxHaloError> {
        if start + num <= self.ncomp {
            Ok(())
        } else {
            Err(BoxHaloError::InvalidComponentRange {
                start,
                num,
                ncomp: self.ncomp,
            })
        }
    }

    /// Bytes needed to linearise `region` over `n_comp` components.
    #[inline]
    pub fn linear_size(region: CellBox, n_comp: usize) -> usize {
        region.size() * n_comp * std::mem::size_of::<T>()
    }
}

impl<T: bytemuck::Pod> BaseFab<T> {
    /// Serialise components `[start_comp, end_comp)` over `region` into
    /// `buf`: component-major, Fortran cell order within a component.
    pub fn linear_out(
        &self,
        buf: &mut [u8],
        region: CellBox,
        start_comp: usize,
        end_comp: usize,
    ) -> Result<(), BoxHaloError> {
        let expected = Self::linear_size(region, end_comp - start_comp);
        if buf.len() != expected {
            return Err(BoxHaloError::BufferLengthMismatch {
                expected,
                got: buf.len(),
            });
        }
        if region.is_empty() {
            return Ok(());
        }
        self.check_region(region)?;
        self.check_comps(start_comp, end_comp - start_comp)?;

        let row_len = region.dimensions()[0] as usize;
        let row_bytes = row_len * std::mem::size_of::<T>();
        let mut pos = 0;
        for c in start_comp..end_comp {
            for row in region.collapsed(0).cells() {
                let s = self.cell_offset(row, c);
                buf[pos..pos + row_bytes].copy_from_slice(cast_bytes(&self.data[s..s + row_len]));
                pos += row_bytes;
            }
        }
        Ok(())
    }

    /// Inverse of [`linear_out`](Self::linear_out).
    pub fn linear_in(
        &mut self,
        buf: &[u8],
        region: CellBox,
        start_comp: usize,
        end_comp: usize,
    ) -> Result<(), BoxHaloError> {
        let expected = Self::linear_size(region, end_comp - start_comp);
        if buf.len() != expected {
            return Err(BoxHaloError::BufferLengthMismatch {
                expected,
                got: buf.len(),
            });
        }
        if region.is_empty() {
            return Ok(());
        }
        self.check_region(region)?;
        self.check_comps(start_comp, end_comp - start_comp)?;

        let row_len = region.dimensions()[0] as usize;
        let row_bytes = row_len * std::mem::size_of::<T>();
        let mut pos = 0;
        for c in start_comp..end_comp {
            for row in region.collapsed(0).cells() {
                let d = self.cell_offset(row, c);
                cast_bytes_mut(&mut self.data[d..d + row_len])
                    .copy_from_slice(&buf[pos..pos + row_bytes]);
                pos += row_bytes;
            }
        }
        Ok(())
    }
}

fn check_congruent(dst: CellBox, src: CellBox) -> Result<(), BoxHaloError> {
    let same_shape = dst.dimensions() == src.dimensions();
    if (dst.is_empty() && src.is_empty()) || same_shape {
        Ok(())
    } else {
        Err(BoxHaloError::RegionSizeMismatch {
            dst: dst.size(),
            src: src.size(),
        })
    }
}

impl<T> Index<(IntVect, usize)> for BaseFab<T> {
    type Output = T;
    #[inline]
    fn index(&self, (iv, comp): (IntVect, usize)) -> &T {
        &self.data[self.cell_offset(iv, comp)]
    }
}

impl<T> IndexMut<(IntVect, usize)> for BaseFab<T> {
    #[inline]
    fn index_mut(&mut self, (iv, comp): (IntVect, usize)) -> &mut T {
        let off = self.cell_offset(iv, comp);
        &mut self.data[off]
    }
}
