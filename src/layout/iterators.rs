//! Iterators over a [`DisjointBoxLayout`]
//!
//! Four external iterators walk the layout: [`LayoutIter`] over every box,
//! [`DataIter`] over the boxes owned by this rank, [`NeighborIter`] over
//! the lattice-adjacent boxes of one position, and [`PeriodicIter`] over
//! its wrap-around images across periodic domain faces. All four are plain
//! stepping state over linear indices; neighbour enumeration walks the
//! 3^D offset stencil with a [`CellBoxIter`].
//!
//! Neighbour selection is controlled by a [`Trim`] mask: an offset whose
//! L1 norm is `n` (codimension-`n` adjacency) is skipped when bit `1 << n`
//! is set. The zero offset is the box itself and is always skipped. A
//! [`Periodic`] mask selects the directions in which the domain wraps.

use crate::geometry::box_iter::CellBoxIter;
use crate::geometry::cell_box::CellBox;
use crate::geometry::intvect::{IntVect, SPACE_DIM};
use crate::layout::box_index::BoxIndex;
use crate::layout::disjoint::DisjointBoxLayout;
use std::ops::{BitOr, BitOrAssign};

/// Codimension mask for neighbour trimming.
///
/// Combine with `|`: `Trim::EDGE | Trim::CORNER` skips codimension-2 and
/// codimension-3 neighbours. The centre bit is implied in every query.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct Trim(pub u32);

impl Trim {
    /// Trim nothing (the centre is still skipped).
    pub const NONE: Trim = Trim(0);
    /// The base box itself; always skipped.
    pub const CENTER: Trim = Trim(1 << 0);
    /// Codimension-1 (face) neighbours.
    pub const FACE: Trim = Trim(1 << 1);
    /// Codimension-2 (edge) neighbours.
    pub const EDGE: Trim = Trim(1 << 2);
    /// Codimension-3 (corner) neighbours.
    pub const CORNER: Trim = Trim(1 << 3);

    /// Whether offsets of L1 norm `norm1` are trimmed.
    #[inline]
    pub fn trims_norm(self, norm1: u32) -> bool {
        ((self.0 | Trim::CENTER.0) >> norm1) & 1 != 0
    }
}

impl BitOr for Trim {
    type Output = Trim;
    #[inline]
    fn bitor(self, rhs: Trim) -> Trim {
        Trim(self.0 | rhs.0)
    }
}

impl BitOrAssign for Trim {
    #[inline]
    fn bitor_assign(&mut self, rhs: Trim) {
        self.0 |= rhs.0;
    }
}

/// Per-axis periodic wrap mask.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct Periodic(pub u32);

impl Periodic {
    pub const NONE: Periodic = Periodic(0);
    pub const X: Periodic = Periodic(1 << 0);
    pub const Y: Periodic = Periodic(1 << 1);
    pub const Z: Periodic = Periodic(1 << 2);
    /// Periodic in every compiled dimension.
    pub const ALL: Periodic = Periodic((1 << SPACE_DIM) - 1);

    /// Whether dimension `dir` wraps.
    #[inline]
    pub fn wraps(self, dir: usize) -> bool {
        (self.0 >> dir) & 1 != 0
    }
}

impl BitOr for Periodic {
    type Output = Periodic;
    #[inline]
    fn bitor(self, rhs: Periodic) -> Periodic {
        Periodic(self.0 | rhs.0)
    }
}

impl BitOrAssign for Periodic {
    #[inline]
    fn bitor_assign(&mut self, rhs: Periodic) {
        self.0 |= rhs.0;
    }
}

/// A neighbour yielded by [`NeighborIter`] or [`PeriodicIter`].
///
/// `dir` is the lattice offset from the base box. For periodic neighbours
/// it points *outward* through the domain face, so the physical shift of
/// the wrapped image is `dir ⊙ domain_dimensions`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Neighbor {
    pub bidx: BoxIndex,
    pub dir: IntVect,
}

/// Enumerates every box in the layout, across all ranks.
#[derive(Clone, Debug)]
pub struct LayoutIter<'a> {
    dbl: &'a DisjointBoxLayout,
    current: usize,
    end: usize,
}

impl<'a> LayoutIter<'a> {
    #[inline]
    pub(crate) fn new(dbl: &'a DisjointBoxLayout) -> Self {
        LayoutIter {
            dbl,
            current: 0,
            end: dbl.num_boxes(),
        }
    }

    /// Identity of the layout this iterator walks.
    #[inline]
    pub fn tag(&self) -> usize {
        self.dbl.tag()
    }
}

impl Iterator for LayoutIter<'_> {
    type Item = BoxIndex;

    #[inline]
    fn next(&mut self) -> Option<BoxIndex> {
        if self.current >= self.end {
            return None;
        }
        let bidx = self.dbl.box_index(self.current);
        self.current += 1;
        Some(bidx)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.end - self.current;
        (n, Some(n))
    }
}

impl ExactSizeIterator for LayoutIter<'_> {}

/// Enumerates the boxes owned by this rank; every yielded index is local.
#[derive(Clone, Debug)]
pub struct DataIter<'a> {
    inner: LayoutIter<'a>,
}

impl<'a> DataIter<'a> {
    #[inline]
    pub(crate) fn new(dbl: &'a DisjointBoxLayout) -> Self {
        let mut inner = LayoutIter::new(dbl);
        inner.current = dbl.local_begin();
        inner.end = dbl.local_end();
        DataIter { inner }
    }

    /// Identity of the layout this iterator walks.
    #[inline]
    pub fn tag(&self) -> usize {
        self.inner.tag()
    }
}

impl Iterator for DataIter<'_> {
    type Item = BoxIndex;

    #[inline]
    fn next(&mut self) -> Option<BoxIndex> {
        self.inner.next()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for DataIter<'_> {}

/// Enumerates the in-domain lattice neighbours of one box.
///
/// The stencil is the 3^D offset box around the base, cropped by the
/// lattice bounds and filtered by the trim mask.
#[derive(Clone, Debug)]
pub struct NeighborIter<'a> {
    dbl: &'a DisjointBoxLayout,
    base: usize,
    offsets: CellBoxIter,
    trim: Trim,
}

impl<'a> NeighborIter<'a> {
    pub(crate) fn new(dbl: &'a DisjointBoxLayout, base: BoxIndex, trim: Trim) -> Self {
        let lattice = dbl.lattice_coords(base.global());
        // Centre the lattice bounds on the base so they crop the stencil.
        let bounds =
            CellBox::new(IntVect::ZERO, dbl.box_dimensions() - 1).shift(-lattice);
        let stencil = CellBox::new(-IntVect::UNIT, IntVect::UNIT) & bounds;
        NeighborIter {
            dbl,
            base: base.global(),
            offsets: stencil.cells(),
            trim,
        }
    }
}

impl Iterator for NeighborIter<'_> {
    type Item = Neighbor;

    fn next(&mut self) -> Option<Neighbor> {
        loop {
            let offset = self.offsets.next()?;
            if self.trim.trims_norm(offset.norm1()) {
                continue;
            }
            let global =
                (self.base as isize + self.dbl.linear_nbr_offset(offset)) as usize;
            return Some(Neighbor {
                bidx: self.dbl.box_index(global),
                dir: offset,
            });
        }
    }
}

/// Enumerates the wrap-around neighbours of one box across periodic faces.
///
/// Only stencil offsets that leave the lattice through a periodic face are
/// produced; in-domain offsets belong to [`NeighborIter`]. The yielded
/// direction points outward, and the yielded index is the box on the
/// opposite side of the domain.
#[derive(Clone, Debug)]
pub struct PeriodicIter<'a> {
    dbl: &'a DisjointBoxLayout,
    base: usize,
    offsets: CellBoxIter,
    /// Lattice bounds centred on the base box.
    bounds: CellBox,
    /// Out-of-lattice strips adjacent to the low/high face per wrapping
    /// dimension; empty in non-periodic dimensions.
    low_strip: [CellBox; SPACE_DIM],
    high_strip: [CellBox; SPACE_DIM],
    trim: Trim,
}

impl<'a> PeriodicIter<'a> {
    pub(crate) fn new(
        dbl: &'a DisjointBoxLayout,
        base: BoxIndex,
        trim: Trim,
        periodic: Periodic,
    ) -> Self {
        let lattice = dbl.lattice_coords(base.global());
        let bounds =
            CellBox::new(IntVect::ZERO, dbl.box_dimensions() - 1).shift(-lattice);

        // Grow the bounds through every periodic face; the offsets we want
        // are those in the grown region but not the original one.
        let mut wrapped_bounds = bounds;
        for d in 0..SPACE_DIM {
            if periodic.wraps(d) {
                wrapped_bounds = wrapped_bounds.grow_dir(1, d);
            }
        }
        let mut low_strip = [CellBox::EMPTY; SPACE_DIM];
        let mut high_strip = [CellBox::EMPTY; SPACE_DIM];
        for d in 0..SPACE_DIM {
            if periodic.wraps(d) {
                let cross = wrapped_bounds.grow_dir(-1, d);
                low_strip[d] = cross.adj_box(1, d, -1);
                high_strip[d] = cross.adj_box(1, d, 1);
            }
        }

        let mut stencil = CellBox::new(-IntVect::UNIT, IntVect::UNIT) & wrapped_bounds;
        // Not adjacent to any periodic face: nothing to enumerate.
        if bounds.contains_box(&stencil) {
            stencil = CellBox::EMPTY;
        }
        PeriodicIter {
            dbl,
            base: base.global(),
            offsets: stencil.cells(),
            bounds,
            low_strip,
            high_strip,
            trim,
        }
    }
}

impl Iterator for PeriodicIter<'_> {
    type Item = Neighbor;

    fn next(&mut self) -> Option<Neighbor> {
        loop {
            let offset = self.offsets.next()?;
            if self.trim.trims_norm(offset.norm1()) || self.bounds.contains(offset) {
                continue;
            }
            // Fold each out-of-lattice component back to the far side.
            let mut wrapped = offset;
            for d in 0..SPACE_DIM {
                if self.low_strip[d].contains(offset) {
                    wrapped[d] += self.dbl.box_dimensions()[d];
                }
                if self.high_strip[d].contains(offset) {
                    wrapped[d] -= self.dbl.box_dimensions()[d];
                }
            }
            let global =
                (self.base as isize + self.dbl.linear_nbr_offset(wrapped)) as usize;
            return Some(Neighbor {
                bidx: self.dbl.box_index(global),
                dir: offset,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::communicator::NoComm;

    fn layout(boxes_per_dim: i32) -> DisjointBoxLayout {
        let domain = CellBox::new(IntVect::ZERO, IntVect::splat(2 * boxes_per_dim - 1));
        DisjointBoxLayout::new(domain, IntVect::splat(2), &NoComm).unwrap()
    }

    #[test]
    fn layout_iter_walks_every_box() {
        let dbl = layout(2);
        let indices: Vec<_> = dbl.iter_all().collect();
        assert_eq!(indices.len(), dbl.num_boxes());
        for (k, bidx) in indices.iter().enumerate() {
            assert_eq!(bidx.global(), k);
            assert_eq!(bidx.local(), Some(k));
        }
    }

    #[test]
    fn data_iter_is_local_restriction() {
        let domain = CellBox::new(IntVect::ZERO, IntVect::splat(3));
        let dbl =
            DisjointBoxLayout::with_ranks(domain, IntVect::splat(2), 1, 2).unwrap();
        let locals: Vec<_> = dbl.iter_local().collect();
        assert_eq!(locals.len(), dbl.local_size());
        assert!(locals.iter().all(|b| b.is_local()));
        assert_eq!(locals[0].global(), dbl.local_begin());
    }

    #[test]
    fn interior_box_has_full_stencil() {
        let dbl = layout(3);
        // Centre of a 3^D lattice.
        let centre = dbl.box_index(dbl.num_boxes() / 2);
        let count = dbl.neighbors(centre, Trim::NONE).count();
        assert_eq!(count, 3usize.pow(SPACE_DIM as u32) - 1);
    }

    #[test]
    fn corner_box_stencil_is_cropped() {
        let dbl = layout(3);
        let corner = dbl.box_index(0);
        let count = dbl.neighbors(corner, Trim::NONE).count();
        assert_eq!(count, 2usize.pow(SPACE_DIM as u32) - 1);
    }

    #[test]
    fn trim_masks_filter_by_codimension() {
        let dbl = layout(3);
        let centre = dbl.box_index(dbl.num_boxes() / 2);
        let faces = dbl
            .neighbors(centre, Trim::EDGE | Trim::CORNER)
            .collect::<Vec<_>>();
        assert_eq!(faces.len(), 2 * SPACE_DIM);
        assert!(faces.iter().all(|n| n.dir.norm1() == 1));

        let untrimmed = dbl.neighbors(centre, Trim::NONE).count();
        let no_corners = dbl.neighbors(centre, Trim::CORNER).count();
        #[cfg(not(any(feature = "dim-1", feature = "dim-2")))]
        assert_eq!(untrimmed - no_corners, 8);
        #[cfg(feature = "dim-2")]
        assert_eq!(untrimmed, no_corners);
        #[cfg(feature = "dim-1")]
        assert_eq!(untrimmed, no_corners);
    }

    #[test]
    fn neighbor_directions_point_at_boxes() {
        let dbl = layout(2);
        let base = dbl.box_index(0);
        for n in dbl.neighbors(base, Trim::NONE) {
            let expect = dbl.box_at(base).shift(n.dir * 2);
            assert_eq!(dbl.box_at(n.bidx), expect);
        }
    }

    #[test]
    fn periodic_iter_empty_for_interior_box() {
        let dbl = layout(3);
        let centre = dbl.box_index(dbl.num_boxes() / 2);
        assert_eq!(
            dbl.periodic_neighbors(centre, Trim::NONE, Periodic::ALL).count(),
            0
        );
    }

    #[test]
    fn periodic_iter_empty_without_mask() {
        let dbl = layout(2);
        let corner = dbl.box_index(0);
        assert_eq!(
            dbl.periodic_neighbors(corner, Trim::NONE, Periodic::NONE).count(),
            0
        );
    }

    #[test]
    fn periodic_wrap_in_x() {
        let dbl = layout(2);
        let base = dbl.box_index(0);
        let nbrs: Vec<_> = dbl
            .periodic_neighbors(base, Trim::EDGE | Trim::CORNER, Periodic::X)
            .collect();
        // One face wrap: out through -x, image is the +x-most box in the row.
        assert_eq!(nbrs.len(), 1);
        let n = &nbrs[0];
        assert_eq!(n.dir[0], -1);
        assert_eq!(n.dir.norm1(), 1);
        assert_eq!(n.bidx.global(), 1);
    }

    #[test]
    fn periodic_wrap_degenerate_single_box_row() {
        // One box per dimension: every periodic image is the box itself.
        let domain = CellBox::new(IntVect::ZERO, IntVect::splat(1));
        let dbl = DisjointBoxLayout::new(domain, IntVect::splat(2), &NoComm).unwrap();
        let base = dbl.box_index(0);
        let nbrs: Vec<_> = dbl
            .periodic_neighbors(base, Trim::EDGE | Trim::CORNER, Periodic::X)
            .collect();
        assert_eq!(nbrs.len(), 2);
        assert!(nbrs.iter().all(|n| n.bidx.global() == 0));
    }

    #[test]
    fn trim_norm_semantics() {
        assert!(Trim::NONE.trims_norm(0));
        assert!(!Trim::NONE.trims_norm(1));
        assert!(Trim::FACE.trims_norm(1));
        assert!((Trim::EDGE | Trim::CORNER).trims_norm(3));
        assert!(!(Trim::EDGE | Trim::CORNER).trims_norm(1));
    }

    #[test]
    fn periodic_mask_semantics() {
        assert!(Periodic::X.wraps(0));
        assert!(!Periodic::X.wraps(SPACE_DIM - 1) || SPACE_DIM == 1);
        assert!(Periodic::ALL.wraps(SPACE_DIM - 1));
    }
}
