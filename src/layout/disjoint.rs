//! `DisjointBoxLayout`: an immutable partition of the problem domain
//!
//! The layout cuts the problem domain into equally-sized boxes arranged on
//! a lattice, assigns each box to a rank in contiguous blocks, and shares
//! the resulting `(box, owner)` table behind an `Arc` so that clones are
//! cheap and every container built on the same layout agrees on identity.
//!
//! # Invariants
//!
//! - Every cell of the domain lies in exactly one box (disjoint cover).
//! - Box `k` occupies `domain.lo + max_box_size ⊙ lattice(k)` with extent
//!   `max_box_size`, where `lattice(k)` delinearizes `k` in Fortran order.
//! - Owners are the block assignment `k * n_ranks / num_boxes`, so each
//!   rank owns the contiguous range `[rank·per_rank, (rank+1)·per_rank)`.
//!
//! These are checked after construction in debug builds and under the
//! `check-invariants` feature, and can be verified manually via
//! [`validate_invariants`](crate::debug_invariants::DebugInvariants::validate_invariants).

use crate::box_debug_assert_ok;
use crate::debug_invariants::DebugInvariants;
use crate::error::BoxHaloError;
use crate::exchange::communicator::Communicator;
use crate::geometry::cell_box::CellBox;
use crate::geometry::intvect::{IntVect, SPACE_DIM};
use crate::layout::box_index::BoxIndex;
use crate::layout::iterators::{DataIter, LayoutIter, NeighborIter, Periodic, PeriodicIter, Trim};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One row of the layout's box table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxEntry {
    /// Cell extent of the box.
    pub bounds: CellBox,
    /// Rank that owns the box.
    pub owner: usize,
}

/// Disjoint (non-overlapping) layout of boxes over a problem domain.
///
/// Clones share the box table; use [`deep_copy`](Self::deep_copy) when a
/// test needs an independent table with a distinct [`tag`](Self::tag).
#[derive(Clone, Debug)]
pub struct DisjointBoxLayout {
    domain: CellBox,
    /// Stride per dimension for linear indexing of the box lattice.
    stride: IntVect,
    /// Number of boxes per dimension.
    num_box: IntVect,
    rank: usize,
    n_ranks: usize,
    local_begin: usize,
    local_count: usize,
    entries: Arc<[BoxEntry]>,
}

impl DisjointBoxLayout {
    /// Partition `domain` into boxes of exactly `max_box_size` cells,
    /// with ownership split over the ranks of `comm`.
    ///
    /// # Errors
    /// `UnevenPartition` when the domain extent is not a multiple of
    /// `max_box_size` in some dimension; `UnevenOwnership` when the box
    /// count is not a multiple of the rank count.
    pub fn new(
        domain: CellBox,
        max_box_size: IntVect,
        comm: &impl Communicator,
    ) -> Result<Self, BoxHaloError> {
        Self::with_ranks(domain, max_box_size, comm.rank(), comm.size())
    }

    /// As [`new`](Self::new), with the rank/size pair given directly.
    pub fn with_ranks(
        domain: CellBox,
        max_box_size: IntVect,
        rank: usize,
        n_ranks: usize,
    ) -> Result<Self, BoxHaloError> {
        debug_assert!(n_ranks > 0 && rank < n_ranks);
        let extent = domain.dimensions();
        let mut num_box = IntVect::ZERO;
        for d in 0..SPACE_DIM {
            if domain.is_empty()
                || max_box_size[d] <= 0
                || extent[d] % max_box_size[d] != 0
            {
                return Err(BoxHaloError::UnevenPartition {
                    domain,
                    max_box_size,
                });
            }
            num_box[d] = extent[d] / max_box_size[d];
        }

        let mut stride = IntVect::ZERO;
        stride[0] = 1;
        for d in 1..SPACE_DIM {
            stride[d] = stride[d - 1] * num_box[d - 1];
        }
        let num_boxes = num_box.product() as usize;

        if num_boxes % n_ranks != 0 {
            return Err(BoxHaloError::UnevenOwnership { num_boxes, n_ranks });
        }
        let per_rank = num_boxes / n_ranks;

        let mut entries = Vec::with_capacity(num_boxes);
        for k in 0..num_boxes {
            let lattice = delinearize(k, num_box);
            let lo = domain.lo() + max_box_size * lattice;
            entries.push(BoxEntry {
                bounds: CellBox::new(lo, lo + max_box_size - 1),
                owner: k / per_rank,
            });
        }

        let dbl = DisjointBoxLayout {
            domain,
            stride,
            num_box,
            rank,
            n_ranks,
            local_begin: rank * per_rank,
            local_count: per_rank,
            entries: entries.into(),
        };
        box_debug_assert_ok!(dbl.validate_invariants(), "DisjointBoxLayout invalid");
        Ok(dbl)
    }

    /// A copy backed by its own box table (distinct [`tag`](Self::tag)).
    pub fn deep_copy(&self) -> Self {
        let mut copy = self.clone();
        copy.entries = self.entries.to_vec().into();
        copy
    }

    /// The problem domain.
    #[inline]
    pub fn problem_domain(&self) -> CellBox {
        self.domain
    }

    /// Process-stable identity of the shared box table, used to verify
    /// that iterators, level data, and plans agree on the layout.
    #[inline]
    pub fn tag(&self) -> usize {
        self.entries.as_ptr() as usize
    }

    /// Total number of boxes.
    #[inline]
    pub fn num_boxes(&self) -> usize {
        self.entries.len()
    }

    /// Number of boxes owned by this rank.
    #[inline]
    pub fn local_size(&self) -> usize {
        self.local_count
    }

    /// First global index owned by this rank.
    #[inline]
    pub fn local_begin(&self) -> usize {
        self.local_begin
    }

    /// One past the last global index owned by this rank.
    #[inline]
    pub fn local_end(&self) -> usize {
        self.local_begin + self.local_count
    }

    /// This rank.
    #[inline]
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Total number of ranks.
    #[inline]
    pub fn n_ranks(&self) -> usize {
        self.n_ranks
    }

    /// Number of boxes per dimension.
    #[inline]
    pub fn box_dimensions(&self) -> IntVect {
        self.num_box
    }

    /// The box named by `bidx`.
    #[inline]
    pub fn box_at(&self, bidx: BoxIndex) -> CellBox {
        self.entries[bidx.global()].bounds
    }

    /// The owning rank of the box named by `bidx`.
    #[inline]
    pub fn owner(&self, bidx: BoxIndex) -> usize {
        self.entries[bidx.global()].owner
    }

    /// A [`BoxIndex`] for the given global position, with the local
    /// position filled in when this rank owns the box.
    #[inline]
    pub fn box_index(&self, global: usize) -> BoxIndex {
        debug_assert!(global < self.num_boxes());
        let local = (global >= self.local_begin && global < self.local_end())
            .then(|| global - self.local_begin);
        BoxIndex::new(global, local)
    }

    /// A [`BoxIndex`] for the `idx`-th locally-owned box.
    #[inline]
    pub fn data_index(&self, idx: usize) -> BoxIndex {
        debug_assert!(idx < self.local_count);
        BoxIndex::new(self.local_begin + idx, Some(idx))
    }

    /// Direct access to a table row by global position (testing aid).
    #[inline]
    pub fn entry(&self, global: usize) -> &BoxEntry {
        &self.entries[global]
    }

    /// Signed linear offset to the lattice neighbour at `offset`.
    #[inline]
    pub fn linear_nbr_offset(&self, offset: IntVect) -> isize {
        (0..SPACE_DIM)
            .map(|d| offset[d] as isize * self.stride[d] as isize)
            .sum()
    }

    /// Lattice coordinates of the box at `global`.
    #[inline]
    pub fn lattice_coords(&self, global: usize) -> IntVect {
        debug_assert!(global < self.num_boxes());
        delinearize(global, self.num_box)
    }

    /// Iterate every box in the layout, across all ranks.
    #[inline]
    pub fn iter_all(&self) -> LayoutIter<'_> {
        LayoutIter::new(self)
    }

    /// Iterate the boxes owned by this rank.
    #[inline]
    pub fn iter_local(&self) -> DataIter<'_> {
        DataIter::new(self)
    }

    /// Iterate the in-domain lattice neighbours of `base`, skipping the
    /// codimensions selected by `trim`.
    #[inline]
    pub fn neighbors(&self, base: BoxIndex, trim: Trim) -> NeighborIter<'_> {
        NeighborIter::new(self, base, trim)
    }

    /// Iterate the wrap-around neighbours of `base` across the periodic
    /// faces enabled by `periodic`, skipping the codimensions selected by
    /// `trim`. Yields nothing when `base` does not touch a periodic face.
    #[inline]
    pub fn periodic_neighbors(
        &self,
        base: BoxIndex,
        trim: Trim,
        periodic: Periodic,
    ) -> PeriodicIter<'_> {
        PeriodicIter::new(self, base, trim, periodic)
    }
}

impl DebugInvariants for DisjointBoxLayout {
    fn debug_assert_invariants(&self) {
        box_debug_assert_ok!(self.validate_invariants(), "DisjointBoxLayout invalid");
    }

    fn validate_invariants(&self) -> Result<(), BoxHaloError> {
        let num_boxes = self.entries.len();
        if num_boxes == 0 || num_boxes % self.n_ranks != 0 {
            return Err(BoxHaloError::UnevenOwnership {
                num_boxes,
                n_ranks: self.n_ranks,
            });
        }
        let per_rank = num_boxes / self.n_ranks;
        let mut covered = 0usize;
        for (k, entry) in self.entries.iter().enumerate() {
            // Each box sits at its lattice position, inside the domain.
            let lattice = delinearize(k, self.num_box);
            let extent = entry.bounds.dimensions();
            let lo = self.domain.lo() + extent * lattice;
            if entry.bounds != CellBox::new(lo, lo + extent - 1)
                || !self.domain.contains_box(&entry.bounds)
            {
                return Err(BoxHaloError::OutOfBounds {
                    region: entry.bounds,
                    bounds: self.domain,
                });
            }
            if entry.owner != k / per_rank {
                return Err(BoxHaloError::NonLocalIndex { global: k });
            }
            covered += entry.bounds.size();
        }
        // Equal sizes + lattice positions make the cover disjoint, so a
        // cell-count match proves the partition property.
        if covered != self.domain.size() {
            return Err(BoxHaloError::UnevenPartition {
                domain: self.domain,
                max_box_size: self.entries[0].bounds.dimensions(),
            });
        }
        Ok(())
    }
}

#[inline]
fn delinearize(mut linear: usize, num_box: IntVect) -> IntVect {
    let mut lattice = IntVect::ZERO;
    for d in 0..SPACE_DIM {
        lattice[d] = (linear % num_box[d] as usize) as i32;
        linear /= num_box[d] as usize;
    }
    lattice
}
