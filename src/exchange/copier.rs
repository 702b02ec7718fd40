//! `Copier`: the cached ghost-exchange plan
//!
//! A copier is built once from a layout, a ghost radius, a component
//! range, and the periodicity and trim masks, and is replayed by every
//! subsequent exchange. Each [`Motion2Way`] item describes one planned
//! movement between an ordered pair of boxes: the region received into the
//! local box, the region sent from it, the matching tags, and — when the
//! pair spans ranks — the message buffers, sized once and reused.
//!
//! # Regions
//!
//! For a local box `L` with ghost radius `g` and a neighbour `R` (shifted
//! to its periodic image where applicable):
//!
//! - `region_recv = grow(L, g) ∩ R` — the slice of our ghost slab that `R`
//!   covers;
//! - `region_send = L ∩ grow(R, g)` — the slice of our valid cells that
//!   `R`'s ghost slab covers;
//! - `region_send_remote` — the cells of `region_recv` expressed in the
//!   sender's frame: identical for interior pairs, shifted across the
//!   domain for periodic pairs. Intra-rank motions copy straight from it.
//!
//! All three hold the same number of cells.
//!
//! # Tags
//!
//! A motion's send tag is `27·globalIndex(sender) + enc(dir)` with
//! `enc(d) = Σ_k 3^k (d_k + 1)`; its receive tag is the tag the remote
//! side computes for the opposite direction. Tags are therefore unique
//! program-wide, which is stricter than the per-channel uniqueness the
//! matching needs, and lets out-of-order arrivals rematch to the right
//! motion item.

use crate::box_debug_assert_ok;
use crate::data::level_data::LevelData;
use crate::debug_invariants::DebugInvariants;
use crate::error::BoxHaloError;
use crate::exchange::communicator::Communicator;
use crate::geometry::cell_box::CellBox;
use crate::geometry::intvect::{IntVect, SPACE_DIM};
use crate::layout::box_index::BoxIndex;
use crate::layout::disjoint::DisjointBoxLayout;
use crate::layout::iterators::{Periodic, Trim};

/// One planned data movement between an ordered pair of boxes.
#[derive(Debug)]
pub struct Motion2Way {
    pub(crate) bidx_local: BoxIndex,
    pub(crate) bidx_remote: BoxIndex,
    pub(crate) region_recv: CellBox,
    pub(crate) region_send: CellBox,
    pub(crate) region_send_remote: CellBox,
    local_rank: usize,
    pub(crate) remote_rank: usize,
    pub(crate) tag_send: u32,
    pub(crate) tag_recv: u32,
    send_dir: IntVect,
    pub(crate) comp_recv_flags: u32,
    pub(crate) comp_send_flags: u32,
    pub(crate) send_buf: Vec<u8>,
    pub(crate) recv_buf: Vec<u8>,
}

impl Motion2Way {
    #[allow(clippy::too_many_arguments)]
    fn new(
        bytes_per_cell: usize,
        dbl: &DisjointBoxLayout,
        bidx_local: BoxIndex,
        bidx_remote: BoxIndex,
        region_recv: CellBox,
        region_send: CellBox,
        region_send_remote: CellBox,
        send_dir: IntVect,
    ) -> Self {
        let local_rank = dbl.owner(bidx_local);
        let remote_rank = dbl.owner(bidx_remote);
        let mut motion = Motion2Way {
            bidx_local,
            bidx_remote,
            region_recv,
            region_send,
            region_send_remote,
            local_rank,
            remote_rank,
            tag_send: Self::unique_tag(bidx_local.global(), send_dir),
            tag_recv: Self::unique_tag(bidx_remote.global(), -send_dir),
            send_dir,
            comp_recv_flags: u32::MAX,
            comp_send_flags: u32::MAX,
            send_buf: Vec::new(),
            recv_buf: Vec::new(),
        };
        if !motion.is_local() {
            motion.send_buf = vec![0u8; bytes_per_cell * region_send.size()];
            motion.recv_buf = vec![0u8; bytes_per_cell * region_recv.size()];
        }
        motion
    }

    /// Program-wide unique tag for a message leaving `sender_global` in
    /// direction `dir`.
    #[inline]
    pub fn unique_tag(sender_global: usize, dir: IntVect) -> u32 {
        let mut enc = 0u32;
        for d in 0..SPACE_DIM {
            enc += 3u32.pow(d as u32) * (dir[d] + 1) as u32;
        }
        27 * sender_global as u32 + enc
    }

    /// Are both endpoints on the same rank?
    #[inline]
    pub fn is_local(&self) -> bool {
        self.local_rank == self.remote_rank
    }

    /// Index of the local, receiving box.
    #[inline]
    pub fn bidx_recv(&self) -> BoxIndex {
        self.bidx_local
    }

    /// Index of the sending (neighbour) box.
    #[inline]
    pub fn bidx_send(&self) -> BoxIndex {
        self.bidx_remote
    }

    /// Region received into the local box.
    #[inline]
    pub fn region_recv(&self) -> CellBox {
        self.region_recv
    }

    /// Region sent out of the local box (the message payload).
    #[inline]
    pub fn region_send_local(&self) -> CellBox {
        self.region_send
    }

    /// Region sent out of the neighbour box; the source of intra-rank
    /// copies.
    #[inline]
    pub fn region_send_remote(&self) -> CellBox {
        self.region_send_remote
    }

    /// Direction information travels, local box to neighbour.
    #[inline]
    pub fn send_dir(&self) -> IntVect {
        self.send_dir
    }

    /// Direction information arrives from.
    #[inline]
    pub fn recv_dir(&self) -> IntVect {
        -self.send_dir
    }

    /// Rank owning the neighbour box.
    #[inline]
    pub fn remote_rank(&self) -> usize {
        self.remote_rank
    }

    #[inline]
    pub fn tag_send(&self) -> u32 {
        self.tag_send
    }

    #[inline]
    pub fn tag_recv(&self) -> u32 {
        self.tag_recv
    }

    /// Component mask applied to data arriving at the local box.
    #[inline]
    pub fn comp_recv_flags(&self) -> u32 {
        self.comp_recv_flags
    }

    /// Component mask applied to data leaving the local box.
    #[inline]
    pub fn comp_send_flags(&self) -> u32 {
        self.comp_send_flags
    }

    /// Narrow the components arriving at the local box. Bit `k` selects
    /// component `start_comp + k` of the plan's range.
    pub fn set_comp_recv_flags(&mut self, flags: u32) {
        self.comp_recv_flags = flags;
    }

    /// Narrow the components leaving the local box.
    pub fn set_comp_send_flags(&mut self, flags: u32) {
        self.comp_send_flags = flags;
    }
}

/// Cached set of [`Motion2Way`] items for one layout, replayed by every
/// exchange; also owns the in-flight message handles between
/// `exchange_begin` and `exchange_end`.
pub struct Copier<C: Communicator> {
    pub(crate) dbl_tag: usize,
    pub(crate) bytes_per_cell: usize,
    pub(crate) start_comp: usize,
    pub(crate) end_comp: usize,
    pub(crate) motions: Vec<Motion2Way>,
    pub(crate) num_requests: usize,
    pub(crate) pending_sends: Vec<C::SendHandle>,
    pub(crate) pending_recvs: Vec<(usize, C::RecvHandle)>,
}

impl<C: Communicator> Default for Copier<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Communicator> Copier<C> {
    /// An empty plan; define it with [`define_exchange`](Self::define_exchange).
    pub fn new() -> Self {
        Copier {
            dbl_tag: 0,
            bytes_per_cell: 0,
            start_comp: 0,
            end_comp: 0,
            motions: Vec::new(),
            num_requests: 0,
            pending_sends: Vec::new(),
            pending_recvs: Vec::new(),
        }
    }

    /// Plan a ghost exchange covering every component of `level_data`.
    pub fn for_exchange<T>(
        level_data: &LevelData<T>,
        periodic: Periodic,
        trim: Trim,
    ) -> Result<Self, BoxHaloError> {
        Self::for_exchange_comps(level_data, 0, level_data.ncomp(), periodic, trim)
    }

    /// Plan a ghost exchange covering `num_comp` components starting at
    /// `start_comp`.
    pub fn for_exchange_comps<T>(
        level_data: &LevelData<T>,
        start_comp: usize,
        num_comp: usize,
        periodic: Periodic,
        trim: Trim,
    ) -> Result<Self, BoxHaloError> {
        if start_comp + num_comp > level_data.ncomp() {
            return Err(BoxHaloError::InvalidComponentRange {
                start: start_comp,
                num: num_comp,
                ncomp: level_data.ncomp(),
            });
        }
        let mut copier = Self::new();
        copier.define_exchange::<T>(
            level_data.dbl(),
            level_data.nghost(),
            start_comp,
            num_comp,
            periodic,
            trim,
        )?;
        Ok(copier)
    }

    /// (Re)build the plan from a layout. Any prior plan is discarded.
    ///
    /// An exchange with `nghost == 0` moves nothing, so the plan is left
    /// empty in that case.
    pub fn define_exchange<T>(
        &mut self,
        dbl: &DisjointBoxLayout,
        nghost: usize,
        start_comp: usize,
        num_comp: usize,
        periodic: Periodic,
        trim: Trim,
    ) -> Result<(), BoxHaloError> {
        if num_comp == 0 {
            return Err(BoxHaloError::InvalidComponentRange {
                start: start_comp,
                num: num_comp,
                ncomp: 0,
            });
        }
        self.dbl_tag = dbl.tag();
        self.bytes_per_cell = std::mem::size_of::<T>() * num_comp;
        self.start_comp = start_comp;
        self.end_comp = start_comp + num_comp;
        self.motions.clear();
        self.num_requests = 0;
        self.pending_sends.clear();
        self.pending_recvs.clear();
        if nghost == 0 {
            return Ok(());
        }
        let g = nghost as i32;

        // A box strictly inside this shrunken domain cannot touch any
        // periodic face.
        let mut periodic_test_domain = dbl.problem_domain();
        for d in 0..SPACE_DIM {
            if periodic.wraps(d) {
                periodic_test_domain = periodic_test_domain.grow_dir(-1, d);
            }
        }

        self.motions
            .reserve(Self::predicted_motions(trim) * dbl.local_size());

        for bidx in dbl.iter_local() {
            let local_box = dbl.box_at(bidx);

            // Interior neighbours.
            for nbr in dbl.neighbors(bidx, trim) {
                let remote_box = dbl.box_at(nbr.bidx);
                let region_recv = local_box.grow(g) & remote_box;
                let region_send = local_box & remote_box.grow(g);
                self.push_motion(Motion2Way::new(
                    self.bytes_per_cell,
                    dbl,
                    bidx,
                    nbr.bidx,
                    region_recv,
                    region_send,
                    region_recv,
                    nbr.dir,
                ));
            }

            // Periodic neighbours.
            if !periodic_test_domain.contains_box(&local_box) {
                for nbr in dbl.periodic_neighbors(bidx, trim, periodic) {
                    let nbr_box = dbl.box_at(nbr.bidx);
                    // Shift the neighbour (inside the domain) out to its
                    // periodic image adjacent to the local box.
                    let shift_by = (local_box.lo() - nbr_box.lo())
                        + nbr.dir * local_box.dimensions();
                    let shifted = nbr_box.shift(shift_by);
                    let region_recv = local_box.grow(g) & shifted;
                    let region_send = local_box & shifted.grow(g);
                    let region_send_remote = region_recv.shift(-shift_by);
                    self.push_motion(Motion2Way::new(
                        self.bytes_per_cell,
                        dbl,
                        bidx,
                        nbr.bidx,
                        region_recv,
                        region_send,
                        region_send_remote,
                        nbr.dir,
                    ));
                }
            }
        }
        box_debug_assert_ok!(self.validate_invariants(), "Copier invalid");
        Ok(())
    }

    fn push_motion(&mut self, motion: Motion2Way) {
        if !motion.is_local() {
            self.num_requests += 2;
        }
        self.motions.push(motion);
    }

    /// Expected motion count per owned box for a given trim mask: the
    /// number of untrimmed surface hypercubes of the 3^D stencil.
    pub fn predicted_motions(trim: Trim) -> usize {
        let mut count = 0;
        for m in 0..SPACE_DIM {
            let codim = SPACE_DIM - m;
            if !trim.trims_norm(codim as u32) {
                count += (1 << codim) * Self::binomial(SPACE_DIM, m);
            }
        }
        count
    }

    /// Binomial coefficient `C(n, k)`.
    pub fn binomial(n: usize, k: usize) -> usize {
        debug_assert!(k <= n);
        let k = k.min(n - k);
        let mut num = 1usize;
        let mut den = 1usize;
        for i in 0..k {
            num *= n - i;
            den *= i + 1;
        }
        num / den
    }

    /// Identity of the layout this plan was built for.
    #[inline]
    pub fn tag(&self) -> usize {
        self.dbl_tag
    }

    /// Bytes moved per cell (all components of the range).
    #[inline]
    pub fn bytes_per_cell(&self) -> usize {
        self.bytes_per_cell
    }

    /// Number of motion items.
    #[inline]
    pub fn num_motions(&self) -> usize {
        self.motions.len()
    }

    /// The `idx`-th motion item, in construction order.
    #[inline]
    pub fn motion(&self, idx: usize) -> &Motion2Way {
        &self.motions[idx]
    }

    /// Mutable access to a motion item (for component flag overrides).
    #[inline]
    pub fn motion_mut(&mut self, idx: usize) -> &mut Motion2Way {
        &mut self.motions[idx]
    }

    /// Iterate the motion items in construction order.
    pub fn motions(&self) -> impl Iterator<Item = &Motion2Way> {
        self.motions.iter()
    }

    /// Start of the component range.
    #[inline]
    pub fn start_comp(&self) -> usize {
        self.start_comp
    }

    /// One past the end of the component range.
    #[inline]
    pub fn end_comp(&self) -> usize {
        self.end_comp
    }

    /// Number of components in the range.
    #[inline]
    pub fn num_comp(&self) -> usize {
        self.end_comp - self.start_comp
    }

    /// Number of message requests a full exchange posts (two per
    /// inter-rank motion).
    #[inline]
    pub fn num_requests(&self) -> usize {
        self.num_requests
    }

    /// Whether an exchange begun on this plan has not been completed.
    #[inline]
    pub fn in_flight(&self) -> bool {
        !self.pending_sends.is_empty() || !self.pending_recvs.is_empty()
    }
}

impl<C: Communicator> DebugInvariants for Copier<C> {
    fn debug_assert_invariants(&self) {
        box_debug_assert_ok!(self.validate_invariants(), "Copier invalid");
    }

    fn validate_invariants(&self) -> Result<(), BoxHaloError> {
        let mut outbound = std::collections::HashSet::new();
        let mut inbound = std::collections::HashSet::new();
        for motion in &self.motions {
            // The three regions describe the same cells in different
            // frames, so their sizes must agree.
            let n = motion.region_recv.size();
            if motion.region_send_remote.size() != n
                || (!motion.is_local() && motion.region_send.size() != n)
            {
                return Err(BoxHaloError::RegionSizeMismatch {
                    dst: n,
                    src: motion.region_send_remote.size(),
                });
            }
            if !motion.is_local() {
                if motion.recv_buf.len() != self.bytes_per_cell * n
                    || motion.send_buf.len() != self.bytes_per_cell * motion.region_send.size()
                {
                    return Err(BoxHaloError::BufferLengthMismatch {
                        expected: self.bytes_per_cell * n,
                        got: motion.recv_buf.len(),
                    });
                }
                // No two outstanding messages may share a channel+tag.
                if !outbound.insert((motion.remote_rank, motion.tag_send))
                    || !inbound.insert((motion.remote_rank, motion.tag_recv))
                {
                    return Err(BoxHaloError::CommError {
                        peer: motion.remote_rank,
                        detail: "duplicate message tag in plan".into(),
                    });
                }
            }
        }
        Ok(())
    }
}
