//! Execution of a cached exchange plan over a transport.
//!
//! `exchange` replays every motion item of a [`Copier`]: intra-rank items
//! become direct region copies between two fabs, inter-rank items pack
//! their send region into the plan's per-item buffer, post a non-blocking
//! send and the matching non-blocking receive, and unpack on completion.
//! The split `exchange_begin`/`exchange_end` pair defers draining so the
//! caller can compute on interior cells while messages are in flight.
//!
//! Completion draining is wait-any by default — each receive is unpacked
//! the moment it lands, in whatever order the network delivers — or a
//! single barrier wait followed by in-order unpacking under the
//! `wait-all` feature. Distinct motions write disjoint ghost regions, so
//! the result does not depend on arrival order.
//!
//! Exchange errors leave the ghost state partially updated and must be
//! treated as fatal by the caller.

use crate::data::base_fab::BaseFab;
use crate::data::level_data::LevelData;
use crate::error::BoxHaloError;
#[cfg(not(feature = "wait-all"))]
use crate::exchange::communicator::PollWait;
use crate::exchange::communicator::{Communicator, Wait};
use crate::exchange::copier::Copier;

impl<T: bytemuck::Pod + Default> LevelData<T> {
    /// Fill ghost cells from neighbour data according to `copier`.
    ///
    /// Equivalent to [`exchange_begin`](Self::exchange_begin) immediately
    /// followed by [`exchange_end`](Self::exchange_end).
    pub fn exchange<C: Communicator>(
        &mut self,
        copier: &mut Copier<C>,
        comm: &C,
    ) -> Result<(), BoxHaloError> {
        self.exchange_begin(copier, comm)?;
        self.exchange_end(copier)
    }

    /// Start an exchange: perform every intra-rank copy and post all
    /// messages, then return without waiting on the transport.
    ///
    /// Between `exchange_begin` and [`exchange_end`](Self::exchange_end)
    /// the interior cells of every owned fab may be read and written
    /// freely; only ghost regions are touched by the completion.
    pub fn exchange_begin<C: Communicator>(
        &mut self,
        copier: &mut Copier<C>,
        comm: &C,
    ) -> Result<(), BoxHaloError> {
        if self.nghost() == 0 {
            return Ok(());
        }
        if copier.tag() != self.tag() {
            return Err(BoxHaloError::LayoutTagMismatch);
        }
        if copier.in_flight() {
            return Err(BoxHaloError::ExchangeInProgress);
        }
        let num_comp = copier.num_comp();
        let expected = std::mem::size_of::<T>() * num_comp;
        if copier.bytes_per_cell() != expected {
            return Err(BoxHaloError::ElementSizeMismatch {
                expected: copier.bytes_per_cell(),
                got: expected,
            });
        }
        if copier.end_comp() > self.ncomp() {
            return Err(BoxHaloError::InvalidComponentRange {
                start: copier.start_comp(),
                num: num_comp,
                ncomp: self.ncomp(),
            });
        }
        if comm.size() != self.dbl().n_ranks() {
            return Err(BoxHaloError::CommError {
                peer: comm.rank(),
                detail: format!(
                    "communicator has {} ranks, layout was built for {}",
                    comm.size(),
                    self.dbl().n_ranks()
                ),
            });
        }

        let start = copier.start_comp;
        let end = copier.end_comp;
        let Copier {
            motions,
            pending_sends,
            pending_recvs,
            ..
        } = copier;
        let fabs = self.fabs_mut();

        for (midx, motion) in motions.iter_mut().enumerate() {
            if motion.is_local() {
                let dst = local_index(motion.bidx_local)?;
                let src = local_index(motion.bidx_remote)?;
                if dst == src {
                    // A box can be its own periodic neighbour; the two
                    // regions are disjoint but live in one fab.
                    fabs[dst].copy_within(
                        motion.region_recv,
                        start,
                        motion.region_send_remote,
                        start,
                        end - start,
                        motion.comp_recv_flags,
                    )?;
                } else {
                    let (dfab, sfab) = two_fabs(fabs, dst, src);
                    dfab.copy(
                        motion.region_recv,
                        start,
                        sfab,
                        motion.region_send_remote,
                        start,
                        end - start,
                        motion.comp_recv_flags,
                    )?;
                }
            } else {
                let local = local_index(motion.bidx_local)?;
                fabs[local].linear_out(&mut motion.send_buf, motion.region_send, start, end)?;
                pending_sends.push(comm.isend(
                    motion.remote_rank,
                    motion.tag_send,
                    &motion.send_buf,
                ));
                pending_recvs.push((
                    midx,
                    comm.irecv(motion.remote_rank, motion.tag_recv, &mut motion.recv_buf),
                ));
            }
        }
        Ok(())
    }

    /// Complete an exchange: drain message completions, unpacking each
    /// received region into its destination ghost cells, then wait for
    /// the sends. A no-op when nothing is in flight.
    pub fn exchange_end<C: Communicator>(
        &mut self,
        copier: &mut Copier<C>,
    ) -> Result<(), BoxHaloError> {
        let start = copier.start_comp;
        let end = copier.end_comp;
        let Copier {
            motions,
            pending_sends,
            pending_recvs,
            ..
        } = copier;
        let fabs = self.fabs_mut();

        #[cfg(not(feature = "wait-all"))]
        {
            // Unpack whichever receive lands first; distinct motions write
            // disjoint regions, so arrival order is immaterial.
            let mut outstanding: Vec<_> = pending_recvs.drain(..).collect();
            while !outstanding.is_empty() {
                let mut progressed = false;
                let mut i = 0;
                while i < outstanding.len() {
                    if let Some(raw) = outstanding[i].1.try_wait() {
                        let (midx, _) = outstanding.swap_remove(i);
                        let motion = &motions[midx];
                        if raw.len() != motion.recv_buf.len() {
                            return Err(BoxHaloError::BufferSizeMismatch {
                                peer: motion.remote_rank,
                                expected: motion.recv_buf.len(),
                                got: raw.len(),
                            });
                        }
                        let local = local_index(motion.bidx_local)?;
                        fabs[local].linear_in(&raw, motion.region_recv, start, end)?;
                        progressed = true;
                    } else {
                        i += 1;
                    }
                }
                if !progressed {
                    std::thread::yield_now();
                }
            }
        }

        #[cfg(feature = "wait-all")]
        {
            // Barrier on every receive, then unpack in plan order.
            let mut arrived = Vec::with_capacity(pending_recvs.len());
            for (midx, handle) in pending_recvs.drain(..) {
                let motion = &motions[midx];
                let raw = handle.wait().ok_or_else(|| BoxHaloError::CommError {
                    peer: motion.remote_rank,
                    detail: "receive completed without data".into(),
                })?;
                arrived.push((midx, raw));
            }
            arrived.sort_by_key(|(midx, _)| *midx);
            for (midx, raw) in arrived {
                let motion = &motions[midx];
                if raw.len() != motion.recv_buf.len() {
                    return Err(BoxHaloError::BufferSizeMismatch {
                        peer: motion.remote_rank,
                        expected: motion.recv_buf.len(),
                        got: raw.len(),
                    });
                }
                let local = local_index(motion.bidx_local)?;
                fabs[local].linear_in(&raw, motion.region_recv, start, end)?;
            }
        }

        for send in pending_sends.drain(..) {
            let _ = send.wait();
        }
        Ok(())
    }
}

fn local_index(
    bidx: crate::layout::box_index::BoxIndex,
) -> Result<usize, BoxHaloError> {
    bidx.local().ok_or(BoxHaloError::NonLocalIndex {
        global: bidx.global(),
    })
}

fn two_fabs<T>(fabs: &mut [BaseFab<T>], a: usize, b: usize) -> (&mut BaseFab<T>, &mut BaseFab<T>) {
    debug_assert_ne!(a, b);
    if a < b {
        let (lo, hi) = fabs.split_at_mut(b);
        (&mut lo[a], &mut hi[0])
    } else {
        let (lo, hi) = fabs.split_at_mut(a);
        (&mut hi[0], &mut lo[b])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::communicator::NoComm;
    use crate::geometry::cell_box::CellBox;
    use crate::geometry::intvect::{IntVect, Real};
    use crate::layout::disjoint::DisjointBoxLayout;
    use crate::layout::iterators::{Periodic, Trim};

    fn serial_setup() -> (DisjointBoxLayout, LevelData<Real>) {
        let domain = CellBox::new(IntVect::ZERO, IntVect::splat(3));
        let dbl = DisjointBoxLayout::new(domain, IntVect::splat(2), &NoComm).unwrap();
        let mut ld = LevelData::new(&dbl, 1, 1);
        for (bidx, fab) in ld.iter_mut() {
            fab.set_val(bidx.global() as Real);
        }
        (dbl, ld)
    }

    #[test]
    fn mismatched_layout_is_rejected() {
        let (dbl, mut ld) = serial_setup();
        let other = dbl.deep_copy();
        let ld2: LevelData<Real> = LevelData::new(&other, 1, 1);
        let mut copier =
            Copier::<NoComm>::for_exchange(&ld2, Periodic::NONE, Trim::NONE).unwrap();
        assert!(matches!(
            ld.exchange(&mut copier, &NoComm),
            Err(BoxHaloError::LayoutTagMismatch)
        ));
    }

    #[test]
    fn mismatched_element_size_is_rejected() {
        let (dbl, mut ld) = serial_setup();
        let ld32: LevelData<f32> = LevelData::new(&dbl, 1, 1);
        let mut copier =
            Copier::<NoComm>::for_exchange(&ld32, Periodic::NONE, Trim::NONE).unwrap();
        assert!(matches!(
            ld.exchange(&mut copier, &NoComm),
            Err(BoxHaloError::ElementSizeMismatch { .. })
        ));
    }

    #[test]
    fn wrong_rank_count_is_rejected() {
        let domain = CellBox::new(IntVect::ZERO, IntVect::splat(3));
        let dbl = DisjointBoxLayout::with_ranks(domain, IntVect::splat(2), 0, 2).unwrap();
        let mut ld: LevelData<Real> = LevelData::new(&dbl, 1, 1);
        let mut copier =
            Copier::<NoComm>::for_exchange(&ld, Periodic::NONE, Trim::NONE).unwrap();
        assert!(matches!(
            ld.exchange(&mut copier, &NoComm),
            Err(BoxHaloError::CommError { .. })
        ));
    }

    #[test]
    fn serial_exchange_fills_face_ghosts() {
        let (dbl, mut ld) = serial_setup();
        let mut copier =
            Copier::<NoComm>::for_exchange(&ld, Periodic::NONE, Trim::NONE).unwrap();
        ld.exchange(&mut copier, &NoComm).unwrap();

        // Ghost layer of box 0 in +x comes from box 1.
        let b0 = dbl.box_index(0);
        let fab = ld.fab(b0);
        let mut probe = IntVect::ZERO;
        probe[0] = 2;
        assert_eq!(fab[(probe, 0)], 1.0);
        // Domain-boundary ghosts keep their initial value.
        let mut outside = IntVect::ZERO;
        outside[0] = -1;
        assert_eq!(fab[(outside, 0)], 0.0);
    }

    #[test]
    fn exchange_twice_is_idempotent() {
        let (dbl, mut ld) = serial_setup();
        let mut copier =
            Copier::<NoComm>::for_exchange(&ld, Periodic::ALL, Trim::NONE).unwrap();
        ld.exchange(&mut copier, &NoComm).unwrap();
        let snapshot: Vec<Vec<Real>> = (0..ld.local_size())
            .map(|i| ld.fab_linear(i).data().to_vec())
            .collect();
        ld.exchange(&mut copier, &NoComm).unwrap();
        for i in 0..ld.local_size() {
            assert_eq!(ld.fab_linear(i).data(), &snapshot[i][..]);
        }
        let _ = dbl;
    }

    #[test]
    fn end_without_begin_is_noop() {
        let (_dbl, mut ld) = serial_setup();
        let mut copier =
            Copier::<NoComm>::for_exchange(&ld, Periodic::NONE, Trim::NONE).unwrap();
        ld.exchange_end(&mut copier).unwrap();
    }

    #[test]
    fn self_periodic_wrap_in_degenerate_layout() {
        // One box per dimension: the box exchanges with itself across the
        // periodic face.
        let domain = CellBox::new(IntVect::ZERO, IntVect::splat(1));
        let dbl = DisjointBoxLayout::new(domain, IntVect::splat(2), &NoComm).unwrap();
        let mut ld: LevelData<Real> = LevelData::new(&dbl, 1, 1);
        let b0 = dbl.box_index(0);
        // Tag each interior cell with its x coordinate.
        let bounds = dbl.box_at(b0);
        for iv in bounds.cells() {
            ld.fab_mut(b0)[(iv, 0)] = iv[0] as Real;
        }
        let mut copier = Copier::<NoComm>::for_exchange(
            &ld,
            Periodic::X,
            Trim::EDGE | Trim::CORNER,
        )
        .unwrap();
        ld.exchange(&mut copier, &NoComm).unwrap();
        let fab = ld.fab(b0);
        // Ghost at x = -1 wraps from x = 1; ghost at x = 2 wraps from x = 0.
        let mut lo_ghost = IntVect::ZERO;
        lo_ghost[0] = -1;
        let mut hi_ghost = IntVect::ZERO;
        hi_ghost[0] = 2;
        assert_eq!(fab[(lo_ghost, 0)], 1.0);
        assert_eq!(fab[(hi_ghost, 0)], 0.0);
    }
}
