//! `LevelData<T>`: distributed field data over a disjoint box layout
//!
//! One [`BaseFab`] per locally-owned box, each allocated on the box grown
//! by the ghost radius. The container is bound to its layout for life and
//! is deliberately not cloneable: exchange plans hold on to the identity
//! of this storage.

use crate::data::base_fab::BaseFab;
use crate::error::BoxHaloError;
use crate::layout::box_index::BoxIndex;
use crate::layout::disjoint::DisjointBoxLayout;
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Per-rank array of fabs, one per locally-owned box.
#[derive(Debug)]
pub struct LevelData<T> {
    dbl: DisjointBoxLayout,
    fabs: Vec<BaseFab<T>>,
    ncomp: usize,
    nghost: usize,
}

impl<T: Clone + Default> LevelData<T> {
    /// Allocate `ncomp` components on every owned box grown by `nghost`.
    pub fn new(dbl: &DisjointBoxLayout, ncomp: usize, nghost: usize) -> Self {
        debug_assert!(ncomp > 0);
        let fabs = dbl
            .iter_local()
            .map(|bidx| BaseFab::new(dbl.box_at(bidx).grow(nghost as i32), ncomp))
            .collect();
        LevelData {
            dbl: dbl.clone(),
            fabs,
            ncomp,
            nghost,
        }
    }

    /// Assign `val` to every cell (ghosts included) of every owned fab.
    pub fn set_val(&mut self, val: T) {
        for fab in &mut self.fabs {
            fab.set_val(val.clone());
        }
    }

    /// Assign `val` to component `comp` of every owned fab.
    pub fn set_val_comp(&mut self, comp: usize, val: T) {
        for fab in &mut self.fabs {
            fab.set_val_comp(comp, val.clone());
        }
    }
}

impl<T> LevelData<T> {
    /// The fab owned at `bidx`.
    ///
    /// # Panics
    /// Panics if `bidx` does not name a box owned by this rank. Use
    /// [`try_fab`](Self::try_fab) for a fallible lookup.
    #[inline]
    pub fn fab(&self, bidx: BoxIndex) -> &BaseFab<T> {
        self.try_fab(bidx).expect("box is not local to this rank")
    }

    /// Mutable access to the fab owned at `bidx`.
    ///
    /// # Panics
    /// Panics if `bidx` does not name a box owned by this rank.
    #[inline]
    pub fn fab_mut(&mut self, bidx: BoxIndex) -> &mut BaseFab<T> {
        self.try_fab_mut(bidx)
            .expect("box is not local to this rank")
    }

    /// Fallible lookup of the fab owned at `bidx`.
    pub fn try_fab(&self, bidx: BoxIndex) -> Result<&BaseFab<T>, BoxHaloError> {
        let local = self.check_local(bidx)?;
        Ok(&self.fabs[local])
    }

    /// Fallible mutable lookup of the fab owned at `bidx`.
    pub fn try_fab_mut(&mut self, bidx: BoxIndex) -> Result<&mut BaseFab<T>, BoxHaloError> {
        let local = self.check_local(bidx)?;
        Ok(&mut self.fabs[local])
    }

    fn check_local(&self, bidx: BoxIndex) -> Result<usize, BoxHaloError> {
        let in_range = bidx.global() >= self.dbl.local_begin()
            && bidx.global() < self.dbl.local_end();
        match bidx.local() {
            Some(local) if in_range && local == bidx.global() - self.dbl.local_begin() => {
                Ok(local)
            }
            _ => Err(BoxHaloError::NonLocalIndex {
                global: bidx.global(),
            }),
        }
    }

    /// The fab at local position `idx` (testing aid).
    #[inline]
    pub fn fab_linear(&self, idx: usize) -> &BaseFab<T> {
        &self.fabs[idx]
    }

    /// Number of owned boxes.
    #[inline]
    pub fn local_size(&self) -> usize {
        self.fabs.len()
    }

    /// Number of components.
    #[inline]
    pub fn ncomp(&self) -> usize {
        self.ncomp
    }

    /// Ghost radius.
    #[inline]
    pub fn nghost(&self) -> usize {
        self.nghost
    }

    /// The layout this container is built on.
    #[inline]
    pub fn dbl(&self) -> &DisjointBoxLayout {
        &self.dbl
    }

    /// Identity of the underlying layout.
    #[inline]
    pub fn tag(&self) -> usize {
        self.dbl.tag()
    }

    /// Iterate `(BoxIndex, &fab)` over the owned boxes.
    pub fn iter(&self) -> impl Iterator<Item = (BoxIndex, &BaseFab<T>)> {
        self.fabs
            .iter()
            .enumerate()
            .map(|(i, fab)| (self.dbl.data_index(i), fab))
    }

    /// Iterate `(BoxIndex, &mut fab)` over the owned boxes.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (BoxIndex, &mut BaseFab<T>)> {
        let dbl = &self.dbl;
        self.fabs
            .iter_mut()
            .enumerate()
            .map(move |(i, fab)| (dbl.data_index(i), fab))
    }

    pub(crate) fn fabs_mut(&mut self) -> &mut [BaseFab<T>] {
        &mut self.fabs
    }
}

#[cfg(feature = "rayon")]
impl<T: Send> LevelData<T> {
    /// Run `f` over every owned box in parallel. Owned fabs are disjoint,
    /// so per-box kernels need no further synchronisation.
    pub fn par_for_each(&mut self, f: impl Fn(BoxIndex, &mut BaseFab<T>) + Send + Sync) {
        let dbl = &self.dbl;
        self.fabs
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, fab)| f(dbl.data_index(i), fab));
    }
}
