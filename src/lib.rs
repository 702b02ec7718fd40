//! # box-halo
//!
//! box-halo is a Rust library for distributed structured-grid data
//! management. It partitions a rectangular index space into a disjoint
//! layout of equally-sized boxes, assigns each box to a process, stores
//! per-cell multi-component data on the owned boxes with ghost layers, and
//! caches the ghost-exchange data-motion pattern so it can be replayed
//! cheaply every step over a pluggable message transport.
//!
//! ## Features
//! - Integer lattice geometry: [`IntVect`] points and [`CellBox`] intervals
//!   with grow/shift/adjacency/intersection algebra
//! - [`DisjointBoxLayout`]: an immutable, shared partition of the problem
//!   domain with neighbour and periodic-neighbour queries
//! - [`BaseFab`] and [`LevelData`]: contiguous per-box buffers and the
//!   distributed container built from them
//! - [`Copier`]: a precomputed exchange plan (regions, tags, buffers)
//!   executed with local copies plus non-blocking messages, with a split
//!   begin/end API for overlapping communication with computation
//! - Pluggable communication backends (serial, in-process threads, MPI)
//!
//! ## Usage
//! Add `box-halo` as a dependency and enable features as needed:
//!
//! ```toml
//! [dependencies]
//! box-halo = "0.1"
//! # Optional features:
//! # features = ["mpi-support", "rayon"]
//! ```
//!
//! A typical step: build the layout and level data once, build a [`Copier`]
//! once, then call [`LevelData::exchange`] (or `exchange_begin` /
//! `exchange_end`) every iteration to refresh ghost cells.

pub mod data;
pub mod debug_invariants;
pub mod error;
pub mod exchange;
pub mod geometry;
pub mod layout;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::data::base_fab::BaseFab;
    pub use crate::data::level_data::LevelData;
    pub use crate::error::BoxHaloError;
    #[cfg(feature = "mpi-support")]
    pub use crate::exchange::communicator::MpiComm;
    pub use crate::exchange::communicator::{Communicator, NoComm, PollWait, ThreadComm, Wait};
    pub use crate::exchange::copier::{Copier, Motion2Way};
    pub use crate::geometry::cell_box::CellBox;
    pub use crate::geometry::intvect::{IntVect, Real, SPACE_DIM};
    pub use crate::layout::box_index::BoxIndex;
    pub use crate::layout::disjoint::DisjointBoxLayout;
    pub use crate::layout::iterators::{Neighbor, Periodic, Trim};
}

pub use data::base_fab::BaseFab;
pub use data::level_data::LevelData;
pub use error::BoxHaloError;
#[cfg(feature = "mpi-support")]
pub use exchange::communicator::MpiComm;
pub use exchange::communicator::{Communicator, NoComm, ThreadComm};
pub use exchange::copier::{Copier, Motion2Way};
pub use geometry::cell_box::CellBox;
pub use geometry::intvect::{IntVect, Real, SPACE_DIM};
pub use layout::box_index::BoxIndex;
pub use layout::disjoint::DisjointBoxLayout;
pub use layout::iterators::{Periodic, Trim};
