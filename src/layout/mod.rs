//! Disjoint box layouts: the process-wide partition of the problem domain
//! and the iterators that walk it.

pub mod box_index;
pub mod disjoint;
pub mod iterators;

pub use box_index::BoxIndex;
pub use disjoint::DisjointBoxLayout;
pub use iterators::{DataIter, LayoutIter, Neighbor, NeighborIter, Periodic, PeriodicIter, Trim};
