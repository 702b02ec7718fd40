//! Integer lattice geometry: points, boxes, and cell iteration.

pub mod box_iter;
pub mod cell_box;
pub mod intvect;

pub use box_iter::CellBoxIter;
pub use cell_box::CellBox;
pub use intvect::{IntVect, Real, SPACE_DIM};
