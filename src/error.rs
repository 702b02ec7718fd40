//! BoxHaloError: Unified error type for box-halo public APIs
//!
//! This error type is used throughout the library to provide robust,
//! non-panicking error handling for all public APIs. Construction errors
//! are recoverable by the caller; exchange errors are fatal in practice
//! because a partially filled ghost state is unusable.

use crate::geometry::cell_box::CellBox;
use crate::geometry::intvect::IntVect;
use thiserror::Error;

/// Unified error type for box-halo operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BoxHaloError {
    /// The problem domain does not divide evenly into boxes of the
    /// requested size.
    #[error("domain {domain} does not divide evenly into boxes of size {max_box_size}")]
    UnevenPartition {
        domain: CellBox,
        max_box_size: IntVect,
    },
    /// The total box count does not divide evenly over the ranks.
    #[error("{num_boxes} boxes cannot be split evenly over {n_ranks} ranks")]
    UnevenOwnership { num_boxes: usize, n_ranks: usize },
    /// A region argument is not contained in the buffer it addresses.
    #[error("region {region} is not contained in {bounds}")]
    OutOfBounds { region: CellBox, bounds: CellBox },
    /// Source and destination regions of a copy hold different cell counts.
    #[error("region size mismatch: destination holds {dst} cells, source {src}")]
    RegionSizeMismatch { dst: usize, src: usize },
    /// A component range does not fit the container it addresses.
    #[error("component range [{start}, {start}+{num}) exceeds {ncomp} components")]
    InvalidComponentRange {
        start: usize,
        num: usize,
        ncomp: usize,
    },
    /// A plan or iterator built on one layout was applied to a container
    /// built on a different layout.
    #[error("layout identity mismatch: plan and container were built on different layouts")]
    LayoutTagMismatch,
    /// A box index that is not owned by this rank was used to address
    /// local storage.
    #[error("box {global} is not local to this rank")]
    NonLocalIndex { global: usize },
    /// `exchange_begin` was called while a previous exchange on the same
    /// plan had not been completed with `exchange_end`.
    #[error("exchange already in flight on this plan")]
    ExchangeInProgress,
    /// The element size the plan was built for does not match the data.
    #[error("plan was built for {expected} bytes per cell, data has {got}")]
    ElementSizeMismatch { expected: usize, got: usize },
    /// A linearisation buffer has the wrong length for its region.
    #[error("linear buffer holds {got} bytes, region needs {expected}")]
    BufferLengthMismatch { expected: usize, got: usize },
    /// A message buffer arrived with the wrong length.
    #[error("message from rank {peer}: expected {expected} bytes, got {got}")]
    BufferSizeMismatch {
        peer: usize,
        expected: usize,
        got: usize,
    },
    /// The transport failed to complete an operation.
    #[error("communication with rank {peer} failed: {detail}")]
    CommError { peer: usize, detail: String },
}
