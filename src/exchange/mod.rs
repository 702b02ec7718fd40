//! The halo-exchange subsystem: transport abstraction, cached exchange
//! plans, and the engine that executes them.

pub mod communicator;
pub mod copier;
pub mod engine;
pub mod wire;

#[cfg(feature = "mpi-support")]
pub use communicator::MpiComm;
pub use communicator::{Communicator, NoComm, PollWait, ThreadComm, Wait};
pub use copier::{Copier, Motion2Way};
