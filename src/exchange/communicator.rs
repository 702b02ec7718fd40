//! Message transports for the exchange engine.
//!
//! The engine needs very little from a transport: non-blocking two-sided
//! messaging with waitable handles, rank/size queries, a barrier, and a
//! global sum. Three backends cover the deployment range: [`NoComm`] for
//! one rank (every motion is a local copy and nothing is ever posted),
//! [`ThreadComm`] for in-process runs with one thread per rank, and
//! [`MpiComm`] (feature `mpi-support`) for real distributed runs.
//!
//! Messages pair by `(sender rank, tag)`. Tags are `u32` because exchange
//! tags encode layout-global box indices, and each plan guarantees no two
//! outstanding messages share a channel. A receive handle must also be
//! pollable: the engine unpacks whichever ghost region lands first.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Condvar, Mutex};

/// A posted operation that can be driven to completion.
///
/// Receives resolve to the delivered payload; sends resolve to `None`.
pub trait Wait {
    fn wait(self) -> Option<Vec<u8>>;
}

/// A posted operation that can be tested without blocking.
pub trait PollWait {
    /// The payload, if the operation has completed; `None` otherwise.
    fn try_wait(&mut self) -> Option<Vec<u8>>;
}

/// Tags at the top of the range are reserved for the built-in reduction;
/// exchange plans never reach them.
const TAG_REDUCE_GATHER: u32 = u32::MAX - 1;
const TAG_REDUCE_BCAST: u32 = u32::MAX;

/// A two-sided, non-blocking message transport.
///
/// Handles stay on the rank that posted them; only the communicator
/// itself is shared across threads.
pub trait Communicator: Send + Sync + 'static {
    /// Handle returned by `isend`.
    type SendHandle: Wait;
    /// Handle returned by `irecv`.
    type RecvHandle: Wait + PollWait;

    fn isend(&self, peer: usize, tag: u32, buf: &[u8]) -> Self::SendHandle;
    fn irecv(&self, peer: usize, tag: u32, buf: &mut [u8]) -> Self::RecvHandle;

    /// This rank, in `0..size`.
    fn rank(&self) -> usize;
    /// Number of ranks.
    fn size(&self) -> usize;

    /// True when only one rank exists and no messages can flow.
    fn is_serial(&self) -> bool {
        self.size() == 1
    }

    /// Synchronization barrier (default: no-op for serial comms)
    fn barrier(&self) {}

    /// Global sum over all ranks; every rank receives the total.
    ///
    /// The default routes partial sums to rank 0 over reserved tags and
    /// broadcasts the total back, so any backend with working point-to-point
    /// messaging satisfies the reduction contract.
    fn sum_reduce_f64(&self, x: f64) -> f64 {
        if self.is_serial() {
            return x;
        }
        if self.rank() == 0 {
            let mut total = x;
            for peer in 1..self.size() {
                let mut buf = [0u8; 8];
                let h = self.irecv(peer, TAG_REDUCE_GATHER, &mut buf);
                let raw = h.wait().expect("reduction gather lost");
                total += f64::from_le_bytes(raw.try_into().expect("reduction payload"));
            }
            for peer in 1..self.size() {
                let _ = self.isend(peer, TAG_REDUCE_BCAST, &total.to_le_bytes()).wait();
            }
            total
        } else {
            let _ = self.isend(0, TAG_REDUCE_GATHER, &x.to_le_bytes()).wait();
            let mut buf = [0u8; 8];
            let h = self.irecv(0, TAG_REDUCE_BCAST, &mut buf);
            let raw = h.wait().expect("reduction broadcast lost");
            f64::from_le_bytes(raw.try_into().expect("reduction payload"))
        }
    }
}

/// Handle for an operation that completed the moment it was posted and
/// carries no payload.
#[derive(Debug, Default)]
pub struct Done;

impl Wait for Done {
    fn wait(self) -> Option<Vec<u8>> {
        None
    }
}

impl PollWait for Done {
    fn try_wait(&mut self) -> Option<Vec<u8>> {
        None
    }
}

/// Transport for a single rank. Posting a message on it is a programming
/// error that shows up as a receive that never completes, but a correct
/// exchange plan on one rank contains only local motions and never posts.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    type SendHandle = Done;
    type RecvHandle = Done;

    fn isend(&self, _peer: usize, _tag: u32, _buf: &[u8]) -> Done {
        Done
    }

    fn irecv(&self, _peer: usize, _tag: u32, _buf: &mut [u8]) -> Done {
        Done
    }

    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }
}

// --- ThreadComm: one rank per thread, one shared mailbox per universe ---

/// Channel identity of one message stream.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
struct Envelope {
    from: usize,
    to: usize,
    tag: u32,
}

/// Mailbox shared by every rank of one universe: per-channel FIFO queues
/// behind a single lock, with one condvar signalling every delivery.
///
/// Waiters re-check their own queue after each wake, so a shared condvar
/// stays correct; universes are independent allocations, so separate runs
/// in one process cannot observe each other's traffic.
#[derive(Default)]
struct Mailbox {
    queues: Mutex<HashMap<Envelope, VecDeque<Vec<u8>>>>,
    delivered: Condvar,
}

impl Mailbox {
    fn post(&self, envelope: Envelope, payload: Vec<u8>) {
        let mut queues = self.queues.lock().expect("mailbox poisoned");
        queues.entry(envelope).or_default().push_back(payload);
        self.delivered.notify_all();
    }

    fn collect(&self, envelope: Envelope) -> Option<Vec<u8>> {
        let mut queues = self.queues.lock().expect("mailbox poisoned");
        queues.get_mut(&envelope).and_then(VecDeque::pop_front)
    }

    fn collect_blocking(&self, envelope: Envelope) -> Vec<u8> {
        let mut queues = self.queues.lock().expect("mailbox poisoned");
        loop {
            if let Some(payload) = queues.get_mut(&envelope).and_then(VecDeque::pop_front) {
                return payload;
            }
            queues = self.delivered.wait(queues).expect("mailbox poisoned");
        }
    }
}

/// In-process transport: every rank of a universe holds the same mailbox
/// and runs on its own thread.
///
/// Build all ranks of a run at once with [`universe`](Self::universe) and
/// hand one to each thread. Payloads are delivered verbatim; length
/// agreement is the caller's contract (the exchange engine verifies it
/// against the plan).
#[derive(Clone)]
pub struct ThreadComm {
    rank: usize,
    size: usize,
    mailbox: Arc<Mailbox>,
}

impl ThreadComm {
    /// A fresh universe of `size` connected ranks.
    pub fn universe(size: usize) -> Vec<ThreadComm> {
        let mailbox = Arc::new(Mailbox::default());
        (0..size)
            .map(|rank| ThreadComm {
                rank,
                size,
                mailbox: Arc::clone(&mailbox),
            })
            .collect()
    }
}

impl std::fmt::Debug for ThreadComm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadComm")
            .field("rank", &self.rank)
            .field("size", &self.size)
            .finish()
    }
}

/// Pending receive on a [`ThreadComm`] channel.
pub struct MailboxRecv {
    mailbox: Arc<Mailbox>,
    envelope: Envelope,
}

impl Wait for MailboxRecv {
    fn wait(self) -> Option<Vec<u8>> {
        Some(self.mailbox.collect_blocking(self.envelope))
    }
}

impl PollWait for MailboxRecv {
    fn try_wait(&mut self) -> Option<Vec<u8>> {
        self.mailbox.collect(self.envelope)
    }
}

impl Communicator for ThreadComm {
    type SendHandle = Done;
    type RecvHandle = MailboxRecv;

    fn isend(&self, peer: usize, tag: u32, buf: &[u8]) -> Done {
        let envelope = Envelope {
            from: self.rank,
            to: peer,
            tag,
        };
        self.mailbox.post(envelope, buf.to_vec());
        Done
    }

    fn irecv(&self, peer: usize, tag: u32, _buf: &mut [u8]) -> MailboxRecv {
        MailboxRecv {
            mailbox: Arc::clone(&self.mailbox),
            envelope: Envelope {
                from: peer,
                to: self.rank,
                tag,
            },
        }
    }

    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn barrier(&self) {
        // The gather/broadcast round trip is a barrier.
        let _ = self.sum_reduce_f64(0.0);
    }
}

// --- MPI backend ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::*;
    use mpi::collective::{CommunicatorCollectives, SystemOperation};
    use mpi::environment::Universe;
    use mpi::point_to_point::{Destination, Source};
    use mpi::request::{Request, StaticScope};
    use mpi::topology::{Communicator as _, SimpleCommunicator};

    type ByteRequest = Request<'static, [u8], StaticScope>;

    /// MPI transport; owns the MPI environment, so construct exactly one
    /// per process. Finalize happens when it is dropped.
    pub struct MpiComm {
        _env: Universe,
        world: SimpleCommunicator,
        rank: usize,
        size: usize,
    }

    // The world handle is confined to this module and every operation on
    // it goes through &self; rsmpi just does not carry the markers.
    unsafe impl Send for MpiComm {}
    unsafe impl Sync for MpiComm {}

    impl Default for MpiComm {
        fn default() -> Self {
            let env = mpi::initialize().expect("MPI already initialized");
            let world = env.world();
            let rank = world.rank() as usize;
            let size = world.size() as usize;
            MpiComm {
                _env: env,
                world,
                rank,
                size,
            }
        }
    }

    /// Give a request a view of a heap buffer the handle keeps alive.
    ///
    /// Sound because every handle completes its request before the buffer
    /// is released: `wait`/`try_wait` drive it to completion and `Drop`
    /// waits on an abandoned one.
    unsafe fn static_view(buf: &[u8]) -> &'static [u8] {
        std::slice::from_raw_parts(buf.as_ptr(), buf.len())
    }

    unsafe fn static_view_mut(buf: &mut [u8]) -> &'static mut [u8] {
        std::slice::from_raw_parts_mut(buf.as_mut_ptr(), buf.len())
    }

    /// In-flight MPI send; the payload travels in a heap buffer owned by
    /// this handle.
    pub struct MpiSend {
        req: Option<ByteRequest>,
        _payload: Box<[u8]>,
    }

    impl Wait for MpiSend {
        fn wait(mut self) -> Option<Vec<u8>> {
            if let Some(req) = self.req.take() {
                let _ = req.wait();
            }
            None
        }
    }

    impl Drop for MpiSend {
        fn drop(&mut self) {
            // The buffer cannot go away under an active request.
            if let Some(req) = self.req.take() {
                let _ = req.wait();
            }
        }
    }

    /// In-flight MPI receive into a heap buffer owned by this handle.
    pub struct MpiRecv {
        req: Option<ByteRequest>,
        inbox: Box<[u8]>,
    }

    impl MpiRecv {
        fn deliver(&mut self) -> Option<Vec<u8>> {
            Some(std::mem::take(&mut self.inbox).into_vec())
        }
    }

    impl Wait for MpiRecv {
        fn wait(mut self) -> Option<Vec<u8>> {
            let req = self.req.take()?;
            let _ = req.wait();
            self.deliver()
        }
    }

    impl PollWait for MpiRecv {
        fn try_wait(&mut self) -> Option<Vec<u8>> {
            let req = self.req.take()?;
            match req.test() {
                Ok(_status) => self.deliver(),
                Err(pending) => {
                    self.req = Some(pending);
                    None
                }
            }
        }
    }

    impl Drop for MpiRecv {
        fn drop(&mut self) {
            if let Some(req) = self.req.take() {
                let _ = req.wait();
            }
        }
    }

    impl Communicator for MpiComm {
        type SendHandle = MpiSend;
        type RecvHandle = MpiRecv;

        fn isend(&self, peer: usize, tag: u32, buf: &[u8]) -> MpiSend {
            let payload: Box<[u8]> = buf.into();
            let view = unsafe { static_view(&payload) };
            let req = self
                .world
                .process_at_rank(peer as i32)
                .immediate_send_with_tag(StaticScope, view, tag as i32);
            MpiSend {
                req: Some(req),
                _payload: payload,
            }
        }

        fn irecv(&self, peer: usize, tag: u32, template: &mut [u8]) -> MpiRecv {
            let mut inbox = vec![0u8; template.len()].into_boxed_slice();
            let view = unsafe { static_view_mut(&mut inbox) };
            let req = self
                .world
                .process_at_rank(peer as i32)
                .immediate_receive_into_with_tag(StaticScope, view, tag as i32);
            MpiRecv {
                req: Some(req),
                inbox,
            }
        }

        fn rank(&self) -> usize {
            self.rank
        }

        fn size(&self) -> usize {
            self.size
        }

        fn barrier(&self) {
            self.world.barrier();
        }

        fn sum_reduce_f64(&self, x: f64) -> f64 {
            let mut total = 0.0f64;
            self.world
                .all_reduce_into(&x, &mut total, SystemOperation::sum());
            total
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;
