//! Thin façade over intra-process (Rayon) or inter-process (MPI) message passing.
//!
//! Messages are *contiguous byte slices*. All handles are **waitable** but
//! non-blocking: the exchange calls `.wait()` before it trusts that a message
//! has arrived, and copies the returned bytes into its own receive region.

use bytes::Bytes;
use hashbrown::HashMap;
use once_cell::sync::Lazy;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Non-blocking communication interface.
pub trait Communicator: Send + Sync + 'static {
    /// Handle returned by `isend`.
    type SendHandle: Wait;
    /// Handle returned by `irecv`.
    type RecvHandle: Wait;

    /// Start sending `buf` to `peer`. The bytes are captured before return.
    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle;

    /// Start receiving a message of `buf.len()` bytes from `peer`. The
    /// payload is handed back whole by [`Wait::wait`], so a caller can tell a
    /// short or oversized message from a good one.
    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> Self::RecvHandle;

    /// Rank of this process in the world.
    fn rank(&self) -> usize;

    /// Number of ranks in the world.
    fn size(&self) -> usize;

    /// True for the serial stand-in that never moves bytes.
    fn is_no_comm(&self) -> bool {
        false
    }
}

/// Anything that can be waited on.
pub trait Wait {
    /// Wait for completion and return the received data (if any).
    fn wait(self) -> Option<Vec<u8>>;
}

impl Wait for () {
    fn wait(self) -> Option<Vec<u8>> {
        None
    }
}

/// Typed message tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommTag(pub u16);

impl CommTag {
    pub const fn new(tag: u16) -> Self {
        Self(tag)
    }

    #[inline]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Raw value handed to [`Communicator`] calls.
    #[inline]
    pub const fn base(self) -> u16 {
        self.0
    }
}

/// Compile-time no-op comm for single-rank runs and serial unit tests.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    type SendHandle = ();
    type RecvHandle = ();

    fn isend(&self, _peer: usize, _tag: u16, _buf: &[u8]) {}
    fn irecv(&self, _peer: usize, _tag: u16, _buf: &mut [u8]) {}

    fn rank(&self) -> usize {
        0
    }
    fn size(&self) -> usize {
        1
    }
    fn is_no_comm(&self) -> bool {
        true
    }
}

// --- RayonComm: intra-process / multi-thread ---

type Key = (usize, usize, u16); // (src, dst, tag)

/// Per-world message store. Messages with the same key are delivered in
/// send order.
#[derive(Default)]
struct Mailbox {
    slots: Mutex<HashMap<Key, VecDeque<Bytes>>>,
    arrived: Condvar,
}

impl Mailbox {
    fn post(&self, key: Key, data: Bytes) {
        self.slots.lock().entry(key).or_default().push_back(data);
        self.arrived.notify_all();
    }

    fn take(&self, key: &Key, timeout: Option<Duration>) -> Option<Bytes> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut slots = self.slots.lock();
        loop {
            if let Some(queue) = slots.get_mut(key) {
                if let Some(data) = queue.pop_front() {
                    if queue.is_empty() {
                        slots.remove(key);
                    }
                    return Some(data);
                }
            }
            match deadline {
                Some(deadline) if Instant::now() >= deadline => return None,
                Some(deadline) => {
                    self.arrived.wait_until(&mut slots, deadline);
                }
                None => self.arrived.wait(&mut slots),
            }
        }
    }
}

static GLOBAL_MAILBOX: Lazy<Arc<Mailbox>> = Lazy::new(|| Arc::new(Mailbox::default()));

/// Pending receive on a [`RayonComm`] mailbox.
pub struct LocalHandle {
    mailbox: Arc<Mailbox>,
    key: Key,
    timeout: Option<Duration>,
}

impl Wait for LocalHandle {
    fn wait(self) -> Option<Vec<u8>> {
        self.mailbox
            .take(&self.key, self.timeout)
            .map(|bytes| bytes.to_vec())
    }
}

/// Threads of one process acting as ranks of a simulated world.
#[derive(Clone)]
pub struct RayonComm {
    rank: usize,
    size: usize,
    mailbox: Arc<Mailbox>,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for RayonComm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RayonComm")
            .field("rank", &self.rank)
            .field("size", &self.size)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RayonComm {
    /// Rank `rank` of a `size`-rank world sharing the process-wide mailbox.
    ///
    /// Independent worlds built this way must use distinct tags; prefer
    /// [`RayonComm::world`] when several run concurrently.
    pub fn new(rank: usize, size: usize) -> Self {
        Self {
            rank,
            size,
            mailbox: Arc::clone(&GLOBAL_MAILBOX),
            timeout: None,
        }
    }

    /// All ranks of a fresh `size`-rank world with its own mailbox.
    pub fn world(size: usize) -> Vec<Self> {
        let mailbox = Arc::new(Mailbox::default());
        (0..size)
            .map(|rank| Self {
                rank,
                size,
                mailbox: Arc::clone(&mailbox),
                timeout: None,
            })
            .collect()
    }

    /// Give up on a receive after `timeout`; the handle then yields `None`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Communicator for RayonComm {
    type SendHandle = ();
    type RecvHandle = LocalHandle;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle {
        self.mailbox
            .post((self.rank, peer, tag), Bytes::copy_from_slice(buf));
    }

    fn irecv(&self, peer: usize, tag: u16, _buf: &mut [u8]) -> Self::RecvHandle {
        LocalHandle {
            mailbox: Arc::clone(&self.mailbox),
            key: (peer, self.rank, tag),
            timeout: self.timeout,
        }
    }

    fn rank(&self) -> usize {
        self.rank
    }
    fn size(&self) -> usize {
        self.size
    }
}

/// Run `f` once per rank of a fresh `size`-rank world, each on its own
/// thread of a dedicated Rayon pool, and collect the results in rank order.
pub fn run_local_world<F, R>(size: usize, f: F) -> Result<Vec<R>, rayon::ThreadPoolBuildError>
where
    F: Fn(RayonComm) -> R + Sync,
    R: Send,
{
    if size == 0 {
        return Ok(Vec::new());
    }
    let comms = RayonComm::world(size);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(size)
        .thread_name(|i| format!("halo-rank-{i}"))
        .build()?;
    log::debug!("running local world of {size} ranks");
    Ok(pool.broadcast(|ctx| f(comms[ctx.index()].clone())))
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::{Communicator as HaloCommunicator, Wait};
    use crate::mesh_error::MeshHaloError;
    use mpi::environment::Universe;
    use mpi::request::{Request, StaticScope};
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::*;

    /// World communicator of an MPI job.
    pub struct MpiComm {
        _universe: Universe,
        world: SimpleCommunicator,
        rank: usize,
        size: usize,
    }

    // SAFETY: the exchange issues all MPI calls from the thread that owns the
    // communicator; the world handle is never used concurrently.
    unsafe impl Send for MpiComm {}
    unsafe impl Sync for MpiComm {}

    impl MpiComm {
        /// Initialize MPI and wrap the world communicator.
        pub fn new() -> Result<Self, MeshHaloError> {
            let universe = mpi::initialize().ok_or_else(|| MeshHaloError::CommError {
                neighbor: 0,
                source: "MPI was already initialized".into(),
            })?;
            let world = universe.world();
            let rank = world.rank() as usize;
            let size = world.size() as usize;
            Ok(Self {
                _universe: universe,
                world,
                rank,
                size,
            })
        }
    }

    /// In-flight request. The message bytes live in a leaked box that is
    /// reclaimed once the request completes.
    pub struct MpiHandle {
        req: Option<Request<'static, [u8], StaticScope>>,
        buf: *mut [u8],
        keep: bool,
    }

    // SAFETY: the raw buffer is owned exclusively by the handle.
    unsafe impl Send for MpiHandle {}

    impl Wait for MpiHandle {
        fn wait(mut self) -> Option<Vec<u8>> {
            let status = self.req.take().map(|req| req.wait());
            // SAFETY: `buf` came from `Box::into_raw` and the request that
            // borrowed it has completed.
            let mut owned = unsafe { Box::from_raw(self.buf) }.into_vec();
            if !self.keep {
                return None;
            }
            // Trim to what the sender actually sent.
            if let Some(status) = status {
                let received = status.count(u8::equivalent_datatype());
                owned.truncate(usize::try_from(received).unwrap_or(0));
            }
            Some(owned)
        }
    }

    impl HaloCommunicator for MpiComm {
        type SendHandle = MpiHandle;
        type RecvHandle = MpiHandle;

        fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> MpiHandle {
            let raw: *mut [u8] = Box::into_raw(buf.to_vec().into_boxed_slice());
            // SAFETY: the box is only freed in `wait`, after the request completes.
            let data: &'static [u8] = unsafe { &*raw };
            let req = self
                .world
                .process_at_rank(peer as i32)
                .immediate_send_with_tag(StaticScope, data, tag as i32);
            MpiHandle {
                req: Some(req),
                buf: raw,
                keep: false,
            }
        }

        fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> MpiHandle {
            let raw: *mut [u8] = Box::into_raw(vec![0u8; buf.len()].into_boxed_slice());
            // SAFETY: as in `isend`.
            let data: &'static mut [u8] = unsafe { &mut *raw };
            let req = self
                .world
                .process_at_rank(peer as i32)
                .immediate_receive_into_with_tag(StaticScope, data, tag as i32);
            MpiHandle {
                req: Some(req),
                buf: raw,
                keep: true,
            }
        }

        fn rank(&self) -> usize {
            self.rank
        }
        fn size(&self) -> usize {
            self.size
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::{MpiComm, MpiHandle};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rayon_roundtrip_two_ranks() {
        let world = RayonComm::world(2);
        let mut recv_buf = [0u8; 4];
        let recv_handle = world[1].irecv(0, 7, &mut recv_buf);
        world[0].isend(1, 7, &[1, 2, 3, 4]).wait();
        let data = recv_handle.wait().expect("data from rank 0");
        assert_eq!(data, vec![1, 2, 3, 4]);
    }

    #[test]
    fn worlds_do_not_share_mailboxes() {
        let a = RayonComm::world(2);
        let b = RayonComm::world(2);
        a[0].isend(1, 3, &[9]);
        let mut buf = [0u8; 1];
        let h = b[1]
            .clone()
            .with_timeout(Duration::from_millis(20))
            .irecv(0, 3, &mut buf);
        assert!(h.wait().is_none());
        assert_eq!(a[1].irecv(0, 3, &mut buf).wait(), Some(vec![9]));
    }

    #[test]
    fn local_world_results_are_in_rank_order() {
        let out = run_local_world(3, |comm| {
            let next = (comm.rank() + 1) % comm.size();
            let prev = (comm.rank() + comm.size() - 1) % comm.size();
            let mut buf = [0u8; 1];
            let h = comm.irecv(prev, 1, &mut buf);
            comm.isend(next, 1, &[comm.rank() as u8]);
            h.wait().map(|v| v[0])
        })
        .unwrap();
        assert_eq!(out, vec![Some(2), Some(0), Some(1)]);
    }

    #[test]
    fn commtag_base_is_raw_value() {
        assert_eq!(CommTag::new(u16::MAX).as_u16(), u16::MAX);
        assert_eq!(CommTag(5).base(), 5);
    }
}
