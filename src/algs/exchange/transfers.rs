//! `TransferPool`: one in-flight handle per neighbor direction.
//!
//! Slots are keyed by [`Direction`], so a combine phase finds the handle for
//! a direction directly instead of counting how many faces and edges were
//! activated before it. A slot is emptied by the single wait that consumes
//! it; waiting twice on the same direction finds nothing.

use crate::algs::communicator::Wait;
use crate::debug_invariants::DebugInvariants;
use crate::mesh_error::MeshHaloError;
use crate::topology::direction::{DIRECTION_COUNT, DIRECTIONS, Direction};
use std::ops::Range;

/// An in-flight transfer and where its payload lives in the message buffer.
#[derive(Debug)]
pub struct Pending<H> {
    pub peer: usize,
    pub region: Range<usize>,
    pub handle: H,
}

/// Outcome of waiting on one direction.
#[derive(Debug)]
pub struct Completed {
    pub direction: Direction,
    pub peer: usize,
    pub region: Range<usize>,
    /// Bytes handed back by the transport, `None` for sends or failures.
    pub payload: Option<Vec<u8>>,
}

/// Fixed-capacity direction → handle association.
#[derive(Debug)]
pub struct TransferPool<H> {
    slots: [Option<Pending<H>>; DIRECTION_COUNT],
    len: usize,
}

impl<H> Default for TransferPool<H> {
    fn default() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
            len: 0,
        }
    }
}

impl<H> TransferPool<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the handle for `direction`. At most one per direction.
    pub fn insert(&mut self, direction: Direction, pending: Pending<H>) -> Result<(), MeshHaloError> {
        let slot = &mut self.slots[direction.index()];
        if slot.is_some() {
            return Err(MeshHaloError::DuplicateTransfer(direction));
        }
        *slot = Some(pending);
        self.len += 1;
        Ok(())
    }

    /// Remove and return the handle for `direction` without waiting on it.
    pub fn take(&mut self, direction: Direction) -> Option<Pending<H>> {
        let taken = self.slots[direction.index()].take();
        if taken.is_some() {
            self.len -= 1;
        }
        taken
    }

    pub fn get(&self, direction: Direction) -> Option<&Pending<H>> {
        self.slots[direction.index()].as_ref()
    }

    pub fn contains(&self, direction: Direction) -> bool {
        self.get(direction).is_some()
    }

    /// Directions with an outstanding handle, in activation order.
    pub fn directions(&self) -> impl Iterator<Item = Direction> + '_ {
        DIRECTIONS
            .iter()
            .zip(self.slots.iter())
            .filter_map(|(&d, s)| s.as_ref().map(|_| d))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<H: Wait> TransferPool<H> {
    /// Block on the handle for `direction` and consume it. `None` if no
    /// transfer is outstanding for that direction.
    pub fn wait(&mut self, direction: Direction) -> Option<Completed> {
        let Pending {
            peer,
            region,
            handle,
        } = self.take(direction)?;
        Some(Completed {
            direction,
            peer,
            region,
            payload: handle.wait(),
        })
    }

    /// Block on every outstanding handle, in activation order.
    pub fn wait_all(&mut self) -> Vec<Completed> {
        let mut done = Vec::with_capacity(self.len);
        for d in DIRECTIONS {
            if let Some(c) = self.wait(d) {
                done.push(c);
            }
        }
        done
    }

    /// Wait on and discard every outstanding handle.
    pub fn drain(&mut self) -> usize {
        let mut n = 0;
        for d in DIRECTIONS {
            if self.wait(d).is_some() {
                n += 1;
            }
        }
        n
    }
}

impl<H> DebugInvariants for TransferPool<H> {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "TransferPool");
    }

    fn validate_invariants(&self) -> Result<(), MeshHaloError> {
        let occupied = self.slots.iter().flatten().count();
        if occupied != self.len {
            return Err(MeshHaloError::Config(format!(
                "transfer pool counts {} handles but holds {occupied}",
                self.len
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::{Communicator, RayonComm};

    fn pending(peer: usize) -> Pending<()> {
        Pending {
            peer,
            region: 0..0,
            handle: (),
        }
    }

    #[test]
    fn duplicate_direction_is_rejected() {
        let mut pool = TransferPool::new();
        pool.insert(DIRECTIONS[3], pending(1)).unwrap();
        assert!(matches!(
            pool.insert(DIRECTIONS[3], pending(2)),
            Err(MeshHaloError::DuplicateTransfer(_))
        ));
        assert_eq!(pool.len(), 1);
        pool.debug_assert_invariants();
    }

    #[test]
    fn each_handle_is_consumed_once() {
        let mut pool = TransferPool::new();
        pool.insert(DIRECTIONS[20], pending(5)).unwrap();
        pool.insert(DIRECTIONS[0], pending(4)).unwrap();
        let order: Vec<_> = pool.directions().collect();
        assert_eq!(order, vec![DIRECTIONS[0], DIRECTIONS[20]]);
        assert_eq!(pool.wait(DIRECTIONS[20]).map(|c| c.peer), Some(5));
        assert!(pool.wait(DIRECTIONS[20]).is_none());
        assert_eq!(pool.drain(), 1);
        assert!(pool.is_empty());
    }

    #[test]
    fn wait_returns_payload_of_matching_direction() {
        let world = RayonComm::world(2);
        let mut pool = TransferPool::new();
        let mut scratch = [0u8; 2];
        for (i, d) in [DIRECTIONS[1], DIRECTIONS[5]].into_iter().enumerate() {
            let h = world[0].irecv(1, 10 + i as u16, &mut scratch);
            pool.insert(
                d,
                Pending {
                    peer: 1,
                    region: 0..2,
                    handle: h,
                },
            )
            .unwrap();
        }
        world[1].isend(0, 11, &[7, 7]);
        world[1].isend(0, 10, &[3, 3]);
        let done = pool.wait_all();
        assert_eq!(done[0].payload.as_deref(), Some(&[3u8, 3][..]));
        assert_eq!(done[1].payload.as_deref(), Some(&[7u8, 7][..]));
    }
}
