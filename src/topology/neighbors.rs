//! Active neighbor sets: which of the 26 directions take part in one
//! exchange call, and with which peer rank.
//!
//! A direction is active when its peer exists on the grid and the caller's
//! gating flag allows it. Gating only ever removes transfers that cross the
//! rank ordering in one sense:
//! - a receive from a *downward* neighbor (lower rank id) needs `do_receive`;
//! - a send toward an *upward* neighbor (higher rank id) needs `do_send`.
//!
//! With both flags cleared, boundary data flows strictly from higher ranks to
//! lower ranks. Both ends of a transfer evaluate the same rule, so every
//! posted send has exactly one matching posted receive.

use crate::topology::direction::{DIRECTION_COUNT, DIRECTIONS, Direction, DirectionClass};
use crate::topology::grid::ProcessorGrid;

/// Active directions and their peer ranks, recomputed per exchange call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveNeighbors {
    peers: [Option<usize>; DIRECTION_COUNT],
}

impl ActiveNeighbors {
    /// Directions to post receives for.
    pub fn for_receive(grid: &ProcessorGrid, do_receive: bool, planes_only: bool) -> Self {
        Self::build(grid, planes_only, |d| {
            do_receive || !d.is_downward()
        })
    }

    /// Directions to pack and send toward.
    pub fn for_send(grid: &ProcessorGrid, do_send: bool, planes_only: bool) -> Self {
        Self::build(grid, planes_only, |d| do_send || d.is_downward())
    }

    fn build<F>(grid: &ProcessorGrid, planes_only: bool, gate: F) -> Self
    where
        F: Fn(Direction) -> bool,
    {
        let mut peers = [None; DIRECTION_COUNT];
        for (slot, d) in peers.iter_mut().zip(DIRECTIONS) {
            if planes_only && d.class() != DirectionClass::Face {
                continue;
            }
            if gate(d) {
                *slot = grid.peer_rank(d);
            }
        }
        Self { peers }
    }

    /// Peer rank for `direction` if it is active.
    #[inline]
    pub fn peer(&self, direction: Direction) -> Option<usize> {
        self.peers[direction.index()]
    }

    pub fn contains(&self, direction: Direction) -> bool {
        self.peer(direction).is_some()
    }

    /// `(direction, peer)` pairs in activation order.
    pub fn iter(&self) -> impl Iterator<Item = (Direction, usize)> + '_ {
        DIRECTIONS
            .iter()
            .zip(self.peers.iter())
            .filter_map(|(&d, p)| p.map(|peer| (d, peer)))
    }

    pub fn len(&self) -> usize {
        self.peers.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Active directions of one geometric class.
    pub fn count_of(&self, class: DirectionClass) -> usize {
        self.iter().filter(|(d, _)| d.class() == class).count()
    }
}
