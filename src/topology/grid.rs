//! `ProcessorGrid`: a rank's place in the cubic grid of sub-domains.
//!
//! Ranks are laid out as an `edge × edge × edge` cube. Rank ids grow fastest
//! along columns, then rows, then planes:
//!
//! ```text
//! rank = plane·edge² + row·edge + col
//! ```
//!
//! Neighbor rank ids are therefore closed-form offsets of the local rank id:
//! `±edge²` per plane step, `±edge` per row step and `±1` per column step.

use crate::debug_invariants::DebugInvariants;
use crate::mesh_error::MeshHaloError;
use crate::topology::direction::Direction;
use serde::{Deserialize, Serialize};

/// Logical axes of the processor grid.
///
/// Columns run along the fastest-varying mesh axis (`x`), rows along `y`,
/// planes along `z`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Axis {
    Plane,
    Row,
    Col,
}

impl Axis {
    /// Axes in the order the rank id is built from (slowest first).
    pub const ALL: [Axis; 3] = [Axis::Plane, Axis::Row, Axis::Col];
}

/// Low or high end of an axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    Min,
    Max,
}

/// Immutable position of the local rank in the processor cube.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawGrid", into = "RawGrid")]
pub struct ProcessorGrid {
    row: usize,
    col: usize,
    plane: usize,
    edge: usize,
}

#[derive(Serialize, Deserialize)]
struct RawGrid {
    row: usize,
    col: usize,
    plane: usize,
    edge: usize,
}

impl TryFrom<RawGrid> for ProcessorGrid {
    type Error = MeshHaloError;

    fn try_from(raw: RawGrid) -> Result<Self, Self::Error> {
        ProcessorGrid::new(raw.row, raw.col, raw.plane, raw.edge)
    }
}

impl From<ProcessorGrid> for RawGrid {
    fn from(g: ProcessorGrid) -> Self {
        RawGrid {
            row: g.row,
            col: g.col,
            plane: g.plane,
            edge: g.edge,
        }
    }
}

impl ProcessorGrid {
    /// Construct from explicit coordinates. Every coordinate must be `< edge`.
    pub fn new(row: usize, col: usize, plane: usize, edge: usize) -> Result<Self, MeshHaloError> {
        let grid = Self {
            row,
            col,
            plane,
            edge,
        };
        grid.validate_invariants()?;
        Ok(grid)
    }

    /// Place `rank` in the smallest cube holding `num_ranks` ranks.
    ///
    /// Fails unless `num_ranks` is a perfect cube and `rank < num_ranks`.
    pub fn from_rank(rank: usize, num_ranks: usize) -> Result<Self, MeshHaloError> {
        let edge = cube_root(num_ranks).ok_or(MeshHaloError::InvalidGrid { ranks: num_ranks })?;
        if rank >= num_ranks {
            return Err(MeshHaloError::RankOutOfRange {
                rank,
                ranks: num_ranks,
            });
        }
        Ok(Self {
            col: rank % edge,
            row: (rank / edge) % edge,
            plane: rank / (edge * edge),
            edge,
        })
    }

    /// The single-rank grid.
    pub const fn serial() -> Self {
        Self {
            row: 0,
            col: 0,
            plane: 0,
            edge: 1,
        }
    }

    #[inline]
    pub const fn row(&self) -> usize {
        self.row
    }
    #[inline]
    pub const fn col(&self) -> usize {
        self.col
    }
    #[inline]
    pub const fn plane(&self) -> usize {
        self.plane
    }
    /// Processors per grid axis.
    #[inline]
    pub const fn edge(&self) -> usize {
        self.edge
    }

    /// Total ranks in the grid (`edge³`).
    #[inline]
    pub const fn num_ranks(&self) -> usize {
        self.edge * self.edge * self.edge
    }

    /// Local rank id.
    #[inline]
    pub const fn rank(&self) -> usize {
        self.plane * self.edge * self.edge + self.row * self.edge + self.col
    }

    /// Coordinate on `axis`.
    #[inline]
    pub const fn coord(&self, axis: Axis) -> usize {
        match axis {
            Axis::Plane => self.plane,
            Axis::Row => self.row,
            Axis::Col => self.col,
        }
    }

    /// Rank-id stride of one step along `axis`.
    #[inline]
    pub const fn stride(&self, axis: Axis) -> usize {
        match axis {
            Axis::Plane => self.edge * self.edge,
            Axis::Row => self.edge,
            Axis::Col => 1,
        }
    }

    /// True iff the local rank sits on the `side` end of `axis`.
    #[inline]
    pub const fn is_boundary(&self, axis: Axis, side: Side) -> bool {
        match side {
            Side::Min => self.coord(axis) == 0,
            Side::Max => self.coord(axis) + 1 == self.edge,
        }
    }

    /// True iff a peer exists in `direction` (no fixed component is on a
    /// grid boundary).
    pub fn has_peer(&self, direction: Direction) -> bool {
        Axis::ALL.iter().all(|&axis| match direction.component(axis) {
            Some(side) => !self.is_boundary(axis, side),
            None => true,
        })
    }

    /// Rank id of the neighbor in `direction`, or `None` when the direction
    /// points off the grid.
    pub fn peer_rank(&self, direction: Direction) -> Option<usize> {
        if !self.has_peer(direction) {
            return None;
        }
        let mut rank = self.rank();
        for axis in Axis::ALL {
            match direction.component(axis) {
                Some(Side::Min) => rank -= self.stride(axis),
                Some(Side::Max) => rank += self.stride(axis),
                None => {}
            }
        }
        Some(rank)
    }
}

impl Default for ProcessorGrid {
    fn default() -> Self {
        Self::serial()
    }
}

impl DebugInvariants for ProcessorGrid {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "ProcessorGrid");
    }

    fn validate_invariants(&self) -> Result<(), MeshHaloError> {
        if self.edge == 0 || self.row >= self.edge || self.col >= self.edge || self.plane >= self.edge
        {
            return Err(MeshHaloError::CoordinateOutOfRange {
                row: self.row,
                col: self.col,
                plane: self.plane,
                edge: self.edge,
            });
        }
        Ok(())
    }
}

/// Exact integer cube root, if any.
fn cube_root(n: usize) -> Option<usize> {
    if n == 0 {
        return None;
    }
    let guess = (n as f64).cbrt().round() as usize;
    // Float rounding can be off by one for large `n`.
    (guess.saturating_sub(1)..=guess + 1).find(|&e| e.checked_pow(3) == Some(n))
}
