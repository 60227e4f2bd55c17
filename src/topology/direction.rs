//! The 26 neighbor directions of a brick-shaped sub-domain.
//!
//! A [`Direction`] picks, on each of the plane/row/column axes, either the
//! `Min` side, the `Max` side, or neither. The all-neither case is excluded,
//! leaving 6 face, 12 edge and 8 corner directions.
//!
//! [`DIRECTIONS`] fixes the *activation order* every exchange phase uses:
//! faces first (plane, row, column; min before max), then edges, then
//! corners. Receives are posted, sends are issued, and incoming buffers are
//! combined in this order, so two ranks never disagree about which message
//! region belongs to which neighbor.

use crate::mesh_error::MeshHaloError;
use crate::topology::grid::{Axis, Side};
use serde::{Deserialize, Serialize};
use static_assertions::const_assert_eq;

/// Number of topological neighbors of an interior sub-domain.
pub const DIRECTION_COUNT: usize = 26;
/// Face directions (one axis fixed).
pub const FACE_COUNT: usize = 6;
/// Edge directions (two axes fixed).
pub const EDGE_COUNT: usize = 12;
/// Corner directions (all three axes fixed).
pub const CORNER_COUNT: usize = 8;

const_assert_eq!(FACE_COUNT + EDGE_COUNT + CORNER_COUNT, DIRECTION_COUNT);

/// Geometric class of a direction, by how many axes it fixes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DirectionClass {
    Face,
    Edge,
    Corner,
}

impl DirectionClass {
    /// Index of the first direction of this class in [`DIRECTIONS`].
    pub const fn first_index(self) -> usize {
        match self {
            DirectionClass::Face => 0,
            DirectionClass::Edge => FACE_COUNT,
            DirectionClass::Corner => FACE_COUNT + EDGE_COUNT,
        }
    }

    /// Number of directions in this class.
    pub const fn len(self) -> usize {
        match self {
            DirectionClass::Face => FACE_COUNT,
            DirectionClass::Edge => EDGE_COUNT,
            DirectionClass::Corner => CORNER_COUNT,
        }
    }
}

/// One of the 26 neighbor directions.
///
/// Stored as the side chosen on each axis (`None` = the axis is free).
/// Deserialization rejects the all-free combination.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawDirection", into = "RawDirection")]
pub struct Direction {
    plane: Option<Side>,
    row: Option<Side>,
    col: Option<Side>,
}

#[derive(Serialize, Deserialize)]
struct RawDirection {
    plane: Option<Side>,
    row: Option<Side>,
    col: Option<Side>,
}

impl TryFrom<RawDirection> for Direction {
    type Error = MeshHaloError;

    fn try_from(raw: RawDirection) -> Result<Self, Self::Error> {
        Direction::new(raw.row, raw.col, raw.plane).ok_or(MeshHaloError::InvalidDirection)
    }
}

impl From<Direction> for RawDirection {
    fn from(d: Direction) -> Self {
        RawDirection {
            plane: d.plane,
            row: d.row,
            col: d.col,
        }
    }
}

const MIN: Option<Side> = Some(Side::Min);
const MAX: Option<Side> = Some(Side::Max);
const NONE: Option<Side> = None;

const fn dir(row: Option<Side>, col: Option<Side>, plane: Option<Side>) -> Direction {
    Direction { plane, row, col }
}

/// All neighbor directions in activation order.
pub const DIRECTIONS: [Direction; DIRECTION_COUNT] = [
    // faces
    dir(NONE, NONE, MIN),
    dir(NONE, NONE, MAX),
    dir(MIN, NONE, NONE),
    dir(MAX, NONE, NONE),
    dir(NONE, MIN, NONE),
    dir(NONE, MAX, NONE),
    // edges
    dir(MIN, MIN, NONE),
    dir(MIN, NONE, MIN),
    dir(NONE, MIN, MIN),
    dir(MAX, MAX, NONE),
    dir(MAX, NONE, MAX),
    dir(NONE, MAX, MAX),
    dir(MAX, MIN, NONE),
    dir(MIN, NONE, MAX),
    dir(NONE, MIN, MAX),
    dir(MIN, MAX, NONE),
    dir(MAX, NONE, MIN),
    dir(NONE, MAX, MIN),
    // corners
    dir(MIN, MIN, MIN),
    dir(MIN, MIN, MAX),
    dir(MIN, MAX, MIN),
    dir(MIN, MAX, MAX),
    dir(MAX, MIN, MIN),
    dir(MAX, MIN, MAX),
    dir(MAX, MAX, MIN),
    dir(MAX, MAX, MAX),
];

impl Direction {
    /// Build a direction from per-axis sides. Returns `None` for the
    /// all-free combination, which is not a neighbor.
    pub const fn new(row: Option<Side>, col: Option<Side>, plane: Option<Side>) -> Option<Self> {
        if row.is_none() && col.is_none() && plane.is_none() {
            None
        } else {
            Some(dir(row, col, plane))
        }
    }

    /// The face direction across `side` of `axis`.
    pub const fn face(axis: Axis, side: Side) -> Self {
        match axis {
            Axis::Plane => dir(NONE, NONE, Some(side)),
            Axis::Row => dir(Some(side), NONE, NONE),
            Axis::Col => dir(NONE, Some(side), NONE),
        }
    }

    /// Side chosen on `axis`, or `None` if the axis is free.
    #[inline]
    pub const fn component(self, axis: Axis) -> Option<Side> {
        match axis {
            Axis::Plane => self.plane,
            Axis::Row => self.row,
            Axis::Col => self.col,
        }
    }

    /// Number of axes this direction fixes.
    #[inline]
    pub const fn fixed_axes(self) -> usize {
        self.plane.is_some() as usize + self.row.is_some() as usize + self.col.is_some() as usize
    }

    pub const fn class(self) -> DirectionClass {
        match self.fixed_axes() {
            1 => DirectionClass::Face,
            2 => DirectionClass::Edge,
            _ => DirectionClass::Corner,
        }
    }

    /// Position of this direction in [`DIRECTIONS`].
    pub fn index(self) -> usize {
        // `DIRECTIONS` covers every constructible direction.
        DIRECTIONS
            .iter()
            .position(|d| *d == self)
            .unwrap_or(DIRECTION_COUNT)
    }

    /// Position within its own class (face slot, edge slot or corner slot).
    pub fn slot(self) -> usize {
        self.index() - self.class().first_index()
    }

    /// The direction pointing back at us from the neighbor.
    pub const fn opposite(self) -> Self {
        const fn flip(s: Option<Side>) -> Option<Side> {
            match s {
                Some(Side::Min) => MAX,
                Some(Side::Max) => MIN,
                None => NONE,
            }
        }
        dir(flip(self.row), flip(self.col), flip(self.plane))
    }

    /// Signed unit step on `axis`: -1 for `Min`, +1 for `Max`, 0 if free.
    #[inline]
    pub const fn step(self, axis: Axis) -> isize {
        match self.component(axis) {
            Some(Side::Min) => -1,
            Some(Side::Max) => 1,
            None => 0,
        }
    }

    /// True when the neighbor in this direction has a lower rank id.
    ///
    /// Rank ids grow fastest along columns, then rows, then planes, so the
    /// sign of the rank delta is the sign of the first fixed component in
    /// plane, row, column order.
    pub const fn is_downward(self) -> bool {
        let first = if self.plane.is_some() {
            self.plane
        } else if self.row.is_some() {
            self.row
        } else {
            self.col
        };
        matches!(first, Some(Side::Min))
    }

    /// Iterate all directions in activation order.
    pub fn all() -> impl Iterator<Item = Direction> {
        DIRECTIONS.into_iter()
    }

    /// Iterate the directions of one class in activation order.
    pub fn of_class(class: DirectionClass) -> impl Iterator<Item = Direction> {
        let start = class.first_index();
        DIRECTIONS[start..start + class.len()].iter().copied()
    }
}

impl std::fmt::Debug for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::with_capacity(3);
        for (name, side) in [("row", self.row), ("col", self.col), ("plane", self.plane)] {
            match side {
                Some(Side::Min) => parts.push(format!("{name}Min")),
                Some(Side::Max) => parts.push(format!("{name}Max")),
                None => {}
            }
        }
        write!(f, "Direction({})", parts.join("+"))
    }
}
