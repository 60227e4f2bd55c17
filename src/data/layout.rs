//! Boundary layouts: which field-array indices travel in each direction.
//!
//! Field arrays are indexed `x + y·dx + z·dx·dy`, with `x` along the grid's
//! column axis, `y` along rows and `z` along planes. For a direction, every
//! fixed axis pins its coordinate to `0` (`Min`) or `extent − 1` (`Max`), and
//! the free axes are walked with `x` fastest. That single rule yields the three
//! storage shapes of a brick boundary:
//! - plane faces are one contiguous run,
//! - row faces are `dz` pencils of `dx` contiguous values,
//! - column faces, edges and corners are scattered with a fixed stride.
//!
//! A [`BoundaryLayout`] is closed-form arithmetic over the extents; it never
//! allocates and never touches field data.

use crate::mesh_error::MeshHaloError;
use crate::topology::direction::Direction;
use crate::topology::grid::{Axis, Side};
use serde::{Deserialize, Serialize};

/// Sub-domain extents (values per axis) of the arrays being exchanged.
///
/// Every axis is at least one; deserialization goes through [`Extents::new`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawExtents", into = "RawExtents")]
pub struct Extents {
    dx: usize,
    dy: usize,
    dz: usize,
}

#[derive(Serialize, Deserialize)]
struct RawExtents {
    dx: usize,
    dy: usize,
    dz: usize,
}

impl TryFrom<RawExtents> for Extents {
    type Error = MeshHaloError;

    fn try_from(raw: RawExtents) -> Result<Self, Self::Error> {
        Extents::new(raw.dx, raw.dy, raw.dz)
    }
}

impl From<Extents> for RawExtents {
    fn from(e: Extents) -> Self {
        RawExtents {
            dx: e.dx,
            dy: e.dy,
            dz: e.dz,
        }
    }
}

impl Extents {
    /// Extents with every axis at least one.
    pub fn new(dx: usize, dy: usize, dz: usize) -> Result<Self, MeshHaloError> {
        if dx == 0 || dy == 0 || dz == 0 {
            return Err(MeshHaloError::InvalidExtents { dx, dy, dz });
        }
        Ok(Self { dx, dy, dz })
    }

    /// Cube of `n` on every axis.
    pub fn cube(n: usize) -> Result<Self, MeshHaloError> {
        Self::new(n, n, n)
    }

    /// Node extents of a brick of `elems` elements (one more node per axis).
    pub fn nodes_of(elems: Extents) -> Self {
        Self {
            dx: elems.dx + 1,
            dy: elems.dy + 1,
            dz: elems.dz + 1,
        }
    }

    #[inline]
    pub const fn dx(&self) -> usize {
        self.dx
    }

    #[inline]
    pub const fn dy(&self) -> usize {
        self.dy
    }

    #[inline]
    pub const fn dz(&self) -> usize {
        self.dz
    }

    /// Number of values in the whole brick.
    #[inline]
    pub const fn volume(&self) -> usize {
        self.dx * self.dy * self.dz
    }

    /// Extent along a grid axis.
    #[inline]
    pub const fn along(&self, axis: Axis) -> usize {
        match axis {
            Axis::Col => self.dx,
            Axis::Row => self.dy,
            Axis::Plane => self.dz,
        }
    }

    /// Index stride of one step along a grid axis.
    #[inline]
    pub const fn stride(&self, axis: Axis) -> usize {
        match axis {
            Axis::Col => 1,
            Axis::Row => self.dx,
            Axis::Plane => self.dx * self.dy,
        }
    }

    /// Linear index of `(x, y, z)`.
    #[inline]
    pub const fn index(&self, x: usize, y: usize, z: usize) -> usize {
        x + y * self.dx + z * self.dx * self.dy
    }

    /// Largest face size, `max(dx·dy, dx·dz, dy·dz)`.
    pub fn max_plane_size(&self) -> usize {
        (self.dx * self.dy).max(self.dx * self.dz).max(self.dy * self.dz)
    }

    /// Largest edge size, `max(dx, dy, dz)`.
    pub fn max_edge_size(&self) -> usize {
        self.dx.max(self.dy).max(self.dz)
    }
}

/// A free axis walked by a layout: `len` steps of `stride` indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Run {
    len: usize,
    stride: usize,
}

const UNIT: Run = Run { len: 1, stride: 0 };

/// Element count and index mapping for one direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundaryLayout {
    direction: Direction,
    base: usize,
    inner: Run,
    outer: Run,
}

impl BoundaryLayout {
    pub fn new(direction: Direction, extents: Extents) -> Self {
        let mut base = 0;
        let mut free = [UNIT; 2];
        let mut n_free = 0;
        // Column first so that `x` is the fastest-varying free axis.
        for axis in [Axis::Col, Axis::Row, Axis::Plane] {
            match direction.component(axis) {
                Some(Side::Min) => {}
                Some(Side::Max) => base += (extents.along(axis) - 1) * extents.stride(axis),
                None => {
                    free[n_free] = Run {
                        len: extents.along(axis),
                        stride: extents.stride(axis),
                    };
                    n_free += 1;
                }
            }
        }
        Self {
            direction,
            base,
            inner: free[0],
            outer: free[1],
        }
    }

    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Values transferred per field: a face area, an edge length, or 1.
    #[inline]
    pub fn element_count(&self) -> usize {
        self.inner.len * self.outer.len
    }

    /// Field-array index of the `offset`-th boundary value.
    #[inline]
    pub fn index(&self, offset: usize) -> usize {
        debug_assert!(offset < self.element_count());
        self.base
            + (offset % self.inner.len) * self.inner.stride
            + (offset / self.inner.len) * self.outer.stride
    }

    /// Largest field-array index this layout touches.
    pub fn max_index(&self) -> usize {
        self.index(self.element_count() - 1)
    }

    /// All indices in buffer order.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.element_count()).map(move |k| self.index(k))
    }
}
