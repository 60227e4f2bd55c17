//! Pre-allocated send/receive message buffers.
//!
//! Both buffers are sized once for the worst case (all 26 directions active,
//! `max_fields` fields, the largest extents the domain will exchange) and are
//! never reallocated. Each direction owns a fixed region:
//!
//! ```text
//! | face 0 .. face 5 | edge 0 .. edge 11 | corner 0 .. corner 7 |
//!   f·maxPlane each    f·maxEdge each      f rounded up to a cache line
//! ```
//!
//! where `f` is the field count of the current round.

use crate::config::HaloConfig;
use crate::debug_invariants::DebugInvariants;
use crate::mesh_error::MeshHaloError;
use crate::data::layout::Extents;
use crate::data::scalar::HaloScalar;
use crate::topology::direction::{CORNER_COUNT, Direction, DirectionClass, EDGE_COUNT, FACE_COUNT};
use std::ops::Range;

/// Flat send and receive buffers with fixed per-direction regions.
#[derive(Clone, Debug)]
pub struct CommBuffers<T> {
    send: Vec<T>,
    recv: Vec<T>,
    max_plane: usize,
    max_edge: usize,
    max_fields: usize,
    pad: usize,
}

impl<T: HaloScalar> CommBuffers<T> {
    /// Allocate for exchanges whose extents never exceed `max_extents`.
    pub fn new(max_extents: Extents, config: &HaloConfig) -> Result<Self, MeshHaloError> {
        config.validate()?;
        let max_plane = max_extents.max_plane_size();
        let max_edge = max_extents.max_edge_size();
        let pad = config.pad_elements(std::mem::size_of::<T>());
        let capacity = Self::span(max_plane, max_edge, pad, config.max_fields);
        log::debug!(
            "allocating halo buffers: {capacity} elements each (plane {max_plane}, edge {max_edge}, {} fields)",
            config.max_fields
        );
        Ok(Self {
            send: vec![T::zero(); capacity],
            recv: vec![T::zero(); capacity],
            max_plane,
            max_edge,
            max_fields: config.max_fields,
            pad,
        })
    }
}

impl<T> CommBuffers<T> {
    fn corner_stride(pad: usize, fields: usize) -> usize {
        fields.div_ceil(pad) * pad
    }

    fn span(max_plane: usize, max_edge: usize, pad: usize, fields: usize) -> usize {
        FACE_COUNT * fields * max_plane
            + EDGE_COUNT * fields * max_edge
            + CORNER_COUNT * Self::corner_stride(pad, fields)
    }

    /// Elements per buffer.
    pub fn capacity(&self) -> usize {
        self.send.len()
    }

    pub fn max_fields(&self) -> usize {
        self.max_fields
    }

    /// Per-field capacity of a region of `class`.
    pub fn class_capacity(&self, class: DirectionClass) -> usize {
        match class {
            DirectionClass::Face => self.max_plane,
            DirectionClass::Edge => self.max_edge,
            DirectionClass::Corner => 1,
        }
    }

    /// Region of `direction` for a message of `count` values per field and
    /// `fields` fields. Fails fast when the message would spill into a
    /// neighboring region.
    pub fn region(
        &self,
        direction: Direction,
        fields: usize,
        count: usize,
    ) -> Result<Range<usize>, MeshHaloError> {
        if fields > self.max_fields {
            return Err(MeshHaloError::TooManyFields {
                count: fields,
                max: self.max_fields,
            });
        }
        let class = direction.class();
        let per_field = self.class_capacity(class);
        if count > per_field {
            return Err(MeshHaloError::BufferOverflow {
                direction,
                needed: count * fields,
                capacity: per_field * fields,
            });
        }
        let planes = FACE_COUNT * fields * self.max_plane;
        let edges = EDGE_COUNT * fields * self.max_edge;
        let start = match class {
            DirectionClass::Face => direction.slot() * fields * self.max_plane,
            DirectionClass::Edge => planes + direction.slot() * fields * self.max_edge,
            DirectionClass::Corner => {
                planes + edges + direction.slot() * Self::corner_stride(self.pad, fields)
            }
        };
        let end = start + count * fields;
        if end > self.recv.len() {
            return Err(MeshHaloError::BufferOverflow {
                direction,
                needed: end,
                capacity: self.recv.len(),
            });
        }
        Ok(start..end)
    }

    pub fn send(&self, range: Range<usize>) -> &[T] {
        &self.send[range]
    }

    pub fn send_mut(&mut self, range: Range<usize>) -> &mut [T] {
        &mut self.send[range]
    }

    pub fn recv(&self, range: Range<usize>) -> &[T] {
        &self.recv[range]
    }

    pub fn recv_mut(&mut self, range: Range<usize>) -> &mut [T] {
        &mut self.recv[range]
    }
}

impl<T> DebugInvariants for CommBuffers<T> {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "CommBuffers");
    }

    fn validate_invariants(&self) -> Result<(), MeshHaloError> {
        let want = Self::span(self.max_plane, self.max_edge, self.pad, self.max_fields);
        if self.send.len() != want || self.recv.len() != want {
            return Err(MeshHaloError::Config(format!(
                "buffers hold {}/{} elements, expected {want}",
                self.send.len(),
                self.recv.len()
            )));
        }
        if self.pad == 0 {
            return Err(MeshHaloError::Config("zero corner padding".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::direction::DIRECTIONS;

    fn buffers() -> CommBuffers<f64> {
        CommBuffers::new(Extents::new(4, 5, 6).unwrap(), &HaloConfig::default()).unwrap()
    }

    #[test]
    fn regions_do_not_overlap_at_full_capacity() {
        let b = buffers();
        let f = b.max_fields();
        let mut ranges: Vec<_> = DIRECTIONS
            .iter()
            .map(|&d| b.region(d, f, b.class_capacity(d.class())).unwrap())
            .collect();
        ranges.sort_by_key(|r| r.start);
        for w in ranges.windows(2) {
            assert!(w[0].end <= w[1].start, "{:?} overlaps {:?}", w[0], w[1]);
        }
        assert!(ranges.last().unwrap().end <= b.capacity());
        b.debug_assert_invariants();
    }

    #[test]
    fn corner_regions_start_on_cache_lines() {
        let b = buffers();
        let base = b
            .region(DIRECTIONS[18], 3, 1)
            .unwrap()
            .start;
        for d in Direction::of_class(DirectionClass::Corner) {
            let r = b.region(d, 3, 1).unwrap();
            assert_eq!((r.start - base) % 16, 0);
        }
    }

    #[test]
    fn oversized_messages_fail_fast() {
        let b = buffers();
        let face = DIRECTIONS[0];
        assert!(matches!(
            b.region(face, 1, 31),
            Err(MeshHaloError::BufferOverflow { .. })
        ));
        assert!(matches!(
            b.region(face, 7, 1),
            Err(MeshHaloError::TooManyFields { count: 7, max: 6 })
        ));
    }
}
