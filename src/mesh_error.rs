//! MeshHaloError: Unified error type for mesh-halo public APIs
//!
//! Every phase of a halo exchange returns this error instead of panicking.
//! Transport failures are fatal to the round they occur in: they are reported
//! once all outstanding handles have been drained, and never retried.

use crate::algs::exchange::phases::Phase;
use crate::data::layout::Extents;
use crate::topology::direction::Direction;
use thiserror::Error;

/// Boxed transport-level cause carried by [`MeshHaloError::CommError`].
pub type CommSource = Box<dyn std::error::Error + Send + Sync>;

/// Unified error type for mesh-halo operations.
#[derive(Debug, Error)]
pub enum MeshHaloError {
    /// The all-free side combination, which names no neighbor.
    #[error("a direction must fix at least one axis")]
    InvalidDirection,
    /// The number of ranks cannot be arranged as an `edge³` processor cube.
    #[error("{ranks} ranks cannot form a cubic processor grid")]
    InvalidGrid { ranks: usize },
    /// A rank id outside `0..num_ranks`.
    #[error("rank {rank} is out of range for a grid of {ranks} ranks")]
    RankOutOfRange { rank: usize, ranks: usize },
    /// A logical coordinate outside `0..edge` on some axis.
    #[error("coordinate ({row}, {col}, {plane}) lies outside a grid of edge {edge}")]
    CoordinateOutOfRange {
        row: usize,
        col: usize,
        plane: usize,
        edge: usize,
    },
    /// The processor grid and the communicator disagree on the world size.
    #[error("processor grid holds {grid} ranks but the communicator has {comm}")]
    CommSizeMismatch { grid: usize, comm: usize },
    /// Sub-domain extents must be at least one element on every axis.
    #[error("invalid sub-domain extents {dx}x{dy}x{dz}")]
    InvalidExtents { dx: usize, dy: usize, dz: usize },
    /// A phase was handed extents other than those its round was posted with.
    #[error("round was posted for extents {posted:?} but was given {got:?}")]
    ExtentsMismatch { posted: Extents, got: Extents },
    /// More fields requested than the message buffers were sized for.
    #[error("{count} fields exceed the buffer capacity of {max} fields per message")]
    TooManyFields { count: usize, max: usize },
    /// A boundary layout does not fit the pre-allocated region of its direction.
    #[error("{direction:?}: {needed} elements do not fit a region of {capacity}")]
    BufferOverflow {
        direction: Direction,
        needed: usize,
        capacity: usize,
    },
    /// The combine phase was handed a different number of fields than were posted.
    #[error("expected {expected} fields, got {got}")]
    FieldCountMismatch { expected: usize, got: usize },
    /// A field is too short for the highest index touched by a layout.
    #[error("field {field} has {len} elements but index {needed} is required")]
    FieldTooShort {
        field: usize,
        needed: usize,
        len: usize,
    },
    /// A phase was invoked out of order.
    #[error("cannot {operation} while the exchange is in phase {found:?}")]
    PhaseOrder {
        operation: &'static str,
        found: Phase,
    },
    /// Two transfers were registered for the same direction in one round.
    #[error("a transfer is already in flight for {0:?}")]
    DuplicateTransfer(Direction),
    /// Communication failure with a neighbor rank.
    #[error("communication error with rank {neighbor}: {source}")]
    CommError {
        neighbor: usize,
        #[source]
        source: CommSource,
    },
    /// A received message had an unexpected byte length.
    #[error("buffer size mismatch with rank {neighbor}: expected {expected} bytes, got {got}")]
    BufferSizeMismatch {
        neighbor: usize,
        expected: usize,
        got: usize,
    },
    /// Rejected configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),
}
