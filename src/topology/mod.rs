//! Processor-grid topology: where a rank sits in the cube of sub-domains and
//! which of its 26 neighbors exist.
//!
//! - [`grid`]: `ProcessorGrid`, `Axis`, `Side`, closed-form peer rank ids
//! - [`direction`]: the static table of 26 neighbor directions
//! - [`neighbors`]: active neighbor sets with send/receive gating

pub mod direction;
pub mod grid;
pub mod neighbors;

pub use direction::{DIRECTIONS, Direction, DirectionClass};
pub use grid::{Axis, ProcessorGrid, Side};
pub use neighbors::ActiveNeighbors;
