//! Data side of the exchange: field accessors, boundary layouts and the
//! pre-allocated message buffers.

pub mod buffers;
pub mod field;
pub mod layout;
pub mod scalar;

pub use buffers::CommBuffers;
pub use field::{FieldAccess, Strided};
pub use layout::{BoundaryLayout, Extents};
pub use scalar::{HaloScalar, Real};
