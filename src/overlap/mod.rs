//! Overlap fusion rules: how an incoming boundary value merges into the
//! local copy of a shared node or ghost element.

pub mod delta;

pub use delta::{AddDelta, CopyDelta, Delta};
