//! Numeric element type carried in halo messages.

use bytemuck::Pod;
use num_traits::Float;
use std::fmt::Debug;
use std::ops::AddAssign;

/// Floating-point values that can be packed into byte messages and summed.
pub trait HaloScalar: Pod + Float + AddAssign + Default + Debug + Send + Sync + 'static {}

impl<T> HaloScalar for T where T: Pod + Float + AddAssign + Default + Debug + Send + Sync + 'static {}

/// Crate-wide precision, fixed at compile time.
#[cfg(feature = "single-precision")]
pub type Real = f32;
/// Crate-wide precision, fixed at compile time.
#[cfg(not(feature = "single-precision"))]
pub type Real = f64;
