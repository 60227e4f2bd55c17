//! Delta trait: how one incoming boundary value merges into the local value.
//!
//! The combine phases are generic over a `Delta`, so the same unpack loop
//! serves both the summing pass over shared nodes and the overwriting pass
//! over ghost data.

/// Merge rule for a scalar field value `V`.
pub trait Delta<V>: Sized {
    /// Merge an incoming value into the local one.
    fn fuse(local: &mut V, incoming: V);
}

/// Replace the local value with the incoming one.
#[derive(Copy, Clone, Debug, Default)]
pub struct CopyDelta;

impl<V: Copy> Delta<V> for CopyDelta {
    #[inline]
    fn fuse(local: &mut V, incoming: V) {
        *local = incoming;
    }
}

/// Add the incoming value to the local one.
///
/// Used for shared-node accumulation, where each sub-domain owns a partial
/// contribution and all of them must end up summed on every copy.
#[derive(Copy, Clone, Debug, Default)]
pub struct AddDelta;

impl<V> Delta<V> for AddDelta
where
    V: std::ops::AddAssign + Copy,
{
    #[inline]
    fn fuse(local: &mut V, incoming: V) {
        *local += incoming;
    }
}
